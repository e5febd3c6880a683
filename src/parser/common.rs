// Parser utilities shared by the facts provider and the identifier renamer

/// Kind of top-level type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
}

/// A top-level type declared in a compilation unit
#[derive(Debug, Clone)]
pub struct TypeDecl {
    /// Simple name of the type
    pub name: String,

    /// Kind of declaration
    pub kind: TypeKind,

    /// Superclass as written in the `extends` clause, resolved through imports
    pub superclass: Option<String>,
}

/// Result of parsing a decompiled Java compilation unit
#[derive(Debug, Default)]
pub struct ParsedUnit {
    /// Package/namespace of the file
    pub package: Option<String>,

    /// Import statements (fully qualified, `.*` suffix for wildcards)
    pub imports: Vec<String>,

    /// Top-level types in declaration order
    pub types: Vec<TypeDecl>,
}

impl ParsedUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the fully qualified name of a type declared in this unit
    pub fn qualify(&self, simple_name: &str) -> String {
        match &self.package {
            Some(pkg) if !pkg.is_empty() => format!("{}.{}", pkg, simple_name),
            _ => simple_name.to_string(),
        }
    }

    /// Resolve a simple type name as written in source against the unit's imports
    pub fn resolve_type(&self, written: &str) -> String {
        // Drop generic arguments: `Foo<Bar>` -> `Foo`
        let base = written.split('<').next().unwrap_or(written).trim();

        if base.contains('.') {
            return base.to_string();
        }

        let suffix = format!(".{}", base);
        if let Some(import) = self.imports.iter().find(|i| i.ends_with(&suffix)) {
            return import.clone();
        }

        self.qualify(base)
    }
}

/// Extract text from a node
pub fn node_text<'a>(node: tree_sitter::Node<'a>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Iterator over all descendant nodes
pub fn descendants(node: tree_sitter::Node) -> impl Iterator<Item = tree_sitter::Node> {
    DescendantIterator::new(node)
}

struct DescendantIterator<'a> {
    cursor: tree_sitter::TreeCursor<'a>,
    done: bool,
}

impl<'a> DescendantIterator<'a> {
    fn new(node: tree_sitter::Node<'a>) -> Self {
        Self {
            cursor: node.walk(),
            done: false,
        }
    }
}

impl<'a> Iterator for DescendantIterator<'a> {
    type Item = tree_sitter::Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let node = self.cursor.node();

        // Try to go to first child
        if self.cursor.goto_first_child() {
            return Some(node);
        }

        // Try to go to next sibling
        loop {
            if self.cursor.goto_next_sibling() {
                return Some(node);
            }

            // Go up to parent
            if !self.cursor.goto_parent() {
                self.done = true;
                return Some(node);
            }
        }
    }
}
