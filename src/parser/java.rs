// Java parser for decompiled compilation units

use super::common::{node_text, ParsedUnit, TypeDecl, TypeKind};
use miette::{IntoDiagnostic, Result};
use std::path::Path;
use tree_sitter::{Node, Parser as TsParser, Tree};
use tracing::debug;

/// Java source code parser using tree-sitter
///
/// Decompiler output is frequently not valid Java, so the parser only
/// extracts what survives error recovery: the package, the imports and the
/// top-level type headers.
pub struct JavaParser {
    parser: TsParser,
}

impl JavaParser {
    pub fn new() -> Result<Self> {
        let mut parser = TsParser::new();
        parser
            .set_language(&tree_sitter_java::language())
            .into_diagnostic()?;
        Ok(Self { parser })
    }

    /// Parse raw source into a tree-sitter tree
    pub fn parse_tree(&mut self, contents: &str) -> Result<Tree> {
        self.parser
            .parse(contents, None)
            .ok_or_else(|| miette::miette!("Failed to parse Java source"))
    }

    /// Parse a compilation unit and extract its header facts
    pub fn parse(&mut self, path: &Path, contents: &str) -> Result<ParsedUnit> {
        let tree = self.parse_tree(contents)?;
        let root = tree.root_node();

        let mut unit = ParsedUnit::new();
        unit.package = self.extract_package(root, contents);
        unit.imports = self.extract_imports(root, contents);

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            let kind = match child.kind() {
                "class_declaration" => TypeKind::Class,
                "interface_declaration" => TypeKind::Interface,
                "enum_declaration" => TypeKind::Enum,
                _ => continue,
            };

            let Some(name) = child
                .child_by_field_name("name")
                .map(|n| node_text(n, contents).to_string())
            else {
                continue;
            };

            let superclass = self
                .extract_superclass(child, contents)
                .map(|written| unit.resolve_type(&written));

            unit.types.push(TypeDecl {
                name,
                kind,
                superclass,
            });
        }

        debug!(
            "Parsed {}: package {:?}, {} imports, {} types",
            path.display(),
            unit.package,
            unit.imports.len(),
            unit.types.len()
        );

        Ok(unit)
    }

    fn extract_package(&self, root: Node, source: &str) -> Option<String> {
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "package_declaration" {
                // Find the scoped_identifier
                let mut pkg_cursor = child.walk();
                for pkg_child in child.children(&mut pkg_cursor) {
                    if pkg_child.kind() == "scoped_identifier" || pkg_child.kind() == "identifier" {
                        return Some(node_text(pkg_child, source).to_string());
                    }
                }
            }
        }
        None
    }

    fn extract_imports(&self, root: Node, source: &str) -> Vec<String> {
        let mut imports = Vec::new();
        let mut cursor = root.walk();

        for child in root.children(&mut cursor) {
            if child.kind() == "import_declaration" {
                let mut import_cursor = child.walk();
                for import_child in child.children(&mut import_cursor) {
                    if import_child.kind() == "scoped_identifier"
                        || import_child.kind() == "identifier"
                    {
                        let import_text = node_text(import_child, source);
                        let has_asterisk = {
                            let mut star_cursor = child.walk();
                            let found = child
                                .children(&mut star_cursor)
                                .any(|c| c.kind() == "asterisk");
                            found
                        };
                        if has_asterisk {
                            imports.push(format!("{}.*", import_text));
                        } else {
                            imports.push(import_text.to_string());
                        }
                        break;
                    }
                }
            }
        }

        imports
    }

    /// The `superclass` node reads `extends Foo`; return just the type text
    fn extract_superclass(&self, node: Node, source: &str) -> Option<String> {
        let superclass = node.child_by_field_name("superclass")?;
        let mut cursor = superclass.walk();
        let found = superclass
            .children(&mut cursor)
            .find(|c| c.kind() != "extends")
            .map(|c| node_text(c, source).trim().to_string());
        found
    }
}
