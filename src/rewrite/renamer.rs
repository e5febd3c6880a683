//! Identifier renaming across merged classes
//!
//! Classes collected for an unpacker end up in one file, so their members
//! and locals must not collide. Each declared identifier gets a role prefix
//! and, when that is already taken anywhere in the merge, a numeric suffix:
//!
//! | Declaration | New name         |
//! |-------------|------------------|
//! | field       | `field_<name>`   |
//! | method      | `method_<name>`  |
//! | parameter   | `arg_<name>`     |
//! | local       | `local_<name>`   |
//!
//! Constructors, `@Override` methods and the platform lifecycle entry points
//! keep their names.

use super::RewriteError;
use crate::parser::{descendants, node_text, JavaParser};
use regex::{NoExpand, Regex};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

/// Methods that are looked up by name at runtime or by later stages
const PRESERVED_METHODS: &[&str] = &["main", "onCreate", "attachBaseContext"];

/// One class after renaming
#[derive(Debug, Clone)]
pub struct RenamedClass {
    /// Simple class name
    pub class_name: String,
    pub source: String,
    /// Field renames, old -> new
    pub fields: HashMap<String, String>,
    /// Method renames, old -> new
    pub methods: HashMap<String, String>,
}

/// Renames declared identifiers against a set of names shared by all classes
pub struct IdentifierRenamer {
    parser: JavaParser,
    used: HashSet<String>,
}

struct Scope {
    start: usize,
    end: usize,
    names: HashMap<String, String>,
}

impl IdentifierRenamer {
    pub fn new() -> Result<Self, RewriteError> {
        let parser = JavaParser::new().map_err(|e| RewriteError::Parse {
            class: String::new(),
            message: e.to_string(),
        })?;
        Ok(Self {
            parser,
            used: HashSet::new(),
        })
    }

    /// Names handed out so far
    pub fn used_names(&self) -> &HashSet<String> {
        &self.used
    }

    fn fresh(&mut self, prefix: &str, name: &str) -> String {
        let base = format!("{}{}", prefix, name);
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Rename every class, then rewrite `Class.member` uses between them
    ///
    /// `classes` holds `(simple name, source)` pairs; the output keeps their
    /// order.
    pub fn rename_all(&mut self, classes: &[(&str, &str)]) -> Result<Vec<RenamedClass>, RewriteError> {
        let mut renamed = Vec::with_capacity(classes.len());
        for (name, source) in classes {
            renamed.push(self.rename_class(name, source)?);
        }

        let mut qualified: Vec<(Regex, String)> = Vec::new();
        for class in &renamed {
            for (old, new) in class.fields.iter().chain(class.methods.iter()) {
                let pattern = Regex::new(&format!(
                    r"\b{}\.{}\b",
                    regex::escape(&class.class_name),
                    regex::escape(old)
                ))?;
                qualified.push((pattern, format!("{}.{}", class.class_name, new)));
            }
        }

        for class in &mut renamed {
            for (pattern, replacement) in &qualified {
                if pattern.is_match(&class.source) {
                    class.source = pattern
                        .replace_all(&class.source, NoExpand(replacement))
                        .into_owned();
                }
            }
        }

        Ok(renamed)
    }

    /// Rename the declarations of one class
    pub fn rename_class(&mut self, class_name: &str, source: &str) -> Result<RenamedClass, RewriteError> {
        let tree = self
            .parser
            .parse_tree(source)
            .map_err(|e| RewriteError::Parse {
                class: class_name.to_string(),
                message: e.to_string(),
            })?;
        let root = tree.root_node();

        let mut result = RenamedClass {
            class_name: class_name.to_string(),
            source: source.to_string(),
            fields: HashMap::new(),
            methods: HashMap::new(),
        };

        let Some(type_node) = find_type(root, class_name, source) else {
            return Ok(result);
        };
        let Some(body) = type_node.child_by_field_name("body") else {
            return Ok(result);
        };

        let members = member_nodes(body);
        let member_ids: HashSet<usize> = members.iter().map(|m| m.id()).collect();
        let mut scopes: Vec<Scope> = Vec::new();

        for member in &members {
            match member.kind() {
                "field_declaration" => {
                    let mut cursor = member.walk();
                    for declarator in member.children_by_field_name("declarator", &mut cursor) {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            let name = node_text(name, source).to_string();
                            if !result.fields.contains_key(&name) {
                                let new_name = self.fresh("field_", &name);
                                result.fields.insert(name, new_name);
                            }
                        }
                    }
                }
                "method_declaration" => {
                    if let Some(name) = member.child_by_field_name("name") {
                        let name = node_text(name, source).to_string();
                        if !PRESERVED_METHODS.contains(&name.as_str())
                            && !has_override(*member, source)
                            && !result.methods.contains_key(&name)
                        {
                            let new_name = self.fresh("method_", &name);
                            result.methods.insert(name, new_name);
                        }
                    }
                    let scope = self.collect_scope(*member, source);
                    scopes.push(scope);
                }
                "constructor_declaration" => {
                    let scope = self.collect_scope(*member, source);
                    scopes.push(scope);
                }
                _ => {}
            }
        }

        let mut edits: Vec<(usize, usize, String)> = Vec::new();
        for node in descendants(type_node) {
            if node.kind() != "identifier" {
                continue;
            }
            let Some(parent) = node.parent() else {
                continue;
            };
            let text = node_text(node, source);
            let is_field_of = |field: &str| {
                parent.child_by_field_name(field).map(|n| n.id()) == Some(node.id())
            };

            let new_name = match parent.kind() {
                "method_declaration" if is_field_of("name") => {
                    if member_ids.contains(&parent.id()) {
                        result.methods.get(text)
                    } else {
                        None
                    }
                }
                "method_invocation" if is_field_of("name") => {
                    if is_self_reference(parent.child_by_field_name("object"), class_name, source) {
                        result.methods.get(text)
                    } else {
                        None
                    }
                }
                "field_access" if is_field_of("field") => {
                    if is_self_reference(parent.child_by_field_name("object"), class_name, source) {
                        result.fields.get(text)
                    } else {
                        None
                    }
                }
                "class_declaration" | "interface_declaration" | "enum_declaration"
                | "constructor_declaration" | "enum_constant" | "labeled_statement"
                | "break_statement" | "continue_statement" | "marker_annotation"
                | "annotation" | "method_reference" | "scoped_identifier" => None,
                _ => {
                    let position = node.start_byte();
                    scopes
                        .iter()
                        .find(|s| s.start <= position && position < s.end)
                        .and_then(|s| s.names.get(text))
                        .or_else(|| result.fields.get(text))
                }
            };

            if let Some(new_name) = new_name {
                edits.push((node.start_byte(), node.end_byte(), new_name.clone()));
            }
        }

        edits.sort_by(|a, b| b.0.cmp(&a.0));
        edits.dedup_by(|a, b| a.0 == b.0);
        for (start, end, replacement) in edits {
            result.source.replace_range(start..end, &replacement);
        }

        Ok(result)
    }

    /// Parameters and locals declared anywhere inside a method or constructor
    fn collect_scope(&mut self, member: Node, source: &str) -> Scope {
        let mut names = HashMap::new();

        for node in descendants(member) {
            let (prefix, name_node) = match node.kind() {
                "formal_parameter" => ("arg_", node.child_by_field_name("name")),
                "spread_parameter" => ("arg_", declarator_name(node)),
                "catch_formal_parameter" | "enhanced_for_statement" | "resource" => {
                    ("local_", node.child_by_field_name("name"))
                }
                "local_variable_declaration" => {
                    let mut cursor = node.walk();
                    let declarators: Vec<Node> = node
                        .children_by_field_name("declarator", &mut cursor)
                        .collect();
                    for declarator in declarators {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            self.bind(&mut names, "local_", node_text(name, source));
                        }
                    }
                    continue;
                }
                "lambda_expression" => {
                    if let Some(params) = node.child_by_field_name("parameters") {
                        if params.kind() == "identifier" {
                            self.bind(&mut names, "local_", node_text(params, source));
                        } else if params.kind() == "inferred_parameters" {
                            let mut cursor = params.walk();
                            let idents: Vec<Node> = params.named_children(&mut cursor).collect();
                            for ident in idents {
                                self.bind(&mut names, "local_", node_text(ident, source));
                            }
                        }
                    }
                    continue;
                }
                _ => continue,
            };

            if let Some(name) = name_node {
                self.bind(&mut names, prefix, node_text(name, source));
            }
        }

        Scope {
            start: member.start_byte(),
            end: member.end_byte(),
            names,
        }
    }

    fn bind(&mut self, names: &mut HashMap<String, String>, prefix: &str, name: &str) {
        if !names.contains_key(name) {
            let new_name = self.fresh(prefix, name);
            names.insert(name.to_string(), new_name);
        }
    }
}

fn find_type<'t>(root: Node<'t>, class_name: &str, source: &str) -> Option<Node<'t>> {
    let mut cursor = root.walk();
    let types: Vec<Node<'t>> = root
        .children(&mut cursor)
        .filter(|c| {
            matches!(
                c.kind(),
                "class_declaration" | "interface_declaration" | "enum_declaration"
            )
        })
        .collect();

    types
        .iter()
        .find(|t| {
            t.child_by_field_name("name")
                .map(|n| node_text(n, source) == class_name)
                .unwrap_or(false)
        })
        .or_else(|| types.first())
        .copied()
}

/// Direct members of a class, interface or enum body
fn member_nodes(body: Node) -> Vec<Node> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            members.extend(child.named_children(&mut inner));
        } else {
            members.push(child);
        }
    }
    members
}

fn has_override(method: Node, source: &str) -> bool {
    let mut cursor = method.walk();
    let modifiers = method
        .children(&mut cursor)
        .find(|c| c.kind() == "modifiers");
    let Some(modifiers) = modifiers else {
        return false;
    };

    let mut inner = modifiers.walk();
    let found = modifiers.children(&mut inner).any(|annotation| {
        matches!(annotation.kind(), "marker_annotation" | "annotation")
            && annotation
                .child_by_field_name("name")
                .map(|n| node_text(n, source) == "Override")
                .unwrap_or(false)
    });
    found
}

fn declarator_name(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let declarator = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "variable_declarator");
    declarator.and_then(|d| d.child_by_field_name("name"))
}

/// No receiver, `this`, or the class itself
fn is_self_reference(object: Option<Node>, class_name: &str, source: &str) -> bool {
    match object {
        None => true,
        Some(object) => {
            let text = node_text(object, source);
            object.kind() == "this" || text == "this" || text == class_name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOADER: &str = r#"package com.app;

public class Loader {
    private String key;
    static int count = 0;

    public Loader(String key) {
        this.key = key;
    }

    public String decode(String input) {
        String out = input + key;
        for (int i = 0; i < count; i++) {
            out = helper(out);
        }
        return out;
    }

    private String helper(String value) {
        return this.key + value;
    }

    @Override
    public String toString() {
        return key;
    }
}
"#;

    #[test]
    fn test_rename_roles() {
        let mut renamer = IdentifierRenamer::new().unwrap();
        let renamed = renamer.rename_class("Loader", LOADER).unwrap();
        let src = &renamed.source;

        assert!(src.contains("private String field_key;"));
        assert!(src.contains("static int field_count = 0;"));
        assert!(src.contains("public Loader(String arg_key) {"));
        assert!(src.contains("this.field_key = arg_key;"));
        assert!(src.contains("public String method_decode(String arg_input) {"));
        assert!(src.contains("String local_out = arg_input + field_key;"));
        assert!(src.contains("local_out = method_helper(local_out);"));
        assert!(src.contains("return this.field_key + arg_value;"));
        assert!(src.contains("public String toString() {"));
        assert_eq!(renamed.methods.get("decode").map(String::as_str), Some("method_decode"));
    }

    #[test]
    fn test_shared_names_do_not_collide() {
        let mut renamer = IdentifierRenamer::new().unwrap();
        let a = "class A { int value; void run(int x) { value = x; } }";
        let b = "class B { int value; void run(int x) { value = x; } }";

        let renamed = renamer.rename_all(&[("A", a), ("B", b)]).unwrap();

        assert!(renamed[0].source.contains("int field_value;"));
        assert!(renamed[1].source.contains("int field_value_1;"));
        assert!(renamed[1].source.contains("void method_run_1(int arg_x_1)"));
        assert!(renamer.used_names().contains("arg_x"));
    }

    #[test]
    fn test_qualified_uses_follow_renames() {
        let mut renamer = IdentifierRenamer::new().unwrap();
        let app = "class App { void start() { Keys.load(Keys.SEED); } }";
        let keys = "class Keys { static int SEED = 7; static void load(int s) {} }";

        let renamed = renamer.rename_all(&[("App", app), ("Keys", keys)]).unwrap();

        assert!(renamed[0].source.contains("Keys.method_load(Keys.field_SEED);"));
    }

    #[test]
    fn test_lifecycle_methods_keep_names() {
        let mut renamer = IdentifierRenamer::new().unwrap();
        let src = "class App { protected void attachBaseContext(Context base) { super.attachBaseContext(base); } public void onCreate() {} }";

        let renamed = renamer.rename_class("App", src).unwrap();

        assert!(renamed.source.contains("void attachBaseContext(Context arg_base)"));
        assert!(renamed.source.contains("super.attachBaseContext(arg_base);"));
        assert!(renamed.source.contains("public void onCreate()"));
    }
}
