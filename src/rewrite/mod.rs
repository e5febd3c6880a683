//! Line-oriented source rewriting
//!
//! Every stage here works on decompiled Java text with regular expressions
//! and line-granular brace counting. Nothing is re-parsed between stages, so
//! each stage must leave the text in a shape the next one still recognises:
//! one statement or signature per line, the way jadx prints it.

mod reflection;
mod renamer;
mod stages;
mod substitutions;
mod synthesizer;

pub use reflection::{RemovalReport, ReflectionRemover, METHOD_MARKER};
pub use renamer::{IdentifierRenamer, RenamedClass};
pub use stages::{
    comment_package_lines, comment_platform_imports, comment_super_calls, make_fields_static,
    make_methods_static, remove_self_references, rename_class, rewrite_entry_point,
    strip_base_class, EntryPointRewrite, SUPER_MARKER,
};
pub use substitutions::{ImportSubstitutions, RuleContext};
pub use synthesizer::{SynthesisError, SynthesizedUnpacker, UnpackerSynthesizer};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Errors raised by a rewrite stage
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Failed to parse {class}: {message}")]
    Parse { class: String, message: String },
}

/// Source of one collected class inside the rewrite buffer
#[derive(Debug, Clone)]
pub struct Segment {
    /// Fully qualified name of the class the text came from
    pub class_name: String,
    /// Imports declared by the class
    pub imports: Vec<String>,
    pub text: String,
}

/// The source accumulator threaded through every synthesis stage
///
/// Segments stay separate until [`RewriteBuffer::merge`] so per-class stages
/// (import substitution) can target one class; global stages map over all.
#[derive(Debug, Clone, Default)]
pub struct RewriteBuffer {
    segments: Vec<Segment>,
}

impl RewriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, class_name: impl Into<String>, imports: Vec<String>, text: impl Into<String>) {
        self.segments.push(Segment {
            class_name: class_name.into(),
            imports,
            text: text.into(),
        });
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_mut(&mut self, index: usize) -> Option<&mut Segment> {
        self.segments.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Apply a text stage to every segment
    pub fn map_segments<F>(&mut self, mut stage: F)
    where
        F: FnMut(&str) -> String,
    {
        for segment in &mut self.segments {
            segment.text = stage(&segment.text);
        }
    }

    /// Concatenate the segments in collection order
    pub fn merge(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push_str(segment.text.trim_end());
            out.push_str("\n\n");
        }
        out
    }
}

/// A method declaration recognised on a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    /// Byte offset of the return type within the line
    pub type_start: usize,
    pub is_static: bool,
    pub is_abstract: bool,
    /// The line ends with `{`
    pub opens_block: bool,
}

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "final",
    "abstract",
    "synchronized",
    "native",
    "strictfp",
    "default",
];

/// Words that can precede `name(` in a statement without it being a method
const NOT_A_TYPE: &[&str] = &[
    "return", "new", "throw", "else", "case", "yield", "class", "interface", "enum", "extends",
    "implements", "import", "package", "assert",
];

const CONTROL_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "try", "do", "else", "new", "return",
];

lazy_static! {
    static ref SIGNATURE_PATTERN: Regex = Regex::new(concat!(
        r"^\s*(?P<annotations>(?:@[\w.]+(?:\([^)]*\))?\s+)*)",
        r"(?P<modifiers>(?:[a-z]+\s+)*)",
        r"(?:<[^>]*>\s+)?",
        r"(?P<type>[\w$.]+(?:<.*>)?(?:\[\])*)\s+",
        r"(?P<name>[\w$]+)\s*\(",
    ))
    .expect("failed to compile method signature regex");
}

/// Recognise a method declaration line
///
/// Constructors (no return type), calls, control statements and class
/// headers are rejected. Abstract and native methods must end in `;`, all
/// others must open their body on the same line.
pub fn parse_method_signature(line: &str) -> Option<MethodSignature> {
    let caps = SIGNATURE_PATTERN.captures(line)?;

    let modifiers: Vec<&str> = caps["modifiers"].split_whitespace().collect();
    if modifiers.iter().any(|m| !MODIFIERS.contains(m)) {
        return None;
    }

    let ty = caps.name("type")?;
    let name = &caps["name"];
    if MODIFIERS.contains(&ty.as_str())
        || NOT_A_TYPE.contains(&ty.as_str())
        || CONTROL_WORDS.contains(&name)
    {
        return None;
    }

    let is_abstract = modifiers.iter().any(|m| *m == "abstract" || *m == "native");
    let trimmed = line.trim_end();
    let opens_block = trimmed.ends_with('{');
    if !opens_block && !(is_abstract && trimmed.ends_with(';')) {
        return None;
    }
    if !trimmed.contains(')') {
        return None;
    }

    Some(MethodSignature {
        name: name.to_string(),
        type_start: ty.start(),
        is_static: modifiers.contains(&"static"),
        is_abstract,
        opens_block,
    })
}

/// Whether the line is a comment, block-comment or import line
pub(crate) fn is_comment_or_import(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with("import ")
}

/// Net brace balance of a line; braces in literals are counted too
pub(crate) fn brace_delta(line: &str) -> i64 {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

pub(crate) fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Split `text` into lines, remembering whether it ended with a newline
pub(crate) fn split_lines(text: &str) -> (Vec<&str>, bool) {
    (text.lines().collect(), text.ends_with('\n'))
}

pub(crate) fn join_lines(lines: &[String], trailing_newline: bool) -> String {
    let mut out = lines.join("\n");
    if trailing_newline && !lines.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_method() {
        let sig = parse_method_signature("    public String decrypt(byte[] data) {").unwrap();
        assert_eq!(sig.name, "decrypt");
        assert!(!sig.is_static);
        assert!(sig.opens_block);
        assert_eq!(&"    public String decrypt(byte[] data) {"[sig.type_start..], "String decrypt(byte[] data) {");
    }

    #[test]
    fn test_annotated_generic_method() {
        let sig = parse_method_signature(
            "    @Deprecated private static Map<String, Object> load(File f) throws IOException {",
        )
        .unwrap();
        assert_eq!(sig.name, "load");
        assert!(sig.is_static);
    }

    #[test]
    fn test_rejects_non_methods() {
        for line in [
            "    public App(Context c) {",
            "        if (x) {",
            "        return foo(bar);",
            "        } else if (y) {",
            "        Object o = make(1);",
            "public class App extends Application {",
            "        synchronized (lock) {",
            "        new Thread(r) {",
            "        foo.bar(baz);",
        ] {
            assert!(parse_method_signature(line).is_none(), "{}", line);
        }
    }

    #[test]
    fn test_abstract_needs_semicolon() {
        let sig = parse_method_signature("    public abstract void run();").unwrap();
        assert!(sig.is_abstract);
        assert!(!sig.opens_block);
        assert!(parse_method_signature("    void run();").is_none());
    }

    #[test]
    fn test_buffer_merge() {
        let mut buffer = RewriteBuffer::new();
        buffer.push("a.A", vec![], "class A {}\n");
        buffer.push("a.B", vec![], "class B {}");
        buffer.map_segments(|t| t.replace("class", "final class"));
        assert_eq!(buffer.merge(), "final class A {}\n\nfinal class B {}\n\n");
    }
}
