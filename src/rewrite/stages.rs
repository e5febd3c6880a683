// Structural rewrites that turn an Application subclass into a plain program

use super::{
    brace_delta, is_comment_or_import, join_lines, leading_whitespace, parse_method_signature,
    split_lines, RewriteError,
};
use lazy_static::lazy_static;
use regex::{NoExpand, Regex};

/// Trailer appended to a commented-out superclass call
pub const SUPER_MARKER: &str = "// Unboxer: Remove superclass reference";

lazy_static! {
    static ref EXTENDS_APPLICATION: Regex = Regex::new(r"\s+extends\s+(?:android\.app\.)?Application\b")
        .expect("failed to compile base class regex");
    static ref PLATFORM_OVERRIDE: Regex = Regex::new(r"^\s*@Override\s*//\s*android[\w.]*\s*$")
        .expect("failed to compile override line regex");
    static ref INLINE_PLATFORM_OVERRIDE: Regex = Regex::new(r"@Override\s*//\s*android[\w.]*")
        .expect("failed to compile override note regex");
    static ref SUPER_CALL: Regex = Regex::new(r"^\s*super(?:\.\w+)?\s*\(")
        .expect("failed to compile super call regex");
    static ref ATTACH_BASE_CONTEXT: Regex = Regex::new(concat!(
        r"^(\s*)(?:(?:public|protected|private|final)\s+)*void\s+attachBaseContext",
        r"\s*\(\s*(?:final\s+)?(?:android\.content\.)?Context\s+([\w$]+)\s*\)",
    ))
    .expect("failed to compile attachBaseContext regex");
    static ref PACKAGE_LINE: Regex = Regex::new(r"^\s*package\s+[\w.]+\s*;")
        .expect("failed to compile package line regex");
    static ref FIELD_DECLARATION: Regex = Regex::new(concat!(
        r"^(\s*)((?:(?:public|private|protected|static|final|volatile|transient)\s+)*)",
        r"([\w$.]+(?:<[^=;()]*>)?(?:\[\])*)\s+(field_[\w$]*)\s*(?:=|;)",
    ))
    .expect("failed to compile field declaration regex");
    static ref SELF_REFERENCE: Regex = Regex::new(r"\b(?:[A-Za-z_$][\w$]*\.)?this\.")
        .expect("failed to compile self reference regex");
    static ref IMPORT_LINE: Regex = Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;")
        .expect("failed to compile import line regex");
}

/// Replace every word-bounded use of a class name
pub fn rename_class(text: &str, old: &str, new: &str) -> Result<String, RewriteError> {
    let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(old)))?;
    Ok(pattern.replace_all(text, NoExpand(new)).into_owned())
}

/// Drop `extends Application` and the decompiler's platform `@Override` notes
pub fn strip_base_class(text: &str) -> String {
    let (lines, trailing_newline) = split_lines(text);
    let out: Vec<String> = lines
        .into_iter()
        .filter(|line| !PLATFORM_OVERRIDE.is_match(line))
        .map(|line| {
            let line = EXTENDS_APPLICATION.replace(line, "");
            INLINE_PLATFORM_OVERRIDE.replace(&line, "").into_owned()
        })
        .collect();
    join_lines(&out, trailing_newline)
}

/// Comment out `super(...)` and `super.x(...)` calls
pub fn comment_super_calls(text: &str) -> String {
    let (lines, trailing_newline) = split_lines(text);
    let out: Vec<String> = lines
        .into_iter()
        .map(|line| {
            if SUPER_CALL.is_match(line) {
                format!(
                    "{}// {} {}",
                    leading_whitespace(line),
                    line.trim_start(),
                    SUPER_MARKER
                )
            } else {
                line.to_string()
            }
        })
        .collect();
    join_lines(&out, trailing_newline)
}

/// Result of turning `attachBaseContext` into `main`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointRewrite {
    pub source: String,
    /// Name of the `Context` parameter, if the method was found
    pub parameter: Option<String>,
    /// Uses of the parameter replaced inside the method body
    pub replacements: usize,
}

/// Rewrite `attachBaseContext(Context p)` to `main(String[] args)`
///
/// Uses of `p` are replaced with `stand_in` inside that method's body only;
/// the same name elsewhere in the class is left alone.
pub fn rewrite_entry_point(text: &str, stand_in: &str) -> Result<EntryPointRewrite, RewriteError> {
    let (lines, trailing_newline) = split_lines(text);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    let mut parameter: Option<String> = None;
    let mut param_pattern: Option<Regex> = None;
    let mut depth: i64 = 0;
    let mut in_body = false;
    let mut replacements = 0;

    for line in lines {
        if parameter.is_none() && !is_comment_or_import(line) {
            if let Some(caps) = ATTACH_BASE_CONTEXT.captures(line) {
                let name = caps[2].to_string();
                let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
                let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&name)))?;
                let rest = &line[whole..];
                replacements += pattern.find_iter(rest).count();
                out.push(format!(
                    "{}public static void main(String[] args){}",
                    &caps[1],
                    pattern.replace_all(rest, NoExpand(stand_in))
                ));
                param_pattern = Some(pattern);
                parameter = Some(name);
                depth = brace_delta(line);
                in_body = depth > 0 || !line.contains('{');
                continue;
            }
        }

        if in_body {
            depth += brace_delta(line);
            let replaced = match &param_pattern {
                Some(pattern) if !line.trim_start().starts_with("//") => {
                    replacements += pattern.find_iter(line).count();
                    pattern.replace_all(line, NoExpand(stand_in)).into_owned()
                }
                _ => line.to_string(),
            };
            out.push(replaced);
            if depth <= 0 && line.contains('}') {
                in_body = false;
            }
        } else {
            out.push(line.to_string());
        }
    }

    Ok(EntryPointRewrite {
        source: join_lines(&out, trailing_newline),
        parameter,
        replacements,
    })
}

/// Comment out every `package ...;` line
pub fn comment_package_lines(text: &str) -> String {
    map_lines(text, |line| {
        if PACKAGE_LINE.is_match(line) {
            format!("// {}", line)
        } else {
            line.to_string()
        }
    })
}

/// Add `static` to every method signature that lacks it
///
/// Constructors, abstract methods and class headers never parse as method
/// signatures, so they are left alone.
pub fn make_methods_static(text: &str) -> String {
    map_lines(text, |line| {
        if is_comment_or_import(line) {
            return line.to_string();
        }
        match parse_method_signature(line) {
            Some(sig) if sig.opens_block && !sig.is_static && !sig.is_abstract => {
                format!("{}static {}", &line[..sig.type_start], &line[sig.type_start..])
            }
            _ => line.to_string(),
        }
    })
}

/// Words the field pattern may capture as a "type" in a statement
const STATEMENT_WORDS: &[&str] = &["return", "throw", "else", "new", "case", "yield", "assert"];

/// Add `static` to renamed field declarations that lack it
pub fn make_fields_static(text: &str) -> String {
    map_lines(text, |line| {
        if is_comment_or_import(line) {
            return line.to_string();
        }
        let Some(caps) = FIELD_DECLARATION.captures(line) else {
            return line.to_string();
        };
        let modifiers = &caps[2];
        let ty = &caps[3];
        if modifiers.split_whitespace().any(|m| m == "static") || STATEMENT_WORDS.contains(&ty) {
            return line.to_string();
        }
        let type_start = caps.get(3).map(|m| m.start()).unwrap_or(0);
        format!("{}static {}", &line[..type_start], &line[type_start..])
    })
}

/// Remove `this.` and `Outer.this.` qualifiers
pub fn remove_self_references(text: &str) -> String {
    map_lines(text, |line| {
        if line.trim_start().starts_with("//") {
            line.to_string()
        } else {
            SELF_REFERENCE.replace_all(line, "").into_owned()
        }
    })
}

/// Comment out imports from any of the platform namespaces
pub fn comment_platform_imports(text: &str, namespaces: &[String]) -> String {
    map_lines(text, |line| {
        let Some(caps) = IMPORT_LINE.captures(line) else {
            return line.to_string();
        };
        if is_platform_name(&caps[1], namespaces) {
            format!("// {}", line)
        } else {
            line.to_string()
        }
    })
}

/// Whether `name` lives under one of the namespaces
pub(crate) fn is_platform_name(name: &str, namespaces: &[String]) -> bool {
    namespaces.iter().any(|ns| {
        name.len() > ns.len() && name.starts_with(ns.as_str()) && name.as_bytes()[ns.len()] == b'.'
    })
}

pub(crate) fn map_lines<F>(text: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let (lines, trailing_newline) = split_lines(text);
    let out: Vec<String> = lines.into_iter().map(f).collect();
    join_lines(&out, trailing_newline)
}
