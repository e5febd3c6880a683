// Platform import substitution table

use super::is_comment_or_import;
use super::stages::{is_platform_name, map_lines};
use crate::analysis::AnalysisLog;
use lazy_static::lazy_static;
use regex::{Captures, NoExpand, Regex};
use std::collections::HashMap;

/// Values the rewrite rules may need
#[derive(Debug, Clone)]
pub struct RuleContext {
    /// Path of the analyzed package, baked in for `sourceDir`
    pub package_path: String,
    /// Reported `Build.VERSION.SDK_INT`
    pub sdk_int: u32,
}

type Rule = fn(&str, &RuleContext) -> String;

/// Rewrites class bodies according to the platform imports they declare
///
/// Imports with no rule are reported as unhandled and left in place; a later
/// stage comments them out.
pub struct ImportSubstitutions {
    rules: HashMap<&'static str, Option<Rule>>,
    namespaces: Vec<String>,
}

impl ImportSubstitutions {
    pub fn new(namespaces: Vec<String>) -> Self {
        let mut rules: HashMap<&'static str, Option<Rule>> = HashMap::new();
        rules.insert("dalvik.system.DexClassLoader", Some(class_loader as Rule));
        rules.insert("dalvik.system.PathClassLoader", Some(class_loader as Rule));
        rules.insert("android.os.Build", Some(build_constants as Rule));
        rules.insert("android.content.pm.ApplicationInfo", Some(application_info as Rule));
        rules.insert("android.util.ArrayMap", Some(array_map as Rule));
        // Handled by the entry-point stages for every class
        rules.insert("android.app.Application", None);
        rules.insert("android.content.Context", None);

        Self { rules, namespaces }
    }

    /// Apply the rules for each platform import to `text`
    ///
    /// Rules see one code line at a time; import and comment lines are left
    /// alone. Returns the rewritten text and the imports that had no rule.
    pub fn apply(
        &self,
        text: &str,
        imports: &[String],
        context: &RuleContext,
        log: &mut AnalysisLog,
    ) -> (String, Vec<String>) {
        let mut text = text.to_string();
        let mut unhandled = Vec::new();

        for import in imports {
            if !is_platform_name(import, &self.namespaces) {
                continue;
            }
            match self.rules.get(import.as_str()) {
                Some(Some(rule)) => {
                    log.log(format!("Processing methods from {} import", import));
                    text = map_lines(&text, |line| {
                        if is_comment_or_import(line) {
                            line.to_string()
                        } else {
                            rule(line, context)
                        }
                    });
                }
                Some(None) => {}
                None => {
                    log.error(format!("Unknown android import: {}", import));
                    unhandled.push(import.clone());
                }
            }
        }

        (text, unhandled)
    }
}

lazy_static! {
    static ref LOADER_CONSTRUCTION: Regex = Regex::new(r"new\s+(?:DexClassLoader|PathClassLoader)\s*\(((?:[^()]|\([^()]*\))*)\)")
        .expect("failed to compile class loader construction regex");
    static ref LOADER_TYPE: Regex = Regex::new(r"\b(?:DexClassLoader|PathClassLoader)\b")
        .expect("failed to compile class loader type regex");
    static ref SOURCE_DIR: Regex = Regex::new(r"(?:[\w$]+(?:\(\))?\.)+(?:publicSourceDir|sourceDir)\b")
        .expect("failed to compile sourceDir regex");
    static ref DATA_DIR: Regex = Regex::new(r"(?:[\w$]+(?:\(\))?\.)+dataDir\b")
        .expect("failed to compile dataDir regex");
    static ref ARRAY_MAP_TYPE: Regex = Regex::new(r"\bArrayMap\b")
        .expect("failed to compile ArrayMap regex");
}

/// `new DexClassLoader(path, ..., parent)` -> `URLClassLoader` over the same path
fn class_loader(text: &str, _context: &RuleContext) -> String {
    let constructed = LOADER_CONSTRUCTION.replace_all(text, |caps: &Captures| {
        let args = split_arguments(&caps[1]);
        let path = args.first().map(String::as_str).unwrap_or("\"\"");
        let parent = if args.len() > 1 {
            args.last().map(String::as_str).unwrap_or("null")
        } else {
            "ClassLoader.getSystemClassLoader()"
        };
        format!(
            "new java.net.URLClassLoader(new java.net.URL[] {{ new java.io.File({}).toURI().toURL() }}, {})",
            path, parent
        )
    });
    LOADER_TYPE
        .replace_all(&constructed, "java.net.URLClassLoader")
        .into_owned()
}

/// Build constants and the JVM property that stands in for each
const BUILD_CONSTANTS: &[(&str, &str)] = &[
    ("Build.VERSION.RELEASE", "System.getProperty(\"os.version\")"),
    ("Build.SUPPORTED_ABIS", "new String[] { System.getProperty(\"os.arch\") }"),
    ("Build.CPU_ABI", "System.getProperty(\"os.arch\")"),
    ("Build.MANUFACTURER", "System.getProperty(\"java.vendor\")"),
    ("Build.BRAND", "System.getProperty(\"java.vendor\")"),
    ("Build.MODEL", "System.getProperty(\"os.name\")"),
    ("Build.DEVICE", "System.getProperty(\"os.name\")"),
    ("Build.PRODUCT", "System.getProperty(\"os.name\")"),
    ("Build.FINGERPRINT", "System.getProperty(\"java.vm.version\")"),
];

fn build_constants(text: &str, context: &RuleContext) -> String {
    let mut text = text.replace("Build.VERSION.SDK_INT", &context.sdk_int.to_string());
    for (constant, replacement) in BUILD_CONSTANTS {
        if text.contains(constant) {
            if let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(constant))) {
                text = pattern.replace_all(&text, NoExpand(replacement)).into_owned();
            }
        }
    }
    text
}

fn application_info(text: &str, context: &RuleContext) -> String {
    let quoted = format!(
        "\"{}\"",
        context.package_path.replace('\\', "\\\\").replace('"', "\\\"")
    );
    let text = SOURCE_DIR.replace_all(text, NoExpand(&quoted));
    DATA_DIR
        .replace_all(&text, "System.getProperty(\"user.dir\")")
        .into_owned()
}

fn array_map(text: &str, _context: &RuleContext) -> String {
    ARRAY_MAP_TYPE
        .replace_all(text, "java.util.LinkedHashMap")
        .into_owned()
}

/// Split a call's argument list on top-level commas
fn split_arguments(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in args.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RuleContext {
        RuleContext {
            package_path: "/apks/sample.apk".to_string(),
            sdk_int: 30,
        }
    }

    fn namespaces() -> Vec<String> {
        vec!["android".to_string(), "dalvik".to_string()]
    }

    fn imports(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_dex_class_loader() {
        let subs = ImportSubstitutions::new(namespaces());
        let mut log = AnalysisLog::new("t");
        let src = "DexClassLoader l = new DexClassLoader(f.getPath(), dir, null, getClassLoader());";

        let (out, unhandled) = subs.apply(src, &imports(&["dalvik.system.DexClassLoader"]), &context(), &mut log);

        assert!(unhandled.is_empty());
        assert_eq!(
            out,
            "java.net.URLClassLoader l = new java.net.URLClassLoader(new java.net.URL[] { new java.io.File(f.getPath()).toURI().toURL() }, getClassLoader());"
        );
    }

    #[test]
    fn test_build_and_application_info() {
        let subs = ImportSubstitutions::new(namespaces());
        let mut log = AnalysisLog::new("t");
        let src = "if (Build.VERSION.SDK_INT >= 24) { p = getApplicationInfo().sourceDir; d = info.dataDir; m = Build.MODEL; }";

        let (out, _) = subs.apply(
            src,
            &imports(&["android.os.Build", "android.content.pm.ApplicationInfo"]),
            &context(),
            &mut log,
        );

        assert_eq!(
            out,
            "if (30 >= 24) { p = \"/apks/sample.apk\"; d = System.getProperty(\"user.dir\"); m = System.getProperty(\"os.name\"); }"
        );
    }

    #[test]
    fn test_unknown_and_ignored_imports() {
        let subs = ImportSubstitutions::new(namespaces());
        let mut log = AnalysisLog::new("t");

        let (out, unhandled) = subs.apply(
            "ArrayMap m; Looper l;",
            &imports(&[
                "android.content.Context",
                "android.os.Looper",
                "android.util.ArrayMap",
                "java.util.List",
            ]),
            &context(),
            &mut log,
        );

        assert_eq!(out, "java.util.LinkedHashMap m; Looper l;");
        assert_eq!(unhandled, vec!["android.os.Looper"]);
        assert!(log.contains("ERROR: Unknown android import: android.os.Looper"));
    }

    #[test]
    fn test_import_lines_untouched() {
        let subs = ImportSubstitutions::new(namespaces());
        let mut log = AnalysisLog::new("t");
        let src = "import dalvik.system.DexClassLoader;\n// DexClassLoader old;\nDexClassLoader l;\n";

        let (out, _) = subs.apply(src, &imports(&["dalvik.system.DexClassLoader"]), &context(), &mut log);

        assert_eq!(
            out,
            "import dalvik.system.DexClassLoader;\n// DexClassLoader old;\njava.net.URLClassLoader l;\n"
        );
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(
            split_arguments("a(b, c), new int[] {1, 2}, d"),
            vec!["a(b, c)", "new int[] {1, 2}", "d"]
        );
    }
}
