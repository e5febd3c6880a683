//! Integration tests for unpacker synthesis and reflection removal

use apkunbox::analysis::{AnalysisLog, EntryPointResolver};
use apkunbox::config::SynthesisConfig;
use apkunbox::facts::{ClassFact, FactsProvider, PackageFacts, SourceTreeProvider};
use apkunbox::rewrite::{
    rewrite_entry_point, ReflectionRemover, SynthesisError, UnpackerSynthesizer, METHOD_MARKER,
};
use std::path::{Path, PathBuf};

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

const LINE_MARKER: &str = "// Unboxer: Line contains reflection and was commented out";

// ============================================================================
// End-to-end Synthesis
// ============================================================================

mod stub_app {
    use super::*;

    fn synthesize() -> (apkunbox::SynthesizedUnpacker, AnalysisLog) {
        let path = fixtures_path().join("stubapp");
        let facts = SourceTreeProvider::new().load_facts(&path).unwrap();
        let mut log = AnalysisLog::new("stubapp");
        let entry = EntryPointResolver::new().resolve(&facts, Some("com.stub.StubApp"), &mut log);

        let unpacker = UnpackerSynthesizer::new(SynthesisConfig::default())
            .synthesize(entry, &facts, &path, &mut log)
            .expect("synthesis");
        (unpacker, log)
    }

    #[test]
    fn test_names_and_classes() {
        let (unpacker, _) = synthesize();

        assert_eq!(unpacker.class_name, "Unpacker_stubapp");
        assert_eq!(unpacker.qualified_name, "com.stub.Unpacker_stubapp");
        assert_eq!(unpacker.classes, vec!["com.stub.StubApp", "com.stub.Crypto"]);
        assert!(unpacker.unhandled_imports.is_empty());
    }

    #[test]
    fn test_entry_point_becomes_main() {
        let (unpacker, log) = synthesize();
        let src = &unpacker.source;

        assert!(src.contains("public class Unpacker_stubapp {"));
        assert!(!src.contains("extends Application"));
        assert!(!src.contains("@Override"));
        assert!(src.contains("    public static void main(String[] args) {"));
        assert!(src.contains(
            "// super.attachBaseContext(arg_context); // Unboxer: Remove superclass reference"
        ));
        assert!(src.contains("File local_dir = new Context().getFilesDir();"));
        assert!(log.contains("Replaced 1 uses of arg_context in main"));
    }

    #[test]
    fn test_members_renamed_and_static() {
        let (unpacker, _) = synthesize();
        let src = &unpacker.source;

        assert!(src.contains("private static String field_payload = \"classes.jar\";"));
        assert!(src.contains("Crypto.method_decrypt(new File(local_dir, field_payload))"));
        assert!(src.contains("public static File method_decrypt(File arg_input) {"));
        assert!(!src.contains("this."));
    }

    #[test]
    fn test_platform_code_rewritten() {
        let (unpacker, log) = synthesize();
        let src = &unpacker.source;

        assert!(src.contains(
            "java.net.URLClassLoader local_loader = new java.net.URLClassLoader(new java.net.URL[] { new java.io.File(local_jar.getPath()).toURI().toURL() }, getClassLoader());"
        ));
        assert!(src.contains("// package com.stub;"));
        assert!(src.contains("// import dalvik.system.DexClassLoader;"));
        assert!(src.contains("// import android.content.Context;"));
        assert!(src.contains("\nimport java.io.File;"));
        assert!(log.contains("Processing methods from dalvik.system.DexClassLoader import"));
    }

    #[test]
    fn test_reflection_removed() {
        let (unpacker, log) = synthesize();

        assert_eq!(unpacker.removal.commented_lines, 2);
        assert!(unpacker.removal.processed.contains("local_run"));
        assert!(unpacker
            .source
            .contains(&format!("local_run.invoke(null); {}", LINE_MARKER)));
        assert!(log.contains("Found reflective variable: local_run"));
    }
}

// ============================================================================
// Entry Point Rewrite
// ============================================================================

mod entry_point {
    use super::*;

    const THREE_USES: &str = "\
package com.app;

import android.app.Application;
import android.content.Context;

public class App extends Application {
    protected void attachBaseContext(Context c) {
        use(c);
        use(c);
        use(c);
    }

    static void use(Object o) {
    }
}
";

    #[test]
    fn test_three_context_uses() {
        let rewrite = rewrite_entry_point(THREE_USES, "new Context()").unwrap();

        assert_eq!(rewrite.parameter.as_deref(), Some("c"));
        assert_eq!(rewrite.replacements, 3);
        assert_eq!(rewrite.source.matches("use(new Context());").count(), 3);
        assert!(rewrite.source.contains("    public static void main(String[] args) {"));
        assert!(!rewrite.source.contains("(c)"));
    }

    #[test]
    fn test_three_context_uses_through_synthesis() {
        let facts = PackageFacts::new(vec![ClassFact::new("com.app.App", THREE_USES)
            .with_superclass("android.app.Application")
            .with_imports(vec![
                "android.app.Application".to_string(),
                "android.content.Context".to_string(),
            ])]);
        let mut log = AnalysisLog::new("three");
        let entry = facts.find_class("com.app.App");

        let unpacker = UnpackerSynthesizer::new(SynthesisConfig::default())
            .synthesize(entry, &facts, Path::new("/apks/three.apk"), &mut log)
            .unwrap();

        assert_eq!(unpacker.source.matches("method_use(new Context());").count(), 3);
        assert!(!unpacker.source.contains("arg_c"));
        assert!(log.contains("Replaced 3 uses of arg_c in main"));
    }

    #[test]
    fn test_missing_entry_point() {
        let facts = PackageFacts::new(vec![ClassFact::new("com.app.Main", "class Main {}")]);
        let mut log = AnalysisLog::new("none");

        let err = UnpackerSynthesizer::new(SynthesisConfig::default())
            .synthesize(None, &facts, Path::new("none.apk"), &mut log)
            .unwrap_err();

        assert!(matches!(err, SynthesisError::ResolutionMiss));
    }
}

// ============================================================================
// Reflection Remover
// ============================================================================

mod remover {
    use super::*;

    const FOR_NAME: &str = "\
class Loader {
    static Class find(String name) {
        return Class.forName(name);
    }

    static int size() {
        return 4;
    }
}
";

    #[test]
    fn test_sole_reflective_return() {
        let mut log = AnalysisLog::new("t");
        let (out, report) = ReflectionRemover::new().remove(FOR_NAME, &mut log).unwrap();

        assert_eq!(report.removed_methods, vec!["find"]);
        assert_eq!(report.tainted, vec!["find"]);
        assert_eq!(report.processed.len(), 1);
        assert!(out.contains("// Unboxer         return Class.forName(name);"));
        assert!(out.contains(METHOD_MARKER));
        assert!(out.contains("    static int size() {\n        return 4;\n    }"));
        assert!(log.contains("Removing reflective method: find"));
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let source = "\
class A {
    static void run(Object target) {
        Object m = target.getClass().getMethod(\"go\");
        Object r = m.invoke(target);
        if (r != null) {
            System.out.println(r);
        }
    }
}
";
        let remover = ReflectionRemover::new();
        let mut log = AnalysisLog::new("t");

        let (once, first) = remover.remove(source, &mut log).unwrap();
        let (twice, second) = remover.remove(&once, &mut log).unwrap();

        assert!(first.hits() > 0);
        assert_eq!(second.hits(), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_commented_source_untouched() {
        let source = "// Class.forName(x);\n// m.invoke(null);\n";
        let mut log = AnalysisLog::new("t");

        let (out, report) = ReflectionRemover::new().remove(source, &mut log).unwrap();

        assert_eq!(out, source);
        assert_eq!(report.hits(), 0);
    }
}
