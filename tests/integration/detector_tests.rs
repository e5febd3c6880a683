//! Integration tests for the detection stages
//!
//! These tests run each detector against the on-disk fixtures and against
//! small hand-built packages.

use apkunbox::analysis::detectors::{DclDetector, Detector, ReflectionDetector};
use apkunbox::analysis::{
    AnalysisLog, AppScope, DependencyCollector, EntryPointResolver, PackingDetector,
};
use apkunbox::facts::{ClassFact, FactsProvider, PackageFacts, SourceTreeProvider};
use apkunbox::parser::xml::ManifestParser;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Get the path to the test fixtures directory
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(name: &str) -> PackageFacts {
    let path = fixtures_path().join(name);
    if !path.exists() {
        panic!("Fixture not found: {:?}", path);
    }
    SourceTreeProvider::new()
        .load_facts(&path)
        .expect("Failed to load fixture")
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Packing Detection Tests
// ============================================================================

mod packing_tests {
    use super::*;

    #[test]
    fn test_missing_declared_class() {
        let report = PackingDetector::new().detect(
            &set(&["com/app/Foo.class"]),
            &set(&["com/app/Bar.class"]),
        );

        assert_eq!(report.missing_classes, vec!["com/app/Foo.class"]);
        assert!(report.is_packed());
    }

    #[test]
    fn test_all_declared_present() {
        let report = PackingDetector::new().detect(
            &set(&["com/app/Main.class"]),
            &set(&["com/app/Main.class", "com/app/Other.class"]),
        );

        assert!(report.missing_classes.is_empty());
        assert!(!report.is_packed());
    }

    #[test]
    fn test_fixture_manifest_against_payload() {
        let facts = load_fixture("stubapp");
        let manifest = ManifestParser::new().parse(facts.resource_text("AndroidManifest.xml").unwrap());

        let report = PackingDetector::new().detect(&manifest.component_classes, &facts.payload_classes());

        assert_eq!(
            report.missing_classes,
            vec!["com/app/MainActivity.class", "com/app/SyncService.class"]
        );
        assert_eq!(manifest.application_class.as_deref(), Some("com.stub.StubApp"));
    }
}

// ============================================================================
// Keyword Detector Tests
// ============================================================================

mod keyword_tests {
    use super::*;

    #[test]
    fn test_repeated_loader_listed_once() {
        let classes = vec![ClassFact::new(
            "com.app.Loader",
            "DexClassLoader a; DexClassLoader b = new DexClassLoader(p, o, l, c);",
        )];
        let scope = AppScope::new("com.app", None);
        let mut log = AnalysisLog::new("t");

        let report = DclDetector::new().detect(&classes, &scope, &mut log);

        assert!(report.used);
        assert!(report.in_app);
        assert_eq!(report.packages.len(), 1);
    }

    #[test]
    fn test_clean_sources_report_nothing() {
        let classes = vec![ClassFact::new("com.app.Main", "class Main { void run() {} }")];
        let scope = AppScope::new("com.app", None);
        let mut log = AnalysisLog::new("t");

        let dcl = DclDetector::new().detect(&classes, &scope, &mut log);
        let reflection = ReflectionDetector::new().detect(&classes, &scope, &mut log);

        assert!(!dcl.used && dcl.packages.is_empty());
        assert!(!reflection.used && reflection.packages.is_empty());
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_fixture_reflection_scoping() {
        let facts = load_fixture("stubapp");
        let scope = AppScope::new("com.app", Some("com.stub".to_string()));
        let mut log = AnalysisLog::new("stubapp");

        let report = ReflectionDetector::new().detect(&facts.classes, &scope, &mut log);

        assert_eq!(report.packages, set(&["com.lib", "com.stub"]));
        assert!(report.in_app);
        assert!(log.contains("Found reflective keyword 'forName' in class 'com.lib.Tracker'"));
    }

    #[test]
    fn test_library_reflection_not_in_app() {
        let facts = load_fixture("plainapp");
        let scope = AppScope::new("com.plain", None);
        let mut log = AnalysisLog::new("plainapp");

        let report = ReflectionDetector::new().detect(&facts.classes, &scope, &mut log);

        assert!(report.used);
        assert!(!report.in_app);
        assert_eq!(report.packages, set(&["com.google.gson"]));
    }
}

// ============================================================================
// Entry Point and Dependency Tests
// ============================================================================

mod entry_point_tests {
    use super::*;

    #[test]
    fn test_fixture_entry_point() {
        let facts = load_fixture("stubapp");
        let mut log = AnalysisLog::new("stubapp");

        let entry = EntryPointResolver::new()
            .resolve(&facts, None, &mut log)
            .expect("entry point");

        assert_eq!(entry.name, "com.stub.StubApp");
        assert!(log.contains("Found Application subclass: com.stub.StubApp"));
    }

    #[test]
    fn test_no_entry_point_in_plain_app() {
        let facts = load_fixture("plainapp");
        let mut log = AnalysisLog::new("plainapp");

        assert!(EntryPointResolver::new().resolve(&facts, None, &mut log).is_none());
    }

    #[test]
    fn test_dependencies_stay_in_package() {
        let facts = load_fixture("stubapp");
        let mut log = AnalysisLog::new("stubapp");
        let entry = facts.find_class("com.stub.StubApp").unwrap();

        let classes = DependencyCollector::new().collect(entry, &facts, &mut log);
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["com.stub.StubApp", "com.stub.Crypto"]);
        assert!(!names.contains(&"com.stub.R"));
        assert!(!names.contains(&"com.lib.Tracker"));
    }
}
