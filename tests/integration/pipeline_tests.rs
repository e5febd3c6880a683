//! End-to-end pipeline tests over decompiled fixture packages

use apkunbox::analysis::{AnalysisLog, Analyzer, PackerType};
use apkunbox::batch::{BatchRunner, OutputLayout, PackageOutcome, TABLE_FILE};
use apkunbox::config::Config;
use apkunbox::discovery::PackageFinder;
use apkunbox::facts::SourceTreeProvider;
use apkunbox::report::JsonReporter;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn analyzer(config: Config) -> Analyzer {
    Analyzer::new(config, Arc::new(SourceTreeProvider::new()))
}

#[test]
fn test_packed_stub_app() {
    let mut log = AnalysisLog::new("stubapp");
    let report = analyzer(Config::default())
        .analyze(&fixtures_path().join("stubapp"), &mut log)
        .unwrap();
    let result = &report.result;

    assert!(report.is_packed());
    assert_eq!(result.package_name, "com.app");
    assert_eq!(result.application_subclass_package_name.as_deref(), Some("com.stub"));
    assert_eq!(result.packer, PackerType::Managed);
    assert!(result.uses_dcl && result.dcl_in_app);
    assert!(result.uses_reflection && result.reflection_in_app);
    assert_eq!(result.dcl_packages(), vec!["com.stub"]);
    assert_eq!(result.reflective_packages(), vec!["com.lib", "com.stub"]);
    assert!(report.synthesis.is_some());

    assert_eq!(
        result.file_representation(),
        "package_name=com.app\n\
         application_subclass_package_name=com.stub\n\
         packer_type=MANAGED\n\
         reflection=YES\n\
         dcl=YES\n\
         reflection_in_app=YES\n\
         dcl_in_app=YES\n\
         reflective_package_name=com.lib\n\
         reflective_package_name=com.stub\n\
         dcl_package_name=com.stub\n"
    );
}

#[test]
fn test_stub_app_log_vocabulary() {
    let mut log = AnalysisLog::new("stubapp");
    analyzer(Config::default())
        .analyze(&fixtures_path().join("stubapp"), &mut log)
        .unwrap();
    let contents = log.contents();

    assert!(contents.contains("APK is packed"));
    assert!(contents.contains(
        "[BEGIN_LIST] Missing classes in dex\ncom/app/MainActivity.class\ncom/app/SyncService.class\n[END_LIST] Missing classes in dex"
    ));
    assert!(contents.contains("Packer Type: MANAGED"));
    assert!(contents.contains("Found dcl keyword 'DexClassLoader' in class 'com.stub.StubApp'"));
    assert!(contents.contains("Adding class com.stub.Crypto to referenced classes"));
}

#[test]
fn test_plain_app_keeps_detection_without_synthesis() {
    let mut log = AnalysisLog::new("plainapp");
    let report = analyzer(Config::default())
        .analyze(&fixtures_path().join("plainapp"), &mut log)
        .unwrap();
    let result = &report.result;

    assert!(!report.is_packed());
    assert_eq!(result.packer, PackerType::None);
    assert!(result.application_subclass_package_name.is_none());
    assert!(result.uses_reflection);
    assert!(!result.reflection_in_app);
    assert!(report.synthesis.is_none());
    assert_eq!(report.synthesis_error.as_deref(), Some("No Application subclass found"));
    assert!(log.contains("No Application subclass found in the APK"));
    assert_eq!(result.tsv_row(), "com.plain\tnull\tNONE\tYES\tNO\tNO\tNO\n");
}

#[test]
fn test_batch_over_fixture_directory() {
    let out = TempDir::new().unwrap();
    let layout = OutputLayout::create_named(out.path(), "run").unwrap();
    let packages = PackageFinder::new().find(&fixtures_path()).unwrap();
    assert_eq!(packages.len(), 2);

    let mut config = Config::default();
    config.threads = 2;
    let summary = BatchRunner::new(config, Arc::new(SourceTreeProvider::new()))
        .with_progress(false)
        .run(&packages, &layout)
        .unwrap();

    assert_eq!(summary.records.len(), 2);
    assert!(summary
        .records
        .iter()
        .all(|r| matches!(r.outcome, PackageOutcome::Completed(_))));
    assert_eq!(summary.packed_count(), 1);

    let table = fs::read_to_string(layout.root().join(TABLE_FILE)).unwrap();
    let rows: Vec<&str> = table.lines().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], "com.plain\tnull\tNONE\tYES\tNO\tNO\tNO");
    assert_eq!(rows[2], "com.app\tcom.stub\tMANAGED\tYES\tYES\tYES\tYES");

    assert!(layout.results_dir().join("stubapp.txt").is_file());
    assert!(layout.logs_dir().join("plainapp.txt").is_file());
    let unpacker = layout
        .unpackers_dir()
        .join("stubapp")
        .join("Unpacker_stubapp.java");
    let source = fs::read_to_string(unpacker).unwrap();
    assert!(source.contains("public static void main(String[] args) {"));

    let json = JsonReporter::new(None).render(&summary).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["summary"]["managed"], 1);
    assert_eq!(value["summary"]["unpackers"], 1);
}

#[test]
fn test_blacklisted_fixture_is_skipped() {
    let packages = PackageFinder::new()
        .with_blacklist(vec!["stubapp.apk".to_string()])
        .find(&fixtures_path())
        .unwrap();

    let names: Vec<String> = packages.iter().map(|p| p.stem()).collect();
    assert_eq!(names, vec!["plainapp"]);
}
