use crate::analysis::PackerType;
use crate::batch::{BatchSummary, PackageOutcome};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

/// File name of the JSON report inside the run directory
pub const SUMMARY_FILE: &str = "summary.json";

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, summary: &BatchSummary) -> Result<()> {
        let json = self.render(summary)?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json).into_diagnostic()?;
            println!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }

    pub fn render(&self, summary: &BatchSummary) -> Result<String> {
        let report = JsonReport::from_summary(summary);
        serde_json::to_string_pretty(&report).into_diagnostic()
    }
}

#[derive(Serialize)]
struct JsonReport {
    version: &'static str,
    output_dir: String,
    elapsed_secs: f64,
    packages: Vec<JsonPackage>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonPackage {
    path: String,
    outcome: &'static str,
    elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonResult>,
}

#[derive(Serialize)]
struct JsonResult {
    package_name: String,
    application_subclass_package_name: Option<String>,
    packer_type: PackerType,
    packed: bool,
    missing_classes: Vec<String>,
    reflection: bool,
    dcl: bool,
    reflection_in_app: bool,
    dcl_in_app: bool,
    reflective_packages: Vec<String>,
    dcl_packages: Vec<String>,
    synthesis: JsonSynthesis,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JsonSynthesis {
    Present {
        class_name: String,
        classes: Vec<String>,
        unhandled_imports: Vec<String>,
        removed_methods: usize,
        commented_lines: usize,
        path: Option<String>,
    },
    Absent {
        reason: Option<String>,
    },
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    completed: usize,
    packed: usize,
    managed: usize,
    native: usize,
    failed: usize,
    timed_out: usize,
    unpackers: usize,
}

impl JsonReport {
    fn from_summary(summary: &BatchSummary) -> Self {
        let mut counts = JsonSummary {
            total: summary.records.len(),
            completed: 0,
            packed: summary.packed_count(),
            managed: 0,
            native: 0,
            failed: summary.failed_count(),
            timed_out: summary.timed_out_count(),
            unpackers: 0,
        };

        let packages = summary
            .records
            .iter()
            .map(|record| {
                let (error, result) = match &record.outcome {
                    PackageOutcome::Completed(report) => {
                        counts.completed += 1;
                        match report.result.packer {
                            PackerType::Managed => counts.managed += 1,
                            PackerType::Native => counts.native += 1,
                            PackerType::None => {}
                        }
                        let synthesis = match &report.synthesis {
                            Some(unpacker) => {
                                counts.unpackers += 1;
                                JsonSynthesis::Present {
                                    class_name: unpacker.qualified_name.clone(),
                                    classes: unpacker.classes.clone(),
                                    unhandled_imports: unpacker.unhandled_imports.clone(),
                                    removed_methods: unpacker.removal.removed_methods.len(),
                                    commented_lines: unpacker.removal.commented_lines,
                                    path: record
                                        .unpacker_path
                                        .as_ref()
                                        .map(|p| p.to_string_lossy().to_string()),
                                }
                            }
                            None => JsonSynthesis::Absent {
                                reason: report.synthesis_error.clone(),
                            },
                        };
                        let r = &report.result;
                        let result = JsonResult {
                            package_name: r.package_name.clone(),
                            application_subclass_package_name: r
                                .application_subclass_package_name
                                .clone(),
                            packer_type: r.packer,
                            packed: report.is_packed(),
                            missing_classes: report.missing_classes.clone(),
                            reflection: r.uses_reflection,
                            dcl: r.uses_dcl,
                            reflection_in_app: r.reflection_in_app,
                            dcl_in_app: r.dcl_in_app,
                            reflective_packages: r.reflective_packages(),
                            dcl_packages: r.dcl_packages(),
                            synthesis,
                        };
                        (None, Some(result))
                    }
                    PackageOutcome::Failed(message) => (Some(message.clone()), None),
                    PackageOutcome::TimedOut => (Some("timeout".to_string()), None),
                };

                JsonPackage {
                    path: record.input.path.to_string_lossy().to_string(),
                    outcome: record.outcome.label(),
                    elapsed_secs: record.elapsed.as_secs_f64(),
                    error,
                    result,
                }
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION"),
            output_dir: summary.output_dir.to_string_lossy().to_string(),
            elapsed_secs: summary.elapsed.as_secs_f64(),
            packages,
            summary: counts,
        }
    }
}
