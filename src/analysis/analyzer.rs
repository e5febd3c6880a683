use super::detectors::{DclDetector, DetectionReport, Detector, ReflectionDetector};
use super::{
    AnalysisLog, AnalysisResult, AppScope, EntryPointResolver, PackerType, PackingDetector,
};
use crate::config::Config;
use crate::facts::{DecompilationError, FactsProvider, MANIFEST_RESOURCE};
use crate::parser::xml::{ManifestParser, ManifestSummary};
use crate::rewrite::{SynthesisError, SynthesizedUnpacker, UnpackerSynthesizer};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Decompilation(#[from] DecompilationError),
    #[error("Analysis cancelled")]
    Cancelled,
}

/// Everything learned about one package
#[derive(Debug, Clone)]
pub struct PackageReport {
    pub result: AnalysisResult,
    /// Declared-but-absent classes, `a/b/C.class` form
    pub missing_classes: Vec<String>,
    /// Absent when synthesis was disabled, skipped or failed
    pub synthesis: Option<SynthesizedUnpacker>,
    /// Why `synthesis` is absent, when it was attempted
    pub synthesis_error: Option<String>,
}

impl PackageReport {
    pub fn is_packed(&self) -> bool {
        !self.missing_classes.is_empty()
    }
}

/// Runs the detection pipeline on one package at a time
///
/// The stages run strictly in order. Between stages the cancel flag is
/// checked so a timed-out package stops at the next boundary.
pub struct Analyzer {
    config: Config,
    provider: Arc<dyn FactsProvider>,
    cancel: Arc<AtomicBool>,
}

impl Analyzer {
    pub fn new(config: Config, provider: Arc<dyn FactsProvider>) -> Self {
        Self {
            config,
            provider,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    fn check_cancelled(&self) -> Result<(), AnalysisError> {
        if self.cancel.load(Ordering::Relaxed) {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn analyze(
        &self,
        package_path: &Path,
        log: &mut AnalysisLog,
    ) -> Result<PackageReport, AnalysisError> {
        log.log(format!("Loading APK: {}", package_path.display()));
        let facts = self.provider.load_facts(package_path)?;
        self.check_cancelled()?;

        let manifest = facts
            .resource_text(MANIFEST_RESOURCE)
            .map(|text| ManifestParser::new().parse(text))
            .unwrap_or_else(|| {
                log.error("No AndroidManifest.xml in package");
                ManifestSummary::default()
            });

        let package_name = manifest
            .package
            .clone()
            .unwrap_or_else(|| file_stem(package_path));
        log.log(format!("Package name: {}", package_name));
        let mut result = AnalysisResult::new(package_name.clone());

        let entry = EntryPointResolver::new().resolve(
            &facts,
            manifest.application_class.as_deref(),
            log,
        );
        if let Some(entry) = entry {
            if !entry.package.is_empty() {
                result.application_subclass_package_name = Some(entry.package.clone());
            }
        }
        let scope = AppScope::new(
            package_name.clone(),
            result.application_subclass_package_name.clone(),
        );

        // Packing
        let packing =
            PackingDetector::new().detect(&manifest.component_classes, &facts.payload_classes());
        let mut report = PackageReport {
            result,
            missing_classes: packing.missing_classes.clone(),
            synthesis: None,
            synthesis_error: None,
        };

        if packing.is_packed() {
            log.log("APK is packed");
            log.list("Missing classes in dex", &packing.missing_classes);
        } else {
            log.log("APK is not packed");
            if !self.config.continue_unpacked {
                return Ok(report);
            }
        }
        self.check_cancelled()?;

        // Dynamic code loading
        let dcl = DclDetector::new().detect(&facts.classes, &scope, log);
        report.result.apply_dcl(&dcl);
        log.list("DCL packages", &dcl.packages);
        if packing.is_packed() {
            report.result.packer = if dcl.packages.is_empty() {
                PackerType::Native
            } else {
                PackerType::Managed
            };
        }
        log.log(format!("Packer Type: {}", report.result.packer));
        self.check_cancelled()?;

        // Unpacker synthesis
        if self.config.synthesize {
            let synthesizer = UnpackerSynthesizer::new(self.config.synthesis.clone());
            match synthesizer.synthesize(entry, &facts, package_path, log) {
                Ok(unpacker) => {
                    if unpacker.removal.hits() > 0 {
                        if let Some(entry) = entry {
                            let mut removed = DetectionReport::default();
                            removed.record(&entry.package, &scope);
                            report.result.apply_reflection(&removed);
                        }
                    }
                    info!("Synthesized {}", unpacker.qualified_name);
                    report.synthesis = Some(unpacker);
                }
                Err(SynthesisError::ResolutionMiss) => {
                    log.log("No Application subclass found in the APK");
                    report.synthesis_error = Some(SynthesisError::ResolutionMiss.to_string());
                }
                Err(e) => {
                    log.error(format!("Error generating unpacker: {}", e));
                    report.synthesis_error = Some(e.to_string());
                }
            }
            self.check_cancelled()?;
        }

        // Reflection
        let reflection = ReflectionDetector::new().detect(&facts.classes, &scope, log);
        report.result.apply_reflection(&reflection);
        log.list("Reflective packages", report.result.reflective_packages());

        debug!(
            "{}: packer={} dcl={} reflection={}",
            package_name,
            report.result.packer,
            report.result.uses_dcl,
            report.result.uses_reflection
        );

        Ok(report)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
