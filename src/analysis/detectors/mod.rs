// Keyword detectors over decompiled class sources

mod dcl;
mod reflection;

pub use dcl::{DclDetector, DCL_KEYWORDS};
pub use reflection::{ReflectionDetector, REFLECTION_KEYWORDS};

use super::{AnalysisLog, AppScope};
use crate::facts::ClassFact;
use std::collections::BTreeSet;

/// What a detector found in one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    pub used: bool,
    pub in_app: bool,
    /// Packages of the classes that hit, sorted and deduplicated
    pub packages: BTreeSet<String>,
}

impl DetectionReport {
    /// Record a hit in `package`
    pub fn record(&mut self, package: &str, scope: &AppScope) {
        self.used = true;
        if scope.contains(package) {
            self.in_app = true;
        }
        self.packages.insert(package.to_string());
    }
}

/// Trait for package-level detectors
pub trait Detector {
    /// Scan the classes and report the packages that hit
    fn detect(&self, classes: &[ClassFact], scope: &AppScope, log: &mut AnalysisLog)
        -> DetectionReport;
}

/// Substring scan against a fixed vocabulary
///
/// A keyword anywhere in the source text,
/// comments included, counts as a hit for the class's package.
pub(crate) struct KeywordDetector {
    keywords: &'static [&'static str],
    /// Word used in the log line, e.g. "dcl"
    label: &'static str,
}

impl KeywordDetector {
    pub(crate) const fn new(keywords: &'static [&'static str], label: &'static str) -> Self {
        Self { keywords, label }
    }
}

impl Detector for KeywordDetector {
    fn detect(
        &self,
        classes: &[ClassFact],
        scope: &AppScope,
        log: &mut AnalysisLog,
    ) -> DetectionReport {
        let mut report = DetectionReport::default();

        for class in classes {
            for keyword in self.keywords {
                if class.source.contains(keyword) {
                    log.log(format!(
                        "Found {} keyword '{}' in class '{}'",
                        self.label, keyword, class.name
                    ));
                    report.record(&class.package, scope);
                }
            }
        }

        report
    }
}
