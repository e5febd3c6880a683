use super::{DetectionReport, Detector, KeywordDetector};
use crate::analysis::{AnalysisLog, AppScope};
use crate::facts::ClassFact;

/// Managed-runtime class loading APIs
pub const DCL_KEYWORDS: &[&str] = &[
    "DexClassLoader",
    "PathClassLoader",
    "InMemoryDexClassLoader",
    "BaseDexClassLoader",
    "loadDex",
    "OpenMemory",
];

/// Detects dynamic code loading
pub struct DclDetector {
    inner: KeywordDetector,
}

impl DclDetector {
    pub fn new() -> Self {
        Self {
            inner: KeywordDetector::new(DCL_KEYWORDS, "dcl"),
        }
    }
}

impl Default for DclDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for DclDetector {
    fn detect(
        &self,
        classes: &[ClassFact],
        scope: &AppScope,
        log: &mut AnalysisLog,
    ) -> DetectionReport {
        self.inner.detect(classes, scope, log)
    }
}
