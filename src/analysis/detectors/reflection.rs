use super::{DetectionReport, Detector, KeywordDetector};
use crate::analysis::{AnalysisLog, AppScope};
use crate::facts::ClassFact;

/// Reflection and context-lookup APIs
///
/// Also drives the reflection remover, so the order here is the order the
/// remover visits terms in.
pub const REFLECTION_KEYWORDS: &[&str] = &[
    "getMethod",
    "getDeclaredMethod",
    "invoke",
    "getField",
    "getDeclaredField",
    "setAccessible",
    "forName",
    "newInstance",
    "WeakReference",
    "getApplicationContext",
];

/// Detects reflection use without touching the source
pub struct ReflectionDetector {
    inner: KeywordDetector,
}

impl ReflectionDetector {
    pub fn new() -> Self {
        Self {
            inner: KeywordDetector::new(REFLECTION_KEYWORDS, "reflective"),
        }
    }
}

impl Default for ReflectionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ReflectionDetector {
    fn detect(
        &self,
        classes: &[ClassFact],
        scope: &AppScope,
        log: &mut AnalysisLog,
    ) -> DetectionReport {
        self.inner.detect(classes, scope, log)
    }
}
