//! Packing detection
//!
//! ## Detection Algorithm
//!
//! A packed app declares components in its manifest whose classes are not in
//! the payload; they only appear once the unpacking stub has run. The check is
//! a plain set difference over `a/b/C.class` names:
//!
//! ```text
//! missing = declared - payload
//! packed  = !missing.is_empty()
//! ```

use std::collections::BTreeSet;

/// Declared-but-absent classes for one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackingReport {
    /// Sorted, in `a/b/C.class` form
    pub missing_classes: Vec<String>,
}

impl PackingReport {
    pub fn is_packed(&self) -> bool {
        !self.missing_classes.is_empty()
    }
}

pub struct PackingDetector;

impl PackingDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, declared: &BTreeSet<String>, payload: &BTreeSet<String>) -> PackingReport {
        PackingReport {
            missing_classes: declared.difference(payload).cloned().collect(),
        }
    }
}

impl Default for PackingDetector {
    fn default() -> Self {
        Self::new()
    }
}
