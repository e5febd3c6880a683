//! Per-package analysis: packing, dynamic code loading and reflection
//!
//! [`Analyzer`] runs the stages in order and composes the values returned by
//! each detector into one [`AnalysisResult`]. Detectors never share state.

mod analyzer;
mod dependencies;
mod entry_points;
mod log;
mod packing;
mod result;
pub mod detectors;

pub use analyzer::{AnalysisError, Analyzer, PackageReport};
pub use dependencies::{DependencyCollector, RESOURCE_CLASS};
pub use entry_points::{EntryPointResolver, APPLICATION_BASE_CLASS};
pub use log::AnalysisLog;
pub use packing::{PackingDetector, PackingReport};
pub use result::{AnalysisResult, AppScope, PackerType, TSV_HEADER};
