//! apkunbox - Packing detection and unpacker synthesis for Android apps
//!
//! This library decides whether an Android package hides code that is only
//! restored at runtime, characterizes how it does so, and tries to rebuild
//! the unpacking stub as a standalone desktop program.
//!
//! # Architecture
//!
//! The pipeline for each package consists of:
//! 1. **Discovery** - Find `.apk` files and decompiled trees in the input directory
//! 2. **Facts** - Decompile and gather class facts with tree-sitter
//! 3. **Packing Detection** - Diff manifest-declared classes against the payload
//! 4. **DCL Detection** - Scan for dynamic class loading
//! 5. **Unpacker Synthesis** - Rewrite the entry point and its dependencies
//! 6. **Reflection Detection** - Scan for reflective calls
//! 7. **Reporting** - Per-package results, logs, a TSV table and a summary

pub mod analysis;
pub mod batch;
pub mod config;
pub mod discovery;
pub mod facts;
pub mod parser;
pub mod report;
pub mod rewrite;

pub use analysis::{AnalysisLog, AnalysisResult, Analyzer, PackageReport, PackerType};
pub use batch::{BatchRunner, BatchSummary, OutputLayout, PackageOutcome};
pub use config::Config;
pub use discovery::{load_blacklist, PackageFinder};
pub use facts::{ClassFact, FactsProvider, JadxCliProvider, PackageFacts, SourceTreeProvider};
pub use report::{ReportFormat, Reporter};
pub use rewrite::{ReflectionRemover, SynthesizedUnpacker, UnpackerSynthesizer};
