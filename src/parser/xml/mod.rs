mod manifest;

pub use manifest::{normalize_class_name, ManifestParser, ManifestSummary};
