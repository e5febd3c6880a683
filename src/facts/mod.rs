//! Source facts for one Android package
//!
//! The analysis never looks at bytecode. It consumes the decompiler's view of
//! a package: every top-level class with its package, superclass and source
//! text, plus the decoded manifest. [`FactsProvider`] is the seam between the
//! decompiler and the core.

mod jadx;
mod source_tree;

pub use jadx::JadxCliProvider;
pub use source_tree::SourceTreeProvider;

use crate::parser::xml::normalize_class_name;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Canonical name of the manifest resource
pub const MANIFEST_RESOURCE: &str = "AndroidManifest.xml";

/// Errors raised while turning a package into source facts
#[derive(Error, Debug)]
pub enum DecompilationError {
    #[error("Package not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No decompiled Java sources under {0}")]
    NoSources(PathBuf),
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Decompiler failed on {path}: {message}")]
    Decompiler { path: PathBuf, message: String },
}

/// A decompiled top-level class
///
/// Identity is the fully qualified name; two facts with the same name are the
/// same class regardless of source text.
#[derive(Debug, Clone)]
pub struct ClassFact {
    /// Fully qualified name, e.g. `com.app.App`
    pub name: String,
    /// Package, empty for the default package
    pub package: String,
    /// Simple name, e.g. `App`
    pub simple_name: String,
    /// Superclass, fully qualified when it could be resolved
    pub superclass: Option<String>,
    /// Imports declared by the compilation unit
    pub imports: Vec<String>,
    /// Decompiled source text
    pub source: String,
}

impl ClassFact {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        let (package, simple_name) = match name.rfind('.') {
            Some(idx) => (name[..idx].to_string(), name[idx + 1..].to_string()),
            None => (String::new(), name.clone()),
        };

        Self {
            name,
            package,
            simple_name,
            superclass: None,
            imports: Vec::new(),
            source: source.into(),
        }
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }

    /// Payload form of the class name, `a/b/C.class`
    pub fn raw_name(&self) -> String {
        normalize_class_name(&self.name)
    }
}

impl PartialEq for ClassFact {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassFact {}

impl Hash for ClassFact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Everything the decompiler exposes about one package
#[derive(Debug, Default, Clone)]
pub struct PackageFacts {
    /// Top-level classes, sorted by fully qualified name
    pub classes: Vec<ClassFact>,
    /// Decoded text resources by canonical name
    resources: HashMap<String, String>,
}

impl PackageFacts {
    pub fn new(mut classes: Vec<ClassFact>) -> Self {
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        classes.dedup_by(|a, b| a.name == b.name);
        Self {
            classes,
            resources: HashMap::new(),
        }
    }

    pub fn with_resource(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.resources.insert(name.into(), text.into());
        self
    }

    /// Decoded text of a resource, e.g. [`MANIFEST_RESOURCE`]
    pub fn resource_text(&self, name: &str) -> Option<&str> {
        self.resources.get(name).map(|s| s.as_str())
    }

    /// All payload classes in `a/b/C.class` form
    pub fn payload_classes(&self) -> BTreeSet<String> {
        self.classes.iter().map(|c| c.raw_name()).collect()
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassFact> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// Seam between the decompiler and the analysis core
pub trait FactsProvider: Send + Sync {
    /// Load the source facts for the package at `package_path`
    fn load_facts(&self, package_path: &Path) -> Result<PackageFacts, DecompilationError>;
}
