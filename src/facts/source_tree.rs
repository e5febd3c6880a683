// Facts provider over a decompiled source tree (jadx output layout)

use super::{ClassFact, DecompilationError, FactsProvider, PackageFacts, MANIFEST_RESOURCE};
use crate::parser::JavaParser;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Reads a directory laid out the way jadx writes it:
///
/// ```text
/// <package>/
///   sources/com/app/App.java
///   resources/AndroidManifest.xml
/// ```
///
/// A directory without `sources/` is scanned as a whole, and the manifest is
/// looked up in `resources/`, then at the root, then anywhere below.
pub struct SourceTreeProvider;

impl SourceTreeProvider {
    pub fn new() -> Self {
        Self
    }

    fn sources_root(&self, dir: &Path) -> PathBuf {
        let sources = dir.join("sources");
        if sources.is_dir() {
            sources
        } else {
            dir.to_path_buf()
        }
    }

    fn find_manifest(&self, dir: &Path) -> Option<PathBuf> {
        let candidates = [
            dir.join("resources").join(MANIFEST_RESOURCE),
            dir.join(MANIFEST_RESOURCE),
        ];
        if let Some(found) = candidates.iter().find(|p| p.is_file()) {
            return Some(found.clone());
        }

        walkdir::WalkDir::new(dir)
            .max_depth(4)
            .into_iter()
            .flatten()
            .find(|e| e.file_type().is_file() && e.file_name() == MANIFEST_RESOURCE)
            .map(|e| e.path().to_path_buf())
    }

    fn java_files(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(root)
            .hidden(true)           // Skip hidden files
            .git_ignore(false)      // Decompiler output has no VCS metadata
            .follow_links(false)    // Don't follow symlinks
            .build();

        let mut files: Vec<PathBuf> = walker
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().map(|e| e == "java").unwrap_or(false))
            .collect();

        // Directory walk order is platform dependent
        files.sort();
        files
    }

    fn read(&self, path: &Path) -> Result<String, DecompilationError> {
        std::fs::read_to_string(path).map_err(|source| DecompilationError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for SourceTreeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FactsProvider for SourceTreeProvider {
    fn load_facts(&self, package_path: &Path) -> Result<PackageFacts, DecompilationError> {
        if !package_path.is_dir() {
            return Err(DecompilationError::NotFound(package_path.to_path_buf()));
        }

        let root = self.sources_root(package_path);
        let mut parser = JavaParser::new().map_err(|e| DecompilationError::Parse {
            path: root.clone(),
            message: e.to_string(),
        })?;

        let mut classes = Vec::new();
        for file in self.java_files(&root) {
            let contents = self.read(&file)?;
            let unit = match parser.parse(&file, &contents) {
                Ok(unit) => unit,
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    continue;
                }
            };

            for decl in &unit.types {
                let mut fact = ClassFact::new(unit.qualify(&decl.name), contents.clone())
                    .with_imports(unit.imports.clone());
                fact.superclass = decl.superclass.clone();
                trace!("Class fact: {} extends {:?}", fact.name, fact.superclass);
                classes.push(fact);
            }
        }

        if classes.is_empty() {
            return Err(DecompilationError::NoSources(root));
        }

        let mut facts = PackageFacts::new(classes);
        if let Some(manifest) = self.find_manifest(package_path) {
            facts = facts.with_resource(MANIFEST_RESOURCE, self.read(&manifest)?);
        } else {
            debug!("No manifest found under {}", package_path.display());
        }

        debug!(
            "Loaded {} classes from {}",
            facts.classes.len(),
            package_path.display()
        );

        Ok(facts)
    }
}
