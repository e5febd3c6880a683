// Input package discovery

use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// How a package reached the input directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// A raw `.apk`, decompiled on demand
    Apk,
    /// A directory a decompiler already wrote
    Decompiled,
}

impl PackageKind {
    /// Classify a direct child of the input directory
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.is_file() {
            let extension = path.extension()?.to_str()?;
            return extension.eq_ignore_ascii_case("apk").then_some(PackageKind::Apk);
        }
        if path.is_dir()
            && (path.join("sources").is_dir()
                || path.join("resources").join("AndroidManifest.xml").is_file())
        {
            return Some(PackageKind::Decompiled);
        }
        None
    }
}

/// One package to analyze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInput {
    pub path: PathBuf,
    pub kind: PackageKind,
}

impl PackageInput {
    /// File stem, used to name every artifact of this package
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Name the blacklist is matched against; directories match as if
    /// they were still `.apk` files
    fn match_name(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        match self.kind {
            PackageKind::Apk => name,
            PackageKind::Decompiled => format!("{}.apk", name),
        }
    }
}

/// Finds the packages directly inside an input directory
#[derive(Debug, Default)]
pub struct PackageFinder {
    blacklist: Vec<String>,
}

impl PackageFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blacklist(mut self, blacklist: Vec<String>) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// All packages in `dir`, sorted by path, blacklisted ones removed
    pub fn find(&self, dir: &Path) -> Result<Vec<PackageInput>> {
        debug!("Scanning for packages in: {}", dir.display());

        if !dir.is_dir() {
            return Err(miette::miette!(
                "Input directory does not exist: {}",
                dir.display()
            ));
        }

        let mut packages = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to list {}", dir.display()))?;
            let path = entry.path();

            let Some(kind) = PackageKind::from_path(path) else {
                trace!("Skipping: {}", path.display());
                continue;
            };
            let input = PackageInput {
                path: path.to_path_buf(),
                kind,
            };
            if self.is_blacklisted(&input) {
                debug!("Blacklisted: {}", path.display());
                continue;
            }
            trace!("Found {:?}: {}", kind, path.display());
            packages.push(input);
        }

        packages.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Found {} packages", packages.len());
        Ok(packages)
    }

    fn is_blacklisted(&self, input: &PackageInput) -> bool {
        let name = input.match_name();
        self.blacklist.iter().any(|entry| *entry == name)
    }
}

/// Read a blacklist file
///
/// Each non-empty line names a previously processed file, usually a result
/// or log written as `<stem>.txt`. Its three-character extension is swapped
/// for `apk` and the entry then matches exactly one package file name.
/// Lines without a stem and such an extension are skipped.
pub fn load_blacklist(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read blacklist: {}", path.display()))?;

    let mut entries = Vec::new();
    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match to_package_name(line) {
            Some(name) => entries.push(name),
            None => warn!("Ignoring blacklist line without a file name: {}", line),
        }
    }
    Ok(entries)
}

fn to_package_name(line: &str) -> Option<String> {
    let cut = line.char_indices().rev().nth(2).map(|(i, _)| i)?;
    let stem = line[..cut].strip_suffix('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}.apk", stem))
}
