// Facts provider that runs the jadx CLI on an APK and reads its output

use super::{DecompilationError, FactsProvider, PackageFacts, SourceTreeProvider};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Decompiles `.apk` inputs with jadx, then reads the result as a source tree
///
/// Directories are passed straight to [`SourceTreeProvider`], so a batch may
/// mix raw APKs and packages that were decompiled ahead of time.
pub struct JadxCliProvider {
    /// jadx executable
    jadx: PathBuf,
    /// Where decompiled trees are written, one directory per package
    work_dir: PathBuf,
    tree: SourceTreeProvider,
}

impl JadxCliProvider {
    pub fn new(jadx: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            jadx: jadx.into(),
            work_dir: work_dir.into(),
            tree: SourceTreeProvider::new(),
        }
    }

    fn output_dir(&self, apk: &Path) -> PathBuf {
        let stem = apk
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "package".to_string());
        self.work_dir.join(stem)
    }

    fn decompile(&self, apk: &Path) -> Result<PathBuf, DecompilationError> {
        let out = self.output_dir(apk);
        if out.join("sources").is_dir() {
            debug!("Reusing decompiled tree at {}", out.display());
            return Ok(out);
        }

        info!("Decompiling {} with {}", apk.display(), self.jadx.display());

        let output = Command::new(&self.jadx)
            .arg("-d")
            .arg(&out)
            .arg("--show-bad-code")
            .arg("--deobf")
            .arg(apk)
            .output()
            .map_err(|e| DecompilationError::Decompiler {
                path: apk.to_path_buf(),
                message: format!("could not run {}: {}", self.jadx.display(), e),
            })?;

        // jadx exits non-zero when some methods fail to decompile, which is
        // normal for packed apps. Only a missing tree is fatal.
        if !out.join("sources").is_dir() {
            return Err(DecompilationError::Decompiler {
                path: apk.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(out)
    }
}

impl FactsProvider for JadxCliProvider {
    fn load_facts(&self, package_path: &Path) -> Result<PackageFacts, DecompilationError> {
        if package_path.is_dir() {
            return self.tree.load_facts(package_path);
        }
        if !package_path.is_file() {
            return Err(DecompilationError::NotFound(package_path.to_path_buf()));
        }

        let tree = self.decompile(package_path)?;
        self.tree.load_facts(&tree)
    }
}
