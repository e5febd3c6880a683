// On-disk layout of a batch run

use crate::analysis::{AnalysisLog, AnalysisResult, TSV_HEADER};
use crate::rewrite::SynthesizedUnpacker;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the summary table in the run directory
pub const TABLE_FILE: &str = "combined_table.tsv";

/// ```text
/// <out>/unboxing_results_<unix-secs>/
///   results/<stem>.txt
///   logs/<stem>.txt
///   unpackers/<stem>/<ClassName>.java
///   decompiled/<stem>/...
///   combined_table.tsv
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Create a fresh run directory under `out`
    pub fn create(out: &Path) -> Result<Self> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::create_named(out, &format!("unboxing_results_{}", secs))
    }

    pub fn create_named(out: &Path, name: &str) -> Result<Self> {
        let layout = Self {
            root: out.join(name),
        };
        for dir in [layout.results_dir(), layout.logs_dir()] {
            fs::create_dir_all(&dir)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn unpackers_dir(&self) -> PathBuf {
        self.root.join("unpackers")
    }

    /// Where `.apk` inputs are decompiled to
    pub fn decompiled_dir(&self) -> PathBuf {
        self.root.join("decompiled")
    }

    pub fn table_path(&self) -> PathBuf {
        self.root.join(TABLE_FILE)
    }

    pub fn write_result(&self, stem: &str, result: &AnalysisResult) -> Result<()> {
        write(&self.results_dir().join(format!("{}.txt", stem)), &result.file_representation())
    }

    pub fn write_log(&self, stem: &str, log: &AnalysisLog) -> Result<()> {
        write(&self.logs_dir().join(format!("{}.txt", stem)), &log.contents())
    }

    /// Returns the path the source was written to
    pub fn write_unpacker(&self, stem: &str, unpacker: &SynthesizedUnpacker) -> Result<PathBuf> {
        let dir = self.unpackers_dir().join(stem);
        fs::create_dir_all(&dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(format!("{}.java", unpacker.class_name));
        write(&path, &unpacker.source)?;
        Ok(path)
    }

    /// Header plus one row per result
    pub fn write_table<'a, I>(&self, results: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a AnalysisResult>,
    {
        let mut table = format!("{}\n", TSV_HEADER);
        for result in results {
            table.push_str(&result.tsv_row());
        }
        write(&self.table_path(), &table)
    }
}

fn write(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", path.display()))
}
