//! Batch orchestration
//!
//! Runs the analyzer over every discovered package on a bounded worker pool
//! and writes each package's artifacts as soon as it finishes.
//!
//! ## Timeouts
//!
//! Each package runs on its own thread while the pool worker waits on a
//! channel with a deadline. When the deadline passes the package's cancel
//! flag is raised, the worker moves on, and the package is recorded as
//! timed out. The analyzer stops at its next stage boundary; nothing it
//! produces after that is used.

mod layout;

pub use layout::{OutputLayout, TABLE_FILE};

use crate::analysis::{AnalysisError, AnalysisLog, Analyzer, PackageReport};
use crate::config::Config;
use crate::discovery::PackageInput;
use crate::facts::FactsProvider;
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a package's analysis ended
#[derive(Debug)]
pub enum PackageOutcome {
    Completed(Box<PackageReport>),
    Failed(String),
    TimedOut,
}

impl PackageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PackageOutcome::Completed(_) => "completed",
            PackageOutcome::Failed(_) => "failed",
            PackageOutcome::TimedOut => "timeout",
        }
    }

    pub fn report(&self) -> Option<&PackageReport> {
        match self {
            PackageOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// One package's entry in the batch
#[derive(Debug)]
pub struct PackageRecord {
    pub input: PackageInput,
    pub outcome: PackageOutcome,
    pub elapsed: Duration,
    /// Where the synthesized source was written, if anywhere
    pub unpacker_path: Option<PathBuf>,
}

/// Everything a batch run produced
#[derive(Debug)]
pub struct BatchSummary {
    pub output_dir: PathBuf,
    pub records: Vec<PackageRecord>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn completed(&self) -> impl Iterator<Item = &PackageReport> {
        self.records.iter().filter_map(|r| r.outcome.report())
    }

    pub fn packed_count(&self) -> usize {
        self.completed().filter(|r| r.is_packed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, PackageOutcome::Failed(_)))
            .count()
    }

    pub fn timed_out_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, PackageOutcome::TimedOut))
            .count()
    }
}

/// Analyzes a list of packages in parallel
pub struct BatchRunner {
    config: Config,
    provider: Arc<dyn FactsProvider>,
    show_progress: bool,
}

impl BatchRunner {
    pub fn new(config: Config, provider: Arc<dyn FactsProvider>) -> Self {
        Self {
            config,
            provider,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run(&self, inputs: &[PackageInput], layout: &OutputLayout) -> Result<BatchSummary> {
        let start = Instant::now();
        info!(
            "Analyzing {} packages with {} workers",
            inputs.len(),
            self.config.threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads.max(1))
            .build()
            .into_diagnostic()?;

        let pb = if self.show_progress {
            let pb = ProgressBar::new(inputs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let records: Vec<PackageRecord> = pool.install(|| {
            inputs
                .par_iter()
                .map(|input| {
                    let record = self.process(input, layout);
                    pb.inc(1);
                    record
                })
                .collect()
        });
        pb.finish_and_clear();

        layout.write_table(
            records
                .iter()
                .filter_map(|r| r.outcome.report())
                .map(|report| &report.result),
        )?;

        Ok(BatchSummary {
            output_dir: layout.root().to_path_buf(),
            records,
            elapsed: start.elapsed(),
        })
    }

    /// Analyze one package and write its artifacts
    ///
    /// I/O failures are recorded against the package; they never stop the batch.
    fn process(&self, input: &PackageInput, layout: &OutputLayout) -> PackageRecord {
        let start = Instant::now();
        let stem = input.stem();
        debug!("Starting {}", input.path.display());

        let (mut outcome, mut log) = self.analyze_with_timeout(input, &stem);

        let written = match &outcome {
            PackageOutcome::Completed(report) => Some(self.write_artifacts(&stem, report, layout)),
            _ => None,
        };
        let mut unpacker_path = None;
        match written {
            Some(Ok(path)) => unpacker_path = path,
            Some(Err(e)) => {
                let message = format!("Failed to write results for {}: {}", stem, e);
                warn!("{}", message);
                log.error(&message);
                outcome = PackageOutcome::Failed(message);
            }
            None => {}
        }
        if let Err(e) = layout.write_log(&stem, &log) {
            warn!("Failed to write log for {}: {}", stem, e);
        }

        debug!("Finished {} ({})", stem, outcome.label());
        PackageRecord {
            input: input.clone(),
            outcome,
            elapsed: start.elapsed(),
            unpacker_path,
        }
    }

    fn write_artifacts(
        &self,
        stem: &str,
        report: &PackageReport,
        layout: &OutputLayout,
    ) -> Result<Option<PathBuf>> {
        layout.write_result(stem, &report.result)?;
        match &report.synthesis {
            Some(unpacker) if self.config.write_unpackers => {
                Ok(Some(layout.write_unpacker(stem, unpacker)?))
            }
            _ => Ok(None),
        }
    }

    fn analyze_with_timeout(&self, input: &PackageInput, stem: &str) -> (PackageOutcome, AnalysisLog) {
        let cancel = Arc::new(AtomicBool::new(false));
        let analyzer = Analyzer::new(self.config.clone(), Arc::clone(&self.provider))
            .with_cancel_flag(Arc::clone(&cancel));
        let path = input.path.clone();
        let log_name = stem.to_string();

        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name(format!("analyze-{}", stem))
            .spawn(move || {
                let mut log = AnalysisLog::new(log_name);
                let result = analyzer.analyze(&path, &mut log);
                // The receiver is gone once the package has timed out
                let _ = tx.send((result, log));
            });

        let mut log = AnalysisLog::new(stem);
        if let Err(e) = spawned {
            let message = format!("Could not start analysis thread: {}", e);
            log.error(&message);
            return (PackageOutcome::Failed(message), log);
        }

        let received = match self.config.timeout() {
            Some(limit) => rx.recv_timeout(limit),
            None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
        };

        match received {
            Ok((Ok(report), log)) => (PackageOutcome::Completed(Box::new(report)), log),
            Ok((Err(AnalysisError::Cancelled), mut log)) => {
                log.error("Analysis cancelled");
                (PackageOutcome::TimedOut, log)
            }
            Ok((Err(e), mut log)) => {
                log.error(format!("Error analyzing {}: {}", input.path.display(), e));
                (PackageOutcome::Failed(e.to_string()), log)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                cancel.store(true, Ordering::Relaxed);
                warn!("Timed out: {}", input.path.display());
                log.error(format!(
                    "Timeout after {}s while analyzing {}",
                    self.config.timeout_secs,
                    input.path.display()
                ));
                (PackageOutcome::TimedOut, log)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let message = "Analysis thread exited without a result".to_string();
                log.error(&message);
                (PackageOutcome::Failed(message), log)
            }
        }
    }
}
