mod json;
mod terminal;

pub use json::{JsonReporter, SUMMARY_FILE};
pub use terminal::TerminalReporter;

use crate::batch::BatchSummary;
use miette::Result;

/// Output format for the batch summary
#[derive(Debug, Clone, Default)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

/// Reports a finished batch
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn report(&self, summary: &BatchSummary) -> Result<()> {
        match &self.format {
            ReportFormat::Terminal => TerminalReporter::new().report(summary),
            ReportFormat::Json => {
                let path = summary.output_dir.join(SUMMARY_FILE);
                JsonReporter::new(Some(path)).report(summary)
            }
        }
    }
}
