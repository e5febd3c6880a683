use tracing::{debug, warn};

/// Per-package analysis log
///
/// Every line is mirrored to `tracing` and kept so the batch runner can write
/// `logs/<package>.txt` once the package finishes, times out or fails.
#[derive(Debug, Clone, Default)]
pub struct AnalysisLog {
    package: String,
    lines: Vec<String>,
}

impl AnalysisLog {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            lines: Vec::new(),
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(package = %self.package, "{}", message);
        self.lines.push(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(package = %self.package, "{}", message);
        self.lines.push(format!("ERROR: {}", message));
    }

    /// Log a delimited list so downstream tooling can extract it
    pub fn list<I, S>(&mut self, title: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.log(format!("[BEGIN_LIST] {}", title));
        for item in items {
            self.log(item.as_ref());
        }
        self.log(format!("[END_LIST] {}", title));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    /// Log file contents, one message per line
    pub fn contents(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
