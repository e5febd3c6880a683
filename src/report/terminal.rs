use crate::analysis::PackerType;
use crate::batch::{BatchSummary, PackageOutcome, PackageRecord};
use colored::Colorize;
use miette::Result;

/// Terminal reporter with colored output
pub struct TerminalReporter {
    /// List every package, not only the packed ones
    show_all: bool,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { show_all: false }
    }

    pub fn with_all_packages(mut self, show: bool) -> Self {
        self.show_all = show;
        self
    }

    pub fn report(&self, summary: &BatchSummary) -> Result<()> {
        if summary.records.is_empty() {
            println!("{}", "No packages analyzed.".yellow().bold());
            return Ok(());
        }

        println!();
        println!(
            "{}",
            format!(
                "Analyzed {} packages in {:.2}s:",
                summary.records.len(),
                summary.elapsed.as_secs_f64()
            )
            .bold()
        );
        println!();

        for record in &summary.records {
            let interesting = match &record.outcome {
                PackageOutcome::Completed(report) => report.is_packed(),
                _ => true,
            };
            if self.show_all || interesting {
                self.print_record(record);
            }
        }

        self.print_summary(summary);
        Ok(())
    }

    fn packer_badge(packer: PackerType) -> colored::ColoredString {
        match packer {
            PackerType::None => "NONE".green(),
            PackerType::Managed => "MANAGED".yellow().bold(),
            PackerType::Native => "NATIVE".red().bold(),
        }
    }

    fn print_record(&self, record: &PackageRecord) {
        let name = record.input.stem();
        match &record.outcome {
            PackageOutcome::Completed(report) => {
                let r = &report.result;
                println!(
                    "{} {} [{}]",
                    "●".cyan(),
                    r.package_name.cyan().bold(),
                    Self::packer_badge(r.packer)
                );
                if report.is_packed() {
                    println!(
                        "    {} {} missing classes",
                        "→".dimmed(),
                        report.missing_classes.len()
                    );
                }
                if let Some(pkg) = &r.application_subclass_package_name {
                    println!("    {} entry point in {}", "→".dimmed(), pkg.white());
                }
                let mut flags = Vec::new();
                if r.uses_dcl {
                    flags.push(if r.dcl_in_app { "dcl (app)" } else { "dcl" });
                }
                if r.uses_reflection {
                    flags.push(if r.reflection_in_app {
                        "reflection (app)"
                    } else {
                        "reflection"
                    });
                }
                if !flags.is_empty() {
                    println!("    {} {}", "→".dimmed(), flags.join(", ").dimmed());
                }
                match (&report.synthesis, &report.synthesis_error) {
                    (Some(unpacker), _) => println!(
                        "    {} unpacker {}",
                        "✓".green(),
                        unpacker.qualified_name.green()
                    ),
                    (None, Some(reason)) => {
                        println!("    {} no unpacker: {}", "✗".red(), reason.dimmed())
                    }
                    (None, None) => {}
                }
            }
            PackageOutcome::Failed(message) => {
                println!("{} {} {}", "✗".red(), name.red().bold(), message.dimmed());
            }
            PackageOutcome::TimedOut => {
                println!("{} {} {}", "⏱".yellow(), name.yellow().bold(), "timed out".dimmed());
            }
        }
    }

    fn print_summary(&self, summary: &BatchSummary) {
        let mut managed = 0;
        let mut native = 0;
        let mut unpackers = 0;
        for report in summary.completed() {
            match report.result.packer {
                PackerType::Managed => managed += 1,
                PackerType::Native => native += 1,
                PackerType::None => {}
            }
            if report.synthesis.is_some() {
                unpackers += 1;
            }
        }

        println!();
        println!("{}", "─".repeat(60).dimmed());

        let mut parts = vec![format!("{} packed", summary.packed_count()).yellow().to_string()];
        if managed > 0 {
            parts.push(format!("{} managed", managed));
        }
        if native > 0 {
            parts.push(format!("{} native", native));
        }
        if summary.failed_count() > 0 {
            parts.push(format!("{} failed", summary.failed_count()).red().to_string());
        }
        if summary.timed_out_count() > 0 {
            parts.push(
                format!("{} timed out", summary.timed_out_count())
                    .yellow()
                    .to_string(),
            );
        }
        println!("Summary: {}", parts.join(", "));
        if unpackers > 0 {
            println!("Unpackers: {}", unpackers.to_string().green());
        }
        println!(
            "Results: {}",
            summary.output_dir.display().to_string().cyan()
        );
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}
