use apkunbox::{
    load_blacklist, BatchRunner, Config, JadxCliProvider, OutputLayout, PackageFinder,
    ReportFormat, Reporter,
};
use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// apkunbox - Detect packed Android apps and synthesize their unpackers
#[derive(Parser, Debug)]
#[command(name = "apkunbox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `.apk` files or decompiled package directories
    input: PathBuf,

    /// Directory the run's results are written under
    output: PathBuf,

    /// File listing packages to skip, one per line
    #[arg(short, long)]
    blacklist: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of packages analyzed at once
    #[arg(short, long)]
    threads: Option<usize>,

    /// Per-package timeout in seconds (0 disables it)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// jadx executable
    #[arg(long, value_name = "PATH")]
    jadx: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Skip unpacker synthesis
    #[arg(long)]
    no_synthesis: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("apkunbox v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    run_batch(&config, &cli)
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::from_default_locations(&cli.input)?
    };

    // Override with CLI arguments
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if let Some(timeout) = cli.timeout_secs {
        config.timeout_secs = timeout;
    }
    if let Some(jadx) = &cli.jadx {
        config.jadx_path = jadx.clone();
    }
    if cli.no_synthesis {
        config.synthesize = false;
    }

    Ok(config)
}

fn run_batch(config: &Config, cli: &Cli) -> Result<()> {
    let blacklist = match &cli.blacklist {
        Some(path) => load_blacklist(path)?,
        None => Vec::new(),
    };

    info!("Discovering packages...");
    let packages = PackageFinder::new()
        .with_blacklist(blacklist)
        .find(&cli.input)?;
    info!("Found {} packages to analyze", packages.len());

    if packages.is_empty() {
        println!("{}", "No packages found.".yellow());
        return Ok(());
    }

    std::fs::create_dir_all(&cli.output)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to create {}", cli.output.display()))?;
    let layout = OutputLayout::create(&cli.output)?;
    info!("Writing results to {}", layout.root().display());

    let provider = Arc::new(JadxCliProvider::new(
        config.jadx_path.clone(),
        layout.decompiled_dir(),
    ));
    let summary = BatchRunner::new(config.clone(), provider)
        .with_progress(!cli.quiet)
        .run(&packages, &layout)?;

    Reporter::new(cli.format.clone().into()).report(&summary)
}
