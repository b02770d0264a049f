use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use longfn_core::{
    analyze_target, render_report, AnalyzerConfig, DefaultAnalyzer, FileSourceDiscovery,
    OutputFormat,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "longfn", author, version, about = "Long Function Report CLI")]
struct Cli {
    /// File or directory to analyze
    #[arg(value_name = "PATH")]
    target: Option<PathBuf>,

    /// Maximum allowed function length in lines; malformed values keep the
    /// default of 20
    #[arg(long = "max-lines", value_name = "N")]
    max_lines: Option<String>,

    /// Emit the report as JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let Some(target) = cli.target else {
        eprintln!("Usage: longfn <path> [--max-lines=20]");
        std::process::exit(1);
    };
    report_long_functions(&target, cli.max_lines.as_deref(), cli.json).await
}

async fn report_long_functions(target: &Path, max_lines: Option<&str>, json: bool) -> Result<()> {
    let config = AnalyzerConfig::from_max_lines_arg(max_lines);
    debug!(max_lines = config.max_lines, "threshold resolved");
    let target = std::path::absolute(target)
        .with_context(|| format!("failed to resolve {}", target.display()))?;

    let discovery = FileSourceDiscovery::default();
    let analyzer = DefaultAnalyzer::with_config(config.clone());
    let report = analyze_target(&target, &discovery, &analyzer, &config).await?;

    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    if json {
        println!("{}", render_report(&report, OutputFormat::Json, &cwd)?);
        return Ok(());
    }

    if report.files_analyzed == 0 {
        println!("No TypeScript source files found for analysis.");
        return Ok(());
    }
    if report.findings.is_empty() {
        println!(
            "All functions are within the {}-line threshold.",
            report.max_lines
        );
        return Ok(());
    }

    print!("{}", render_report(&report, OutputFormat::Human, &cwd)?);
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    // stdout belongs to the report; diagnostics go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
