use std::fmt::Write;
use std::path::Path;

use serde::Serialize;

use crate::analyzer::{AnalysisReport, FunctionReport};

/// Format styles supported in default reporter implementations.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string from an `AnalysisReport` using the desired format.
///
/// `base` is the directory paths are rendered relative to (normally the
/// invoking working directory); files outside it keep their absolute path.
pub fn render_report(
    report: &AnalysisReport,
    format: OutputFormat,
    base: &Path,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report, base),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport::from(report))?),
    }
}

fn render_human(report: &AnalysisReport, base: &Path) -> anyhow::Result<String> {
    let mut out = String::new();
    for finding in &report.findings {
        writeln!(
            out,
            "{}:{}-{}",
            display_path(&finding.file, base),
            finding.start_line,
            finding.end_line
        )?;
        writeln!(
            out,
            "  {kind} {name} → {count} lines",
            kind = finding.kind,
            name = finding.name.as_deref().unwrap_or("<anonymous>"),
            count = finding.line_count
        )?;
    }
    Ok(out)
}

fn display_path(file: &Path, base: &Path) -> String {
    file.strip_prefix(base).unwrap_or(file).display().to_string()
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    max_lines: usize,
    files_analyzed: usize,
    findings: &'a [FunctionReport],
}

impl<'a> From<&'a AnalysisReport> for JsonReport<'a> {
    fn from(report: &'a AnalysisReport) -> Self {
        Self {
            max_lines: report.max_lines,
            files_analyzed: report.files_analyzed,
            findings: &report.findings,
        }
    }
}
