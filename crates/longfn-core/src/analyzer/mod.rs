use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

pub mod default_analyzer;
pub mod discovery;

/// Threshold applied when no explicit `--max-lines` value is given.
pub const DEFAULT_MAX_LINES: usize = 20;

/// Classification of a function-like syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Function,
    Method,
    FunctionExpression,
    ArrowFunction,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::FunctionExpression => "function expression",
            Self::ArrowFunction => "arrow function",
        };
        f.write_str(label)
    }
}

/// One source file's path and full text, created per file and discarded
/// after its analysis pass.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
}

/// Tunable configuration for the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Maximum allowed line span before a construct is reported.
    pub max_lines: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl AnalyzerConfig {
    /// Build a config from a raw `--max-lines` argument.
    ///
    /// A missing, malformed, or non-positive value falls back to the default
    /// threshold without surfacing an error.
    pub fn from_max_lines_arg(raw: Option<&str>) -> Self {
        let max_lines = raw
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_LINES);
        Self { max_lines }
    }
}

/// A function-like construct whose line span exceeded the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionReport {
    pub file: PathBuf,
    /// 1-indexed first line of the construct.
    pub start_line: usize,
    /// 1-indexed last line, inclusive.
    pub end_line: usize,
    pub line_count: usize,
    pub kind: FunctionKind,
    /// Explicit or inferred identifier; `None` renders as `<anonymous>`.
    pub name: Option<String>,
}

impl FunctionReport {
    /// Validate span invariants.
    pub fn validate(&self) -> Result<(), ReportValidationError> {
        if self.start_line == 0 || self.start_line > self.end_line {
            return Err(ReportValidationError::InvalidSpan {
                file: self.file.clone(),
                start_line: self.start_line,
                end_line: self.end_line,
            });
        }
        let expected = self.end_line - self.start_line + 1;
        if self.line_count != expected {
            return Err(ReportValidationError::LineCountMismatch {
                file: self.file.clone(),
                expected,
                line_count: self.line_count,
            });
        }
        Ok(())
    }
}

/// Validation errors for report entries emitted by the analyzer.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportValidationError {
    #[error("entry for {} has invalid span {start_line}-{end_line}", .file.display())]
    InvalidSpan {
        file: PathBuf,
        start_line: usize,
        end_line: usize,
    },
    #[error("entry for {} has line count {line_count}, span implies {expected}", .file.display())]
    LineCountMismatch {
        file: PathBuf,
        expected: usize,
        line_count: usize,
    },
}

/// Fatal analysis failures. Everything else degrades per file.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),
}

/// End-to-end result of analyzing one target path.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Threshold that was in effect for this run.
    pub max_lines: usize,
    /// Number of files in the working set, whether or not they produced
    /// findings.
    pub files_analyzed: usize,
    pub findings: Vec<FunctionReport>,
}

impl AnalysisReport {
    /// Construct a report, establishing the output ordering invariant:
    /// file path first, start line second.
    pub fn new(mut findings: Vec<FunctionReport>, files_analyzed: usize, max_lines: usize) -> Self {
        findings.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.start_line.cmp(&b.start_line))
        });
        Self {
            max_lines,
            files_analyzed,
            findings,
        }
    }
}

/// Abstraction over working-set discovery so different backends (filesystem,
/// in-memory listings) can be swapped transparently.
#[async_trait]
pub trait SourceDiscovery: Send + Sync {
    /// Resolve a target path into the flat list of files to analyze.
    async fn collect(&self, target: &Path) -> AnyResult<Vec<PathBuf>>;
}

/// Primary analysis interface that transforms one source unit into report
/// entries.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze a single source unit, returning every construct over the
    /// configured threshold.
    async fn analyze(&self, unit: &SourceUnit) -> AnyResult<Vec<FunctionReport>>;
}

/// Run the full pipeline against one target: discover the working set, then
/// analyze each file independently. Unreadable and empty files are skipped
/// without failing the run.
pub async fn analyze_target<D, A>(
    target: &Path,
    discovery: &D,
    analyzer: &A,
    config: &AnalyzerConfig,
) -> AnyResult<AnalysisReport>
where
    D: SourceDiscovery,
    A: Analyzer,
{
    let files = discovery.collect(target).await?;
    let files_analyzed = files.len();
    debug!(files = files_analyzed, "working set collected");

    let mut findings = Vec::new();
    for file in files {
        let text = match tokio::fs::read_to_string(&file).await {
            Ok(text) => text,
            Err(err) => {
                debug!(file = %file.display(), %err, "skipping unreadable file");
                continue;
            }
        };
        if text.is_empty() {
            trace!(file = %file.display(), "skipping empty file");
            continue;
        }
        let unit = SourceUnit { path: file, text };
        findings.extend(analyzer.analyze(&unit).await?);
    }

    Ok(AnalysisReport::new(findings, files_analyzed, config.max_lines))
}
