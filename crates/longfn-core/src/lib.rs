pub mod analyzer;
pub mod report;

pub use analyzer::{
    analyze_target, default_analyzer::DefaultAnalyzer, discovery::DiscoveryConfig,
    discovery::FileSourceDiscovery, AnalysisReport, AnalyzeError, Analyzer, AnalyzerConfig,
    FunctionKind, FunctionReport, ReportValidationError, SourceDiscovery, SourceUnit,
    DEFAULT_MAX_LINES,
};
pub use report::{render_report, OutputFormat};
