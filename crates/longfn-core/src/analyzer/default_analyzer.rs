use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use tracing::{debug, instrument, trace};
use tree_sitter::{Language, Node, Parser};

use super::{Analyzer, AnalyzerConfig, FunctionKind, FunctionReport, SourceUnit};

static TYPESCRIPT: Lazy<Language> = Lazy::new(|| tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into());

/// Analyzer implementation backed by the tree-sitter TypeScript grammar.
pub struct DefaultAnalyzer {
    config: AnalyzerConfig,
}

impl DefaultAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::default())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }
}

impl Default for DefaultAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Analyzer for DefaultAnalyzer {
    #[instrument(name = "analyze_source", skip(self, unit), fields(file = %unit.path.display()))]
    async fn analyze(&self, unit: &SourceUnit) -> Result<Vec<FunctionReport>> {
        let mut parser = Parser::new();
        parser
            .set_language(&TYPESCRIPT)
            .context("failed to load the TypeScript grammar")?;

        let Some(tree) = parser.parse(unit.text.as_str(), None) else {
            debug!("parser produced no tree, skipping file");
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        collect_long_functions(tree.root_node(), unit, self.config.max_lines, &mut findings);
        trace!(count = findings.len(), "file analysis complete");
        Ok(findings)
    }
}

/// Depth-first walk over every node. Children are visited whether or not the
/// node itself matched: function-like constructs nest arbitrarily, and a walk
/// that stopped at matches would miss the inner ones.
fn collect_long_functions(
    node: Node<'_>,
    unit: &SourceUnit,
    max_lines: usize,
    findings: &mut Vec<FunctionReport>,
) {
    if let Some(kind) = classify_node(&node) {
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        let line_count = end_line - start_line + 1;
        if line_count > max_lines {
            findings.push(FunctionReport {
                file: unit.path.clone(),
                start_line,
                end_line,
                line_count,
                kind,
                name: infer_name(&node, &unit.text),
            });
        }
    }
    for index in 0..node.child_count() {
        if let Some(child) = node.child(index) {
            collect_long_functions(child, unit, max_lines, findings);
        }
    }
}

fn classify_node(node: &Node<'_>) -> Option<FunctionKind> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => Some(FunctionKind::Function),
        "method_definition" => Some(FunctionKind::Method),
        // the grammar renamed `function` to `function_expression`; accept both
        "function" | "function_expression" | "generator_function" => {
            Some(FunctionKind::FunctionExpression)
        }
        "arrow_function" => Some(FunctionKind::ArrowFunction),
        _ => None,
    }
}

/// An explicit identifier on the construct wins. Anonymous expressions carry
/// no name of their own, so the immediate parent is the only identifier
/// source: a variable binding or a property assignment with an identifier
/// key.
fn infer_name(node: &Node<'_>, source: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return node_text(&name, source);
    }

    if !matches!(
        node.kind(),
        "function" | "function_expression" | "generator_function" | "arrow_function"
    ) {
        return None;
    }

    let parent = node.parent()?;
    match parent.kind() {
        "variable_declarator" => parent
            .child_by_field_name("name")
            .and_then(|name| node_text(&name, source)),
        "pair" => parent
            .child_by_field_name("key")
            .filter(|key| key.kind() == "property_identifier")
            .and_then(|key| node_text(&key, source)),
        _ => None,
    }
}

fn node_text(node: &Node<'_>, source: &str) -> Option<String> {
    node.utf8_text(source.as_bytes()).ok().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn unit(text: &str) -> SourceUnit {
        SourceUnit {
            path: PathBuf::from("probe.ts"),
            text: text.to_string(),
        }
    }

    fn analyzer(max_lines: usize) -> DefaultAnalyzer {
        DefaultAnalyzer::with_config(AnalyzerConfig { max_lines })
    }

    #[tokio::test]
    async fn reports_long_function_declaration() {
        let source = "function loadGalaxy() {\n  const a = 1;\n  const b = 2;\n  const c = 3;\n}";
        let findings = analyzer(3).analyze(&unit(source)).await.unwrap();

        assert_eq!(findings.len(), 1);
        let entry = &findings[0];
        assert_eq!(entry.kind, FunctionKind::Function);
        assert_eq!(entry.name.as_deref(), Some("loadGalaxy"));
        assert_eq!(entry.start_line, 1);
        assert_eq!(entry.end_line, 5);
        assert_eq!(entry.line_count, 5);
        entry.validate().unwrap();
    }

    #[tokio::test]
    async fn excludes_construct_at_exact_threshold() {
        let source = "function loadGalaxy() {\n  const a = 1;\n  const b = 2;\n  const c = 3;\n}";
        let findings = analyzer(5).analyze(&unit(source)).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn finds_nested_functions_inside_non_matching_nodes() {
        let source = concat!(
            "class StarMap {\n",
            "  render() {\n",
            "    const draw = () => {\n",
            "      this.paint();\n",
            "      this.flush();\n",
            "    };\n",
            "    draw();\n",
            "  }\n",
            "}",
        );
        let findings = analyzer(2).analyze(&unit(source)).await.unwrap();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, FunctionKind::Method);
        assert_eq!(findings[0].name.as_deref(), Some("render"));
        assert_eq!(findings[1].kind, FunctionKind::ArrowFunction);
        assert_eq!(findings[1].name.as_deref(), Some("draw"));
        assert_eq!(findings[1].start_line, 3);
        assert_eq!(findings[1].end_line, 6);
    }

    #[tokio::test]
    async fn infers_name_from_property_assignment() {
        let source = concat!(
            "const api = {\n",
            "  load: function (url) {\n",
            "    fetch(url);\n",
            "    return true;\n",
            "  },\n",
            "};",
        );
        let findings = analyzer(2).analyze(&unit(source)).await.unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FunctionKind::FunctionExpression);
        assert_eq!(findings[0].name.as_deref(), Some("load"));
    }

    #[tokio::test]
    async fn anonymous_expression_reports_without_name() {
        let source = "(function () {\n  run();\n  run();\n  run();\n})();";
        let findings = analyzer(2).analyze(&unit(source)).await.unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FunctionKind::FunctionExpression);
        assert_eq!(findings[0].name, None);
    }

    #[tokio::test]
    async fn named_function_expression_keeps_own_name() {
        let source = "const outer = function inner() {\n  step();\n  step();\n  step();\n};";
        let findings = analyzer(2).analyze(&unit(source)).await.unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].name.as_deref(), Some("inner"));
    }

    #[tokio::test]
    async fn arrow_bound_to_variable_reports_binding_name() {
        let source = concat!(
            "const handler = (value) => {\n",
            "  const next = value + 1;\n",
            "  emit(next);\n",
            "  return next;\n",
            "};",
        );
        let findings = analyzer(3).analyze(&unit(source)).await.unwrap();

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FunctionKind::ArrowFunction);
        assert_eq!(findings[0].name.as_deref(), Some("handler"));
    }

    fn function_with_body_lines(body_lines: usize) -> String {
        let mut lines = vec!["function probe() {".to_string()];
        for index in 0..body_lines {
            lines.push(format!("  const v{index} = {index};"));
        }
        lines.push("}".to_string());
        lines.join("\n")
    }

    proptest! {
        #[test]
        fn reported_iff_span_strictly_exceeds_threshold(
            body_lines in 1usize..40,
            max_lines in 1usize..40,
        ) {
            let total_lines = body_lines + 2;
            let source = function_with_body_lines(body_lines);
            let findings = futures::executor::block_on(
                analyzer(max_lines).analyze(&unit(&source)),
            )
            .unwrap();

            if total_lines > max_lines {
                prop_assert_eq!(findings.len(), 1);
                prop_assert_eq!(findings[0].line_count, total_lines);
            } else {
                prop_assert!(findings.is_empty());
            }
        }
    }
}
