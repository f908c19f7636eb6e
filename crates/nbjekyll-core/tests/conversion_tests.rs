//! End-to-end conversion tests
//!
//! Notebooks are built as JSON, parsed with `nbjekyll-notebook` and converted
//! with the public API, the same path the CLI takes.

use base64::{engine::general_purpose::STANDARD, Engine};
use nbjekyll_core::{
    convert, convert_file, write_artifacts, ConversionConfig, ConvertError, DiagnosticKind,
    NotebookExecutor, Severity,
};
use nbjekyll_notebook::{parse_notebook_from_str, ParsedNotebook};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

const BADGE_IMAGE: &str = "https://mybinder.org/badge_logo.svg";

fn notebook(language: &str, cells: Vec<Value>) -> ParsedNotebook {
    let document = json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {
            "kernelspec": {"name": language, "language": language},
            "language_info": {"name": language}
        },
        "cells": cells
    });
    parse_notebook_from_str(&document.to_string()).unwrap()
}

fn markdown_cell(source: &str) -> Value {
    json!({"cell_type": "markdown", "metadata": {}, "source": source})
}

fn code_cell(source: &str, outputs: Vec<Value>) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": 1,
        "metadata": {},
        "source": source,
        "outputs": outputs
    })
}

fn png_output() -> Value {
    json!({
        "output_type": "display_data",
        "metadata": {},
        "data": {"image/png": PNG_B64, "text/plain": ["<Figure size 640x480>"]}
    })
}

fn body(markdown: &str) -> &str {
    markdown
        .strip_prefix("---\n")
        .and_then(|rest| rest.split_once("---\n\n"))
        .map(|(_, body)| body)
        .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_inline_math_is_doubled() {
    let nb = notebook("java", vec![markdown_cell("Let $x=1$ be fixed.")]);
    let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();

    assert_eq!(conversion.artifacts.fragments, vec!["Let $$x=1$$ be fixed."]);
    assert!(conversion.diagnostics.is_empty());
}

#[test]
fn test_dollar_before_fenced_code_is_left_alone() {
    let source = "It costs $5.\n\n```bash\necho $HOME\n```";
    let nb = notebook("java", vec![markdown_cell(source)]);
    let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();

    assert_eq!(conversion.artifacts.fragments, vec![source]);
    assert_eq!(conversion.diagnostics.len(), 1);
    assert_eq!(conversion.diagnostics[0].cell, Some(0));
    assert_eq!(
        conversion.diagnostics[0].kind,
        DiagnosticKind::UnmatchedMathDelimiter { offset: 9 }
    );
    assert!(!conversion.has_errors());
}

#[test]
fn test_code_cell_without_outputs() {
    let nb = notebook("java", vec![code_cell("System.out.println(1);", vec![])]);
    let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();

    assert_eq!(
        conversion.artifacts.fragments,
        vec!["```java\nSystem.out.println(1);\n```"]
    );
    assert!(!conversion.artifacts.markdown.contains("```output"));
}

#[test]
fn test_image_output_is_extracted_and_written() {
    let nb = notebook(
        "java",
        vec![
            markdown_cell("# Plot"),
            markdown_cell("Below:"),
            code_cell("plot();", vec![png_output()]),
        ],
    );
    let site = TempDir::new().unwrap();
    let config = ConversionConfig::new("demo")
        .with_site_dir(site.path())
        .with_image_dir("assets/images/demo");

    let conversion = convert(&nb, &config).unwrap();
    assert_eq!(
        conversion.artifacts.fragments[2],
        "```java\nplot();\n```\n\n![](assets/images/demo/demo_2_0.png)"
    );
    assert_eq!(conversion.artifacts.images.len(), 1);

    let markdown_path = site.path().join("demo.md");
    write_artifacts(&conversion.artifacts, &markdown_path, &config).unwrap();

    let image_path = site
        .path()
        .join("assets")
        .join("images")
        .join("demo")
        .join("demo_2_0.png");
    assert_eq!(
        fs::read(image_path).unwrap(),
        STANDARD.decode(PNG_B64).unwrap()
    );
    assert_eq!(
        fs::read_to_string(markdown_path).unwrap(),
        conversion.artifacts.markdown
    );
}

#[test]
fn test_badge_cell_past_end_is_appended() {
    let nb = notebook(
        "java",
        vec![markdown_cell("a"), markdown_cell("b"), markdown_cell("c")],
    );
    let config = ConversionConfig::new("demo")
        .with_binder_link(Some("https://mybinder.org/v2/gh/org/repo/main".to_string()), 5);

    let conversion = convert(&nb, &config).unwrap();
    let markdown = &conversion.artifacts.markdown;

    assert!(markdown.ends_with("(https://mybinder.org/v2/gh/org/repo/main)\n\n---\n"));
    let c_at = markdown.find("\nc\n").unwrap();
    let badge_at = markdown.find(BADGE_IMAGE).unwrap();
    assert!(c_at < badge_at);
    assert!(!conversion.has_errors());
}

// ============================================================================
// Document properties
// ============================================================================

#[test]
fn test_badge_follows_selected_cell() {
    let nb = notebook(
        "java",
        vec![markdown_cell("a"), markdown_cell("b"), markdown_cell("c")],
    );
    let link = "https://mybinder.org/v2/gh/org/repo/main";
    let config = ConversionConfig::new("demo").with_binder_link(Some(link.to_string()), 1);

    let conversion = convert(&nb, &config).unwrap();
    let badge = nbjekyll_core::binder_badge(link);

    assert_eq!(
        body(&conversion.artifacts.markdown),
        format!("a\n\nb\n\n{badge}\n\nc\n")
    );
    assert_eq!(conversion.artifacts.markdown.matches(BADGE_IMAGE).count(), 1);
}

#[test]
fn test_front_matter_has_exactly_enabled_fields() {
    let nb = notebook("java", vec![markdown_cell("text")]);
    let cases = [
        (ConversionConfig::new("demo"), "---\n---\n"),
        (
            ConversionConfig::new("demo").with_toc(true),
            "---\ntoc: true\n---\n",
        ),
        (
            ConversionConfig::new("demo")
                .with_title(Some("Pairings".to_string()))
                .with_mathjax(true),
            "---\ntitle: Pairings\nmathjax: true\n---\n",
        ),
    ];

    for (config, front_matter) in cases {
        let conversion = convert(&nb, &config).unwrap();
        assert_eq!(
            conversion.artifacts.markdown,
            format!("{front_matter}\ntext\n")
        );
    }
}

#[test]
fn test_one_fragment_per_cell() {
    let nb = notebook(
        "java",
        vec![
            markdown_cell("# Title"),
            code_cell("int a = 1;", vec![]),
            markdown_cell(""),
            code_cell(
                "System.out.println(a);",
                vec![json!({"output_type": "stream", "name": "stdout", "text": ["1\n"]})],
            ),
        ],
    );
    let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
    assert_eq!(conversion.artifacts.fragments.len(), nb.cells.len());
    assert_eq!(
        body(&conversion.artifacts.markdown),
        "# Title\n\n```java\nint a = 1;\n```\n\n```java\nSystem.out.println(a);\n```\n\n```output\n1\n```\n"
    );
}

#[test]
fn test_conversion_is_deterministic() {
    let nb = notebook(
        "java",
        vec![
            markdown_cell("Group $\\mathbb{G}_1$ and $$e(g, h)$$"),
            code_cell("plot();", vec![png_output(), png_output()]),
        ],
    );
    let config = ConversionConfig::new("demo").with_image_dir("assets/images/demo");

    let first = convert(&nb, &config).unwrap();
    let second = convert(&nb, &config).unwrap();
    assert_eq!(first, second);

    let links: Vec<&str> = first
        .artifacts
        .images
        .iter()
        .map(|image| image.link.as_str())
        .collect();
    assert_eq!(
        links,
        vec![
            "assets/images/demo/demo_1_0.png",
            "assets/images/demo/demo_1_1.png"
        ]
    );
}

// ============================================================================
// Errors and diagnostics
// ============================================================================

#[test]
fn test_corrupt_image_is_aggregated_error() {
    let nb = notebook(
        "java",
        vec![
            code_cell(
                "plot();",
                vec![json!({
                    "output_type": "display_data",
                    "metadata": {},
                    "data": {"image/png": "not*base64", "text/plain": "<Figure>"}
                })],
            ),
            markdown_cell("Costs $5 and $x$"),
            code_cell("plot();", vec![png_output()]),
        ],
    );

    let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();

    assert!(conversion.has_errors());
    assert_eq!(conversion.artifacts.fragments.len(), 3);
    assert_eq!(conversion.artifacts.images.len(), 1);
    assert!(conversion.artifacts.fragments[0].contains("```output\n<Figure>\n```"));

    let errors: Vec<_> = conversion
        .diagnostics
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].cell, Some(0));
    assert_eq!(errors[0].output, Some(0));
    assert!(matches!(errors[0].kind, DiagnosticKind::ImageDecode { .. }));
}

#[test]
fn test_unknown_output_type_is_skipped() {
    let nb = notebook(
        "python",
        vec![code_cell(
            "widget()",
            vec![json!({"output_type": "widget_state", "data": {}})],
        )],
    );
    let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();

    assert_eq!(conversion.artifacts.fragments, vec!["```python\nwidget()\n```"]);
    assert_eq!(conversion.diagnostics.len(), 1);
    assert_eq!(
        conversion.diagnostics[0].to_string(),
        "cell 0, output 0: unknown output type 'widget_state', output skipped"
    );
}

#[test]
fn test_invalid_image_dir_fails_before_reading() {
    let config = ConversionConfig::new("demo").with_image_dir("/assets/images");
    let err = convert_file(Path::new("does-not-exist.ipynb"), &config, None).unwrap_err();
    assert!(matches!(err, ConvertError::Config(_)));
}

#[test]
fn test_missing_notebook_is_input_error() {
    let err = convert_file(
        Path::new("does-not-exist.ipynb"),
        &ConversionConfig::new("demo"),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::Notebook(_)));
}

// ============================================================================
// Execution capability
// ============================================================================

/// Executor that "runs" a notebook by returning a prepared result
struct StubExecutor {
    executed: ParsedNotebook,
}

impl NotebookExecutor for StubExecutor {
    fn execute(&self, _path: &Path) -> nbjekyll_core::Result<ParsedNotebook> {
        Ok(self.executed.clone())
    }
}

#[test]
fn test_executor_outputs_are_converted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("demo.ipynb");
    let stored = json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {"language_info": {"name": "java"}},
        "cells": [code_cell("System.out.println(1);", vec![])]
    });
    fs::write(&path, stored.to_string()).unwrap();

    let executor = StubExecutor {
        executed: notebook(
            "java",
            vec![code_cell(
                "System.out.println(1);",
                vec![json!({"output_type": "stream", "name": "stdout", "text": "1\n"})],
            )],
        ),
    };
    let config = ConversionConfig::new("demo");

    let stored_only = convert_file(&path, &config, None).unwrap();
    let executed = convert_file(&path, &config, Some(&executor)).unwrap();

    assert!(!stored_only.artifacts.markdown.contains("```output"));
    assert_eq!(
        executed.artifacts.fragments,
        vec!["```java\nSystem.out.println(1);\n```\n\n```output\n1\n```"]
    );
}

#[test]
fn test_executor_failure_is_propagated() {
    struct FailingExecutor;

    impl NotebookExecutor for FailingExecutor {
        fn execute(&self, _path: &Path) -> nbjekyll_core::Result<ParsedNotebook> {
            Err(ConvertError::Execution("kernel died".to_string()))
        }
    }

    let err = convert_file(
        Path::new("demo.ipynb"),
        &ConversionConfig::new("demo"),
        Some(&FailingExecutor),
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::Execution(msg) if msg == "kernel died"));
}
