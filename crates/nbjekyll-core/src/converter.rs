//! Cell dispatch and document assembly.

use crate::config::ConversionConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::error::Result;
use crate::execute::NotebookExecutor;
use crate::fence::{cell_language, fenced, notebook_language, ERROR_INFO, OUTPUT_INFO};
use crate::front_matter::{binder_badge, render_front_matter};
use crate::images::{extract_attachments, extract_output_image, ExtractedImage};
use crate::math::normalize_math_with_report;
use crate::output::OutputArtifacts;
use nbjekyll_notebook::{parse_notebook, CellOutput, MimeBundle, NotebookCell, ParsedNotebook};
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of converting one notebook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    /// Markdown page, fragments and images
    pub artifacts: OutputArtifacts,
    /// Problems found along the way, in document order
    pub diagnostics: Vec<Diagnostic>,
}

impl Conversion {
    /// Whether any diagnostic makes the run a failure
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }
}

/// Converts parsed notebooks to Jekyll markdown
///
/// ## Example
///
/// ```no_run
/// use nbjekyll_core::{ConversionConfig, NotebookConverter};
/// use nbjekyll_notebook::parse_notebook;
///
/// let config = ConversionConfig::new("pairings").with_mathjax(true);
/// let converter = NotebookConverter::new(&config)?;
/// let conversion = converter.convert(&parse_notebook("pairings.ipynb")?)?;
/// println!("{}", conversion.artifacts.markdown);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NotebookConverter<'a> {
    config: &'a ConversionConfig,
}

/// Per-cell rendering state
#[derive(Default)]
struct CellSink {
    images: Vec<ExtractedImage>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> NotebookConverter<'a> {
    /// Create a converter, validating the configuration first
    ///
    /// # Errors
    ///
    /// Returns a configuration error if [`ConversionConfig::validate`] fails.
    pub fn new(config: &'a ConversionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Convert a notebook
    ///
    /// Every cell yields exactly one fragment. Content problems do not stop
    /// the conversion; they are collected in [`Conversion::diagnostics`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the front matter cannot be rendered.
    pub fn convert(&self, notebook: &ParsedNotebook) -> Result<Conversion> {
        let language = notebook_language(
            &notebook.metadata,
            self.config.default_language.as_deref(),
        );
        let mut sink = CellSink::default();

        let fragments: Vec<String> = notebook
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| self.render_cell(index, cell, language.as_deref(), &mut sink))
            .collect();

        for diagnostic in &sink.diagnostics {
            log::debug!("{diagnostic}");
        }
        log::debug!(
            "Converted {} cells, {} images, {} diagnostics",
            fragments.len(),
            sink.images.len(),
            sink.diagnostics.len()
        );

        let markdown = self.assemble(&fragments)?;
        Ok(Conversion {
            artifacts: OutputArtifacts {
                markdown,
                fragments,
                images: sink.images,
            },
            diagnostics: sink.diagnostics,
        })
    }

    fn render_cell(
        &self,
        index: usize,
        cell: &NotebookCell,
        language: Option<&str>,
        sink: &mut CellSink,
    ) -> String {
        match cell {
            NotebookCell::Markdown {
                source,
                attachments,
            } => self.render_markdown(index, source, attachments, sink),
            NotebookCell::Code {
                source, outputs, ..
            } => self.render_code(index, source, outputs, language, sink),
            NotebookCell::Raw { source } => trim_fragment(source).to_string(),
            NotebookCell::Other { cell_type, source } => {
                sink.diagnostics.push(Diagnostic::cell(
                    index,
                    DiagnosticKind::UnsupportedCellType {
                        cell_type: cell_type.clone(),
                    },
                ));
                trim_fragment(source).to_string()
            }
        }
    }

    fn render_markdown(
        &self,
        index: usize,
        source: &str,
        attachments: &BTreeMap<String, MimeBundle>,
        sink: &mut CellSink,
    ) -> String {
        // Offsets in the report refer to the cell source as written
        let normalized = normalize_math_with_report(source);
        if let Some(offset) = normalized.unmatched {
            sink.diagnostics.push(Diagnostic::cell(
                index,
                DiagnosticKind::UnmatchedMathDelimiter { offset },
            ));
        }

        let extracted = extract_attachments(&normalized.text, attachments, self.config, index);
        for error in extracted.errors {
            sink.diagnostics.push(Diagnostic::cell(
                index,
                DiagnosticKind::ImageDecode {
                    mime_type: error.mime_type,
                    message: error.source.to_string(),
                },
            ));
        }
        sink.images.extend(extracted.images);
        trim_fragment(&extracted.source).to_string()
    }

    fn render_code(
        &self,
        index: usize,
        source: &str,
        outputs: &[CellOutput],
        language: Option<&str>,
        sink: &mut CellSink,
    ) -> String {
        let mut parts = Vec::with_capacity(outputs.len() + 1);

        if !source.trim().is_empty() {
            let language = cell_language(source, language).unwrap_or_default();
            parts.push(fenced(language, source));
        }

        for (output_index, output) in outputs.iter().enumerate() {
            match output {
                CellOutput::Stream { text, .. } => {
                    if !text.is_empty() {
                        parts.push(fenced(OUTPUT_INFO, text));
                    }
                }
                CellOutput::RichDisplay { data, .. } => {
                    if let Some(part) = self.render_display(index, output_index, data, sink) {
                        parts.push(part);
                    }
                }
                CellOutput::Error { ename, evalue, .. } => {
                    parts.push(fenced(ERROR_INFO, &format!("{ename}: {evalue}")));
                }
                CellOutput::Unknown { output_type } => {
                    sink.diagnostics.push(Diagnostic::output(
                        index,
                        output_index,
                        DiagnosticKind::UnknownOutputType {
                            output_type: output_type.clone(),
                        },
                    ));
                }
            }
        }

        parts.join("\n\n")
    }

    /// Render one rich display output: an image if it has one, else text
    fn render_display(
        &self,
        index: usize,
        output_index: usize,
        data: &MimeBundle,
        sink: &mut CellSink,
    ) -> Option<String> {
        match extract_output_image(data, self.config, index, output_index) {
            Ok(Some(image)) => {
                let reference = image.markdown();
                sink.images.push(image);
                return Some(reference);
            }
            Ok(None) => {}
            Err(error) => {
                sink.diagnostics.push(Diagnostic::output(
                    index,
                    output_index,
                    DiagnosticKind::ImageDecode {
                        mime_type: error.mime_type,
                        message: error.source.to_string(),
                    },
                ));
                return data
                    .get("text/plain")
                    .map(|text| fenced(OUTPUT_INFO, text));
            }
        }

        if let Some(markdown) = data.get("text/markdown") {
            return Some(trim_fragment(markdown).to_string());
        }
        if let Some(html) = data.get("text/html") {
            return Some(trim_fragment(html).to_string());
        }
        if let Some(text) = data.get("text/plain") {
            return Some(fenced(OUTPUT_INFO, text));
        }

        if !data.is_empty() {
            sink.diagnostics.push(Diagnostic::output(
                index,
                output_index,
                DiagnosticKind::UnknownMimeType {
                    mime_types: data.mime_types().map(String::from).collect(),
                },
            ));
        }
        None
    }

    /// Join fragments under the front matter, inserting the binder badge
    fn assemble(&self, fragments: &[String]) -> Result<String> {
        let badge = self.config.binder_link.as_deref().map(binder_badge);
        let badge_cell = self.config.binder_link_cell;

        let mut body: Vec<&str> = Vec::with_capacity(fragments.len() + 1);
        for (index, fragment) in fragments.iter().enumerate() {
            if !fragment.is_empty() {
                body.push(fragment);
            }
            if index == badge_cell {
                if let Some(badge) = &badge {
                    body.push(badge);
                }
            }
        }
        if badge_cell >= fragments.len() {
            if let Some(badge) = &badge {
                log::debug!(
                    "Binder badge cell {badge_cell} is past the last cell, appending badge"
                );
                body.push(badge);
            }
        }

        let mut markdown = render_front_matter(self.config)?;
        markdown.push('\n');
        if !body.is_empty() {
            markdown.push_str(&body.join("\n\n"));
            markdown.push('\n');
        }
        Ok(markdown)
    }
}

/// Convert a parsed notebook with the given configuration
///
/// # Errors
///
/// Returns a configuration error before converting anything if the
/// configuration is invalid.
pub fn convert(notebook: &ParsedNotebook, config: &ConversionConfig) -> Result<Conversion> {
    NotebookConverter::new(config)?.convert(notebook)
}

/// Read (or execute) the notebook at `path` and convert it
///
/// With an executor, the notebook is run first and its fresh outputs are
/// converted; otherwise the outputs stored in the file are used.
///
/// # Errors
///
/// Returns configuration errors before the notebook is read, then notebook
/// parsing or execution errors.
pub fn convert_file(
    path: &Path,
    config: &ConversionConfig,
    executor: Option<&dyn NotebookExecutor>,
) -> Result<Conversion> {
    let converter = NotebookConverter::new(config)?;
    let notebook = match executor {
        Some(executor) => executor.execute(path)?,
        None => parse_notebook(path)?,
    };
    converter.convert(&notebook)
}

/// Strip the blank lines notebooks leave around cell sources
fn trim_fragment(text: &str) -> &str {
    text.trim_matches('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbjekyll_notebook::{DisplayKind, NotebookMetadata};

    fn markdown(source: &str) -> NotebookCell {
        NotebookCell::Markdown {
            source: source.to_string(),
            attachments: BTreeMap::new(),
        }
    }

    fn code(source: &str, outputs: Vec<CellOutput>) -> NotebookCell {
        NotebookCell::Code {
            source: source.to_string(),
            execution_count: Some(1),
            outputs,
        }
    }

    fn notebook(language: Option<&str>, cells: Vec<NotebookCell>) -> ParsedNotebook {
        ParsedNotebook {
            metadata: NotebookMetadata {
                language_name: language.map(String::from),
                ..NotebookMetadata::default()
            },
            cells,
            nbformat: 4,
            nbformat_minor: 5,
        }
    }

    fn display(entries: &[(&str, &str)]) -> CellOutput {
        CellOutput::RichDisplay {
            kind: DisplayKind::DisplayData,
            data: MimeBundle::new(entries.iter().copied()),
        }
    }

    #[test]
    fn test_stream_and_error_outputs() {
        let nb = notebook(
            Some("java"),
            vec![code(
                "int x = 1 / 0;",
                vec![
                    CellOutput::Stream {
                        name: "stdout".to_string(),
                        text: "before\n".to_string(),
                    },
                    CellOutput::Error {
                        ename: "ArithmeticException".to_string(),
                        evalue: "/ by zero".to_string(),
                        traceback: vec!["\u{1b}[31mtrace".to_string()],
                    },
                ],
            )],
        );

        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(
            conversion.artifacts.fragments[0],
            "```java\nint x = 1 / 0;\n```\n\n```output\nbefore\n```\n\n```error\nArithmeticException: / by zero\n```"
        );
        assert!(conversion.diagnostics.is_empty());
    }

    #[test]
    fn test_plain_text_display() {
        let nb = notebook(
            Some("java"),
            vec![code("1 + 1", vec![display(&[("text/plain", "2")])])],
        );
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(
            conversion.artifacts.fragments[0],
            "```java\n1 + 1\n```\n\n```output\n2\n```"
        );
    }

    #[test]
    fn test_markdown_and_html_display_are_raw() {
        let nb = notebook(
            None,
            vec![code(
                "show()",
                vec![
                    display(&[("text/markdown", "**bold**"), ("text/plain", "bold")]),
                    display(&[("text/html", "<b>x</b>"), ("text/plain", "x")]),
                ],
            )],
        );
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(
            conversion.artifacts.fragments[0],
            "```\nshow()\n```\n\n**bold**\n\n<b>x</b>"
        );
    }

    #[test]
    fn test_unknown_mime_type_is_warning() {
        let nb = notebook(
            None,
            vec![code(
                "widget",
                vec![display(&[("application/vnd.jupyter.widget-view+json", "{}")])],
            )],
        );
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(conversion.artifacts.fragments[0], "```\nwidget\n```");
        assert_eq!(conversion.diagnostics.len(), 1);
        assert_eq!(conversion.diagnostics[0].cell, Some(0));
        assert_eq!(conversion.diagnostics[0].output, Some(0));
        assert!(!conversion.has_errors());
    }

    #[test]
    fn test_corrupt_image_falls_back_and_is_error() {
        let nb = notebook(
            None,
            vec![
                code(
                    "plot()",
                    vec![display(&[("image/png", "@@@"), ("text/plain", "<Figure>")])],
                ),
                markdown("still converted"),
            ],
        );
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(
            conversion.artifacts.fragments[0],
            "```\nplot()\n```\n\n```output\n<Figure>\n```"
        );
        assert_eq!(conversion.artifacts.fragments[1], "still converted");
        assert!(conversion.artifacts.images.is_empty());
        assert!(conversion.has_errors());
    }

    #[test]
    fn test_cell_magic_language() {
        let nb = notebook(Some("java"), vec![code("%%bash\necho hi", vec![])]);
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(
            conversion.artifacts.fragments[0],
            "```bash\n%%bash\necho hi\n```"
        );
    }

    #[test]
    fn test_raw_and_unknown_cells_pass_through() {
        let nb = notebook(
            None,
            vec![
                NotebookCell::Raw {
                    source: "<div>$x$</div>".to_string(),
                },
                NotebookCell::Other {
                    cell_type: "heading".to_string(),
                    source: "# $Title$".to_string(),
                },
            ],
        );
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(
            conversion.artifacts.fragments,
            vec!["<div>$x$</div>", "# $Title$"]
        );
        assert_eq!(conversion.diagnostics.len(), 1);
        assert_eq!(
            conversion.diagnostics[0].kind,
            DiagnosticKind::UnsupportedCellType {
                cell_type: "heading".to_string()
            }
        );
    }

    #[test]
    fn test_unmatched_math_is_warning() {
        let nb = notebook(None, vec![markdown("Costs $5.")]);
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(conversion.artifacts.fragments[0], "Costs $5.");
        assert_eq!(
            conversion.diagnostics,
            vec![Diagnostic::cell(
                0,
                DiagnosticKind::UnmatchedMathDelimiter { offset: 6 }
            )]
        );
    }

    #[test]
    fn test_unmatched_offset_is_in_cell_source() {
        let source = "![plot](attachment:plot.png) costs $5.";
        let cell = NotebookCell::Markdown {
            source: source.to_string(),
            attachments: BTreeMap::from([(
                "plot.png".to_string(),
                MimeBundle::new([("image/svg+xml", "<svg/>")]),
            )]),
        };
        let conversion =
            convert(&notebook(None, vec![cell]), &ConversionConfig::new("demo")).unwrap();

        assert_eq!(
            conversion.artifacts.fragments[0],
            "![plot](/demo_attach_0_plot.png) costs $5."
        );
        assert_eq!(conversion.artifacts.images.len(), 1);
        assert_eq!(
            conversion.diagnostics,
            vec![Diagnostic::cell(
                0,
                DiagnosticKind::UnmatchedMathDelimiter {
                    offset: source.find('$').unwrap()
                }
            )]
        );
    }

    #[test]
    fn test_empty_code_cell_leaves_no_gap() {
        let nb = notebook(
            Some("java"),
            vec![markdown("a"), code("   ", vec![]), markdown("b")],
        );
        let conversion = convert(&nb, &ConversionConfig::new("demo")).unwrap();
        assert_eq!(conversion.artifacts.fragments.len(), 3);
        assert_eq!(conversion.artifacts.markdown, "---\n---\n\na\n\nb\n");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ConversionConfig::new("demo").with_image_dir("/abs");
        assert!(convert(&notebook(None, vec![]), &config).is_err());
    }

    #[test]
    fn test_empty_notebook() {
        let conversion = convert(&notebook(None, vec![]), &ConversionConfig::new("demo")).unwrap();
        assert_eq!(conversion.artifacts.markdown, "---\n---\n\n");
        assert!(conversion.artifacts.fragments.is_empty());
    }
}
