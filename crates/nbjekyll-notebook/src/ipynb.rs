use crate::error::{NotebookError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Oldest nbformat major version with a top-level `cells` array
const MIN_NBFORMAT_MAJOR: u32 = 4;

/// Parsed Jupyter Notebook content
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedNotebook {
    /// Notebook-level metadata
    pub metadata: NotebookMetadata,
    /// Cells in document order
    pub cells: Vec<NotebookCell>,
    /// nbformat major version
    pub nbformat: u32,
    /// nbformat minor version
    pub nbformat_minor: u32,
}

/// Notebook-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NotebookMetadata {
    /// Programming language name (e.g., "java", "python")
    pub language_name: Option<String>,
}

/// Individual notebook cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotebookCell {
    /// Markdown documentation cell
    Markdown {
        /// Cell source content
        source: String,
        /// Inline attachments, keyed by attachment name
        attachments: BTreeMap<String, MimeBundle>,
    },
    /// Executable code cell
    Code {
        /// Cell source content
        source: String,
        /// Execution count, `None` if never executed
        execution_count: Option<i64>,
        /// Captured outputs in execution order
        outputs: Vec<CellOutput>,
    },
    /// Raw text cell (no formatting)
    Raw {
        /// Cell source content
        source: String,
    },
    /// Cell with a `cell_type` this parser does not know
    Other {
        /// The `cell_type` string found in the file
        cell_type: String,
        /// Cell source content
        source: String,
    },
}

impl NotebookCell {
    /// The `cell_type` string of this cell
    #[inline]
    #[must_use]
    pub fn cell_type(&self) -> &str {
        match self {
            Self::Markdown { .. } => "markdown",
            Self::Code { .. } => "code",
            Self::Raw { .. } => "raw",
            Self::Other { cell_type, .. } => cell_type,
        }
    }

    /// Cell source with all lines concatenated
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Markdown { source, .. }
            | Self::Code { source, .. }
            | Self::Raw { source, .. }
            | Self::Other { source, .. } => source,
        }
    }
}

/// Type of notebook cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Executable code cell
    #[default]
    Code,
    /// Markdown documentation cell
    Markdown,
    /// Raw text cell (no formatting)
    Raw,
}

impl std::fmt::Display for CellType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Raw => "raw",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CellType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "markdown" => Ok(Self::Markdown),
            "raw" => Ok(Self::Raw),
            _ => Err(format!(
                "Unknown cell type '{s}'. Expected: code, markdown, raw"
            )),
        }
    }
}

/// Rich output payloads keyed by MIME type
///
/// Multi-line payloads (arrays of strings) are joined on parse, and JSON
/// payloads such as `application/json` are kept in their serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MimeBundle(BTreeMap<String, String>);

impl MimeBundle {
    /// Build a bundle from MIME type/payload pairs
    #[must_use]
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Payload for the given MIME type
    #[inline]
    #[must_use]
    pub fn get(&self, mime_type: &str) -> Option<&str> {
        self.0.get(mime_type).map(String::as_str)
    }

    /// All MIME types present, in sorted order
    pub fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether the bundle has no payloads at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_json(data: BTreeMap<String, Value>) -> Self {
        Self(
            data.into_iter()
                .map(|(mime, payload)| (mime, payload_to_string(payload)))
                .collect(),
        )
    }
}

/// Kind of rich display output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayKind {
    /// `display_data` output
    DisplayData,
    /// `execute_result` output
    ExecuteResult {
        /// Execution count the result belongs to
        execution_count: Option<i64>,
    },
}

/// Cell output data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellOutput {
    /// Stream output (stdout/stderr)
    Stream {
        /// Stream name, usually `stdout` or `stderr`
        name: String,
        /// Captured text
        text: String,
    },
    /// Rich display data or execute result
    RichDisplay {
        /// Which output type carried the bundle
        kind: DisplayKind,
        /// Payloads keyed by MIME type
        data: MimeBundle,
    },
    /// Error raised while executing the cell
    Error {
        /// Exception name
        ename: String,
        /// Exception message
        evalue: String,
        /// Traceback lines (may contain ANSI escapes)
        traceback: Vec<String>,
    },
    /// Output with an `output_type` this parser does not know
    Unknown {
        /// The `output_type` string found in the file
        output_type: String,
    },
}

/// Type of cell output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputType {
    /// Stream output (stdout/stderr)
    #[default]
    Stream,
    /// Rich display data (images, HTML, etc.)
    DisplayData,
    /// Result of code execution
    ExecuteResult,
    /// Error traceback
    Error,
}

impl std::fmt::Display for OutputType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Stream => "stream",
            Self::DisplayData => "display_data",
            Self::ExecuteResult => "execute_result",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stream" => Ok(Self::Stream),
            "display_data" => Ok(Self::DisplayData),
            "execute_result" => Ok(Self::ExecuteResult),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "Unknown output type '{s}'. Expected: stream, display_data, execute_result, error"
            )),
        }
    }
}

/// Text that nbformat stores either as one string or as a list of lines
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MultilineText {
    Lines(Vec<String>),
    Single(String),
}

impl Default for MultilineText {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl From<MultilineText> for String {
    fn from(text: MultilineText) -> Self {
        match text {
            MultilineText::Lines(lines) => lines.concat(),
            MultilineText::Single(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    cells: Vec<RawCell>,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    nbformat: u32,
    #[serde(default)]
    nbformat_minor: u32,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: String,
    #[serde(default)]
    source: MultilineText,
    #[serde(default)]
    execution_count: Option<i64>,
    #[serde(default)]
    outputs: Vec<Value>,
    #[serde(default)]
    attachments: Option<BTreeMap<String, BTreeMap<String, Value>>>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    #[serde(default)]
    name: String,
    #[serde(default)]
    text: MultilineText,
}

#[derive(Debug, Deserialize)]
struct RawDisplay {
    #[serde(default)]
    data: BTreeMap<String, Value>,
    #[serde(default)]
    execution_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    #[serde(default)]
    ename: String,
    #[serde(default)]
    evalue: String,
    #[serde(default)]
    traceback: Vec<String>,
}

/// Parse a Jupyter Notebook from a file path
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (I/O error)
/// - The notebook JSON is malformed or misses required keys
/// - The notebook uses nbformat 3 or older
#[must_use = "this function returns a parsed notebook that should be processed"]
pub fn parse_notebook<P: AsRef<Path>>(path: P) -> Result<ParsedNotebook> {
    let content = fs::read_to_string(path)?;
    parse_notebook_from_str(&content)
}

/// Parse a Jupyter Notebook from a string
///
/// # Errors
///
/// Returns an error if the notebook JSON is malformed, misses the `cells`
/// array, or declares an nbformat major version older than 4.
#[must_use = "this function returns a parsed notebook that should be processed"]
pub fn parse_notebook_from_str(content: &str) -> Result<ParsedNotebook> {
    let value: Value = serde_json::from_str(content)?;
    if !value.is_object() {
        return Err(NotebookError::InvalidFormat(
            "top-level value must be a JSON object".to_string(),
        ));
    }

    // nbformat 3 keeps cells under `worksheets`; reject it before looking for `cells`
    if let Some(major) = value.get("nbformat").and_then(Value::as_u64) {
        let major = u32::try_from(major).unwrap_or(u32::MAX);
        if major < MIN_NBFORMAT_MAJOR {
            let minor = value
                .get("nbformat_minor")
                .and_then(Value::as_u64)
                .and_then(|m| u32::try_from(m).ok())
                .unwrap_or(0);
            return Err(NotebookError::UnsupportedVersion { major, minor });
        }
    }

    let raw: RawNotebook = serde_json::from_value(value)?;
    let metadata = extract_metadata(&raw.metadata);

    let cells = raw
        .cells
        .into_iter()
        .enumerate()
        .map(|(index, cell)| extract_cell(index, cell))
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "Parsed notebook (nbformat {}.{}) with {} cells",
        raw.nbformat,
        raw.nbformat_minor,
        cells.len()
    );

    Ok(ParsedNotebook {
        metadata,
        cells,
        nbformat: raw.nbformat,
        nbformat_minor: raw.nbformat_minor,
    })
}

/// Extract notebook metadata
///
/// Metadata is free-form in practice, so the language is read leniently:
/// `language_info.name` first, then `kernelspec.language`.
fn extract_metadata(metadata: &Value) -> NotebookMetadata {
    let str_at = |pointer: &str| {
        metadata
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(String::from)
    };

    NotebookMetadata {
        language_name: str_at("/language_info/name").or_else(|| str_at("/kernelspec/language")),
    }
}

/// Convert one raw cell into the closed cell model
fn extract_cell(index: usize, cell: RawCell) -> Result<NotebookCell> {
    let source = String::from(cell.source);

    let cell = match cell.cell_type.parse::<CellType>() {
        Ok(CellType::Markdown) => NotebookCell::Markdown {
            source,
            attachments: cell
                .attachments
                .unwrap_or_default()
                .into_iter()
                .map(|(name, data)| (name, MimeBundle::from_json(data)))
                .collect(),
        },
        Ok(CellType::Code) => NotebookCell::Code {
            source,
            execution_count: cell.execution_count,
            outputs: cell
                .outputs
                .into_iter()
                .enumerate()
                .map(|(output_index, output)| {
                    extract_output(output).map_err(|e| {
                        NotebookError::InvalidFormat(format!(
                            "cell {index}, output {output_index}: {e}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        },
        Ok(CellType::Raw) => NotebookCell::Raw { source },
        Err(_) => NotebookCell::Other {
            cell_type: cell.cell_type,
            source,
        },
    };

    Ok(cell)
}

/// Convert one raw output object, dispatching on its `output_type`
fn extract_output(output: Value) -> Result<CellOutput> {
    let output_type = output
        .get("output_type")
        .and_then(Value::as_str)
        .ok_or_else(|| NotebookError::InvalidFormat("missing `output_type`".to_string()))?
        .to_string();

    let output = match output_type.parse::<OutputType>() {
        Ok(OutputType::Stream) => {
            let stream: RawStream = serde_json::from_value(output)?;
            CellOutput::Stream {
                name: stream.name,
                text: stream.text.into(),
            }
        }
        Ok(OutputType::DisplayData) => {
            let display: RawDisplay = serde_json::from_value(output)?;
            CellOutput::RichDisplay {
                kind: DisplayKind::DisplayData,
                data: MimeBundle::from_json(display.data),
            }
        }
        Ok(OutputType::ExecuteResult) => {
            let display: RawDisplay = serde_json::from_value(output)?;
            CellOutput::RichDisplay {
                kind: DisplayKind::ExecuteResult {
                    execution_count: display.execution_count,
                },
                data: MimeBundle::from_json(display.data),
            }
        }
        Ok(OutputType::Error) => {
            let error: RawError = serde_json::from_value(output)?;
            CellOutput::Error {
                ename: error.ename,
                evalue: error.evalue,
                traceback: error.traceback,
            }
        }
        Err(_) => CellOutput::Unknown { output_type },
    };

    Ok(output)
}

/// Flatten a MIME payload into text
fn payload_to_string(payload: Value) -> String {
    match payload {
        Value::String(s) => s,
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<String>(),
        other => other.to_string(),
    }
}
