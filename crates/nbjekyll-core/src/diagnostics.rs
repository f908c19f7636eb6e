//! Non-fatal problems found while converting a notebook.

use std::fmt;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Conversion output is still correct, the input was odd
    Warning,
    /// Part of the output is missing; the run must exit non-zero
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What went wrong
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A math delimiter without a partner; text after it was left untouched
    UnmatchedMathDelimiter {
        /// Byte offset of the delimiter in the cell source
        offset: usize,
    },
    /// A rich display output with no MIME type this converter can render
    UnknownMimeType {
        /// MIME types present in the output
        mime_types: Vec<String>,
    },
    /// A cell whose `cell_type` is unknown; passed through verbatim
    UnsupportedCellType {
        /// The `cell_type` found in the notebook
        cell_type: String,
    },
    /// An output whose `output_type` is unknown; skipped
    UnknownOutputType {
        /// The `output_type` found in the notebook
        output_type: String,
    },
    /// An image payload that is not valid base64
    ImageDecode {
        /// MIME type of the payload
        mime_type: String,
        /// Decoder message
        message: String,
    },
}

impl DiagnosticKind {
    /// Severity implied by the kind
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ImageDecode { .. } => Severity::Error,
            Self::UnmatchedMathDelimiter { .. }
            | Self::UnknownMimeType { .. }
            | Self::UnsupportedCellType { .. }
            | Self::UnknownOutputType { .. } => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedMathDelimiter { offset } => write!(
                f,
                "unmatched math delimiter at byte {offset}, trailing text left unchanged"
            ),
            Self::UnknownMimeType { mime_types } => write!(
                f,
                "no renderable MIME type in output (found: {}), output skipped",
                mime_types.join(", ")
            ),
            Self::UnsupportedCellType { cell_type } => write!(
                f,
                "unsupported cell type '{cell_type}', source passed through unchanged"
            ),
            Self::UnknownOutputType { output_type } => {
                write!(f, "unknown output type '{output_type}', output skipped")
            }
            Self::ImageDecode { mime_type, message } => {
                write!(f, "corrupt {mime_type} payload: {message}")
            }
        }
    }
}

/// A located conversion problem
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// Index of the cell the problem was found in
    pub cell: Option<usize>,
    /// Index of the output within the cell, for output problems
    pub output: Option<usize>,
    /// The problem itself
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Problem in a cell as a whole
    #[must_use]
    pub const fn cell(cell: usize, kind: DiagnosticKind) -> Self {
        Self {
            cell: Some(cell),
            output: None,
            kind,
        }
    }

    /// Problem in one output of a cell
    #[must_use]
    pub const fn output(cell: usize, output: usize, kind: DiagnosticKind) -> Self {
        Self {
            cell: Some(cell),
            output: Some(output),
            kind,
        }
    }

    /// Severity of the problem
    #[inline]
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.cell, self.output) {
            (Some(cell), Some(output)) => write!(f, "cell {cell}, output {output}: {}", self.kind),
            (Some(cell), None) => write!(f, "cell {cell}: {}", self.kind),
            _ => write!(f, "{}", self.kind),
        }
    }
}
