//! Error types for notebook conversion.

use nbjekyll_notebook::NotebookError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors of a conversion run.
///
/// Content problems that still let the document be produced (unmatched math
/// delimiters, unknown MIME types, corrupt image payloads) are reported as
/// [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The notebook could not be read or parsed
    #[error(transparent)]
    Notebook(#[from] NotebookError),

    /// Invalid option value or combination
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The front matter could not be serialized
    #[error("Failed to render front matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    /// Writing an output file failed
    #[error("Failed to write {path}: {source}")]
    Write {
        /// File or directory that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The external notebook execution engine failed
    #[error("Notebook execution failed: {0}")]
    Execution(String),
}

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;
