//! # nbjekyll-notebook
//!
//! Jupyter Notebook (.ipynb) model and parser for nbjekyll.
//!
//! This crate parses notebook interchange files (nbformat 4.x) into a closed,
//! immutable model:
//! - Markdown cells (with their image attachments)
//! - Code cells (with execution counts and captured outputs)
//! - Raw cells and cells of unknown type (kept verbatim)
//! - Cell outputs (stream, rich display data, execute results, errors)
//! - The notebook language, used to tag code fences
//!
//! ## Example
//!
//! ```no_run
//! use nbjekyll_notebook::parse_notebook;
//!
//! let notebook = parse_notebook("tutorial.ipynb")?;
//! for cell in &notebook.cells {
//!     println!("Cell type: {}", cell.cell_type());
//!     println!("Source: {}", cell.source());
//! }
//! # Ok::<(), nbjekyll_notebook::NotebookError>(())
//! ```

/// Error types for notebook parsing
pub mod error;
/// Jupyter notebook (ipynb) parser
pub mod ipynb;

pub use error::{NotebookError, Result};
pub use ipynb::{
    parse_notebook, parse_notebook_from_str, CellOutput, CellType, DisplayKind, MimeBundle,
    NotebookCell, NotebookMetadata, OutputType, ParsedNotebook,
};
