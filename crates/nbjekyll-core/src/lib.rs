//! # nbjekyll-core
//!
//! Conversion of executed Jupyter notebooks into Jekyll/Kramdown markdown.
//!
//! The pipeline is a pure function of the parsed notebook and a
//! [`ConversionConfig`]:
//! - markdown cells get their math delimiters normalized for Kramdown
//! - code cells become fenced blocks tagged with the notebook language
//! - outputs become `output`/`error` blocks, raw HTML/markdown, or images
//! - a YAML front matter block and an optional binder badge are added
//!
//! Nothing is written until [`write_artifacts`] is called, so a failed run
//! leaves no partial output behind.
//!
//! ## Example
//!
//! ```no_run
//! use nbjekyll_core::{convert_file, write_artifacts, ConversionConfig};
//! use std::path::Path;
//!
//! let config = ConversionConfig::new("tutorial")
//!     .with_site_dir("site")
//!     .with_image_dir("assets/images/tutorial")
//!     .with_mathjax(true);
//! let conversion = convert_file(Path::new("tutorial.ipynb"), &config, None)?;
//! for diagnostic in &conversion.diagnostics {
//!     eprintln!("{diagnostic}");
//! }
//! write_artifacts(&conversion.artifacts, Path::new("site/tutorial.md"), &config)?;
//! # Ok::<(), nbjekyll_core::ConvertError>(())
//! ```

/// Conversion options
pub mod config;
/// Cell dispatch and document assembly
pub mod converter;
/// Non-fatal conversion problems
pub mod diagnostics;
/// Error types
pub mod error;
/// Notebook execution
pub mod execute;
/// Fenced code blocks and language selection
pub mod fence;
/// Front matter and binder badge
pub mod front_matter;
/// Image extraction
pub mod images;
/// Math delimiter normalization
pub mod math;
/// Conversion results and persistence
pub mod output;

pub use config::{ConversionConfig, DEFAULT_NOTEBOOK_NAME};
pub use converter::{convert, convert_file, Conversion, NotebookConverter};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use error::{ConvertError, Result};
pub use execute::{JupyterExecutor, NotebookExecutor};
pub use fence::{cell_language, fenced, notebook_language};
pub use front_matter::{binder_badge, render_front_matter};
pub use images::{
    extract_attachments, extract_output_image, ExtractedAttachments, ExtractedImage,
    ImageDecodeError, IMAGE_MIME_TYPES,
};
pub use math::{normalize_math, normalize_math_with_report, NormalizedMath};
pub use output::{write_artifacts, OutputArtifacts};
