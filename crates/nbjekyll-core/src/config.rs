//! Conversion configuration.

use crate::error::{ConvertError, Result};
use std::path::{Path, PathBuf};

/// Notebook name used when the caller does not supply one
pub const DEFAULT_NOTEBOOK_NAME: &str = "notebook";

/// Options for one notebook conversion
///
/// Built once (usually from command-line flags) and passed by reference to
/// every stage of the pipeline. Nothing in the pipeline mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Base name of the notebook, used to name extracted images
    pub notebook_name: String,

    /// `title:` field of the front matter; no title is synthesized when `None`
    pub title: Option<String>,

    /// Emit `toc: true` in the front matter
    pub enable_toc: bool,

    /// Emit `mathjax: true` in the front matter
    pub enable_mathjax: bool,

    /// Root directory of the Jekyll site on disk
    pub site_dir: PathBuf,

    /// Image directory relative to the site root, e.g. `assets/images/demo`.
    /// Must not start with a path separator.
    pub image_dir: String,

    /// Link to the interactive notebook; enables the binder badge
    pub binder_link: Option<String>,

    /// 0-based index of the cell after which the binder badge is inserted
    pub binder_link_cell: usize,

    /// Code fence language when neither a cell magic nor the notebook
    /// metadata names one
    pub default_language: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            notebook_name: DEFAULT_NOTEBOOK_NAME.to_string(),
            title: None,
            enable_toc: false,
            enable_mathjax: false,
            site_dir: PathBuf::from("."),
            image_dir: ".".to_string(),
            binder_link: None,
            binder_link_cell: 0,
            default_language: None,
        }
    }
}

impl ConversionConfig {
    /// Create a configuration for the notebook with the given base name
    #[must_use]
    pub fn new(notebook_name: impl Into<String>) -> Self {
        Self {
            notebook_name: notebook_name.into(),
            ..Self::default()
        }
    }

    /// Set the front matter title
    #[inline]
    #[must_use = "returns config with title configured"]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    /// Enable or disable `toc: true`
    #[inline]
    #[must_use = "returns config with table of contents setting configured"]
    pub const fn with_toc(mut self, enable: bool) -> Self {
        self.enable_toc = enable;
        self
    }

    /// Enable or disable `mathjax: true`
    #[inline]
    #[must_use = "returns config with MathJax setting configured"]
    pub const fn with_mathjax(mut self, enable: bool) -> Self {
        self.enable_mathjax = enable;
        self
    }

    /// Set the Jekyll site directory
    #[inline]
    #[must_use = "returns config with site directory configured"]
    pub fn with_site_dir(mut self, site_dir: impl Into<PathBuf>) -> Self {
        self.site_dir = site_dir.into();
        self
    }

    /// Set the image directory (relative to the site directory)
    #[inline]
    #[must_use = "returns config with image directory configured"]
    pub fn with_image_dir(mut self, image_dir: impl Into<String>) -> Self {
        self.image_dir = image_dir.into();
        self
    }

    /// Set the binder link and the cell the badge follows
    ///
    /// An empty link disables the badge.
    #[must_use = "returns config with binder badge configured"]
    pub fn with_binder_link(mut self, link: Option<String>, cell: usize) -> Self {
        self.binder_link = link.filter(|l| !l.trim().is_empty());
        self.binder_link_cell = cell;
        self
    }

    /// Set the fallback code fence language
    #[inline]
    #[must_use = "returns config with default language configured"]
    pub fn with_default_language(mut self, language: Option<String>) -> Self {
        self.default_language = language;
        self
    }

    /// Check the configuration before anything is converted or written
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Config`] if the image directory is absolute or
    /// starts with a separator, or if the notebook name is empty or contains
    /// a path separator.
    pub fn validate(&self) -> Result<()> {
        if self.image_dir.starts_with(['/', '\\']) || Path::new(&self.image_dir).is_absolute() {
            return Err(ConvertError::Config(format!(
                "image directory '{}' must be relative to the site directory and must not start with a path separator",
                self.image_dir
            )));
        }
        if self.notebook_name.trim().is_empty() {
            return Err(ConvertError::Config(
                "notebook name must not be empty".to_string(),
            ));
        }
        if self.notebook_name.contains(['/', '\\']) {
            return Err(ConvertError::Config(format!(
                "notebook name '{}' must not contain a path separator",
                self.notebook_name
            )));
        }
        Ok(())
    }

    /// Image directory as used inside markdown links, without `./` or a
    /// trailing separator. Empty when images live at the site root.
    #[must_use]
    pub fn image_link_dir(&self) -> String {
        let normalized = self.image_dir.replace('\\', "/");
        normalized
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Link to an extracted image file, relative to the site root
    #[must_use]
    pub fn image_link(&self, file_name: &str) -> String {
        let dir = self.image_link_dir();
        if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{dir}/{file_name}")
        }
    }

    /// On-disk location of an image given its site-relative link
    #[must_use]
    pub fn image_storage_path(&self, link: &str) -> PathBuf {
        link.split('/')
            .fold(self.site_dir.clone(), |path, part| path.join(part))
    }
}
