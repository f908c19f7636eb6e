//! Conversion results and writing them to disk.

use crate::config::ConversionConfig;
use crate::error::{ConvertError, Result};
use crate::images::ExtractedImage;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Everything a conversion produces, ready to be persisted by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputArtifacts {
    /// The complete markdown page, front matter included
    pub markdown: String,
    /// One markdown fragment per notebook cell, in document order
    pub fragments: Vec<String>,
    /// Extracted images, in document order
    pub images: Vec<ExtractedImage>,
}

/// Write the markdown page and all extracted images
///
/// Images go to `<site-dir>/<image link>`; missing directories are created.
/// Returns every path written, markdown last.
///
/// # Errors
///
/// Returns [`ConvertError::Write`] naming the first path that could not be
/// created or written. A markdown path that is a directory is rejected
/// before any image is written.
pub fn write_artifacts(
    artifacts: &OutputArtifacts,
    markdown_path: &Path,
    config: &ConversionConfig,
) -> Result<Vec<PathBuf>> {
    if markdown_path.is_dir() {
        return Err(ConvertError::Write {
            path: markdown_path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path is a directory"),
        });
    }

    let mut written = Vec::with_capacity(artifacts.images.len() + 1);

    for image in &artifacts.images {
        let path = config.image_storage_path(&image.link);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConvertError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &image.bytes).map_err(|source| ConvertError::Write {
            path: path.clone(),
            source,
        })?;
        log::debug!("Wrote {} ({} bytes)", path.display(), image.bytes.len());
        written.push(path);
    }

    fs::write(markdown_path, &artifacts.markdown).map_err(|source| ConvertError::Write {
        path: markdown_path.to_path_buf(),
        source,
    })?;
    written.push(markdown_path.to_path_buf());

    Ok(written)
}
