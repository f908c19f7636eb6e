//! Extraction of images from rich display outputs and cell attachments.
//!
//! Extraction is pure: it returns the link to embed and the decoded bytes.
//! Writing them below the site directory is left to
//! [`write_artifacts`](crate::write_artifacts).

use crate::config::ConversionConfig;
use base64::{engine::general_purpose::STANDARD, Engine};
use nbjekyll_notebook::MimeBundle;
use std::collections::BTreeMap;
use thiserror::Error;

/// Image MIME types in order of preference, with their file extension
pub const IMAGE_MIME_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/svg+xml", "svg"),
];

/// An image payload that could not be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("corrupt {mime_type} payload: {source}")]
pub struct ImageDecodeError {
    /// MIME type of the payload
    pub mime_type: String,
    /// Base64 decoder error
    #[source]
    pub source: base64::DecodeError,
}

/// An image ready to be written below the site directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// Path relative to the site root, with `/` separators; also the link
    /// used in the markdown
    pub link: String,
    /// MIME type the image was extracted from
    pub mime_type: String,
    /// Decoded image bytes
    pub bytes: Vec<u8>,
}

impl ExtractedImage {
    /// Markdown image reference to this image
    #[must_use]
    pub fn markdown(&self) -> String {
        format!("![]({})", self.link)
    }
}

/// Extract the preferred image from one rich display output
///
/// The file is named `<notebook>_<cell>_<output>.<ext>`. Returns `Ok(None)`
/// when the bundle holds no image.
///
/// # Errors
///
/// Returns [`ImageDecodeError`] if the chosen payload is not valid base64.
pub fn extract_output_image(
    data: &MimeBundle,
    config: &ConversionConfig,
    cell_index: usize,
    output_index: usize,
) -> Result<Option<ExtractedImage>, ImageDecodeError> {
    let Some((mime_type, extension, payload)) = preferred_image(data) else {
        return Ok(None);
    };

    let file_name = format!(
        "{}_{cell_index}_{output_index}.{extension}",
        config.notebook_name
    );
    let bytes = decode_payload(mime_type, payload)?;

    log::debug!(
        "Extracted {mime_type} from cell {cell_index}, output {output_index} ({} bytes)",
        bytes.len()
    );

    Ok(Some(ExtractedImage {
        link: config.image_link(&file_name),
        mime_type: mime_type.to_string(),
        bytes,
    }))
}

/// Markdown source with attachment references rewritten to extracted images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedAttachments {
    /// Cell source with `attachment:<name>` replaced by root-anchored links
    pub source: String,
    /// Images to write
    pub images: Vec<ExtractedImage>,
    /// Attachments that could not be decoded; their references are kept
    pub errors: Vec<ImageDecodeError>,
}

/// Extract the image attachments of a markdown cell
///
/// Each attachment is stored as `<notebook>_attach_<cell>_<name>` and every
/// `attachment:<name>` reference in the source is replaced by `/<link>`, an
/// absolute path on the site. Attachments without an image payload are left
/// alone.
#[must_use]
pub fn extract_attachments(
    source: &str,
    attachments: &BTreeMap<String, MimeBundle>,
    config: &ConversionConfig,
    cell_index: usize,
) -> ExtractedAttachments {
    let mut result = ExtractedAttachments {
        source: source.to_string(),
        ..ExtractedAttachments::default()
    };

    for (name, data) in attachments {
        let Some((mime_type, _, payload)) = preferred_image(data) else {
            log::debug!("Attachment '{name}' in cell {cell_index} holds no image, skipped");
            continue;
        };

        let bytes = match decode_payload(mime_type, payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.errors.push(e);
                continue;
            }
        };

        let file_name = format!(
            "{}_attach_{cell_index}_{}",
            config.notebook_name,
            sanitize_file_name(name)
        );
        let link = config.image_link(&file_name);
        result.source = result
            .source
            .replace(&format!("attachment:{name}"), &format!("/{link}"));
        result.images.push(ExtractedImage {
            link,
            mime_type: mime_type.to_string(),
            bytes,
        });
    }

    result
}

fn preferred_image(data: &MimeBundle) -> Option<(&'static str, &'static str, &str)> {
    IMAGE_MIME_TYPES
        .iter()
        .find_map(|&(mime_type, extension)| {
            data.get(mime_type)
                .map(|payload| (mime_type, extension, payload))
        })
}

/// Decode an image payload; SVG is stored as text, everything else as base64
fn decode_payload(mime_type: &str, payload: &str) -> Result<Vec<u8>, ImageDecodeError> {
    if mime_type == "image/svg+xml" {
        return Ok(payload.as_bytes().to_vec());
    }

    // nbformat wraps base64 at 76 columns
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|source| ImageDecodeError {
            mime_type: mime_type.to_string(),
            source,
        })
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' => '_',
            c => c,
        })
        .collect()
}
