//! Jekyll YAML front matter and the binder badge.

use crate::config::ConversionConfig;
use crate::error::Result;
use serde::Serialize;

/// Badge image shown for the binder link
pub const BINDER_BADGE_IMAGE: &str = "https://mybinder.org/badge_logo.svg";

const FRONT_MATTER_DELIMITER: &str = "---";

/// Page-level fields Jekyll reads from the front matter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
struct FrontMatter<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    toc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mathjax: Option<bool>,
}

impl<'a> FrontMatter<'a> {
    fn from_config(config: &'a ConversionConfig) -> Self {
        Self {
            title: config.title.as_deref(),
            toc: config.enable_toc.then_some(true),
            mathjax: config.enable_mathjax.then_some(true),
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Render the front matter block, ending with the closing `---` line
///
/// Only fields implied by the configuration are present. Without any, the
/// block is empty (`---` twice), which Jekyll still treats as front matter.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn render_front_matter(config: &ConversionConfig) -> Result<String> {
    let front_matter = FrontMatter::from_config(config);
    let fields = if front_matter.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(&front_matter)?
    };
    Ok(format!(
        "{FRONT_MATTER_DELIMITER}\n{fields}{FRONT_MATTER_DELIMITER}\n"
    ))
}

/// Markdown note with a badge linking to the interactive notebook
#[must_use]
pub fn binder_badge(link: &str) -> String {
    format!(
        "---\n\
         *Note:*\n\
         You can also check this page out in an interactive Jupyter notebook by clicking the badge below:\n\
         \n\
         [![Binder]({BINDER_BADGE_IMAGE})]({link})\n\
         \n\
         ---"
    )
}
