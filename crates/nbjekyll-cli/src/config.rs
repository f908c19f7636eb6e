//! Configuration file support for `.nbjekyll.toml`

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the project configuration file looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = ".nbjekyll.toml";

/// Configuration file structure for `.nbjekyll.toml`
///
/// Precedence order (highest to lowest):
/// 1. Command-line arguments
/// 2. File given with `--config`, or `./.nbjekyll.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory of the Jekyll site
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_dir: Option<PathBuf>,

    /// Image directory relative to the site root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<String>,

    /// Emit `toc: true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_toc: Option<bool>,

    /// Emit `mathjax: true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_mathjax: Option<bool>,

    /// Code fence language when the notebook declares none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,

    /// Binder link used when `--binder-link` is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binder_link: Option<String>,

    /// Per-cell timeout for `--execute`, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_timeout: Option<u64>,
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            // TOML errors include line/column information, preserve it
            eprintln!(
                "{} Failed to parse config file: {}",
                "Error:".red().bold(),
                path.display()
            );
            eprintln!("{} {}", "Parse error:".yellow().bold(), e);
            eprintln!();
            eprintln!("{} Configuration file syntax:", "Help:".cyan().bold());
            eprintln!("  site_dir = \"site\"");
            eprintln!("  image_dir = \"assets/images\"");
            eprintln!("  enable_mathjax = true");
            anyhow::anyhow!("Failed to parse config file: {e}")
        })?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the explicit config file, or the project config if present
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let project = PathBuf::from(PROJECT_CONFIG_FILE);
        if project.exists() {
            Self::load_from_file(&project)
        } else {
            Ok(Self::default())
        }
    }
}
