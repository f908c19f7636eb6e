//! nbjekyll CLI - Jupyter notebook to Jekyll markdown converter
//!
//! Converts one executed notebook into a Kramdown page for a Jekyll site,
//! extracting figures into the site's image directory.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use config::Config;
use nbjekyll_core::{
    convert_file, write_artifacts, Conversion, ConversionConfig, JupyterExecutor,
    NotebookExecutor, Severity, DEFAULT_NOTEBOOK_NAME,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "nbjekyll",
    about = "Convert Jupyter notebooks to Jekyll markdown",
    long_about = "Convert an executed Jupyter notebook into Jekyll/Kramdown markdown.\n\
                  \n\
                  Math delimiters are rewritten for MathJax, code cells are fenced with the\n\
                  notebook language, and images are extracted below the site directory.\n\
                  \n\
                  Defaults can be set via .nbjekyll.toml configuration file.",
    version
)]
struct Args {
    /// Notebook to convert (.ipynb)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output markdown file (default: input path with .md extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Link to the interactive notebook; adds a binder badge
    #[arg(long, value_name = "URL")]
    binder_link: Option<String>,

    /// 0-based index of the cell after which the binder badge is inserted
    #[arg(long, value_name = "INDEX", requires = "binder_link")]
    binder_link_cell: Option<usize>,

    /// Image directory relative to the site directory (default: .)
    #[arg(long, value_name = "DIR")]
    image_dir: Option<String>,

    /// Root directory of the Jekyll site (default: .)
    #[arg(long, value_name = "DIR")]
    site_dir: Option<PathBuf>,

    /// Page title for the front matter
    #[arg(long, value_name = "TITLE")]
    md_title: Option<String>,

    /// Add `toc: true` to the front matter
    #[arg(long)]
    enable_toc: bool,

    /// Add `mathjax: true` to the front matter
    #[arg(long)]
    enable_mathjax: bool,

    /// Execute the notebook with jupyter nbconvert before converting
    #[arg(long)]
    execute: bool,

    /// Per-cell execution timeout in seconds
    #[arg(long, value_name = "SECONDS", requires = "execute")]
    execute_timeout: Option<u64>,

    /// Code fence language when the notebook metadata names none
    #[arg(long, value_name = "LANG")]
    default_language: Option<String>,

    /// Configuration file (default: ./.nbjekyll.toml if present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Check if output should be shown (not quiet)
    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Default log filter, overridden by `RUST_LOG`
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.log_filter()),
    )
    .target(env_logger::Target::Stderr)
    .init();

    let has_errors = run(&args, verbosity)?;
    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

/// Convert the notebook and write the results; returns whether any
/// conversion error was reported
fn run(args: &Args, verbosity: Verbosity) -> Result<bool> {
    if !args.input.is_file() {
        eprintln!(
            "{} Input file not found: {}",
            "Error:".red().bold(),
            args.input.display()
        );
        eprintln!(
            "{} Check that the file path is correct and the file exists",
            "Help:".cyan().bold()
        );
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let file_config = Config::discover(args.config.as_deref())?;
    let config = build_config(args, &file_config);
    config.validate()?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    check_output_dir(&output)?;

    let executor = args.execute.then(|| {
        JupyterExecutor::new().with_timeout(args.execute_timeout.or(file_config.execute_timeout))
    });
    let conversion = convert_file(
        &args.input,
        &config,
        executor.as_ref().map(|e| e as &dyn NotebookExecutor),
    )
    .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    report_diagnostics(&conversion, verbosity);

    let written = write_artifacts(&conversion.artifacts, &output, &config)
        .with_context(|| format!("Failed to write output for {}", args.input.display()))?;

    if verbosity.should_show_output() {
        eprintln!(
            "{} Output written to: {}",
            "✓".green().bold(),
            output.display().to_string().bright_white()
        );
    }
    if verbosity == Verbosity::Verbose {
        for path in written.iter().filter(|p| **p != output) {
            eprintln!("{} Image written to: {}", "Info:".blue().bold(), path.display());
        }
    }

    Ok(conversion.has_errors())
}

/// Resolve options with precedence: CLI > config file > defaults
fn build_config(args: &Args, file: &Config) -> ConversionConfig {
    let notebook_name = args
        .input
        .file_stem()
        .map_or_else(
            || DEFAULT_NOTEBOOK_NAME.to_string(),
            |stem| stem.to_string_lossy().into_owned(),
        );

    let mut config = ConversionConfig::new(notebook_name)
        .with_title(args.md_title.clone())
        .with_toc(args.enable_toc || file.enable_toc.unwrap_or(false))
        .with_mathjax(args.enable_mathjax || file.enable_mathjax.unwrap_or(false))
        .with_binder_link(
            args.binder_link.clone().or_else(|| file.binder_link.clone()),
            args.binder_link_cell.unwrap_or(0),
        )
        .with_default_language(
            args.default_language
                .clone()
                .or_else(|| file.default_language.clone()),
        );

    if let Some(site_dir) = args.site_dir.as_ref().or(file.site_dir.as_ref()) {
        config = config.with_site_dir(site_dir.clone());
    }
    if let Some(image_dir) = args.image_dir.as_ref().or(file.image_dir.as_ref()) {
        config = config.with_image_dir(image_dir.clone());
    }
    config
}

/// Generate output path from input path: "tutorial.ipynb" -> "tutorial.md"
fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("md")
}

/// Fail before converting if the output file cannot be created
fn check_output_dir(output: &Path) -> Result<()> {
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.is_dir() {
        eprintln!(
            "{} Output directory does not exist: {}",
            "Error:".red().bold(),
            parent.display()
        );
        anyhow::bail!("Output directory does not exist: {}", parent.display());
    }
    if output.is_dir() {
        eprintln!(
            "{} Output path is a directory: {}",
            "Error:".red().bold(),
            output.display()
        );
        eprintln!(
            "{} Pass the markdown file to create, e.g. --output {}",
            "Help:".cyan().bold(),
            output.join("page.md").display()
        );
        anyhow::bail!("Output path is a directory: {}", output.display());
    }
    Ok(())
}

fn report_diagnostics(conversion: &Conversion, verbosity: Verbosity) {
    for diagnostic in &conversion.diagnostics {
        match diagnostic.severity() {
            Severity::Error => eprintln!("{} {diagnostic}", "Error:".red().bold()),
            Severity::Warning if verbosity.should_show_output() => {
                eprintln!("{} {diagnostic}", "Warning:".yellow().bold());
            }
            Severity::Warning => {}
        }
    }
}
