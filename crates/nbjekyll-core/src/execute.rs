//! Notebook execution before conversion.
//!
//! Running code cells is delegated to an external engine. The converter only
//! needs something that turns a notebook file into a parsed notebook whose
//! `outputs` are populated.

use crate::error::{ConvertError, Result};
use nbjekyll_notebook::{parse_notebook_from_str, ParsedNotebook};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Capability to execute a notebook and return it with fresh outputs
pub trait NotebookExecutor {
    /// Execute the notebook at `path` and return the executed notebook
    ///
    /// The file itself is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Execution`] if the engine fails, or a notebook
    /// error if its result cannot be parsed.
    fn execute(&self, path: &Path) -> Result<ParsedNotebook>;
}

/// Executes notebooks with `jupyter nbconvert --execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JupyterExecutor {
    program: OsString,
    timeout_secs: Option<u64>,
}

impl Default for JupyterExecutor {
    fn default() -> Self {
        Self {
            program: OsString::from("jupyter"),
            timeout_secs: None,
        }
    }
}

impl JupyterExecutor {
    /// Executor using `jupyter` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different `jupyter` executable
    #[must_use = "returns executor with program configured"]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Per-cell execution timeout passed to the engine
    #[must_use = "returns executor with timeout configured"]
    pub const fn with_timeout(mut self, timeout_secs: Option<u64>) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn command(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("nbconvert")
            .args(["--to", "notebook", "--execute", "--stdout"]);
        if let Some(timeout) = self.timeout_secs {
            command.arg(format!("--ExecutePreprocessor.timeout={timeout}"));
        }
        command.arg(path);
        command
    }
}

impl NotebookExecutor for JupyterExecutor {
    fn execute(&self, path: &Path) -> Result<ParsedNotebook> {
        log::debug!("Executing {} with {:?}", path.display(), self.program);

        let output = self.command(path).output().map_err(|e| {
            ConvertError::Execution(format!(
                "failed to start {}: {e}",
                self.program.to_string_lossy()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConvertError::Execution(format!(
                "{} exited with {}: {}",
                self.program.to_string_lossy(),
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            ConvertError::Execution(format!("executed notebook is not valid UTF-8: {e}"))
        })?;
        Ok(parse_notebook_from_str(&stdout)?)
    }
}
