use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{ConfigurationError, EngineResultError};

/// A loaded layout engine. `compute` is a single blocking call that turns a
/// description into engine output in the requested format.
pub trait LayoutEngine {
    fn is_loaded(&self) -> bool;

    fn compute(
        &self,
        description: &str,
        output_format: &str,
    ) -> Result<String, EngineResultError>;
}

impl<E: LayoutEngine + ?Sized> LayoutEngine for &E {
    fn is_loaded(&self) -> bool {
        (**self).is_loaded()
    }

    fn compute(
        &self,
        description: &str,
        output_format: &str,
    ) -> Result<String, EngineResultError> {
        (**self).compute(description, output_format)
    }
}

impl<E: LayoutEngine + ?Sized> LayoutEngine for Box<E> {
    fn is_loaded(&self) -> bool {
        (**self).is_loaded()
    }

    fn compute(
        &self,
        description: &str,
        output_format: &str,
    ) -> Result<String, EngineResultError> {
        (**self).compute(description, output_format)
    }
}

/// Runs the Graphviz `dot` executable once per layout pass.
#[derive(Debug, Clone)]
pub struct GraphvizCommand {
    program: PathBuf,
    version: String,
}

impl GraphvizCommand {
    /// Probes `program -V` once so a missing or broken install is reported
    /// before any adapter is built around it.
    pub fn load(program: impl Into<PathBuf>) -> Result<Self, ConfigurationError> {
        let program = program.into();
        let output = Command::new(&program)
            .arg("-V")
            .output()
            .map_err(|err| ConfigurationError::EngineUnavailable {
                message: format!("{}: {err}", program.display()),
            })?;
        if !output.status.success() {
            return Err(ConfigurationError::EngineUnavailable {
                message: format!("{} -V exited with {}", program.display(), output.status),
            });
        }
        // dot prints its banner on stderr.
        let version = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Ok(Self { program, version })
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl LayoutEngine for GraphvizCommand {
    fn is_loaded(&self) -> bool {
        true
    }

    fn compute(
        &self,
        description: &str,
        output_format: &str,
    ) -> Result<String, EngineResultError> {
        let failed = |message: String| EngineResultError::EngineFailed { message };
        let mut child = Command::new(&self.program)
            .arg(format!("-T{output_format}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| failed(format!("{}: {err}", self.program.display())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(description.as_bytes())
                .map_err(|err| failed(format!("writing description: {err}")))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|err| failed(format!("waiting for engine: {err}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(failed(format!("{}: {}", output.status, stderr.trim())));
        }
        if !stderr.trim().is_empty() {
            tracing::warn!(stderr = %stderr.trim(), "graphviz reported warnings");
        }
        String::from_utf8(output.stdout).map_err(|err| failed(format!("non-utf8 output: {err}")))
    }
}
