use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use anyhow::Context;
use camino::Utf8Path;

/// What a finished process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a generated script.
pub trait ScriptRunner: Send + Sync {
    fn run(
        &self,
        script: &Utf8Path,
        env: &BTreeMap<String, String>,
        working_dir: &Utf8Path,
    ) -> anyhow::Result<ProcessOutput>;
}

/// Runs scripts with a local Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: String,
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl ScriptRunner for PythonRunner {
    fn run(
        &self,
        script: &Utf8Path,
        env: &BTreeMap<String, String>,
        working_dir: &Utf8Path,
    ) -> anyhow::Result<ProcessOutput> {
        tracing::debug!(interpreter = %self.interpreter, %script, "running script");

        let output = Command::new(&self.interpreter)
            .arg(script.as_str())
            .envs(env)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to start '{}' for {script}", self.interpreter))?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
