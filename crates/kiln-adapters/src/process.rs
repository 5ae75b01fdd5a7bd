//! External tool execution.

use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
    sync::{Arc, Mutex},
};

use kiln_core::{
    application::{ApplicationError, ports::ToolRunner},
    domain::ToolInvocation,
    error::KilnResult,
};
use tracing::{debug, info, instrument};

/// Runs tools as child processes with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    #[instrument(skip_all, fields(tool = %invocation.tool, cwd = %cwd.display()))]
    fn run(&self, invocation: &ToolInvocation, cwd: &Path) -> KilnResult<()> {
        let program = which::which(&invocation.program).map_err(|e| {
            debug!(program = %invocation.program, error = %e, "lookup failed");
            ApplicationError::ToolNotFound {
                tool: invocation.program.clone(),
            }
        })?;

        info!(command = %invocation, "running");
        let status = Command::new(&program)
            .args(&invocation.args)
            .current_dir(cwd)
            .status()
            .map_err(|e| spawn_error(invocation, &program, cwd, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(ApplicationError::ExternalTool {
                tool: invocation.tool.clone(),
                code: status.code(),
            }
            .into())
        }
    }
}

/// Only a vanished executable counts as a missing tool; anything else
/// (permissions, a bad interpreter line, a missing working directory) keeps
/// the OS reason.
fn spawn_error(
    invocation: &ToolInvocation,
    program: &Path,
    cwd: &Path,
    err: io::Error,
) -> ApplicationError {
    debug!(program = %program.display(), error = %err, "spawn failed");
    if !cwd.is_dir() {
        return ApplicationError::FilesystemError {
            path: cwd.to_path_buf(),
            reason: format!("cannot run {} here: {err}", invocation.program),
        };
    }
    if err.kind() == io::ErrorKind::NotFound {
        return ApplicationError::ToolNotFound {
            tool: invocation.program.clone(),
        };
    }
    ApplicationError::FilesystemError {
        path: program.to_path_buf(),
        reason: format!("cannot start {}: {err}", invocation.program),
    }
}

/// Records invocations instead of running them.
///
/// Clones share the log. Failures can be scripted per logical tool.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    inner: Arc<Mutex<RecordingInner>>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    calls: Vec<(ToolInvocation, PathBuf)>,
    failures: Vec<(String, i32)>,
    missing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `tool` exit with `code`.
    pub fn fail_tool(&self, tool: &str, code: i32) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failures.push((tool.to_string(), code));
        }
    }

    /// Make `program` look absent from PATH.
    pub fn missing_program(&self, program: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.missing.push(program.to_string());
        }
    }

    /// Recorded command lines, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.calls.iter().map(|(inv, _)| inv.to_string()).collect())
            .unwrap_or_default()
    }

    /// Recorded invocations with their working directory.
    pub fn calls(&self) -> Vec<(ToolInvocation, PathBuf)> {
        self.inner
            .lock()
            .map(|inner| inner.calls.clone())
            .unwrap_or_default()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, invocation: &ToolInvocation, cwd: &Path) -> KilnResult<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| ApplicationError::LockPoisoned)?;

        if inner.missing.contains(&invocation.program) {
            return Err(ApplicationError::ToolNotFound {
                tool: invocation.program.clone(),
            }
            .into());
        }

        inner.calls.push((invocation.clone(), cwd.to_path_buf()));

        if let Some((_, code)) = inner.failures.iter().find(|(t, _)| *t == invocation.tool) {
            return Err(ApplicationError::ExternalTool {
                tool: invocation.tool.clone(),
                code: Some(*code),
            }
            .into());
        }
        Ok(())
    }
}
