//! Type-Safe Tool Execution
//!
//! `run_tool` is the only place external tools are spawned. It guarantees:
//!
//! - Process group isolation (`in_new_process_group`)
//! - Registration with `ChildRegistry` while the tool runs
//! - Captured stdout/stderr, preserved verbatim for diagnosis

use crate::error::{PatchsetError, Result};
use crate::process_guard::{CommandProcessGroup, Registration};
use crate::tool_traits::ToolInvocation;
use std::process::{Command, Stdio};
use tracing::{debug, error, info};

/// Execute an external tool and capture its output.
///
/// A non-zero exit is not an error here; call `ToolOutput::ensure_success`
/// when it should be. Failing to spawn at all is an IO error.
pub fn run_tool<T: ToolInvocation + ?Sized>(invocation: &T) -> Result<ToolOutput> {
    let name = invocation.tool_name();
    let program = invocation.program();
    let cli_args = invocation.to_cli_args();
    let env_vars = invocation.get_env_vars();

    debug!("run_tool: {} {:?} env={:?}", program.display(), cli_args, env_vars);

    let mut cmd = Command::new(program);
    cmd.args(&cli_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group();

    for (key, value) in &env_vars {
        cmd.env(key, value);
    }

    let child = cmd.spawn().map_err(|e| {
        error!("Failed to spawn {} ({}): {}", name, program.display(), e);
        PatchsetError::Io(e)
    })?;

    let registration = Registration::new(child.id());
    let output = child.wait_with_output()?;
    drop(registration);

    let result = ToolOutput {
        tool: name,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        success: output.status.success(),
    };

    if result.success {
        debug!("{} finished", result.tool);
    } else {
        info!(
            "{} failed with exit code {}",
            result.tool,
            result.exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string())
        );
    }

    Ok(result)
}

/// Output from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool: String,
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ToolOutput {
    /// Turn a non-zero exit into `ExternalToolFailure`, logging the captured
    /// streams first.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }

        error!("{} stdout:\n{}", self.tool, self.stdout.trim_end());
        error!("{} stderr:\n{}", self.tool, self.stderr.trim_end());

        Err(PatchsetError::ExternalToolFailure {
            tool: self.tool,
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        })
    }
}
