//! External command execution
//!
//! The release stages drive `docker`/`podman` and `kubectl` as opaque
//! tools. This module spawns them, optionally feeds stdin, and captures
//! their output for logging and error reporting.

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Output of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, None when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// One-line description used as a failure reason
    pub fn failure_summary(&self) -> String {
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());

        let detail = if !self.stderr.trim().is_empty() {
            last_line(&self.stderr)
        } else {
            last_line(&self.stdout)
        };

        if detail.is_empty() {
            format!("exit_code={}", code)
        } else {
            format!("exit_code={}: {}", code, detail)
        }
    }
}

fn last_line(text: &str) -> &str {
    text.trim().lines().last().unwrap_or("").trim()
}

/// Runs `program` with `args`, writing `stdin` to it when given
///
/// Returns an error only when the process could not be spawned or awaited;
/// a non-zero exit is reported through [`CommandOutput::success`].
pub async fn run_command(
    program: &str,
    args: &[String],
    stdin: Option<&str>,
) -> std::io::Result<CommandOutput> {
    debug!("Running {} {:?}", program, args);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes()).await?;
            // Dropping the pipe closes it so the child sees EOF
        }
    }

    let output = child.wait_with_output().await?;

    let result = CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if !result.stdout.trim().is_empty() {
        debug!("{} stdout: {}", program, result.stdout.trim());
    }
    if !result.stderr.trim().is_empty() {
        debug!("{} stderr: {}", program, result.stderr.trim());
    }

    Ok(result)
}
