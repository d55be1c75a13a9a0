//! Builder for executing external tool commands with timeout and cancellation
//! support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// The child process is killed when the timeout expires, when the
/// cancellation token fires, or when the future returned by
/// [`ToolCommand::execute`] is dropped.
///
/// # Example
///
/// ```no_run
/// use mt_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> mt_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "error", "-show_entries", "format=duration"])
///     .arg("/path/to/clip.mp4")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    cancel: Option<CancellationToken>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            cancel: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Abort the process when `token` is cancelled.
    pub fn cancel_on(&mut self, token: CancellationToken) -> &mut Self {
        self.cancel = Some(token);
        self
    }

    /// The program name used in error messages and logs.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`mt_core::Error::Tool`] if spawning the process fails.
    /// - Returns [`mt_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`mt_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`mt_core::Error::Cancelled`] if the cancellation token fires
    ///   first.
    pub async fn execute(&self) -> mt_core::Result<ToolOutput> {
        let program_name = self.program_name();

        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(mt_core::Error::Cancelled);
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| mt_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        tracing::trace!(tool = %program_name, pid = ?child.id(), "spawned");

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        // Dropping the wait future drops the child, which kills it.
        let result = tokio::select! {
            r = tokio::time::timeout(self.timeout, cmd_output(child)) => r,
            _ = cancelled => {
                tracing::debug!(tool = %program_name, "cancelled; child killed");
                return Err(mt_core::Error::Cancelled);
            }
        };

        match result {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    return Err(mt_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            output.stderr.trim()
                        ),
                    ));
                }
                Ok(output)
            }
            Ok(Err(e)) => Err(mt_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(mt_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

async fn cmd_output(child: tokio::process::Child) -> std::io::Result<ToolOutput> {
    let output = child.wait_with_output().await?;
    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to spawn"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be killed well before 10 seconds.
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn cancellation_aborts_process() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .cancel_on(token)
            .execute()
            .await;
        assert!(matches!(result, Err(mt_core::Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn already_cancelled_never_spawns() {
        let token = CancellationToken::new();
        token.cancel();
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .cancel_on(token)
            .execute()
            .await;
        assert!(matches!(result, Err(mt_core::Error::Cancelled)));
    }

    #[test]
    fn program_name_uses_file_name() {
        let cmd = ToolCommand::new(PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(cmd.program_name(), "ffmpeg");
    }
}
