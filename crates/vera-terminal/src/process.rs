//! The single place where a command string becomes an OS process.
//!
//! Commands run through the platform shell (`sh -c` / `cmd /C`). Anything
//! that wants argv execution or containment later replaces [`run_bounded`]
//! and nothing else.
//!
//! On Unix the child leads its own process group, so the timeout path can
//! kill the whole tree with one `kill(-pgid, SIGKILL)`.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command as AsyncCommand;
use tracing::{debug, warn};

use crate::error::{Result, TerminalError};

/// What a finished child left behind. Streams are decoded lossily as UTF-8
/// and otherwise kept byte for byte.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

fn shell_command(command: &str) -> AsyncCommand {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = AsyncCommand::new("cmd");
        c.arg("/C").arg(command);
        c
    };
    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = AsyncCommand::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

/// Spawn `command` through the shell and wait at most `timeout`.
///
/// # Errors
///
/// - `Spawn`: the shell could not be started.
/// - `Timeout`: deadline expired; the process (group) has been killed.
/// - `Io`: waiting on the child failed.
pub async fn run_bounded(command: &str, timeout: Duration) -> Result<CapturedOutput> {
    let child = shell_command(command)
        .spawn()
        .map_err(|e| TerminalError::Spawn(e.to_string()))?;

    // `wait_with_output` takes the child by value, so it is driven on its own
    // task. The PID is captured first for the kill on the timeout path.
    let pid = child.id();
    let (tx, rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        // The receiver is gone only if we already timed out.
        let _ = tx.send(child.wait_with_output().await);
    });

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(Ok(output))) => Ok(CapturedOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),

        Ok(Ok(Err(e))) => Err(TerminalError::Io(e)),

        // The wait task panicked and dropped the sender.
        Ok(Err(_recv_err)) => Err(TerminalError::Spawn(
            "wait task ended unexpectedly".to_string(),
        )),

        Err(_elapsed) => {
            if let Some(raw_pid) = pid {
                kill_tree(raw_pid).await;
            }
            Err(TerminalError::Timeout {
                secs: timeout.as_secs(),
            })
        }
    }
}

#[cfg(unix)]
async fn kill_tree(pid: u32) {
    let pgid = pid as libc::pid_t;
    // Safety: pgid is the group our child created with process_group(0).
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        debug!(pgid, "killed process group after timeout");
        return;
    }
    // Group already gone or never formed: fall back to the direct child.
    // Safety: pid is our direct child.
    if unsafe { libc::kill(pgid, libc::SIGKILL) } != 0 {
        warn!(pid, error = %std::io::Error::last_os_error(), "kill after timeout failed");
    }
}

#[cfg(not(unix))]
async fn kill_tree(pid: u32) {
    // /T takes the child's descendants with it.
    match AsyncCommand::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(_) => debug!(pid, "taskkill after timeout"),
        Err(e) => warn!(pid, error = %e, "taskkill after timeout failed"),
    }
}


#[cfg(all(test, windows))]
mod windows_tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn timeout_runs_taskkill_without_blocking() {
        let start = Instant::now();
        let err = run_bounded("ping -n 30 127.0.0.1", Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, TerminalError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
