//! Real process execution for checks.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::debug;

use super::{CommandOutput, CommandRunner, InvocationError};
use crate::quality::{CheckCommand, CheckDefinition};

/// Runs checks as child processes.
///
/// Each child is placed in its own process group on unix so a timeout can
/// kill everything a shell line started, not just the shell. `kill_on_drop`
/// covers the case where the run itself is cancelled.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn build_command(check: &CheckDefinition) -> Command {
        let mut cmd = match &check.command {
            CheckCommand::Shell(line) => shell_command(line),
            CheckCommand::Exec { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        };

        if let Some(ref cwd) = check.cwd {
            cmd.current_dir(cwd);
        }
        cmd.envs(&check.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        check: &CheckDefinition,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, InvocationError> {
        let program = check.command.program().to_string();
        let mut child = Self::build_command(check)
            .spawn()
            .map_err(|e| InvocationError::Spawn {
                program: program.clone(),
                message: e.to_string(),
            })?;

        debug!(check = %check.name, pid = ?child.id(), "spawned check process");

        // Anything the check left behind in its group dies when this drops,
        // including when the run is cancelled mid-check.
        let group = ProcessGroup::of(&child);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // A background child can hold the pipes open after the shell exits,
        // so the reads count against the timeout as well as the wait.
        let collected = {
            let collect = async {
                tokio::join!(child.wait(), read_stream(stdout), read_stream(stderr))
            };
            match timeout {
                Some(limit) => tokio::time::timeout(limit, collect)
                    .await
                    .map_err(|_elapsed| limit),
                None => Ok(collect.await),
            }
        };

        let (waited, stdout, stderr) = match collected {
            Ok(collected) => collected,
            Err(limit) => {
                terminate(&group, &mut child).await;
                return Err(InvocationError::Timeout(limit));
            }
        };

        let status = waited.map_err(|e| InvocationError::Wait {
            program,
            message: e.to_string(),
        })?;

        Ok(CommandOutput {
            exit_code: exit_code_of(status),
            stdout,
            stderr,
        })
    }
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!("failed reading check output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// The process group a check runs in. Killed with SIGKILL on drop.
///
/// The child was spawned with `process_group(0)`, so its pid is the group id.
struct ProcessGroup {
    #[cfg(unix)]
    pgid: Option<libc::pid_t>,
}

impl ProcessGroup {
    #[cfg(unix)]
    fn of(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()),
        }
    }

    #[cfg(not(unix))]
    fn of(_child: &Child) -> Self {
        Self {}
    }

    fn kill(&self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            // SAFETY: killpg only sends a signal. ESRCH for an empty group is
            // expected after a clean exit and ignored.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Kill the child's whole process group, then the child itself, and reap it.
async fn terminate(group: &ProcessGroup, child: &mut Child) {
    group.kill();

    if let Err(e) = child.kill().await {
        debug!("kill after timeout reported: {}", e);
    }
}

/// Signal deaths have no exit code; report them shell-style as 128 + signal.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

/// Locate the executable a check would start, if it is on `PATH`.
#[must_use]
pub fn resolve_program(command: &CheckCommand) -> Option<PathBuf> {
    let program = command.program();
    if program.is_empty() {
        return None;
    }
    which::which(program).ok()
}
