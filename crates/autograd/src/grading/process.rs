/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Direct process execution with OS-level limits.

use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::runner::{RunArg, RunError, RunOutput, Runner};

const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Failure modes of [`execute`].
#[derive(Debug)]
pub(crate) enum ExecError {
    Spawn(io::Error),
    Io(io::Error),
    Timeout,
}

/// Spawns `cmd`, feeds it `input`, and collects its output.
///
/// The child is killed if `deadline` passes first.
pub(crate) async fn execute(
    mut cmd: Command,
    input: Option<Vec<u8>>,
    deadline: Duration,
) -> Result<Output, ExecError> {
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(ExecError::Spawn)?;

    if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
        // Written from a separate task so a program that produces output
        // before draining stdin cannot deadlock against us.
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                debug!(error = %e, "Program closed stdin before reading all input");
            }
        });
    }

    match tokio::time::timeout(deadline, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(ExecError::Io(e)),
        Err(_) => Err(ExecError::Timeout),
    }
}

/// Runs the compiled binary directly on the host.
///
/// On Linux the child gets `RLIMIT_AS` and `RLIMIT_CPU` ceilings and, unless
/// disabled, fresh user and network namespaces with no interfaces besides
/// loopback. Its environment is cleared and any output on stderr fails the
/// run.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    isolate_network: bool,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            isolate_network: true,
        }
    }

    /// Skips the network namespace, for hosts where unprivileged user
    /// namespaces are disabled.
    pub fn without_network_isolation(mut self) -> Self {
        self.isolate_network = false;
        self
    }

    fn command(&self, program: &Path, arg: &RunArg) -> Command {
        let mut cmd = Command::new(program);
        cmd.current_dir(&arg.mount_dir)
            .env_clear()
            .env("PATH", SANDBOX_PATH);

        #[cfg(target_os = "linux")]
        apply_limits(
            &mut cmd,
            arg.mem_limit_bytes(),
            arg.run_timeout.as_secs().saturating_add(1),
            self.isolate_network,
        );

        #[cfg(not(target_os = "linux"))]
        if self.isolate_network {
            warn!("Network isolation is only available on Linux; running without it");
        }

        cmd
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn apply_limits(cmd: &mut Command, memory_bytes: u64, cpu_seconds: u64, isolate_network: bool) {
    use nix::libc::rlim_t;
    use nix::sched::{unshare, CloneFlags};
    use nix::sys::resource::{setrlimit, Resource};

    // SAFETY: the hook only issues async-signal-safe syscalls between fork and exec.
    unsafe {
        cmd.pre_exec(move || {
            setrlimit(
                Resource::RLIMIT_AS,
                memory_bytes as rlim_t,
                memory_bytes as rlim_t,
            )?;
            setrlimit(
                Resource::RLIMIT_CPU,
                cpu_seconds as rlim_t,
                cpu_seconds as rlim_t,
            )?;
            if isolate_network {
                unshare(CloneFlags::CLONE_NEWUSER | CloneFlags::CLONE_NEWNET)?;
            }
            Ok(())
        });
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(&self, arg: RunArg) -> Result<RunOutput, RunError> {
        let program = arg.mount_dir.join(&arg.program_file_name);
        debug!(program = %program.display(), timeout = ?arg.run_timeout, "Running program");

        let cmd = self.command(&program, &arg);
        let output = match execute(cmd, Some(arg.input), arg.run_timeout).await {
            Ok(output) => output,
            Err(ExecError::Spawn(e)) => return Err(RunError::Spawn(e)),
            Err(ExecError::Io(e)) => return Err(RunError::Io(e)),
            Err(ExecError::Timeout) => {
                warn!(program = %program.display(), "Program timed out");
                return Err(RunError::Timeout(arg.run_timeout));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(RunError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }
        if !stderr.is_empty() {
            return Err(RunError::Stderr(stderr));
        }

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
