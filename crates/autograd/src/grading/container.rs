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

//! Throwaway-container sandbox.
//!
//! Each run starts a fresh container with no network, a memory ceiling, a
//! single CPU and a read-only view of the work directory; the program is
//! wrapped in `timeout` and the container is removed on exit.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::process::{execute, ExecError};
use super::runner::{RunArg, RunError, RunOutput, Runner};

/// Exit status `timeout(1)` reports when it had to kill the program.
const TIMEOUT_EXIT_CODE: i32 = 124;

/// Time allowed on top of the program's own limit for the container to start
/// and tear down.
const STARTUP_GRACE: Duration = Duration::from_secs(15);

/// How containers are launched.
#[derive(Debug, Clone)]
pub struct ContainerRuntime {
    /// Container CLI, `podman` or `docker`
    pub binary: String,
    /// Image used to run compiled programs
    pub run_image: String,
    /// Image providing the compiler toolchain
    pub compile_image: String,
    /// CPU quota passed to `--cpus`
    pub cpus: String,
}

impl Default for ContainerRuntime {
    fn default() -> Self {
        Self {
            binary: "podman".to_string(),
            run_image: "gcc:latest".to_string(),
            compile_image: "gcc:latest".to_string(),
            cpus: "1".to_string(),
        }
    }
}

impl ContainerRuntime {
    /// Flags shared by every sandbox container.
    pub(crate) fn isolation_args(&self, name: &str, mem_limit_mb: u64) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--network=none".to_string(),
            format!("--memory={}m", mem_limit_mb),
            format!("--cpus={}", self.cpus),
            "--pids-limit=64".to_string(),
            "--cap-drop=ALL".to_string(),
            "--security-opt=no-new-privileges".to_string(),
        ]
    }

    pub(crate) fn container_name(purpose: &str) -> String {
        format!("autograd-{}-{}", purpose, Ulid::new().to_string().to_lowercase())
    }

    /// Force-removes a container left behind by a host-side timeout.
    pub(crate) async fn remove(&self, name: &str) {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["rm", "-f", name]);
        match execute(cmd, None, Duration::from_secs(30)).await {
            Ok(output) if output.status.success() => debug!(container = name, "Removed container"),
            Ok(output) => warn!(
                container = name,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Failed to remove container"
            ),
            Err(e) => warn!(container = name, error = ?e, "Failed to remove container"),
        }
    }
}

/// Runs compiled programs inside throwaway containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerRunner {
    runtime: ContainerRuntime,
}

impl ContainerRunner {
    pub fn new(runtime: ContainerRuntime) -> Self {
        Self { runtime }
    }

    fn run_args(&self, name: &str, arg: &RunArg) -> Vec<String> {
        let timeout_secs = arg.run_timeout.as_secs().max(1);
        let mut args = self.runtime.isolation_args(name, arg.mem_limit_mb);
        args.extend([
            "-i".to_string(),
            "--read-only".to_string(),
            "-v".to_string(),
            format!("{}:/src:ro", mount_path(&arg.mount_dir)),
            "-w".to_string(),
            "/src".to_string(),
            self.runtime.run_image.clone(),
            "timeout".to_string(),
            format!("{}s", timeout_secs),
            format!("./{}", arg.program_file_name),
        ]);
        args
    }
}

pub(crate) fn mount_path(dir: &Path) -> String {
    dir.display().to_string()
}

#[async_trait]
impl Runner for ContainerRunner {
    async fn run(&self, arg: RunArg) -> Result<RunOutput, RunError> {
        let name = ContainerRuntime::container_name("run");
        let args = self.run_args(&name, &arg);
        info!(container = %name, image = %self.runtime.run_image, "Running program in container");

        let mut cmd = Command::new(&self.runtime.binary);
        cmd.args(&args);

        let output = match execute(cmd, Some(arg.input), arg.run_timeout + STARTUP_GRACE).await {
            Ok(output) => output,
            Err(ExecError::Spawn(e)) => return Err(RunError::Spawn(e)),
            Err(ExecError::Io(e)) => return Err(RunError::Io(e)),
            Err(ExecError::Timeout) => {
                warn!(container = %name, "Container did not exit in time");
                self.runtime.remove(&name).await;
                return Err(RunError::Timeout(arg.run_timeout));
            }
        };

        match output.status.code() {
            Some(0) => {}
            Some(TIMEOUT_EXIT_CODE) => return Err(RunError::Timeout(arg.run_timeout)),
            code => {
                return Err(RunError::NonZeroExit {
                    code,
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
        }

        // The container runtime itself may log to stderr on success.
        if !output.stderr.is_empty() {
            debug!(
                container = %name,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Container wrote to stderr"
            );
        }

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
