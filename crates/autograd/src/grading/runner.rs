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

//! The program execution contract shared by every sandbox.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// One sandboxed execution of a compiled program.
#[derive(Debug, Clone)]
pub struct RunArg {
    /// Bytes written to the program's stdin
    pub input: Vec<u8>,
    /// Directory holding the program; the only part of the host it may see
    pub mount_dir: PathBuf,
    /// File name of the program inside `mount_dir`
    pub program_file_name: String,
    /// Memory ceiling, in mebibytes
    pub mem_limit_mb: u64,
    /// Wall-clock limit; the program is killed when it expires
    pub run_timeout: Duration,
}

impl RunArg {
    /// The memory ceiling in bytes, clamped at `u64::MAX`.
    pub fn mem_limit_bytes(&self) -> u64 {
        self.mem_limit_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// Everything the program wrote to stdout
    pub stdout: String,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to start program: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error while running program: {0}")]
    Io(#[source] std::io::Error),

    #[error("Program exceeded the {0:?} time limit")]
    Timeout(Duration),

    #[error("Program exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Program wrote to stderr: {0}")]
    Stderr(String),
}

/// Executes a compiled program under isolation.
///
/// Implementations must not keep state between runs, must cut the program
/// off from the network, and must kill it once `run_timeout` expires.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, arg: RunArg) -> Result<RunOutput, RunError>;
}
