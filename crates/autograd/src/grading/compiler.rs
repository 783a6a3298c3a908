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

//! Compilation of submitted sources.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::container::{mount_path, ContainerRuntime};
use super::process::{execute, ExecError};

const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(30);
const COMPILE_MEMORY_MB: u64 = 1024;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to start compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while compiling: {0}")]
    Io(#[source] std::io::Error),

    #[error("Compilation failed with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Compilation exceeded the {0:?} time limit")]
    Timeout(Duration),

    #[error("Invalid source path: {0}")]
    InvalidSource(PathBuf),
}

/// Turns a source file into a runnable program.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compiles `source` and returns the path of the produced program, which
    /// lives in the same directory as the source.
    async fn compile(&self, source: &Path) -> Result<PathBuf, CompileError>;
}

/// Splits `source` into its directory, file name and the program file name
/// the compilers write next to it.
fn artifact_paths(source: &Path) -> Result<(PathBuf, String, String), CompileError> {
    let invalid = || CompileError::InvalidSource(source.to_path_buf());
    let dir = source.parent().ok_or_else(invalid)?.to_path_buf();
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(invalid)?
        .to_string();
    let program = source
        .with_extension("bin")
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(invalid)?
        .to_string();
    Ok((dir, file_name, program))
}

fn compile_result(
    program: &str,
    result: Result<std::process::Output, ExecError>,
    timeout: Duration,
) -> Result<(), CompileError> {
    let output = match result {
        Ok(output) => output,
        Err(ExecError::Spawn(source)) => {
            return Err(CompileError::Spawn {
                program: program.to_string(),
                source,
            })
        }
        Err(ExecError::Io(e)) => return Err(CompileError::Io(e)),
        Err(ExecError::Timeout) => return Err(CompileError::Timeout(timeout)),
    };

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(CompileError::Failed {
            code: output.status.code(),
            stderr,
        });
    }
    if !stderr.is_empty() {
        debug!(%stderr, "Compiler reported warnings");
    }
    Ok(())
}

/// Compiles C++ sources with the host's `g++`.
#[derive(Debug, Clone)]
pub struct GppCompiler {
    program: String,
    flags: Vec<String>,
    timeout: Duration,
}

impl GppCompiler {
    pub fn new() -> Self {
        Self {
            program: "g++".to_string(),
            flags: vec!["-O2".to_string(), "-std=c++17".to_string()],
            timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }

    /// Uses another compiler binary with the same command line, e.g. `clang++`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for GppCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Compiler for GppCompiler {
    async fn compile(&self, source: &Path) -> Result<PathBuf, CompileError> {
        let (dir, file_name, program) = artifact_paths(source)?;
        info!(source = %source.display(), compiler = %self.program, "Compiling submission");

        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&dir)
            .args(&self.flags)
            .arg("-o")
            .arg(&program)
            .arg(&file_name);

        compile_result(&self.program, execute(cmd, None, self.timeout).await, self.timeout)?;
        Ok(dir.join(program))
    }
}

/// Compiles C++ sources with `g++` inside a throwaway, network-less container.
#[derive(Debug, Clone)]
pub struct ContainerCompiler {
    runtime: ContainerRuntime,
    timeout: Duration,
}

impl ContainerCompiler {
    pub fn new(runtime: ContainerRuntime) -> Self {
        Self {
            runtime,
            timeout: DEFAULT_COMPILE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn compile_args(&self, name: &str, dir: &Path, file_name: &str, program: &str) -> Vec<String> {
        let mut args = self.runtime.isolation_args(name, COMPILE_MEMORY_MB);
        args.extend([
            "-v".to_string(),
            format!("{}:/src", mount_path(dir)),
            "-w".to_string(),
            "/src".to_string(),
            self.runtime.compile_image.clone(),
            "g++".to_string(),
            "-O2".to_string(),
            "-std=c++17".to_string(),
            "-o".to_string(),
            program.to_string(),
            file_name.to_string(),
        ]);
        args
    }
}

impl Default for ContainerCompiler {
    fn default() -> Self {
        Self::new(ContainerRuntime::default())
    }
}

#[async_trait]
impl Compiler for ContainerCompiler {
    async fn compile(&self, source: &Path) -> Result<PathBuf, CompileError> {
        let (dir, file_name, program) = artifact_paths(source)?;
        let name = ContainerRuntime::container_name("compile");
        info!(container = %name, source = %source.display(), "Compiling submission in container");

        let mut cmd = Command::new(&self.runtime.binary);
        cmd.args(self.compile_args(&name, &dir, &file_name, &program));

        let result = execute(cmd, None, self.timeout).await;
        if matches!(result, Err(ExecError::Timeout)) {
            warn!(container = %name, "Compile container did not exit in time");
            self.runtime.remove(&name).await;
        }
        compile_result(&self.runtime.binary, result, self.timeout)?;
        Ok(dir.join(program))
    }
}
