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

use std::path::PathBuf;
use std::time::Duration;

use autograd::{DispatcherConfig, ResourceLimits};
use serde::{Deserialize, Serialize};

use super::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutogradConfig {
    pub database: DatabaseConfig,
    pub dispatcher: DispatcherSection,
    pub grading: GradingConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    /// Ignored for SQLite, which always uses one connection
    pub pool_size: u32,
    /// Appended to PostgreSQL URLs
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://autograd.db".to_string(),
            pool_size: 10,
            name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSection {
    pub poll_interval_ms: u64,
    pub batch_size: i64,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            batch_size: 100,
        }
    }
}

impl DispatcherSection {
    pub fn to_dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::builder()
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .batch_size(self.batch_size)
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxKind {
    /// Host process with rlimits and, on Linux, a private network namespace
    Process,
    /// Throwaway podman container
    Container,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub sandbox: SandboxKind,
    pub memory_mb: u64,
    pub run_timeout_secs: u64,
    pub compile_timeout_secs: u64,
    /// Compiler binary for the process sandbox
    pub compiler: String,
    /// Container engine binary for the container sandbox
    pub container_runtime: String,
    pub image: String,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxKind::Process,
            memory_mb: 512,
            run_timeout_secs: 10,
            compile_timeout_secs: 30,
            compiler: "g++".to_string(),
            container_runtime: "podman".to_string(),
            image: "gcc:latest".to_string(),
        }
    }
}

impl GradingConfig {
    pub fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            memory_mb: self.memory_mb,
            run_timeout: Duration::from_secs(self.run_timeout_secs),
        }
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub sender: String,
    pub app_link: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: "noreply@localhost".to_string(),
            app_link: "http://localhost:3000".to_string(),
        }
    }
}

impl AutogradConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if !(1..=100).contains(&self.database.pool_size) {
            return Err(ConfigError::Invalid(format!(
                "database.pool_size {} must be between 1 and 100",
                self.database.pool_size
            )));
        }
        if self.dispatcher.batch_size < 1 {
            return Err(ConfigError::Invalid(format!(
                "dispatcher.batch_size {} must be positive",
                self.dispatcher.batch_size
            )));
        }
        if self.dispatcher.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatcher.poll_interval_ms must be positive".into(),
            ));
        }
        if self.grading.memory_mb == 0 || self.grading.run_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "grading.memory_mb and grading.run_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
