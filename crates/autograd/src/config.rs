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

//! Configuration for the dispatcher loop and the grading sandbox.

use std::time::Duration;

/// Configuration for [`OutboxDispatcher`](crate::outbox::OutboxDispatcher).
///
/// ```rust,ignore
/// let config = DispatcherConfig::builder()
///     .poll_interval(Duration::from_secs(1))
///     .batch_size(20)
///     .build();
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DispatcherConfig {
    poll_interval: Duration,
    batch_size: i64,
}

impl DispatcherConfig {
    /// Creates a builder starting from the default configuration.
    pub fn builder() -> DispatcherConfigBuilder {
        DispatcherConfigBuilder::default()
    }

    /// Sleep between two dispatcher ticks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Maximum number of pending records fetched per tick.
    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfigBuilder::default().build()
    }
}

/// Builder for [`DispatcherConfig`].
#[derive(Debug, Clone)]
pub struct DispatcherConfigBuilder {
    config: DispatcherConfig,
}

impl Default for DispatcherConfigBuilder {
    fn default() -> Self {
        Self {
            config: DispatcherConfig {
                poll_interval: Duration::from_secs(5),
                batch_size: 100,
            },
        }
    }
}

impl DispatcherConfigBuilder {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Sets the batch size; values below 1 are raised to 1.
    pub fn batch_size(mut self, size: i64) -> Self {
        self.config.batch_size = size.max(1);
        self
    }

    pub fn build(self) -> DispatcherConfig {
        self.config
    }
}

/// Resource ceilings applied to every sandboxed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Memory ceiling for the program, in mebibytes
    pub memory_mb: u64,
    /// Wall-clock limit for one run of the program
    pub run_timeout: Duration,
}

impl ResourceLimits {
    pub fn memory_bytes(&self) -> u64 {
        self.memory_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_mb: 512,
            run_timeout: Duration::from_secs(10),
        }
    }
}
