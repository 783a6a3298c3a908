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

mod enqueue;
mod grade;
mod migrate;
mod status;
mod worker;

pub use enqueue::enqueue_grading;
pub use grade::grade_file;
pub use migrate::migrate;
pub use status::status;
pub use worker::run_worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use autograd::grading::{
    Compiler, ContainerCompiler, ContainerRunner, ContainerRuntime, GppCompiler, Grader,
    ProcessRunner, Runner,
};
use autograd::Database;

use crate::config::{AutogradConfig, GradingConfig, SandboxKind};

pub(crate) fn open_database(config: &AutogradConfig) -> Result<Database> {
    Database::new(
        &config.database.url,
        &config.database.name,
        config.database.pool_size,
    )
    .with_context(|| format!("Failed to open database at {}", config.database.url))
}

pub(crate) fn build_grader(grading: &GradingConfig, sandbox: SandboxKind) -> Grader {
    let (compiler, runner): (Arc<dyn Compiler>, Arc<dyn Runner>) = match sandbox {
        SandboxKind::Process => (
            Arc::new(
                GppCompiler::new()
                    .with_program(grading.compiler.clone())
                    .with_timeout(grading.compile_timeout()),
            ),
            Arc::new(ProcessRunner::new()),
        ),
        SandboxKind::Container => {
            let runtime = ContainerRuntime {
                binary: grading.container_runtime.clone(),
                run_image: grading.image.clone(),
                compile_image: grading.image.clone(),
                ..ContainerRuntime::default()
            };
            (
                Arc::new(
                    ContainerCompiler::new(runtime.clone()).with_timeout(grading.compile_timeout()),
                ),
                Arc::new(ContainerRunner::new(runtime)),
            )
        }
    };

    Grader::new(compiler, runner).with_limits(grading.limits())
}
