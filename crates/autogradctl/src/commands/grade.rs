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

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::build_grader;
use crate::config::{AutogradConfig, SandboxKind};

/// Grades `source` without touching the database and prints a per-case
/// report.
pub async fn grade_file(
    config: &AutogradConfig,
    source: &Path,
    input: &Path,
    expected: &Path,
    sandbox: Option<SandboxKind>,
) -> Result<()> {
    let source = source
        .canonicalize()
        .with_context(|| format!("Source file {} not found", source.display()))?;
    let input = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let expected = tokio::fs::read(expected)
        .await
        .with_context(|| format!("Failed to read {}", expected.display()))?;

    // Compilers write their output next to the source, so work on a copy.
    let workdir = tempfile::Builder::new()
        .prefix("autograd-")
        .tempdir()
        .context("Failed to create work directory")?;
    let local_source = workdir.path().join("main.cpp");
    tokio::fs::copy(&source, &local_source)
        .await
        .with_context(|| format!("Failed to copy {}", source.display()))?;

    let sandbox = sandbox.unwrap_or(config.grading.sandbox);
    info!(source = %source.display(), ?sandbox, "Grading");

    let grader = build_grader(&config.grading, sandbox);
    let result = grader
        .grade(&local_source, &input, &expected)
        .await
        .context("Grading failed")?;

    for (i, (output, correct)) in result.outputs().iter().zip(result.corrects()).enumerate() {
        println!(
            "case {:>3}  {}  {}",
            i + 1,
            if *correct { "ok  " } else { "FAIL" },
            output
        );
    }
    println!(
        "score: {} ({} of {} correct)",
        result.score()?,
        result.correct_count(),
        result.total()
    );
    Ok(())
}
