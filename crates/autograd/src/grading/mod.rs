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

//! The grading pipeline.
//!
//! Grading a submission is: compile the source, run the program once with
//! the assignment's whole input on stdin, split stdout and the expected
//! output into lines, and compare them pairwise. Line `i` of the input,
//! the output and the expected output is test case `i`, so all three must
//! have the same number of lines.
//!
//! Compilation and execution sit behind the [`Compiler`] and [`Runner`]
//! traits, so the pipeline never knows whether it runs on the host or in a
//! container.

pub mod compiler;
pub mod container;
pub mod process;
pub mod runner;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

pub use compiler::{CompileError, Compiler, ContainerCompiler, GppCompiler};
pub use container::{ContainerRunner, ContainerRuntime};
pub use process::ProcessRunner;
pub use runner::{RunArg, RunError, RunOutput, Runner};

use crate::config::ResourceLimits;

#[derive(Debug, Error)]
pub enum GradingError {
    /// The submission does not compile.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// The program crashed, timed out or wrote to stderr.
    #[error("Run error: {0}")]
    Run(#[from] RunError),

    /// The reference input or the program's output has a different number
    /// of lines than the expected output.
    #[error("Output count mismatch: {side} has {lines} lines, expected output has {expecteds}")]
    OutputCountMismatch {
        side: CaseSide,
        lines: usize,
        expecteds: usize,
    },

    /// The assignment's expected output is empty.
    #[error("Assignment has no test cases")]
    NoTestCases,
}

/// The stream whose line count disagreed with the expected output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSide {
    /// The assignment's reference input, checked before compiling
    Input,
    /// The program's stdout
    Output,
}

impl fmt::Display for CaseSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseSide::Input => write!(f, "reference input"),
            CaseSide::Output => write!(f, "program output"),
        }
    }
}

/// Outcome of one grading run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    outputs: Vec<String>,
    corrects: Vec<bool>,
}

impl GradeResult {
    pub fn new(outputs: Vec<String>, corrects: Vec<bool>) -> Self {
        Self { outputs, corrects }
    }

    /// The program's output, one entry per test case.
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Whether each test case passed, parallel to [`outputs`](Self::outputs).
    pub fn corrects(&self) -> &[bool] {
        &self.corrects
    }

    pub fn total(&self) -> usize {
        self.corrects.len()
    }

    pub fn correct_count(&self) -> usize {
        self.corrects.iter().filter(|c| **c).count()
    }

    /// Percentage of passed test cases, rounded down.
    pub fn score(&self) -> Result<i32, GradingError> {
        let total = self.total();
        if total == 0 {
            return Err(GradingError::NoTestCases);
        }
        Ok((self.correct_count() * 100 / total) as i32)
    }
}

/// Inputs to one grading run.
pub struct GradeRequest<'a> {
    pub compiler: &'a dyn Compiler,
    pub runner: &'a dyn Runner,
    /// Source file, inside a directory the sandbox may mount
    pub source: &'a Path,
    /// The assignment's reference input
    pub input: &'a [u8],
    /// The assignment's reference output
    pub expected: &'a [u8],
    pub limits: ResourceLimits,
}

/// Splits on `\n`. A trailing newline does not start another line.
fn split_lines(text: &str) -> Vec<&str> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').collect()
}

/// Compiles, runs and scores one submission.
pub async fn grade(request: GradeRequest<'_>) -> Result<GradeResult, GradingError> {
    let expected_text = String::from_utf8_lossy(request.expected);
    let expecteds = split_lines(&expected_text);
    if expecteds.is_empty() {
        return Err(GradingError::NoTestCases);
    }

    let input_text = String::from_utf8_lossy(request.input);
    let inputs = split_lines(&input_text).len();
    if inputs != expecteds.len() {
        return Err(GradingError::OutputCountMismatch {
            side: CaseSide::Input,
            lines: inputs,
            expecteds: expecteds.len(),
        });
    }

    let program = request.compiler.compile(request.source).await?;
    let mount_dir = program.parent().map(Path::to_path_buf);
    let program_file_name = program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let (Some(mount_dir), Some(program_file_name)) = (mount_dir, program_file_name) else {
        return Err(CompileError::InvalidSource(program).into());
    };

    let output = request
        .runner
        .run(RunArg {
            input: request.input.to_vec(),
            mount_dir,
            program_file_name,
            mem_limit_mb: request.limits.memory_mb,
            run_timeout: request.limits.run_timeout,
        })
        .await?;

    let outputs = split_lines(&output.stdout);
    if outputs.len() != expecteds.len() {
        return Err(GradingError::OutputCountMismatch {
            side: CaseSide::Output,
            lines: outputs.len(),
            expecteds: expecteds.len(),
        });
    }

    let corrects: Vec<bool> = outputs
        .iter()
        .zip(&expecteds)
        .map(|(output, expected)| output.trim() == expected.trim())
        .collect();
    debug!(?corrects, "Compared program output");

    let result = GradeResult::new(outputs.into_iter().map(str::to_string).collect(), corrects);
    info!(
        passed = result.correct_count(),
        total = result.total(),
        "Grading finished"
    );
    Ok(result)
}

/// A compiler, a runner and the limits to apply, bundled for the grading job.
#[derive(Clone)]
pub struct Grader {
    compiler: Arc<dyn Compiler>,
    runner: Arc<dyn Runner>,
    limits: ResourceLimits,
}

impl Grader {
    pub fn new(compiler: Arc<dyn Compiler>, runner: Arc<dyn Runner>) -> Self {
        Self {
            compiler,
            runner,
            limits: ResourceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    pub async fn grade(
        &self,
        source: &Path,
        input: &[u8],
        expected: &[u8],
    ) -> Result<GradeResult, GradingError> {
        grade(GradeRequest {
            compiler: self.compiler.as_ref(),
            runner: self.runner.as_ref(),
            source,
            input,
            expected,
            limits: self.limits,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedCompiler(Option<PathBuf>);

    #[async_trait]
    impl Compiler for FixedCompiler {
        async fn compile(&self, _source: &Path) -> Result<PathBuf, CompileError> {
            self.0.clone().ok_or(CompileError::Failed {
                code: Some(1),
                stderr: "main.cpp:1:1: error: expected declaration".to_string(),
            })
        }
    }

    /// Replies with a fixed stdout and counts how often it ran.
    struct FixedRunner {
        stdout: String,
        runs: AtomicUsize,
    }

    impl FixedRunner {
        fn new(stdout: &str) -> Self {
            Self {
                stdout: stdout.to_string(),
                runs: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Runner for FixedRunner {
        async fn run(&self, arg: RunArg) -> Result<RunOutput, RunError> {
            assert_eq!(arg.program_file_name, "main.bin");
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(RunOutput {
                stdout: self.stdout.clone(),
            })
        }
    }

    async fn grade_with(
        runner: &FixedRunner,
        input: &str,
        expected: &str,
    ) -> Result<GradeResult, GradingError> {
        let compiler = FixedCompiler(Some(PathBuf::from("/work/main.bin")));
        grade(GradeRequest {
            compiler: &compiler,
            runner,
            source: Path::new("/work/main.cpp"),
            input: input.as_bytes(),
            expected: expected.as_bytes(),
            limits: ResourceLimits::default(),
        })
        .await
    }

    #[test]
    fn test_score_truncates() {
        let result = GradeResult::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![true, true, false],
        );
        assert_eq!(result.score().unwrap(), 66);
        assert_eq!(GradeResult::new(vec!["a".into()], vec![true]).score().unwrap(), 100);
        assert_eq!(GradeResult::new(vec!["a".into()], vec![false]).score().unwrap(), 0);
    }

    #[test]
    fn test_score_without_cases_is_an_error() {
        let result = GradeResult::new(vec![], vec![]);
        assert!(matches!(result.score(), Err(GradingError::NoTestCases)));
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\nb"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
        assert!(split_lines("\n").is_empty());
    }

    #[tokio::test]
    async fn test_lines_are_compared_after_trimming() {
        let runner = FixedRunner::new("2 \n4\n5\n");
        let result = grade_with(&runner, "1 1\n2 2\n3 3\n", "2\n 4\n6\n")
            .await
            .unwrap();

        assert_eq!(result.corrects(), &[true, true, false]);
        assert_eq!(result.outputs(), &["2 ", "4", "5"]);
        assert_eq!(result.score().unwrap(), 66);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_line_count_mismatch_aborts() {
        let runner = FixedRunner::new("2\n4\n6\n8\n10\n");
        let err = grade_with(&runner, "1\n2\n3\n4\n", "2\n4\n6\n8\n")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GradingError::OutputCountMismatch {
                side: CaseSide::Output,
                lines: 5,
                expecteds: 4
            }
        ));
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_input_and_expected_line_counts_must_agree() {
        // Program output matches the expected output, but the fixture pair is inconsistent.
        let runner = FixedRunner::new("1\n2\n3\n4\n");
        let err = grade_with(&runner, "1\n2\n3\n4\n5\n", "1\n2\n3\n4\n")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GradingError::OutputCountMismatch {
                side: CaseSide::Input,
                lines: 5,
                expecteds: 4
            }
        ));
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compile_failure_skips_the_run() {
        let compiler = FixedCompiler(None);
        let runner = FixedRunner::new("2\n");

        let err = grade(GradeRequest {
            compiler: &compiler,
            runner: &runner,
            source: Path::new("/work/main.cpp"),
            input: b"1 1\n",
            expected: b"2\n",
            limits: ResourceLimits::default(),
        })
        .await
        .unwrap_err();

        assert!(matches!(err, GradingError::Compile(_)));
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_expected_output_is_rejected_before_compiling() {
        let runner = FixedRunner::new("");
        let err = grade_with(&runner, "1 1\n", "").await.unwrap_err();

        assert!(matches!(err, GradingError::NoTestCases));
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }
}
