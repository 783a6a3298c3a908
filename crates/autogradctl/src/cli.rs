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

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::SandboxKind;

#[derive(Parser)]
#[command(
    name = "autogradctl",
    version,
    about = "Command-line interface for the autograd outbox worker and grader",
    long_about = "Runs database migrations, the outbox dispatcher worker, and one-off grading of C++ sources"
)]
pub struct Cli {
    /// Configuration file (defaults to autograd.toml, then the user and system config dirs)
    #[arg(short, long, global = true, env = "AUTOGRAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Run the outbox dispatcher until interrupted
    Worker,

    /// Grade a source file locally against reference input and output
    Grade {
        /// C++ source file
        source: PathBuf,

        /// Reference input, fed to the program on stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Expected output, one line per test case
        #[arg(short, long)]
        expected: PathBuf,

        /// Sandbox to run the program in (overrides the configuration)
        #[arg(long, value_enum)]
        sandbox: Option<SandboxArg>,
    },

    /// Enqueue a grading job for an existing submission
    EnqueueGrading {
        /// Submission id
        submission_id: Uuid,
    },

    /// Show outbox record counts per status
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SandboxArg {
    Process,
    Container,
}

impl From<SandboxArg> for SandboxKind {
    fn from(arg: SandboxArg) -> Self {
        match arg {
            SandboxArg::Process => SandboxKind::Process,
            SandboxArg::Container => SandboxKind::Container,
        }
    }
}
