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

mod cli;
mod commands;
mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init_logging(&cli);

    let config = ConfigLoader::new()
        .load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Migrate => commands::migrate(&config).await?,
        Commands::Worker => commands::run_worker(&config).await?,
        Commands::Grade {
            ref source,
            ref input,
            ref expected,
            sandbox,
        } => {
            commands::grade_file(&config, source, input, expected, sandbox.map(Into::into)).await?
        }
        Commands::EnqueueGrading { submission_id } => {
            commands::enqueue_grading(&config, submission_id).await?
        }
        Commands::Status => commands::status(&config).await?,
    }

    Ok(())
}
