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

use anyhow::{Context, Result};
use tracing::info;

use super::open_database;
use crate::config::AutogradConfig;

pub async fn migrate(config: &AutogradConfig) -> Result<()> {
    let database = open_database(config)?;
    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;
    info!(backend = ?database.backend(), "Migrations applied");
    Ok(())
}
