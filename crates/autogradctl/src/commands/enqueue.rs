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

use anyhow::{bail, Context, Result};
use autograd::dal::SubmissionReader;
use autograd::jobs;
use autograd::outbox::OutboxEnqueuer;
use uuid::Uuid;

use super::open_database;
use super::worker::build_registry;
use crate::config::AutogradConfig;

pub async fn enqueue_grading(config: &AutogradConfig, submission_id: Uuid) -> Result<()> {
    let database = open_database(config)?;
    let enqueuer = OutboxEnqueuer::new(build_registry(config)?);

    let exists = database
        .transaction(move |tx| SubmissionReader::new(tx).find_by_id(submission_id))
        .await
        .context("Failed to look up submission")?
        .is_some();
    if !exists {
        bail!("Submission {} does not exist", submission_id);
    }

    let item = database
        .transaction(move |tx| jobs::enqueue_grading(&enqueuer, tx, submission_id))
        .await
        .context("Failed to enqueue grading job")?;

    println!("{} {}", item.id, item.status);
    Ok(())
}
