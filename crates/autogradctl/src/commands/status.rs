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
use autograd::dal::OutboxItemReader;
use autograd::models::outbox_item::OutboxStatus;

use super::open_database;
use crate::config::AutogradConfig;

const STATUSES: [OutboxStatus; 5] = [
    OutboxStatus::Pending,
    OutboxStatus::Sent,
    OutboxStatus::Picked,
    OutboxStatus::Success,
    OutboxStatus::Failed,
];

pub async fn status(config: &AutogradConfig) -> Result<()> {
    let database = open_database(config)?;
    let counts = database
        .transaction(|tx| {
            let mut reader = OutboxItemReader::new(tx);
            STATUSES
                .iter()
                .map(|status| Ok((*status, reader.count_by_status(*status)?)))
                .collect::<Result<Vec<_>, autograd::DatabaseError>>()
        })
        .await
        .context("Failed to count outbox items")?;

    for (status, count) in counts {
        println!("{:<8} {}", status.as_str(), count);
    }
    Ok(())
}
