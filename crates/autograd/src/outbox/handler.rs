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

use async_trait::async_trait;

use crate::database::Database;
use crate::error::JobError;
use crate::models::outbox_item::{JobType, OutboxItemId, Payload};

/// What a handler gets to know about the record it is processing.
///
/// Handlers open their own transactions through [`database`](Self::database);
/// the dispatcher holds none while a handler runs.
#[derive(Debug, Clone)]
pub struct JobContext {
    database: Database,
    item_id: OutboxItemId,
    job_type: JobType,
}

impl JobContext {
    pub fn new(database: Database, item_id: OutboxItemId, job_type: JobType) -> Self {
        Self {
            database,
            item_id,
            job_type,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Id of the outbox record being processed.
    pub fn item_id(&self) -> OutboxItemId {
        self.item_id
    }

    pub fn job_type(&self) -> &JobType {
        &self.job_type
    }
}

/// Business logic for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler processes.
    fn job_type(&self) -> JobType;

    /// Processes one record. An error marks the record `failed`; there is no
    /// automatic retry.
    async fn handle(&self, ctx: &JobContext, payload: &Payload) -> Result<(), JobError>;
}
