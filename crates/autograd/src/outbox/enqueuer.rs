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

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::registry::JobRegistry;
use crate::dal::{OutboxItemReader, OutboxItemWriter};
use crate::database::DbTx;
use crate::error::OutboxError;
use crate::models::outbox_item::{IdempotentKey, JobType, OutboxItem, Payload};

/// A job to record in the outbox.
#[derive(Debug, Clone)]
pub struct EnqueueRequest<P> {
    pub job_type: JobType,
    /// Leave empty to skip deduplication; the record's id is used instead.
    pub idempotent_key: IdempotentKey,
    pub payload: P,
}

impl<P> EnqueueRequest<P> {
    pub fn new(job_type: impl Into<JobType>, payload: P) -> Self {
        Self {
            job_type: job_type.into(),
            idempotent_key: IdempotentKey::default(),
            payload,
        }
    }

    pub fn with_key(mut self, key: impl Into<IdempotentKey>) -> Self {
        self.idempotent_key = key.into();
        self
    }
}

/// Writes jobs to the outbox as part of a caller's transaction.
#[derive(Debug, Clone)]
pub struct OutboxEnqueuer {
    registry: Arc<JobRegistry>,
}

impl OutboxEnqueuer {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }

    /// Records `request` in `tx`.
    ///
    /// If an in-flight record already holds the request's key, that record is
    /// returned and nothing is written. Otherwise a new `pending` record is
    /// inserted. Either way the write commits or rolls back with the rest of
    /// `tx`.
    pub fn enqueue<P: Serialize>(
        &self,
        tx: &mut DbTx<'_>,
        request: EnqueueRequest<P>,
    ) -> Result<OutboxItem, OutboxError> {
        let EnqueueRequest {
            job_type,
            idempotent_key,
            payload,
        } = request;

        if !self.registry.is_valid(&job_type) {
            return Err(OutboxError::InvalidJobType(job_type));
        }

        let payload = Payload::marshal(&payload)?;

        if !idempotent_key.is_empty() {
            if let Some(existing) = OutboxItemReader::new(tx).find_in_flight_by_key(&idempotent_key)? {
                debug!(
                    item_id = %existing.id,
                    key = %idempotent_key,
                    status = %existing.status,
                    "Job already in flight, reusing outbox item"
                );
                return Ok(existing);
            }
        }

        let item = OutboxItem::new(job_type, idempotent_key, payload);
        OutboxItemWriter::new(tx).create(&item)?;

        info!(
            item_id = %item.id,
            job_type = %item.job_type,
            key = %item.idempotent_key,
            "Enqueued outbox item"
        );
        Ok(item)
    }
}
