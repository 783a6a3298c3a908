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

//! Polling dispatcher for pending outbox records.
//!
//! One tick:
//!
//! 1. In a poll transaction, fetch up to `batch_size` pending records,
//!    oldest id first.
//! 2. For each record in order, claim it (`pending -> sent`). The claim is
//!    version-guarded; a record claimed by another dispatcher in the meantime
//!    is skipped.
//! 3. Mark it `picked`, run its handler, then mark it `success` or `failed`.
//!    A failed handler ends the tick; records not yet claimed stay `pending`
//!    for the next one.
//!
//! Every status write happens in its own short transaction and only moves
//! forward, so a terminal status is never overwritten.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use super::handler::JobContext;
use super::registry::JobRegistry;
use crate::config::DispatcherConfig;
use crate::dal::{OutboxItemReader, OutboxItemWriter};
use crate::database::Database;
use crate::error::{DispatchError, OutboxError};
use crate::models::outbox_item::{OutboxItem, OutboxStatus};

/// Counts for one dispatcher tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Pending records fetched by the poll
    pub fetched: usize,
    /// Records whose handler completed successfully
    pub succeeded: usize,
    /// Records another dispatcher claimed first
    pub skipped: usize,
}

/// Delivers pending outbox records to their handlers.
pub struct OutboxDispatcher {
    database: Database,
    registry: Arc<JobRegistry>,
    config: DispatcherConfig,
    /// Held for the duration of a tick so ticks never overlap.
    tick_lock: Mutex<()>,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl OutboxDispatcher {
    pub fn new(database: Database, registry: Arc<JobRegistry>, config: DispatcherConfig) -> Self {
        Self {
            database,
            registry,
            config,
            tick_lock: Mutex::new(()),
            shutdown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Runs ticks every `poll_interval` until [`shutdown`](Self::shutdown).
    ///
    /// A failed tick is logged and the loop carries on with the next one.
    pub async fn run(&self) {
        info!(
            poll_interval = ?self.config.poll_interval(),
            batch_size = self.config.batch_size(),
            job_types = ?self.registry.job_types(),
            "Outbox dispatcher started"
        );

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.tick().await {
                Ok(report) if report.fetched > 0 => info!(
                    fetched = report.fetched,
                    succeeded = report.succeeded,
                    skipped = report.skipped,
                    "Dispatcher tick complete"
                ),
                Ok(_) => debug!("No pending outbox items"),
                Err(e) => error!(error = %e, "Dispatcher tick failed"),
            }

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
                _ = self.notify.notified() => {
                    debug!("Dispatcher woken early");
                }
            }
        }

        info!("Outbox dispatcher stopped");
    }

    /// Stops [`run`](Self::run) once the current tick has finished.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Processes one batch of pending records.
    pub async fn tick(&self) -> Result<TickReport, DispatchError> {
        let _guard = self.tick_lock.lock().await;

        let limit = self.config.batch_size();
        let items = self
            .database
            .transaction(move |tx| OutboxItemReader::new(tx).find_all_pending(limit))
            .await?;

        let mut report = TickReport {
            fetched: items.len(),
            ..Default::default()
        };
        if items.is_empty() {
            return Ok(report);
        }
        debug!(count = items.len(), "Fetched pending outbox items");

        for item in items {
            let item_id = item.id;
            let Some(claimed) = self.transition(item, OutboxStatus::Sent).await? else {
                debug!(%item_id, "Outbox item claimed elsewhere, skipping");
                report.skipped += 1;
                continue;
            };
            self.fire(claimed).await?;
            report.succeeded += 1;
        }

        Ok(report)
    }

    /// Runs the handler for a claimed record and records the outcome.
    async fn fire(&self, item: OutboxItem) -> Result<(), DispatchError> {
        let handler =
            self.registry
                .handler(&item.job_type)
                .ok_or_else(|| DispatchError::UnknownJobType {
                    item_id: item.id,
                    job_type: item.job_type.clone(),
                })?;

        let item = self.advance(item, OutboxStatus::Picked).await?;
        let ctx = JobContext::new(self.database.clone(), item.id, item.job_type.clone());
        debug!(item_id = %item.id, job_type = %item.job_type, "Running job handler");

        match handler.handle(&ctx, &item.payload).await {
            Ok(()) => {
                let item = self.advance(item, OutboxStatus::Success).await?;
                info!(item_id = %item.id, job_type = %item.job_type, "Outbox item succeeded");
                Ok(())
            }
            Err(handler_error) => {
                let item_id = item.id;
                let job_type = item.job_type.clone();
                warn!(%item_id, %job_type, error = %handler_error, "Job handler failed");

                match self.advance(item, OutboxStatus::Failed).await {
                    Ok(_) => Err(DispatchError::FailedDispatch {
                        item_id,
                        job_type,
                        source: handler_error,
                    }),
                    Err(source) => Err(DispatchError::MarkFailed {
                        item_id,
                        handler_error,
                        source,
                    }),
                }
            }
        }
    }

    /// Like [`transition`](Self::transition), for records this dispatcher
    /// already owns: losing the race is an error rather than a skip.
    async fn advance(&self, item: OutboxItem, next: OutboxStatus) -> Result<OutboxItem, OutboxError> {
        let item_id = item.id;
        self.transition(item, next)
            .await?
            .ok_or(OutboxError::ConcurrentModification(item_id))
    }

    /// Moves `item` to `next` in its own transaction. Returns `None` if the
    /// stored version no longer matches `item`.
    async fn transition(
        &self,
        mut item: OutboxItem,
        next: OutboxStatus,
    ) -> Result<Option<OutboxItem>, OutboxError> {
        let expected_version = item.version;
        item.move_to(next)?;

        self.database
            .transaction(move |tx| {
                let updated = OutboxItemWriter::new(tx).update_status(&item, expected_version)?;
                Ok::<_, OutboxError>(updated.then_some(item))
            })
            .await
    }
}
