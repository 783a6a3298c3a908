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

//! Error types for the outbox core and its collaborators.
//!
//! Grading, storage and mailer errors live next to the code that raises them
//! ([`GradingError`], [`StorageError`], [`MailerError`]); this module holds the
//! database, outbox and dispatch errors that tie them together.

use thiserror::Error;

use crate::grading::GradingError;
use crate::mailer::MailerError;
use crate::models::outbox_item::{JobType, OutboxItemId, OutboxStatus};
use crate::storage::StorageError;

/// Errors raised by the database layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The connection string does not name a known backend.
    #[error(
        "Unable to detect database backend from URL '{0}'. \
         Expected postgres://, postgresql://, sqlite://, or a file path."
    )]
    UnsupportedUrl(String),

    /// The URL names a backend this build was compiled without.
    #[error("The {0} backend is not enabled in this build")]
    BackendDisabled(&'static str),

    #[error("Invalid database URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Acquiring or using a pooled connection failed.
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    /// A stored row could not be mapped back onto its domain type.
    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

/// Errors raised while writing to or reading from the outbox.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// Enqueue was attempted for a job type with no registered handler.
    #[error("Invalid job type: '{0}' has no registered handler")]
    InvalidJobType(JobType),

    /// The payload could not be serialized.
    #[error("Failed to encode payload: {0}")]
    PayloadEncoding(#[source] serde_json::Error),

    /// A status write would move a record backwards or skip a state.
    #[error("Invalid status transition for outbox item: {from} -> {to}")]
    InvalidStatusTransition { from: OutboxStatus, to: OutboxStatus },

    /// Another writer changed the record between our read and our write.
    #[error("Outbox item {0} was modified concurrently")]
    ConcurrentModification(OutboxItemId),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<diesel::result::Error> for OutboxError {
    fn from(err: diesel::result::Error) -> Self {
        OutboxError::Database(DatabaseError::Query(err))
    }
}

/// Errors raised while building a [`JobRegistry`](crate::outbox::JobRegistry).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A handler for job type '{0}' is already registered")]
    DuplicateJobType(JobType),

    #[error("Job type must not be empty")]
    EmptyJobType,
}

/// Errors returned by a [`JobHandler`](crate::outbox::JobHandler).
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to decode payload: {0}")]
    PayloadDecoding(#[source] serde_json::Error),

    /// A row the job refers to does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The job was well-formed but the current state forbids running it.
    #[error("Job rejected: {0}")]
    Rejected(String),

    /// Preparing the job's scratch directory failed.
    #[error("Workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    #[error(transparent)]
    Grading(#[from] GradingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Mailer(#[from] MailerError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<diesel::result::Error> for JobError {
    fn from(err: diesel::result::Error) -> Self {
        JobError::Database(DatabaseError::Query(err))
    }
}

/// Errors that stop a dispatcher tick.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler failed; the record has been marked `failed`.
    #[error("Failed to dispatch outbox item {item_id} ({job_type}): {source}")]
    FailedDispatch {
        item_id: OutboxItemId,
        job_type: JobType,
        #[source]
        source: JobError,
    },

    /// A handler failed and recording that failure failed as well.
    #[error(
        "Outbox item {item_id} failed ({handler_error}) and could not be marked failed: {source}"
    )]
    MarkFailed {
        item_id: OutboxItemId,
        handler_error: JobError,
        #[source]
        source: OutboxError,
    },

    /// A claimed record names a job type the registry does not know.
    #[error("No handler registered for job type '{job_type}' (outbox item {item_id})")]
    UnknownJobType {
        item_id: OutboxItemId,
        job_type: JobType,
    },

    #[error(transparent)]
    Outbox(#[from] OutboxError),
}

impl From<DatabaseError> for DispatchError {
    fn from(err: DatabaseError) -> Self {
        DispatchError::Outbox(OutboxError::Database(err))
    }
}

impl From<diesel::result::Error> for DispatchError {
    fn from(err: diesel::result::Error) -> Self {
        DispatchError::Outbox(err.into())
    }
}
