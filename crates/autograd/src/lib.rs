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

//! # Autograd
//!
//! Autograd grades student programs in the background. Work is scheduled
//! through a transactional outbox: a business transaction writes its domain
//! rows and an [`OutboxItem`](models::outbox_item::OutboxItem) atomically, and
//! the [`OutboxDispatcher`](outbox::OutboxDispatcher) later delivers each
//! pending record to the [`JobHandler`](outbox::JobHandler) registered for its
//! job type.
//!
//! The grading handler compiles the submitted source, runs it inside a
//! sandbox ([`ProcessRunner`](grading::ProcessRunner) or
//! [`ContainerRunner`](grading::ContainerRunner)), compares the output with the
//! assignment's reference data and writes the score back onto the submission.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use autograd::prelude::*;
//!
//! let database = Database::new("sqlite://autograd.db", "", 1)?;
//! database.run_migrations().await?;
//!
//! let registry = Arc::new(
//!     JobRegistry::builder()
//!         .register(Arc::new(GradeSubmissionHandler::new(storage, grader)))?
//!         .build(),
//! );
//!
//! let dispatcher = OutboxDispatcher::new(database.clone(), registry, DispatcherConfig::default());
//! dispatcher.run().await;
//! ```

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("autograd requires at least one of the `postgres` or `sqlite` features");

pub mod config;
pub mod dal;
pub mod database;
pub mod error;
pub mod grading;
pub mod jobs;
pub mod logging;
pub mod mailer;
pub mod models;
pub mod outbox;
pub mod storage;

pub use config::{DispatcherConfig, ResourceLimits};
pub use database::{Database, DbTx};
pub use error::{DatabaseError, DispatchError, JobError, OutboxError, RegistryError};
pub use logging::init_logging;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::config::{DispatcherConfig, ResourceLimits};
    pub use crate::database::{Database, DbTx};
    pub use crate::error::{DatabaseError, DispatchError, JobError, OutboxError};
    pub use crate::grading::{
        grade, CaseSide, Compiler, ContainerCompiler, ContainerRunner, GppCompiler,
        GradeRequest, GradeResult, Grader, GradingError, ProcessRunner, Runner,
    };
    pub use crate::jobs::{submit_for_grading, GradeSubmissionHandler, SendRegistrationEmailHandler};
    pub use crate::mailer::{Email, LogMailer, Mailer};
    pub use crate::models::outbox_item::{
        IdempotentKey, JobType, OutboxItem, OutboxItemId, OutboxStatus, Payload,
    };
    pub use crate::outbox::{
        EnqueueRequest, JobContext, JobHandler, JobRegistry, OutboxDispatcher, OutboxEnqueuer,
    };
    pub use crate::storage::{LocalObjectStore, ObjectStorer};
}
