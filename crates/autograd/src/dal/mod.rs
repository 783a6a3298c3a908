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

//! Data access layer.
//!
//! Readers and writers borrow a [`DbTx`](crate::database::DbTx) and never open
//! transactions of their own, so several of them can take part in one
//! atomic unit of work:
//!
//! ```rust,ignore
//! database
//!     .transaction(move |tx| {
//!         SubmissionWriter::new(tx).create(&submission)?;
//!         enqueuer.enqueue(tx, request)?;
//!         Ok::<_, OutboxError>(())
//!     })
//!     .await?;
//! ```

pub mod assignment;
pub mod models;
pub mod outbox;
pub mod submission;
pub mod user;

pub use assignment::{AssignmentReader, AssignmentWriter, FileReader, FileWriter};
pub use outbox::{OutboxItemReader, OutboxItemWriter};
pub use submission::{GradingTarget, SubmissionReader, SubmissionWriter};
pub use user::{UserReader, UserWriter};
