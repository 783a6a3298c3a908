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

//! Transactional outbox.
//!
//! - [`OutboxEnqueuer`] records a job inside the caller's transaction.
//! - [`OutboxDispatcher`] polls pending records and runs their handlers.
//! - [`JobRegistry`] maps job types to [`JobHandler`]s; it is built once at
//!   startup and shared read-only by the enqueuer and the dispatcher.

pub mod dispatcher;
pub mod enqueuer;
pub mod handler;
pub mod registry;

pub use dispatcher::{OutboxDispatcher, TickReport};
pub use enqueuer::{EnqueueRequest, OutboxEnqueuer};
pub use handler::{JobContext, JobHandler};
pub use registry::{JobRegistry, JobRegistryBuilder};
