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

//! Job type to handler dispatch table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::handler::JobHandler;
use crate::error::RegistryError;
use crate::models::outbox_item::JobType;

/// Immutable mapping from job type to handler.
///
/// Built once through [`JobRegistry::builder`] and then shared behind an
/// `Arc`. There is no way to add handlers afterwards, so a running
/// dispatcher always sees the same set.
///
/// ```rust,ignore
/// let registry = Arc::new(
///     JobRegistry::builder()
///         .register(Arc::new(GradeSubmissionHandler::new(storage, grader)))?
///         .register(Arc::new(SendRegistrationEmailHandler::new(mailer, settings)))?
///         .build(),
/// );
/// ```
#[derive(Clone, Default)]
pub struct JobRegistry {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn builder() -> JobRegistryBuilder {
        JobRegistryBuilder::default()
    }

    /// Whether a handler is registered for `job_type`.
    pub fn is_valid(&self, job_type: &JobType) -> bool {
        self.handlers.contains_key(job_type)
    }

    pub fn handler(&self, job_type: &JobType) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_type).cloned()
    }

    /// Registered job types, sorted.
    pub fn job_types(&self) -> Vec<JobType> {
        let mut types: Vec<JobType> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}

/// Collects handlers for a [`JobRegistry`].
#[derive(Default)]
pub struct JobRegistryBuilder {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl JobRegistryBuilder {
    /// Adds a handler under its own [`JobHandler::job_type`]. Each job type
    /// may be registered once.
    pub fn register(mut self, handler: Arc<dyn JobHandler>) -> Result<Self, RegistryError> {
        let job_type = handler.job_type();
        if job_type.as_str().is_empty() {
            return Err(RegistryError::EmptyJobType);
        }
        if self.handlers.contains_key(&job_type) {
            return Err(RegistryError::DuplicateJobType(job_type));
        }
        debug!(%job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
        Ok(self)
    }

    pub fn build(self) -> JobRegistry {
        JobRegistry {
            handlers: self.handlers,
        }
    }
}
