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

use anyhow::{Context, Result};
use autograd::jobs::{
    GradeSubmissionHandler, RegistrationEmailSettings, SendRegistrationEmailHandler,
};
use autograd::mailer::LogMailer;
use autograd::outbox::{JobRegistry, OutboxDispatcher};
use autograd::storage::LocalObjectStore;
use tracing::{info, warn};
use url::Url;

use super::{build_grader, open_database};
use crate::config::AutogradConfig;

/// Builds the registry with every job the worker knows how to run.
pub(crate) fn build_registry(config: &AutogradConfig) -> Result<Arc<JobRegistry>> {
    let storage = Arc::new(LocalObjectStore::new(config.storage.root.clone()));
    let grader = build_grader(&config.grading, config.grading.sandbox);
    let settings = RegistrationEmailSettings {
        sender: config.email.sender.clone(),
        app_link: Url::parse(&config.email.app_link)
            .with_context(|| format!("Invalid email.app_link '{}'", config.email.app_link))?,
    };

    let registry = JobRegistry::builder()
        .register(Arc::new(GradeSubmissionHandler::new(storage, grader)))?
        .register(Arc::new(SendRegistrationEmailHandler::new(
            Arc::new(LogMailer),
            settings,
        )))?
        .build();
    Ok(Arc::new(registry))
}

pub async fn run_worker(config: &AutogradConfig) -> Result<()> {
    let database = open_database(config)?;
    database
        .run_migrations()
        .await
        .context("Failed to run migrations")?;

    let registry = build_registry(config)?;
    let dispatcher = Arc::new(OutboxDispatcher::new(
        database,
        registry,
        config.dispatcher.to_dispatcher_config(),
    ));

    let mut worker = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.run().await }
    });

    tokio::select! {
        result = &mut worker => {
            result.context("Dispatcher task panicked")?;
            warn!("Dispatcher stopped on its own");
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            info!("Received shutdown signal, finishing current tick");
        }
    }

    dispatcher.shutdown();
    worker.await.context("Dispatcher task panicked")?;
    Ok(())
}
