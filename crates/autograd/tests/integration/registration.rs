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

//! Registration emails sent through the outbox.

use std::sync::Arc;

use autograd::dal::UserWriter;
use autograd::jobs::{enqueue_registration_email, RegistrationEmailSettings, SendRegistrationEmailHandler};
use autograd::outbox::{JobRegistry, OutboxDispatcher, OutboxEnqueuer};
use autograd::{DispatchError, DispatcherConfig, JobError};
use url::Url;

use crate::fixtures::{new_user, test_db, RecordingMailer};

fn settings() -> RegistrationEmailSettings {
    RegistrationEmailSettings {
        sender: "noreply@autograd.test".to_string(),
        app_link: Url::parse("https://autograd.test").unwrap(),
    }
}

#[tokio::test]
async fn test_user_registration_sends_activation_email() {
    let db = test_db().await;
    let mailer = Arc::new(RecordingMailer::default());
    let registry = Arc::new(
        JobRegistry::builder()
            .register(Arc::new(SendRegistrationEmailHandler::new(mailer.clone(), settings())))
            .unwrap()
            .build(),
    );
    let enqueuer = OutboxEnqueuer::new(registry.clone());

    let user = new_user();
    let registered = user.clone();
    db.database
        .transaction(move |tx| {
            UserWriter::new(tx).create(&registered)?;
            enqueue_registration_email(&enqueuer, tx, registered.id)
        })
        .await
        .unwrap();

    let dispatcher = OutboxDispatcher::new(db.database.clone(), registry, DispatcherConfig::default());
    assert_eq!(dispatcher.tick().await.unwrap().succeeded, 1);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec![user.email.clone()]);
    assert!(sent[0].body_plain.contains(&format!(
        "https://autograd.test/account-activation?userID={}&activationToken={}",
        user.id, user.activation_token
    )));
}

#[tokio::test]
async fn test_active_user_is_not_mailed() {
    let db = test_db().await;
    let mailer = Arc::new(RecordingMailer::default());
    let registry = Arc::new(
        JobRegistry::builder()
            .register(Arc::new(SendRegistrationEmailHandler::new(mailer.clone(), settings())))
            .unwrap()
            .build(),
    );
    let enqueuer = OutboxEnqueuer::new(registry.clone());

    let mut user = new_user();
    user.active = true;
    db.database
        .transaction(move |tx| {
            UserWriter::new(tx).create(&user)?;
            enqueue_registration_email(&enqueuer, tx, user.id)
        })
        .await
        .unwrap();

    let dispatcher = OutboxDispatcher::new(db.database.clone(), registry, DispatcherConfig::default());
    assert!(matches!(
        dispatcher.tick().await,
        Err(DispatchError::FailedDispatch {
            source: JobError::Rejected(_),
            ..
        })
    ));
    assert!(mailer.sent().is_empty());
}
