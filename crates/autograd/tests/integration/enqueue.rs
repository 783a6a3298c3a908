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

//! Enqueueing inside business transactions.

use std::sync::Arc;

use autograd::dal::OutboxItemReader;
use autograd::models::outbox_item::{IdempotentKey, JobType, OutboxStatus};
use autograd::outbox::{EnqueueRequest, JobRegistry, OutboxEnqueuer};
use autograd::OutboxError;

use crate::fixtures::{test_db, Numbered, RecordingHandler};

fn enqueuer() -> OutboxEnqueuer {
    let registry = JobRegistry::builder()
        .register(RecordingHandler::new("noop"))
        .unwrap()
        .build();
    OutboxEnqueuer::new(Arc::new(registry))
}

#[tokio::test]
async fn test_duplicate_enqueue_returns_existing_record() {
    let db = test_db().await;
    let enqueuer = enqueuer();

    let first_enqueuer = enqueuer.clone();
    let first = db
        .database
        .transaction(move |tx| {
            first_enqueuer.enqueue(tx, EnqueueRequest::new("noop", Numbered { n: 1 }).with_key("k1"))
        })
        .await
        .unwrap();

    let second_enqueuer = enqueuer.clone();
    let second = db
        .database
        .transaction(move |tx| {
            second_enqueuer.enqueue(tx, EnqueueRequest::new("noop", Numbered { n: 2 }).with_key("k1"))
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, OutboxStatus::Pending);

    let count = db
        .database
        .transaction(|tx| OutboxItemReader::new(tx).count_by_key(&IdempotentKey::new("k1")))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_duplicate_within_one_transaction_sees_uncommitted_insert() {
    let db = test_db().await;
    let enqueuer = enqueuer();

    let (first, second) = db
        .database
        .transaction(move |tx| {
            let first =
                enqueuer.enqueue(tx, EnqueueRequest::new("noop", Numbered { n: 1 }).with_key("k2"))?;
            let second =
                enqueuer.enqueue(tx, EnqueueRequest::new("noop", Numbered { n: 2 }).with_key("k2"))?;
            Ok::<_, OutboxError>((first, second))
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.payload, first.payload);

    let count = db
        .database
        .transaction(|tx| OutboxItemReader::new(tx).count_by_key(&IdempotentKey::new("k2")))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_empty_key_defaults_to_record_id() {
    let db = test_db().await;
    let enqueuer = enqueuer();

    let item = db
        .database
        .transaction(move |tx| enqueuer.enqueue(tx, EnqueueRequest::new("noop", Numbered { n: 1 })))
        .await
        .unwrap();

    assert_eq!(item.idempotent_key.as_str(), item.id.to_string());
    assert_eq!(item.version, 0);
}

#[tokio::test]
async fn test_unregistered_job_type_writes_nothing() {
    let db = test_db().await;
    let enqueuer = enqueuer();

    let result = db
        .database
        .transaction(move |tx| {
            enqueuer.enqueue(tx, EnqueueRequest::new("nope", Numbered { n: 1 }).with_key("k"))
        })
        .await;

    match result {
        Err(OutboxError::InvalidJobType(job_type)) => assert_eq!(job_type, JobType::new("nope")),
        other => panic!("expected InvalidJobType, got {other:?}"),
    }

    let pending = db
        .database
        .transaction(|tx| OutboxItemReader::new(tx).count_by_status(OutboxStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending, 0);
}

#[tokio::test]
async fn test_enqueue_rolls_back_with_business_transaction() {
    let db = test_db().await;
    let enqueuer = enqueuer();

    let result: Result<(), OutboxError> = db
        .database
        .transaction(move |tx| {
            enqueuer.enqueue(tx, EnqueueRequest::new("noop", Numbered { n: 1 }).with_key("k"))?;
            Err(OutboxError::InvalidJobType(JobType::new("abort")))
        })
        .await;
    assert!(result.is_err());

    let count = db
        .database
        .transaction(|tx| OutboxItemReader::new(tx).count_by_key(&IdempotentKey::new("k")))
        .await
        .unwrap();
    assert_eq!(count, 0);
}
