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

//! Dispatcher ticks against a real database.

use std::sync::Arc;
use std::time::Duration;

use autograd::dal::OutboxItemReader;
use autograd::models::outbox_item::{OutboxItem, OutboxItemId, OutboxStatus};
use autograd::outbox::{EnqueueRequest, JobRegistry, OutboxDispatcher, OutboxEnqueuer};
use autograd::{DispatchError, DispatcherConfig};

use crate::fixtures::{test_db, Numbered, RecordingHandler, TestDb};

async fn enqueue(db: &TestDb, registry: &Arc<JobRegistry>, job_type: &'static str, n: u32) -> OutboxItem {
    let enqueuer = OutboxEnqueuer::new(registry.clone());
    db.database
        .transaction(move |tx| {
            enqueuer.enqueue(
                tx,
                EnqueueRequest::new(job_type, Numbered { n }).with_key(format!("{job_type}-{n}")),
            )
        })
        .await
        .unwrap()
}

async fn status_of(db: &TestDb, id: OutboxItemId) -> OutboxStatus {
    db.database
        .transaction(move |tx| OutboxItemReader::new(tx).find_by_id(id))
        .await
        .unwrap()
        .expect("outbox item should exist")
        .status
}

fn registry_with(handler: Arc<RecordingHandler>) -> Arc<JobRegistry> {
    Arc::new(JobRegistry::builder().register(handler).unwrap().build())
}

#[tokio::test]
async fn test_tick_runs_pending_items_in_order() {
    let db = test_db().await;
    let handler = RecordingHandler::new("count");
    let registry = registry_with(handler.clone());

    let mut ids = Vec::new();
    for n in 1..=3 {
        ids.push(enqueue(&db, &registry, "count", n).await.id);
    }

    let dispatcher = OutboxDispatcher::new(db.database.clone(), registry, DispatcherConfig::default());
    let report = dispatcher.tick().await.unwrap();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(handler.seen(), vec![1, 2, 3]);
    for id in ids {
        assert_eq!(status_of(&db, id).await, OutboxStatus::Success);
    }

    let empty = dispatcher.tick().await.unwrap();
    assert_eq!(empty.fetched, 0);
}

#[tokio::test]
async fn test_batch_size_limits_one_tick() {
    let db = test_db().await;
    let handler = RecordingHandler::new("count");
    let registry = registry_with(handler.clone());
    for n in 1..=3 {
        enqueue(&db, &registry, "count", n).await;
    }

    let config = DispatcherConfig::builder().batch_size(2).build();
    let dispatcher = OutboxDispatcher::new(db.database.clone(), registry, config);

    assert_eq!(dispatcher.tick().await.unwrap().succeeded, 2);
    assert_eq!(handler.seen(), vec![1, 2]);
    assert_eq!(dispatcher.tick().await.unwrap().succeeded, 1);
    assert_eq!(handler.seen(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_handler_failure_stops_the_batch() {
    let db = test_db().await;
    let handler = RecordingHandler::failing_on("count", 2);
    let registry = registry_with(handler.clone());

    let first = enqueue(&db, &registry, "count", 1).await.id;
    let second = enqueue(&db, &registry, "count", 2).await.id;
    let third = enqueue(&db, &registry, "count", 3).await.id;

    let dispatcher = OutboxDispatcher::new(db.database.clone(), registry, DispatcherConfig::default());
    match dispatcher.tick().await {
        Err(DispatchError::FailedDispatch { item_id, .. }) => assert_eq!(item_id, second),
        other => panic!("expected FailedDispatch, got {other:?}"),
    }

    assert_eq!(status_of(&db, first).await, OutboxStatus::Success);
    assert_eq!(status_of(&db, second).await, OutboxStatus::Failed);
    assert_eq!(status_of(&db, third).await, OutboxStatus::Pending);

    // The failed record is terminal; only the third runs next time.
    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(handler.seen(), vec![1, 2, 3]);
    assert_eq!(status_of(&db, third).await, OutboxStatus::Success);
}

#[tokio::test]
async fn test_unknown_job_type_is_left_sent() {
    let db = test_db().await;
    let producer = registry_with(RecordingHandler::new("legacy"));
    let item = enqueue(&db, &producer, "legacy", 1).await;

    let consumer = registry_with(RecordingHandler::new("count"));
    let dispatcher = OutboxDispatcher::new(db.database.clone(), consumer, DispatcherConfig::default());

    match dispatcher.tick().await {
        Err(DispatchError::UnknownJobType { item_id, job_type }) => {
            assert_eq!(item_id, item.id);
            assert_eq!(job_type.as_str(), "legacy");
        }
        other => panic!("expected UnknownJobType, got {other:?}"),
    }
    assert_eq!(status_of(&db, item.id).await, OutboxStatus::Sent);
}

#[tokio::test]
async fn test_key_is_reusable_once_terminal() {
    let db = test_db().await;
    let registry = registry_with(RecordingHandler::new("count"));

    let first = enqueue(&db, &registry, "count", 7).await;
    let dispatcher =
        OutboxDispatcher::new(db.database.clone(), registry.clone(), DispatcherConfig::default());
    dispatcher.tick().await.unwrap();

    let second = enqueue(&db, &registry, "count", 7).await;
    assert_ne!(first.id, second.id);
    assert!(second.id > first.id);
    assert_eq!(second.status, OutboxStatus::Pending);
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let db = test_db().await;
    let handler = RecordingHandler::new("count");
    let registry = registry_with(handler.clone());
    let item = enqueue(&db, &registry, "count", 1).await;

    let config = DispatcherConfig::builder()
        .poll_interval(Duration::from_millis(20))
        .build();
    let dispatcher = Arc::new(OutboxDispatcher::new(db.database.clone(), registry, config));
    let running = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.run().await }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while status_of(&db, item.id).await != OutboxStatus::Success {
        assert!(tokio::time::Instant::now() < deadline, "item was never dispatched");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    dispatcher.shutdown();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
    assert_eq!(handler.seen(), vec![1]);
}
