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

//! End-to-end grading through the outbox with a fake compiler and runner.

use std::sync::Arc;

use autograd::dal::{OutboxItemReader, SubmissionReader};
use autograd::grading::{CaseSide, CompileError, Compiler, Grader, GradingError, Runner};
use autograd::jobs::{enqueue_grading, submit_for_grading, GradeSubmissionHandler, GRADE_SUBMISSION};
use autograd::models::outbox_item::{OutboxItemId, OutboxStatus};
use autograd::models::submission::Submission;
use autograd::outbox::{JobRegistry, OutboxDispatcher, OutboxEnqueuer};
use autograd::{DispatchError, DispatcherConfig, JobError};
use uuid::Uuid;

use crate::fixtures::{seed_submission, test_db, FakeCompiler, FakeRunner, TestDb};

const SOURCE: &str = "int main() { int a, b; while (std::cin >> a >> b) std::cout << a + b << '\\n'; }\n";

struct Harness {
    db: TestDb,
    enqueuer: OutboxEnqueuer,
    dispatcher: OutboxDispatcher,
}

fn harness(db: TestDb, compiler: FakeCompiler, runner: Arc<FakeRunner>) -> Harness {
    let compiler: Arc<dyn Compiler> = Arc::new(compiler);
    let runner: Arc<dyn Runner> = runner;
    let handler = GradeSubmissionHandler::new(db.storage.clone(), Grader::new(compiler, runner));
    let registry = Arc::new(
        JobRegistry::builder()
            .register(Arc::new(handler))
            .unwrap()
            .build(),
    );
    Harness {
        enqueuer: OutboxEnqueuer::new(registry.clone()),
        dispatcher: OutboxDispatcher::new(db.database.clone(), registry, DispatcherConfig::default()),
        db,
    }
}

async fn load(db: &TestDb, id: Uuid) -> Submission {
    db.database
        .transaction(move |tx| SubmissionReader::new(tx).find_by_id(id))
        .await
        .unwrap()
        .expect("submission should exist")
}

async fn status_of(db: &TestDb, id: OutboxItemId) -> OutboxStatus {
    db.database
        .transaction(move |tx| OutboxItemReader::new(tx).find_by_id(id))
        .await
        .unwrap()
        .expect("outbox item should exist")
        .status
}

#[tokio::test]
async fn test_partially_correct_submission_is_scored() {
    let db = test_db().await;
    let seeded = seed_submission(&db, SOURCE, "1 1\n2 2\n3 3\n", "2\n4\n6\n").await;
    let runner = Arc::new(FakeRunner::new("2\n4\n7\n"));
    let h = harness(db, FakeCompiler::ok(), runner.clone());

    let (submission, item) = submit_for_grading(&h.db.database, &h.enqueuer, seeded.submission)
        .await
        .unwrap();
    assert_eq!(item.job_type.as_str(), GRADE_SUBMISSION);
    assert_eq!(item.idempotent_key.as_str(), submission.id.to_string());

    let report = h.dispatcher.tick().await.unwrap();
    assert_eq!(report.succeeded, 1);

    let graded = load(&h.db, submission.id).await;
    assert!(graded.is_graded);
    assert_eq!(graded.grade, 66);
    assert_eq!(graded.feedback, "Passed 2 of 3 test cases");
    assert_eq!(runner.inputs(), vec![b"1 1\n2 2\n3 3\n".to_vec()]);
    assert_eq!(status_of(&h.db, item.id).await, OutboxStatus::Success);
}

#[tokio::test]
async fn test_compile_error_leaves_submission_ungraded() {
    let db = test_db().await;
    let seeded = seed_submission(&db, "int main( {", "1 1\n", "2\n").await;
    let runner = Arc::new(FakeRunner::new("2\n"));
    let h = harness(
        db,
        FakeCompiler::failing("main.cpp:1:10: error: expected ')'"),
        runner.clone(),
    );

    let (submission, item) = submit_for_grading(&h.db.database, &h.enqueuer, seeded.submission)
        .await
        .unwrap();

    match h.dispatcher.tick().await {
        Err(DispatchError::FailedDispatch {
            source: JobError::Grading(GradingError::Compile(CompileError::Failed { stderr, .. })),
            ..
        }) => assert!(stderr.contains("expected ')'")),
        other => panic!("expected a compile failure, got {other:?}"),
    }

    let stored = load(&h.db, submission.id).await;
    assert!(!stored.is_graded);
    assert_eq!(stored.grade, 0);
    assert!(runner.inputs().is_empty());
    assert_eq!(status_of(&h.db, item.id).await, OutboxStatus::Failed);
}

#[tokio::test]
async fn test_mismatched_fixtures_record_no_score() {
    let db = test_db().await;
    let seeded = seed_submission(&db, SOURCE, "1\n2\n3\n4\n5\n", "1\n2\n3\n4\n").await;
    let runner = Arc::new(FakeRunner::new("1\n2\n3\n4\n"));
    let h = harness(db, FakeCompiler::ok(), runner.clone());

    let (submission, item) = submit_for_grading(&h.db.database, &h.enqueuer, seeded.submission)
        .await
        .unwrap();

    match h.dispatcher.tick().await {
        Err(DispatchError::FailedDispatch {
            source:
                JobError::Grading(GradingError::OutputCountMismatch {
                    side,
                    lines,
                    expecteds,
                }),
            ..
        }) => {
            assert_eq!(side, CaseSide::Input);
            assert_eq!(lines, 5);
            assert_eq!(expecteds, 4);
        }
        other => panic!("expected an output count mismatch, got {other:?}"),
    }

    let stored = load(&h.db, submission.id).await;
    assert!(!stored.is_graded);
    assert_eq!(stored.grade, 0);
    assert!(runner.inputs().is_empty());
    assert_eq!(status_of(&h.db, item.id).await, OutboxStatus::Failed);
}

#[tokio::test]
async fn test_short_program_output_records_no_score() {
    let db = test_db().await;
    let seeded = seed_submission(&db, SOURCE, "1\n2\n3\n4\n5\n", "1\n2\n3\n4\n5\n").await;
    let h = harness(db, FakeCompiler::ok(), Arc::new(FakeRunner::new("1\n2\n3\n4\n")));

    let (submission, item) = submit_for_grading(&h.db.database, &h.enqueuer, seeded.submission)
        .await
        .unwrap();

    match h.dispatcher.tick().await {
        Err(DispatchError::FailedDispatch {
            source:
                JobError::Grading(GradingError::OutputCountMismatch {
                    side,
                    lines,
                    expecteds,
                }),
            ..
        }) => {
            assert_eq!(side, CaseSide::Output);
            assert_eq!(lines, 4);
            assert_eq!(expecteds, 5);
        }
        other => panic!("expected an output count mismatch, got {other:?}"),
    }

    assert!(!load(&h.db, submission.id).await.is_graded);
    assert_eq!(status_of(&h.db, item.id).await, OutboxStatus::Failed);
}

#[tokio::test]
async fn test_regrade_while_in_flight_reuses_record() {
    let db = test_db().await;
    let seeded = seed_submission(&db, SOURCE, "1 1\n", "2\n").await;
    let h = harness(db, FakeCompiler::ok(), Arc::new(FakeRunner::new("2\n")));

    let (submission, first) = submit_for_grading(&h.db.database, &h.enqueuer, seeded.submission)
        .await
        .unwrap();

    let enqueuer = h.enqueuer.clone();
    let submission_id = submission.id;
    let second = h
        .db
        .database
        .transaction(move |tx| enqueue_grading(&enqueuer, tx, submission_id))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let report = h.dispatcher.tick().await.unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(load(&h.db, submission.id).await.grade, 100);
}

#[tokio::test]
async fn test_missing_submission_fails_the_job() {
    let db = test_db().await;
    let h = harness(db, FakeCompiler::ok(), Arc::new(FakeRunner::new("")));

    let enqueuer = h.enqueuer.clone();
    let missing = Uuid::new_v4();
    let item = h
        .db
        .database
        .transaction(move |tx| enqueue_grading(&enqueuer, tx, missing))
        .await
        .unwrap();

    match h.dispatcher.tick().await {
        Err(DispatchError::FailedDispatch {
            source: JobError::NotFound { entity, id },
            ..
        }) => {
            assert_eq!(entity, "submission");
            assert_eq!(id, missing.to_string());
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(status_of(&h.db, item.id).await, OutboxStatus::Failed);
}
