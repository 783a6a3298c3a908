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

//! Job types handled by the outbox and the helpers that enqueue them.

pub mod grade_submission;
pub mod registration_email;

pub use grade_submission::{GradeSubmissionHandler, GradeSubmissionPayload};
pub use registration_email::{
    registration_email, RegistrationEmailSettings, SendEmailPayload, SendRegistrationEmailHandler,
};

use uuid::Uuid;

use crate::dal::SubmissionWriter;
use crate::database::{Database, DbTx};
use crate::error::OutboxError;
use crate::models::outbox_item::OutboxItem;
use crate::models::submission::Submission;
use crate::outbox::{EnqueueRequest, OutboxEnqueuer};

/// Job type of [`GradeSubmissionHandler`].
pub const GRADE_SUBMISSION: &str = "grade_submission";

/// Job type of [`SendRegistrationEmailHandler`].
pub const SEND_EMAIL: &str = "send_email";

/// Enqueues grading of an existing submission in `tx`.
///
/// The submission id is the idempotency key, so a submission is graded at
/// most once at a time.
pub fn enqueue_grading(
    enqueuer: &OutboxEnqueuer,
    tx: &mut DbTx<'_>,
    submission_id: Uuid,
) -> Result<OutboxItem, OutboxError> {
    enqueuer.enqueue(
        tx,
        EnqueueRequest::new(GRADE_SUBMISSION, GradeSubmissionPayload { submission_id })
            .with_key(submission_id.to_string()),
    )
}

/// Enqueues the activation email for a newly registered user in `tx`.
pub fn enqueue_registration_email(
    enqueuer: &OutboxEnqueuer,
    tx: &mut DbTx<'_>,
    user_id: Uuid,
) -> Result<OutboxItem, OutboxError> {
    enqueuer.enqueue(
        tx,
        EnqueueRequest::new(SEND_EMAIL, SendEmailPayload { user_id })
            .with_key(format!("{}:{}", SEND_EMAIL, user_id)),
    )
}

/// Stores a new submission and schedules its grading in one transaction.
pub async fn submit_for_grading(
    database: &Database,
    enqueuer: &OutboxEnqueuer,
    submission: Submission,
) -> Result<(Submission, OutboxItem), OutboxError> {
    let enqueuer = enqueuer.clone();
    database
        .transaction(move |tx| {
            SubmissionWriter::new(tx).create(&submission)?;
            let item = enqueue_grading(&enqueuer, tx, submission.id)?;
            Ok((submission, item))
        })
        .await
}
