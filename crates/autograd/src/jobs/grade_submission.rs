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

//! The `grade_submission` job.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use super::GRADE_SUBMISSION;
use crate::dal::{SubmissionReader, SubmissionWriter};
use crate::error::JobError;
use crate::grading::Grader;
use crate::models::outbox_item::{JobType, Payload};
use crate::outbox::{JobContext, JobHandler};
use crate::storage::{read_all, ObjectStorer, StorageError};

/// File name the submitted source is copied to inside the scratch directory.
const SOURCE_FILE_NAME: &str = "main.cpp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSubmissionPayload {
    pub submission_id: Uuid,
}

/// Grades a submission and writes the score back.
///
/// The submission and its reference files are read in one transaction and
/// the grade is written in another; no transaction stays open while the
/// program compiles and runs.
pub struct GradeSubmissionHandler {
    storage: Arc<dyn ObjectStorer>,
    grader: Grader,
}

impl GradeSubmissionHandler {
    pub fn new(storage: Arc<dyn ObjectStorer>, grader: Grader) -> Self {
        Self { storage, grader }
    }

    async fn copy_source(&self, object_path: &str, dst: &Path) -> Result<(), JobError> {
        let mut reader = self.storage.seek(object_path).await?;
        let mut file = tokio::fs::File::create(dst)
            .await
            .map_err(JobError::Workspace)?;
        tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|source| StorageError::Io {
                path: object_path.to_string(),
                source,
            })?;
        file.flush().await.map_err(JobError::Workspace)?;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for GradeSubmissionHandler {
    fn job_type(&self) -> JobType {
        JobType::new(GRADE_SUBMISSION)
    }

    async fn handle(&self, ctx: &JobContext, payload: &Payload) -> Result<(), JobError> {
        let GradeSubmissionPayload { submission_id } = payload.unmarshal()?;

        let target = ctx
            .database()
            .transaction(move |tx| SubmissionReader::new(tx).find_grading_target(submission_id))
            .await?
            .ok_or_else(|| JobError::NotFound {
                entity: "submission",
                id: submission_id.to_string(),
            })?;

        let workdir = tempfile::Builder::new()
            .prefix("autograd-")
            .tempdir()
            .map_err(JobError::Workspace)?;
        let source = workdir.path().join(SOURCE_FILE_NAME);
        self.copy_source(&target.source.path, &source).await?;

        let input = read_all(self.storage.as_ref(), &target.case_input.path).await?;
        let expected = read_all(self.storage.as_ref(), &target.case_output.path).await?;

        let result = self.grader.grade(&source, &input, &expected).await?;

        let mut submission = target.submission;
        submission.save_grade(Utc::now().naive_utc(), &result)?;
        let grade = submission.grade;

        ctx.database()
            .transaction(move |tx| SubmissionWriter::new(tx).update_grade(&submission))
            .await?;

        info!(
            item_id = %ctx.item_id(),
            %submission_id,
            grade,
            "Submission graded"
        );
        Ok(())
    }
}
