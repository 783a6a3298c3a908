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

use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use super::assignment::{AssignmentReader, FileReader};
use super::models::SubmissionRow;
use crate::database::schema::submissions;
use crate::database::{dispatch_backend, DbTx};
use crate::error::DatabaseError;
use crate::models::assignment::{Assignment, StoredFile};
use crate::models::submission::Submission;

/// Everything the grading job needs to know about one submission.
#[derive(Debug, Clone)]
pub struct GradingTarget {
    pub submission: Submission,
    pub assignment: Assignment,
    /// Submitted source code
    pub source: StoredFile,
    /// Reference input fed to the program
    pub case_input: StoredFile,
    /// Reference output the program is compared against
    pub case_output: StoredFile,
}

pub struct SubmissionReader<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> SubmissionReader<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn find_by_id(&mut self, id: Uuid) -> Result<Option<Submission>, DatabaseError> {
        let id = id.to_string();
        let row: Option<SubmissionRow> = dispatch_backend!(&mut *self.tx, |conn| {
            submissions::table
                .find(&id)
                .select(SubmissionRow::as_select())
                .first(conn)
                .optional()?
        });
        row.map(Submission::try_from).transpose()
    }

    /// Loads a submission together with its assignment and the three files
    /// grading reads. Returns `None` if any of them is missing.
    pub fn find_grading_target(&mut self, id: Uuid) -> Result<Option<GradingTarget>, DatabaseError> {
        let Some(submission) = self.find_by_id(id)? else {
            return Ok(None);
        };
        let Some(assignment) = AssignmentReader::new(self.tx).find_by_id(submission.assignment_id)?
        else {
            return Ok(None);
        };

        let mut files = FileReader::new(self.tx);
        let source = files.find_by_id(submission.file_id)?;
        let case_input = files.find_by_id(assignment.case_input_file_id)?;
        let case_output = files.find_by_id(assignment.case_output_file_id)?;

        Ok(match (source, case_input, case_output) {
            (Some(source), Some(case_input), Some(case_output)) => Some(GradingTarget {
                submission,
                assignment,
                source,
                case_input,
                case_output,
            }),
            _ => None,
        })
    }
}

pub struct SubmissionWriter<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> SubmissionWriter<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn create(&mut self, submission: &Submission) -> Result<(), DatabaseError> {
        let row = SubmissionRow::from(submission);
        dispatch_backend!(&mut *self.tx, |conn| {
            diesel::insert_into(submissions::table)
                .values(&row)
                .execute(conn)?
        });
        Ok(())
    }

    /// Persists the grade, feedback, graded flag and timestamp of `submission`.
    pub fn update_grade(&mut self, submission: &Submission) -> Result<(), DatabaseError> {
        let id = submission.id.to_string();
        let grade = submission.grade;
        let feedback = submission.feedback.clone();
        let is_graded = submission.is_graded;
        let updated_at: NaiveDateTime = submission.updated_at;

        let updated = dispatch_backend!(&mut *self.tx, |conn| {
            diesel::update(submissions::table.find(&id))
                .set((
                    submissions::grade.eq(grade),
                    submissions::feedback.eq(&feedback),
                    submissions::is_graded.eq(is_graded),
                    submissions::updated_at.eq(updated_at),
                ))
                .execute(conn)?
        });

        if updated == 0 {
            return Err(DatabaseError::Query(diesel::result::Error::NotFound));
        }
        Ok(())
    }
}
