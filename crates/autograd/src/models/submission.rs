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

//! Submissions and the grade written back onto them.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::grading::{GradeResult, GradingError};

/// A student's submitted source file for an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub submitted_by: Uuid,
    /// Stored source file
    pub file_id: Uuid,
    /// Score between 0 and 100
    pub grade: i32,
    pub feedback: String,
    pub is_graded: bool,
    pub updated_at: NaiveDateTime,
}

impl Submission {
    /// Creates an ungraded submission.
    pub fn new(assignment_id: Uuid, submitted_by: Uuid, file_id: Uuid, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            assignment_id,
            submitted_by,
            file_id,
            grade: 0,
            feedback: String::new(),
            is_graded: false,
            updated_at: now,
        }
    }

    /// Applies a grading result. The submission is left untouched when the
    /// result has no test cases.
    pub fn save_grade(&mut self, now: NaiveDateTime, result: &GradeResult) -> Result<(), GradingError> {
        let score = result.score()?;
        self.grade = score;
        self.feedback = format!(
            "Passed {} of {} test cases",
            result.correct_count(),
            result.total()
        );
        self.updated_at = now;
        self.is_graded = true;
        Ok(())
    }
}
