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

//! Row types mirroring the tables in [`crate::database::schema`], and their
//! conversions to and from the domain models.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::database::schema::{assignments, files, outbox_items, submissions, users};
use crate::error::DatabaseError;
use crate::models::assignment::{Assignment, StoredFile};
use crate::models::outbox_item::{IdempotentKey, JobType, OutboxItem, Payload};
use crate::models::submission::Submission;
use crate::models::user::User;

fn parse_uuid(table: &'static str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::CorruptRow {
        table,
        reason: format!("invalid uuid '{}': {}", value, e),
    })
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = outbox_items)]
pub struct OutboxItemRow {
    pub id: String,
    pub idempotent_key: String,
    pub status: String,
    pub job_type: String,
    pub payload: Vec<u8>,
    pub version: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&OutboxItem> for OutboxItemRow {
    fn from(item: &OutboxItem) -> Self {
        Self {
            id: item.id.to_string(),
            idempotent_key: item.idempotent_key.as_str().to_string(),
            status: item.status.as_str().to_string(),
            job_type: item.job_type.as_str().to_string(),
            payload: item.payload.as_bytes().to_vec(),
            version: item.version,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl TryFrom<OutboxItemRow> for OutboxItem {
    type Error = DatabaseError;

    fn try_from(row: OutboxItemRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| DatabaseError::CorruptRow {
            table: "outbox_items",
            reason,
        };

        Ok(OutboxItem {
            id: row
                .id
                .parse()
                .map_err(|e| corrupt(format!("invalid id '{}': {}", row.id, e)))?,
            idempotent_key: IdempotentKey::new(row.idempotent_key),
            status: row.status.parse().map_err(corrupt)?,
            job_type: JobType::new(row.job_type),
            payload: Payload::from_bytes(row.payload),
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = submissions)]
pub struct SubmissionRow {
    pub id: String,
    pub assignment_id: String,
    pub submitted_by: String,
    pub file_id: String,
    pub grade: i32,
    pub feedback: String,
    pub is_graded: bool,
    pub updated_at: NaiveDateTime,
}

impl From<&Submission> for SubmissionRow {
    fn from(sub: &Submission) -> Self {
        Self {
            id: sub.id.to_string(),
            assignment_id: sub.assignment_id.to_string(),
            submitted_by: sub.submitted_by.to_string(),
            file_id: sub.file_id.to_string(),
            grade: sub.grade,
            feedback: sub.feedback.clone(),
            is_graded: sub.is_graded,
            updated_at: sub.updated_at,
        }
    }
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = DatabaseError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            id: parse_uuid("submissions", &row.id)?,
            assignment_id: parse_uuid("submissions", &row.assignment_id)?,
            submitted_by: parse_uuid("submissions", &row.submitted_by)?,
            file_id: parse_uuid("submissions", &row.file_id)?,
            grade: row.grade,
            feedback: row.feedback,
            is_graded: row.is_graded,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = assignments)]
pub struct AssignmentRow {
    pub id: String,
    pub name: String,
    pub assigned_by: String,
    pub deadline_at: NaiveDateTime,
    pub case_input_file_id: String,
    pub case_output_file_id: String,
}

impl From<&Assignment> for AssignmentRow {
    fn from(a: &Assignment) -> Self {
        Self {
            id: a.id.to_string(),
            name: a.name.clone(),
            assigned_by: a.assigned_by.to_string(),
            deadline_at: a.deadline_at,
            case_input_file_id: a.case_input_file_id.to_string(),
            case_output_file_id: a.case_output_file_id.to_string(),
        }
    }
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = DatabaseError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(Assignment {
            id: parse_uuid("assignments", &row.id)?,
            name: row.name,
            assigned_by: parse_uuid("assignments", &row.assigned_by)?,
            deadline_at: row.deadline_at,
            case_input_file_id: parse_uuid("assignments", &row.case_input_file_id)?,
            case_output_file_id: parse_uuid("assignments", &row.case_output_file_id)?,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = files)]
pub struct FileRow {
    pub id: String,
    pub name: String,
    pub path: String,
    pub file_type: String,
}

impl From<&StoredFile> for FileRow {
    fn from(file: &StoredFile) -> Self {
        Self {
            id: file.id.to_string(),
            name: file.name.clone(),
            path: file.path.clone(),
            file_type: file.file_type.clone(),
        }
    }
}

impl TryFrom<FileRow> for StoredFile {
    type Error = DatabaseError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(StoredFile {
            id: parse_uuid("files", &row.id)?,
            name: row.name,
            path: row.path,
            file_type: row.file_type,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub activation_token: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            active: user.active,
            activation_token: user.activation_token.clone(),
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uuid("users", &row.id)?,
            name: row.name,
            email: row.email,
            active: row.active,
            activation_token: row.activation_token,
        })
    }
}
