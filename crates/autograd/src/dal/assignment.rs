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

//! Assignments and the stored files they reference.

use diesel::prelude::*;
use uuid::Uuid;

use super::models::{AssignmentRow, FileRow};
use crate::database::schema::{assignments, files};
use crate::database::{dispatch_backend, DbTx};
use crate::error::DatabaseError;
use crate::models::assignment::{Assignment, StoredFile};

pub struct AssignmentReader<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> AssignmentReader<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn find_by_id(&mut self, id: Uuid) -> Result<Option<Assignment>, DatabaseError> {
        let id = id.to_string();
        let row: Option<AssignmentRow> = dispatch_backend!(&mut *self.tx, |conn| {
            assignments::table
                .find(&id)
                .select(AssignmentRow::as_select())
                .first(conn)
                .optional()?
        });
        row.map(Assignment::try_from).transpose()
    }
}

pub struct AssignmentWriter<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> AssignmentWriter<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn create(&mut self, assignment: &Assignment) -> Result<(), DatabaseError> {
        let row = AssignmentRow::from(assignment);
        dispatch_backend!(&mut *self.tx, |conn| {
            diesel::insert_into(assignments::table)
                .values(&row)
                .execute(conn)?
        });
        Ok(())
    }
}

pub struct FileReader<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> FileReader<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn find_by_id(&mut self, id: Uuid) -> Result<Option<StoredFile>, DatabaseError> {
        let id = id.to_string();
        let row: Option<FileRow> = dispatch_backend!(&mut *self.tx, |conn| {
            files::table
                .find(&id)
                .select(FileRow::as_select())
                .first(conn)
                .optional()?
        });
        row.map(StoredFile::try_from).transpose()
    }
}

pub struct FileWriter<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> FileWriter<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn create(&mut self, file: &StoredFile) -> Result<(), DatabaseError> {
        let row = FileRow::from(file);
        dispatch_backend!(&mut *self.tx, |conn| {
            diesel::insert_into(files::table).values(&row).execute(conn)?
        });
        Ok(())
    }
}
