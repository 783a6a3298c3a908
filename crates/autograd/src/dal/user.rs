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

use diesel::prelude::*;
use uuid::Uuid;

use super::models::UserRow;
use crate::database::schema::users;
use crate::database::{dispatch_backend, DbTx};
use crate::error::DatabaseError;
use crate::models::user::User;

pub struct UserReader<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> UserReader<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn find_by_id(&mut self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let id = id.to_string();
        let row: Option<UserRow> = dispatch_backend!(&mut *self.tx, |conn| {
            users::table
                .find(&id)
                .select(UserRow::as_select())
                .first(conn)
                .optional()?
        });
        row.map(User::try_from).transpose()
    }
}

pub struct UserWriter<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> UserWriter<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    pub fn create(&mut self, user: &User) -> Result<(), DatabaseError> {
        let row = UserRow::from(user);
        dispatch_backend!(&mut *self.tx, |conn| {
            diesel::insert_into(users::table).values(&row).execute(conn)?
        });
        Ok(())
    }
}
