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

//! Outbox data access.
//!
//! Pure storage operations on `outbox_items`; lifecycle rules live in
//! [`OutboxItem::move_to`] and the dispatcher. Every operation runs in the
//! transaction it is handed.

use diesel::prelude::*;

use super::models::OutboxItemRow;
use crate::database::schema::outbox_items;
use crate::database::{dispatch_backend, DbTx};
use crate::error::DatabaseError;
use crate::models::outbox_item::{IdempotentKey, OutboxItem, OutboxItemId, OutboxStatus};

/// Read access to outbox records.
pub struct OutboxItemReader<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> OutboxItemReader<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    /// Finds the in-flight (pending, sent or picked) record holding `key`.
    ///
    /// Runs in the caller's transaction, so records inserted earlier in the
    /// same transaction are visible.
    pub fn find_in_flight_by_key(
        &mut self,
        key: &IdempotentKey,
    ) -> Result<Option<OutboxItem>, DatabaseError> {
        let key = key.as_str().to_string();
        let in_flight: Vec<&'static str> =
            OutboxStatus::IN_FLIGHT.iter().map(|s| s.as_str()).collect();

        let row: Option<OutboxItemRow> = dispatch_backend!(&mut *self.tx, |conn| {
            outbox_items::table
                .filter(outbox_items::idempotent_key.eq(&key))
                .filter(outbox_items::status.eq_any(in_flight))
                .order(outbox_items::id.asc())
                .select(OutboxItemRow::as_select())
                .first(conn)
                .optional()?
        });

        row.map(OutboxItem::try_from).transpose()
    }

    /// Fetches up to `limit` pending records, oldest id first.
    pub fn find_all_pending(&mut self, limit: i64) -> Result<Vec<OutboxItem>, DatabaseError> {
        let rows: Vec<OutboxItemRow> = dispatch_backend!(&mut *self.tx, |conn| {
            outbox_items::table
                .filter(outbox_items::status.eq(OutboxStatus::Pending.as_str()))
                .order(outbox_items::id.asc())
                .limit(limit)
                .select(OutboxItemRow::as_select())
                .load(conn)?
        });

        rows.into_iter().map(OutboxItem::try_from).collect()
    }

    pub fn find_by_id(&mut self, id: OutboxItemId) -> Result<Option<OutboxItem>, DatabaseError> {
        let id = id.to_string();
        let row: Option<OutboxItemRow> = dispatch_backend!(&mut *self.tx, |conn| {
            outbox_items::table
                .find(&id)
                .select(OutboxItemRow::as_select())
                .first(conn)
                .optional()?
        });

        row.map(OutboxItem::try_from).transpose()
    }

    /// Counts records holding `idempotent_key`, whatever their status.
    pub fn count_by_key(&mut self, key: &IdempotentKey) -> Result<i64, DatabaseError> {
        let key = key.as_str().to_string();
        let count = dispatch_backend!(&mut *self.tx, |conn| {
            outbox_items::table
                .filter(outbox_items::idempotent_key.eq(&key))
                .count()
                .get_result::<i64>(conn)?
        });
        Ok(count)
    }

    /// Counts records currently in `status`.
    pub fn count_by_status(&mut self, status: OutboxStatus) -> Result<i64, DatabaseError> {
        let count = dispatch_backend!(&mut *self.tx, |conn| {
            outbox_items::table
                .filter(outbox_items::status.eq(status.as_str()))
                .count()
                .get_result::<i64>(conn)?
        });
        Ok(count)
    }
}

/// Write access to outbox records.
pub struct OutboxItemWriter<'t, 'c> {
    tx: &'t mut DbTx<'c>,
}

impl<'t, 'c> OutboxItemWriter<'t, 'c> {
    pub fn new(tx: &'t mut DbTx<'c>) -> Self {
        Self { tx }
    }

    /// Inserts a new record.
    pub fn create(&mut self, item: &OutboxItem) -> Result<(), DatabaseError> {
        let row = OutboxItemRow::from(item);
        dispatch_backend!(&mut *self.tx, |conn| {
            diesel::insert_into(outbox_items::table)
                .values(&row)
                .execute(conn)?
        });
        Ok(())
    }

    /// Writes `item`'s status and version if the stored version still equals
    /// `expected_version`.
    ///
    /// Returns `false` when another writer got there first; the stored row is
    /// then left untouched.
    pub fn update_status(
        &mut self,
        item: &OutboxItem,
        expected_version: i32,
    ) -> Result<bool, DatabaseError> {
        let id = item.id.to_string();
        let status = item.status.as_str();
        let version = item.version;
        let updated_at = item.updated_at;

        let updated = dispatch_backend!(&mut *self.tx, |conn| {
            diesel::update(
                outbox_items::table
                    .filter(outbox_items::id.eq(&id))
                    .filter(outbox_items::version.eq(expected_version)),
            )
            .set((
                outbox_items::status.eq(status),
                outbox_items::version.eq(version),
                outbox_items::updated_at.eq(updated_at),
            ))
            .execute(conn)?
        });

        Ok(updated == 1)
    }
}
