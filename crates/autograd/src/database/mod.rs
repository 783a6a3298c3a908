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

//! Database access: connection pooling, migrations and transaction handles.
//!
//! Every query in this crate runs inside a transaction opened through
//! [`Database::transaction`]. The closure receives a [`DbTx`], a borrowed
//! connection tagged with its backend, so the same diesel query can be
//! compiled for PostgreSQL and SQLite alike.

pub mod connection;
pub mod schema;

pub use connection::{BackendType, Database};

use diesel_migrations::{embed_migrations, EmbeddedMigrations};

#[cfg(feature = "postgres")]
use diesel::PgConnection;
#[cfg(feature = "sqlite")]
use diesel::SqliteConnection;

#[cfg(feature = "postgres")]
pub const POSTGRES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");

#[cfg(feature = "sqlite")]
pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// A connection borrowed for the duration of one transaction.
///
/// Obtained from [`Database::transaction`]; everything executed through it
/// commits or rolls back together.
pub enum DbTx<'a> {
    #[cfg(feature = "postgres")]
    Postgres(&'a mut PgConnection),
    #[cfg(feature = "sqlite")]
    Sqlite(&'a mut SqliteConnection),
}

impl DbTx<'_> {
    /// Returns the backend this transaction runs on.
    pub fn backend(&self) -> BackendType {
        match self {
            #[cfg(feature = "postgres")]
            DbTx::Postgres(_) => BackendType::Postgres,
            #[cfg(feature = "sqlite")]
            DbTx::Sqlite(_) => BackendType::Sqlite,
        }
    }
}

impl std::fmt::Debug for DbTx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbTx::{:?}(...)", self.backend())
    }
}

/// Runs `$body` against the concrete connection behind a `&mut DbTx`.
///
/// The body is expanded once per enabled backend, so it must be a diesel
/// expression that type-checks for each of them.
macro_rules! dispatch_backend {
    ($tx:expr, |$conn:ident| $body:expr) => {
        match $tx {
            #[cfg(feature = "postgres")]
            $crate::database::DbTx::Postgres(inner) => {
                let $conn: &mut diesel::PgConnection = &mut **inner;
                $body
            }
            #[cfg(feature = "sqlite")]
            $crate::database::DbTx::Sqlite(inner) => {
                let $conn: &mut diesel::SqliteConnection = &mut **inner;
                $body
            }
        }
    };
}

pub(crate) use dispatch_backend;
