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

//! Outbox records and the types that describe them.
//!
//! An [`OutboxItem`] is written in the same transaction as the business change
//! that requested background work, and moves through a fixed lifecycle:
//!
//! ```text
//! pending -> sent -> picked -> success
//!                          \-> failed
//! ```
//!
//! Status never moves backwards; [`OutboxItem::move_to`] rejects any other
//! transition.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use chrono::{NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use ulid::{Generator, Ulid};

use crate::error::{JobError, OutboxError};

/// Sortable identifier of an outbox record.
///
/// ULIDs order by creation time; ids allocated by one process are strictly
/// increasing, so ordering by id is ordering by enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutboxItemId(Ulid);

impl OutboxItemId {
    /// Allocates a new id, greater than every id previously allocated by this process.
    pub fn new() -> Self {
        static GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();

        let mut generator = GENERATOR
            .get_or_init(|| Mutex::new(Generator::new()))
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        // The generator only fails when the random component overflows within
        // one millisecond.
        Self(generator.generate().unwrap_or_else(|_| Ulid::new()))
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for OutboxItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutboxItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OutboxItemId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Deduplication key for enqueue.
///
/// While a record with a given key is still in flight (pending, sent or
/// picked), enqueueing the same key again returns that record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct IdempotentKey(String);

impl IdempotentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IdempotentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdempotentKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for IdempotentKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Name of a kind of background job, e.g. `grade_submission`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobType(String);

impl JobType {
    pub fn new(job_type: impl Into<String>) -> Self {
        Self(job_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobType {
    fn from(job_type: &str) -> Self {
        Self::new(job_type)
    }
}

/// Opaque job arguments, stored as JSON bytes and decoded only by the handler
/// registered for the record's job type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Serializes `value` to JSON.
    pub fn marshal<T: Serialize + ?Sized>(value: &T) -> Result<Self, OutboxError> {
        serde_json::to_vec(value)
            .map(Self)
            .map_err(OutboxError::PayloadEncoding)
    }

    /// Decodes the payload as JSON into `T`.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, JobError> {
        serde_json::from_slice(&self.0).map_err(JobError::PayloadDecoding)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Lifecycle state of an outbox record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboxStatus {
    /// Written, waiting for a dispatcher.
    Pending,
    /// Claimed by a dispatcher.
    Sent,
    /// Handed to its handler.
    Picked,
    Success,
    Failed,
}

impl OutboxStatus {
    pub const IN_FLIGHT: [OutboxStatus; 3] =
        [OutboxStatus::Pending, OutboxStatus::Sent, OutboxStatus::Picked];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Sent => "sent",
            OutboxStatus::Picked => "picked",
            OutboxStatus::Success => "success",
            OutboxStatus::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutboxStatus::Success | OutboxStatus::Failed)
    }

    /// Whether `next` is the status directly after `self`.
    pub fn can_move_to(&self, next: OutboxStatus) -> bool {
        matches!(
            (self, next),
            (OutboxStatus::Pending, OutboxStatus::Sent)
                | (OutboxStatus::Sent, OutboxStatus::Picked)
                | (OutboxStatus::Picked, OutboxStatus::Success)
                | (OutboxStatus::Picked, OutboxStatus::Failed)
        )
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "sent" => Ok(OutboxStatus::Sent),
            "picked" => Ok(OutboxStatus::Picked),
            "success" => Ok(OutboxStatus::Success),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(format!("unknown outbox status '{}'", other)),
        }
    }
}

/// A unit of background work recorded in the outbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxItem {
    /// Sortable identifier assigned at creation
    pub id: OutboxItemId,
    /// Deduplication key; defaults to the id's string form
    pub idempotent_key: IdempotentKey,
    /// Current lifecycle state
    pub status: OutboxStatus,
    /// Selects the handler that processes this record
    pub job_type: JobType,
    /// Encoded job arguments
    pub payload: Payload,
    /// Optimistic-concurrency counter, incremented on every status write
    pub version: i32,
    /// When the record was created
    pub created_at: NaiveDateTime,
    /// When the record was last written
    pub updated_at: NaiveDateTime,
}

impl OutboxItem {
    /// Builds a new `pending` record. An empty key is replaced by the record's id.
    pub fn new(job_type: JobType, idempotent_key: IdempotentKey, payload: Payload) -> Self {
        let id = OutboxItemId::new();
        let idempotent_key = if idempotent_key.is_empty() {
            IdempotentKey::new(id.to_string())
        } else {
            idempotent_key
        };
        let now = Utc::now().naive_utc();

        Self {
            id,
            idempotent_key,
            status: OutboxStatus::Pending,
            job_type,
            payload,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advances the record to `next`, bumping its version.
    pub fn move_to(&mut self, next: OutboxStatus) -> Result<(), OutboxError> {
        if !self.status.can_move_to(next) {
            return Err(OutboxError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.version += 1;
        self.updated_at = Utc::now().naive_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_forward_transitions_are_allowed() {
        let mut item = OutboxItem::new(
            JobType::new("grade_submission"),
            IdempotentKey::default(),
            Payload::default(),
        );

        item.move_to(OutboxStatus::Sent).unwrap();
        item.move_to(OutboxStatus::Picked).unwrap();
        item.move_to(OutboxStatus::Success).unwrap();

        assert_eq!(item.status, OutboxStatus::Success);
        assert_eq!(item.version, 3);
    }

    #[test]
    fn test_backward_and_skipping_transitions_are_rejected() {
        use OutboxStatus::*;
        let all = [Pending, Sent, Picked, Success, Failed];
        let allowed = [(Pending, Sent), (Sent, Picked), (Picked, Success), (Picked, Failed)];

        for from in all {
            for to in all {
                assert_eq!(
                    from.can_move_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }

        let mut item = OutboxItem::new(JobType::new("send_email"), "k".into(), Payload::default());
        item.move_to(Sent).unwrap();
        let err = item.move_to(Pending).unwrap_err();
        assert!(matches!(
            err,
            OutboxError::InvalidStatusTransition { from: Sent, to: Pending }
        ));
        assert_eq!(item.status, Sent);
        assert_eq!(item.version, 1);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OutboxStatus::Success.is_terminal());
        assert!(OutboxStatus::Failed.is_terminal());
        for status in OutboxStatus::IN_FLIGHT {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn test_status_string_form() {
        for status in [
            OutboxStatus::Pending,
            OutboxStatus::Sent,
            OutboxStatus::Picked,
            OutboxStatus::Success,
            OutboxStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<OutboxStatus>().unwrap(), status);
        }
        assert!("done".parse::<OutboxStatus>().is_err());
    }

    #[test]
    fn test_empty_key_defaults_to_id() {
        let item = OutboxItem::new(JobType::new("send_email"), IdempotentKey::default(), Payload::default());
        assert_eq!(item.idempotent_key.as_str(), item.id.to_string());

        let keyed = OutboxItem::new(JobType::new("send_email"), "user-1".into(), Payload::default());
        assert_eq!(keyed.idempotent_key.as_str(), "user-1");
    }

    #[test]
    fn test_ids_are_strictly_increasing() {
        let ids: Vec<OutboxItemId> = (0..100).map(|_| OutboxItemId::new()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_string() < pair[1].to_string());
        }
        let parsed: OutboxItemId = ids[0].to_string().parse().unwrap();
        assert_eq!(parsed, ids[0]);
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct GradeArgs {
        submission_id: String,
        attempt: u32,
    }

    #[test]
    fn test_payload_decodes_to_what_was_encoded() {
        let args = GradeArgs {
            submission_id: "4f1c".to_string(),
            attempt: 2,
        };
        let payload = Payload::marshal(&args).unwrap();
        assert_eq!(payload.unmarshal::<GradeArgs>().unwrap(), args);
    }

    #[test]
    fn test_payload_decode_failure_is_a_job_error() {
        let payload = Payload::from_bytes(b"not json".to_vec());
        let err = payload.unmarshal::<GradeArgs>().unwrap_err();
        assert!(matches!(err, JobError::PayloadDecoding(_)));
    }
}
