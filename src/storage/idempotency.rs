// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Idempotency records for fulfilled payments.
//!
//! The payment provider delivers webhooks at least once, so the same payment
//! can arrive several times. A record is written under
//! `fulfilled:<payment_id>` after the download email has been sent; any later
//! delivery that finds it is acknowledged without sending again.
//!
//! Records expire after a retention window. An expired record reads as
//! absent, which is the same as the payment never having been processed.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const KEY_NAMESPACE: &str = "fulfilled";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Marker that a payment has been fulfilled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdempotencyRecord {
    pub payment_id: String,
    pub event_id: String,
    pub sent_at: DateTime<Utc>,
    pub payer_email: String,
    pub product_id: String,
    /// Message id returned by the email provider.
    #[serde(default)]
    pub email_id: Option<String>,
}

/// Store key for a payment.
pub fn idempotency_key(payment_id: &str) -> String {
    format!("{KEY_NAMESPACE}:{payment_id}")
}

/// Persisted form of a record together with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredEntry {
    pub record: IdempotencyRecord,
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(record: IdempotencyRecord, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            record,
            expires_at: expiry_after(now, ttl),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Key-value store used to suppress duplicate fulfillment.
///
/// Access is read-then-conditionally-write with no transaction spanning both;
/// two concurrent deliveries of one payment can both miss the record.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Fetch a live record. Expired records are reported as absent.
    async fn get(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>>;

    /// Insert or replace a record that expires after `ttl`.
    async fn set(&self, key: &str, record: &IdempotencyRecord, ttl: Duration) -> StoreResult<()>;

    /// Delete expired records, returning how many were removed.
    async fn purge_expired(&self) -> StoreResult<usize>;
}

/// Process-local store for tests and single-instance development.
#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn insert_entry(&self, key: &str, entry: StoredEntry) {
        self.entries.write().await.insert(key.to_string(), entry);
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        let now = Utc::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.record.clone()))
    }

    async fn set(&self, key: &str, record: &IdempotencyRecord, ttl: Duration) -> StoreResult<()> {
        let entry = StoredEntry::new(record.clone(), Utc::now(), ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }
}
