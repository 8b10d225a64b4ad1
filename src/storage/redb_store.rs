// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded idempotency database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `idempotency`: key (`fulfilled:<payment_id>`) → serialized entry
//!   (record + expiry, JSON bytes)

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::idempotency::{
    IdempotencyRecord, IdempotencyStore, StoreError, StoreResult, StoredEntry,
};

const IDEMPOTENCY: TableDefinition<&str, &[u8]> = TableDefinition::new("idempotency");

/// Durable idempotency store.
///
/// redb calls block, so every operation runs on the blocking pool.
#[derive(Clone)]
pub struct RedbIdempotencyStore {
    db: Arc<Database>,
}

impl RedbIdempotencyStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IDEMPOTENCY)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_blocking(db: &Database, key: &str) -> StoreResult<Option<StoredEntry>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(IDEMPOTENCY)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn set_blocking(db: &Database, key: &str, entry: &StoredEntry) -> StoreResult<()> {
        let json = serde_json::to_vec(entry)?;
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(IDEMPOTENCY)?;
            table.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn purge_blocking(db: &Database) -> StoreResult<usize> {
        let now = Utc::now();
        let write_txn = db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(IDEMPOTENCY)?;
            let mut expired = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                // Unreadable entries are dropped along with expired ones
                let stale = serde_json::from_slice::<StoredEntry>(value.value())
                    .map(|entry| entry.is_expired(now))
                    .unwrap_or(true);
                if stale {
                    expired.push(key.value().to_string());
                }
            }
            for key in &expired {
                table.remove(key.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    async fn run_blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl IdempotencyStore for RedbIdempotencyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        let key = key.to_string();
        let entry = self
            .run_blocking(move |db| Self::get_blocking(db, &key))
            .await?;
        let now = Utc::now();
        Ok(entry
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.record))
    }

    async fn set(&self, key: &str, record: &IdempotencyRecord, ttl: Duration) -> StoreResult<()> {
        let key = key.to_string();
        let entry = StoredEntry::new(record.clone(), Utc::now(), ttl);
        self.run_blocking(move |db| Self::set_blocking(db, &key, &entry))
            .await
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        self.run_blocking(Self::purge_blocking).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::idempotency::tests::sample_record;
    use chrono::TimeDelta;

    fn temp_store() -> (RedbIdempotencyStore, tempfile::TempDir) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RedbIdempotencyStore::open(&dir.path().join("idempotency.redb")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn set_and_get_record() {
        let (store, _dir) = temp_store();
        let record = sample_record("pi_1");
        store
            .set("fulfilled:pi_1", &record, Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(store.get("fulfilled:pi_1").await.unwrap(), Some(record));
        assert_eq!(store.get("fulfilled:pi_missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("idempotency.redb");
        {
            let store = RedbIdempotencyStore::open(&path).unwrap();
            store
                .set("fulfilled:pi_1", &sample_record("pi_1"), Duration::from_secs(3600))
                .await
                .unwrap();
        }
        let reopened = RedbIdempotencyStore::open(&path).unwrap();
        assert!(reopened.get("fulfilled:pi_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent_and_get_purged() {
        let (store, _dir) = temp_store();
        let stale = StoredEntry::new(
            sample_record("pi_old"),
            Utc::now() - TimeDelta::days(40),
            Duration::from_secs(30 * 86_400),
        );
        RedbIdempotencyStore::set_blocking(&store.db, "fulfilled:pi_old", &stale).unwrap();
        store
            .set("fulfilled:pi_new", &sample_record("pi_new"), Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(store.get("fulfilled:pi_old").await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.purge_expired().await.unwrap(), 0);
        assert!(store.get("fulfilled:pi_new").await.unwrap().is_some());
    }
}
