// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable state owned by this service is limited to idempotency records for
//! fulfilled payments. Production uses an embedded redb file under
//! `DATA_DIR`; tests use the in-memory store.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   idempotency.redb   # fulfilled:<payment_id> -> record + expiry
//! ```

pub mod idempotency;
pub mod redb_store;

pub use idempotency::{
    idempotency_key, IdempotencyRecord, IdempotencyStore, InMemoryIdempotencyStore, StoreError,
    StoreResult,
};
pub use redb_store::RedbIdempotencyStore;
