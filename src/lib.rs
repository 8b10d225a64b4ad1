// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Print Fulfillment - Storefront Backend Service
//!
//! Receives signed payment webhooks for a digital-print storefront and
//! delivers a time-limited download link to the buyer exactly once per
//! payment. Also hosts checkout creation and the contact form relay.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `webhook` - Signature verification and event decoding
//! - `fulfillment` - The verify, dedup, resolve, mint, notify pipeline
//! - `providers` - Stripe, Resend and S3 clients behind traits
//! - `storage` - Idempotency records (redb)

pub mod api;
pub mod catalog;
pub mod config;
pub mod email;
pub mod error;
pub mod fulfillment;
pub mod models;
pub mod providers;
pub mod server;
pub mod state;
pub mod storage;
pub mod sweeper;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;
