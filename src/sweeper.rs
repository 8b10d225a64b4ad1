// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Idempotency Sweeper
//!
//! Background task that reclaims space held by expired idempotency records.
//! Expired records are already invisible to reads, so a missed sweep only
//! costs disk space.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; the loop exits at the next
//! tick boundary once the token is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::IdempotencyStore;

pub struct IdempotencySweeper {
    store: Arc<dyn IdempotencyStore>,
    interval: Duration,
}

impl IdempotencySweeper {
    pub fn new(store: Arc<dyn IdempotencyStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Idempotency sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Idempotency sweeper shutting down");
                    return;
                }
            }

            self.sweep().await;
        }
    }

    /// One pass. Returns the number of records removed.
    pub async fn sweep(&self) -> usize {
        match self.store.purge_expired().await {
            Ok(0) => {
                debug!("Idempotency sweeper: nothing expired");
                0
            }
            Ok(removed) => {
                info!(removed, "Idempotency sweeper: purged expired records");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Idempotency sweeper: purge failed");
                0
            }
        }
    }
}
