// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{sync::Arc, time::Duration};

use crate::{
    catalog::Catalog,
    config::ContactConfig,
    fulfillment::FulfillmentService,
    providers::{CheckoutGateway, CheckoutUrls, Mailer},
    storage::IdempotencyStore,
};

/// Shared handles injected into every handler. Provider clients are built
/// once at startup.
#[derive(Clone)]
pub struct AppState {
    pub fulfillment: Arc<FulfillmentService>,
    pub catalog: Arc<Catalog>,
    pub checkout: Arc<dyn CheckoutGateway>,
    pub checkout_urls: CheckoutUrls,
    pub mailer: Arc<dyn Mailer>,
    pub contact: ContactConfig,
    /// Read by readiness checks.
    pub store: Arc<dyn IdempotencyStore>,
    /// Upper bound for checkout and contact provider calls.
    pub call_timeout: Duration,
}
