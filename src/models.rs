// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. Field names follow the
//! storefront's camelCase JSON (`printId`, `clientSecret`, `inquiryType`).
//!
//! ## Model Categories
//!
//! - **Webhook**: Acknowledgements returned to the payment provider
//! - **Checkout**: Hosted checkout and embedded payment intents
//! - **Contact**: Contact form relay

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Webhook Models
// =============================================================================

/// Acknowledgement for a webhook delivery.
///
/// Any 200 response stops provider retries. `duplicate` and `error` are
/// omitted unless set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
    /// Reason an otherwise valid order could not be fulfilled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self {
            received: true,
            duplicate: None,
            error: None,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            duplicate: Some(true),
            ..Self::received()
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::received()
        }
    }
}

// =============================================================================
// Checkout Models
// =============================================================================

/// Request to start checkout for one catalog print.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Catalog id of the print being purchased.
    pub print_id: String,
}

/// Hosted checkout page to redirect the buyer to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Client secret for confirming an embedded payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

// =============================================================================
// Contact Models
// =============================================================================

/// Contact form submission.
///
/// Fields default to empty so a missing field is reported as a validation
/// error rather than a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inquiry_type: String,
    #[serde(default)]
    pub message: String,
}

impl ContactRequest {
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.inquiry_type, &self.message]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ContactResponse {
    pub success: bool,
    /// Provider id of the relayed email.
    pub id: String,
}
