// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified payment events.
//!
//! Only the fields fulfillment needs are lifted out of the provider payload.
//! The payload shape differs between checkout sessions and payment intents,
//! so each field is resolved through an ordered list of JSON pointers into
//! `data.object`; the first present, non-empty string wins.

use serde::Deserialize;
use serde_json::Value;

use super::signature::SignatureError;

/// Event types that mean "the buyer has paid".
const PAYMENT_SUCCEEDED_TYPES: [&str; 2] =
    ["checkout.session.completed", "payment_intent.succeeded"];

/// Where the payment identifier lives. Checkout sessions reference their
/// payment intent, so both event types for one purchase share an id.
const PAYMENT_ID_SOURCES: [&str; 2] = ["/payment_intent", "/id"];

const PRODUCT_ID_SOURCES: [&str; 3] = [
    "/metadata/printId",
    "/metadata/productId",
    "/metadata/product_id",
];

/// Candidate locations of the buyer's email, in priority order.
pub const PAYER_EMAIL_SOURCES: [&str; 5] = [
    "/customer_details/email",
    "/customer_email",
    "/receipt_email",
    "/billing_details/email",
    "/metadata/email",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PaymentSucceeded,
    /// Any other event type, kept verbatim for logging.
    Other(String),
}

impl EventKind {
    pub fn from_event_type(event_type: &str) -> Self {
        if PAYMENT_SUCCEEDED_TYPES.contains(&event_type) {
            Self::PaymentSucceeded
        } else {
            Self::Other(event_type.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub event_id: String,
    pub kind: EventKind,
    /// Empty only for events that are not payments.
    pub payment_id: String,
    pub payer_email: Option<String>,
    pub product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: Value,
}

impl PaymentEvent {
    pub fn from_payload(payload: &[u8]) -> Result<Self, SignatureError> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| SignatureError::MalformedPayload(e.to_string()))?;

        let kind = EventKind::from_event_type(&raw.event_type);
        let object = &raw.data.object;
        let payment_id = first_string(object, &PAYMENT_ID_SOURCES);

        let payment_id = match (&kind, payment_id) {
            (_, Some(id)) => id,
            (EventKind::PaymentSucceeded, None) => {
                return Err(SignatureError::MalformedPayload(format!(
                    "event {} carries no payment id",
                    raw.id
                )))
            }
            (EventKind::Other(_), None) => String::new(),
        };

        Ok(Self {
            event_id: raw.id,
            kind,
            payment_id,
            payer_email: resolve_payer_email(object),
            product_id: first_string(object, &PRODUCT_ID_SOURCES),
        })
    }
}

/// Resolve the buyer's email from the event object using
/// [`PAYER_EMAIL_SOURCES`].
pub fn resolve_payer_email(object: &Value) -> Option<String> {
    first_string(object, &PAYER_EMAIL_SOURCES)
}

fn first_string(object: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| {
        object
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}
