// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stripe webhook signature verification.
//!
//! The `stripe-signature` header looks like `t=1614556800,v1=abcdef...`.
//! The signed payload is `{t}.{raw body}`, authenticated with HMAC-SHA256
//! under the endpoint secret. Several `v1` entries may be present while a
//! secret is being rolled; any one of them matching is enough.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::event::PaymentEvent;

type HmacSha256 = Hmac<Sha256>;

/// Future timestamps are accepted up to this much clock skew.
const MAX_CLOCK_DRIFT_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("No stripe-signature header value was provided")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("Timestamp outside the tolerance zone (age {age_secs}s)")]
    TimestampOutsideTolerance { age_secs: i64 },

    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,

    #[error("Invalid event payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug)]
struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

/// Verifies inbound webhook requests against the shared endpoint secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: &str, tolerance: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            tolerance,
        }
    }

    /// Authenticate the request and decode the event it carries.
    ///
    /// `payload` must be the exact bytes received; re-serialized JSON will not
    /// verify.
    pub fn construct_event(
        &self,
        signature_header: Option<&str>,
        payload: &[u8],
    ) -> Result<PaymentEvent, SignatureError> {
        self.verify(signature_header, payload)?;
        PaymentEvent::from_payload(payload)
    }

    pub fn verify(
        &self,
        signature_header: Option<&str>,
        payload: &[u8],
    ) -> Result<(), SignatureError> {
        self.verify_at(signature_header, payload, Utc::now().timestamp())
    }

    fn verify_at(
        &self,
        signature_header: Option<&str>,
        payload: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let header = signature_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SignatureError::MissingHeader)?;
        let parsed = parse_header(header)?;

        let Some(age_secs) = now.checked_sub(parsed.timestamp) else {
            tracing::warn!(timestamp = parsed.timestamp, "webhook timestamp out of range");
            return Err(SignatureError::MalformedHeader);
        };
        let max_age = i64::try_from(self.tolerance.as_secs()).unwrap_or(i64::MAX);
        if age_secs > max_age || age_secs < -MAX_CLOCK_DRIFT_SECS {
            tracing::warn!(age_secs, "webhook timestamp outside tolerance");
            return Err(SignatureError::TimestampOutsideTolerance { age_secs });
        }

        let signed_payload = signed_payload(parsed.timestamp, payload);
        let matched = parsed.signatures.iter().any(|candidate| {
            let Ok(expected) = hex::decode(candidate) else {
                return false;
            };
            let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
                return false;
            };
            mac.update(&signed_payload);
            // verify_slice compares in constant time
            mac.verify_slice(&expected).is_ok()
        });

        if !matched {
            tracing::warn!(timestamp = parsed.timestamp, "webhook signature mismatch");
            return Err(SignatureError::Mismatch);
        }

        tracing::debug!(timestamp = parsed.timestamp, "webhook signature verified");
        Ok(())
    }

    /// Produce a valid header for `payload`, as the provider would.
    #[cfg(test)]
    pub(crate) fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key");
        mac.update(&signed_payload(timestamp, payload));
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={signature}")
    }
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::MalformedHeader)?,
                )
            }
            "v1" => signatures.push(value),
            // v0 and future schemes are ignored
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(ParsedHeader {
            timestamp,
            signatures,
        }),
        _ => Err(SignatureError::MalformedHeader),
    }
}

fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    signed
}
