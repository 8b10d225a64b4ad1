// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbound payment webhooks: signature verification and event decoding.

pub mod event;
pub mod signature;

pub use event::{EventKind, PaymentEvent};
pub use signature::{SignatureError, SignatureVerifier};

/// Header carrying the provider's signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";
