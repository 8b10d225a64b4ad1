// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payment Fulfillment
//!
//! Turns a verified payment event into a delivered download link.
//!
//! ## Pipeline
//!
//! ```text
//! verify ─▶ dispatch ─▶ dedup read ─▶ catalog ─▶ presign ─▶ email ─▶ dedup write
//!              │            │            │                   │
//!           Ignored     Duplicate   Unfulfillable          Failed
//! ```
//!
//! Every outcome except `Failed` is acknowledged with 200 so the provider
//! stops retrying. Storage, email and store failures answer 500 and leave no
//! idempotency record, so the provider's retry can finish the job.
//!
//! The record is written only after the email is accepted. A crash between
//! the two can send a second email on retry, but never loses one. Two
//! concurrent deliveries of the same payment may both pass the dedup read;
//! no lock guards against that.

use std::{future::Future, sync::Arc, time::Duration};

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::{
    catalog::Catalog,
    config::AppConfig,
    email,
    error::ApiError,
    models::WebhookAck,
    providers::{DownloadUrlMinter, Mailer, MailerError, PresignError},
    storage::{idempotency_key, IdempotencyRecord, IdempotencyStore, StoreError},
    webhook::{EventKind, PaymentEvent, SignatureError, SignatureVerifier},
};

/// Acknowledgement text for an order whose print id is unknown.
pub const INVALID_PRINT_ID: &str = "Invalid printId";
/// Acknowledgement text for an order without a buyer email.
pub const MISSING_EMAIL: &str = "Missing customer email";

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    #[error("Webhook Error: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("idempotency store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("failed to mint download link: {0}")]
    Storage(#[from] PresignError),

    #[error("failed to send fulfillment email: {0}")]
    Notifier(#[from] MailerError),

    #[error("{step} timed out after {}s", .timeout.as_secs())]
    Timeout {
        step: &'static str,
        timeout: Duration,
    },
}

impl FulfillmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Storage(_) | Self::Notifier(_) | Self::Timeout { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the provider should redeliver the event.
    pub fn should_retry(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidSignature(_) => "invalid_signature",
            Self::Store(_) => "idempotency_store_error",
            Self::Storage(_) => "storage_error",
            Self::Notifier(_) => "email_error",
            Self::Timeout { .. } => "timeout",
        }
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        match &err {
            FulfillmentError::InvalidSignature(_) => ApiError::bad_request(err.to_string()),
            // Internal detail stays in the logs
            _ => ApiError::internal(format!(
                "Fulfillment failed ({}), retry later",
                err.error_code()
            )),
        }
    }
}

/// Terminal, acknowledged states of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Ignored { event_type: String },
    Duplicate { payment_id: String },
    Unfulfillable {
        payment_id: String,
        product_id: Option<String>,
    },
    NoEmail { payment_id: String },
    Delivered {
        payment_id: String,
        email_id: String,
    },
}

impl FulfillmentOutcome {
    pub fn ack(&self) -> WebhookAck {
        match self {
            Self::Ignored { .. } | Self::Delivered { .. } => WebhookAck::received(),
            Self::Duplicate { .. } => WebhookAck::duplicate(),
            Self::Unfulfillable { .. } => WebhookAck::with_error(INVALID_PRINT_ID),
            Self::NoEmail { .. } => WebhookAck::with_error(MISSING_EMAIL),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FulfillmentSettings {
    pub from: String,
    pub download_url_ttl: Duration,
    pub idempotency_ttl: Duration,
    pub call_timeout: Duration,
}

impl FulfillmentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            from: config.fulfillment_from.clone(),
            download_url_ttl: config.download_url_ttl,
            idempotency_ttl: config.idempotency_ttl,
            call_timeout: config.external_call_timeout,
        }
    }
}

/// Coordinates one fulfillment per inbound event. Holds no per-request state.
pub struct FulfillmentService {
    verifier: SignatureVerifier,
    store: Arc<dyn IdempotencyStore>,
    catalog: Arc<Catalog>,
    minter: Arc<dyn DownloadUrlMinter>,
    mailer: Arc<dyn Mailer>,
    settings: FulfillmentSettings,
}

impl FulfillmentService {
    pub fn new(
        verifier: SignatureVerifier,
        store: Arc<dyn IdempotencyStore>,
        catalog: Arc<Catalog>,
        minter: Arc<dyn DownloadUrlMinter>,
        mailer: Arc<dyn Mailer>,
        settings: FulfillmentSettings,
    ) -> Self {
        Self {
            verifier,
            store,
            catalog,
            minter,
            mailer,
            settings,
        }
    }

    /// Verify a raw delivery and run it through the pipeline.
    pub async fn handle(
        &self,
        signature_header: Option<&str>,
        payload: &[u8],
    ) -> Result<FulfillmentOutcome, FulfillmentError> {
        let event = self.verifier.construct_event(signature_header, payload)?;
        self.fulfill(event).await
    }

    /// Run an already verified event through the pipeline.
    pub async fn fulfill(
        &self,
        event: PaymentEvent,
    ) -> Result<FulfillmentOutcome, FulfillmentError> {
        if let EventKind::Other(event_type) = &event.kind {
            info!(event_id = %event.event_id, event_type = %event_type, "ignoring webhook event");
            return Ok(FulfillmentOutcome::Ignored {
                event_type: event_type.clone(),
            });
        }

        let payment_id = event.payment_id.clone();
        let key = idempotency_key(&payment_id);

        if self.bounded("idempotency read", self.store.get(&key)).await?.is_some() {
            info!(
                event_id = %event.event_id,
                payment_id = %payment_id,
                "payment already fulfilled"
            );
            return Ok(FulfillmentOutcome::Duplicate { payment_id });
        }

        let entry = event
            .product_id
            .as_deref()
            .and_then(|id| self.catalog.find_by_product_id(id));
        let Some(entry) = entry else {
            error!(
                event_id = %event.event_id,
                payment_id = %payment_id,
                product_id = ?event.product_id,
                "unfulfillable order: product not in catalog"
            );
            return Ok(FulfillmentOutcome::Unfulfillable {
                payment_id,
                product_id: event.product_id,
            });
        };

        let Some(payer_email) = event.payer_email.as_deref() else {
            error!(
                event_id = %event.event_id,
                payment_id = %payment_id,
                product_id = %entry.product_id,
                "unfulfillable order: no customer email"
            );
            return Ok(FulfillmentOutcome::NoEmail { payment_id });
        };

        let download = self
            .bounded(
                "download link",
                self.minter
                    .presign(&entry.storage_key, self.settings.download_url_ttl),
            )
            .await?;

        let message = email::fulfillment_email(
            &self.settings.from,
            payer_email,
            &entry.display_title,
            &download,
        );
        let sent = self
            .bounded("email send", self.mailer.send(&message))
            .await?;

        info!(
            event_id = %event.event_id,
            payment_id = %payment_id,
            product_id = %entry.product_id,
            email_id = %sent.id,
            "download email sent"
        );

        let record = IdempotencyRecord {
            payment_id: payment_id.clone(),
            event_id: event.event_id.clone(),
            sent_at: Utc::now(),
            payer_email: payer_email.to_string(),
            product_id: entry.product_id.clone(),
            email_id: Some(sent.id.clone()),
        };
        // The buyer already has the email; failing here would only cause a resend.
        if let Err(err) = self
            .bounded(
                "idempotency write",
                self.store.set(&key, &record, self.settings.idempotency_ttl),
            )
            .await
        {
            error!(
                payment_id = %payment_id,
                error = %err,
                "failed to record fulfilled payment; a redelivery will email again"
            );
        }

        Ok(FulfillmentOutcome::Delivered {
            payment_id,
            email_id: sent.id,
        })
    }

    async fn bounded<T, E, F>(&self, step: &'static str, call: F) -> Result<T, FulfillmentError>
    where
        F: Future<Output = Result<T, E>>,
        FulfillmentError: From<E>,
    {
        match tokio::time::timeout(self.settings.call_timeout, call).await {
            Ok(result) => result.map_err(|e| {
                let err = FulfillmentError::from(e);
                warn!(step, error = %err, "fulfillment step failed");
                err
            }),
            Err(_) => {
                warn!(
                    step,
                    timeout_secs = self.settings.call_timeout.as_secs(),
                    "fulfillment step timed out"
                );
                Err(FulfillmentError::Timeout {
                    step,
                    timeout: self.settings.call_timeout,
                })
            }
        }
    }
}
