// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use tracing::{error, warn};

use crate::{
    error::ApiError,
    fulfillment::FulfillmentError,
    models::WebhookAck,
    state::AppState,
    webhook::SIGNATURE_HEADER,
};

/// Payment provider webhook.
///
/// The body is taken as raw bytes; the signature covers the exact payload.
#[utoipa::path(
    post,
    path = "/webhooks/stripe",
    tag = "Webhooks",
    request_body(content = String, description = "Raw signed event payload", content_type = "application/json"),
    params(
        ("stripe-signature" = String, Header, description = "Provider signature header")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Signature or payload invalid", body = crate::error::ErrorBody),
        (status = 500, description = "Transient failure, provider should retry", body = crate::error::ErrorBody)
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match state.fulfillment.handle(signature, &body).await {
        Ok(outcome) => Ok(Json(outcome.ack())),
        Err(err) => {
            log_failure(&err);
            Err(err.into())
        }
    }
}

fn log_failure(err: &FulfillmentError) {
    if err.should_retry() {
        error!(error_code = err.error_code(), error = %err, "webhook fulfillment failed");
    } else {
        warn!(error_code = err.error_code(), error = %err, "webhook rejected");
    }
}
