// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::future::Future;

use axum::{extract::State, Json};
use tracing::error;

use crate::{
    catalog::CatalogEntry,
    error::ApiError,
    models::{CheckoutRequest, CheckoutResponse, PaymentIntentResponse},
    providers::{CheckoutError, CheckoutGateway},
    state::AppState,
};

fn lookup<'a>(state: &'a AppState, print_id: &str) -> Result<&'a CatalogEntry, ApiError> {
    state
        .catalog
        .find_by_product_id(print_id)
        .ok_or_else(|| ApiError::not_found(format!("Print {print_id} not found")))
}

async fn call_provider<T>(
    state: &AppState,
    call: impl Future<Output = Result<T, CheckoutError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(state.call_timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            error!(error = %err, "checkout provider call failed");
            Err(ApiError::bad_gateway("Payment provider unavailable"))
        }
        Err(_) => {
            error!(timeout_secs = state.call_timeout.as_secs(), "checkout provider call timed out");
            Err(ApiError::bad_gateway("Payment provider unavailable"))
        }
    }
}

/// Start hosted checkout for a print. Pricing comes from the catalog.
#[utoipa::path(
    post,
    path = "/v1/checkout",
    request_body = CheckoutRequest,
    tag = "Checkout",
    responses(
        (status = 200, body = CheckoutResponse),
        (status = 404, description = "Unknown print", body = crate::error::ErrorBody),
        (status = 502, description = "Payment provider failed", body = crate::error::ErrorBody)
    )
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let entry = lookup(&state, &request.print_id)?;
    let session = call_provider(
        &state,
        state
            .checkout
            .create_checkout_session(entry, &state.checkout_urls),
    )
    .await?;
    Ok(Json(CheckoutResponse { url: session.url }))
}

/// Create a payment intent for an embedded payment form.
#[utoipa::path(
    post,
    path = "/v1/payment-intent",
    request_body = CheckoutRequest,
    tag = "Checkout",
    responses(
        (status = 200, body = PaymentIntentResponse),
        (status = 404, description = "Unknown print", body = crate::error::ErrorBody),
        (status = 502, description = "Payment provider failed", body = crate::error::ErrorBody)
    )
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let entry = lookup(&state, &request.print_id)?;
    let intent = call_provider(&state, state.checkout.create_payment_intent(entry)).await?;
    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}
