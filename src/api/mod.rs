// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    catalog::CatalogEntry,
    error::ErrorBody,
    models::{
        CheckoutRequest, CheckoutResponse, ContactRequest, ContactResponse, PaymentIntentResponse,
        WebhookAck,
    },
    state::AppState,
};

pub mod checkout;
pub mod contact;
pub mod health;
pub mod webhook;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/checkout", post(checkout::create_checkout))
        .route("/payment-intent", post(checkout::create_payment_intent))
        .route("/contact", post(contact::submit_contact));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/webhooks/stripe", post(webhook::stripe_webhook))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        webhook::stripe_webhook,
        checkout::create_checkout,
        checkout::create_payment_intent,
        contact::submit_contact,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            WebhookAck,
            CheckoutRequest,
            CheckoutResponse,
            PaymentIntentResponse,
            ContactRequest,
            ContactResponse,
            CatalogEntry,
            ErrorBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Webhooks", description = "Payment provider callbacks"),
        (name = "Checkout", description = "Checkout sessions and payment intents"),
        (name = "Contact", description = "Contact form relay"),
        (name = "Health", description = "Liveness and readiness checks")
    )
)]
struct ApiDoc;
