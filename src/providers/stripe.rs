// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stripe checkout integration: hosted checkout sessions and payment intents
//! for catalog prints.
//!
//! Prices always come from the catalog entry passed in; the storefront only
//! sends a print id.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::catalog::CatalogEntry;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Metadata key the webhook reads the product id from.
pub const PRINT_ID_METADATA_KEY: &str = "printId";

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Stripe configuration invalid: {0}")]
    Config(String),

    #[error("Stripe request failed: {0}")]
    Request(String),

    #[error("Stripe response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Redirect targets for hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// Success returns to the storefront home with `?success=true`.
    pub fn for_site(site_url: &url::Url) -> Self {
        let mut success = site_url.clone();
        success.set_path("/");
        success.set_query(Some("success=true"));
        Self {
            success_url: success.to_string(),
            cancel_url: site_url.to_string(),
        }
    }
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        entry: &CatalogEntry,
        urls: &CheckoutUrls,
    ) -> Result<CheckoutSession, CheckoutError>;

    async fn create_payment_intent(
        &self,
        entry: &CatalogEntry,
    ) -> Result<PaymentIntent, CheckoutError>;
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    api_base_url: String,
    secret_key: String,
    currency: String,
    http: Client,
}

impl StripeClient {
    pub fn new(secret_key: &str, currency: &str, timeout: Duration) -> Result<Self, CheckoutError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckoutError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            secret_key: secret_key.to_string(),
            currency: currency.to_ascii_lowercase(),
            http,
        })
    }

    async fn post_form<T>(&self, path: &str, form: &[(String, String)]) -> Result<T, CheckoutError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(format!("{}{}", self.api_base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| CheckoutError::Request(format!("POST {path} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Request(format!(
                "POST {path} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CheckoutError::InvalidResponse(format!("POST {path} invalid JSON: {e}")))
    }
}

#[async_trait]
impl CheckoutGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        entry: &CatalogEntry,
        urls: &CheckoutUrls,
    ) -> Result<CheckoutSession, CheckoutError> {
        let form = checkout_session_form(entry, urls, &self.currency);
        let session: CheckoutSessionResponse =
            self.post_form("/v1/checkout/sessions", &form).await?;

        let url = session.url.ok_or_else(|| {
            CheckoutError::InvalidResponse("missing checkout url in response".to_string())
        })?;

        tracing::info!(
            session_id = %session.id,
            print_id = %entry.product_id,
            "checkout session created"
        );
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn create_payment_intent(
        &self,
        entry: &CatalogEntry,
    ) -> Result<PaymentIntent, CheckoutError> {
        let form = payment_intent_form(entry, &self.currency);
        let intent: PaymentIntentResponse = self.post_form("/v1/payment_intents", &form).await?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            CheckoutError::InvalidResponse("missing client_secret in response".to_string())
        })?;

        tracing::info!(
            payment_intent = %intent.id,
            print_id = %entry.product_id,
            "payment intent created"
        );
        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }
}

fn checkout_session_form(
    entry: &CatalogEntry,
    urls: &CheckoutUrls,
    currency: &str,
) -> Vec<(String, String)> {
    let mut form = vec![
        pair("mode", "payment"),
        pair("payment_method_types[0]", "card"),
        pair("line_items[0][quantity]", "1"),
        pair("line_items[0][price_data][currency]", currency),
        pair(
            "line_items[0][price_data][unit_amount]",
            &entry.price_cents.to_string(),
        ),
        pair(
            "line_items[0][price_data][product_data][name]",
            &format!("Print: {}", entry.display_title),
        ),
        pair("success_url", &urls.success_url),
        pair("cancel_url", &urls.cancel_url),
        pair(&format!("metadata[{PRINT_ID_METADATA_KEY}]"), &entry.product_id),
        // Copied onto the payment intent so payment_intent.succeeded carries it too
        pair(
            &format!("payment_intent_data[metadata][{PRINT_ID_METADATA_KEY}]"),
            &entry.product_id,
        ),
    ];
    if let Some(image) = &entry.image_src {
        form.push(pair(
            "line_items[0][price_data][product_data][images][0]",
            image,
        ));
    }
    form
}

fn payment_intent_form(entry: &CatalogEntry, currency: &str) -> Vec<(String, String)> {
    vec![
        pair("amount", &entry.price_cents.to_string()),
        pair("currency", currency),
        pair("automatic_payment_methods[enabled]", "true"),
        pair(&format!("metadata[{PRINT_ID_METADATA_KEY}]"), &entry.product_id),
    ]
}

fn pair(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}
