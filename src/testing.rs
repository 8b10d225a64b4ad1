// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process fakes for the provider traits, shared by unit and router tests.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    catalog::{Catalog, CatalogEntry},
    config::ContactConfig,
    fulfillment::{FulfillmentService, FulfillmentSettings},
    providers::{
        CheckoutError, CheckoutGateway, CheckoutSession, CheckoutUrls, DownloadUrlMinter,
        EmailMessage, Mailer, MailerError, PaymentIntent, PresignError, SentEmail,
        SignedDownloadUrl,
    },
    state::AppState,
    storage::{
        IdempotencyRecord, IdempotencyStore, InMemoryIdempotencyStore, StoreError, StoreResult,
    },
    webhook::SignatureVerifier,
};

pub const TEST_SECRET: &str = "whsec_test_secret_for_unit_tests_only";

/// A `checkout.session.completed` event for one print.
pub fn checkout_event(payment_id: &str, product_id: Option<&str>, email: Option<&str>) -> Value {
    let mut object = json!({
        "id": format!("cs_test_{payment_id}"),
        "object": "checkout.session",
        "payment_intent": payment_id,
        "payment_status": "paid",
        "metadata": {},
    });
    if let Some(product_id) = product_id {
        object["metadata"]["printId"] = json!(product_id);
    }
    if let Some(email) = email {
        object["customer_details"] = json!({ "email": email });
    }
    json!({
        "id": format!("evt_{payment_id}"),
        "type": "checkout.session.completed",
        "data": { "object": object },
    })
}

/// Serialize `event` and sign it as the provider would right now.
pub fn signed(verifier: &SignatureVerifier, event: &Value) -> (String, Vec<u8>) {
    let body = event.to_string().into_bytes();
    let header = verifier.sign(&body, Utc::now().timestamp());
    (header, body)
}

#[derive(Default)]
pub struct FakeMinter {
    fail: bool,
    delay: Option<Duration>,
    minted: Mutex<Vec<String>>,
}

impl FakeMinter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn url_for(storage_key: &str) -> String {
        format!(
            "https://prints.test/{}?X-Amz-Signature=fake",
            storage_key.replace(' ', "%20")
        )
    }

    pub fn minted(&self) -> Vec<String> {
        self.minted.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadUrlMinter for FakeMinter {
    async fn presign(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> Result<SignedDownloadUrl, PresignError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(PresignError::Backend("bucket unavailable".to_string()));
        }
        self.minted.lock().unwrap().push(storage_key.to_string());
        Ok(SignedDownloadUrl {
            url: Self::url_for(storage_key),
            storage_key: storage_key.to_string(),
            expires_in,
        })
    }
}

/// Records accepted messages. Can be told to reject the first N sends.
#[derive(Default)]
pub struct RecordingMailer {
    failures_left: AtomicUsize,
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SentEmail, MailerError> {
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(MailerError::Rejected {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(SentEmail {
            id: format!("email_{}", sent.len()),
        })
    }
}

/// A store whose every call fails.
pub struct FailingStore;

#[async_trait]
impl IdempotencyStore for FailingStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        Err(StoreError::Task("store offline".to_string()))
    }

    async fn set(
        &self,
        _key: &str,
        _record: &IdempotencyRecord,
        _ttl: Duration,
    ) -> StoreResult<()> {
        Err(StoreError::Task("store offline".to_string()))
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        Err(StoreError::Task("store offline".to_string()))
    }
}

/// Reads succeed against an empty store; writes fail.
pub struct ReadOnlyStore;

#[async_trait]
impl IdempotencyStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<IdempotencyRecord>> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &str,
        _record: &IdempotencyRecord,
        _ttl: Duration,
    ) -> StoreResult<()> {
        Err(StoreError::Task("disk full".to_string()))
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        Ok(0)
    }
}

#[derive(Default)]
pub struct FakeCheckout {
    fail: bool,
    requests: Mutex<Vec<(String, u64)>>,
}

impl FakeCheckout {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(product_id, price_cents)` of every request made.
    pub fn requests(&self) -> Vec<(String, u64)> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, entry: &CatalogEntry) -> Result<(), CheckoutError> {
        if self.fail {
            return Err(CheckoutError::Request(
                "POST /v1/checkout/sessions returned 500".to_string(),
            ));
        }
        self.requests
            .lock()
            .unwrap()
            .push((entry.product_id.clone(), entry.price_cents));
        Ok(())
    }
}

#[async_trait]
impl CheckoutGateway for FakeCheckout {
    async fn create_checkout_session(
        &self,
        entry: &CatalogEntry,
        urls: &CheckoutUrls,
    ) -> Result<CheckoutSession, CheckoutError> {
        self.record(entry)?;
        Ok(CheckoutSession {
            id: format!("cs_test_{}", entry.product_id),
            url: format!(
                "https://checkout.test/pay/cs_test_{}?return={}",
                entry.product_id, urls.success_url
            ),
        })
    }

    async fn create_payment_intent(
        &self,
        entry: &CatalogEntry,
    ) -> Result<PaymentIntent, CheckoutError> {
        self.record(entry)?;
        Ok(PaymentIntent {
            id: format!("pi_test_{}", entry.product_id),
            client_secret: format!("pi_test_{}_secret_abc", entry.product_id),
        })
    }
}

/// Fakes wired into an [`AppState`], kept for assertions.
pub struct TestApp {
    pub state: AppState,
    pub verifier: SignatureVerifier,
    pub store: Arc<dyn IdempotencyStore>,
    pub minter: Arc<FakeMinter>,
    pub mailer: Arc<RecordingMailer>,
    pub checkout: Arc<FakeCheckout>,
}

pub struct TestAppBuilder {
    store: Arc<dyn IdempotencyStore>,
    minter: FakeMinter,
    mailer: RecordingMailer,
    checkout: FakeCheckout,
    contact_to: Option<String>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            store: Arc::new(InMemoryIdempotencyStore::new()),
            minter: FakeMinter::default(),
            mailer: RecordingMailer::default(),
            checkout: FakeCheckout::default(),
            contact_to: Some("owner@example.com".to_string()),
        }
    }
}

impl TestAppBuilder {
    pub fn store(mut self, store: Arc<dyn IdempotencyStore>) -> Self {
        self.store = store;
        self
    }

    pub fn minter(mut self, minter: FakeMinter) -> Self {
        self.minter = minter;
        self
    }

    pub fn mailer(mut self, mailer: RecordingMailer) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn checkout(mut self, checkout: FakeCheckout) -> Self {
        self.checkout = checkout;
        self
    }

    pub fn contact_to(mut self, to: Option<&str>) -> Self {
        self.contact_to = to.map(str::to_string);
        self
    }

    pub fn build(self) -> TestApp {
        let verifier = SignatureVerifier::new(TEST_SECRET, Duration::from_secs(300));
        let catalog = Arc::new(Catalog::builtin());
        let minter = Arc::new(self.minter);
        let mailer = Arc::new(self.mailer);
        let checkout = Arc::new(self.checkout);

        let fulfillment = FulfillmentService::new(
            verifier.clone(),
            self.store.clone(),
            catalog.clone(),
            minter.clone(),
            mailer.clone(),
            FulfillmentSettings {
                from: "Prints <prints@example.com>".to_string(),
                download_url_ttl: Duration::from_secs(43_200),
                idempotency_ttl: Duration::from_secs(30 * 86_400),
                call_timeout: Duration::from_millis(200),
            },
        );

        let state = AppState {
            fulfillment: Arc::new(fulfillment),
            catalog,
            checkout: checkout.clone(),
            checkout_urls: CheckoutUrls {
                success_url: "https://prints.example.com/?success=true".to_string(),
                cancel_url: "https://prints.example.com/".to_string(),
            },
            mailer: mailer.clone(),
            contact: ContactConfig {
                to: self.contact_to,
                from: "Contact Form <onboarding@resend.dev>".to_string(),
                reply_to: None,
            },
            store: self.store.clone(),
            call_timeout: Duration::from_millis(200),
        };

        TestApp {
            state,
            verifier,
            store: self.store,
            minter,
            mailer,
            checkout,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::default().build()
}
