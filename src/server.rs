// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Server Bootstrap
//!
//! Wires validated configuration into provider clients, the fulfillment
//! service and the HTTP listener.
//!
//! ## Startup order
//!
//! 1. Catalog (built-in or `CATALOG_PATH`)
//! 2. Idempotency store (`DATA_DIR/idempotency.redb`)
//! 3. Provider clients (S3, Resend, Stripe), built once and shared
//! 4. Sweeper task
//! 5. Listener (HTTPS when `TLS_CERT_PATH`/`TLS_KEY_PATH` are set)
//!
//! Any failure before the listener binds aborts startup.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    api::router,
    catalog::{Catalog, CatalogError},
    config::{AppConfig, ConfigError, LogFormat},
    fulfillment::{FulfillmentService, FulfillmentSettings},
    providers::{CheckoutError, CheckoutUrls, MailerError, ResendMailer, S3Presigner, StripeClient},
    state::AppState,
    storage::{IdempotencyStore, RedbIdempotencyStore, StoreError},
    sweeper::IdempotencySweeper,
    webhook::SignatureVerifier,
};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("idempotency store error: {0}")]
    Store(#[from] StoreError),

    #[error("email client error: {0}")]
    Mailer(#[from] MailerError),

    #[error("checkout client error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("invalid bind address {0}")]
    BindAddress(String),

    #[error("TLS setup failed: {0}")]
    Tls(std::io::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn load_catalog(config: &AppConfig) -> Result<Catalog, CatalogError> {
    match &config.catalog_path {
        Some(path) => {
            let catalog = Catalog::load(path)?;
            info!(path = %path.display(), prints = catalog.len(), "Loaded catalog");
            Ok(catalog)
        }
        None => {
            let catalog = Catalog::builtin();
            info!(prints = catalog.len(), "Using built-in catalog");
            Ok(catalog)
        }
    }
}

/// Construct every long-lived component from configuration.
pub async fn build_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let catalog = Arc::new(load_catalog(config)?);

    let db_path = config.idempotency_db_path();
    let store: Arc<dyn IdempotencyStore> = Arc::new(RedbIdempotencyStore::open(&db_path)?);
    info!(path = %db_path.display(), "Opened idempotency store");

    let minter = Arc::new(S3Presigner::from_config(&config.storage).await);
    let mailer = Arc::new(ResendMailer::new(
        config.resend_api_key.expose(),
        config.external_call_timeout,
    )?);
    let checkout = Arc::new(StripeClient::new(
        config.stripe_secret_key.expose(),
        &config.currency,
        config.external_call_timeout,
    )?);

    let fulfillment = FulfillmentService::new(
        SignatureVerifier::new(config.webhook_secret.expose(), config.webhook_tolerance),
        store.clone(),
        catalog.clone(),
        minter,
        mailer.clone(),
        FulfillmentSettings::from_config(config),
    );

    Ok(AppState {
        fulfillment: Arc::new(fulfillment),
        catalog,
        checkout,
        checkout_urls: CheckoutUrls::for_site(&config.site_url),
        mailer,
        contact: config.contact.clone(),
        store,
        call_timeout: config.external_call_timeout,
    })
}

fn bind_address(config: &AppConfig) -> Result<SocketAddr, StartupError> {
    let raw = format!("{}:{}", config.host, config.port);
    raw.parse().map_err(|_| StartupError::BindAddress(raw))
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Run the service until a shutdown signal arrives.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    // Install the ring crypto provider for rustls before any TLS use.
    // Err means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    if !config.webhook_secret_looks_valid() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET does not start with 'whsec_' - may be invalid");
    }

    let state = build_state(&config).await?;
    let addr = bind_address(&config)?;

    let shutdown = CancellationToken::new();
    let sweeper = IdempotencySweeper::new(state.store.clone(), config.sweep_interval);
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = router(state);

    let handle = axum_server::Handle::new();
    {
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, draining connections");
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    let served = match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(StartupError::Tls)?;
            info!("Print fulfillment listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            info!("Print fulfillment listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    shutdown.cancel();
    let _ = sweeper_task.await;
    info!("Server stopped");
    served.map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::base_env;
    use crate::storage::idempotency::tests::sample_record;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        let mut env: std::collections::HashMap<String, String> = base_env()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.insert("DATA_DIR".to_string(), dir.display().to_string());
        env.insert("S3_VERIFY_OBJECT_EXISTS".to_string(), "false".to_string());
        AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap()
    }

    #[tokio::test]
    async fn build_state_wires_persistent_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let state = build_state(&config).await.unwrap();
        assert_eq!(state.catalog.len(), 3);
        assert_eq!(state.checkout_urls.cancel_url, config.site_url.to_string());

        state
            .store
            .set("fulfilled:pi_1", &sample_record("pi_1"), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(config.idempotency_db_path().exists());
    }

    #[tokio::test]
    async fn bad_catalog_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.json");
        std::fs::write(&catalog_path, "[{\"id\":\"1\"}]").unwrap();

        let mut config = config_in(dir.path());
        config.catalog_path = Some(catalog_path);
        assert!(matches!(
            build_state(&config).await,
            Err(StartupError::Catalog(_))
        ));
    }

    #[test]
    fn bind_address_rejects_garbage_host() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.host = "not a host".to_string();
        assert!(matches!(
            bind_address(&config),
            Err(StartupError::BindAddress(_))
        ));
        config.host = "127.0.0.1".to_string();
        assert_eq!(bind_address(&config).unwrap().port(), config.port);
    }
}
