// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All configuration is read from the environment once at startup and
//! validated into an [`AppConfig`]. Request handlers only ever see the
//! validated value; a missing required variable aborts startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `STRIPE_WEBHOOK_SECRET` | Webhook signing secret (`whsec_...`) | Required |
//! | `STRIPE_SECRET_KEY` | Stripe API key for checkout | Required |
//! | `RESEND_API_KEY` | Resend API key | Required |
//! | `FULFILLMENT_FROM_EMAIL` | Sender of download emails | Required |
//! | `CONTACT_TO_EMAIL` | Recipient of contact inquiries | Contact disabled |
//! | `CONTACT_FROM_EMAIL` | Sender of contact inquiries | `Contact Form <onboarding@resend.dev>` |
//! | `CONTACT_REPLY_TO` | Reply-to on contact inquiries | None |
//! | `SITE_URL` | Public storefront URL (checkout redirects) | Required |
//! | `S3_BUCKET` | Bucket holding the print files | Required |
//! | `S3_REGION` | Bucket region | Required |
//! | `S3_ACCESS_KEY_ID` | Storage access key | Required |
//! | `S3_SECRET_ACCESS_KEY` | Storage secret key | Required |
//! | `S3_ENDPOINT` | Custom S3-compatible endpoint | AWS |
//! | `S3_FORCE_PATH_STYLE` | Path-style addressing | `false` |
//! | `S3_VERIFY_OBJECT_EXISTS` | HEAD the object before presigning | `true` |
//! | `DATA_DIR` | Directory for the idempotency database | `/data` |
//! | `CATALOG_PATH` | JSON catalog file | Built-in catalog |
//! | `CHECKOUT_CURRENCY` | Checkout currency | `usd` |
//! | `DOWNLOAD_URL_TTL_SECS` | Download link lifetime | `43200` |
//! | `IDEMPOTENCY_TTL_SECS` | Idempotency record retention | `2592000` |
//! | `WEBHOOK_TOLERANCE_SECS` | Max webhook timestamp age | `300` |
//! | `EXTERNAL_CALL_TIMEOUT_SECS` | Timeout per provider call | `10` |
//! | `SWEEP_INTERVAL_SECS` | Expired record purge interval | `3600` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both or neither | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    fmt,
    path::PathBuf,
    time::Duration,
};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const STRIPE_WEBHOOK_SECRET_ENV: &str = "STRIPE_WEBHOOK_SECRET";
pub const STRIPE_SECRET_KEY_ENV: &str = "STRIPE_SECRET_KEY";
pub const RESEND_API_KEY_ENV: &str = "RESEND_API_KEY";
pub const FULFILLMENT_FROM_EMAIL_ENV: &str = "FULFILLMENT_FROM_EMAIL";
pub const CONTACT_TO_EMAIL_ENV: &str = "CONTACT_TO_EMAIL";
pub const CONTACT_FROM_EMAIL_ENV: &str = "CONTACT_FROM_EMAIL";
pub const CONTACT_REPLY_TO_ENV: &str = "CONTACT_REPLY_TO";
pub const SITE_URL_ENV: &str = "SITE_URL";
pub const S3_BUCKET_ENV: &str = "S3_BUCKET";
pub const S3_REGION_ENV: &str = "S3_REGION";
pub const S3_ACCESS_KEY_ID_ENV: &str = "S3_ACCESS_KEY_ID";
pub const S3_SECRET_ACCESS_KEY_ENV: &str = "S3_SECRET_ACCESS_KEY";
pub const S3_ENDPOINT_ENV: &str = "S3_ENDPOINT";
pub const S3_FORCE_PATH_STYLE_ENV: &str = "S3_FORCE_PATH_STYLE";
pub const S3_VERIFY_OBJECT_EXISTS_ENV: &str = "S3_VERIFY_OBJECT_EXISTS";

/// Environment variable name for the data directory path.
///
/// The idempotency database lives at `<DATA_DIR>/idempotency.redb`.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const CATALOG_PATH_ENV: &str = "CATALOG_PATH";
pub const CHECKOUT_CURRENCY_ENV: &str = "CHECKOUT_CURRENCY";
pub const DOWNLOAD_URL_TTL_ENV: &str = "DOWNLOAD_URL_TTL_SECS";
pub const IDEMPOTENCY_TTL_ENV: &str = "IDEMPOTENCY_TTL_SECS";
pub const WEBHOOK_TOLERANCE_ENV: &str = "WEBHOOK_TOLERANCE_SECS";
pub const EXTERNAL_CALL_TIMEOUT_ENV: &str = "EXTERNAL_CALL_TIMEOUT_SECS";
pub const SWEEP_INTERVAL_ENV: &str = "SWEEP_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_CONTACT_FROM: &str = "Contact Form <onboarding@resend.dev>";
const DEFAULT_CURRENCY: &str = "usd";
const IDEMPOTENCY_DB_FILE: &str = "idempotency.redb";

/// Download links stay valid for 12 hours.
pub const DEFAULT_DOWNLOAD_URL_TTL: Duration = Duration::from_secs(12 * 60 * 60);
/// SigV4 presigned URLs cannot outlive 7 days.
pub const MAX_DOWNLOAD_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Fulfilled payments are remembered for 30 days.
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
pub const DEFAULT_WEBHOOK_TOLERANCE: Duration = Duration::from_secs(300);
pub const DEFAULT_EXTERNAL_CALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A configuration value that must never be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: Secret,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub verify_object_exists: bool,
}

#[derive(Debug, Clone)]
pub struct ContactConfig {
    /// `None` disables the contact endpoint.
    pub to: Option<String>,
    pub from: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub webhook_secret: Secret,
    pub stripe_secret_key: Secret,
    pub resend_api_key: Secret,
    pub fulfillment_from: String,
    pub contact: ContactConfig,
    pub site_url: url::Url,
    pub storage: StorageConfig,
    pub data_dir: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub currency: String,
    pub download_url_ttl: Duration,
    pub idempotency_ttl: Duration,
    pub webhook_tolerance: Duration,
    pub external_call_timeout: Duration,
    pub sweep_interval: Duration,
    pub tls: Option<TlsConfig>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let port = match env.optional(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let webhook_secret = env.required(STRIPE_WEBHOOK_SECRET_ENV)?;

        let download_url_ttl = env.seconds(DOWNLOAD_URL_TTL_ENV, DEFAULT_DOWNLOAD_URL_TTL)?;
        if download_url_ttl > MAX_DOWNLOAD_URL_TTL {
            return Err(ConfigError::Invalid {
                name: DOWNLOAD_URL_TTL_ENV,
                reason: format!("must be at most {} seconds", MAX_DOWNLOAD_URL_TTL.as_secs()),
            });
        }

        let site_url = env.required(SITE_URL_ENV)?;
        let site_url = url::Url::parse(&site_url).map_err(|e| ConfigError::Invalid {
            name: SITE_URL_ENV,
            reason: e.to_string(),
        })?;

        let storage = StorageConfig {
            bucket: env.required(S3_BUCKET_ENV)?,
            region: env.required(S3_REGION_ENV)?,
            access_key_id: env.required(S3_ACCESS_KEY_ID_ENV)?,
            secret_access_key: Secret::new(env.required(S3_SECRET_ACCESS_KEY_ENV)?),
            endpoint: env.optional(S3_ENDPOINT_ENV),
            force_path_style: env.flag(S3_FORCE_PATH_STYLE_ENV, false)?,
            verify_object_exists: env.flag(S3_VERIFY_OBJECT_EXISTS_ENV, true)?,
        };

        let tls = match (env.optional(TLS_CERT_PATH_ENV), env.optional(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match env.optional(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        Ok(Self {
            host: env.or_default(HOST_ENV, DEFAULT_HOST),
            port,
            webhook_secret: Secret::new(webhook_secret),
            stripe_secret_key: Secret::new(env.required(STRIPE_SECRET_KEY_ENV)?),
            resend_api_key: Secret::new(env.required(RESEND_API_KEY_ENV)?),
            fulfillment_from: env.required(FULFILLMENT_FROM_EMAIL_ENV)?,
            contact: ContactConfig {
                to: env.optional(CONTACT_TO_EMAIL_ENV),
                from: env.or_default(CONTACT_FROM_EMAIL_ENV, DEFAULT_CONTACT_FROM),
                reply_to: env.optional(CONTACT_REPLY_TO_ENV),
            },
            site_url,
            storage,
            data_dir: PathBuf::from(env.or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            catalog_path: env.optional(CATALOG_PATH_ENV).map(PathBuf::from),
            currency: env
                .or_default(CHECKOUT_CURRENCY_ENV, DEFAULT_CURRENCY)
                .to_ascii_lowercase(),
            download_url_ttl,
            idempotency_ttl: env.seconds(IDEMPOTENCY_TTL_ENV, DEFAULT_IDEMPOTENCY_TTL)?,
            webhook_tolerance: env.seconds(WEBHOOK_TOLERANCE_ENV, DEFAULT_WEBHOOK_TOLERANCE)?,
            external_call_timeout: env
                .seconds(EXTERNAL_CALL_TIMEOUT_ENV, DEFAULT_EXTERNAL_CALL_TIMEOUT)?,
            sweep_interval: env.seconds(SWEEP_INTERVAL_ENV, DEFAULT_SWEEP_INTERVAL)?,
            tls,
            log_format,
        })
    }

    /// Path of the embedded idempotency database.
    pub fn idempotency_db_path(&self) -> PathBuf {
        self.data_dir.join(IDEMPOTENCY_DB_FILE)
    }

    /// Stripe endpoint secrets start with `whsec_`; anything else is
    /// probably a pasted API key.
    pub fn webhook_secret_looks_valid(&self) -> bool {
        self.webhook_secret.expose().starts_with("whsec_")
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name).map(|v| v.to_ascii_lowercase()).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes") => Ok(true),
            Some("0" | "false" | "no") => Ok(false),
            Some(other) => Err(ConfigError::Invalid {
                name,
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    }

    fn seconds(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        let Some(raw) = self.optional(name) else {
            return Ok(default);
        };
        let secs = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        })?;
        if secs == 0 {
            return Err(ConfigError::Invalid {
                name,
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (STRIPE_WEBHOOK_SECRET_ENV, "whsec_test_secret_for_unit_tests_only"),
            (STRIPE_SECRET_KEY_ENV, "sk_test_123"),
            (RESEND_API_KEY_ENV, "re_test_123"),
            (FULFILLMENT_FROM_EMAIL_ENV, "Prints <prints@example.com>"),
            (SITE_URL_ENV, "https://prints.example.com"),
            (S3_BUCKET_ENV, "prints-bucket"),
            (S3_REGION_ENV, "us-east-2"),
            (S3_ACCESS_KEY_ID_ENV, "AKIDEXAMPLE"),
            (S3_SECRET_ACCESS_KEY_ENV, "secret-access-key"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn loads_defaults_when_optional_values_absent() {
        let config = load(&base_env()).expect("config");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.download_url_ttl, Duration::from_secs(43_200));
        assert_eq!(config.idempotency_ttl, Duration::from_secs(2_592_000));
        assert_eq!(config.webhook_tolerance, Duration::from_secs(300));
        assert_eq!(config.currency, "usd");
        assert_eq!(config.contact.to, None);
        assert_eq!(config.contact.from, "Contact Form <onboarding@resend.dev>");
        assert!(config.storage.verify_object_exists);
        assert!(!config.storage.force_path_style);
        assert!(config.tls.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(
            config.idempotency_db_path(),
            PathBuf::from("/data/idempotency.redb")
        );
    }

    #[test]
    fn missing_required_value_is_reported_by_name() {
        let mut env = base_env();
        env.remove(RESEND_API_KEY_ENV);
        let err = load(&env).unwrap_err();
        assert_eq!(err, ConfigError::Missing(RESEND_API_KEY_ENV));
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut env = base_env();
        env.insert(S3_BUCKET_ENV, "   ");
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing(S3_BUCKET_ENV));
    }

    #[test]
    fn rejects_zero_and_garbage_durations() {
        let mut env = base_env();
        env.insert(DOWNLOAD_URL_TTL_ENV, "0");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: DOWNLOAD_URL_TTL_ENV, .. })
        ));

        env.insert(DOWNLOAD_URL_TTL_ENV, "twelve hours");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: DOWNLOAD_URL_TTL_ENV, .. })
        ));
    }

    #[test]
    fn download_ttl_is_capped_at_presign_limit() {
        let mut env = base_env();
        env.insert(DOWNLOAD_URL_TTL_ENV, "604800");
        assert_eq!(
            load(&env).unwrap().download_url_ttl,
            Duration::from_secs(604_800)
        );

        env.insert(DOWNLOAD_URL_TTL_ENV, "864000");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: DOWNLOAD_URL_TTL_ENV, .. })
        ));
    }

    #[test]
    fn flags_webhook_secret_without_expected_prefix() {
        let mut env = base_env();
        assert!(load(&env).unwrap().webhook_secret_looks_valid());

        env.insert(STRIPE_WEBHOOK_SECRET_ENV, "sk_live_oops");
        assert!(!load(&env).unwrap().webhook_secret_looks_valid());
    }

    #[test]
    fn tls_requires_both_paths() {
        let mut env = base_env();
        env.insert(TLS_CERT_PATH_ENV, "/etc/tls/cert.pem");
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing(TLS_KEY_PATH_ENV));

        env.insert(TLS_KEY_PATH_ENV, "/etc/tls/key.pem");
        let tls = load(&env).expect("config").tls.expect("tls");
        assert_eq!(tls.key_path, PathBuf::from("/etc/tls/key.pem"));
    }

    #[test]
    fn rejects_invalid_site_url() {
        let mut env = base_env();
        env.insert(SITE_URL_ENV, "not a url");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: SITE_URL_ENV, .. })
        ));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config = load(&base_env()).expect("config");
        let debug = format!("{config:?}");
        assert!(!debug.contains("whsec_test_secret_for_unit_tests_only"));
        assert!(!debug.contains("sk_test_123"));
        assert!(!debug.contains("secret-access-key"));
        assert!(debug.contains("Secret(***)"));
    }

    #[test]
    fn parses_flags_and_log_format() {
        let mut env = base_env();
        env.insert(S3_FORCE_PATH_STYLE_ENV, "TRUE");
        env.insert(S3_VERIFY_OBJECT_EXISTS_ENV, "no");
        env.insert(LOG_FORMAT_ENV, "json");
        let config = load(&env).expect("config");
        assert!(config.storage.force_path_style);
        assert!(!config.storage.verify_object_exists);
        assert_eq!(config.log_format, LogFormat::Json);

        env.insert(LOG_FORMAT_ENV, "xml");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: LOG_FORMAT_ENV, .. })
        ));
    }
}
