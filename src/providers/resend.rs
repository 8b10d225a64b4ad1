// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transactional email via the Resend REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("email provider configuration invalid: {0}")]
    Config(String),

    #[error("email request failed: {0}")]
    Request(String),

    #[error("email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("email provider response was invalid: {0}")]
    InvalidResponse(String),
}

impl MailerError {
    /// Whether a later attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) | Self::InvalidResponse(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

/// Provider receipt for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<SentEmail, MailerError>;
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct ResendMailer {
    api_base_url: String,
    api_key: String,
    http: Client,
}

impl ResendMailer {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, MailerError> {
        Self::with_base_url(DEFAULT_API_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(
        api_base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, MailerError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SentEmail, MailerError> {
        let request = ResendEmailRequest {
            from: &message.from,
            to: vec![message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
            reply_to: message.reply_to.as_deref(),
        };

        let response = self
            .http
            .post(format!("{}/emails", self.api_base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MailerError::Request(format!("POST /emails failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected { status, body });
        }

        let sent: ResendEmailResponse = response
            .json()
            .await
            .map_err(|e| MailerError::InvalidResponse(format!("POST /emails invalid JSON: {e}")))?;

        Ok(SentEmail { id: sent.id })
    }
}
