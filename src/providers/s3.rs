// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Time-limited download links for print files held in S3.
//!
//! Links are presigned `GET`s with `response-content-disposition=attachment`,
//! so browsers save the file instead of rendering it inline.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{config::Credentials, presigning::PresigningConfig, Client};

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum PresignError {
    #[error("object {0} not found in storage")]
    ObjectMissing(String),

    #[error("invalid link expiry: {0}")]
    InvalidExpiry(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A freshly minted download link. Never cached or reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDownloadUrl {
    pub url: String,
    pub storage_key: String,
    pub expires_in: Duration,
}

impl SignedDownloadUrl {
    /// Lifetime rounded up to whole hours, for display.
    pub fn expires_in_hours(&self) -> u64 {
        self.expires_in.as_secs().div_ceil(3600)
    }
}

#[async_trait]
pub trait DownloadUrlMinter: Send + Sync {
    async fn presign(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> Result<SignedDownloadUrl, PresignError>;
}

#[derive(Debug, Clone)]
pub struct S3Presigner {
    client: Client,
    bucket: String,
    verify_object_exists: bool,
}

impl S3Presigner {
    pub async fn from_config(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.expose().to_string(),
            None,
            None,
            "print-fulfillment-config",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let shared_config = loader.load().await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }

        Self::new(
            Client::from_conf(s3_builder.build()),
            config.bucket.clone(),
            config.verify_object_exists,
        )
    }

    pub fn new(client: Client, bucket: String, verify_object_exists: bool) -> Self {
        Self {
            client,
            bucket,
            verify_object_exists,
        }
    }

    async fn ensure_exists(&self, storage_key: &str) -> Result<(), PresignError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if missing {
                    Err(PresignError::ObjectMissing(storage_key.to_string()))
                } else {
                    Err(PresignError::Backend(err.to_string()))
                }
            }
        }
    }
}

#[async_trait]
impl DownloadUrlMinter for S3Presigner {
    async fn presign(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> Result<SignedDownloadUrl, PresignError> {
        if self.verify_object_exists {
            self.ensure_exists(storage_key).await?;
        }

        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| PresignError::InvalidExpiry(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .response_content_disposition(attachment_disposition(storage_key))
            .presigned(presigning)
            .await
            .map_err(|e| PresignError::Backend(e.to_string()))?;

        Ok(SignedDownloadUrl {
            url: request.uri().to_string(),
            storage_key: storage_key.to_string(),
            expires_in,
        })
    }
}

/// `Content-Disposition` value forcing a download named after the object.
fn attachment_disposition(storage_key: &str) -> String {
    let file_name = storage_key
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("download");
    let file_name: String = file_name
        .chars()
        .filter(|c| *c != '"' && *c != '\\' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{file_name}\"")
}
