// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Print catalog: the static mapping from product id to the deliverable file
//! in object storage, plus the display and pricing data used by checkout.
//!
//! The catalog is read once at startup, either from the built-in table or from
//! a JSON file in the storefront's shape:
//!
//! ```json
//! [{ "id": "1", "title": "Mountain Lake Sunset", "edition": "1",
//!    "priceCents": 2500, "imageSrc": "https://...", "s3Key": "Lake Sunset.jpg" }]
//! ```

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate product id in catalog: {0}")]
    DuplicateProductId(String),

    #[error("catalog entry {product_id} is invalid: {reason}")]
    InvalidEntry { product_id: String, reason: String },
}

/// A purchasable print.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Unique product identifier (sent as `printId` by the storefront).
    #[serde(rename = "id")]
    pub product_id: String,
    /// Title shown to buyers.
    #[serde(rename = "title")]
    pub display_title: String,
    /// Edition label.
    #[serde(default)]
    pub edition: String,
    /// Price in the smallest currency unit.
    pub price_cents: u64,
    /// Preview image shown on the checkout page.
    #[serde(default)]
    pub image_src: Option<String>,
    /// Object key of the full-resolution file.
    #[serde(rename = "s3Key")]
    pub storage_key: String,
}

/// Immutable product lookup table.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids and unusable entries.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.product_id.trim().is_empty() {
                return Err(CatalogError::InvalidEntry {
                    product_id: entry.product_id.clone(),
                    reason: "empty product id".to_string(),
                });
            }
            if entry.storage_key.trim().is_empty() {
                return Err(CatalogError::InvalidEntry {
                    product_id: entry.product_id.clone(),
                    reason: "empty storage key".to_string(),
                });
            }
            if index.insert(entry.product_id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateProductId(entry.product_id.clone()));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|e| CatalogError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// The prints sold by the storefront out of the box.
    pub fn builtin() -> Self {
        let entries = vec![
            CatalogEntry {
                product_id: "1".to_string(),
                display_title: "Mountain Lake Sunset".to_string(),
                edition: "1".to_string(),
                price_cents: 2500,
                image_src: Some("https://imgur.com/yJyNjt6.jpg".to_string()),
                storage_key: "Lake Sunset.jpg".to_string(),
            },
            CatalogEntry {
                product_id: "2".to_string(),
                display_title: "City Skyline".to_string(),
                edition: "2".to_string(),
                price_cents: 2500,
                image_src: Some("https://imgur.com/aDlwriY.jpg".to_string()),
                storage_key: "Denver Skyline.jpg".to_string(),
            },
            CatalogEntry {
                product_id: "3".to_string(),
                display_title: "Dolomiti Sunset".to_string(),
                edition: "3".to_string(),
                price_cents: 2500,
                image_src: Some("https://imgur.com/PpjX5Uw.jpg".to_string()),
                storage_key: "Dolomites Sunset FINAL.jpg".to_string(),
            },
        ];
        // Static table, ids are unique.
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.product_id.clone(), i))
            .collect();
        Self { entries, index }
    }

    pub fn find_by_product_id(&self, product_id: &str) -> Option<&CatalogEntry> {
        self.index.get(product_id).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
