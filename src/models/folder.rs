use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::product::ProductImage;

/// Trimmed-down product shown inside a folder listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Option<f64>,
    pub images: Vec<ProductImage>,
}

/// A named, ordered collection of products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub products: Vec<ProductSummary>,
    pub product_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: String,

    #[garde(skip)]
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFolderRequest {
    #[garde(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[garde(skip)]
    pub product_ids: Option<Vec<Uuid>>,
}

/// Body of the add/remove product endpoints.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FolderProductsRequest {
    #[garde(length(min = 1))]
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Drop repeated ids, keeping the first occurrence.
pub fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
