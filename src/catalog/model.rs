use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaError;
use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub image_url: String,
    pub category: String,
    pub display_order: i32,
    pub is_visible: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub is_protected: bool,
    #[serde(default)]
    pub is_default: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
    Archived,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
            MessageStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub status: MessageStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),

    #[error("Cannot delete protected category")]
    Protected,

    #[error("Cannot delete the last category")]
    LastCategory,

    #[error("Cannot delete \"{name}\" - {count} product(s) are using this category")]
    InUse { name: String, count: u64 },

    #[error("Category already exists")]
    AlreadyExists,

    #[error("Not found")]
    NotFound,

    #[error("Something went wrong. Please try again.")]
    Store(StoreError),

    #[error("Failed to upload image")]
    Upload(#[from] MediaError),
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => CatalogError::NotFound,
            StoreError::Conflict(_) => CatalogError::AlreadyExists,
            other => CatalogError::Store(other),
        }
    }
}
