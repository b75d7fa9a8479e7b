use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaError;
use crate::store::StoreError;

pub const MAX_HERO_IMAGES: usize = 5;
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_TRANSITION_MS: u64 = 5000;
pub const HERO_BUCKET: &str = "hero-images";
pub const PLACEHOLDER_URL: &str = "https://placehold.co/1920x1080/737c6a/white?text=Hero+Image";

fn default_transition() -> u64 {
    DEFAULT_TRANSITION_MS
}

/// 全站唯一的轮播设置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "carousel_enabled", default)]
    pub rotation_enabled: bool,
    #[serde(default)]
    pub active_image_id: Option<String>,
    #[serde(rename = "transition_duration", default = "default_transition")]
    pub transition_interval_ms: u64,
}

impl Default for HeroSettings {
    fn default() -> Self {
        Self {
            id: None,
            rotation_enabled: false,
            active_image_id: None,
            transition_interval_ms: DEFAULT_TRANSITION_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroImage {
    pub id: String,
    #[serde(rename = "image_url")]
    pub url: String,
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum HeroError {
    #[error("File must be an image")]
    NotAnImage,

    #[error("Maximum file size is 5MB")]
    TooLarge,

    #[error("Maximum of 5 hero images")]
    CapacityReached,

    #[error("{0}")]
    Validation(String),

    #[error("Hero image not found")]
    NotFound,

    #[error("Failed to update hero images")]
    Store(#[from] StoreError),

    #[error("Failed to upload image")]
    Media(#[from] MediaError),
}

impl HeroError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HeroError::NotAnImage
                | HeroError::TooLarge
                | HeroError::CapacityReached
                | HeroError::Validation(_)
        )
    }
}
