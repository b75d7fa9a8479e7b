use async_trait::async_trait;
use thiserror::Error;

pub mod local;

pub use local::LocalStorage;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("非法的存储键: {0}")]
    InvalidKey(String),

    #[error("存储失败: {0}")]
    Io(String),
}

/// 对象存储，返回可公开访问的 URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload(&self, bucket: &str, key: &str, data: &[u8]) -> Result<String, MediaError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), MediaError>;
}

/// 从公开 URL 中取出存储键（最后一段路径）
pub fn key_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().filter(|k| !k.is_empty())
}
