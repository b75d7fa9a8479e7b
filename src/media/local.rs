use crate::media::{MediaError, StorageService};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::PathBuf;

/// 本地文件存储，文件由 actix-files 在 public_base 下对外提供
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, key)
    }

    fn path_for(&self, bucket: &str, key: &str) -> Result<PathBuf, MediaError> {
        for part in [bucket, key] {
            if part.is_empty() || part.contains(['/', '\\']) || part.starts_with('.') {
                return Err(MediaError::InvalidKey(format!("{}/{}", bucket, key)));
            }
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn upload(&self, bucket: &str, key: &str, data: &[u8]) -> Result<String, MediaError> {
        let path = self.path_for(bucket, key)?;
        debug!("写入文件: {}", path.display());

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| MediaError::Io(format!("创建目录失败: {}", e)))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| MediaError::Io(format!("写入文件失败: {}", e)))?;

        info!("文件已上传: {}/{} ({} 字节)", bucket, key, data.len());
        Ok(self.public_url(bucket, key))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), MediaError> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("文件已删除: {}/{}", bucket, key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("待删除文件不存在: {}/{}", bucket, key);
                Ok(())
            }
            Err(e) => Err(MediaError::Io(format!("删除文件失败: {}", e))),
        }
    }
}
