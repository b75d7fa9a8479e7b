use log::{debug, error, info, warn};
use serde_json::json;
use std::sync::Arc;

use crate::media::{key_from_url, StorageService};
use crate::store::{decode, decode_all, DataStore, Filter, Order, Table};

use super::admission::{admit, check_file, Admission, UploadCandidate};
use super::model::{HeroError, HeroImage, HeroSettings, HERO_BUCKET};

/// 管理后台的轮播图片与设置
pub struct HeroManager {
    store: Arc<dyn DataStore>,
    storage: Arc<dyn StorageService>,
}

impl HeroManager {
    pub fn new(store: Arc<dyn DataStore>, storage: Arc<dyn StorageService>) -> Self {
        Self { store, storage }
    }

    /// 读取设置；还没有记录时写入默认值
    pub async fn settings(&self) -> Result<HeroSettings, HeroError> {
        let rows = self
            .store
            .select(Table::HeroSettings, &Filter::all(), None, None)
            .await?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(decode(row)?);
        }

        warn!("轮播设置不存在，写入默认设置");
        let defaults = HeroSettings::default();
        let row = self
            .store
            .insert(
                Table::HeroSettings,
                json!({
                    "carousel_enabled": defaults.rotation_enabled,
                    "transition_duration": defaults.transition_interval_ms,
                }),
            )
            .await?;
        Ok(decode(row)?)
    }

    pub async fn images(&self) -> Result<Vec<HeroImage>, HeroError> {
        let rows = self
            .store
            .select(
                Table::HeroImages,
                &Filter::all(),
                Some(&Order::asc("display_order")),
                None,
            )
            .await?;
        Ok(decode_all(rows)?)
    }

    pub async fn snapshot(&self) -> Result<(HeroSettings, Vec<HeroImage>), HeroError> {
        Ok((self.settings().await?, self.images().await?))
    }

    /// 上传新图片。先传文件再写记录；记录写入失败时文件留作孤儿，不做回滚。
    pub async fn upload(&self, candidate: &UploadCandidate<'_>) -> Result<HeroImage, HeroError> {
        // 类型和大小不合格时不查询数量
        check_file(candidate)?;
        let count = self
            .store
            .count(Table::HeroImages, &Filter::all())
            .await? as usize;
        let Admission {
            key,
            content_type,
            display_order,
        } = admit(candidate, count)?;

        debug!("上传轮播图片: {} ({})", key, content_type);
        let url = self
            .storage
            .upload(HERO_BUCKET, &key, candidate.data)
            .await
            .map_err(|e| {
                error!("轮播图片上传失败: {}", e);
                HeroError::from(e)
            })?;

        let row = self
            .store
            .insert(
                Table::HeroImages,
                json!({
                    "image_url": url,
                    "display_order": display_order,
                    "is_active": true,
                }),
            )
            .await
            .map_err(|e| {
                error!("轮播图片记录写入失败，文件 {}/{} 成为孤儿: {}", HERO_BUCKET, key, e);
                HeroError::from(e)
            })?;

        let image: HeroImage = decode(row)?;
        info!("轮播图片已添加: {} (顺序 {})", image.id, image.display_order);
        Ok(image)
    }

    /// 删除图片及其文件。被设为当前展示的图片删除后由选择逻辑回退到第一张。
    pub async fn delete(&self, image_id: &str) -> Result<(), HeroError> {
        let image = self.find_image(image_id).await?;

        match key_from_url(&image.url) {
            Some(key) => {
                if let Err(e) = self.storage.delete(HERO_BUCKET, key).await {
                    warn!("删除轮播图片文件失败，继续删除记录: {}", e);
                }
            }
            None => warn!("无法从 URL 解析文件名: {}", image.url),
        }

        self.store.delete(Table::HeroImages, image_id).await?;
        info!("轮播图片已删除: {}", image_id);
        Ok(())
    }

    pub async fn set_rotation(&self, enabled: bool) -> Result<HeroSettings, HeroError> {
        let settings = self.settings().await?;
        self.update_settings(
            &settings,
            json!({ "carousel_enabled": enabled, "updated_at": chrono::Utc::now() }),
        )
        .await?;
        info!("轮播开关: {}", enabled);
        Ok(HeroSettings {
            rotation_enabled: enabled,
            ..settings
        })
    }

    pub async fn toggle_rotation(&self) -> Result<HeroSettings, HeroError> {
        let settings = self.settings().await?;
        self.set_rotation(!settings.rotation_enabled).await
    }

    pub async fn set_active(&self, image_id: &str) -> Result<HeroSettings, HeroError> {
        let image = self.find_image(image_id).await?;
        let settings = self.settings().await?;
        self.update_settings(
            &settings,
            json!({ "active_image_id": image.id, "updated_at": chrono::Utc::now() }),
        )
        .await?;
        info!("当前展示图片: {}", image.id);
        Ok(HeroSettings {
            active_image_id: Some(image.id),
            ..settings
        })
    }

    pub async fn set_interval(&self, interval_ms: u64) -> Result<HeroSettings, HeroError> {
        if interval_ms == 0 {
            return Err(HeroError::Validation(
                "Transition interval must be positive".to_string(),
            ));
        }
        let settings = self.settings().await?;
        self.update_settings(
            &settings,
            json!({ "transition_duration": interval_ms, "updated_at": chrono::Utc::now() }),
        )
        .await?;
        Ok(HeroSettings {
            transition_interval_ms: interval_ms,
            ..settings
        })
    }

    async fn find_image(&self, image_id: &str) -> Result<HeroImage, HeroError> {
        let rows = self
            .store
            .select(Table::HeroImages, &Filter::all().eq("id", image_id), None, None)
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(decode(row)?),
            None => Err(HeroError::NotFound),
        }
    }

    async fn update_settings(
        &self,
        settings: &HeroSettings,
        patch: serde_json::Value,
    ) -> Result<(), HeroError> {
        let id = settings.id.as_deref().ok_or_else(|| {
            HeroError::Validation("Hero settings have not been initialised".to_string())
        })?;
        self.store
            .update(Table::HeroSettings, id, patch)
            .await
            .map_err(|e| {
                error!("更新轮播设置失败: {}", e);
                HeroError::from(e)
            })
    }
}
