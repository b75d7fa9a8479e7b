use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use super::contact::first_error;
use super::model::{CatalogError, Product};
use crate::hero::admission::{check_file, storage_key};
use crate::hero::UploadCandidate;
use crate::media::{key_from_url, StorageService};
use crate::store::{decode, decode_all, DataStore, Filter, Order, Table};

pub const PRODUCT_BUCKET: &str = "products";

fn default_true() -> bool {
    true
}

/// 管理后台提交的商品表单，新建和编辑共用
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Please upload a product image"))]
    pub image_url: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl ProductForm {
    fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            material: self.material.trim().to_string(),
            size: self
                .size
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            image_url: self.image_url.trim().to_string(),
            category: self.category.trim().to_lowercase(),
            ..self.clone()
        }
    }

    fn record(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "material": self.material,
            "size": self.size,
            "image_url": self.image_url,
            "category": self.category,
            "display_order": self.display_order,
            "is_visible": self.is_visible,
            "is_featured": self.is_featured,
        })
    }
}

/// 管理后台的商品维护：包括隐藏商品在内的完整列表、增删改和图片上传
pub struct ProductAdmin {
    store: Arc<dyn DataStore>,
    storage: Arc<dyn StorageService>,
}

impl ProductAdmin {
    pub fn new(store: Arc<dyn DataStore>, storage: Arc<dyn StorageService>) -> Self {
        Self { store, storage }
    }

    /// 全部商品，包含隐藏的
    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        let rows = self
            .store
            .select(
                Table::Products,
                &Filter::all(),
                Some(&Order::asc("display_order")),
                None,
            )
            .await?;
        Ok(decode_all(rows)?)
    }

    pub async fn find(&self, id: &str) -> Result<Product, CatalogError> {
        let rows = self
            .store
            .select(Table::Products, &Filter::all().eq("id", id), None, None)
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(decode(row)?),
            None => Err(CatalogError::NotFound),
        }
    }

    /// 上传商品图片，返回公开 URL。类型和大小规则与轮播图片相同。
    pub async fn upload_image(&self, candidate: &UploadCandidate<'_>) -> Result<String, CatalogError> {
        let content_type =
            check_file(candidate).map_err(|e| CatalogError::Validation(e.to_string()))?;
        let key = storage_key(candidate.file_name, &content_type);

        debug!("上传商品图片: {} ({})", key, content_type);
        let url = self
            .storage
            .upload(PRODUCT_BUCKET, &key, candidate.data)
            .await
            .map_err(|e| {
                error!("商品图片上传失败: {}", e);
                CatalogError::from(e)
            })?;
        info!("商品图片已上传: {}", url);
        Ok(url)
    }

    async fn validate(&self, form: &ProductForm) -> Result<ProductForm, CatalogError> {
        let form = form.trimmed();
        form.validate()
            .map_err(|e| CatalogError::Validation(first_error(&e)))?;

        let known = self
            .store
            .count(Table::Categories, &Filter::all().eq("name", form.category.as_str()))
            .await?;
        if known == 0 {
            return Err(CatalogError::Validation(format!(
                "Unknown category: {}",
                form.category
            )));
        }
        Ok(form)
    }

    pub async fn create(&self, form: &ProductForm) -> Result<Product, CatalogError> {
        let form = self.validate(form).await?;
        let row = self.store.insert(Table::Products, form.record()).await?;
        let product: Product = decode(row)?;
        info!("新增商品: {} ({})", product.name, product.id);
        Ok(product)
    }

    pub async fn update(&self, id: &str, form: &ProductForm) -> Result<Product, CatalogError> {
        let form = self.validate(form).await?;
        let mut patch = form.record();
        patch["updated_at"] = json!(Utc::now());
        self.store.update(Table::Products, id, patch).await?;
        info!("更新商品: {}", id);
        self.find(id).await
    }

    /// 删除商品记录及其图片；图片删除失败不影响记录删除
    pub async fn delete(&self, id: &str) -> Result<Product, CatalogError> {
        let product = self.find(id).await?;

        if !product.image_url.is_empty() {
            match key_from_url(&product.image_url) {
                Some(key) => {
                    if let Err(e) = self.storage.delete(PRODUCT_BUCKET, key).await {
                        warn!("删除商品图片失败，继续删除记录: {}", e);
                    }
                }
                None => warn!("无法从 URL 解析文件名: {}", product.image_url),
            }
        }

        self.store.delete(Table::Products, id).await?;
        info!("删除商品: {} ({})", product.name, id);
        Ok(product)
    }

    pub async fn toggle_visibility(&self, id: &str) -> Result<Product, CatalogError> {
        let product = self.find(id).await?;
        self.flip(id, "is_visible", !product.is_visible).await?;
        Ok(Product {
            is_visible: !product.is_visible,
            ..product
        })
    }

    pub async fn toggle_featured(&self, id: &str) -> Result<Product, CatalogError> {
        let product = self.find(id).await?;
        self.flip(id, "is_featured", !product.is_featured).await?;
        Ok(Product {
            is_featured: !product.is_featured,
            ..product
        })
    }

    async fn flip(&self, id: &str, column: &str, value: bool) -> Result<(), CatalogError> {
        let mut patch = json!({ "updated_at": Utc::now() });
        patch[column] = Value::Bool(value);
        self.store.update(Table::Products, id, patch).await?;
        debug!("商品 {} 的 {} 改为 {}", id, column, value);
        Ok(())
    }
}
