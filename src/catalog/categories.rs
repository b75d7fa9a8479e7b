use log::{info, warn};
use serde::Deserialize;
use serde_json::json;

use super::model::{CatalogError, Category};
use super::Catalog;
use crate::store::{decode, decode_all, Filter, Order, Table};

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// 分类标识：去空白、转小写
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Catalog {
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let rows = self
            .store
            .select(
                Table::Categories,
                &Filter::all(),
                Some(&Order::asc("display_order")),
                None,
            )
            .await?;
        Ok(decode_all(rows)?)
    }

    pub async fn add_category(&self, input: &NewCategory) -> Result<Category, CatalogError> {
        let name = normalize_name(&input.name);
        let display_name = input.display_name.trim().to_string();
        if name.is_empty() || display_name.is_empty() {
            return Err(CatalogError::Validation(
                "Both fields are required".to_string(),
            ));
        }

        let existing = self.categories().await?;
        if existing.iter().any(|c| c.name == name) {
            return Err(CatalogError::AlreadyExists);
        }
        let display_order = existing
            .iter()
            .map(|c| c.display_order)
            .fold(0, i32::max)
            + 1;

        let row = self
            .store
            .insert(
                Table::Categories,
                json!({
                    "name": name,
                    "display_name": display_name,
                    "is_protected": false,
                    "is_default": false,
                    "display_order": display_order,
                }),
            )
            .await?;
        info!("新增分类: {}", name);
        Ok(decode(row)?)
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), CatalogError> {
        let all = self.categories().await?;
        let category = all
            .iter()
            .find(|c| c.id == id)
            .ok_or(CatalogError::NotFound)?;

        if category.is_protected {
            warn!("拒绝删除受保护分类: {}", category.name);
            return Err(CatalogError::Protected);
        }
        if all.len() <= 1 {
            return Err(CatalogError::LastCategory);
        }
        let in_use = self
            .store
            .count(Table::Products, &Filter::all().eq("category", category.name.as_str()))
            .await?;
        if in_use > 0 {
            return Err(CatalogError::InUse {
                name: category.display_name.clone(),
                count: in_use,
            });
        }

        self.store.delete(Table::Categories, id).await?;
        info!("删除分类: {}", category.name);
        Ok(())
    }
}
