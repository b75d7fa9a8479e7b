use log::debug;
use serde::{Deserialize, Serialize};

use super::model::{CatalogError, Product};
use super::Catalog;
use crate::store::{decode, decode_all, Filter, Order, Range, Table};

pub const PRODUCTS_PER_PAGE: usize = 12;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    /// 只要首页推荐的商品
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl ProductQuery {
    fn filter(&self) -> Filter {
        let mut filter = Filter::all().eq("is_visible", true);
        if let Some(category) = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "all")
        {
            filter = filter.eq("category", category);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filter = filter.contains("name", search);
        }
        if self.featured == Some(true) {
            filter = filter.eq("is_featured", true);
        }
        filter
    }

    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

impl Catalog {
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let filter = query.filter();
        let page = query.page();
        let range = Range {
            offset: (page as usize - 1) * PRODUCTS_PER_PAGE,
            limit: PRODUCTS_PER_PAGE,
        };
        debug!("查询商品: {:?}, 第 {} 页", query, page);

        let total = self.store.count(Table::Products, &filter).await?;
        let rows = self
            .store
            .select(
                Table::Products,
                &filter,
                Some(&Order::asc("display_order")),
                Some(range),
            )
            .await?;

        Ok(ProductPage {
            products: decode_all(rows)?,
            page,
            total,
            total_pages: total.div_ceil(PRODUCTS_PER_PAGE as u64),
        })
    }

    pub async fn product(&self, id: &str) -> Result<Product, CatalogError> {
        let filter = Filter::all().eq("id", id).eq("is_visible", true);
        let rows = self.store.select(Table::Products, &filter, None, None).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(decode(row)?),
            None => Err(CatalogError::NotFound),
        }
    }

    /// 保持数据库活跃
    pub async fn keepalive(&self) -> Result<u64, CatalogError> {
        Ok(self.store.count(Table::Products, &Filter::all()).await?)
    }
}
