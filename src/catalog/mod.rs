use std::sync::Arc;

use crate::store::DataStore;

pub mod categories;
pub mod contact;
pub mod model;
pub mod product_admin;
pub mod products;

pub use categories::NewCategory;
pub use contact::ContactForm;
pub use model::{CatalogError, MessageStatus};
pub use product_admin::{ProductAdmin, ProductForm};
pub use products::ProductQuery;

/// 商品目录、分类与留言
pub struct Catalog {
    store: Arc<dyn DataStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}
