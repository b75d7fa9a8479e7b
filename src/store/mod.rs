use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod postgres_backend;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres_backend::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("查询失败: {0}")]
    Query(String),

    #[error("记录不存在: {0}")]
    NotFound(String),

    #[error("记录冲突: {0}")]
    Conflict(String),

    #[error("非法列名: {0}")]
    InvalidColumn(String),

    #[error("记录解析失败: {0}")]
    Decode(String),
}

/// 数据表，表名固定，避免拼接外部输入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    HeroSettings,
    HeroImages,
    Products,
    Categories,
    ContactMessages,
    AdminActivityLog,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::HeroSettings => "hero_settings",
            Table::HeroImages => "hero_images",
            Table::Products => "products",
            Table::Categories => "categories",
            Table::ContactMessages => "contact_messages",
            Table::AdminActivityLog => "admin_activity_log",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { column: String, value: Value },
    /// 不区分大小写的子串匹配
    Contains { column: String, needle: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, column: &str, needle: &str) -> Self {
        self.conditions.push(Condition::Contains {
            column: column.to_string(),
            needle: needle.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

/// 偏移分页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: usize,
    pub limit: usize,
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// 按条件查询，排序相同的记录保持插入顺序
    async fn select(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&Order>,
        range: Option<Range>,
    ) -> Result<Vec<Value>, StoreError>;

    /// 插入记录，返回包含默认列（id、created_at）的完整记录
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError>;

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), StoreError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError>;

    async fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError>;
}

pub fn decode<T: DeserializeOwned>(record: Value) -> Result<T, StoreError> {
    serde_json::from_value(record).map_err(|e| StoreError::Decode(e.to_string()))
}

pub fn decode_all<T: DeserializeOwned>(records: Vec<Value>) -> Result<Vec<T>, StoreError> {
    records.into_iter().map(decode).collect()
}

pub(crate) fn check_column(column: &str) -> Result<(), StoreError> {
    static COLUMN: OnceLock<Regex> = OnceLock::new();
    let re = COLUMN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("column pattern"));
    if re.is_match(column) {
        Ok(())
    } else {
        Err(StoreError::InvalidColumn(column.to_string()))
    }
}
