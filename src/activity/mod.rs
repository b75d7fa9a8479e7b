use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::store::{decode_all, DataStore, Filter, Order, Range, StoreError, Table};

/// 活动列表最多返回的条数
pub const RECENT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
            ActivityAction::Login => "login",
            ActivityAction::Logout => "logout",
        }
    }
}

/// 一次管理操作：谁、做了什么、对哪张表的哪条记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    pub id: String,
    #[serde(default)]
    pub user_email: Option<String>,
    pub action: ActivityAction,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub record_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// 待写入的活动记录
#[derive(Debug, Clone, Default)]
pub struct Activity<'a> {
    pub table_name: Option<&'a str>,
    pub record_id: Option<&'a str>,
    pub record_name: Option<&'a str>,
}

impl<'a> Activity<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn table(table: Table) -> Self {
        Self {
            table_name: Some(table.name()),
            ..Self::default()
        }
    }

    pub fn on(table: Table, record_id: &'a str, record_name: Option<&'a str>) -> Self {
        Self {
            table_name: Some(table.name()),
            record_id: Some(record_id),
            record_name,
        }
    }
}

pub struct ActivityLog {
    store: Arc<dyn DataStore>,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// 写入失败只记日志，不影响已经完成的操作
    pub async fn record(&self, user_email: Option<&str>, action: ActivityAction, target: Activity<'_>) {
        let row = json!({
            "user_email": user_email,
            "action": action.as_str(),
            "table_name": target.table_name,
            "record_id": target.record_id,
            "record_name": target.record_name,
        });
        match self.store.insert(Table::AdminActivityLog, row).await {
            Ok(_) => debug!(
                "记录管理操作: {} {} {:?}",
                user_email.unwrap_or("-"),
                action.as_str(),
                target.table_name
            ),
            Err(e) => error!("管理操作记录写入失败: {}", e),
        }
    }

    /// 最近的操作，新的在前
    pub async fn recent(&self) -> Result<Vec<ActivityEntry>, StoreError> {
        let rows = self
            .store
            .select(
                Table::AdminActivityLog,
                &Filter::all(),
                Some(&Order::desc("created_at")),
                Some(Range {
                    offset: 0,
                    limit: RECENT_LIMIT,
                }),
            )
            .await?;
        decode_all(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::Op;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn recent_is_newest_first_and_capped() {
        let store = Arc::new(MemoryStore::new());
        let start = Utc::now() - chrono::Duration::hours(1);
        for i in 0..(RECENT_LIMIT + 5) {
            store.seed(
                Table::AdminActivityLog,
                json!({
                    "user_email": "admin@patchtern.com",
                    "action": "update",
                    "table_name": "products",
                    "record_name": format!("produk {}", i),
                    "created_at": (start + chrono::Duration::seconds(i as i64)).to_rfc3339(),
                }),
            );
        }

        let log = ActivityLog::new(store);
        let recent = log.recent().await.unwrap();
        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(
            recent[0].record_name.as_deref(),
            Some(format!("produk {}", RECENT_LIMIT + 4).as_str())
        );
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn record_stores_target_and_actor() {
        let store = Arc::new(MemoryStore::new());
        let log = ActivityLog::new(store.clone());

        log.record(
            Some("admin@patchtern.com"),
            ActivityAction::Delete,
            Activity::on(Table::Categories, "cat-1", Some("Wall Art")),
        )
        .await;
        log.record(None, ActivityAction::Logout, Activity::none()).await;

        let recent = log.recent().await.unwrap();
        assert_eq!(recent.len(), 2);
        let deleted = recent
            .iter()
            .find(|e| e.action == ActivityAction::Delete)
            .unwrap();
        assert_eq!(deleted.user_email.as_deref(), Some("admin@patchtern.com"));
        assert_eq!(deleted.table_name.as_deref(), Some("categories"));
        assert_eq!(deleted.record_id.as_deref(), Some("cat-1"));
        assert!(recent.iter().any(|e| e.action == ActivityAction::Logout && e.user_email.is_none()));
    }

    #[tokio::test]
    async fn failed_write_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        store.fail(Op::Insert, Table::AdminActivityLog);
        let log = ActivityLog::new(store.clone());

        log.record(Some("a@b.co"), ActivityAction::Login, Activity::none()).await;
        assert_eq!(store.calls(Op::Insert, Table::AdminActivityLog), 1);
        assert!(store.rows(Table::AdminActivityLog).is_empty());
    }
}
