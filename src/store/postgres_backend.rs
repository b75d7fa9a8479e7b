use crate::store::{check_column, Condition, DataStore, Filter, Order, Range, StoreError, Table};
use async_trait::async_trait;
use log::{debug, error};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

/// 基于 Postgres 的通用表访问，记录以 JSON 形式进出
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 拼出 WHERE 子句，参数统一以文本绑定
fn where_clause(filter: &Filter, first_param: usize) -> Result<(String, Vec<String>), StoreError> {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    for condition in &filter.conditions {
        let n = first_param + binds.len();
        match condition {
            Condition::Eq { column, value } => {
                check_column(column)?;
                clauses.push(format!("{}::text = ${}", column, n));
                binds.push(value_as_text(value));
            }
            Condition::Contains { column, needle } => {
                check_column(column)?;
                clauses.push(format!("{} ILIKE ${}", column, n));
                binds.push(format!("%{}%", escape_like(needle)));
            }
        }
    }

    if clauses.is_empty() {
        Ok((String::new(), binds))
    } else {
        Ok((format!(" WHERE {}", clauses.join(" AND ")), binds))
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn record_columns(record: &Value) -> Result<Vec<String>, StoreError> {
    let object = record
        .as_object()
        .ok_or_else(|| StoreError::Decode("记录必须是 JSON 对象".to_string()))?;
    let mut columns = Vec::with_capacity(object.len());
    for key in object.keys() {
        check_column(key)?;
        columns.push(key.clone());
    }
    if columns.is_empty() {
        return Err(StoreError::Decode("记录没有任何列".to_string()));
    }
    Ok(columns)
}

fn map_sqlx(table: Table, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict(format!("{}: {}", table.name(), db.message()));
        }
    }
    error!("数据库操作失败 - 表: {}, 错误: {}", table.name(), e);
    StoreError::Query(e.to_string())
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn select(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&Order>,
        range: Option<Range>,
    ) -> Result<Vec<Value>, StoreError> {
        let (clause, binds) = where_clause(filter, 1)?;
        let mut sql = format!(
            "SELECT row_to_json(t)::jsonb FROM {} t{}",
            table.name(),
            clause
        );
        match order {
            Some(order) => {
                check_column(&order.column)?;
                let direction = if order.ascending { "ASC" } else { "DESC" };
                sql.push_str(&format!(
                    " ORDER BY {} {}, created_at ASC",
                    order.column, direction
                ));
            }
            None => sql.push_str(" ORDER BY created_at ASC"),
        }
        if let Some(range) = range {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", range.limit, range.offset));
        }
        debug!("执行查询: {}", sql);

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for bind in binds {
            query = query.bind(bind);
        }
        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let columns = record_columns(&record)?.join(", ");
        let sql = format!(
            "INSERT INTO {t} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{t}, $1) \
             RETURNING row_to_json({t})::jsonb",
            t = table.name(),
            cols = columns
        );
        debug!("插入记录: {}", sql);

        sqlx::query_scalar::<_, Value>(&sql)
            .bind(Json(record))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), StoreError> {
        let assignments = record_columns(&patch)?
            .iter()
            .map(|c| format!("{c} = r.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {t} SET {assignments} FROM jsonb_populate_record(NULL::{t}, $1) AS r \
             WHERE {t}.id::text = $2",
            t = table.name(),
            assignments = assignments
        );
        debug!("更新记录: {}", sql);

        let result = sqlx::query(&sql)
            .bind(Json(patch))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{}/{}", table.name(), id)));
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id::text = $1", table.name());
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{}/{}", table.name(), id)));
        }
        Ok(())
    }

    async fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, binds) = where_clause(filter, 1)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", table.name(), clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for bind in binds {
            query = query.bind(bind);
        }
        let count = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx(table, e))?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn where_clause_numbers_parameters_in_order() {
        let filter = Filter::all().eq("is_visible", true).contains("name", "50%_off");
        let (clause, binds) = where_clause(&filter, 1).unwrap();
        assert_eq!(clause, " WHERE is_visible::text = $1 AND name ILIKE $2");
        assert_eq!(binds, vec!["true".to_string(), "%50\\%\\_off%".to_string()]);
    }

    #[test]
    fn empty_filter_has_no_where() {
        let (clause, binds) = where_clause(&Filter::all(), 1).unwrap();
        assert!(clause.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn record_columns_rejects_non_identifiers() {
        assert!(record_columns(&json!({"image_url": "x", "display_order": 1})).is_ok());
        assert!(matches!(
            record_columns(&json!({"bad column": 1})),
            Err(StoreError::InvalidColumn(_))
        ));
        assert!(matches!(record_columns(&json!([1, 2])), Err(StoreError::Decode(_))));
    }
}
