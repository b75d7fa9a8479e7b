use crate::store::{check_column, Condition, DataStore, Filter, Order, Range, StoreError, Table};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Insert,
    Update,
    Delete,
    Count,
}

/// 内存数据表，测试用；每张表保持插入顺序
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    unique: Mutex<Vec<(Table, String)>>,
    failing: Mutex<HashSet<(Op, Table)>>,
    calls: Mutex<Vec<(Op, Table)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unique(self, table: Table, column: &str) -> Self {
        self.unique.lock().unwrap().push((table, column.to_string()));
        self
    }

    /// 直接写入一条记录，不计入调用记录
    pub fn seed(&self, table: Table, record: Value) -> Value {
        let record = fill_defaults(record);
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .push(record.clone());
        record
    }

    pub fn fail(&self, op: Op, table: Table) {
        self.failing.lock().unwrap().insert((op, table));
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self, op: Op, table: Table) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == (op, table))
            .count()
    }

    fn enter(&self, op: Op, table: Table) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push((op, table));
        if self.failing.lock().unwrap().contains(&(op, table)) {
            return Err(StoreError::Query(format!("{:?} {} 注入失败", op, table.name())));
        }
        Ok(())
    }
}

fn fill_defaults(mut record: Value) -> Value {
    if let Some(object) = record.as_object_mut() {
        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        object
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    }
    record
}

fn id_of(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn matches(record: &Value, filter: &Filter) -> bool {
    filter.conditions.iter().all(|condition| match condition {
        Condition::Eq { column, value } => record.get(column) == Some(value),
        Condition::Contains { column, needle } => record
            .get(column)
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    })
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(
        &self,
        table: Table,
        filter: &Filter,
        order: Option<&Order>,
        range: Option<Range>,
    ) -> Result<Vec<Value>, StoreError> {
        self.enter(Op::Select, table)?;
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|r| matches(r, filter))
            .collect();
        if let Some(order) = order {
            check_column(&order.column)?;
            // sort_by 是稳定排序，相同值保持插入顺序
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(range) = range {
            rows = rows.into_iter().skip(range.offset).take(range.limit).collect();
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        self.enter(Op::Insert, table)?;
        let record = fill_defaults(record);
        let unique = self.unique.lock().unwrap().clone();
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        for (t, column) in unique.iter().filter(|(t, _)| *t == table) {
            let value = record.get(column);
            if value.is_some() && rows.iter().any(|r| r.get(column) == value) {
                return Err(StoreError::Conflict(format!("{}.{}", t.name(), column)));
            }
        }
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<(), StoreError> {
        self.enter(Op::Update, table)?;
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|r| id_of(r) == Some(id))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", table.name(), id)))?;
        if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
            for (k, v) in changes {
                target.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.enter(Op::Delete, table)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| id_of(r) != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound(format!("{}/{}", table.name(), id)));
        }
        Ok(())
    }

    async fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        self.enter(Op::Count, table)?;
        Ok(self.rows(table).iter().filter(|r| matches(r, filter)).count() as u64)
    }
}
