use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("状态读写失败: {0}")]
    Io(String),

    #[error("状态存储锁已失效")]
    Poisoned,
}

/// 本地持久化的键值槽位，用来跨页面刷新保留登录失败计数
pub trait KeyValueSlot: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SlotError>;
    fn remove(&self, key: &str) -> Result<(), SlotError>;
}

impl<T: KeyValueSlot + ?Sized> KeyValueSlot for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        (**self).remove(key)
    }
}

#[derive(Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueSlot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        let values = self.values.lock().map_err(|_| SlotError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        let mut values = self.values.lock().map_err(|_| SlotError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        let mut values = self.values.lock().map_err(|_| SlotError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// 每个键一个文件，重启后仍然保留
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SlotError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SlotError::Io(e.to_string()))?;
        debug!("使用文件状态目录: {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        static UNSAFE: OnceLock<Regex> = OnceLock::new();
        let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]").expect("slot key pattern"));
        self.dir.join(format!("{}.json", re.replace_all(key, "_")))
    }
}

impl KeyValueSlot for FileSlot {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SlotError::Io(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        fs::write(self.path_for(key), value).map_err(|e| SlotError::Io(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("删除状态文件失败: {}", e);
                Err(SlotError::Io(e.to_string()))
            }
        }
    }
}

/// 按客户端隔离同一个底层槽位，相当于每个浏览器一份 localStorage
#[derive(Clone)]
pub struct ScopedSlot {
    inner: Arc<dyn KeyValueSlot>,
    scope: String,
}

impl ScopedSlot {
    pub fn new(inner: Arc<dyn KeyValueSlot>, scope: &str) -> Self {
        Self {
            inner,
            scope: scope.to_string(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{}", self.scope, key)
    }
}

impl KeyValueSlot for ScopedSlot {
    fn get(&self, key: &str) -> Result<Option<String>, SlotError> {
        self.inner.get(&self.scoped(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SlotError> {
        self.inner.set(&self.scoped(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        self.inner.remove(&self.scoped(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_slots_do_not_see_each_other() {
        let shared: Arc<dyn KeyValueSlot> = Arc::new(MemorySlot::new());
        let a = ScopedSlot::new(shared.clone(), "client-a");
        let b = ScopedSlot::new(shared.clone(), "client-b");

        a.set("admin_login_attempts", "{\"count\":2,\"lockedUntil\":null}")
            .unwrap();

        assert!(a.get("admin_login_attempts").unwrap().is_some());
        assert_eq!(b.get("admin_login_attempts").unwrap(), None);
        assert!(shared
            .get("client-a:admin_login_attempts")
            .unwrap()
            .is_some());
    }

    #[test]
    fn file_slot_round_trips_and_removes() {
        let dir = std::env::temp_dir().join(format!("patchtern-slot-{}", uuid::Uuid::new_v4()));
        let slot = FileSlot::new(&dir).unwrap();

        slot.set("c1:admin_login_attempts", "{}").unwrap();
        assert_eq!(
            slot.get("c1:admin_login_attempts").unwrap().as_deref(),
            Some("{}")
        );
        assert!(dir.join("c1_admin_login_attempts.json").exists());

        slot.remove("c1:admin_login_attempts").unwrap();
        assert_eq!(slot.get("c1:admin_login_attempts").unwrap(), None);
        slot.remove("c1:admin_login_attempts").unwrap();
        let _ = fs::remove_dir_all(dir);
    }
}
