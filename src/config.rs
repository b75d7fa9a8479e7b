use log::{info, warn};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("缺少环境变量: {0}")]
    Missing(&'static str),

    #[error("环境变量 {key} 无效: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// 应用配置，全部来自环境变量（.env 由 dotenv 预先加载）
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub upload_dir: PathBuf,
    pub public_media_url: String,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub throttle_state_dir: Option<PathBuf>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 8080)?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 5)?,
            upload_dir: optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            public_media_url: optional("PUBLIC_MEDIA_URL").unwrap_or_else(|| "/media".to_string()),
            log_dir: optional("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            log_level: optional("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
            throttle_state_dir: optional("THROTTLE_STATE_DIR").map(PathBuf::from),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parsed<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("环境变量 {} 解析失败: {}", key, e);
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{} 未设置，使用默认值: {}", key, default);
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_falls_back_to_default_when_unset() {
        let value: u16 = parsed("PATCHTERN_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn parsed_rejects_garbage() {
        env::set_var("PATCHTERN_TEST_BAD_PORT", "eighty");
        let result: Result<u16, _> = parsed("PATCHTERN_TEST_BAD_PORT", 8080);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "PATCHTERN_TEST_BAD_PORT",
                ..
            })
        ));
    }

    #[test]
    fn required_reports_missing_key() {
        let err = required("PATCHTERN_TEST_MISSING_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PATCHTERN_TEST_MISSING_SECRET")));
    }
}
