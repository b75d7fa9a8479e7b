use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // admin id
    pub exp: usize,  // expiration time
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: AdminUser,
    pub expires_at: DateTime<Utc>,
}

/// 登录失败计数，序列化格式与浏览器端保存的一致：
/// `{"count": 2, "lockedUntil": 1700000000000}`
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct LoginAttemptState {
    #[serde(rename = "count")]
    pub failure_count: u32,
    #[serde(rename = "lockedUntil", with = "chrono::serde::ts_milliseconds_option")]
    pub locked_until: Option<DateTime<Utc>>,
}
