use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use super::jwt::{generate_token, validate_token, TOKEN_LIFETIME_HOURS};
use super::types::{AdminUser, Session};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("Authentication service unavailable")]
    Backend(String),
}

/// 身份提供方，登录节流包在它外面
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;

    async fn current_user(&self, token: &str) -> Result<Option<AdminUser>, AuthError>;
}

/// admin_users 表 + bcrypt + JWT
pub struct PostgresIdentity {
    pool: PgPool,
    jwt_secret: String,
    token_blacklist: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl PostgresIdentity {
    pub fn new(pool: PgPool, jwt_secret: &str) -> Self {
        info!("初始化身份提供方");
        Self {
            pool,
            jwt_secret: jwt_secret.to_string(),
            token_blacklist: Mutex::new(HashMap::new()),
        }
    }

    pub fn hash_password(password: &str) -> Result<String, String> {
        debug!("加密密码");
        hash(password.as_bytes(), DEFAULT_COST).map_err(|e| {
            error!("密码加密失败: {}", e);
            format!("密码加密失败: {}", e)
        })
    }

    fn is_token_blacklisted(&self, token: &str) -> bool {
        let blacklist = self
            .token_blacklist
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        blacklist.contains_key(token)
    }

    pub fn cleanup_expired_tokens(&self) {
        debug!("清理过期的 token");
        let mut blacklist = self
            .token_blacklist
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let before_count = blacklist.len();
        let lifetime = Duration::hours(TOKEN_LIFETIME_HOURS);
        blacklist.retain(|_, at| Utc::now() - *at <= lifetime);
        info!("清理了 {} 个过期的 token", before_count - blacklist.len());
    }
}

#[async_trait]
impl IdentityProvider for PostgresIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        debug!("管理员登录: {}", email);
        let row = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, email, password_hash FROM admin_users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("数据库查询错误: {}", e);
            AuthError::Backend(e.to_string())
        })?;

        let Some((id, email, password_hash)) = row else {
            warn!("管理员 {} 不存在", email);
            return Err(AuthError::InvalidCredentials);
        };

        let valid = verify(password, &password_hash).map_err(|e| {
            error!("密码验证过程出错: {}", e);
            AuthError::Backend(e.to_string())
        })?;
        if !valid {
            warn!("管理员 {} 密码错误", email);
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, expires_at) = generate_token(&self.jwt_secret, &id, &email)
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        info!("管理员 {} 登录成功", email);

        Ok(Session {
            access_token,
            user: AdminUser { id, email },
            expires_at,
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let mut blacklist = self
            .token_blacklist
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        blacklist.insert(token.to_string(), Utc::now());
        info!("Token 已加入黑名单");
        Ok(())
    }

    async fn current_user(&self, token: &str) -> Result<Option<AdminUser>, AuthError> {
        if self.is_token_blacklisted(token) {
            warn!("Token 已失效");
            return Ok(None);
        }
        match validate_token(&self.jwt_secret, token) {
            Ok(claims) => Ok(Some(AdminUser {
                id: claims.sub,
                email: claims.email,
            })),
            Err(e) => {
                warn!("Token 验证失败: {}", e);
                Ok(None)
            }
        }
    }
}
