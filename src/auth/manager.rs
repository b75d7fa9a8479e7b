use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::countdown::{format_countdown, LockoutCountdown};
use super::identity::{AuthError, IdentityProvider};
use super::slot::{KeyValueSlot, ScopedSlot};
use super::throttle::{locked_message, Decision, LoginThrottle, LOCKED_NOW_MESSAGE};
use super::types::{AdminUser, Session};

#[derive(Debug, Clone, PartialEq)]
pub enum LoginFailure {
    /// 输入不完整，没有发起认证
    Invalid { message: String },
    /// 锁定期内本地拒绝，没有发起认证
    Locked { message: String, retry_after_ms: i64 },
    /// 身份提供方拒绝，可能附带剩余次数提醒
    Rejected {
        message: String,
        warning: Option<String>,
        locked: bool,
    },
}

impl LoginFailure {
    pub fn message(&self) -> &str {
        match self {
            LoginFailure::Invalid { message }
            | LoginFailure::Locked { message, .. }
            | LoginFailure::Rejected { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LockStatus {
    pub locked: bool,
    pub remaining_ms: u64,
    pub countdown: String,
}

pub struct AuthManager {
    identity: Arc<dyn IdentityProvider>,
    slots: Arc<dyn KeyValueSlot>,
    countdowns: Mutex<HashMap<String, LockoutCountdown>>,
    // 同一客户端的登录请求串行执行：读取计数、认证、写回计数之间不能交错
    client_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AuthManager {
    pub fn new(identity: Arc<dyn IdentityProvider>, slots: Arc<dyn KeyValueSlot>) -> Self {
        info!("初始化认证管理器");
        Self {
            identity,
            slots,
            countdowns: Mutex::new(HashMap::new()),
            client_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        self.identity.clone()
    }

    fn client_lock(&self, client_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.client_locks.lock().unwrap_or_else(|e| e.into_inner());
        // 没有其他请求持有的锁可以回收
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(client_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn throttle_for(&self, client_id: &str) -> LoginThrottle<ScopedSlot> {
        LoginThrottle::load(ScopedSlot::new(self.slots.clone(), client_id), Utc::now())
    }

    /// 经过节流的登录。锁定期内不会调用身份提供方。
    pub async fn login(
        &self,
        client_id: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, LoginFailure> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(LoginFailure::Invalid {
                message: "Email and password are required".to_string(),
            });
        }

        let lock = self.client_lock(client_id);
        let _serialized = lock.lock().await;

        let mut throttle = self.throttle_for(client_id);
        if let Decision::Locked { retry_after } = throttle.check(Utc::now()) {
            warn!("客户端 {} 处于锁定期，拒绝登录", client_id);
            return Err(LoginFailure::Locked {
                message: locked_message(retry_after),
                retry_after_ms: retry_after.num_milliseconds(),
            });
        }

        debug!("客户端 {} 尝试登录: {}", client_id, email);
        match self.identity.sign_in(email, password).await {
            Ok(session) => {
                throttle.record_success();
                self.cancel_countdown(client_id);
                info!("管理员 {} 登录成功", session.user.email);
                Ok(session)
            }
            Err(e) => {
                let outcome = throttle.record_failure(Utc::now());
                if let Some(until) = outcome.locked_until {
                    self.start_countdown(client_id, until);
                    return Err(LoginFailure::Rejected {
                        message: LOCKED_NOW_MESSAGE.to_string(),
                        warning: None,
                        locked: true,
                    });
                }
                Err(LoginFailure::Rejected {
                    message: e.to_string(),
                    warning: outcome.warning,
                    locked: false,
                })
            }
        }
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.identity.sign_out(token).await
    }

    pub async fn current_user(&self, token: &str) -> Result<Option<AdminUser>, AuthError> {
        self.identity.current_user(token).await
    }

    /// 当前锁定状态；有倒计时的用倒计时的值，否则按持久化记录计算
    pub fn lock_status(&self, client_id: &str) -> LockStatus {
        let live = {
            let mut countdowns = self.countdowns.lock().unwrap_or_else(|e| e.into_inner());
            countdowns.retain(|_, c| !c.is_finished());
            countdowns.get(client_id).map(|c| c.remaining())
        };

        let remaining = match live {
            Some(left) => left,
            None => self
                .throttle_for(client_id)
                .remaining(Utc::now())
                .and_then(|d| d.to_std().ok())
                .unwrap_or_default(),
        };

        LockStatus {
            locked: !remaining.is_zero(),
            remaining_ms: remaining.as_millis() as u64,
            countdown: format_countdown(remaining),
        }
    }

    fn start_countdown(&self, client_id: &str, until: chrono::DateTime<Utc>) {
        let slot = ScopedSlot::new(self.slots.clone(), client_id);
        let countdown = LockoutCountdown::start(until, move || {
            LoginThrottle::load(slot, Utc::now()).reset();
        });
        let mut countdowns = self.countdowns.lock().unwrap_or_else(|e| e.into_inner());
        countdowns.retain(|_, c| !c.is_finished());
        // 替换旧的倒计时，旧句柄在 drop 时被取消
        countdowns.insert(client_id.to_string(), countdown);
    }

    fn cancel_countdown(&self, client_id: &str) {
        let mut countdowns = self.countdowns.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(countdown) = countdowns.remove(client_id) {
            countdown.cancel();
        }
    }
}
