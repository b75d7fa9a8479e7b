//! 管理后台登录节流。
//!
//! 连续失败 [`MAX_ATTEMPTS`] 次后锁定 [`COOLDOWN_MINUTES`] 分钟。状态保存在
//! 客户端作用域的键值槽位里，清掉槽位即可绕过，所以它只是体验层面的阻吓，
//! 不是安全边界。

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use super::slot::KeyValueSlot;
use super::types::LoginAttemptState;

pub const MAX_ATTEMPTS: u32 = 3;
pub const COOLDOWN_MINUTES: i64 = 5;
pub const STORAGE_KEY: &str = "admin_login_attempts";

pub const LOCKED_NOW_MESSAGE: &str =
    "Too many failed attempts. Your account has been locked for 5 minutes.";

pub fn cooldown() -> Duration {
    Duration::minutes(COOLDOWN_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePhase {
    Open,
    /// 只剩最后一次机会
    Warned,
    Locked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allowed,
    Locked { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn retry_after_ms(&self) -> Option<i64> {
        match self {
            Decision::Allowed => None,
            Decision::Locked { retry_after } => Some(retry_after.num_milliseconds()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureOutcome {
    pub failure_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub warning: Option<String>,
}

impl FailureOutcome {
    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some()
    }
}

/// 剩余时间向上取整到分钟
pub fn locked_message(retry_after: Duration) -> String {
    let ms = retry_after.num_milliseconds().max(1);
    let minutes = (ms + 59_999) / 60_000;
    format!(
        "Too many failed attempts. Please try again in {} minute{}.",
        minutes,
        if minutes > 1 { "s" } else { "" }
    )
}

fn warning_for(remaining: u32) -> Option<String> {
    match remaining {
        1 => Some("Warning: Only 1 attempt remaining before 5-minute suspension!".to_string()),
        2 => Some("Warning: 2 attempts remaining before suspension.".to_string()),
        _ => None,
    }
}

pub struct LoginThrottle<S: KeyValueSlot> {
    slot: S,
    state: LoginAttemptState,
}

impl<S: KeyValueSlot> LoginThrottle<S> {
    /// 从槽位恢复状态；内容损坏时按空状态处理，已过期的锁定立即解除
    pub fn load(slot: S, now: DateTime<Utc>) -> Self {
        let state = match slot.get(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<LoginAttemptState>(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!("登录尝试记录损坏，按空记录处理: {}", e);
                    LoginAttemptState::default()
                }
            },
            Ok(None) => LoginAttemptState::default(),
            Err(e) => {
                warn!("读取登录尝试记录失败，按空记录处理: {}", e);
                LoginAttemptState::default()
            }
        };

        let mut throttle = Self { slot, state };
        throttle.expire_if_due(now);
        throttle
    }

    pub fn state(&self) -> &LoginAttemptState {
        &self.state
    }

    pub fn phase(&self, now: DateTime<Utc>) -> ThrottlePhase {
        match self.state.locked_until {
            Some(until) if now < until => ThrottlePhase::Locked,
            _ if self.state.failure_count + 1 == MAX_ATTEMPTS => ThrottlePhase::Warned,
            _ => ThrottlePhase::Open,
        }
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.state
            .locked_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    /// 发起认证前调用；锁定期内直接拒绝
    pub fn check(&mut self, now: DateTime<Utc>) -> Decision {
        self.expire_if_due(now);
        match self.remaining(now) {
            Some(retry_after) => {
                debug!("登录被节流拒绝，剩余 {} 毫秒", retry_after.num_milliseconds());
                Decision::Locked { retry_after }
            }
            None => Decision::Allowed,
        }
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) -> FailureOutcome {
        if !self.check(now).is_allowed() {
            return FailureOutcome {
                failure_count: self.state.failure_count,
                locked_until: self.state.locked_until,
                warning: None,
            };
        }

        self.state.failure_count += 1;
        let count = self.state.failure_count;
        let warning = if count >= MAX_ATTEMPTS {
            let until = now + cooldown();
            self.state.locked_until = Some(until);
            warn!("登录失败 {} 次，锁定至 {}", count, until);
            None
        } else {
            warn!("登录失败，当前失败次数: {}", count);
            warning_for(MAX_ATTEMPTS - count)
        };
        self.persist();

        FailureOutcome {
            failure_count: count,
            locked_until: self.state.locked_until,
            warning,
        }
    }

    /// 登录成功，清空计数并删除持久化记录
    pub fn record_success(&mut self) {
        self.state = LoginAttemptState::default();
        if let Err(e) = self.slot.remove(STORAGE_KEY) {
            warn!("清除登录尝试记录失败: {}", e);
        }
        debug!("登录尝试记录已清除");
    }

    /// 锁定结束，回到初始状态
    pub fn reset(&mut self) {
        self.state = LoginAttemptState::default();
        self.persist();
        info!("登录锁定已解除");
    }

    fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.state.locked_until {
            Some(until) if now >= until => {
                self.reset();
                true
            }
            _ => false,
        }
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.state) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("序列化登录尝试记录失败: {}", e);
                return;
            }
        };
        if let Err(e) = self.slot.set(STORAGE_KEY, &raw) {
            warn!("保存登录尝试记录失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::slot::MemorySlot;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap()
    }

    fn stored(slot: &MemorySlot) -> Option<LoginAttemptState> {
        slot.get(STORAGE_KEY)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn failures_below_threshold_stay_open_and_count() {
        for n in 0..MAX_ATTEMPTS {
            let slot = Arc::new(MemorySlot::new());
            let mut throttle = LoginThrottle::load(slot.clone(), t0());
            for _ in 0..n {
                throttle.record_failure(t0());
            }
            assert_eq!(throttle.state().failure_count, n);
            assert_eq!(throttle.state().locked_until, None);
            assert!(throttle.check(t0()).is_allowed());
            assert_ne!(throttle.phase(t0()), ThrottlePhase::Locked);
        }
    }

    #[test]
    fn warnings_escalate_before_lock() {
        let mut throttle = LoginThrottle::load(MemorySlot::new(), t0());

        let first = throttle.record_failure(t0());
        assert_eq!(
            first.warning.as_deref(),
            Some("Warning: 2 attempts remaining before suspension.")
        );
        assert_eq!(throttle.phase(t0()), ThrottlePhase::Open);

        let second = throttle.record_failure(t0());
        assert_eq!(
            second.warning.as_deref(),
            Some("Warning: Only 1 attempt remaining before 5-minute suspension!")
        );
        assert_eq!(throttle.phase(t0()), ThrottlePhase::Warned);
    }

    #[test]
    fn third_failure_locks_for_cooldown() {
        let slot = Arc::new(MemorySlot::new());
        let mut throttle = LoginThrottle::load(slot.clone(), t0());
        throttle.record_failure(t0());
        throttle.record_failure(t0() + Duration::seconds(10));

        let third_at = t0() + Duration::seconds(20);
        let outcome = throttle.record_failure(third_at);

        assert!(outcome.is_locked());
        assert_eq!(outcome.warning, None);
        assert_eq!(outcome.locked_until, Some(third_at + Duration::minutes(5)));
        assert_eq!(throttle.phase(third_at), ThrottlePhase::Locked);
        assert_eq!(
            stored(&slot),
            Some(LoginAttemptState {
                failure_count: 3,
                locked_until: Some(third_at + Duration::minutes(5)),
            })
        );

        let decision = throttle.check(third_at + Duration::minutes(1));
        assert_eq!(decision.retry_after_ms(), Some(4 * 60 * 1000));
    }

    #[test]
    fn lock_boundary_is_inclusive_of_deadline() {
        let mut throttle = LoginThrottle::load(MemorySlot::new(), t0());
        for _ in 0..MAX_ATTEMPTS {
            throttle.record_failure(t0());
        }
        let until = t0() + cooldown();

        let just_before = throttle.check(until - Duration::milliseconds(1));
        assert_eq!(just_before.retry_after_ms(), Some(1));

        assert_eq!(throttle.check(until), Decision::Allowed);
        assert_eq!(throttle.state(), &LoginAttemptState::default());
    }

    #[test]
    fn failure_while_locked_does_not_extend_lock() {
        let mut throttle = LoginThrottle::load(MemorySlot::new(), t0());
        for _ in 0..MAX_ATTEMPTS {
            throttle.record_failure(t0());
        }
        let outcome = throttle.record_failure(t0() + Duration::minutes(2));
        assert_eq!(outcome.failure_count, MAX_ATTEMPTS);
        assert_eq!(outcome.locked_until, Some(t0() + cooldown()));
    }

    #[test]
    fn success_resets_and_clears_slot() {
        for n in 0..MAX_ATTEMPTS {
            let slot = Arc::new(MemorySlot::new());
            let mut throttle = LoginThrottle::load(slot.clone(), t0());
            for _ in 0..n {
                throttle.record_failure(t0());
            }
            throttle.record_success();
            assert_eq!(throttle.state(), &LoginAttemptState::default());
            assert_eq!(slot.get(STORAGE_KEY).unwrap(), None);
        }
    }

    #[test]
    fn state_survives_reload() {
        let slot = Arc::new(MemorySlot::new());
        {
            let mut throttle = LoginThrottle::load(slot.clone(), t0());
            throttle.record_failure(t0());
            throttle.record_failure(t0());
        }
        let reloaded = LoginThrottle::load(slot.clone(), t0() + Duration::hours(1));
        assert_eq!(reloaded.state().failure_count, 2);
        assert_eq!(reloaded.phase(t0()), ThrottlePhase::Warned);
    }

    #[test]
    fn expired_lock_is_cleared_on_load() {
        let slot = Arc::new(MemorySlot::new());
        let stale = LoginAttemptState {
            failure_count: 3,
            locked_until: Some(t0()),
        };
        slot.set(STORAGE_KEY, &serde_json::to_string(&stale).unwrap())
            .unwrap();

        let throttle = LoginThrottle::load(slot.clone(), t0() + Duration::seconds(1));
        assert_eq!(throttle.state(), &LoginAttemptState::default());
        assert_eq!(stored(&slot), Some(LoginAttemptState::default()));
    }

    #[test]
    fn corrupt_state_fails_open() {
        let slot = Arc::new(MemorySlot::new());
        slot.set(STORAGE_KEY, "{not json").unwrap();

        let mut throttle = LoginThrottle::load(slot.clone(), t0());
        assert_eq!(throttle.state(), &LoginAttemptState::default());
        assert!(throttle.check(t0()).is_allowed());
    }

    #[test]
    fn persisted_format_matches_browser_layout() {
        let state = LoginAttemptState {
            failure_count: 3,
            locked_until: Some(Utc.timestamp_millis_opt(1_700_000_300_000).unwrap()),
        };
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"count":3,"lockedUntil":1700000300000}"#
        );
        let empty: LoginAttemptState =
            serde_json::from_str(r#"{"count":0,"lockedUntil":null}"#).unwrap();
        assert_eq!(empty, LoginAttemptState::default());
    }

    #[test]
    fn locked_message_rounds_minutes_up() {
        assert_eq!(
            locked_message(Duration::minutes(5)),
            "Too many failed attempts. Please try again in 5 minutes."
        );
        assert_eq!(
            locked_message(Duration::seconds(61)),
            "Too many failed attempts. Please try again in 2 minutes."
        );
        assert_eq!(
            locked_message(Duration::milliseconds(1)),
            "Too many failed attempts. Please try again in 1 minute."
        );
    }
}
