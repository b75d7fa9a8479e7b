use chrono::{DateTime, Utc};
use log::{debug, info};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

const TICK: Duration = Duration::from_secs(1);

/// 锁定倒计时：每秒刷新一次剩余时间，到点时触发回调并归零。
/// 丢弃句柄即取消任务。
pub struct LockoutCountdown {
    remaining: watch::Receiver<Duration>,
    task: JoinHandle<()>,
}

impl LockoutCountdown {
    pub fn start<F>(locked_until: DateTime<Utc>, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let left = (locked_until - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        Self::start_in(left, on_expire)
    }

    /// 以单调时钟计时，避免墙钟跳变影响倒计时
    pub fn start_in<F>(left: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + left;
        let (tx, rx) = watch::channel(left);

        let task = tokio::spawn(async move {
            loop {
                let left = deadline.saturating_duration_since(Instant::now());
                // 只有接收端全部 drop 时才会失败，此时句柄已被丢弃
                let _ = tx.send(left);
                if left.is_zero() {
                    break;
                }
                sleep_until(std::cmp::min(Instant::now() + TICK, deadline)).await;
            }
            info!("锁定倒计时结束");
            on_expire();
        });
        debug!("启动锁定倒计时，剩余 {} 秒", left.as_secs());

        Self {
            remaining: rx,
            task,
        }
    }

    pub fn remaining(&self) -> Duration {
        *self.remaining.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn cancel(self) {
        // Drop 中 abort
    }
}

impl Drop for LockoutCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 倒计时展示格式 M:SS
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
