use log::{debug, info};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::model::{HeroImage, HeroSettings};
use super::selector::{advance, current_image};

/// 轮播定时任务句柄。`stop` 或 drop 都会取消任务。
pub struct RotationHandle {
    task: JoinHandle<()>,
}

impl RotationHandle {
    pub fn stop(self) {}

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for RotationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 启动轮播：每隔 interval_ms 推进一次索引。少于两张图时不启动。
pub fn start_rotation(
    index: Arc<AtomicUsize>,
    image_count: usize,
    interval_ms: u64,
) -> Option<RotationHandle> {
    if image_count <= 1 || interval_ms == 0 {
        return None;
    }
    let period = Duration::from_millis(interval_ms);
    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // 闭包总是返回 Some，fetch_update 不会失败
            let _ = index.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| {
                Some(advance(i, image_count))
            });
        }
    });
    debug!("启动轮播定时器: {} 张图片, 间隔 {} 毫秒", image_count, interval_ms);
    Some(RotationHandle { task })
}

/// 首页轮播的运行时状态。同一时刻最多只有一个定时器在推进索引。
pub struct HeroCarousel {
    settings: HeroSettings,
    images: Vec<HeroImage>,
    index: Arc<AtomicUsize>,
    timer: Option<RotationHandle>,
}

impl HeroCarousel {
    pub fn new() -> Self {
        Self {
            settings: HeroSettings::default(),
            images: Vec::new(),
            index: Arc::new(AtomicUsize::new(0)),
            timer: None,
        }
    }

    /// 设置或图片变化后调用：先停掉旧定时器，再按新参数重启
    pub fn configure(&mut self, settings: HeroSettings, images: Vec<HeroImage>) {
        self.stop();

        if images != self.images {
            self.index.store(0, Ordering::SeqCst);
        }
        self.settings = settings;
        self.images = images;

        if self.settings.rotation_enabled {
            self.timer = start_rotation(
                self.index.clone(),
                self.images.len(),
                self.settings.transition_interval_ms,
            );
        }
        info!(
            "轮播已重新配置: 轮播={}, 图片数={}, 间隔={} 毫秒",
            self.settings.rotation_enabled,
            self.images.len(),
            self.settings.transition_interval_ms
        );
    }

    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
            debug!("轮播定时器已停止");
        }
    }

    pub fn current_image(&self) -> &str {
        current_image(&self.settings, &self.images, self.rotation_index())
    }

    pub fn rotation_index(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn is_rotating(&self) -> bool {
        self.timer.as_ref().map(|t| t.is_running()).unwrap_or(false)
    }

    pub fn settings(&self) -> &HeroSettings {
        &self.settings
    }
}

impl Default for HeroCarousel {
    fn default() -> Self {
        Self::new()
    }
}
