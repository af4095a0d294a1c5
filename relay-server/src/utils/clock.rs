//! Clock seam — TTL 窗口与延迟任务的时间源
//!
//! 对账核心的所有窗口（快照 TTL、配对有效期、延迟关联、冷却）都
//! 通过 [`Clock`] 取时间，生产环境用 [`SystemClock`]，
//! 测试用 [`ManualClock`] 确定性推进。

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

#[async_trait]
pub trait Clock: Send + Sync {
    /// 当前 UTC 时间戳（毫秒）
    fn now_millis(&self) -> i64;

    /// 挂起指定时长
    async fn sleep(&self, duration: Duration);
}

/// 真实时钟
#[derive(Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        shared::util::now_millis()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// 手动时钟 — 集成测试用
///
/// `advance()` 推进时间并唤醒所有 sleep 等待者；
/// 等待者醒来后重新检查 deadline，未到继续等。
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<i64>,
    notify: Notify,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Mutex::new(start_millis),
            notify: Notify::new(),
        }
    }

    /// 推进时间
    pub fn advance(&self, millis: i64) {
        *self.now.lock() += millis;
        self.notify.notify_waiters();
    }

    /// 直接设置时间
    pub fn set(&self, millis: i64) {
        *self.now.lock() = millis;
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        let deadline = self.now_millis() + duration.as_millis() as i64;
        loop {
            // 先注册再检查，避免注册间隙丢失 advance 的通知
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.now_millis() >= deadline {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_manual_clock_advance() {
        let clock = Arc::new(ManualClock::new(1_000));
        assert_eq!(clock.now_millis(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now_millis(), 1_500);
    }

    #[tokio::test]
    async fn test_manual_sleep_wakes_after_advance() {
        let clock = Arc::new(ManualClock::new(0));
        let sleeper = {
            let clock = Arc::clone(&clock);
            tokio::spawn(async move {
                clock.sleep(Duration::from_millis(10_000)).await;
            })
        };
        // 让 sleeper 先注册等待
        tokio::task::yield_now().await;
        assert!(!sleeper.is_finished());

        clock.advance(9_999);
        tokio::task::yield_now().await;
        assert!(!sleeper.is_finished());

        clock.advance(1);
        sleeper.await.unwrap();
    }
}
