//! 单调时钟
//!
//! 所有限频、超时与助推延时都经由 [`Clock`] 取时间和等待，
//! 测试与仿真使用 [`ManualClock`] 获得确定性的时间线。

use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock {
    fn now(&self) -> Instant;

    /// 阻塞等待（手动时钟直接推进时间）
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// 系统单调时钟
///
/// 短延时（10 ms 采样间隔、100 ms 助推）使用 `spin_sleep`，
/// 避免操作系统调度粒度带来的偏差。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        spin_sleep::sleep(duration);
    }
}

/// 手动推进的时钟
///
/// 克隆共享同一时间线；`sleep` 立即返回并把时间推进相应长度。
#[cfg(feature = "mock")]
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: std::sync::Arc<parking_lot::Mutex<Instant>>,
}

#[cfg(feature = "mock")]
impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: std::sync::Arc::new(parking_lot::Mutex::new(start)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

#[cfg(feature = "mock")]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "mock")]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_sleep() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now().duration_since(start) >= Duration::from_millis(5));
    }

    #[cfg(feature = "mock")]
    #[test]
    fn test_manual_clock_shared_timeline() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::from_millis(150));
        clock.sleep(Duration::from_millis(50));

        assert_eq!(clock.now() - start, Duration::from_millis(200));
        assert_eq!(handle.now(), clock.now());
    }
}
