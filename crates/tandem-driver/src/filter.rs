//! 测距滤波
//!
//! 超声波传感器噪声大且单次测量最长阻塞约 30 ms，因此：
//! - 两次采样轮之间至少间隔 `sample_interval`（期间直接返回缓存值）
//! - 每轮连续采样 `samples_per_pass` 次，剔除 `(2, 400)` cm 之外的值后取平均
//! - 一轮内没有有效值时保留上次结果；从未有过有效值时按"远"处理（400 cm）

use crate::clock::Clock;
use crate::hal::RangeSensor;
use std::time::{Duration, Instant};
use tracing::trace;

/// 有效距离下限（不含）
pub const MIN_VALID_CM: f32 = 2.0;
/// 有效距离上限（不含）；同时是没有任何读数时的默认值
pub const MAX_VALID_CM: f32 = 400.0;

/// 声速换算系数（cm/µs），往返距离需再除以 2
const SOUND_CM_PER_US: f64 = 0.034;

/// 回波脉宽 → 厘米
pub fn echo_to_cm(echo: Duration) -> f32 {
    (echo.as_secs_f64() * 1_000_000.0 * SOUND_CM_PER_US / 2.0) as f32
}

/// 厘米 → 回波脉宽（仿真用）
pub fn cm_to_echo(cm: f32) -> Duration {
    Duration::from_secs_f64((cm.max(0.0) as f64) * 2.0 / SOUND_CM_PER_US / 1_000_000.0)
}

/// 滤波参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    /// 两轮采样的最小间隔（严格大于才重新采样）
    pub sample_interval: Duration,
    pub samples_per_pass: usize,
    /// 同一轮内相邻两次采样之间的停顿
    pub sample_pause: Duration,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(200),
            samples_per_pass: 5,
            sample_pause: Duration::from_millis(10),
        }
    }
}

/// 带时间戳的距离读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceReading {
    pub value_cm: f32,
    pub measured_at: Instant,
}

/// 测距滤波器
pub struct SensorFilter<S> {
    sensor: S,
    config: FilterConfig,
    last: Option<DistanceReading>,
    last_pass: Option<Instant>,
}

impl<S: RangeSensor> SensorFilter<S> {
    pub fn new(sensor: S, config: FilterConfig) -> Self {
        Self {
            sensor,
            config,
            last: None,
            last_pass: None,
        }
    }

    /// 读取滤波后的距离（cm）
    ///
    /// 距上一轮采样不足 `sample_interval` 时直接返回缓存值。
    pub fn read_distance(&mut self, clock: &impl Clock) -> f32 {
        let now = clock.now();
        let due = self
            .last_pass
            .is_none_or(|t| now.saturating_duration_since(t) > self.config.sample_interval);

        if due {
            self.last_pass = Some(now);
            let value_cm = match self.sample_pass(clock) {
                Some(avg) => avg,
                None => self.last.map_or(MAX_VALID_CM, |r| r.value_cm),
            };
            self.last = Some(DistanceReading {
                value_cm,
                measured_at: now,
            });
        }

        self.distance_cm()
    }

    /// 一轮采样；没有有效值时返回 `None`
    fn sample_pass(&mut self, clock: &impl Clock) -> Option<f32> {
        let mut sum = 0.0f32;
        let mut valid = 0usize;

        for i in 0..self.config.samples_per_pass {
            if i > 0 {
                clock.sleep(self.config.sample_pause);
            }
            let Some(echo) = self.sensor.read_echo() else {
                continue;
            };
            let cm = echo_to_cm(echo);
            if cm > MIN_VALID_CM && cm < MAX_VALID_CM {
                sum += cm;
                valid += 1;
            }
        }

        trace!(
            "Distance pass: {}/{} valid samples",
            valid, self.config.samples_per_pass
        );

        (valid > 0).then(|| sum / valid as f32)
    }

    /// 缓存的距离；尚未采样时为 400 cm
    pub fn distance_cm(&self) -> f32 {
        self.last.map_or(MAX_VALID_CM, |r| r.value_cm)
    }

    pub fn last_reading(&self) -> Option<DistanceReading> {
        self.last
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::collections::VecDeque;

    /// 按脚本返回读数（cm），脚本耗尽后返回 `None`
    struct Script(VecDeque<Option<f32>>);

    impl Script {
        fn new(values: &[Option<f32>]) -> Self {
            Self(values.iter().copied().collect())
        }
    }

    impl RangeSensor for Script {
        fn read_echo(&mut self) -> Option<Duration> {
            self.0.pop_front().flatten().map(cm_to_echo)
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_echo_conversion() {
        // 1000 µs → 17 cm
        assert!(approx(echo_to_cm(Duration::from_micros(1000)), 17.0));
        assert!(approx(echo_to_cm(cm_to_echo(42.5)), 42.5));
    }

    #[test]
    fn test_average_discards_out_of_range() {
        let clock = ManualClock::new();
        let script = Script::new(&[Some(10.0), Some(1.0), Some(12.0), Some(450.0), None]);
        let mut filter = SensorFilter::new(script, FilterConfig::default());

        assert!(approx(filter.read_distance(&clock), 11.0));
    }

    #[test]
    fn test_pass_pauses_between_samples() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut filter = SensorFilter::new(Script::new(&[]), FilterConfig::default());

        filter.read_distance(&clock);
        // 5 次采样之间 4 次停顿
        assert_eq!(clock.now() - start, Duration::from_millis(40));
    }

    #[test]
    fn test_no_reading_defaults_to_far() {
        let clock = ManualClock::new();
        let mut filter = SensorFilter::new(Script::new(&[]), FilterConfig::default());

        assert_eq!(filter.distance_cm(), 400.0);
        assert_eq!(filter.read_distance(&clock), 400.0);
        assert!(filter.last_reading().is_some());
    }

    #[test]
    fn test_rate_limit_is_strictly_greater() {
        let clock = ManualClock::new();
        let script = Script::new(&[
            Some(30.0),
            Some(30.0),
            Some(30.0),
            Some(30.0),
            Some(30.0),
            Some(50.0),
            Some(50.0),
            Some(50.0),
            Some(50.0),
            Some(50.0),
        ]);
        let mut filter = SensorFilter::new(script, FilterConfig::default());
        let start = clock.now();

        assert!(approx(filter.read_distance(&clock), 30.0));

        // 恰好 200 ms：仍返回缓存
        clock.advance(start + Duration::from_millis(200) - clock.now());
        assert!(approx(filter.read_distance(&clock), 30.0));

        clock.advance(Duration::from_millis(1));
        assert!(approx(filter.read_distance(&clock), 50.0));
    }

    #[test]
    fn test_invalid_pass_keeps_last_value() {
        let clock = ManualClock::new();
        let script = Script::new(&[Some(25.0), Some(25.0), Some(25.0), Some(25.0), Some(25.0)]);
        let mut filter = SensorFilter::new(script, FilterConfig::default());

        assert!(approx(filter.read_distance(&clock), 25.0));
        clock.advance(Duration::from_millis(500));
        // 脚本耗尽，整轮无效
        assert!(approx(filter.read_distance(&clock), 25.0));
    }
}
