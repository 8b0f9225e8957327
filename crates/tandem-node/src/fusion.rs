//! 传感器融合
//!
//! 本车有温度/光照传感器时总是使用本地读数；否则使用对端最近一次回传的数据，
//! 前提是它在有效期内（严格小于 `staleness`）；都没有时视为不可用。

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tandem_driver::EnvironmentSensors;
use tandem_protocol::{LightLevel, SensorPayload};

/// 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataOrigin {
    #[serde(rename = "LOCAL")]
    Local,
    #[serde(rename = "REMOTO")]
    Remote,
    #[default]
    #[serde(rename = "SIN_DATOS")]
    None,
}

impl DataOrigin {
    pub fn label(self) -> &'static str {
        match self {
            DataOrigin::Local => "LOCAL",
            DataOrigin::Remote => "REMOTO",
            DataOrigin::None => "SIN_DATOS",
        }
    }
}

impl std::fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 一次融合的结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FusedReading {
    pub temperature: Option<f32>,
    pub light: Option<LightLevel>,
    pub origin: DataOrigin,
}

#[derive(Debug, Clone, Copy)]
struct RemoteSample {
    payload: SensorPayload,
    received_at: Instant,
}

/// 传感器融合
pub struct SensorFusion<E> {
    local: Option<E>,
    remote: Option<RemoteSample>,
    staleness: Duration,
}

impl<E: EnvironmentSensors> SensorFusion<E> {
    pub fn new(local: Option<E>, staleness: Duration) -> Self {
        Self {
            local,
            remote: None,
            staleness,
        }
    }

    pub fn has_local_sensors(&self) -> bool {
        self.local.is_some()
    }

    /// 记录对端回传的数据
    pub fn record_remote(&mut self, payload: SensorPayload, now: Instant) {
        self.remote = Some(RemoteSample {
            payload,
            received_at: now,
        });
    }

    /// 读取本地传感器（没有时为 `None`）
    pub fn local_reading(&mut self) -> Option<SensorPayload> {
        let sensors = self.local.as_mut()?;
        Some(SensorPayload {
            temperature: sensors.read_temperature(),
            light: sensors.read_light(),
        })
    }

    /// 有效期内的对端数据
    fn fresh_remote(&self, now: Instant) -> Option<SensorPayload> {
        self.remote
            .filter(|r| now.saturating_duration_since(r.received_at) < self.staleness)
            .map(|r| r.payload)
    }

    pub fn current_temperature(&mut self, now: Instant) -> Option<f32> {
        match self.local.as_mut() {
            Some(sensors) => Some(sensors.read_temperature()),
            None => self.fresh_remote(now).map(|p| p.temperature),
        }
    }

    pub fn current_light(&mut self, now: Instant) -> Option<LightLevel> {
        match self.local.as_mut() {
            Some(sensors) => Some(sensors.read_light()),
            None => self.fresh_remote(now).map(|p| p.light),
        }
    }

    pub fn data_origin(&self, now: Instant) -> DataOrigin {
        if self.local.is_some() {
            DataOrigin::Local
        } else if self.fresh_remote(now).is_some() {
            DataOrigin::Remote
        } else {
            DataOrigin::None
        }
    }

    /// 一次性读取温度、光照与来源
    pub fn read(&mut self, now: Instant) -> FusedReading {
        if let Some(local) = self.local_reading() {
            return FusedReading {
                temperature: Some(local.temperature),
                light: Some(local.light),
                origin: DataOrigin::Local,
            };
        }
        match self.fresh_remote(now) {
            Some(remote) => FusedReading {
                temperature: Some(remote.temperature),
                light: Some(remote.light),
                origin: DataOrigin::Remote,
            },
            None => FusedReading::default(),
        }
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }
}
