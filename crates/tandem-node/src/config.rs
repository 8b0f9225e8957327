//! # 节点配置
//!
//! TOML 格式，所有字段都有默认值，缺省的段落或字段按默认值补齐：
//!
//! ```toml
//! [node]
//! name = "coche-a"
//! start_role = "master"
//! peer = "AA:BB:CC:DD:EE:02"
//! auto_mode = true
//!
//! [control]
//! law = "piecewise"
//! dead_zone_min_cm = 15.0
//! dead_zone_max_cm = 20.0
//! kp = 8.0
//! ```
//!
//! 配置文件路径由调用方决定；CLI 默认使用 `<config_dir>/tandem/node.toml`。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tandem_control::{ControlError, ControlLaw, DeadZone, MotionController};
use tandem_driver::{DriveConfig, FilterConfig};
use tandem_link::PeerId;
use tandem_protocol::Role;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<ControlError> for ConfigError {
    fn from(err: ControlError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// 节点配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub control: ControlSection,
    pub sensing: SensingSection,
    pub link: LinkSection,
    pub drive: DriveSection,
    pub lights: LightsSection,
}

impl NodeConfig {
    /// 从 TOML 文件加载并校验
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存为 TOML（自动创建父目录）
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.controller()?;

        if self.sensing.samples_per_pass == 0 {
            return Err(ConfigError::Invalid(
                "sensing.samples_per_pass must be at least 1".to_string(),
            ));
        }
        if self.sensing.staleness_ms == 0 {
            return Err(ConfigError::Invalid(
                "sensing.staleness_ms must be positive".to_string(),
            ));
        }
        if self.node.name.trim().is_empty() {
            return Err(ConfigError::Invalid("node.name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// `[node]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    pub name: String,
    pub start_role: Role,
    /// 对端站点地址
    pub peer: PeerId,
    /// 上电时是否处于自动距离控制
    pub auto_mode: bool,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            name: "coche-a".to_string(),
            start_role: Role::Master,
            peer: PeerId::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x02]),
            auto_mode: true,
        }
    }
}

/// 控制律选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LawKind {
    Proportional,
    #[default]
    Piecewise,
}

/// `[control]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSection {
    pub law: LawKind,
    pub dead_zone_min_cm: f32,
    pub dead_zone_max_cm: f32,
    /// 比例增益（仅 `law = "proportional"` 时使用）
    pub kp: f32,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            law: LawKind::Piecewise,
            dead_zone_min_cm: 15.0,
            dead_zone_max_cm: 20.0,
            kp: 8.0,
        }
    }
}

impl ControlSection {
    pub fn controller(&self) -> Result<MotionController, ControlError> {
        let dead_zone = DeadZone::new(self.dead_zone_min_cm, self.dead_zone_max_cm)?;
        let law = match self.law {
            LawKind::Proportional => ControlLaw::proportional(self.kp)?,
            LawKind::Piecewise => ControlLaw::Piecewise,
        };
        Ok(MotionController::new(law, dead_zone))
    }
}

/// `[sensing]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensingSection {
    pub sample_interval_ms: u64,
    pub samples_per_pass: usize,
    pub sample_pause_ms: u64,
    /// 对端数据的有效期
    pub staleness_ms: u64,
}

impl Default for SensingSection {
    fn default() -> Self {
        Self {
            sample_interval_ms: 200,
            samples_per_pass: 5,
            sample_pause_ms: 10,
            staleness_ms: 5000,
        }
    }
}

impl SensingSection {
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            samples_per_pass: self.samples_per_pass,
            sample_pause: Duration::from_millis(self.sample_pause_ms),
        }
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }
}

/// `[link]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSection {
    /// 两次数据发送的最小间隔
    pub min_send_interval_ms: u64,
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            min_send_interval_ms: 100,
        }
    }
}

impl LinkSection {
    pub fn min_send_interval(&self) -> Duration {
        Duration::from_millis(self.min_send_interval_ms)
    }
}

/// `[drive]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSection {
    pub boost_pwm: u8,
    pub boost_settle_ms: u64,
}

impl Default for DriveSection {
    fn default() -> Self {
        Self {
            boost_pwm: 210,
            boost_settle_ms: 100,
        }
    }
}

impl DriveSection {
    pub fn drive_config(&self) -> DriveConfig {
        DriveConfig {
            boost_magnitude: self.boost_pwm,
            boost_settle: Duration::from_millis(self.boost_settle_ms),
        }
    }
}

/// `[lights]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsSection {
    /// 上电时是否自动控制灯光
    pub auto: bool,
}

impl Default for LightsSection {
    fn default() -> Self {
        Self { auto: true }
    }
}
