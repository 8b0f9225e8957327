//! 协议共享类型
//!
//! 节点角色、运动状态、光照等级与轮速命令。所有文本标签只在报文和展示层出现，
//! 内部一律使用枚举。

use crate::ProtocolError;

/// 单轮速度上限（PWM 满量程）
pub const MAX_WHEEL_VELOCITY: i32 = 255;

/// 节点角色
///
/// - **Master**：读取距离传感器、计算运动并驱动电机，同时把命令转发给对端
/// - **Slave**：执行收到的运动命令，并回传本地传感器数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    #[default]
    Master,
    Slave,
}

impl Role {
    /// 对端应当采用的角色
    pub fn complement(self) -> Self {
        match self {
            Role::Master => Role::Slave,
            Role::Slave => Role::Master,
        }
    }

    pub fn is_master(self) -> bool {
        self == Role::Master
    }

    /// 报文/展示层文本
    pub fn label(self) -> &'static str {
        match self {
            Role::Master => "MAESTRO",
            Role::Slave => "ESCLAVO",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "MAESTRO" => Some(Role::Master),
            "ESCLAVO" => Some(Role::Slave),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 运动状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionState {
    /// 处于死区内，电机停止
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "PARADO"))]
    Stopped,
    /// 距离过远，向障碍物靠近
    #[cfg_attr(feature = "serde", serde(rename = "AVANZANDO"))]
    Advancing,
    /// 距离过近，后退
    #[cfg_attr(feature = "serde", serde(rename = "RETROCEDIENDO"))]
    Reversing,
}

impl MotionState {
    pub fn label(self) -> &'static str {
        match self {
            MotionState::Stopped => "PARADO",
            MotionState::Advancing => "AVANZANDO",
            MotionState::Reversing => "RETROCEDIENDO",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PARADO" => Some(MotionState::Stopped),
            "AVANZANDO" => Some(MotionState::Advancing),
            "RETROCEDIENDO" => Some(MotionState::Reversing),
            _ => None,
        }
    }
}

impl std::fmt::Display for MotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 光照等级（LM393 比较器输出，只有两档）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LightLevel {
    Dark = 0,
    Light = 1,
}

impl LightLevel {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for LightLevel {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LightLevel::Dark),
            1 => Ok(LightLevel::Light),
            _ => Err(ProtocolError::InvalidValue {
                field: "light",
                value,
            }),
        }
    }
}

/// 差速轮速命令
///
/// 符号约定：正值为后退，负值为前进（与车体上的电机接线一致）。
/// 每个分量都被限制在 `[-255, 255]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VelocityCommand {
    pub left: i32,
    pub right: i32,
}

impl VelocityCommand {
    pub const STOP: Self = Self { left: 0, right: 0 };

    /// 创建命令（自动限幅）
    pub fn new(left: i32, right: i32) -> Self {
        Self {
            left: left.clamp(-MAX_WHEEL_VELOCITY, MAX_WHEEL_VELOCITY),
            right: right.clamp(-MAX_WHEEL_VELOCITY, MAX_WHEEL_VELOCITY),
        }
    }

    /// 两轮同速（直线前进/后退）
    pub fn straight(velocity: i32) -> Self {
        Self::new(velocity, velocity)
    }

    pub fn is_stop(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}
