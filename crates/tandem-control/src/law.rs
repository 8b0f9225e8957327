//! 控制律
//!
//! 符号约定：正值为后退，负值为前进。所有小数部分向零截断。

use crate::ControlError;
use tandem_protocol::MAX_WHEEL_VELOCITY;

/// 比例控制的最低有效速度（低于此值电机无法转动）
pub const MIN_EFFECTIVE_VELOCITY: i32 = 120;

/// 分段线性控制的断点与 PWM 边界
pub mod piecewise {
    /// 近端饱和距离（cm）：不超过此值时以最大后退速度运行
    pub const NEAR_CM: f32 = 5.0;
    /// 远端饱和距离（cm）：不小于此值时以最大前进速度运行
    pub const FAR_CM: f32 = 40.0;

    pub const REVERSE_MIN: i32 = 80;
    pub const REVERSE_MAX: i32 = 180;
    pub const ADVANCE_MIN: i32 = 100;
    pub const ADVANCE_MAX: i32 = 255;
}

/// 死区外的速度计算方式
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "law", rename_all = "lowercase"))]
pub enum ControlLaw {
    /// 比例控制：误差相对最近的死区边界计算
    Proportional { kp: f32 },
    /// 分段线性控制
    Piecewise,
}

impl ControlLaw {
    pub fn proportional(kp: f32) -> Result<Self, ControlError> {
        if !kp.is_finite() || kp < 0.0 {
            return Err(ControlError::InvalidGain(kp));
        }
        Ok(ControlLaw::Proportional { kp })
    }

    /// 过近时的后退速度（> 0）
    ///
    /// `distance < min`
    pub(crate) fn reverse_velocity(&self, distance: f32, min: f32) -> i32 {
        match *self {
            ControlLaw::Proportional { kp } => {
                let v = proportional(kp, distance - min);
                v.max(MIN_EFFECTIVE_VELOCITY)
            },
            ControlLaw::Piecewise => {
                use piecewise::*;
                if distance <= NEAR_CM || min <= NEAR_CM {
                    return REVERSE_MAX;
                }
                let span = (REVERSE_MAX - REVERSE_MIN) as f64;
                let delta = (min - distance) as f64 * span / (min - NEAR_CM) as f64;
                let v = REVERSE_MIN + delta.trunc() as i32;
                v.clamp(REVERSE_MIN, REVERSE_MAX)
            },
        }
    }

    /// 过远时的前进速度（< 0）
    ///
    /// `distance > max`
    pub(crate) fn advance_velocity(&self, distance: f32, max: f32) -> i32 {
        match *self {
            ControlLaw::Proportional { kp } => {
                let v = proportional(kp, distance - max);
                v.min(-MIN_EFFECTIVE_VELOCITY)
            },
            ControlLaw::Piecewise => {
                use piecewise::*;
                if distance >= FAR_CM || max >= FAR_CM {
                    return -ADVANCE_MAX;
                }
                let span = (ADVANCE_MAX - ADVANCE_MIN) as f64;
                let delta = (distance - max) as f64 * span / (FAR_CM - max) as f64;
                let magnitude = ADVANCE_MIN + delta.trunc() as i32;
                -magnitude.clamp(ADVANCE_MIN, ADVANCE_MAX)
            },
        }
    }
}

/// `clamp(trunc(−kp × error), ±255)`
fn proportional(kp: f32, error: f32) -> i32 {
    let raw = (-(kp as f64) * error as f64).trunc();
    let limit = MAX_WHEEL_VELOCITY as f64;
    raw.clamp(-limit, limit) as i32
}
