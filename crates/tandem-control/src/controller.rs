//! 运动控制器

use crate::ControlError;
use crate::law::ControlLaw;
use tandem_protocol::{MotionState, VelocityCommand};

/// 死区 `[min_cm, max_cm]`（闭区间）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeadZone {
    min_cm: f32,
    max_cm: f32,
}

impl DeadZone {
    pub fn new(min_cm: f32, max_cm: f32) -> Result<Self, ControlError> {
        if !(min_cm.is_finite() && max_cm.is_finite()) || min_cm > max_cm {
            return Err(ControlError::InvalidDeadZone {
                min: min_cm,
                max: max_cm,
            });
        }
        Ok(Self { min_cm, max_cm })
    }

    pub fn min_cm(&self) -> f32 {
        self.min_cm
    }

    pub fn max_cm(&self) -> f32 {
        self.max_cm
    }

    pub fn contains(&self, distance: f32) -> bool {
        distance >= self.min_cm && distance <= self.max_cm
    }
}

impl Default for DeadZone {
    /// 15–20 cm
    fn default() -> Self {
        Self {
            min_cm: 15.0,
            max_cm: 20.0,
        }
    }
}

/// 一次计算的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionOutput {
    pub state: MotionState,
    pub command: VelocityCommand,
}

impl MotionOutput {
    pub const STOPPED: Self = Self {
        state: MotionState::Stopped,
        command: VelocityCommand::STOP,
    };
}

/// 距离 → 轮速
///
/// 纯函数：输出只取决于距离与配置。两轮始终得到相同速度。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionController {
    law: ControlLaw,
    dead_zone: DeadZone,
}

impl MotionController {
    pub fn new(law: ControlLaw, dead_zone: DeadZone) -> Self {
        Self { law, dead_zone }
    }

    /// 比例控制（默认死区）
    pub fn proportional(kp: f32) -> Result<Self, ControlError> {
        Ok(Self::new(ControlLaw::proportional(kp)?, DeadZone::default()))
    }

    /// 分段线性控制（默认死区）
    pub fn piecewise() -> Self {
        Self::new(ControlLaw::Piecewise, DeadZone::default())
    }

    pub fn with_dead_zone(mut self, dead_zone: DeadZone) -> Self {
        self.dead_zone = dead_zone;
        self
    }

    pub fn set_dead_zone(&mut self, dead_zone: DeadZone) {
        self.dead_zone = dead_zone;
    }

    pub fn set_law(&mut self, law: ControlLaw) {
        self.law = law;
    }

    pub fn compute(&self, distance_cm: f32) -> MotionOutput {
        // 滤波器不会产生非有限值；万一出现，按停车处理
        if !distance_cm.is_finite() || self.dead_zone.contains(distance_cm) {
            return MotionOutput::STOPPED;
        }

        if distance_cm < self.dead_zone.min_cm {
            let v = self.law.reverse_velocity(distance_cm, self.dead_zone.min_cm);
            MotionOutput {
                state: MotionState::Reversing,
                command: VelocityCommand::straight(v),
            }
        } else {
            let v = self.law.advance_velocity(distance_cm, self.dead_zone.max_cm);
            MotionOutput {
                state: MotionState::Advancing,
                command: VelocityCommand::straight(v),
            }
        }
    }

    pub fn law(&self) -> ControlLaw {
        self.law
    }

    pub fn dead_zone(&self) -> DeadZone {
        self.dead_zone
    }
}

impl Default for MotionController {
    fn default() -> Self {
        Self::piecewise()
    }
}
