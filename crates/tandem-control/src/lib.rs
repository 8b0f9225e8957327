//! # Tandem Control
//!
//! 距离保持控制：把滤波后的距离映射为差速轮速命令。
//!
//! ```text
//!   后退 (+v)        死区 (0)         前进 (−v)
//! ──────────────┼═══════════════┼──────────────▶ 距离 (cm)
//!              min             max
//! ```
//!
//! 死区内停车；过近时后退、过远时前进。两种控制律可选：
//! - [`ControlLaw::Proportional`]：`v = −kp × error`，限幅 ±255，最低速度 120
//! - [`ControlLaw::Piecewise`]：两段线性插值，5 cm / 40 cm 处饱和
//!
//! # 示例
//!
//! ```rust
//! use tandem_control::{ControlLaw, DeadZone, MotionController};
//! use tandem_protocol::MotionState;
//!
//! let dead_zone = DeadZone::new(15.0, 20.0).unwrap();
//! let controller = MotionController::new(ControlLaw::Piecewise, dead_zone);
//! let out = controller.compute(10.0);
//! assert_eq!(out.state, MotionState::Reversing);
//! assert_eq!(out.command.left, 130);
//! ```

pub mod controller;
pub mod law;

pub use controller::{DeadZone, MotionController, MotionOutput};
pub use law::ControlLaw;

use thiserror::Error;

/// 控制参数错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("Invalid dead zone: min {min} cm > max {max} cm")]
    InvalidDeadZone { min: f32, max: f32 },
    #[error("Invalid proportional gain: {0}")]
    InvalidGain(f32),
}
