//! # Tandem Driver
//!
//! 车体外设驱动层：
//! - `hal`: 外设接口（测距、环境传感器、电机、灯）
//! - `clock`: 单调时钟抽象（真实时钟 / 手动时钟）
//! - `filter`: 测距滤波与限频
//! - `drive`: 有符号轮速 → H 桥输出，带起步助推
//! - `lighting`: 按光照自动开关灯
//! - `board`: 一辆车的外设集合
//!
//! 所有操作都不会失败：无效采样退回上次有效值，缺失的外设使对应功能变为空操作。

pub mod board;
pub mod clock;
pub mod drive;
pub mod filter;
pub mod hal;
pub mod lighting;

#[cfg(feature = "mock")]
pub mod mock;

pub use board::Board;
pub use clock::{Clock, SystemClock};
pub use drive::{DriveConfig, MotorDrive};
pub use filter::{DistanceReading, FilterConfig, SensorFilter};
pub use hal::{
    Direction, EnvironmentSensors, LightOutput, MotorOutputs, RangeSensor, Wheel, WheelOutput,
};
pub use lighting::{LightState, LightingController};

#[cfg(feature = "mock")]
pub use clock::ManualClock;
