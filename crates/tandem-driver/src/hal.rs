//! 外设接口
//!
//! 真实 GPIO 不在本 crate 内实现；主机端使用 `mock` 模块中的模拟外设。

use std::time::Duration;
use tandem_protocol::LightLevel;

/// 超声波测距传感器
pub trait RangeSensor {
    /// 触发一次测量，返回回波脉宽；超时或无回波返回 `None`
    fn read_echo(&mut self) -> Option<Duration>;
}

/// 温度与光照传感器
pub trait EnvironmentSensors {
    /// 摄氏度
    fn read_temperature(&mut self) -> f32;
    fn read_light(&mut self) -> LightLevel;
}

/// 车轮
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Wheel {
    Left,
    Right,
}

/// 车轮转向（与轮速符号对应：正值为后退）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Reverse,
    Advance,
}

/// 单轮 H 桥输出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WheelOutput {
    /// PWM 占空比
    pub magnitude: u8,
    pub direction: Direction,
}

impl WheelOutput {
    pub const OFF: Self = Self {
        magnitude: 0,
        direction: Direction::Reverse,
    };

    /// 由有符号轮速换算（超出 ±255 的部分被截断）
    pub fn from_velocity(velocity: i32) -> Self {
        let magnitude = velocity.unsigned_abs().min(u8::MAX as u32) as u8;
        let direction = if velocity >= 0 {
            Direction::Reverse
        } else {
            Direction::Advance
        };
        Self {
            magnitude,
            direction,
        }
    }

    pub fn with_magnitude(self, magnitude: u8) -> Self {
        Self { magnitude, ..self }
    }

    /// H 桥两路输入的 PWM 值 `(a, b)`：只驱动其中一路，另一路为 0
    pub fn bridge_inputs(&self) -> (u8, u8) {
        match self.direction {
            Direction::Reverse => (self.magnitude, 0),
            Direction::Advance => (0, self.magnitude),
        }
    }

    /// 还原为有符号轮速
    pub fn velocity(&self) -> i32 {
        match self.direction {
            Direction::Reverse => self.magnitude as i32,
            Direction::Advance => -(self.magnitude as i32),
        }
    }
}

/// 双轮电机输出
pub trait MotorOutputs {
    fn write(&mut self, wheel: Wheel, output: WheelOutput);
}

/// 灯光输出
pub trait LightOutput {
    fn set(&mut self, on: bool);
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn read_echo(&mut self) -> Option<Duration> {
        (**self).read_echo()
    }
}

impl<T: EnvironmentSensors + ?Sized> EnvironmentSensors for Box<T> {
    fn read_temperature(&mut self) -> f32 {
        (**self).read_temperature()
    }

    fn read_light(&mut self) -> LightLevel {
        (**self).read_light()
    }
}

impl<T: MotorOutputs + ?Sized> MotorOutputs for Box<T> {
    fn write(&mut self, wheel: Wheel, output: WheelOutput) {
        (**self).write(wheel, output)
    }
}

impl<T: LightOutput + ?Sized> LightOutput for Box<T> {
    fn set(&mut self, on: bool) {
        (**self).set(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_output_from_velocity() {
        let out = WheelOutput::from_velocity(130);
        assert_eq!(out.magnitude, 130);
        assert_eq!(out.direction, Direction::Reverse);
        assert_eq!(out.bridge_inputs(), (130, 0));

        let out = WheelOutput::from_velocity(-177);
        assert_eq!(out.direction, Direction::Advance);
        assert_eq!(out.bridge_inputs(), (0, 177));
        assert_eq!(out.velocity(), -177);
    }

    #[test]
    fn test_wheel_output_saturates() {
        assert_eq!(WheelOutput::from_velocity(1000).magnitude, 255);
        assert_eq!(WheelOutput::from_velocity(i32::MIN).magnitude, 255);
    }

    #[test]
    fn test_zero_drives_nothing() {
        assert_eq!(WheelOutput::from_velocity(0), WheelOutput::OFF);
        assert_eq!(WheelOutput::OFF.bridge_inputs(), (0, 0));
    }
}
