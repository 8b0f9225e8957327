//! 电机驱动
//!
//! 有符号轮速 → 每轮 H 桥输出。
//!
//! 直流减速电机在低占空比下常常无法从静止启动，因此某个车轮的上一次命令恰好为 0、
//! 新命令非 0 时，先以 `boost_magnitude` 同向驱动 `boost_settle`，再切换到目标值。
//! 两轮同时起步时共用一次等待。

use crate::clock::Clock;
use crate::hal::{MotorOutputs, Wheel, WheelOutput};
use std::time::Duration;
use tandem_protocol::VelocityCommand;
use tracing::trace;

/// 驱动参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveConfig {
    /// 起步助推占空比
    pub boost_magnitude: u8,
    /// 助推持续时间
    pub boost_settle: Duration,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            boost_magnitude: 210,
            boost_settle: Duration::from_millis(100),
        }
    }
}

/// 双轮电机驱动
pub struct MotorDrive<M> {
    outputs: M,
    config: DriveConfig,
    /// 上一次下发的轮速
    last: VelocityCommand,
}

impl<M: MotorOutputs> MotorDrive<M> {
    pub fn new(outputs: M, config: DriveConfig) -> Self {
        Self {
            outputs,
            config,
            last: VelocityCommand::STOP,
        }
    }

    /// 下发轮速（超出 ±255 的分量被限幅）
    ///
    /// 需要助推时阻塞 `boost_settle`。
    pub fn apply(&mut self, command: VelocityCommand, clock: &impl Clock) {
        let command = VelocityCommand::new(command.left, command.right);
        let boost_left = self.last.left == 0 && command.left != 0;
        let boost_right = self.last.right == 0 && command.right != 0;

        if boost_left || boost_right {
            trace!(
                "Start-up boost: left={}, right={}",
                boost_left, boost_right
            );
            if boost_left {
                self.write_boost(Wheel::Left, command.left);
            }
            if boost_right {
                self.write_boost(Wheel::Right, command.right);
            }
            clock.sleep(self.config.boost_settle);
        }

        self.outputs
            .write(Wheel::Left, WheelOutput::from_velocity(command.left));
        self.outputs
            .write(Wheel::Right, WheelOutput::from_velocity(command.right));
        self.last = command;
    }

    fn write_boost(&mut self, wheel: Wheel, velocity: i32) {
        let output =
            WheelOutput::from_velocity(velocity).with_magnitude(self.config.boost_magnitude);
        self.outputs.write(wheel, output);
    }

    /// 两轮停止，并清零记忆的轮速（下次起步会重新助推）
    pub fn stop(&mut self) {
        self.outputs.write(Wheel::Left, WheelOutput::OFF);
        self.outputs.write(Wheel::Right, WheelOutput::OFF);
        self.last = VelocityCommand::STOP;
    }

    pub fn last_command(&self) -> VelocityCommand {
        self.last
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn outputs_mut(&mut self) -> &mut M {
        &mut self.outputs
    }
}
