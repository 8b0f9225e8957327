//! 灯光控制
//!
//! 自动模式下按光照读数开关：暗且灯灭 → 开灯；亮且灯亮 → 关灯；其余情况保持。
//! 没有灯光输出的车上所有操作都是空操作。

use crate::hal::LightOutput;
use tandem_protocol::LightLevel;
use tracing::debug;

/// 灯光状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightState {
    pub is_on: bool,
    pub auto_mode: bool,
}

/// 灯光控制器
pub struct LightingController<L> {
    output: Option<L>,
    state: LightState,
}

impl<L: LightOutput> LightingController<L> {
    pub fn new(output: Option<L>, auto_mode: bool) -> Self {
        let mut controller = Self {
            output,
            state: LightState {
                is_on: false,
                auto_mode,
            },
        };
        // 上电时确保灯处于熄灭状态
        if let Some(out) = controller.output.as_mut() {
            out.set(false);
        }
        controller
    }

    /// 根据光照读数更新（仅自动模式）
    pub fn tick(&mut self, reading: Option<LightLevel>) {
        if !self.state.auto_mode || self.output.is_none() {
            return;
        }
        let Some(level) = reading else {
            return;
        };

        match (level, self.state.is_on) {
            (LightLevel::Dark, false) => {
                debug!("Dark detected, turning lights on");
                self.write(true);
            },
            (LightLevel::Light, true) => {
                debug!("Light detected, turning lights off");
                self.write(false);
            },
            _ => {},
        }
    }

    pub fn turn_on(&mut self) {
        self.write(true);
    }

    pub fn turn_off(&mut self) {
        self.write(false);
    }

    pub fn toggle(&mut self) {
        let on = !self.state.is_on;
        self.write(on);
    }

    /// 切换自动模式；关闭自动模式时同时关灯
    pub fn set_auto(&mut self, auto_mode: bool) {
        self.state.auto_mode = auto_mode;
        if !auto_mode {
            self.write(false);
        }
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.output.is_some()
    }

    fn write(&mut self, on: bool) {
        if let Some(out) = self.output.as_mut() {
            out.set(on);
            self.state.is_on = on;
        }
    }
}
