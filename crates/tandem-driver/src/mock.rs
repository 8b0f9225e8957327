//! 模拟外设
//!
//! 每个模拟外设都是共享句柄：克隆一份交给 [`Board`](crate::Board)，
//! 测试或仿真代码保留另一份用于注入读数和检查输出。

use crate::filter::cm_to_echo;
use crate::hal::{EnvironmentSensors, LightOutput, MotorOutputs, RangeSensor, Wheel, WheelOutput};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tandem_protocol::LightLevel;

#[derive(Debug, Default)]
struct RangeState {
    /// 当前障碍物距离（`None` 表示无回波）
    distance_cm: Option<f32>,
    /// 优先返回的脚本化回波
    script: VecDeque<Option<Duration>>,
    reads: usize,
}

/// 模拟测距传感器
#[derive(Debug, Clone, Default)]
pub struct SimRangeSensor {
    state: Arc<Mutex<RangeState>>,
}

impl SimRangeSensor {
    /// 初始无回波
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_distance(cm: f32) -> Self {
        let sensor = Self::new();
        sensor.set_distance(Some(cm));
        sensor
    }

    pub fn set_distance(&self, cm: Option<f32>) {
        self.state.lock().distance_cm = cm;
    }

    /// 追加脚本化回波（按顺序在之后的读取中返回）
    pub fn push_echo(&self, echo: Option<Duration>) {
        self.state.lock().script.push_back(echo);
    }

    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }
}

impl RangeSensor for SimRangeSensor {
    fn read_echo(&mut self) -> Option<Duration> {
        let mut state = self.state.lock();
        state.reads += 1;
        match state.script.pop_front() {
            Some(echo) => echo,
            None => state.distance_cm.map(cm_to_echo),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EnvState {
    temperature: f32,
    light: LightLevel,
}

/// 模拟温度/光照传感器
#[derive(Debug, Clone)]
pub struct SimEnvironment {
    state: Arc<Mutex<EnvState>>,
}

impl SimEnvironment {
    pub fn new(temperature: f32, light: LightLevel) -> Self {
        Self {
            state: Arc::new(Mutex::new(EnvState { temperature, light })),
        }
    }

    pub fn set_temperature(&self, celsius: f32) {
        self.state.lock().temperature = celsius;
    }

    pub fn set_light(&self, light: LightLevel) {
        self.state.lock().light = light;
    }
}

impl EnvironmentSensors for SimEnvironment {
    fn read_temperature(&mut self) -> f32 {
        self.state.lock().temperature
    }

    fn read_light(&mut self) -> LightLevel {
        self.state.lock().light
    }
}

#[derive(Debug, Default)]
struct MotorState {
    left: WheelOutput,
    right: WheelOutput,
    history: Vec<(Wheel, WheelOutput)>,
}

/// 记录所有写入的电机输出
#[derive(Debug, Clone, Default)]
pub struct RecordingMotors {
    state: Arc<Mutex<MotorState>>,
}

impl RecordingMotors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前输出
    pub fn current(&self, wheel: Wheel) -> WheelOutput {
        let state = self.state.lock();
        match wheel {
            Wheel::Left => state.left,
            Wheel::Right => state.right,
        }
    }

    /// 当前两轮的有符号轮速 `(left, right)`
    pub fn velocities(&self) -> (i32, i32) {
        let state = self.state.lock();
        (state.left.velocity(), state.right.velocity())
    }

    pub fn history(&self) -> Vec<(Wheel, WheelOutput)> {
        self.state.lock().history.clone()
    }

    pub fn clear_history(&self) {
        self.state.lock().history.clear();
    }
}

impl MotorOutputs for RecordingMotors {
    fn write(&mut self, wheel: Wheel, output: WheelOutput) {
        let mut state = self.state.lock();
        match wheel {
            Wheel::Left => state.left = output,
            Wheel::Right => state.right = output,
        }
        state.history.push((wheel, output));
    }
}

#[derive(Debug, Default)]
struct LampState {
    on: bool,
    writes: usize,
}

/// 记录灯光输出
#[derive(Debug, Clone, Default)]
pub struct RecordingLight {
    state: Arc<Mutex<LampState>>,
}

impl RecordingLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.state.lock().on
    }

    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }
}

impl LightOutput for RecordingLight {
    fn set(&mut self, on: bool) {
        let mut state = self.state.lock();
        state.on = on;
        state.writes += 1;
    }
}
