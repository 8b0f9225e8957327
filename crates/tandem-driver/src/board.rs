//! 一辆车的外设集合
//!
//! 测距与电机是必需的；温度/光照传感器和灯是可选的。
//! 缺少环境传感器的车依赖对端回传的数据。

use crate::hal::{EnvironmentSensors, LightOutput, MotorOutputs, RangeSensor};

pub type BoxedRangeSensor = Box<dyn RangeSensor + Send>;
pub type BoxedEnvironment = Box<dyn EnvironmentSensors + Send>;
pub type BoxedMotors = Box<dyn MotorOutputs + Send>;
pub type BoxedLight = Box<dyn LightOutput + Send>;

/// 外设集合
pub struct Board {
    pub range: BoxedRangeSensor,
    pub motors: BoxedMotors,
    pub environment: Option<BoxedEnvironment>,
    pub light: Option<BoxedLight>,
}

impl Board {
    pub fn new(
        range: impl RangeSensor + Send + 'static,
        motors: impl MotorOutputs + Send + 'static,
    ) -> Self {
        Self {
            range: Box::new(range),
            motors: Box::new(motors),
            environment: None,
            light: None,
        }
    }

    pub fn with_environment(mut self, sensors: impl EnvironmentSensors + Send + 'static) -> Self {
        self.environment = Some(Box::new(sensors));
        self
    }

    pub fn with_light(mut self, light: impl LightOutput + Send + 'static) -> Self {
        self.light = Some(Box::new(light));
        self
    }

    pub fn has_environment(&self) -> bool {
        self.environment.is_some()
    }

    pub fn has_light(&self) -> bool {
        self.light.is_some()
    }
}
