//! # 节点编排
//!
//! [`Node`] 独占自己的链路与外设，按周期调用 [`Node::tick`]：
//!
//! 1. 刷新滤波距离
//! 2. 主机且处于自动模式：计算运动 → 驱动电机 → 发送运动命令（受流控）
//! 3. 用融合后的光照读数更新灯光
//! 4. 处理积压的链路事件
//!
//! 宿主也可以在事件到达时直接调用 [`Node::handle_event`]。所有操作都通过 `&mut self`，
//! 入站报文不会打断一次控制步骤。读取接口返回上一次 `tick` 缓存的值。

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::fusion::{DataOrigin, FusedReading, SensorFusion};
use crate::peer::{Inbound, LinkStats, PeerProtocol};
use crate::snapshot::NodeSnapshot;
use tandem_control::{ControlError, ControlLaw, DeadZone, MotionController, MotionOutput};
use tandem_driver::board::{BoxedEnvironment, BoxedLight, BoxedMotors, BoxedRangeSensor};
use tandem_driver::{Board, Clock, LightState, LightingController, MotorDrive, SensorFilter};
use tandem_link::{Link, LinkEvent, PeerId};
use tandem_protocol::{
    LightLevel, MotionCommand, MotionState, Role, SensorReport, VelocityCommand,
};
use tracing::{debug, info};

/// 一辆车的控制节点
pub struct Node<L, C> {
    name: String,
    clock: C,
    protocol: PeerProtocol<L>,
    filter: SensorFilter<BoxedRangeSensor>,
    controller: MotionController,
    drive: MotorDrive<BoxedMotors>,
    lighting: LightingController<BoxedLight>,
    fusion: SensorFusion<BoxedEnvironment>,
    auto_mode: bool,
    motion_state: MotionState,
    /// 上一次 tick 的融合读数
    environment: FusedReading,
}

impl<L: Link, C: Clock> Node<L, C> {
    /// 按配置创建节点
    pub fn new(config: &NodeConfig, board: Board, link: L, clock: C) -> Result<Self, NodeError> {
        config.validate()?;
        let controller = config.control.controller().map_err(crate::ConfigError::from)?;

        let Board {
            range,
            motors,
            environment,
            light,
        } = board;

        let protocol = PeerProtocol::new(
            link,
            config.node.peer,
            config.node.start_role,
            config.link.min_send_interval(),
        );

        info!(
            "Node {} starting as {} (peer {}, sensors: {}, lights: {})",
            config.node.name,
            config.node.start_role,
            config.node.peer,
            environment.is_some(),
            light.is_some()
        );

        let mut drive = MotorDrive::new(motors, config.drive.drive_config());
        drive.stop();

        Ok(Self {
            name: config.node.name.clone(),
            clock,
            protocol,
            filter: SensorFilter::new(range, config.sensing.filter_config()),
            controller,
            drive,
            lighting: LightingController::new(light, config.lights.auto),
            fusion: SensorFusion::new(environment, config.sensing.staleness()),
            auto_mode: config.node.auto_mode,
            motion_state: MotionState::Stopped,
            environment: FusedReading::default(),
        })
    }

    /// 一个控制周期
    pub fn tick(&mut self) {
        self.filter.read_distance(&self.clock);

        if self.protocol.role().is_master() && self.auto_mode {
            let distance = self.filter.distance_cm();
            let output = self.controller.compute(distance);
            self.drive.apply(output.command, &self.clock);
            self.motion_state = output.state;
            self.broadcast_motion(output);
        }

        self.environment = self.fusion.read(self.clock.now());
        self.lighting.tick(self.environment.light);

        while let Some(event) = self.protocol.poll() {
            self.handle_event(event);
        }
    }

    /// 处理一个链路事件
    pub fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Delivered { success } => self.protocol.on_delivery(success),
            LinkEvent::Received { from, payload } => {
                if let Some(inbound) = self.protocol.handle_datagram(from, &payload) {
                    self.dispatch(inbound);
                }
            },
        }
    }

    fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Motion(command) => {
                self.drive.apply(command.velocity, &self.clock);
                self.motion_state = command.state;
                if let Some(payload) = command.sensors {
                    self.fusion.record_remote(payload, self.clock.now());
                }
                self.report_sensors();
            },
            Inbound::RoleChanged { current, .. } => {
                if current == Role::Slave {
                    self.halt();
                }
            },
            Inbound::SensorReport(report) => match report.sensors {
                Some(payload) => self.fusion.record_remote(payload, self.clock.now()),
                None => debug!("Peer reported no sensors"),
            },
        }
    }

    /// 发送运动命令（附带本地传感器读数）
    fn broadcast_motion(&mut self, output: MotionOutput) -> bool {
        let command = MotionCommand {
            velocity: output.command,
            state: output.state,
            sensors: self.fusion.local_reading(),
        };
        let now = self.clock.now();
        self.protocol.send_motion(command, now)
    }

    /// 从机：执行运动命令后回传本地传感器数据
    fn report_sensors(&mut self) {
        let Some(payload) = self.fusion.local_reading() else {
            return;
        };
        let report = SensorReport {
            sensors: Some(payload),
            origin: self.protocol.role(),
        };
        let now = self.clock.now();
        self.protocol.send_sensor_report(report, now);
    }

    fn halt(&mut self) {
        self.drive.stop();
        self.motion_state = MotionState::Stopped;
    }

    /// 切换本地角色，并通知对端采用互补角色
    pub fn set_role(&mut self, role: Role) {
        self.protocol.set_role(role);
        if role == Role::Slave {
            self.halt();
        }
    }

    /// 切换自动距离控制；关闭时停车
    pub fn set_auto_mode(&mut self, enabled: bool) {
        self.auto_mode = enabled;
        if !enabled {
            self.halt();
        }
        info!("Automatic mode {}", if enabled { "enabled" } else { "disabled" });
    }

    /// 手动驾驶（仅主机且自动模式关闭时有效）
    ///
    /// 本地执行后尝试把命令转发给对端。返回命令是否被执行。
    pub fn manual_drive(&mut self, command: VelocityCommand) -> bool {
        if !self.protocol.role().is_master() || self.auto_mode {
            debug!("Manual drive ignored (role={}, auto={})", self.role(), self.auto_mode);
            return false;
        }

        let command = VelocityCommand::new(command.left, command.right);
        let state = if command.is_stop() {
            MotionState::Stopped
        } else if command.left + command.right >= 0 {
            MotionState::Reversing
        } else {
            MotionState::Advancing
        };

        self.drive.apply(command, &self.clock);
        self.motion_state = state;
        self.broadcast_motion(MotionOutput { state, command });
        true
    }

    /// 立即停车
    pub fn stop(&mut self) {
        self.halt();
    }

    /// 运行中调整死区；下一次控制步骤生效
    pub fn set_dead_zone(&mut self, dead_zone: DeadZone) {
        self.controller.set_dead_zone(dead_zone);
        info!(
            "Dead zone set to {} ~ {} cm",
            dead_zone.min_cm(),
            dead_zone.max_cm()
        );
    }

    /// 运行中调整比例增益
    ///
    /// 增益只对比例控制有意义，设置后控制律切换为比例控制。
    pub fn set_gain(&mut self, kp: f32) -> Result<(), ControlError> {
        let law = ControlLaw::proportional(kp)?;
        self.controller.set_law(law);
        info!("Proportional gain set to {}", kp);
        Ok(())
    }

    pub fn controller(&self) -> &MotionController {
        &self.controller
    }

    pub fn set_auto_lights(&mut self, enabled: bool) {
        self.lighting.set_auto(enabled);
    }

    pub fn toggle_lights(&mut self) {
        self.lighting.toggle();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peer(&self) -> PeerId {
        self.protocol.peer()
    }

    pub fn role(&self) -> Role {
        self.protocol.role()
    }

    pub fn is_auto_mode(&self) -> bool {
        self.auto_mode
    }

    pub fn distance_cm(&self) -> f32 {
        self.filter.distance_cm()
    }

    pub fn temperature(&self) -> Option<f32> {
        self.environment.temperature
    }

    pub fn light(&self) -> Option<LightLevel> {
        self.environment.light
    }

    pub fn data_origin(&self) -> DataOrigin {
        self.environment.origin
    }

    pub fn has_local_sensors(&self) -> bool {
        self.fusion.has_local_sensors()
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion_state
    }

    /// 最近下发给电机的轮速
    pub fn velocity(&self) -> VelocityCommand {
        self.drive.last_command()
    }

    pub fn light_state(&self) -> LightState {
        self.lighting.state()
    }

    pub fn lights_available(&self) -> bool {
        self.lighting.is_available()
    }

    pub fn stats(&self) -> LinkStats {
        self.protocol.stats()
    }

    pub fn success_rate(&self) -> f32 {
        self.protocol.stats().success_rate()
    }

    pub fn link(&self) -> &L {
        self.protocol.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.protocol.link_mut()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        let velocity = self.velocity();
        let lights = self.light_state();
        let stats = self.stats();

        NodeSnapshot {
            name: self.name.clone(),
            role: self.role().label().to_string(),
            auto_mode: self.auto_mode,
            motion_state: self.motion_state.label().to_string(),
            velocity_left: velocity.left,
            velocity_right: velocity.right,
            distance_cm: self.distance_cm(),
            temperature: self.temperature(),
            light: self.light().map(LightLevel::as_i32),
            data_origin: self.data_origin().label().to_string(),
            has_sensors: self.has_local_sensors(),
            lights_available: self.lights_available(),
            lights_on: lights.is_on,
            auto_lights: lights.auto_mode,
            messages_sent: stats.sent,
            messages_received: stats.received,
            messages_failed: stats.failed,
            success_rate: stats.success_rate(),
        }
    }
}
