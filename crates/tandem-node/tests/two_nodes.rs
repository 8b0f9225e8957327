//! 双节点集成测试：MockLink + 模拟外设 + 手动时钟

use std::time::Duration;
use tandem_driver::mock::{RecordingLight, RecordingMotors, SimEnvironment, SimRangeSensor};
use tandem_control::{ControlLaw, DeadZone};
use tandem_driver::{Board, ManualClock};
use tandem_link::{LinkEvent, MockLink, PeerId};
use tandem_node::{DataOrigin, LinkStats, Node, NodeConfig};
use tandem_protocol::{
    LightLevel, Message, MotionCommand, MotionState, Role, SensorPayload, SensorReport,
    VelocityCommand,
};

const A: PeerId = PeerId::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
const B: PeerId = PeerId::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x02]);

// 9.25 cm → 80 + 5.75 × 100 / 10 = 137.5 → 137
const NEAR_CM: f32 = 9.25;
const NEAR_VELOCITY: i32 = 137;
// 30.5 cm → −(100 + 10.5 × 155 / 20) = −181.375 → −181
const FAR_CM: f32 = 30.5;
const FAR_VELOCITY: i32 = -181;

struct Rig {
    clock: ManualClock,
    master: Node<MockLink, ManualClock>,
    slave: Node<MockLink, ManualClock>,
    master_motors: RecordingMotors,
    slave_range: SimRangeSensor,
    slave_motors: RecordingMotors,
    slave_env: SimEnvironment,
    slave_light: RecordingLight,
}

/// 主机 A：只有测距和电机；从机 B：带温度/光照传感器和灯
fn rig(master_distance: f32) -> Rig {
    let clock = ManualClock::new();
    let (link_a, link_b) = MockLink::pair(A, B);

    let mut master_config = NodeConfig::default();
    master_config.node.name = "coche-a".to_string();
    master_config.node.peer = B;

    let mut slave_config = NodeConfig::default();
    slave_config.node.name = "coche-b".to_string();
    slave_config.node.start_role = Role::Slave;
    slave_config.node.peer = A;

    let master_motors = RecordingMotors::new();
    let master_board = Board::new(
        SimRangeSensor::at_distance(master_distance),
        master_motors.clone(),
    );

    let slave_range = SimRangeSensor::at_distance(FAR_CM);
    let slave_motors = RecordingMotors::new();
    let slave_env = SimEnvironment::new(22.0, LightLevel::Light);
    let slave_light = RecordingLight::new();
    let slave_board = Board::new(slave_range.clone(), slave_motors.clone())
        .with_environment(slave_env.clone())
        .with_light(slave_light.clone());

    Rig {
        master: Node::new(&master_config, master_board, link_a, clock.clone()).unwrap(),
        slave: Node::new(&slave_config, slave_board, link_b, clock.clone()).unwrap(),
        clock,
        master_motors,
        slave_range,
        slave_motors,
        slave_env,
        slave_light,
    }
}

#[test]
fn test_master_drives_and_slave_follows() {
    let mut rig = rig(NEAR_CM);

    rig.master.tick();
    assert_eq!(rig.master.motion_state(), MotionState::Reversing);
    assert_eq!(rig.master.velocity(), VelocityCommand::straight(NEAR_VELOCITY));
    assert_eq!(rig.master_motors.velocities(), (NEAR_VELOCITY, NEAR_VELOCITY));
    assert_eq!(rig.master.stats().sent, 1);

    rig.slave.tick();
    assert_eq!(rig.slave.motion_state(), MotionState::Reversing);
    assert_eq!(rig.slave_motors.velocities(), (NEAR_VELOCITY, NEAR_VELOCITY));
    assert_eq!(rig.slave.stats().received, 1);
    // 从机有传感器：执行命令后立即回传
    assert_eq!(rig.slave.stats().sent, 1);

    // 第 2 次 tick 收到回传，第 3 次 tick 的融合读数才用上
    rig.master.tick();
    assert_eq!(rig.master.stats().received, 1);
    rig.master.tick();
    assert_eq!(rig.master.data_origin(), DataOrigin::Remote);
    assert_eq!(rig.master.temperature(), Some(22.0));
    assert_eq!(rig.master.light(), Some(LightLevel::Light));
}

#[test]
fn test_dead_zone_stops_both() {
    let mut rig = rig(17.5);

    rig.master.tick();
    assert_eq!(rig.master.motion_state(), MotionState::Stopped);
    assert_eq!(rig.master.velocity(), VelocityCommand::STOP);
    // 停车命令同样转发
    assert_eq!(rig.master.stats().sent, 1);

    rig.slave.tick();
    assert_eq!(rig.slave.motion_state(), MotionState::Stopped);
    assert_eq!(rig.slave_motors.velocities(), (0, 0));
}

#[test]
fn test_remote_data_expires() {
    let mut rig = rig(NEAR_CM);
    rig.master.tick();
    rig.slave.tick();
    rig.master.tick();
    rig.master.tick();
    assert_eq!(rig.master.data_origin(), DataOrigin::Remote);

    rig.clock.advance(Duration::from_secs(6));
    rig.master.tick();
    assert_eq!(rig.master.data_origin(), DataOrigin::None);
    assert_eq!(rig.master.temperature(), None);
    assert_eq!(rig.master.light(), None);
}

#[test]
fn test_role_swap() {
    let mut rig = rig(NEAR_CM);
    rig.master.tick();
    rig.slave.tick();

    rig.master.set_role(Role::Slave);
    assert_eq!(rig.master.role(), Role::Slave);
    assert_eq!(rig.master.motion_state(), MotionState::Stopped);
    assert_eq!(rig.master_motors.velocities(), (0, 0));

    // 第一次 tick 处理角色切换，第二次 tick 以主机身份控制
    rig.slave.tick();
    assert_eq!(rig.slave.role(), Role::Master);
    rig.clock.advance(Duration::from_millis(100));
    rig.slave.tick();
    assert_eq!(rig.slave.motion_state(), MotionState::Advancing);
    assert_eq!(rig.slave_motors.velocities(), (FAR_VELOCITY, FAR_VELOCITY));

    // 原主机：忽略切换前积压的传感器回传，执行新主机的命令
    rig.master.tick();
    assert_eq!(rig.master.motion_state(), MotionState::Advancing);
    assert_eq!(rig.master_motors.velocities(), (FAR_VELOCITY, FAR_VELOCITY));
    assert_eq!(rig.master.stats().received, 1);

    // 新从机没有传感器，不回传
    assert_eq!(rig.master.stats().sent, 1);
}

#[test]
fn test_slave_ignores_sensor_report() {
    let mut rig = rig(NEAR_CM);
    let report = Message::SensorReport(SensorReport {
        sensors: Some(SensorPayload {
            temperature: 30.0,
            light: LightLevel::Dark,
        }),
        origin: Role::Master,
    });

    rig.slave.handle_event(LinkEvent::Received {
        from: A,
        payload: report.encode(),
    });
    assert_eq!(rig.slave.stats(), LinkStats::default());
}

#[test]
fn test_master_ignores_motion_command() {
    let mut rig = rig(NEAR_CM);
    let command = Message::Motion(MotionCommand {
        velocity: VelocityCommand::straight(200),
        state: MotionState::Reversing,
        sensors: None,
    });

    rig.master.handle_event(LinkEvent::Received {
        from: B,
        payload: command.encode(),
    });
    assert_eq!(rig.master.stats(), LinkStats::default());
    assert_eq!(rig.master_motors.velocities(), (0, 0));
    assert_eq!(rig.master.motion_state(), MotionState::Stopped);
}

#[test]
fn test_runtime_tuning() {
    let mut rig = rig(NEAR_CM);

    // 9.25 cm 落在新死区内
    rig.master.set_dead_zone(DeadZone::new(5.0, 10.0).unwrap());
    rig.master.tick();
    assert_eq!(rig.master.motion_state(), MotionState::Stopped);
    assert_eq!(rig.master_motors.velocities(), (0, 0));

    assert!(rig.master.set_gain(-1.0).is_err());
    assert_eq!(rig.master.controller().law(), ControlLaw::Piecewise);

    // 误差 5.75 cm × 40 = 230
    rig.master.set_dead_zone(DeadZone::new(15.0, 20.0).unwrap());
    rig.master.set_gain(40.0).unwrap();
    rig.master.tick();
    assert_eq!(rig.master.controller().law(), ControlLaw::Proportional { kp: 40.0 });
    assert_eq!(rig.master.motion_state(), MotionState::Reversing);
    assert_eq!(rig.master_motors.velocities(), (230, 230));
}

#[test]
fn test_second_send_within_interval_rejected() {
    let mut rig = rig(NEAR_CM);

    rig.master.tick();
    rig.master.tick();
    assert_eq!(rig.master.stats().sent, 1);

    rig.clock.advance(Duration::from_millis(50));
    rig.master.tick();
    assert_eq!(rig.master.stats().sent, 1);

    rig.clock.advance(Duration::from_millis(50));
    rig.master.tick();
    assert_eq!(rig.master.stats().sent, 2);
}

#[test]
fn test_no_send_while_awaiting_ack() {
    let mut rig = rig(NEAR_CM);
    rig.master.link_mut().hold_outcomes(true);

    rig.master.tick();
    rig.clock.advance(Duration::from_millis(300));
    rig.master.tick();
    assert_eq!(rig.master.stats().sent, 1);

    // 投递结果在 tick 末尾才被处理
    rig.master.link_mut().release_outcomes();
    rig.master.tick();
    assert_eq!(rig.master.stats().sent, 1);
    rig.master.tick();
    assert_eq!(rig.master.stats().sent, 2);
}

#[test]
fn test_delivery_failures_counted() {
    let mut rig = rig(NEAR_CM);
    rig.master.link_mut().set_loss(1.0);

    rig.master.tick();
    assert_eq!(rig.master.stats().failed, 1);
    assert_eq!(rig.master.success_rate(), 50.0);

    rig.slave.tick();
    assert_eq!(rig.slave.stats().received, 0);
    assert_eq!(rig.slave_motors.velocities(), (0, 0));
}

#[test]
fn test_auto_mode_and_manual_drive() {
    let mut rig = rig(NEAR_CM);
    rig.master.tick();

    rig.master.set_auto_mode(false);
    assert!(!rig.master.is_auto_mode());
    assert_eq!(rig.master_motors.velocities(), (0, 0));
    assert_eq!(rig.master.motion_state(), MotionState::Stopped);

    // 自动模式关闭：tick 不再驱动
    rig.master.tick();
    assert_eq!(rig.master_motors.velocities(), (0, 0));
    assert_eq!(rig.master.stats().sent, 1);

    rig.clock.advance(Duration::from_millis(100));
    assert!(rig.master.manual_drive(VelocityCommand::straight(-150)));
    assert_eq!(rig.master.motion_state(), MotionState::Advancing);
    assert_eq!(rig.master_motors.velocities(), (-150, -150));
    assert_eq!(rig.master.stats().sent, 2);

    rig.slave.tick();
    assert_eq!(rig.slave_motors.velocities(), (-150, -150));

    // 从机不接受手动驾驶
    assert!(!rig.slave.manual_drive(VelocityCommand::straight(200)));
}

#[test]
fn test_manual_drive_requires_manual_mode() {
    let mut rig = rig(NEAR_CM);
    assert!(!rig.master.manual_drive(VelocityCommand::straight(200)));
    assert_eq!(rig.master_motors.velocities(), (0, 0));
}

#[test]
fn test_lighting_follows_local_light() {
    let mut rig = rig(NEAR_CM);

    rig.slave_env.set_light(LightLevel::Dark);
    rig.slave.tick();
    assert!(rig.slave_light.is_on());
    assert!(rig.slave.light_state().is_on);

    rig.slave_env.set_light(LightLevel::Light);
    rig.slave.tick();
    assert!(!rig.slave_light.is_on());

    rig.slave.set_auto_lights(false);
    rig.slave_env.set_light(LightLevel::Dark);
    rig.slave.tick();
    assert!(!rig.slave_light.is_on());

    rig.slave.toggle_lights();
    assert!(rig.slave_light.is_on());
}

#[test]
fn test_master_without_lights_is_noop() {
    let mut rig = rig(NEAR_CM);
    assert!(!rig.master.lights_available());
    rig.master.toggle_lights();
    assert!(!rig.master.light_state().is_on);
}

#[test]
fn test_foreign_station_ignored() {
    let mut rig = rig(NEAR_CM);
    let stranger = PeerId::new([0x11; 6]);
    let command = Message::Motion(MotionCommand {
        velocity: VelocityCommand::straight(200),
        state: MotionState::Reversing,
        sensors: None,
    });

    rig.slave.link_mut().inject(stranger, command.encode());
    rig.slave.tick();
    assert_eq!(rig.slave.stats(), LinkStats::default());
    assert_eq!(rig.slave_motors.velocities(), (0, 0));
}

#[test]
fn test_master_sensors_feed_slave_cache() {
    // 主机带传感器、从机不带：运动命令附带读数
    let clock = ManualClock::new();
    let (link_a, link_b) = MockLink::pair(A, B);

    let mut master_config = NodeConfig::default();
    master_config.node.peer = B;
    let mut slave_config = NodeConfig::default();
    slave_config.node.name = "coche-b".to_string();
    slave_config.node.start_role = Role::Slave;
    slave_config.node.peer = A;

    let master_board = Board::new(SimRangeSensor::at_distance(NEAR_CM), RecordingMotors::new())
        .with_environment(SimEnvironment::new(18.5, LightLevel::Dark));
    let slave_board = Board::new(SimRangeSensor::new(), RecordingMotors::new());

    let mut master = Node::new(&master_config, master_board, link_a, clock.clone()).unwrap();
    let mut slave = Node::new(&slave_config, slave_board, link_b, clock.clone()).unwrap();

    master.tick();
    slave.tick();
    // 缓存在下一次 tick 生效
    slave.tick();
    assert_eq!(slave.data_origin(), DataOrigin::Remote);
    assert_eq!(slave.temperature(), Some(18.5));
    assert_eq!(slave.light(), Some(LightLevel::Dark));
    // 没有传感器的从机不回传
    assert_eq!(slave.stats().sent, 0);
}

#[test]
fn test_snapshot_labels() {
    let mut rig = rig(NEAR_CM);
    rig.master.tick();
    rig.slave.tick();

    let snapshot = rig.master.snapshot();
    assert_eq!(snapshot.name, "coche-a");
    assert_eq!(snapshot.role, "MAESTRO");
    assert_eq!(snapshot.motion_state, "RETROCEDIENDO");
    assert_eq!(snapshot.data_origin, "SIN_DATOS");
    assert_eq!(snapshot.temperature, None);
    assert_eq!(snapshot.success_rate, 100.0);

    let snapshot = rig.slave.snapshot();
    assert_eq!(snapshot.role, "ESCLAVO");
    assert_eq!(snapshot.data_origin, "LOCAL");
    assert_eq!(snapshot.light, Some(1));
    assert!(snapshot.has_sensors);
    assert!(snapshot.lights_available);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["motion_state"], "RETROCEDIENDO");
    assert_eq!(json["velocity_left"], NEAR_VELOCITY);
    assert_eq!(json["temperature"], 22.0);
}

#[test]
fn test_slave_distance_is_refreshed() {
    let mut rig = rig(NEAR_CM);
    rig.slave.tick();
    assert!((rig.slave.distance_cm() - FAR_CM).abs() < 0.05);

    rig.slave_range.set_distance(Some(12.0));
    rig.clock.advance(Duration::from_millis(250));
    rig.slave.tick();
    assert!((rig.slave.distance_cm() - 12.0).abs() < 0.05);
}

#[test]
fn test_invalid_config_rejected() {
    let (link_a, _link_b) = MockLink::pair(A, B);
    let mut config = NodeConfig::default();
    config.control.dead_zone_min_cm = 30.0;

    let board = Board::new(SimRangeSensor::new(), RecordingMotors::new());
    let result = Node::new(&config, board, link_a, ManualClock::new());
    assert!(matches!(result, Err(tandem_node::NodeError::Config(_))));
}
