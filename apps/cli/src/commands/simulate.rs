//! simulate 命令
//!
//! 在一个进程里运行两个节点：`MockLink` 互联、手动时钟、一维场景。
//!
//! 场景：障碍物位于 x = 0，车 A 在障碍物后方 `gap` 处，车 B 在 A 后方 `spacing` 处。
//! 每辆车的测距读数是它到前方物体（障碍物或前车）的距离。正轮速使车后退（x 增大），
//! 负轮速使车前进。

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tandem_driver::mock::{RecordingLight, RecordingMotors, SimEnvironment, SimRangeSensor};
use tandem_driver::{Board, Clock, ManualClock};
use tandem_link::{MockLink, PeerId};
use tandem_node::{Node, NodeConfig, NodeSnapshot};
use tandem_protocol::{LightLevel, Role};
use tracing::info;

use super::config::load_config;

const STATION_A: PeerId = PeerId::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
const STATION_B: PeerId = PeerId::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x02]);

/// 每单位轮速对应的车速（cm/s）
const CM_PER_SEC_PER_UNIT: f32 = 0.05;

/// 仿真命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 仿真周期数
    #[arg(short, long, default_value_t = 200)]
    pub ticks: usize,

    /// 每周期时长（毫秒）
    #[arg(long, default_value_t = 50)]
    pub tick_ms: u64,

    /// 车 A 到障碍物的初始距离（cm）
    #[arg(long, default_value_t = 30.0)]
    pub gap: f32,

    /// 车 B 到车 A 的初始距离（cm）
    #[arg(long, default_value_t = 25.0)]
    pub spacing: f32,

    /// 链路丢包率（0.0 ~ 1.0）
    #[arg(long, default_value_t = 0.0)]
    pub loss: f64,

    /// 丢包随机种子
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// 在第 N 个周期让主机交出主控权
    #[arg(long)]
    pub swap_at: Option<usize>,

    /// 基础配置（两车共用控制参数）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 每个周期输出一行 JSON
    #[arg(long)]
    pub json: bool,
}

impl SimulateCommand {
    pub fn execute(&self) -> Result<()> {
        let base = load_config(self.config.as_deref())?;
        let mut sim = Simulation::new(&base, self)?;

        info!(
            "Simulating {} ticks (gap {} cm, loss {:.0}%)",
            self.ticks,
            self.gap,
            self.loss * 100.0
        );

        if !self.json {
            println!(
                "{:>5} {:>8} | {:<8} {:<13} {:>7} {:>5} | {:<8} {:<13} {:>5} {:>6} {:<9}",
                "tick",
                "t(ms)",
                "A",
                "estado",
                "dist",
                "vel",
                "B",
                "estado",
                "vel",
                "temp",
                "origen"
            );
        }

        for tick in 0..self.ticks {
            if self.swap_at == Some(tick) {
                sim.swap_roles();
            }
            let record = sim.step(tick);

            if self.json {
                println!("{}", serde_json::to_string(&record)?);
            } else {
                print_row(&record);
            }
        }

        let [a, b] = sim.snapshots();
        println!();
        println!("📊 链路统计:");
        for snapshot in [&a, &b] {
            println!(
                "  {}: 发送 {} / 接收 {} / 失败 {} ({:.1}%)",
                snapshot.name,
                snapshot.messages_sent,
                snapshot.messages_received,
                snapshot.messages_failed,
                snapshot.success_rate
            );
        }
        println!(
            "  最终间距: A→障碍物 {:.1} cm, B→A {:.1} cm",
            sim.world().gap_a(),
            sim.world().gap_b()
        );

        Ok(())
    }
}

fn print_row(record: &TickRecord) {
    let [a, b] = &record.nodes;
    let temperature = b
        .temperature
        .map(|t| format!("{t:.1}"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:>5} {:>8} | {:<8} {:<13} {:>7.1} {:>5} | {:<8} {:<13} {:>5} {:>6} {:<9}",
        record.tick,
        record.elapsed_ms,
        a.role,
        a.motion_state,
        a.distance_cm,
        a.velocity_left,
        b.role,
        b.motion_state,
        b.velocity_left,
        temperature,
        a.data_origin
    );
}

/// 一个周期的输出
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub tick: usize,
    pub elapsed_ms: u128,
    pub gap_a_cm: f32,
    pub gap_b_cm: f32,
    pub nodes: [NodeSnapshot; 2],
}

/// 一维场景：障碍物固定在原点
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    /// 车 A 的位置（cm）
    pub a: f32,
    /// 车 B 的位置（cm）
    pub b: f32,
}

impl World {
    pub fn new(gap: f32, spacing: f32) -> Self {
        Self {
            a: gap,
            b: gap + spacing,
        }
    }

    /// 按两车当前轮速推进 `dt`
    pub fn advance(&mut self, dt: Duration, velocity_a: (i32, i32), velocity_b: (i32, i32)) {
        let seconds = dt.as_secs_f32();
        // 车不能穿过障碍物或前车
        self.a = (self.a + speed(velocity_a) * seconds).max(0.0);
        self.b = (self.b + speed(velocity_b) * seconds).max(self.a);
    }

    pub fn gap_a(&self) -> f32 {
        self.a
    }

    pub fn gap_b(&self) -> f32 {
        self.b - self.a
    }
}

fn speed((left, right): (i32, i32)) -> f32 {
    (left + right) as f32 / 2.0 * CM_PER_SEC_PER_UNIT
}

/// 两个节点与场景
pub struct Simulation {
    clock: ManualClock,
    start: Instant,
    last_update: Instant,
    world: World,
    a: Node<MockLink, ManualClock>,
    b: Node<MockLink, ManualClock>,
    range_a: SimRangeSensor,
    range_b: SimRangeSensor,
    motors_a: RecordingMotors,
    motors_b: RecordingMotors,
    tick_period: Duration,
}

impl Simulation {
    /// A 起始为主机（只有测距与电机），B 为从机（带环境传感器与灯）
    pub fn new(base: &NodeConfig, args: &SimulateCommand) -> Result<Self> {
        let clock = ManualClock::new();
        let start = clock.now();
        let world = World::new(args.gap, args.spacing);

        let (link_a, link_b) = MockLink::pair(STATION_A, STATION_B);
        let link_a = link_a.with_loss(args.loss, args.seed);
        let link_b = link_b.with_loss(args.loss, args.seed.wrapping_add(1));

        let mut config_a = base.clone();
        config_a.node.name = "coche-a".to_string();
        config_a.node.start_role = Role::Master;
        config_a.node.peer = STATION_B;
        config_a.node.auto_mode = true;

        let mut config_b = base.clone();
        config_b.node.name = "coche-b".to_string();
        config_b.node.start_role = Role::Slave;
        config_b.node.peer = STATION_A;
        config_b.node.auto_mode = true;

        let range_a = SimRangeSensor::at_distance(world.gap_a());
        let motors_a = RecordingMotors::new();
        let board_a = Board::new(range_a.clone(), motors_a.clone());

        let range_b = SimRangeSensor::at_distance(world.gap_b());
        let motors_b = RecordingMotors::new();
        let board_b = Board::new(range_b.clone(), motors_b.clone())
            .with_environment(SimEnvironment::new(21.5, LightLevel::Dark))
            .with_light(RecordingLight::new());

        let a = Node::new(&config_a, board_a, link_a, clock.clone())?;
        let b = Node::new(&config_b, board_b, link_b, clock.clone())?;

        Ok(Self {
            clock,
            start,
            last_update: start,
            world,
            a,
            b,
            range_a,
            range_b,
            motors_a,
            motors_b,
            tick_period: Duration::from_millis(args.tick_ms),
        })
    }

    /// 当前主机把主控权交给对端
    pub fn swap_roles(&mut self) {
        if self.a.role().is_master() {
            info!("{} hands over to {}", self.a.name(), self.b.name());
            self.a.set_role(Role::Slave);
        } else {
            info!("{} hands over to {}", self.b.name(), self.a.name());
            self.b.set_role(Role::Slave);
        }
    }

    /// 推进一个周期：更新场景 → 刷新测距 → 两个节点各 tick 一次
    pub fn step(&mut self, tick: usize) -> TickRecord {
        self.clock.advance(self.tick_period);

        // 节点内部的采样间隔与助推等待也会推进时钟
        let now = self.clock.now();
        let dt = now.duration_since(self.last_update);
        self.last_update = now;
        self.world
            .advance(dt, self.motors_a.velocities(), self.motors_b.velocities());

        self.range_a.set_distance(Some(self.world.gap_a()));
        self.range_b.set_distance(Some(self.world.gap_b()));

        self.a.tick();
        self.b.tick();

        TickRecord {
            tick,
            elapsed_ms: self.clock.now().duration_since(self.start).as_millis(),
            gap_a_cm: self.world.gap_a(),
            gap_b_cm: self.world.gap_b(),
            nodes: self.snapshots(),
        }
    }

    pub fn snapshots(&self) -> [NodeSnapshot; 2] {
        [self.a.snapshot(), self.b.snapshot()]
    }

    pub fn world(&self) -> &World {
        &self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_protocol::MotionState;

    fn args(gap: f32) -> SimulateCommand {
        SimulateCommand {
            ticks: 0,
            tick_ms: 50,
            gap,
            spacing: 25.0,
            loss: 0.0,
            seed: 7,
            swap_at: None,
            config: None,
            json: false,
        }
    }

    #[test]
    fn test_world_kinematics() {
        let mut world = World::new(30.0, 25.0);
        // 前进 200 → 10 cm/s，后退 100 → 5 cm/s
        world.advance(Duration::from_secs(1), (-200, -200), (100, 100));
        assert!((world.gap_a() - 20.0).abs() < 1e-4);
        assert!((world.gap_b() - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_master_settles_in_dead_zone() {
        let mut sim = Simulation::new(&NodeConfig::default(), &args(30.0)).unwrap();
        for tick in 0..400 {
            sim.step(tick);
        }

        let [a, b] = sim.snapshots();
        assert_eq!(a.motion_state, MotionState::Stopped.label());
        assert_eq!(b.motion_state, MotionState::Stopped.label());
        let gap = sim.world().gap_a();
        assert!((14.5..=20.5).contains(&gap), "gap = {gap}");
    }

    #[test]
    fn test_slave_sensors_reach_master() {
        let mut sim = Simulation::new(&NodeConfig::default(), &args(30.0)).unwrap();
        for tick in 0..10 {
            sim.step(tick);
        }

        let [a, _] = sim.snapshots();
        assert_eq!(a.data_origin, "REMOTO");
        assert_eq!(a.temperature, Some(21.5));
        assert_eq!(a.light, Some(0));
    }

    #[test]
    fn test_swap_roles() {
        let mut sim = Simulation::new(&NodeConfig::default(), &args(30.0)).unwrap();
        sim.step(0);
        sim.swap_roles();
        sim.step(1);

        let [a, b] = sim.snapshots();
        assert_eq!(a.role, "ESCLAVO");
        assert_eq!(b.role, "MAESTRO");
    }

    #[test]
    fn test_record_serializes() {
        let mut sim = Simulation::new(&NodeConfig::default(), &args(30.0)).unwrap();
        let record = sim.step(0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tick"], 0);
        assert_eq!(json["nodes"][0]["role"], "MAESTRO");
        assert_eq!(json["nodes"][1]["role"], "ESCLAVO");
    }
}
