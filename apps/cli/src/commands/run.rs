//! run 命令
//!
//! 通过 UDP 运行单个节点。外设为模拟件：测距读数固定在 `--distance`，
//! 可选的环境传感器与灯由命令行参数决定。

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tandem_driver::mock::{RecordingLight, RecordingMotors, SimEnvironment, SimRangeSensor};
use tandem_driver::{Board, Clock, SystemClock};
use tandem_link::{PeerId, UdpLink};
use tandem_node::Node;
use tandem_protocol::{LightLevel, Role};
use tracing::{info, warn};

use super::config::load_config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Master,
    Slave,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Master => Role::Master,
            RoleArg::Slave => Role::Slave,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LightArg {
    Dark,
    Light,
}

impl From<LightArg> for LightLevel {
    fn from(light: LightArg) -> Self {
        match light {
            LightArg::Dark => LightLevel::Dark,
            LightArg::Light => LightLevel::Light,
        }
    }
}

/// 节点运行参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 本站地址（如 AA:BB:CC:DD:EE:01）
    #[arg(long)]
    pub local_id: PeerId,

    /// 本地 UDP 监听地址
    #[arg(long, default_value = "0.0.0.0:4210")]
    pub bind: SocketAddr,

    /// 对端的 UDP 地址
    #[arg(long)]
    pub peer_addr: SocketAddr,

    /// 节点配置文件
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 覆盖配置中的起始角色
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,

    /// 覆盖配置中的对端站点地址
    #[arg(long)]
    pub peer: Option<PeerId>,

    /// 模拟测距读数（cm）
    #[arg(long, default_value_t = 30.0)]
    pub distance: f32,

    /// 模拟温度（摄氏度）；给出时启用环境传感器
    #[arg(long)]
    pub temperature: Option<f32>,

    /// 模拟光照
    #[arg(long, value_enum, default_value = "light")]
    pub light: LightArg,

    /// 挂载灯
    #[arg(long)]
    pub lights: bool,

    /// 控制周期（毫秒）
    #[arg(long, default_value_t = 50)]
    pub tick_ms: u64,

    /// 每隔多少个周期输出一次状态
    #[arg(long, default_value_t = 20)]
    pub report_every: u64,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(role) = self.role {
            config.node.start_role = role.into();
        }
        if let Some(peer) = self.peer {
            config.node.peer = peer;
        }

        let link = UdpLink::bind(self.local_id, self.bind)
            .with_context(|| format!("绑定 UDP 地址失败: {}", self.bind))?
            .with_peer(config.node.peer, self.peer_addr);

        let mut board = Board::new(
            SimRangeSensor::at_distance(self.distance),
            RecordingMotors::new(),
        );
        if let Some(celsius) = self.temperature {
            board = board.with_environment(SimEnvironment::new(celsius, self.light.into()));
        }
        if self.lights {
            board = board.with_light(RecordingLight::new());
        }

        let mut node = Node::new(&config, board, link, SystemClock)?;

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .context("设置 Ctrl-C 处理器失败")?;

        info!(
            "Running {} as {} on {} (peer {} at {})",
            node.name(),
            node.role(),
            self.bind,
            node.peer(),
            self.peer_addr
        );

        let period = Duration::from_millis(self.tick_ms);
        let report_every = self.report_every.max(1);
        let mut ticks = 0u64;

        while running.load(Ordering::SeqCst) {
            let started = node.clock().now();
            node.tick();
            ticks += 1;

            if ticks % report_every == 0 {
                let s = node.snapshot();
                info!(
                    "[{}] {} dist={:.1}cm vel=({}, {}) temp={:?} light={:?} origin={} ok={:.1}%",
                    s.role,
                    s.motion_state,
                    s.distance_cm,
                    s.velocity_left,
                    s.velocity_right,
                    s.temperature,
                    s.light,
                    s.data_origin,
                    s.success_rate
                );
            }

            let elapsed = node.clock().now().duration_since(started);
            match period.checked_sub(elapsed) {
                Some(remaining) => node.clock().sleep(remaining),
                None => warn!("Tick overran by {:?}", elapsed - period),
            }
        }

        node.stop();
        let stats = node.stats();
        println!();
        println!("📊 链路统计:");
        println!("  发送: {}", stats.sent);
        println!("  接收: {}", stats.received);
        println!("  失败: {}", stats.failed);
        println!("  成功率: {:.1}%", stats.success_rate());

        Ok(())
    }
}
