//! # Tandem CLI
//!
//! 双车主从协同的命令行工具。
//!
//! ```bash
//! # 生成默认节点配置
//! tandem config init
//!
//! # 进程内仿真两辆车（模拟链路 + 一维场景）
//! tandem simulate --ticks 200 --loss 0.1 --swap-at 120
//!
//! # 通过 UDP 运行单个节点
//! tandem run --local-id AA:BB:CC:DD:EE:01 --bind 0.0.0.0:4210 --peer-addr 192.168.1.20:4210
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCommand, RunCommand, SimulateCommand};

/// Tandem CLI - 双车主从协同
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(about = "Master/slave vehicle pair control", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 节点配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 进程内仿真一对车辆
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 通过 UDP 运行单个节点
    Run {
        #[command(flatten)]
        args: RunCommand,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tandem_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Simulate { args } => args.execute(),
        Commands::Run { args } => args.execute(),
    }
}
