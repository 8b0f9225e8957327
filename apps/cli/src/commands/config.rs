//! 配置管理命令
//!
//! 节点配置默认位于 `<config_dir>/tandem/node.toml`。

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tandem_node::NodeConfig;
use tracing::info;

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("tandem");
    path.push("node.toml");
    Ok(path)
}

fn resolve(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => default_config_file(),
    }
}

/// 加载节点配置
///
/// 显式给出的路径必须存在；默认路径不存在时使用内置默认值。
pub fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
    if let Some(path) = path {
        return NodeConfig::load(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()));
    }

    let path = default_config_file()?;
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(NodeConfig::default());
    }

    NodeConfig::load(&path).with_context(|| format!("读取配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 写入默认配置
    Init {
        /// 配置文件路径（默认 `<config_dir>/tandem/node.toml`）
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },

    /// 打印生效的配置
    Show {
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// 检查配置文件
    Check {
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Init { path, force } => Self::init_(resolve(path)?, force),
            ConfigCommand::Show { path } => Self::show_(path),
            ConfigCommand::Check { path } => Self::check_(resolve(path)?),
        }
    }

    fn init_(path: PathBuf, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }

        NodeConfig::default()
            .save(&path)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;

        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn show_(path: Option<PathBuf>) -> Result<()> {
        let config = load_config(path.as_deref())?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(path: PathBuf) -> Result<()> {
        let config = NodeConfig::load(&path)
            .with_context(|| format!("配置检查失败: {}", path.display()))?;

        println!("配置文件: {}", path.display());
        println!("  节点: {} ({})", config.node.name, config.node.start_role);
        println!("  对端: {}", config.node.peer);
        println!("  控制律: {:?}", config.control.law);
        println!(
            "  死区: {} ~ {} cm",
            config.control.dead_zone_min_cm, config.control.dead_zone_max_cm
        );
        println!("✅ 配置有效");
        Ok(())
    }
}
