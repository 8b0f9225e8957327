//! # Tandem Node
//!
//! 双车主从协同的节点层：
//!
//! - `config`: TOML 节点配置
//! - `fusion`: 本地/对端传感器数据融合
//! - `peer`: 点对点协议（角色状态机、流控、统计）
//! - `node`: 每周期的编排逻辑
//! - `snapshot`: 展示层快照
//!
//! # 示例
//!
//! ```rust,no_run
//! use tandem_driver::{Board, SystemClock};
//! use tandem_driver::mock::{RecordingMotors, SimRangeSensor};
//! use tandem_link::{PeerId, UdpLink};
//! use tandem_node::{Node, NodeConfig};
//!
//! let config = NodeConfig::default();
//! let link = UdpLink::bind(PeerId::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]), "0.0.0.0:4210")?;
//! let board = Board::new(SimRangeSensor::at_distance(30.0), RecordingMotors::new());
//! let mut node = Node::new(&config, board, link, SystemClock)?;
//!
//! node.tick();
//! println!("{:?}", node.snapshot());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod error;
pub mod fusion;
pub mod node;
pub mod peer;
pub mod snapshot;

pub use config::{ConfigError, LawKind, NodeConfig};
pub use error::NodeError;
pub use fusion::{DataOrigin, FusedReading, SensorFusion};
pub use node::Node;
pub use peer::{Inbound, LinkState, LinkStats, PeerProtocol};
pub use snapshot::NodeSnapshot;
