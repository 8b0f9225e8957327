//! 节点层错误类型

use crate::config::ConfigError;
use tandem_link::{LinkError, PeerId};
use tandem_protocol::ProtocolError;
use thiserror::Error;

/// 节点层错误
///
/// 运行期的链路与协议错误只记录日志和计数，不会中断控制循环；
/// 只有构造节点时的配置错误会返回给调用方。
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Datagram from foreign station {0}")]
    ForeignStation(PeerId),
}
