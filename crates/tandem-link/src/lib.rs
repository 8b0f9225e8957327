//! # Tandem Link Layer
//!
//! 无连接数据报链路抽象：尽力而为、无序、单个小负载。
//!
//! 发送是"发出即忘"的：`send` 只负责把数据报交给底层，投递结果稍后以
//! [`LinkEvent::Delivered`] 的形式从 [`Link::poll`] 返回。收到的数据报同样通过
//! `poll` 取出，由上层按顺序逐个处理。
//!
//! ## 后端
//!
//! - [`UdpLink`]：基于 `std::net::UdpSocket` 的主机端实现
//! - `MockLink`：进程内成对链路，可注入丢包（feature `mock`）

use bytes::Bytes;
use thiserror::Error;

pub mod peer_id;
pub mod udp;

#[cfg(feature = "mock")]
pub mod mock;

pub use peer_id::PeerId;
pub use udp::UdpLink;

#[cfg(feature = "mock")]
pub use mock::MockLink;

// 重新导出负载上限
pub use tandem_protocol::MAX_PAYLOAD;

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("Link disconnected")]
    Disconnected,
    #[error("Invalid peer id: {0:?}")]
    InvalidPeerId(String),
    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),
}

/// 链路事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// 上一次发送的投递结果
    Delivered { success: bool },
    /// 收到一个数据报
    Received { from: PeerId, payload: Bytes },
}

/// 数据报链路
pub trait Link {
    /// 本站地址
    fn local_id(&self) -> PeerId;

    /// 发送一个数据报
    ///
    /// 返回 `Ok` 只表示数据报已交给底层，投递结果通过 `poll` 异步报告。
    /// 同步失败（负载超限、套接字错误）直接返回 `Err`，此时不会再产生投递事件。
    fn send(&mut self, peer: PeerId, payload: &[u8]) -> Result<(), LinkError>;

    /// 取出一个待处理事件（非阻塞）
    fn poll(&mut self) -> Option<LinkEvent>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn local_id(&self) -> PeerId {
        (**self).local_id()
    }

    fn send(&mut self, peer: PeerId, payload: &[u8]) -> Result<(), LinkError> {
        (**self).send(peer, payload)
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        (**self).poll()
    }
}

/// 检查负载长度
pub(crate) fn check_payload(payload: &[u8]) -> Result<(), LinkError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(LinkError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    Ok(())
}
