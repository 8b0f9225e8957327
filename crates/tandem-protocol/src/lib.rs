//! # Tandem Protocol
//!
//! 双车点对点链路的报文定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `types`: 角色、运动状态、光照等级、轮速命令
//! - `label`: 定长 20 字节文本字段
//! - `message`: 三类报文及其编解码
//!
//! ## 帧格式
//!
//! 每个数据报第 1 字节为报文类型标签，其后为定宽字段，整数与浮点均为小端字节序
//! （与 ESP8266 端 `memcpy` 出来的结构体布局一致）。
//!
//! ```text
//! +------+---------------------------------------------+
//! | kind | fixed-width little-endian fields            |
//! +------+---------------------------------------------+
//!   u8     MotionCommand(37) / RoleChange(40) / SensorReport(29)
//! ```

pub mod label;
pub mod message;
pub mod types;

// 重新导出常用类型
pub use label::{LABEL_LEN, Label};
pub use message::*;
pub use types::*;

use thiserror::Error;

/// 单个数据报的最大负载（ESP-NOW 限制）
pub const MAX_PAYLOAD: usize = 250;

/// 无传感器时温度字段的占位值
pub const NO_TEMPERATURE: f32 = -999.0;

/// 无传感器时光照字段的占位值
pub const NO_LIGHT: i32 = -1;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Empty datagram")]
    Empty,

    #[error("Unknown message kind: 0x{0:02X}")]
    UnknownKind(u8),

    #[error("Truncated {kind:?}: expected {expected} bytes, got {actual}")]
    Truncated {
        kind: MessageKind,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid label in field {field}")]
    InvalidLabel { field: &'static str },

    #[error("Unexpected label in field {field}: {label:?}")]
    UnexpectedLabel { field: &'static str, label: String },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: i32 },
}
