//! 定长文本字段
//!
//! 对端固件使用 `char[20]` 存放命令与角色文本，`strcpy` 写入，以 NUL 结尾。
//! 这里按同样的布局读写：最多 19 个有效字节，其余补 0。

use crate::ProtocolError;
use bytes::{Buf, BufMut};

/// 文本字段宽度（字节）
pub const LABEL_LEN: usize = 20;

/// 20 字节 NUL 填充文本
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label([u8; LABEL_LEN]);

impl Label {
    /// 从字符串创建（超过 19 字节的部分被截断，保留结尾 NUL）
    pub fn new(text: &str) -> Self {
        let mut raw = [0u8; LABEL_LEN];
        let len = text.len().min(LABEL_LEN - 1);
        raw[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(raw)
    }

    /// 有效文本（NUL 之前的部分）
    ///
    /// 非 UTF-8 内容返回 `InvalidLabel`。
    pub fn as_str(&self, field: &'static str) -> Result<&str, ProtocolError> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(LABEL_LEN);
        std::str::from_utf8(&self.0[..end]).map_err(|_| ProtocolError::InvalidLabel { field })
    }

    pub fn as_bytes(&self) -> &[u8; LABEL_LEN] {
        &self.0
    }

    pub(crate) fn put(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.0);
    }

    /// 调用方保证 `buf.remaining() >= LABEL_LEN`
    pub(crate) fn get(buf: &mut impl Buf) -> Self {
        let mut raw = [0u8; LABEL_LEN];
        buf.copy_to_slice(&mut raw);
        Self(raw)
    }
}

impl std::fmt::Debug for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_str("label") {
            Ok(text) => write!(f, "Label({text:?})"),
            Err(_) => write!(f, "Label({:02X?})", self.0),
        }
    }
}
