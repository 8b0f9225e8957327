//! 报文结构体定义
//!
//! 三类报文：运动命令（主 → 从）、角色切换（双向）、传感器回报（从 → 主）。
//! 编码方式见 crate 文档；解码按首字节标签分派，不再依赖数据报长度。

use crate::label::{LABEL_LEN, Label};
use crate::types::{LightLevel, MotionState, Role, VelocityCommand};
use crate::{NO_LIGHT, NO_TEMPERATURE, ProtocolError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::warn;

/// 角色切换报文的命令字段固定文本
pub const ROLE_CHANGE_COMMAND: &str = "CAMBIAR_MODO";

/// 报文类型标签（数据报首字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageKind {
    MotionCommand = 0x01,
    RoleChange = 0x02,
    SensorReport = 0x03,
}

impl MessageKind {
    /// 标签之后的字段总长度
    pub const fn body_len(self) -> usize {
        match self {
            // left + right + state_label + has_sensors + temperature + light
            MessageKind::MotionCommand => 4 + 4 + LABEL_LEN + 1 + 4 + 4,
            // command_label + target_role
            MessageKind::RoleChange => LABEL_LEN + LABEL_LEN,
            // temperature + light + has_sensors + origin_label
            MessageKind::SensorReport => 4 + 4 + 1 + LABEL_LEN,
        }
    }

    /// 含标签的完整数据报长度
    pub const fn wire_len(self) -> usize {
        1 + self.body_len()
    }
}

/// 随报文携带的传感器读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPayload {
    /// 温度（摄氏度）
    pub temperature: f32,
    pub light: LightLevel,
}

impl SensorPayload {
    fn put(payload: Option<&SensorPayload>, buf: &mut impl BufMut) {
        // 无传感器时写入固件约定的占位值
        let (temperature, light) = match payload {
            Some(p) => (p.temperature, p.light.as_i32()),
            None => (NO_TEMPERATURE, NO_LIGHT),
        };
        buf.put_f32_le(temperature);
        buf.put_i32_le(light);
    }

    fn from_wire(
        has_sensors: bool,
        temperature: f32,
        light: i32,
    ) -> Result<Option<Self>, ProtocolError> {
        if !has_sensors {
            return Ok(None);
        }
        Ok(Some(Self {
            temperature,
            light: LightLevel::try_from(light)?,
        }))
    }
}

/// 运动命令（主 → 从）
///
/// 从机收到后直接驱动电机，并更新运动状态。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCommand {
    pub velocity: VelocityCommand,
    pub state: MotionState,
    /// 主机本地传感器读数（主机没有传感器时为 `None`）
    pub sensors: Option<SensorPayload>,
}

impl MotionCommand {
    fn encode_body(&self, buf: &mut impl BufMut) {
        buf.put_i32_le(self.velocity.left);
        buf.put_i32_le(self.velocity.right);
        Label::new(self.state.label()).put(buf);
        buf.put_u8(self.sensors.is_some() as u8);
        SensorPayload::put(self.sensors.as_ref(), buf);
    }

    fn decode_body(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        let left = buf.get_i32_le();
        let right = buf.get_i32_le();
        let label = Label::get(buf);
        let has_sensors = buf.get_u8() != 0;
        let temperature = buf.get_f32_le();
        let light = buf.get_i32_le();

        let text = label.as_str("state_label")?;
        let state = MotionState::from_label(text).ok_or_else(|| ProtocolError::UnexpectedLabel {
            field: "state_label",
            label: text.to_string(),
        })?;

        // 附带的传感器数据损坏时仍执行运动命令
        let sensors = match SensorPayload::from_wire(has_sensors, temperature, light) {
            Ok(sensors) => sensors,
            Err(e) => {
                warn!("Discarding sensor payload of motion command: {}", e);
                None
            },
        };

        Ok(Self {
            velocity: VelocityCommand::new(left, right),
            state,
            sensors,
        })
    }
}

/// 角色切换请求
///
/// `target` 是**接收方**应采用的角色，发送方自己采用其补集。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChange {
    pub target: Role,
}

impl RoleChange {
    fn encode_body(&self, buf: &mut impl BufMut) {
        Label::new(ROLE_CHANGE_COMMAND).put(buf);
        Label::new(self.target.label()).put(buf);
    }

    fn decode_body(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        let command = Label::get(buf);
        let target = Label::get(buf);

        let command = command.as_str("command_label")?;
        if command != ROLE_CHANGE_COMMAND {
            return Err(ProtocolError::UnexpectedLabel {
                field: "command_label",
                label: command.to_string(),
            });
        }

        let target = target.as_str("target_role")?;
        let target = Role::from_label(target).ok_or_else(|| ProtocolError::UnexpectedLabel {
            field: "target_role",
            label: target.to_string(),
        })?;

        Ok(Self { target })
    }
}

/// 传感器回报（从 → 主）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReport {
    pub sensors: Option<SensorPayload>,
    /// 发送方角色
    pub origin: Role,
}

impl SensorReport {
    fn encode_body(&self, buf: &mut impl BufMut) {
        SensorPayload::put(self.sensors.as_ref(), buf);
        buf.put_u8(self.sensors.is_some() as u8);
        Label::new(self.origin.label()).put(buf);
    }

    fn decode_body(buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        let temperature = buf.get_f32_le();
        let light = buf.get_i32_le();
        let has_sensors = buf.get_u8() != 0;
        let origin = Label::get(buf);

        let origin = origin.as_str("origin_label")?;
        let origin = Role::from_label(origin).ok_or_else(|| ProtocolError::UnexpectedLabel {
            field: "origin_label",
            label: origin.to_string(),
        })?;

        Ok(Self {
            sensors: SensorPayload::from_wire(has_sensors, temperature, light)?,
            origin,
        })
    }
}

/// 链路报文
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Motion(MotionCommand),
    RoleChange(RoleChange),
    SensorReport(SensorReport),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Motion(_) => MessageKind::MotionCommand,
            Message::RoleChange(_) => MessageKind::RoleChange,
            Message::SensorReport(_) => MessageKind::SensorReport,
        }
    }

    /// 编码到缓冲区末尾
    pub fn encode_into(&self, buf: &mut BytesMut) {
        let kind = self.kind();
        buf.reserve(kind.wire_len());
        buf.put_u8(kind.into());
        match self {
            Message::Motion(m) => m.encode_body(buf),
            Message::RoleChange(r) => r.encode_body(buf),
            Message::SensorReport(s) => s.encode_body(buf),
        }
    }

    /// 编码为独立数据报
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.kind().wire_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// 解码一个数据报
    ///
    /// 数据报尾部多余的字节会被忽略。
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = data;
        if !buf.has_remaining() {
            return Err(ProtocolError::Empty);
        }

        let tag = buf.get_u8();
        let kind = MessageKind::try_from(tag).map_err(|_| ProtocolError::UnknownKind(tag))?;

        if buf.remaining() < kind.body_len() {
            return Err(ProtocolError::Truncated {
                kind,
                expected: kind.wire_len(),
                actual: data.len(),
            });
        }

        match kind {
            MessageKind::MotionCommand => MotionCommand::decode_body(&mut buf).map(Message::Motion),
            MessageKind::RoleChange => RoleChange::decode_body(&mut buf).map(Message::RoleChange),
            MessageKind::SensorReport => {
                SensorReport::decode_body(&mut buf).map(Message::SensorReport)
            },
        }
    }
}

impl From<MotionCommand> for Message {
    fn from(msg: MotionCommand) -> Self {
        Message::Motion(msg)
    }
}

impl From<RoleChange> for Message {
    fn from(msg: RoleChange) -> Self {
        Message::RoleChange(msg)
    }
}

impl From<SensorReport> for Message {
    fn from(msg: SensorReport) -> Self {
        Message::SensorReport(msg)
    }
}

impl TryFrom<&[u8]> for Message {
    type Error = ProtocolError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Message::decode(data)
    }
}
