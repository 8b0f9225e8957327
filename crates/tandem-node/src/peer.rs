//! # 点对点协议
//!
//! - 角色状态机：主/从，切换立即生效，并通知对端采用互补角色（不确认）
//! - 流控：同一时刻最多一条未确认的数据报，且两次发送至少间隔 `min_send_interval`；
//!   不重传
//! - 统计：发送、接收、失败计数与成功率
//!
//! 角色切换报文属于控制报文：绕过流控，不计入发送计数。

use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tandem_link::{Link, LinkEvent, PeerId};
use tandem_protocol::{Message, MotionCommand, Role, RoleChange, SensorReport};
use tracing::{debug, info, trace, warn};

/// 链路统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkStats {
    /// 成功交给链路的数据报数
    pub sent: u64,
    /// 被接受的入站报文数
    pub received: u64,
    /// 失败次数（投递失败或同步发送错误）
    pub failed: u64,
}

impl LinkStats {
    /// 成功率（%）：`sent / (sent + failed) × 100`，尚无发送时为 100
    pub fn success_rate(&self) -> f32 {
        let total = self.sent + self.failed;
        if total == 0 {
            return 100.0;
        }
        self.sent as f32 / total as f32 * 100.0
    }
}

/// 流控状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkState {
    pub awaiting_ack: bool,
    pub last_send_at: Option<Instant>,
}

/// 被接受的入站报文
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Inbound {
    /// 从机收到的运动命令
    Motion(MotionCommand),
    /// 对端要求的角色切换（已生效）
    RoleChanged { previous: Role, current: Role },
    /// 主机收到的传感器回传
    SensorReport(SensorReport),
}

/// 点对点协议端点
pub struct PeerProtocol<L> {
    link: L,
    peer: PeerId,
    role: Role,
    state: LinkState,
    stats: LinkStats,
    min_send_interval: Duration,
}

impl<L: Link> PeerProtocol<L> {
    pub fn new(link: L, peer: PeerId, role: Role, min_send_interval: Duration) -> Self {
        Self {
            link,
            peer,
            role,
            state: LinkState::default(),
            stats: LinkStats::default(),
            min_send_interval,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn link_state(&self) -> LinkState {
        self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// 流控闸门：没有未确认的报文，且距上次发送不少于 `min_send_interval`
    pub fn can_send(&self, now: Instant) -> bool {
        if self.state.awaiting_ack {
            return false;
        }
        self.state
            .last_send_at
            .is_none_or(|t| now.saturating_duration_since(t) >= self.min_send_interval)
    }

    /// 发送运动命令（受流控）；返回是否已发出
    pub fn send_motion(&mut self, command: MotionCommand, now: Instant) -> bool {
        self.send_gated(Message::Motion(command), now)
    }

    /// 发送传感器回传（受流控）；返回是否已发出
    pub fn send_sensor_report(&mut self, report: SensorReport, now: Instant) -> bool {
        self.send_gated(Message::SensorReport(report), now)
    }

    fn send_gated(&mut self, message: Message, now: Instant) -> bool {
        if !self.can_send(now) {
            trace!(
                "Send of {:?} suppressed (awaiting_ack={})",
                message.kind(),
                self.state.awaiting_ack
            );
            return false;
        }

        match self.transmit(&message) {
            Ok(()) => {
                self.state.awaiting_ack = true;
                self.state.last_send_at = Some(now);
                self.stats.sent += 1;
                debug!("Sent {:?} to {}", message.kind(), self.peer);
                true
            },
            Err(e) => {
                // 同步失败：不会再有投递结果，闸门保持打开
                self.stats.failed += 1;
                warn!("Failed to send {:?} to {}: {}", message.kind(), self.peer, e);
                false
            },
        }
    }

    fn transmit(&mut self, message: &Message) -> Result<(), NodeError> {
        self.link.send(self.peer, &message.encode())?;
        Ok(())
    }

    /// 本地切换角色，并要求对端采用互补角色
    ///
    /// 返回切换前的角色。角色切换报文不确认，丢失后两端角色可能不一致。
    pub fn set_role(&mut self, role: Role) -> Role {
        let previous = self.role;
        self.role = role;
        info!("Role changed locally: {} -> {}", previous, role);

        let request = Message::RoleChange(RoleChange {
            target: role.complement(),
        });
        if let Err(e) = self.transmit(&request) {
            warn!("Failed to send role change to {}: {}", self.peer, e);
        }
        previous
    }

    /// 投递结果
    pub fn on_delivery(&mut self, success: bool) {
        self.state.awaiting_ack = false;
        if !success {
            self.stats.failed += 1;
            warn!(
                "Delivery to {} failed ({} failures so far)",
                self.peer, self.stats.failed
            );
        }
    }

    /// 处理一个入站数据报
    ///
    /// 格式错误、来自其他站点或与当前角色不符的报文被丢弃，计数不变。
    pub fn handle_datagram(&mut self, from: PeerId, payload: &[u8]) -> Option<Inbound> {
        match self.accept(from, payload) {
            Ok(inbound) => inbound,
            Err(NodeError::ForeignStation(station)) => {
                debug!("Ignoring datagram from foreign station {}", station);
                None
            },
            Err(e) => {
                warn!("Dropping malformed datagram from {}: {}", from, e);
                None
            },
        }
    }

    fn accept(&mut self, from: PeerId, payload: &[u8]) -> Result<Option<Inbound>, NodeError> {
        if from != self.peer {
            return Err(NodeError::ForeignStation(from));
        }

        let inbound = match (Message::decode(payload)?, self.role) {
            (Message::Motion(command), Role::Slave) => Inbound::Motion(command),
            (Message::SensorReport(report), Role::Master) => Inbound::SensorReport(report),
            (Message::RoleChange(request), _) => {
                let previous = self.role;
                self.role = request.target;
                info!(
                    "Role changed by peer {}: {} -> {}",
                    from, previous, request.target
                );
                Inbound::RoleChanged {
                    previous,
                    current: request.target,
                }
            },
            (message, role) => {
                debug!("Ignoring {:?} while {}", message.kind(), role);
                return Ok(None);
            },
        };

        self.stats.received += 1;
        Ok(Some(inbound))
    }

    /// 取出一个链路事件
    pub fn poll(&mut self) -> Option<LinkEvent> {
        self.link.poll()
    }
}
