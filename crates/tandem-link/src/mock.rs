//! 进程内模拟链路
//!
//! [`MockLink::pair`] 创建一对互联的端点，数据报经 `crossbeam-channel` 传递。
//! 可按比例注入丢包（使用固定种子的 `StdRng`，结果可复现），也可暂扣投递结果，
//! 以便测试"等待确认"期间的行为。

use crate::{Link, LinkError, LinkEvent, PeerId, check_payload};
use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::trace;

type Datagram = (PeerId, Bytes);

/// 模拟链路端点
pub struct MockLink {
    local_id: PeerId,
    peer_id: PeerId,
    /// 发往对端
    tx: Sender<Datagram>,
    /// 本端收件箱
    rx: Receiver<Datagram>,
    /// 本端收件箱的发送端（用于注入外来数据报）
    inbox: Sender<Datagram>,
    outcomes: VecDeque<LinkEvent>,
    hold_outcomes: bool,
    loss: f64,
    rng: StdRng,
    fail_next: usize,
    sent: u64,
    lost: u64,
}

impl MockLink {
    /// 创建一对互联端点（无丢包）
    pub fn pair(a: PeerId, b: PeerId) -> (MockLink, MockLink) {
        let (to_b, b_rx) = unbounded();
        let (to_a, a_rx) = unbounded();

        let end_a = MockLink::new(a, b, to_b.clone(), a_rx, to_a.clone(), 0);
        let end_b = MockLink::new(b, a, to_a, b_rx, to_b, 1);
        (end_a, end_b)
    }

    fn new(
        local_id: PeerId,
        peer_id: PeerId,
        tx: Sender<Datagram>,
        rx: Receiver<Datagram>,
        inbox: Sender<Datagram>,
        seed: u64,
    ) -> Self {
        Self {
            local_id,
            peer_id,
            tx,
            rx,
            inbox,
            outcomes: VecDeque::new(),
            hold_outcomes: false,
            loss: 0.0,
            rng: StdRng::seed_from_u64(seed),
            fail_next: 0,
            sent: 0,
            lost: 0,
        }
    }

    /// 设置丢包率（`0.0..=1.0`）与随机种子
    pub fn with_loss(mut self, ratio: f64, seed: u64) -> Self {
        self.set_loss(ratio);
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn set_loss(&mut self, ratio: f64) {
        self.loss = ratio.clamp(0.0, 1.0);
    }

    /// 暂扣投递结果，直到 [`release_outcomes`](Self::release_outcomes)
    pub fn hold_outcomes(&mut self, hold: bool) {
        self.hold_outcomes = hold;
    }

    /// 释放暂扣的投递结果
    pub fn release_outcomes(&mut self) {
        self.hold_outcomes = false;
    }

    /// 接下来 `count` 次发送同步失败
    pub fn fail_next_sends(&mut self, count: usize) {
        self.fail_next = count;
    }

    /// 向本端收件箱注入一个数据报（模拟任意来源）
    pub fn inject(&self, from: PeerId, payload: impl Into<Bytes>) {
        // 本端持有收件箱的接收端，发送不会失败
        let _ = self.inbox.send((from, payload.into()));
    }

    pub fn pending_outcomes(&self) -> usize {
        self.outcomes.len()
    }

    /// 成功交给对端的数据报数
    pub fn datagrams_sent(&self) -> u64 {
        self.sent
    }

    /// 被丢弃的数据报数
    pub fn datagrams_lost(&self) -> u64 {
        self.lost
    }
}

impl Link for MockLink {
    fn local_id(&self) -> PeerId {
        self.local_id
    }

    fn send(&mut self, peer: PeerId, payload: &[u8]) -> Result<(), LinkError> {
        check_payload(payload)?;
        if peer != self.peer_id {
            return Err(LinkError::UnknownPeer(peer));
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(LinkError::Io(std::io::Error::other("injected send failure")));
        }

        let lost = self.loss > 0.0 && self.rng.gen_bool(self.loss);
        if lost {
            self.lost += 1;
            trace!("Mock link {} dropped {} bytes", self.local_id, payload.len());
        } else {
            self.tx
                .send((self.local_id, Bytes::copy_from_slice(payload)))
                .map_err(|_| LinkError::Disconnected)?;
            self.sent += 1;
        }

        self.outcomes.push_back(LinkEvent::Delivered { success: !lost });
        Ok(())
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        if !self.hold_outcomes {
            if let Some(event) = self.outcomes.pop_front() {
                return Some(event);
            }
        }

        match self.rx.try_recv() {
            Ok((from, payload)) => Some(LinkEvent::Received { from, payload }),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
