//! UDP 链路
//!
//! 在主机上用 UDP 模拟无线点对点链路。UDP 没有链路层确认，因此 `send_to`
//! 成功即视为投递成功，并在下一次 `poll` 时报告。
//!
//! 每个站点地址映射到一个 `SocketAddr`；来源地址未登记的数据报直接丢弃。

use crate::{Link, LinkError, LinkEvent, MAX_PAYLOAD, PeerId, check_payload};
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::{debug, trace, warn};

/// 基于 UDP 的链路
pub struct UdpLink {
    local_id: PeerId,
    socket: UdpSocket,
    /// 站点地址 → 套接字地址
    peers: HashMap<PeerId, SocketAddr>,
    /// 待报告的投递结果
    outcomes: VecDeque<LinkEvent>,
    /// 接收缓冲区（多 1 字节用于识别超长数据报）
    rx_buf: [u8; MAX_PAYLOAD + 1],
}

impl UdpLink {
    /// 绑定本地地址（非阻塞模式）
    pub fn bind(local_id: PeerId, addr: impl ToSocketAddrs) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        debug!(
            "UDP link {} bound to {}",
            local_id,
            socket.local_addr()?
        );

        Ok(Self {
            local_id,
            socket,
            peers: HashMap::new(),
            outcomes: VecDeque::new(),
            rx_buf: [0u8; MAX_PAYLOAD + 1],
        })
    }

    /// 登记对端站点
    pub fn add_peer(&mut self, peer: PeerId, addr: SocketAddr) {
        self.peers.insert(peer, addr);
    }

    /// 构建器风格的 `add_peer`
    pub fn with_peer(mut self, peer: PeerId, addr: SocketAddr) -> Self {
        self.add_peer(peer, addr);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, LinkError> {
        Ok(self.socket.local_addr()?)
    }

    fn peer_by_addr(&self, addr: SocketAddr) -> Option<PeerId> {
        self.peers.iter().find(|(_, a)| **a == addr).map(|(id, _)| *id)
    }

    /// 非阻塞接收一个数据报
    fn try_receive(&mut self) -> Option<LinkEvent> {
        loop {
            let (len, src) = match self.socket.recv_from(&mut self.rx_buf) {
                Ok(r) => r,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return None,
                Err(e) => {
                    warn!("UDP receive error: {}", e);
                    return None;
                },
            };

            if len > MAX_PAYLOAD {
                warn!("Dropping oversized datagram ({} bytes) from {}", len, src);
                continue;
            }

            let Some(from) = self.peer_by_addr(src) else {
                trace!("Dropping datagram from unregistered address {}", src);
                continue;
            };

            return Some(LinkEvent::Received {
                from,
                payload: Bytes::copy_from_slice(&self.rx_buf[..len]),
            });
        }
    }
}

impl Link for UdpLink {
    fn local_id(&self) -> PeerId {
        self.local_id
    }

    fn send(&mut self, peer: PeerId, payload: &[u8]) -> Result<(), LinkError> {
        check_payload(payload)?;
        let addr = *self.peers.get(&peer).ok_or(LinkError::UnknownPeer(peer))?;

        self.socket.send_to(payload, addr)?;
        trace!("Sent {} bytes to {} ({})", payload.len(), peer, addr);

        self.outcomes.push_back(LinkEvent::Delivered { success: true });
        Ok(())
    }

    fn poll(&mut self) -> Option<LinkEvent> {
        if let Some(event) = self.outcomes.pop_front() {
            return Some(event);
        }
        self.try_receive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const A: PeerId = PeerId::new([0xAA, 0, 0, 0, 0, 1]);
    const B: PeerId = PeerId::new([0xAA, 0, 0, 0, 0, 2]);

    /// 轮询直到收到数据报（本机回环通常立即可读）
    fn poll_received(link: &mut UdpLink) -> Option<LinkEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            match link.poll() {
                Some(event @ LinkEvent::Received { .. }) => return Some(event),
                Some(_) => {},
                None => std::thread::sleep(Duration::from_millis(1)),
            }
        }
        None
    }

    fn pair() -> (UdpLink, UdpLink) {
        let a = UdpLink::bind(A, "127.0.0.1:0").unwrap();
        let b = UdpLink::bind(B, "127.0.0.1:0").unwrap();
        let a_addr = a.local_addr().unwrap();
        let b_addr = b.local_addr().unwrap();
        (a.with_peer(B, b_addr), b.with_peer(A, a_addr))
    }

    #[test]
    fn test_send_and_receive() {
        let (mut a, mut b) = pair();

        a.send(B, &[0x02, 0x10, 0x20]).unwrap();
        assert_eq!(a.poll(), Some(LinkEvent::Delivered { success: true }));

        match poll_received(&mut b) {
            Some(LinkEvent::Received { from, payload }) => {
                assert_eq!(from, A);
                assert_eq!(&payload[..], &[0x02, 0x10, 0x20]);
            },
            other => panic!("Expected Received, got {:?}", other),
        }
    }

    #[test]
    fn test_send_unknown_peer() {
        let (mut a, _b) = pair();
        let stranger = PeerId::new([9; 6]);
        assert!(matches!(
            a.send(stranger, &[1]),
            Err(LinkError::UnknownPeer(p)) if p == stranger
        ));
        // 同步失败不产生投递事件
        assert_eq!(a.poll(), None);
    }

    #[test]
    fn test_send_oversized() {
        let (mut a, _b) = pair();
        assert!(matches!(
            a.send(B, &[0u8; 300]),
            Err(LinkError::PayloadTooLarge { len: 300, max: 250 })
        ));
    }

    #[test]
    fn test_drops_unregistered_source() {
        let (_a, mut b) = pair();
        let b_addr = b.local_addr().unwrap();

        let stranger = UdpSocket::bind("127.0.0.1:0").unwrap();
        stranger.send_to(&[0x01], b_addr).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(b.poll(), None);
    }

    #[test]
    fn test_poll_empty() {
        let (mut a, _b) = pair();
        assert_eq!(a.poll(), None);
    }
}
