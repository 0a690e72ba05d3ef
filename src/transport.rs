// ripd: a simplified RIPv2 routing daemon
// Copyright (C) 2024-2025 Roland Schmid <roschmi@ethz.ch> and Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Narrow datagram transport interface. The core depends only on this trait, never on OS socket
//! calls directly, so the event loop can be driven deterministically in tests.
use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

const MAX_DATAGRAM_SIZE: usize = 2048;

#[async_trait::async_trait]
pub trait Transport: Send {
    /// Suspend until some inbound socket is readable or `timeout` elapses. Returns `true` if a
    /// socket became readable within the budget.
    async fn wait_readable(&self, timeout: Duration) -> bool;

    /// Receive at most one datagram from each inbound socket, without waiting. Sockets with
    /// nothing available are skipped.
    fn try_recv_each(&mut self) -> Vec<(Vec<u8>, SocketAddr)>;

    /// Send `buf` to `port` on 127.0.0.1, using the transport's chosen egress socket.
    async fn send_to(&mut self, buf: &[u8], port: u16) -> io::Result<()>;
}

/// UDP sockets bound on 127.0.0.1, one per configured input port. Egress reuses the first one
/// (RIP does not need a distinct egress port).
pub struct UdpTransport {
    sockets: Vec<Arc<UdpSocket>>,
}

impl UdpTransport {
    pub async fn bind(ports: &[u16]) -> io::Result<Self> {
        let mut sockets = Vec::with_capacity(ports.len());
        for &port in ports {
            let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, port)).await?;
            sockets.push(Arc::new(socket));
        }
        Ok(Self { sockets })
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    async fn wait_readable(&self, timeout: Duration) -> bool {
        match self.sockets.len() {
            0 => {
                tokio::time::sleep(timeout).await;
                false
            }
            1 => tokio::time::timeout(timeout, self.sockets[0].readable()).await.is_ok(),
            _ => {
                let mut set = tokio::task::JoinSet::new();
                for socket in self.sockets.iter().cloned() {
                    set.spawn(async move { socket.readable().await });
                }
                let became_readable = tokio::time::timeout(timeout, set.join_next()).await.is_ok();
                set.abort_all();
                became_readable
            }
        }
    }

    fn try_recv_each(&mut self) -> Vec<(Vec<u8>, SocketAddr)> {
        let mut out = Vec::new();
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        for socket in &self.sockets {
            match socket.try_recv_from(&mut buf) {
                Ok((n, peer)) => out.push((buf[..n].to_vec(), peer)),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) => log::warn!("receive error on bound socket: {e}"),
            }
        }
        out
    }

    async fn send_to(&mut self, buf: &[u8], port: u16) -> io::Result<()> {
        self.sockets[0].send_to(buf, (Ipv4Addr::LOCALHOST, port)).await?;
        Ok(())
    }
}

/// A deterministic transport double for tests: datagrams are queued in and recorded out, with
/// no real waiting. `wait_readable` always reports readiness immediately.
pub struct MockTransport {
    inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    sent: Vec<(u16, Vec<u8>)>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self { inbox: VecDeque::new(), sent: Vec::new() }
    }

    /// Queue a datagram as if it arrived from `from`.
    pub fn push_datagram(&mut self, buf: Vec<u8>, from: SocketAddr) {
        self.inbox.push_back((buf, from));
    }

    /// Drain and return everything sent so far.
    pub fn take_sent(&mut self) -> Vec<(u16, Vec<u8>)> {
        std::mem::take(&mut self.sent)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn wait_readable(&self, _timeout: Duration) -> bool {
        true
    }

    fn try_recv_each(&mut self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.inbox.drain(..).collect()
    }

    async fn send_to(&mut self, buf: &[u8], port: u16) -> io::Result<()> {
        self.sent.push((port, buf.to_vec()));
        Ok(())
    }
}
