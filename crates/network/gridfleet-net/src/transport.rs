//! Datagram transport seam.
//!
//! The bus talks to the network through [`Datagrams`], with two
//! implementations: [`UdpDatagrams`] binds the shared fleet port with
//! address reuse and joins the multicast group; [`MemoryHub`] wires
//! multiple in-process endpoints together so protocol behavior is testable
//! without sockets.

use crate::error::{NetError, NetResult};
use crate::wire::MAX_DATAGRAM;
use async_trait::async_trait;
use gridfleet_core::{AgentAddr, NetworkConfig};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// One unreliable datagram endpoint.
#[async_trait]
pub trait Datagrams: Send + Sync {
    /// Self-reported identity carried in every envelope.
    fn identity(&self) -> &AgentAddr;

    /// Point-to-point send; best effort, no delivery guarantee.
    async fn send_to(&self, target: &str, bytes: &[u8]) -> NetResult<()>;

    /// Send to the whole group, the sender included.
    async fn broadcast(&self, bytes: &[u8]) -> NetResult<()>;

    /// Next inbound datagram.
    async fn recv(&self) -> NetResult<Vec<u8>>;
}

/// Multicast UDP endpoint on the shared fleet port.
pub struct UdpDatagrams {
    socket: UdpSocket,
    group: SocketAddrV4,
    port: u16,
    identity: AgentAddr,
}

impl UdpDatagrams {
    /// Bind the shared port with address reuse and join the multicast
    /// group, so several agents can coexist on one host.
    pub fn bind(config: &NetworkConfig) -> NetResult<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        let bind_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, config.port).into();
        socket.bind(&bind_addr.into())?;

        let socket = UdpSocket::from_std(socket.into())?;
        socket.join_multicast_v4(config.multicast_addr, Ipv4Addr::UNSPECIFIED)?;

        let identity = config
            .identity
            .clone()
            .unwrap_or_else(local_address_probe);

        Ok(Self {
            socket,
            group: SocketAddrV4::new(config.multicast_addr, config.port),
            port: config.port,
            identity,
        })
    }
}

#[async_trait]
impl Datagrams for UdpDatagrams {
    fn identity(&self) -> &AgentAddr {
        &self.identity
    }

    async fn send_to(&self, target: &str, bytes: &[u8]) -> NetResult<()> {
        self.socket
            .send_to(bytes, (target, self.port))
            .await
            .map_err(|err| NetError::Transport(format!("send to {target}: {err}")))?;
        Ok(())
    }

    async fn broadcast(&self, bytes: &[u8]) -> NetResult<()> {
        self.socket
            .send_to(bytes, self.group)
            .await
            .map_err(|err| NetError::Transport(format!("multicast send: {err}")))?;
        Ok(())
    }

    async fn recv(&self) -> NetResult<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, _source) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        Ok(buf)
    }
}

/// Discover the address this host would use to reach the fleet network.
/// Nothing is actually transmitted; connecting a UDP socket only selects a
/// route.
fn local_address_probe() -> AgentAddr {
    std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("192.168.1.1:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_owned())
}

/// In-process datagram fabric for tests: endpoints joined to one hub reach
/// each other by identity, and a broadcast reaches every endpoint, the
/// sender included — mirroring multicast loopback.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inboxes: Arc<Mutex<HashMap<AgentAddr, mpsc::UnboundedSender<Vec<u8>>>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint under `identity`.
    pub fn join(&self, identity: impl Into<AgentAddr>) -> MemoryDatagrams {
        let identity = identity.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inboxes.lock().insert(identity.clone(), tx);
        MemoryDatagrams {
            hub: self.clone(),
            identity,
            inbox: tokio::sync::Mutex::new(rx),
        }
    }
}

/// Endpoint handed out by [`MemoryHub::join`].
pub struct MemoryDatagrams {
    hub: MemoryHub,
    identity: AgentAddr,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

#[async_trait]
impl Datagrams for MemoryDatagrams {
    fn identity(&self) -> &AgentAddr {
        &self.identity
    }

    async fn send_to(&self, target: &str, bytes: &[u8]) -> NetResult<()> {
        // Unknown targets swallow the datagram, like UDP into the void.
        if let Some(tx) = self.hub.inboxes.lock().get(target) {
            let _ = tx.send(bytes.to_vec());
        }
        Ok(())
    }

    async fn broadcast(&self, bytes: &[u8]) -> NetResult<()> {
        for tx in self.hub.inboxes.lock().values() {
            let _ = tx.send(bytes.to_vec());
        }
        Ok(())
    }

    async fn recv(&self) -> NetResult<Vec<u8>> {
        self.inbox
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| NetError::Transport("memory hub closed".to_owned()))
    }
}
