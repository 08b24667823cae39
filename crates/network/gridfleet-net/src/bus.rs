//! The fleet message bus: presence broadcasting, peer discovery and
//! synchronous message dispatch over one datagram endpoint.

use crate::error::NetResult;
use crate::transport::Datagrams;
use crate::wire::{Envelope, Payload};
use async_trait::async_trait;
use gridfleet_core::AgentAddr;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// Receiver side of the bus.
///
/// Both callbacks run synchronously on the receive task: there is no
/// internal queue, so a handler that blocks for real time serializes all
/// message intake for that duration. That trade-off is deliberate — the
/// protocol relies on it for single-sender ordering — and must be kept in
/// mind when a handler sleeps (see the execution clock in the agent crate).
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// One decoded envelope, every kind except the bus-internal
    /// DISCOVER_PEER.
    async fn on_envelope(&self, envelope: Envelope) -> NetResult<()>;

    /// A peer seen for the first time. Invoked exactly once per peer.
    async fn on_peer_discovered(&self, peer: AgentAddr) -> NetResult<()>;
}

/// Best-effort group communication over a single datagram endpoint.
pub struct MessageBus {
    transport: Arc<dyn Datagrams>,
    peers: Mutex<HashSet<AgentAddr>>,
    presence_interval: Duration,
}

impl MessageBus {
    pub fn new(transport: Arc<dyn Datagrams>, presence_interval: Duration) -> Self {
        Self {
            transport,
            peers: Mutex::new(HashSet::new()),
            presence_interval,
        }
    }

    /// Identity stamped on every outbound envelope.
    pub fn identity(&self) -> &AgentAddr {
        self.transport.identity()
    }

    /// Addresses discovered so far. Entries are never evicted; a silent
    /// peer is stale, not gone.
    pub fn peers(&self) -> Vec<AgentAddr> {
        self.peers.lock().iter().cloned().collect()
    }

    /// Fire-and-forget point-to-point send. Transmission failure is logged
    /// and swallowed; the caller proceeds as if delivery may or may not
    /// have happened.
    pub async fn send(&self, target: &str, payload: Payload) {
        trace!(target, tag = payload.tag(), "sending");
        let envelope = Envelope::new(payload, self.identity().clone());
        match envelope.encode() {
            Ok(bytes) => {
                if let Err(err) = self.transport.send_to(target, &bytes).await {
                    warn!(target, %err, "failed to send message");
                }
            }
            Err(err) => warn!(target, %err, "failed to encode message"),
        }
    }

    /// Fire-and-forget broadcast to the multicast group.
    pub async fn broadcast(&self, payload: Payload) {
        trace!(tag = payload.tag(), "broadcasting");
        let envelope = Envelope::new(payload, self.identity().clone());
        match envelope.encode() {
            Ok(bytes) => {
                if let Err(err) = self.transport.broadcast(&bytes).await {
                    warn!(%err, "failed to broadcast message");
                }
            }
            Err(err) => warn!(%err, "failed to encode broadcast"),
        }
    }

    /// Spawn the receive loop and the presence loop. The handles run until
    /// aborted or the process exits.
    pub fn start(
        self: &Arc<Self>,
        handler: Arc<dyn MessageHandler>,
    ) -> (JoinHandle<()>, JoinHandle<()>) {
        let receive = tokio::spawn(Self::receive_loop(Arc::clone(self), handler));
        let presence = tokio::spawn(Self::presence_loop(Arc::clone(self)));
        (receive, presence)
    }

    /// Periodically announce ourselves to the group.
    async fn presence_loop(bus: Arc<Self>) {
        loop {
            bus.broadcast(Payload::DiscoverPeer(true)).await;
            tokio::time::sleep(bus.presence_interval).await;
        }
    }

    /// Decode and dispatch inbound datagrams, one at a time, on this task.
    async fn receive_loop(bus: Arc<Self>, handler: Arc<dyn MessageHandler>) {
        loop {
            let bytes = match bus.transport.recv().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!(%err, "datagram receive failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };
            match Envelope::decode(&bytes) {
                // A datagram outside the protocol is surfaced, not silently
                // dropped; the loop keeps serving subsequent messages.
                Err(err) => error!(%err, "dropping undecodable datagram"),
                Ok(envelope) => bus.dispatch(envelope, handler.as_ref()).await,
            }
        }
    }

    async fn dispatch(&self, envelope: Envelope, handler: &dyn MessageHandler) {
        if matches!(envelope.payload, Payload::DiscoverPeer(_)) {
            let peer = envelope.address;
            let newly_seen = {
                let mut peers = self.peers.lock();
                peer != *self.identity() && peers.insert(peer.clone())
            };
            if newly_seen {
                debug!(%peer, "discovered peer");
                if let Err(err) = handler.on_peer_discovered(peer).await {
                    error!(%err, "peer discovery handler failed");
                }
            }
            return;
        }
        if let Err(err) = handler.on_envelope(envelope).await {
            error!(%err, "message handler failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryHub;
    use gridfleet_core::AgentLocation;
    use gridfleet_core::Heading;
    use tokio::time::{sleep, Duration};

    struct Recorder {
        envelopes: Mutex<Vec<Envelope>>,
        discovered: Mutex<Vec<AgentAddr>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                envelopes: Mutex::new(Vec::new()),
                discovered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn on_envelope(&self, envelope: Envelope) -> NetResult<()> {
            self.envelopes.lock().push(envelope);
            Ok(())
        }

        async fn on_peer_discovered(&self, peer: AgentAddr) -> NetResult<()> {
            self.discovered.lock().push(peer);
            Ok(())
        }
    }

    fn quiet_bus(hub: &MemoryHub, identity: &str) -> Arc<MessageBus> {
        // Long presence interval so tests control the traffic themselves.
        Arc::new(MessageBus::new(
            Arc::new(hub.join(identity)),
            Duration::from_secs(3600),
        ))
    }

    #[tokio::test]
    async fn unicast_reaches_the_addressed_handler() {
        let hub = MemoryHub::new();
        let alice = quiet_bus(&hub, "10.0.0.1");
        let bob = quiet_bus(&hub, "10.0.0.2");
        let bob_handler = Recorder::new();
        bob.start(bob_handler.clone());

        alice
            .send(
                "10.0.0.2",
                Payload::LocationResponse(AgentLocation::new("A", Heading::East)),
            )
            .await;
        sleep(Duration::from_millis(50)).await;

        let seen = bob_handler.envelopes.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].address, "10.0.0.1");
    }

    #[tokio::test]
    async fn discovery_fires_exactly_once_per_peer_and_skips_self() {
        let hub = MemoryHub::new();
        let alice = quiet_bus(&hub, "10.0.0.1");
        let bob = quiet_bus(&hub, "10.0.0.2");
        let alice_handler = Recorder::new();
        alice.start(alice_handler.clone());

        // Two announcements from bob plus alice hearing her own broadcast.
        bob.broadcast(Payload::DiscoverPeer(true)).await;
        bob.broadcast(Payload::DiscoverPeer(true)).await;
        alice.broadcast(Payload::DiscoverPeer(true)).await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(alice_handler.discovered.lock().as_slice(), ["10.0.0.2"]);
        assert_eq!(alice.peers(), vec!["10.0.0.2".to_owned()]);
        // DISCOVER_PEER stays bus-internal.
        assert!(alice_handler.envelopes.lock().is_empty());
    }

    #[tokio::test]
    async fn undecodable_datagram_does_not_stall_the_loop() {
        let hub = MemoryHub::new();
        let intruder = hub.join("10.9.9.9");
        let bob = quiet_bus(&hub, "10.0.0.2");
        let bob_handler = Recorder::new();
        bob.start(bob_handler.clone());

        intruder.send_to("10.0.0.2", b"not a protocol message").await.unwrap();
        intruder
            .send_to(
                "10.0.0.2",
                br#"{"type": "WARP_DRIVE", "message": true, "address": "10.9.9.9"}"#,
            )
            .await
            .unwrap();
        bob.send("10.0.0.2", Payload::ExecuteTask(true)).await;
        sleep(Duration::from_millis(50)).await;

        let seen = bob_handler.envelopes.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload, Payload::ExecuteTask(true));
    }

    #[tokio::test]
    async fn presence_loop_announces_at_startup() {
        let hub = MemoryHub::new();
        let alice = quiet_bus(&hub, "10.0.0.1");
        let bob = quiet_bus(&hub, "10.0.0.2");
        let bob_handler = Recorder::new();
        bob.start(bob_handler.clone());

        let noop = Recorder::new();
        alice.start(noop);
        sleep(Duration::from_millis(50)).await;

        assert_eq!(bob.peers(), vec!["10.0.0.1".to_owned()]);
    }
}
