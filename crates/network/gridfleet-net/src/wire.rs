//! Wire format: one JSON document per datagram.
//!
//! Every message on the channel is an [`Envelope`]
//! `{"type": ..., "message": ..., "address": ...}` where `address` is the
//! sender's self-reported identity — not necessarily the transport-level
//! source, which makes it spoofable; acceptable inside a closed fleet
//! network.
//!
//! The message kinds form a closed set: dispatch is an exhaustive `match`
//! on [`Payload`], and a tag outside the set fails decoding as a protocol
//! error instead of falling through a lookup table.

use crate::error::{NetError, NetResult};
use gridfleet_core::{AgentAddr, AgentLocation, Task, TransportRequest};
use serde::{Deserialize, Serialize};

/// Largest payload that fits one UDP datagram; there is no fragmentation
/// handling above this.
pub const MAX_DATAGRAM: usize = 65_507;

/// Every message kind the fleet speaks, with its type-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum Payload {
    /// Periodic presence marker
    #[serde(rename = "DISCOVER_PEER")]
    DiscoverPeer(bool),
    /// Ask a peer for its location, carrying our own
    #[serde(rename = "LOCATION_REQUEST")]
    LocationRequest(AgentLocation),
    /// Reply carrying the sender's own location
    #[serde(rename = "LOCATION_RESPONSE")]
    LocationResponse(AgentLocation),
    /// External transport request addressed to a coordinator
    #[serde(rename = "TASK_REQUEST")]
    TaskRequest(TransportRequest),
    /// Full selected plan, broadcast fleet-wide
    #[serde(rename = "TASK_DISTRIBUTION")]
    TaskDistribution(Vec<Task>),
    /// Handoff trigger for the next agent in the chain
    #[serde(rename = "EXECUTE_TASK")]
    ExecuteTask(bool),
    /// Diagnostic payload, logged by the receiver
    #[serde(rename = "MESSAGE")]
    Message(serde_json::Value),
    /// Diagnostic ping answered with MESSAGE
    #[serde(rename = "ECHO")]
    Echo(serde_json::Value),
}

impl Payload {
    /// Wire tag of this message kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Payload::DiscoverPeer(_) => "DISCOVER_PEER",
            Payload::LocationRequest(_) => "LOCATION_REQUEST",
            Payload::LocationResponse(_) => "LOCATION_RESPONSE",
            Payload::TaskRequest(_) => "TASK_REQUEST",
            Payload::TaskDistribution(_) => "TASK_DISTRIBUTION",
            Payload::ExecuteTask(_) => "EXECUTE_TASK",
            Payload::Message(_) => "MESSAGE",
            Payload::Echo(_) => "ECHO",
        }
    }
}

/// One wire unit: a payload plus the sender's self-reported address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub payload: Payload,
    pub address: AgentAddr,
}

impl Envelope {
    pub fn new(payload: Payload, address: impl Into<AgentAddr>) -> Self {
        Self {
            payload,
            address: address.into(),
        }
    }

    /// Serialize to one datagram's worth of UTF-8 JSON.
    pub fn encode(&self) -> NetResult<Vec<u8>> {
        let bytes =
            serde_json::to_vec(self).map_err(|err| NetError::Protocol(err.to_string()))?;
        if bytes.len() > MAX_DATAGRAM {
            return Err(NetError::Oversized { size: bytes.len() });
        }
        Ok(bytes)
    }

    /// Parse an inbound datagram. Any shape outside the closed message set
    /// is a protocol error.
    pub fn decode(bytes: &[u8]) -> NetResult<Self> {
        serde_json::from_slice(bytes).map_err(|err| NetError::Protocol(err.to_string()))
    }
}
