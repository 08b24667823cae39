//! # Gridfleet Net
//!
//! Group communication substrate for the fleet: a JSON envelope codec over
//! a closed set of message kinds, a datagram transport seam (real UDP
//! multicast or an in-process hub for tests), and the [`MessageBus`] that
//! runs peer discovery and synchronous message dispatch on top of it.
//!
//! Delivery is unreliable and at-most-once by design: sends are
//! fire-and-forget, there are no retries, and nothing here acknowledges
//! anything.

pub mod bus;
pub mod error;
pub mod transport;
pub mod wire;

pub use bus::{MessageBus, MessageHandler};
pub use error::{NetError, NetResult};
pub use transport::{Datagrams, MemoryHub, UdpDatagrams};
pub use wire::{Envelope, Payload, MAX_DATAGRAM};
