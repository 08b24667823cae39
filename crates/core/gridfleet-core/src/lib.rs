//! # Gridfleet Core
//!
//! Shared data model and configuration for the gridfleet AGV coordination
//! system: node/position primitives, headings, agent locations, the task
//! model produced by the planner and executed by agents, and the TOML
//! configuration consumed at startup.
//!
//! The crates above this one follow a strict layering: `gridfleet-routing`
//! plans over these types, `gridfleet-net` moves them between agents, and
//! `gridfleet-agent` executes them.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DurationsConfig, FleetConfig, GraphConfig, NetworkConfig};
pub use error::{ConfigError, CoreResult};
pub use types::{
    AgentAddr, AgentLocation, GridPos, Heading, NodeId, Task, TaskKind, TaskOption,
    TransportRequest,
};
