//! Startup configuration for a fleet agent.
//!
//! The whole environment an agent needs is one TOML document: its own
//! identity on the transport network, the static graph, duration constants
//! and the network section. Loaded once at startup and treated as immutable
//! afterwards.

use crate::error::{ConfigError, CoreResult};
use crate::types::{AgentAddr, GridPos, Heading, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;

/// Duration constants used for all cost and timing computation, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationsConfig {
    #[serde(default = "default_duration")]
    pub move_secs: f64,
    #[serde(default = "default_duration")]
    pub pickup_secs: f64,
    #[serde(default = "default_duration")]
    pub dropoff_secs: f64,
    #[serde(default = "default_duration")]
    pub turn_secs: f64,
}

fn default_duration() -> f64 {
    1.0
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            move_secs: 1.0,
            pickup_secs: 1.0,
            dropoff_secs: 1.0,
            turn_secs: 1.0,
        }
    }
}

/// Static transport network: undirected edge list plus grid positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Undirected, unweighted edges; cost derives from durations, not weights
    pub edges: Vec<(NodeId, NodeId)>,
    /// Grid position per node
    pub positions: HashMap<NodeId, GridPos>,
}

/// Datagram channel settings shared by the whole fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Well-known multicast group for discovery and broadcast
    #[serde(default = "default_multicast_addr")]
    pub multicast_addr: Ipv4Addr,
    /// Single shared port for multicast and point-to-point traffic
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interval between DISCOVER_PEER broadcasts
    #[serde(default = "default_presence_interval")]
    pub presence_interval_secs: f64,
    /// Delay between distributing a plan and triggering its first agent,
    /// giving every agent time to persist the plan
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: f64,
    /// Self-reported identity; autodetected from the local IP when unset
    #[serde(default)]
    pub identity: Option<AgentAddr>,
}

fn default_multicast_addr() -> Ipv4Addr {
    Ipv4Addr::new(224, 1, 1, 1)
}

fn default_port() -> u16 {
    5004
}

fn default_presence_interval() -> f64 {
    5.0
}

fn default_settle_delay() -> f64 {
    1.0
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            multicast_addr: default_multicast_addr(),
            port: default_port(),
            presence_interval_secs: default_presence_interval(),
            settle_delay_secs: default_settle_delay(),
            identity: None,
        }
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Whether this agent accepts TASK_REQUEST messages from the outside
    #[serde(default)]
    pub coordinator: bool,
    /// Node the vehicle starts on
    pub location: NodeId,
    /// Direction the vehicle starts facing
    #[serde(default)]
    pub facing: Heading,
    /// Select the cheapest option when true, the most expensive otherwise
    #[serde(default = "default_use_best_path")]
    pub use_best_path: bool,
    /// Drive a simulated robot instead of real hardware
    #[serde(default)]
    pub simulated_robot: bool,
    #[serde(default)]
    pub durations: DurationsConfig,
    pub graph: GraphConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

fn default_use_best_path() -> bool {
    true
}

impl FleetConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: FleetConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_location(mut self, node: impl Into<NodeId>, facing: Heading) -> Self {
        self.location = node.into();
        self.facing = facing;
        self
    }

    pub fn with_coordinator(mut self, coordinator: bool) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Cross-check the graph section against the rest of the document.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.graph.positions.contains_key(&self.location) {
            return Err(ConfigError::Invalid(format!(
                "start location {:?} has no position entry",
                self.location
            )));
        }
        for (a, b) in &self.graph.edges {
            for node in [a, b] {
                if !self.graph.positions.contains_key(node) {
                    return Err(ConfigError::Invalid(format!(
                        "edge endpoint {node:?} has no position entry"
                    )));
                }
            }
        }
        let d = &self.durations;
        for (name, value) in [
            ("move_secs", d.move_secs),
            ("pickup_secs", d.pickup_secs),
            ("dropoff_secs", d.dropoff_secs),
            ("turn_secs", d.turn_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "duration {name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
