//! Routing and planning error types

use gridfleet_core::{AgentAddr, NodeId};
use thiserror::Error;

/// Result type for routing operations
pub type RoutingResult<T> = std::result::Result<T, RoutingError>;

/// Errors in the static route geometry.
///
/// These indicate a broken graph configuration, not a runtime condition.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A node in a path has no recorded grid position
    #[error("no position recorded for node {0:?}")]
    UnknownNode(NodeId),

    /// Two consecutive path nodes differ on both axes (or neither)
    #[error("step from {from:?} to {to:?} is not axis-aligned")]
    NonAxisAlignedStep { from: NodeId, to: NodeId },
}

/// Reasons a single path option is rejected during planning.
///
/// None of these are fatal to a planning call: the planner drops the
/// offending option and keeps evaluating the remaining path enumerations.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The cheapest agent already occupies the start node; scheduling an
    /// agent that is already at its destination is meaningless
    #[error("agent {agent} already occupies the start node {node:?}")]
    AgentAlreadyAtStart { agent: AgentAddr, node: NodeId },

    /// The conflict split produced a segment shorter than two nodes,
    /// including the ambiguous cases of two agents sharing a path node or
    /// an agent sitting on the path start
    #[error("conflict split of {path:?} produced a degenerate segment")]
    DegenerateSegment { path: Vec<NodeId> },

    /// No agent locations were supplied
    #[error("no agents known to plan with")]
    NoAgents,

    /// A task references an agent missing from the location snapshot
    #[error("agent {0} is missing from the location snapshot")]
    UnknownAgent(AgentAddr),

    /// The route geometry under a candidate path is broken
    #[error(transparent)]
    Routing(#[from] RoutingError),
}
