//! Turn computation along grid paths.
//!
//! A [`HeadingTracker`] is owned by exactly one traversal context: calling
//! [`HeadingTracker::turns_for`] advances the tracked heading to the
//! terminal heading of the path. Callers that need a what-if answer clone
//! the tracker first.

use crate::error::{RoutingError, RoutingResult};
use crate::graph::TransportGraph;
use gridfleet_core::{GridPos, Heading, NodeId};
use std::collections::HashMap;

/// Turn commands for one traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnPlan {
    /// Signed turn in degrees keyed by the node the turn happens at.
    /// One entry per path node except the final one.
    pub turns: HashMap<NodeId, i16>,
    /// Turn at the first node, 0 for a single-node path
    pub initial_turn: i16,
}

impl TurnPlan {
    /// Turn at a node; the final node of a path implicitly turns 0.
    pub fn turn_at(&self, node: &str) -> i16 {
        self.turns.get(node).copied().unwrap_or(0)
    }
}

/// Tracks a vehicle's heading across path traversals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingTracker {
    heading: Heading,
}

impl HeadingTracker {
    pub fn new(heading: Heading) -> Self {
        Self { heading }
    }

    /// Heading after the most recent traversal.
    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Compute the per-node turn commands for `path` and advance the
    /// tracked heading to the path's terminal heading.
    ///
    /// The travel direction of each step is inferred strictly from the sign
    /// of the coordinate delta; a step that changes both axes or neither is
    /// a configuration error, never silently skipped.
    pub fn turns_for(&mut self, graph: &TransportGraph, path: &[NodeId]) -> RoutingResult<TurnPlan> {
        let mut turns = HashMap::new();
        for pair in path.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let from = graph
                .position(current)
                .ok_or_else(|| RoutingError::UnknownNode(current.clone()))?;
            let to = graph
                .position(next)
                .ok_or_else(|| RoutingError::UnknownNode(next.clone()))?;
            let direction = step_direction(from, to, current, next)?;
            turns.insert(current.clone(), self.heading.turn_to(direction));
            self.heading = direction;
        }
        let initial_turn = path
            .first()
            .map(|node| turns.get(node).copied().unwrap_or(0))
            .unwrap_or(0);
        Ok(TurnPlan { turns, initial_turn })
    }
}

fn step_direction(
    from: GridPos,
    to: GridPos,
    current: &NodeId,
    next: &NodeId,
) -> RoutingResult<Heading> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    match (dx.signum(), dy.signum()) {
        (1, 0) => Ok(Heading::East),
        (-1, 0) => Ok(Heading::West),
        (0, 1) => Ok(Heading::North),
        (0, -1) => Ok(Heading::South),
        _ => Err(RoutingError::NonAxisAlignedStep {
            from: current.clone(),
            to: next.clone(),
        }),
    }
}
