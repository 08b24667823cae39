//! Shared data model for fleet coordination

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a node in the transport network
pub type NodeId = String;

/// Self-reported network address identifying one fleet member
pub type AgentAddr = String;

/// Integer grid position of a node.
///
/// Positions are only ever used to compute the axis-aligned delta between
/// adjacent nodes; they carry no metric meaning beyond direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<GridPos> for (i32, i32) {
    fn from(pos: GridPos) -> Self {
        (pos.x, pos.y)
    }
}

/// Facing direction of a vehicle on the grid.
///
/// The wire and configuration form is the degree value: 0 faces +x,
/// 90 faces +y, 180 faces -x, 270 faces -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Heading {
    East,
    North,
    West,
    South,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::East, Heading::North, Heading::West, Heading::South];

    /// Degree value of this heading
    pub fn degrees(self) -> u16 {
        match self {
            Heading::East => 0,
            Heading::North => 90,
            Heading::West => 180,
            Heading::South => 270,
        }
    }

    /// Signed turn (multiple of 90 in [-180, 180]) rotating `self` onto
    /// `target`.
    ///
    /// Opposite headings fold asymmetrically: 0→180 is +180 while 180→0
    /// is -180, which matches the turn command convention of the drive
    /// layer.
    pub fn turn_to(self, target: Heading) -> i16 {
        let raw = target.degrees() as i16 - self.degrees() as i16;
        if raw > 180 {
            raw - 360
        } else if raw < -180 {
            raw + 360
        } else {
            raw
        }
    }
}

impl Default for Heading {
    fn default() -> Self {
        Heading::East
    }
}

impl TryFrom<u16> for Heading {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Heading::East),
            90 => Ok(Heading::North),
            180 => Ok(Heading::West),
            270 => Ok(Heading::South),
            other => Err(format!("invalid heading: {other} (expected 0, 90, 180 or 270)")),
        }
    }
}

impl From<Heading> for u16 {
    fn from(heading: Heading) -> Self {
        heading.degrees()
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Last known state of one fleet member.
///
/// One entry exists per known agent, including the local one. Entries are
/// created on first contact and mutated in place afterwards; a silent peer
/// is stale, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLocation {
    /// Node the agent currently occupies
    pub node: NodeId,
    /// Direction the agent currently faces
    pub facing: Heading,
}

impl AgentLocation {
    pub fn new(node: impl Into<NodeId>, facing: Heading) -> Self {
        Self {
            node: node.into(),
            facing,
        }
    }
}

/// An externally submitted transport request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportRequest {
    pub start_node: NodeId,
    pub end_node: NodeId,
}

/// Kind of work a task describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    /// Pure repositioning towards a segment start, no payload
    Move,
    /// Carry the payload along a segment, with pickup and dropoff
    Transport,
}

/// One unit of work assigned to a single agent.
///
/// Times are logical seconds accumulated from the start of the whole plan;
/// `end_time >= start_time` always holds. The path is a valid walk in the
/// transport graph (a single-node path means "already in place").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Address of the agent this task is assigned to
    pub agent: AgentAddr,
    pub kind: TaskKind,
    /// Ordered node walk; single-node for a no-op repositioning
    pub path: Vec<NodeId>,
    pub start_time: f64,
    pub end_time: f64,
    /// Turn cost in seconds keyed by the node the turn happens at,
    /// one entry per node except the final one
    pub turn_secs_per_node: HashMap<NodeId, f64>,
    /// Heading the agent faces once the task completes
    pub last_facing: Heading,
}

impl Task {
    /// Number of edge traversals in this task's path
    pub fn move_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Turn cost in seconds at a node; the final node implicitly costs 0.
    pub fn turn_secs_at(&self, node: &str) -> f64 {
        self.turn_secs_per_node.get(node).copied().unwrap_or(0.0)
    }
}

/// One full candidate plan for a transport request, possibly spanning
/// several agents that relay the payload between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOption {
    pub tasks: Vec<Task>,
}

impl TaskOption {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Aggregate completion time: the maximum end time among the tasks
    pub fn completion_time(&self) -> f64 {
        self.tasks.iter().fold(0.0, |acc, t| acc.max(t.end_time))
    }

    /// Number of distinct agents participating in this option
    pub fn agents_involved(&self) -> usize {
        let mut agents: Vec<&AgentAddr> = self.tasks.iter().map(|t| &t.agent).collect();
        agents.sort();
        agents.dedup();
        agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_turns_match_drive_convention() {
        assert_eq!(Heading::East.turn_to(Heading::East), 0);
        assert_eq!(Heading::East.turn_to(Heading::North), 90);
        assert_eq!(Heading::East.turn_to(Heading::South), -90);
        assert_eq!(Heading::East.turn_to(Heading::West), 180);
        assert_eq!(Heading::West.turn_to(Heading::East), -180);
        assert_eq!(Heading::North.turn_to(Heading::South), 180);
        assert_eq!(Heading::South.turn_to(Heading::North), -180);
        assert_eq!(Heading::South.turn_to(Heading::East), 90);
        assert_eq!(Heading::North.turn_to(Heading::East), -90);
    }

    #[test]
    fn heading_round_trips_through_degrees() {
        for heading in Heading::ALL {
            assert_eq!(Heading::try_from(heading.degrees()), Ok(heading));
        }
        assert!(Heading::try_from(45u16).is_err());
    }

    #[test]
    fn completion_time_is_max_end_time() {
        let task = |end: f64| Task {
            agent: "10.0.0.1".into(),
            kind: TaskKind::Move,
            path: vec!["A".into(), "B".into()],
            start_time: 0.0,
            end_time: end,
            turn_secs_per_node: HashMap::new(),
            last_facing: Heading::East,
        };
        let option = TaskOption::new(vec![task(3.0), task(7.0), task(5.0)]);
        assert_eq!(option.completion_time(), 7.0);
        assert_eq!(option.agents_involved(), 1);
    }
}
