//! Conflict-aware task scheduling.
//!
//! The planner turns a transport request into every viable [`TaskOption`]:
//! for each simple path between the endpoints it elects the cheapest lead
//! agent, slices the path at the positions of agents standing on it (they
//! relay the payload onward), and runs a cumulative timing pass over the
//! resulting task chain. Everything operates on an explicit snapshot of the
//! fleet's known locations passed in per call.

use crate::error::{PlanError, RoutingResult};
use crate::graph::TransportGraph;
use crate::heading::HeadingTracker;
use gridfleet_core::{
    AgentAddr, AgentLocation, DurationsConfig, NodeId, Task, TaskKind, TaskOption,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Snapshot of known agent locations keyed by address.
///
/// Ordered so that cost ties and conflict ordering resolve the same way on
/// every call with equal contents.
pub type AgentLocations = BTreeMap<AgentAddr, AgentLocation>;

/// Small constant added to every approach cost so that an agent standing on
/// the start node still ranks ahead of everyone else.
const APPROACH_EPSILON: f64 = 0.1;

/// The scheduling core.
pub struct TaskPlanner {
    graph: TransportGraph,
    durations: DurationsConfig,
}

impl TaskPlanner {
    pub fn new(graph: TransportGraph, durations: DurationsConfig) -> Self {
        Self { graph, durations }
    }

    pub fn graph(&self) -> &TransportGraph {
        &self.graph
    }

    /// Produce every viable option for transporting from `start` to `end`.
    ///
    /// Unreachable or absent endpoints yield an empty vector, as does a
    /// request for which every path enumeration is rejected; infeasibility
    /// is a result, not an error. Per-path rejections are logged at debug.
    pub fn plan(&self, start: &str, end: &str, locations: &AgentLocations) -> Vec<TaskOption> {
        let mut options = Vec::new();
        for path in self.graph.all_simple_paths(start, end) {
            match self.schedule_agents(&path, locations) {
                Ok(tasks) => options.push(TaskOption::new(tasks)),
                Err(err) => debug!(?path, %err, "discarding path option"),
            }
        }
        options
    }

    /// Option with the minimum aggregate completion time; ties keep the
    /// first-enumerated option.
    pub fn best_option<'a>(&self, options: &'a [TaskOption]) -> Option<&'a TaskOption> {
        options.iter().reduce(|best, option| {
            if option.completion_time() < best.completion_time() {
                option
            } else {
                best
            }
        })
    }

    /// Option with the maximum aggregate completion time; ties keep the
    /// first-enumerated option.
    pub fn worst_option<'a>(&self, options: &'a [TaskOption]) -> Option<&'a TaskOption> {
        options.iter().reduce(|worst, option| {
            if option.completion_time() > worst.completion_time() {
                option
            } else {
                worst
            }
        })
    }

    /// Cheapest agent to bring to `start`: move count plus turn time along
    /// its approach path, one unit per real turn, plus the epsilon
    /// tie-breaker. Agents that cannot reach `start` are skipped.
    fn closest_agent<'a>(
        &self,
        start: &str,
        locations: &'a AgentLocations,
    ) -> Result<(&'a AgentAddr, &'a AgentLocation), PlanError> {
        let mut closest: Option<(&AgentAddr, &AgentLocation, f64)> = None;
        for (agent, location) in locations {
            let approach = self.graph.shortest_path(&location.node, start);
            if approach.is_empty() {
                continue;
            }
            let cost = self.approach_cost(&approach, location)?;
            if closest.map_or(true, |(_, _, best)| cost < best) {
                closest = Some((agent, location, cost));
            }
        }
        closest
            .map(|(agent, location, _)| (agent, location))
            .ok_or(PlanError::NoAgents)
    }

    fn approach_cost(&self, path: &[NodeId], location: &AgentLocation) -> RoutingResult<f64> {
        let mut tracker = HeadingTracker::new(location.facing);
        let plan = tracker.turns_for(&self.graph, path)?;
        let mut turn_time = 0.0;
        let mut real_turns = 0u32;
        for node in path.iter().take(path.len().saturating_sub(1)) {
            let turn = plan.turn_at(node);
            turn_time += f64::from(turn.abs()) / 90.0 * self.durations.turn_secs;
            if turn != 0 {
                real_turns += 1;
            }
        }
        let moves = path.len().saturating_sub(1) as f64;
        Ok(moves * self.durations.move_secs + turn_time + f64::from(real_turns) + APPROACH_EPSILON)
    }

    /// Other agents standing on the path, as (path index, address) sorted
    /// by index ascending.
    fn conflict_agents(
        &self,
        path: &[NodeId],
        locations: &AgentLocations,
        exclude: &AgentAddr,
    ) -> Vec<(usize, AgentAddr)> {
        let mut conflicts: Vec<(usize, AgentAddr)> = locations
            .iter()
            .filter(|(agent, _)| *agent != exclude)
            .filter_map(|(agent, location)| {
                path.iter()
                    .position(|node| *node == location.node)
                    .map(|index| (index, agent.clone()))
            })
            .collect();
        conflicts.sort_by_key(|(index, _)| *index);
        conflicts
    }

    /// Decompose one candidate path into a timed task chain.
    fn schedule_agents(
        &self,
        path: &[NodeId],
        locations: &AgentLocations,
    ) -> Result<Vec<Task>, PlanError> {
        let start_node = path.first().ok_or(PlanError::DegenerateSegment {
            path: path.to_vec(),
        })?;
        let (lead, lead_location) = self.closest_agent(start_node, locations)?;
        if lead_location.node == *start_node {
            return Err(PlanError::AgentAlreadyAtStart {
                agent: lead.clone(),
                node: start_node.clone(),
            });
        }

        let conflicts = self.conflict_agents(path, locations, lead);
        // Two agents sharing a path node, or an agent on the start node that
        // lost lead election, cannot be sliced meaningfully.
        let ambiguous = conflicts.first().is_some_and(|(index, _)| *index == 0)
            || conflicts
                .windows(2)
                .any(|pair| pair[0].0 == pair[1].0);
        if ambiguous {
            return Err(PlanError::DegenerateSegment {
                path: path.to_vec(),
            });
        }

        let mut involved: Vec<(usize, AgentAddr)> = vec![(0, lead.clone())];
        involved.extend(conflicts);

        let mut tasks = Vec::new();
        let last = involved.len() - 1;
        for (i, (index, agent)) in involved.iter().enumerate() {
            let segment: &[NodeId] = if i == last && involved.len() == 1 {
                &path[*index..]
            } else if i == last {
                // Relay segments reach back one node so the handoff node is
                // shared with the previous segment.
                &path[index - 1..]
            } else if i == 0 {
                &path[..involved[1].0]
            } else {
                &path[index - 1..involved[i + 1].0]
            };
            if segment.len() < 2 {
                return Err(PlanError::DegenerateSegment {
                    path: path.to_vec(),
                });
            }
            let location = locations
                .get(agent)
                .ok_or_else(|| PlanError::UnknownAgent(agent.clone()))?;
            tasks.extend(self.emit_agent_tasks(segment, agent, location));
        }

        self.add_timing(&mut tasks, locations)?;
        Ok(tasks)
    }

    /// A repositioning move to the segment start followed by the transport
    /// itself. Timing fields are filled by the later timing pass.
    fn emit_agent_tasks(
        &self,
        segment: &[NodeId],
        agent: &AgentAddr,
        location: &AgentLocation,
    ) -> Vec<Task> {
        let approach = self.graph.shortest_path(&location.node, &segment[0]);
        let blank = |kind: TaskKind, path: Vec<NodeId>| Task {
            agent: agent.clone(),
            kind,
            path,
            start_time: 0.0,
            end_time: 0.0,
            turn_secs_per_node: HashMap::new(),
            last_facing: location.facing,
        };
        vec![
            blank(TaskKind::Move, approach),
            blank(TaskKind::Transport, segment.to_vec()),
        ]
    }

    /// Walk the task chain in order, accumulating start/end times. Each
    /// task's turn plan is seeded from the owning agent's stored facing.
    fn add_timing(
        &self,
        tasks: &mut [Task],
        locations: &AgentLocations,
    ) -> Result<(), PlanError> {
        let mut start_time = 0.0;
        for task in tasks.iter_mut() {
            let location = locations
                .get(&task.agent)
                .ok_or_else(|| PlanError::UnknownAgent(task.agent.clone()))?;
            let mut tracker = HeadingTracker::new(location.facing);
            let plan = tracker.turns_for(&self.graph, &task.path)?;

            let mut turn_time = 0.0;
            let mut per_node = HashMap::new();
            for node in task.path.iter().take(task.path.len().saturating_sub(1)) {
                let secs = f64::from(plan.turn_at(node).abs()) / 90.0 * self.durations.turn_secs;
                per_node.insert(node.clone(), secs);
                turn_time += secs;
            }

            task.turn_secs_per_node = per_node;
            task.last_facing = tracker.heading();
            task.start_time = start_time;
            let mut end_time =
                start_time + task.move_count() as f64 * self.durations.move_secs + turn_time;
            if task.kind == TaskKind::Transport {
                end_time += self.durations.pickup_secs + self.durations.dropoff_secs;
            }
            task.end_time = end_time;
            start_time = end_time;
        }
        Ok(())
    }
}
