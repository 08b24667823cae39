//! Integration tests for request planning: single-agent plans, relay
//! handoffs, infeasible requests and option selection.

use gridfleet_core::{AgentLocation, DurationsConfig, GridPos, Heading, NodeId, TaskKind};
use gridfleet_routing::{AgentLocations, TaskPlanner, TransportGraph};
use std::collections::HashMap;

const AGENT_1: &str = "192.168.1.10";
const AGENT_2: &str = "192.168.1.20";

fn durations() -> DurationsConfig {
    DurationsConfig {
        move_secs: 5.0,
        pickup_secs: 13.0,
        dropoff_secs: 13.0,
        turn_secs: 4.0,
    }
}

fn line_graph(names: &[&str]) -> TransportGraph {
    let edges: Vec<(NodeId, NodeId)> = names
        .windows(2)
        .map(|pair| (pair[0].to_owned(), pair[1].to_owned()))
        .collect();
    let positions = names
        .iter()
        .enumerate()
        .map(|(x, name)| ((*name).to_owned(), GridPos::new(x as i32, 0)))
        .collect();
    TransportGraph::new(&edges, positions)
}

/// A ring with a feeder node:
///
/// ```text
/// E -- A -- B
///      |    |
///      D -- C
/// ```
fn ring_graph() -> TransportGraph {
    let edges: Vec<(NodeId, NodeId)> = [("A", "B"), ("B", "C"), ("C", "D"), ("D", "A"), ("E", "A")]
        .into_iter()
        .map(|(a, b)| (a.to_owned(), b.to_owned()))
        .collect();
    let positions = HashMap::from([
        ("A".to_owned(), GridPos::new(0, 1)),
        ("B".to_owned(), GridPos::new(1, 1)),
        ("C".to_owned(), GridPos::new(1, 0)),
        ("D".to_owned(), GridPos::new(0, 0)),
        ("E".to_owned(), GridPos::new(-1, 1)),
    ]);
    TransportGraph::new(&edges, positions)
}

fn locations(entries: &[(&str, &str, Heading)]) -> AgentLocations {
    entries
        .iter()
        .map(|(agent, node, facing)| ((*agent).to_owned(), AgentLocation::new(*node, *facing)))
        .collect()
}

fn paths_are_walks(planner: &TaskPlanner, options: &[gridfleet_core::TaskOption]) {
    for option in options {
        for task in &option.tasks {
            assert!(task.end_time >= task.start_time);
            for pair in task.path.windows(2) {
                let hop = planner.graph().shortest_path(&pair[0], &pair[1]);
                assert_eq!(hop.len(), 2, "{:?} -> {:?} is not an edge", pair[0], pair[1]);
            }
        }
    }
}

#[test]
fn single_agent_plan_has_exact_timing() {
    // Straight eastward run: approach A -> B, then carry B -> C. No turns
    // anywhere, so the aggregate is two moves plus pickup and dropoff.
    let planner = TaskPlanner::new(line_graph(&["A", "B", "C"]), durations());
    let fleet = locations(&[(AGENT_1, "A", Heading::East)]);

    let options = planner.plan("B", "C", &fleet);
    assert_eq!(options.len(), 1);
    let tasks = &options[0].tasks;
    assert_eq!(tasks.len(), 2);

    assert_eq!(tasks[0].kind, TaskKind::Move);
    assert_eq!(tasks[0].path, vec!["A", "B"]);
    assert_eq!(tasks[0].start_time, 0.0);
    assert_eq!(tasks[0].end_time, 5.0);
    assert_eq!(tasks[0].last_facing, Heading::East);

    assert_eq!(tasks[1].kind, TaskKind::Transport);
    assert_eq!(tasks[1].path, vec!["B", "C"]);
    assert_eq!(tasks[1].start_time, 5.0);
    // move + pickup + dropoff on top of the approach
    assert_eq!(tasks[1].end_time, 5.0 + 5.0 + 13.0 + 13.0);

    assert_eq!(options[0].completion_time(), 36.0);
    paths_are_walks(&planner, &options);
}

#[test]
fn relay_plan_slices_at_the_conflict_agent() {
    // Agent 2 stands mid-path at D and relays the payload onward. The
    // handoff node C is shared: agent 1 drops there, agent 2 backs up from
    // D to C and picks up.
    let planner = TaskPlanner::new(line_graph(&["A", "B", "C", "D", "E"]), durations());
    let fleet = locations(&[
        (AGENT_1, "A", Heading::East),
        (AGENT_2, "D", Heading::East),
    ]);

    let options = planner.plan("B", "E", &fleet);
    assert_eq!(options.len(), 1);
    let tasks = &options[0].tasks;
    assert_eq!(tasks.len(), 4);

    assert_eq!((&tasks[0].agent, tasks[0].kind), (&AGENT_1.to_owned(), TaskKind::Move));
    assert_eq!(tasks[0].path, vec!["A", "B"]);
    assert_eq!((&tasks[1].agent, tasks[1].kind), (&AGENT_1.to_owned(), TaskKind::Transport));
    assert_eq!(tasks[1].path, vec!["B", "C"]);
    assert_eq!((&tasks[2].agent, tasks[2].kind), (&AGENT_2.to_owned(), TaskKind::Move));
    assert_eq!(tasks[2].path, vec!["D", "C"]);
    assert_eq!((&tasks[3].agent, tasks[3].kind), (&AGENT_2.to_owned(), TaskKind::Transport));
    assert_eq!(tasks[3].path, vec!["C", "D", "E"]);

    // Cumulative timing: 5 | 5+5+26 | +5+8 (half turn at D) | +10+26.
    assert_eq!(tasks[0].end_time, 5.0);
    assert_eq!(tasks[1].end_time, 36.0);
    assert_eq!(tasks[2].start_time, 36.0);
    assert_eq!(tasks[2].end_time, 49.0);
    assert_eq!(tasks[3].end_time, 85.0);

    // Agent 2 ends its approach facing west, then carries eastward.
    assert_eq!(tasks[2].last_facing, Heading::West);
    assert_eq!(tasks[3].last_facing, Heading::East);

    assert_eq!(options[0].agents_involved(), 2);
    paths_are_walks(&planner, &options);
}

#[test]
fn request_starting_under_the_sole_agent_is_infeasible() {
    // The agent already standing on the start node always wins lead
    // election at epsilon cost and is then rejected outright.
    let planner = TaskPlanner::new(line_graph(&["A", "B"]), durations());
    let fleet = locations(&[(AGENT_1, "A", Heading::East)]);
    assert!(planner.plan("A", "B", &fleet).is_empty());
}

#[test]
fn unreachable_endpoints_yield_no_options() {
    let planner = TaskPlanner::new(line_graph(&["A", "B", "C"]), durations());
    let fleet = locations(&[(AGENT_1, "A", Heading::East)]);
    assert!(planner.plan("B", "Z", &fleet).is_empty());
    assert!(planner.plan("Z", "B", &fleet).is_empty());
}

#[test]
fn best_and_worst_bracket_every_option() {
    // Around the ring both ways: A -> B -> C is turn-free after the feeder
    // approach, A -> D -> C needs two turns, so the enumerations differ.
    let planner = TaskPlanner::new(ring_graph(), durations());
    let fleet = locations(&[(AGENT_1, "E", Heading::East)]);

    let options = planner.plan("A", "C", &fleet);
    assert_eq!(options.len(), 2);

    let best = planner.best_option(&options).unwrap();
    let worst = planner.worst_option(&options).unwrap();
    for option in &options {
        assert!(best.completion_time() <= option.completion_time());
        assert!(worst.completion_time() >= option.completion_time());
    }
    assert!(best.completion_time() < worst.completion_time());

    // The turn-free side is the cheap one.
    assert_eq!(best.tasks[1].path, vec!["A", "B", "C"]);
    assert_eq!(worst.tasks[1].path, vec!["A", "D", "C"]);
    paths_are_walks(&planner, &options);
}

#[test]
fn times_are_non_decreasing_within_each_agents_sequence() {
    let planner = TaskPlanner::new(ring_graph(), durations());
    let fleet = locations(&[
        (AGENT_1, "E", Heading::East),
        (AGENT_2, "D", Heading::North),
    ]);

    for option in planner.plan("A", "C", &fleet) {
        let mut last_end: HashMap<&str, f64> = HashMap::new();
        for task in &option.tasks {
            if let Some(prev) = last_end.get(task.agent.as_str()) {
                assert!(task.start_time >= *prev);
            }
            assert!(task.end_time >= task.start_time);
            last_end.insert(task.agent.as_str(), task.end_time);
        }
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// However agents and endpoints land on a line, every produced
        /// option is a contiguous timed chain of valid walks.
        #[test]
        fn options_are_contiguous_timed_walks(
            agent1 in 0usize..6,
            agent2 in 0usize..6,
            start in 0usize..6,
            end in 0usize..6,
            facing1 in 0usize..4,
            facing2 in 0usize..4,
        ) {
            prop_assume!(start != end);
            let names: Vec<String> = (0..6).map(|i| format!("N{i}")).collect();
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let planner = TaskPlanner::new(line_graph(&name_refs), durations());
            let fleet = locations(&[
                (AGENT_1, names[agent1].as_str(), Heading::ALL[facing1]),
                (AGENT_2, names[agent2].as_str(), Heading::ALL[facing2]),
            ]);

            for option in planner.plan(&names[start], &names[end], &fleet) {
                let mut cursor = 0.0;
                for task in &option.tasks {
                    prop_assert_eq!(task.start_time, cursor);
                    prop_assert!(task.end_time >= task.start_time);
                    for pair in task.path.windows(2) {
                        let hop = planner.graph().shortest_path(&pair[0], &pair[1]);
                        prop_assert_eq!(hop.len(), 2);
                    }
                    cursor = task.end_time;
                }
            }
        }
    }
}

#[test]
fn planning_twice_over_the_same_snapshot_is_deterministic() {
    let planner = TaskPlanner::new(ring_graph(), durations());
    let fleet = locations(&[
        (AGENT_1, "E", Heading::East),
        (AGENT_2, "D", Heading::North),
    ]);
    let first = planner.plan("A", "C", &fleet);
    let second = planner.plan("A", "C", &fleet);
    assert_eq!(first, second);
}
