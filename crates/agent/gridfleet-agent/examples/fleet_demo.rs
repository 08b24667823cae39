//! Two-agent relay demo on the in-process datagram hub.
//!
//! Agent 1 starts at A, agent 2 at D on the line A-B-C-D-E. A transport
//! request B -> E makes agent 1 carry the payload to the handoff node C,
//! where agent 2 picks it up and continues to E. Runs in logical time
//! (instant pacer), so it finishes immediately.
//!
//! ```sh
//! cargo run -p gridfleet-agent --example fleet_demo
//! ```

use gridfleet_agent::{FleetAgent, InstantPacer, SimulatedRobot};
use gridfleet_core::{
    DurationsConfig, FleetConfig, GraphConfig, GridPos, Heading, NetworkConfig, NodeId,
    TransportRequest,
};
use gridfleet_net::{MemoryHub, MessageBus, Payload};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn config(location: &str, coordinator: bool) -> FleetConfig {
    let names = ["A", "B", "C", "D", "E"];
    let edges: Vec<(NodeId, NodeId)> = names
        .windows(2)
        .map(|pair| (pair[0].to_owned(), pair[1].to_owned()))
        .collect();
    let positions = names
        .iter()
        .enumerate()
        .map(|(x, name)| ((*name).to_owned(), GridPos::new(x as i32, 0)))
        .collect();
    FleetConfig {
        coordinator,
        location: location.to_owned(),
        facing: Heading::East,
        use_best_path: true,
        simulated_robot: true,
        durations: DurationsConfig {
            move_secs: 5.0,
            pickup_secs: 13.0,
            dropoff_secs: 13.0,
            turn_secs: 4.0,
        },
        graph: GraphConfig { edges, positions },
        network: NetworkConfig::default(),
    }
}

fn spawn(hub: &MemoryHub, identity: &str, location: &str, coordinator: bool) -> Arc<SimulatedRobot> {
    let bus = Arc::new(MessageBus::new(
        Arc::new(hub.join(identity)),
        Duration::from_millis(20),
    ));
    let robot = Arc::new(SimulatedRobot::new());
    let agent = Arc::new(FleetAgent::new(
        &config(location, coordinator),
        bus,
        robot.clone(),
        Arc::new(InstantPacer),
    ));
    agent.start();
    robot
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let hub = MemoryHub::new();
    let robot_1 = spawn(&hub, "192.168.1.10", "A", true);
    let robot_2 = spawn(&hub, "192.168.1.20", "D", false);

    // Warehouse system endpoint: only sends, never handles.
    let wms = MessageBus::new(Arc::new(hub.join("192.168.1.2")), Duration::from_secs(3600));

    // Let the agents discover each other and exchange locations.
    sleep(Duration::from_millis(200)).await;

    wms.send(
        "192.168.1.10",
        Payload::TaskRequest(TransportRequest {
            start_node: "B".to_owned(),
            end_node: "E".to_owned(),
        }),
    )
    .await;
    sleep(Duration::from_millis(500)).await;

    println!("agent 1 actions: {:?}", robot_1.actions());
    println!("agent 2 actions: {:?}", robot_2.actions());
}
