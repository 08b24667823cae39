//! The per-vehicle coordinator.
//!
//! A [`FleetAgent`] is the handler behind the message bus: every inbound
//! envelope is matched exhaustively against the protocol and either
//! mutates local state or drives the robot. All handling runs synchronously
//! on the bus receive task, so while an agent is draining its task queue
//! (real-time paced), no further messages are processed; the protocol
//! relies on that for its ordering.
//!
//! There is no timeout-driven recovery anywhere: a lost distribution or
//! execution trigger stalls the chain. Known limitation, kept on purpose.

use crate::clock::{LogicalClock, Pacer};
use crate::robot::RobotController;
use async_trait::async_trait;
use dashmap::DashMap;
use gridfleet_core::{
    AgentAddr, AgentLocation, DurationsConfig, FleetConfig, Heading, Task, TaskKind,
    TransportRequest,
};
use gridfleet_net::{Envelope, MessageBus, MessageHandler, NetResult, Payload};
use gridfleet_routing::{AgentLocations, TaskPlanner, TransportGraph};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Execution state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// No scheduled work
    Idle,
    /// Draining the scheduled task queue
    Executing,
}

/// Scheduled work and the successor to trigger, as learned from the most
/// recent task distribution.
#[derive(Debug, Default)]
struct Schedule {
    tasks: Vec<Task>,
    handoff: Option<Handoff>,
}

#[derive(Debug, Clone)]
struct Handoff {
    successor: AgentAddr,
    /// Logical time at which the successor is triggered
    at: f64,
}

/// Live execution bookkeeping for one queue drain.
struct ExecutionCtx {
    clock: LogicalClock,
    handoff: Option<Handoff>,
    /// One-shot latch so the successor is signalled exactly once
    signalled: bool,
}

/// One vehicle's coordination runtime.
pub struct FleetAgent {
    identity: AgentAddr,
    /// Configured starting location, the fallback if the live entry is gone
    home: AgentLocation,
    coordinator: bool,
    use_best_path: bool,
    settle_delay_secs: f64,
    durations: DurationsConfig,
    bus: Arc<MessageBus>,
    planner: TaskPlanner,
    robot: Arc<dyn RobotController>,
    pacer: Arc<dyn Pacer>,
    /// Last known location per agent, self included. Single logical writer
    /// per key: the local key is only written here, peer keys only from
    /// LOCATION_RESPONSE handling on the receive task.
    locations: DashMap<AgentAddr, AgentLocation>,
    schedule: Mutex<Schedule>,
    state: Mutex<AgentState>,
}

impl FleetAgent {
    pub fn new(
        config: &FleetConfig,
        bus: Arc<MessageBus>,
        robot: Arc<dyn RobotController>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        let identity = bus.identity().clone();
        let graph = TransportGraph::from_config(&config.graph);
        let planner = TaskPlanner::new(graph, config.durations);
        let home = AgentLocation::new(config.location.clone(), config.facing);
        let locations = DashMap::new();
        locations.insert(identity.clone(), home.clone());
        info!(%identity, location = %config.location, "agent initialized");
        Self {
            identity,
            home,
            coordinator: config.coordinator,
            use_best_path: config.use_best_path,
            settle_delay_secs: config.network.settle_delay_secs,
            durations: config.durations,
            bus,
            planner,
            robot,
            pacer,
            locations,
            schedule: Mutex::new(Schedule::default()),
            state: Mutex::new(AgentState::Idle),
        }
    }

    /// Attach this agent to its bus and spawn the receive and presence
    /// loops.
    pub fn start(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        self.bus.start(Arc::clone(self) as Arc<dyn MessageHandler>)
    }

    pub fn identity(&self) -> &AgentAddr {
        &self.identity
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock()
    }

    /// Tasks currently queued for execution.
    pub fn scheduled_tasks(&self) -> Vec<Task> {
        self.schedule.lock().tasks.clone()
    }

    /// Successor address and handoff time from the last distribution.
    pub fn successor(&self) -> Option<(AgentAddr, f64)> {
        self.schedule
            .lock()
            .handoff
            .as_ref()
            .map(|handoff| (handoff.successor.clone(), handoff.at))
    }

    /// Last known location of any agent.
    pub fn location_of(&self, agent: &str) -> Option<AgentLocation> {
        self.locations.get(agent).map(|entry| entry.value().clone())
    }

    fn own_location(&self) -> AgentLocation {
        self.locations
            .get(&self.identity)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.home.clone())
    }

    fn update_own_location(&self, node: impl Into<String>, facing: Heading) {
        self.locations
            .insert(self.identity.clone(), AgentLocation::new(node.into(), facing));
    }

    /// Ordered snapshot of everything we know, handed to the planner.
    fn location_snapshot(&self) -> AgentLocations {
        self.locations
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// An external transport request: plan against the live snapshot,
    /// distribute the selected option fleet-wide, then trigger the first
    /// agent once everyone had time to persist the plan.
    async fn handle_task_request(&self, request: TransportRequest) {
        let snapshot = self.location_snapshot();
        let options = self
            .planner
            .plan(&request.start_node, &request.end_node, &snapshot);
        let selected = if self.use_best_path {
            self.planner.best_option(&options)
        } else {
            self.planner.worst_option(&options)
        };
        let Some(option) = selected else {
            warn!(
                start = %request.start_node,
                end = %request.end_node,
                "no viable option for transport request"
            );
            return;
        };
        info!(
            start = %request.start_node,
            end = %request.end_node,
            tasks = option.tasks.len(),
            completion = option.completion_time(),
            "distributing selected plan"
        );
        self.bus
            .broadcast(Payload::TaskDistribution(option.tasks.clone()))
            .await;
        self.pacer.pace(self.settle_delay_secs).await;
        if let Some(first) = option.tasks.first() {
            self.bus.send(&first.agent, Payload::ExecuteTask(true)).await;
        }
    }

    /// A distributed plan: keep our share of the task list and work out who
    /// to trigger next. A distribution that names none of our tasks leaves
    /// all local state untouched.
    fn handle_task_distribution(&self, tasks: Vec<Task>, broadcaster: AgentAddr) {
        let mine: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.agent == self.identity)
            .map(|(index, _)| index)
            .collect();
        let Some(&last_index) = mine.last() else {
            debug!(from = %broadcaster, "distribution names no tasks for this agent");
            return;
        };

        let handoff = if last_index == tasks.len() - 1 {
            // We finish the chain; close the loop back to the coordinator
            // just before our final task ends.
            Handoff {
                successor: broadcaster,
                at: tasks[last_index].end_time - 1.0,
            }
        } else {
            Handoff {
                successor: tasks[last_index + 1].agent.clone(),
                at: tasks[last_index + 1].start_time,
            }
        };

        let mut schedule = self.schedule.lock();
        for index in &mine {
            schedule.tasks.push(tasks[*index].clone());
        }
        info!(
            count = mine.len(),
            successor = %handoff.successor,
            handoff_at = handoff.at,
            "scheduled distributed tasks"
        );
        schedule.handoff = Some(handoff);
    }

    /// The handoff trigger: drain the scheduled queue, driving the robot
    /// and the logical clock, and signal the successor when its time comes.
    async fn handle_execute(&self, sender: AgentAddr) {
        info!(from = %sender, "received execution trigger");
        let (tasks, handoff) = {
            let mut schedule = self.schedule.lock();
            (
                std::mem::take(&mut schedule.tasks),
                schedule.handoff.take(),
            )
        };
        if tasks.is_empty() {
            if self.coordinator {
                info!("transport chain complete");
            }
            return;
        }

        *self.state.lock() = AgentState::Executing;
        let mut ctx = ExecutionCtx {
            clock: LogicalClock::new(),
            handoff,
            signalled: false,
        };
        for (index, task) in tasks.iter().enumerate() {
            ctx.clock.set(task.start_time);
            match task.kind {
                TaskKind::Move => {
                    let pickup_at_end = tasks
                        .get(index + 1)
                        .is_some_and(|next| next.kind == TaskKind::Transport);
                    self.execute_move(task, pickup_at_end, &mut ctx).await;
                }
                TaskKind::Transport => self.execute_transport(task, &mut ctx).await,
            }
        }
        *self.state.lock() = AgentState::Idle;
        info!("scheduled tasks drained");
    }

    /// Reposition along the task path. The final step turns into a pickup
    /// approach when the payload is picked up right afterwards.
    async fn execute_move(&self, task: &Task, pickup_at_end: bool, ctx: &mut ExecutionCtx) {
        let steps = task.path.len().saturating_sub(1);
        for i in 0..steps {
            let from = &task.path[i];
            let target = &task.path[i + 1];
            if i == steps - 1 && pickup_at_end {
                self.robot.prepare_pickup(target).await;
            } else {
                self.robot.prepare_move(target).await;
            }
            self.update_own_location(target.clone(), task.last_facing);
            self.advance(ctx, self.durations.move_secs + task.turn_secs_at(from))
                .await;
        }
    }

    /// Carry the payload along the segment. On the final step the vehicle
    /// stops one node short and drops the payload onto the target.
    async fn execute_transport(&self, task: &Task, ctx: &mut ExecutionCtx) {
        self.advance(ctx, self.durations.pickup_secs).await;
        let steps = task.path.len().saturating_sub(1);
        for i in 0..steps {
            let from = &task.path[i];
            let target = &task.path[i + 1];
            if i == steps - 1 {
                self.robot.prepare_dropoff(target).await;
                self.update_own_location(from.clone(), task.last_facing);
            } else {
                self.robot.prepare_move(target).await;
                self.update_own_location(target.clone(), task.last_facing);
            }
            self.advance(ctx, self.durations.move_secs + task.turn_secs_at(from))
                .await;
        }
        self.advance(ctx, self.durations.dropoff_secs).await;
    }

    /// Advance the logical clock, pace for the same duration, and fire the
    /// one-shot handoff once the clock crosses the successor's start time.
    async fn advance(&self, ctx: &mut ExecutionCtx, seconds: f64) {
        ctx.clock.advance(seconds);
        self.pacer.pace(seconds).await;
        if ctx.signalled {
            return;
        }
        let due = ctx
            .handoff
            .as_ref()
            .is_some_and(|handoff| ctx.clock.now() >= handoff.at);
        if due {
            ctx.signalled = true;
            if let Some(handoff) = &ctx.handoff {
                info!(
                    successor = %handoff.successor,
                    clock = ctx.clock.now(),
                    "signalling successor"
                );
                self.bus
                    .send(&handoff.successor, Payload::ExecuteTask(true))
                    .await;
            }
        }
    }

    async fn handle_echo(&self, value: serde_json::Value, sender: AgentAddr) {
        if sender == self.identity {
            return;
        }
        info!(from = %sender, payload = %value, "received echo");
        self.bus.send(&sender, Payload::Message(value)).await;
    }
}

#[async_trait]
impl MessageHandler for FleetAgent {
    async fn on_envelope(&self, envelope: Envelope) -> NetResult<()> {
        let Envelope { payload, address: sender } = envelope;
        match payload {
            // Consumed by the bus before dispatch.
            Payload::DiscoverPeer(_) => {}
            Payload::LocationRequest(_) => {
                self.bus
                    .send(&sender, Payload::LocationResponse(self.own_location()))
                    .await;
            }
            Payload::LocationResponse(location) => {
                debug!(peer = %sender, node = %location.node, "peer location updated");
                self.locations.insert(sender, location);
            }
            Payload::TaskRequest(request) => self.handle_task_request(request).await,
            Payload::TaskDistribution(tasks) => self.handle_task_distribution(tasks, sender),
            Payload::ExecuteTask(_) => self.handle_execute(sender).await,
            Payload::Message(value) => info!(from = %sender, payload = %value, "received message"),
            Payload::Echo(value) => self.handle_echo(value, sender).await,
        }
        Ok(())
    }

    async fn on_peer_discovered(&self, peer: AgentAddr) -> NetResult<()> {
        self.bus
            .send(&peer, Payload::LocationRequest(self.own_location()))
            .await;
        Ok(())
    }
}
