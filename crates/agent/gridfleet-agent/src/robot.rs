//! Seam to the physical vehicle.
//!
//! Drive hardware, line following and marker detection live behind this
//! trait; each operation blocks until the physical or simulated action has
//! completed and handles its own failures. The coordination core treats
//! all three as infallible for scheduling purposes.

use async_trait::async_trait;
use gridfleet_core::NodeId;
use parking_lot::Mutex;
use tracing::info;

/// External controller of one vehicle.
#[async_trait]
pub trait RobotController: Send + Sync {
    /// Drive to an adjacent node.
    async fn prepare_move(&self, target: &str);

    /// Drive to an adjacent node and pick the payload up there.
    async fn prepare_pickup(&self, target: &str);

    /// Drive towards a node and drop the payload off on it.
    async fn prepare_dropoff(&self, target: &str);
}

/// One recorded robot operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotAction {
    Move(NodeId),
    Pickup(NodeId),
    Dropoff(NodeId),
}

/// Robot stand-in that logs and journals every action.
#[derive(Default)]
pub struct SimulatedRobot {
    journal: Mutex<Vec<RobotAction>>,
}

impl SimulatedRobot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything the robot has been asked to do, in order.
    pub fn actions(&self) -> Vec<RobotAction> {
        self.journal.lock().clone()
    }
}

#[async_trait]
impl RobotController for SimulatedRobot {
    async fn prepare_move(&self, target: &str) {
        info!(target, "move");
        self.journal.lock().push(RobotAction::Move(target.to_owned()));
    }

    async fn prepare_pickup(&self, target: &str) {
        info!(target, "move and pick up");
        self.journal.lock().push(RobotAction::Pickup(target.to_owned()));
    }

    async fn prepare_dropoff(&self, target: &str) {
        info!(target, "move and drop off");
        self.journal.lock().push(RobotAction::Dropoff(target.to_owned()));
    }
}
