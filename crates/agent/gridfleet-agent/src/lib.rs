//! # Gridfleet Agent
//!
//! The per-vehicle runtime tying the system together: a [`FleetAgent`] owns
//! a message bus and a task planner, tracks every known peer location,
//! answers the fleet protocol, and — once a plan reaches it — executes its
//! share of the work against a [`RobotController`] while a logical clock
//! decides when to hand off to the next agent in the chain.
//!
//! Physical actuation stays outside: the agent only ever calls the three
//! `prepare_*` operations and trusts them to block until done.

pub mod agent;
pub mod clock;
pub mod error;
pub mod robot;

pub use agent::{AgentState, FleetAgent};
pub use clock::{InstantPacer, LogicalClock, Pacer, RealTimePacer};
pub use error::{AgentError, AgentResult};
pub use robot::{RobotAction, RobotController, SimulatedRobot};
