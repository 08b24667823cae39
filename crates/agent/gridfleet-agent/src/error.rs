//! Agent runtime error types

use thiserror::Error;

/// Result type for agent startup and runtime operations
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Errors raised while bringing an agent up.
///
/// The running protocol itself never produces these: planning
/// infeasibility is an empty option set, and transmission failures are
/// logged and swallowed by the bus.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] gridfleet_core::ConfigError),

    #[error("network error: {0}")]
    Net(#[from] gridfleet_net::NetError),
}
