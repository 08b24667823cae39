//! Fleet agent daemon.
//!
//! `agvd run` brings one agent onto the fleet network and parks until
//! interrupted. `agvd plan` evaluates a transport request offline against
//! an assumed set of agent positions, printing every scheduling option the
//! planner would produce.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gridfleet_agent::{FleetAgent, RealTimePacer, SimulatedRobot};
use gridfleet_core::{AgentLocation, FleetConfig, Heading};
use gridfleet_net::{MessageBus, UdpDatagrams};
use gridfleet_routing::{AgentLocations, TaskPlanner, TransportGraph};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agvd", about = "Gridfleet AGV coordination agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an agent on the fleet network
    Run {
        /// Path to the agent's TOML configuration
        #[arg(long)]
        config: PathBuf,
    },
    /// Evaluate a transport request offline against assumed agent positions
    Plan {
        /// Path to the agent's TOML configuration
        #[arg(long)]
        config: PathBuf,
        /// Start node of the request
        #[arg(long)]
        start: String,
        /// End node of the request
        #[arg(long)]
        end: String,
        /// Assumed agent as ADDR=NODE:FACING, repeatable
        #[arg(long = "agent", value_name = "ADDR=NODE:FACING")]
        agents: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Run { config } => run(config).await,
        Command::Plan {
            config,
            start,
            end,
            agents,
        } => plan(config, &start, &end, &agents),
    }
}

async fn run(config_path: PathBuf) -> anyhow::Result<()> {
    let config = FleetConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if !config.simulated_robot {
        bail!("hardware robot control is not linked into agvd; set simulated_robot = true");
    }

    let transport = Arc::new(UdpDatagrams::bind(&config.network)?);
    let bus = Arc::new(MessageBus::new(
        transport,
        Duration::from_secs_f64(config.network.presence_interval_secs),
    ));
    let agent = Arc::new(FleetAgent::new(
        &config,
        Arc::clone(&bus),
        Arc::new(SimulatedRobot::new()),
        Arc::new(RealTimePacer),
    ));
    let (receive, presence) = agent.start();
    info!(identity = %bus.identity(), "agent running; ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    receive.abort();
    presence.abort();
    Ok(())
}

fn plan(config_path: PathBuf, start: &str, end: &str, agents: &[String]) -> anyhow::Result<()> {
    let config = FleetConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if agents.is_empty() {
        bail!("at least one --agent ADDR=NODE:FACING is required");
    }
    let mut locations = AgentLocations::new();
    for spec in agents {
        let (addr, location) = parse_agent(spec)?;
        locations.insert(addr, location);
    }

    let planner = TaskPlanner::new(TransportGraph::from_config(&config.graph), config.durations);
    let options = planner.plan(start, end, &locations);
    if options.is_empty() {
        println!("no viable options for {start} -> {end}");
        return Ok(());
    }

    let best = planner.best_option(&options).map(|o| o.completion_time());
    let worst = planner.worst_option(&options).map(|o| o.completion_time());
    for (index, option) in options.iter().enumerate() {
        let marker = if Some(option.completion_time()) == best {
            " (best)"
        } else if Some(option.completion_time()) == worst {
            " (worst)"
        } else {
            ""
        };
        println!(
            "option {index}: {:.1}s, {} agent(s){marker}",
            option.completion_time(),
            option.agents_involved()
        );
        for task in &option.tasks {
            println!(
                "  {:<9} {:<16} {:<24} {:>6.1}s -> {:.1}s",
                format!("{:?}", task.kind),
                task.agent,
                task.path.join(" > "),
                task.start_time,
                task.end_time
            );
        }
    }
    Ok(())
}

fn parse_agent(spec: &str) -> anyhow::Result<(String, AgentLocation)> {
    let (addr, rest) = spec
        .split_once('=')
        .with_context(|| format!("expected ADDR=NODE:FACING, got {spec:?}"))?;
    let (node, facing) = rest
        .split_once(':')
        .with_context(|| format!("expected ADDR=NODE:FACING, got {spec:?}"))?;
    let degrees: u16 = facing
        .parse()
        .with_context(|| format!("facing must be a number of degrees, got {facing:?}"))?;
    let facing = Heading::try_from(degrees).map_err(anyhow::Error::msg)?;
    Ok((addr.to_owned(), AgentLocation::new(node, facing)))
}
