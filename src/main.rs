//! Quadfall Game Server
//!
//! Authoritative multiplayer server for Quadfall. Binds the TCP listener,
//! wires the orchestrator into the reactor loop and runs until SIGINT or
//! SIGTERM.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quadfall::{
    GameServer, Reactor, ReactorConfig, RoomConfig, SessionConfig, ShutdownToken, VERSION,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "quadfall-server", version, about = "Quadfall multiplayer game server")]
struct Args {
    /// TCP port to listen on
    #[arg(
        value_parser = clap::value_parser!(u16).range(1..),
        default_value_t = quadfall::DEFAULT_PORT,
    )]
    port: u16,

    /// Maximum concurrent connections (also the listen backlog)
    #[arg(long, default_value_t = quadfall::DEFAULT_MAX_CONNECTIONS)]
    max_connections: usize,

    /// Seconds of silence before a session is dropped
    #[arg(long, default_value_t = quadfall::DEFAULT_SESSION_TIMEOUT_SECS)]
    session_timeout: u64,

    /// Maximum number of live rooms
    #[arg(long, default_value_t = quadfall::DEFAULT_MAX_ROOMS)]
    max_rooms: usize,

    /// Member cap per room
    #[arg(long, default_value_t = quadfall::DEFAULT_ROOM_CAPACITY)]
    room_capacity: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Quadfall Server v{}", VERSION);

    let shutdown = ShutdownToken::new();
    signal_hook::flag::register(signal_hook::consts::SIGINT, shutdown.flag())
        .context("failed to install SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, shutdown.flag())
        .context("failed to install SIGTERM handler")?;

    let mut net = Reactor::bind(ReactorConfig {
        port: args.port,
        max_connections: args.max_connections,
        ..Default::default()
    })
    .context("failed to start listener")?;

    let mut game = GameServer::new(
        SessionConfig {
            timeout: Duration::from_secs(args.session_timeout),
        },
        RoomConfig {
            max_rooms: args.max_rooms,
            max_players: args.room_capacity,
        },
    );

    net.run(&mut game, &shutdown).context("server loop failed")?;

    info!("goodbye");
    Ok(())
}
