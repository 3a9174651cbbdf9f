/// mudhost - A multi-user text world server
///
/// Players connect over telnet, walk a shared grid of rooms, and build it
/// from the inside. Every world object is a lock-protected, store-backed
/// entity; every session has a private event mailbox that it drains while
/// waiting for input.

// Module declarations
pub mod error;
pub mod config;
pub mod core;
pub mod model;
pub mod network;
pub mod session;
pub mod state;
pub mod text;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{MudError, Result};
pub use state::ServerState;

use crate::core::World;
use crate::network::TcpServer;
use std::sync::Arc;

/// Initialize logging infrastructure
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("mudhost starting...");
}

/// Load the world, bind the listener, and serve until the process exits
pub async fn run(config: ServerConfig) -> Result<()> {
    let store = config.open_store()?;
    let world = Arc::new(World::load(store)?);
    world.start_room()?;

    let server = TcpServer::bind(&config.listen_addr).await?;
    let state = ServerState::new(world, config);

    session::serve(server, state).await
}
