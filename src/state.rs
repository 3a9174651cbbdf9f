/// Shared server state
///
/// Cloned into every connection task. Holds the world registry, the event
/// bus, and the configuration.

use crate::config::ServerConfig;
use crate::core::{EventBus, World};
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub world: Arc<World>,

    /// Event bus resolving room and zone audiences through `world`
    pub events: Arc<EventBus>,

    pub config: Arc<ServerConfig>,
}

impl ServerState {
    pub fn new(world: Arc<World>, config: ServerConfig) -> Self {
        let events = Arc::new(EventBus::with_capacity(world.clone(), config.mailbox_capacity));

        Self {
            world,
            events,
            config: Arc::new(config),
        }
    }
}
