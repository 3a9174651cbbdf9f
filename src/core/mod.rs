/// Core of the world server
///
/// This module contains the concurrency substrate (lock-protected,
/// store-backed entities and the per-actor event bus), the entity registry,
/// and the world operations built on top of them.

pub mod entity;
pub mod store;
pub mod events;
pub mod world;
pub mod actions;

// Re-export commonly used types
pub use entity::{Entity, EntityData, EntityId, EntityKind, EntityWriteGuard};
pub use store::{JsonFileStore, MemoryStore, Record, Store};
pub use events::{Audience, Directory, Event, EventBus, Mailbox};
pub use world::{NameClaim, World};
