/// Event bus: per-actor mailboxes and audience fan-out
///
/// Every session registers one mailbox keyed by its character id. Publishers
/// name an audience (one actor, a room, a zone, or everyone online); the bus
/// resolves it to concrete mailboxes and enqueues a copy of the event in
/// each. Each mailbox is strictly FIFO. Publishing never blocks and never
/// fails: unknown or unregistered actors are skipped, and a mailbox that is
/// full drops the event with a warning.

use crate::core::entity::EntityId;
use crate::model::Direction;
use crate::network::Color;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Maximum number of events buffered per mailbox
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Something that happened in the world that other actors may see
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    Say {
        speaker: EntityId,
        name: String,
        message: String,
    },

    Emote {
        actor: EntityId,
        name: String,
        action: String,
    },

    /// Private message; only ever addressed to the recipient
    Tell {
        from: EntityId,
        name: String,
        message: String,
    },

    Broadcast {
        speaker: EntityId,
        name: String,
        message: String,
    },

    Enter {
        character: EntityId,
        name: String,
        room: EntityId,
        from: Option<Direction>,
    },

    Leave {
        character: EntityId,
        name: String,
        room: EntityId,
        to: Option<Direction>,
    },

    Login {
        character: EntityId,
        name: String,
    },

    Logout {
        character: EntityId,
        name: String,
    },

    /// A room's contents or description changed
    RoomUpdate {
        room: EntityId,
    },

    ZoneUpdate {
        zone: EntityId,
        name: String,
    },
}

impl Event {
    /// Text shown to `viewer`, or `None` when the event is silent for them
    pub fn render(&self, viewer: EntityId) -> Option<String> {
        match self {
            Event::Say { speaker, name, message } => Some(if *speaker == viewer {
                format!("You say, \"{}\"", message)
            } else {
                format!("{} says, \"{}\"", name, message)
            }),
            Event::Emote { name, action, .. } => Some(format!("{} {}", name, action)),
            Event::Tell { name, message, .. } => Some(format!("Message from {}: {}", name, message)),
            Event::Broadcast { speaker, name, message } => Some(if *speaker == viewer {
                format!("You broadcast: {}", message)
            } else {
                format!("Broadcast from {}: {}", name, message)
            }),
            Event::Enter { character, .. }
            | Event::Leave { character, .. }
            | Event::Login { character, .. }
            | Event::Logout { character, .. }
                if *character == viewer =>
            {
                None
            }
            Event::Enter { name, from: Some(direction), .. } => {
                Some(format!("{} has entered the room from the {}", name, direction))
            }
            Event::Enter { name, from: None, .. } => Some(format!("{} has entered the room", name)),
            Event::Leave { name, to: Some(direction), .. } => {
                Some(format!("{} has left the room to the {}", name, direction))
            }
            Event::Leave { name, to: None, .. } => Some(format!("{} has left the room", name)),
            Event::Login { name, .. } => Some(format!("{} has connected", name)),
            Event::Logout { name, .. } => Some(format!("{} has disconnected", name)),
            Event::RoomUpdate { .. } => None,
            Event::ZoneUpdate { name, .. } => Some(format!("This zone is now known as {}", name)),
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Event::Tell { .. } => Color::Magenta,
            Event::Broadcast { .. } => Color::Cyan,
            Event::Login { .. } | Event::Logout { .. } => Color::Blue,
            _ => Color::White,
        }
    }
}

/// Who should receive a published event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Actor(EntityId),
    Room(EntityId),
    Zone(EntityId),
    Everyone,
}

/// Resolves room and zone audiences to the characters located there
#[cfg_attr(test, mockall::automock)]
pub trait Directory: Send + Sync {
    fn characters_in_room(&self, room: EntityId) -> Vec<EntityId>;

    fn characters_in_zone(&self, zone: EntityId) -> Vec<EntityId>;
}

struct Slot {
    token: u64,
    sender: mpsc::Sender<Event>,
}

/// Receiving end of one actor's queue; owned by that actor's session
#[derive(Debug)]
pub struct Mailbox {
    actor: EntityId,
    token: u64,
    receiver: mpsc::Receiver<Event>,
}

impl Mailbox {
    /// Wait for the next event; `None` once the bus has dropped this mailbox
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

/// Process-wide registry of actor mailboxes
pub struct EventBus {
    directory: Arc<dyn Directory>,
    mailboxes: RwLock<HashMap<EntityId, Slot>>,
    capacity: usize,
    next_token: AtomicU64,
}

impl EventBus {
    /// Create a new event bus
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self::with_capacity(directory, DEFAULT_MAILBOX_CAPACITY)
    }

    pub fn with_capacity(directory: Arc<dyn Directory>, capacity: usize) -> Self {
        Self {
            directory,
            mailboxes: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            next_token: AtomicU64::new(0),
        }
    }

    /// Create the mailbox for `actor`
    ///
    /// A second registration for the same actor replaces the first; the old
    /// mailbox then sees end-of-stream.
    pub fn register(&self, actor: EntityId) -> Mailbox {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .mailboxes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor, Slot { token, sender });

        if previous.is_some() {
            warn!(%actor, "Replacing existing mailbox");
        } else {
            info!(%actor, "Registered mailbox");
        }

        Mailbox {
            actor,
            token,
            receiver,
        }
    }

    /// Remove and discard a mailbox
    pub fn unregister(&self, mailbox: Mailbox) {
        let mut mailboxes = self.mailboxes.write().unwrap_or_else(PoisonError::into_inner);

        // A newer registration for the same actor stays in place
        if mailboxes.get(&mailbox.actor).is_some_and(|slot| slot.token == mailbox.token) {
            mailboxes.remove(&mailbox.actor);
            info!(actor = %mailbox.actor, "Unregistered mailbox");
        }
    }

    pub fn is_registered(&self, actor: EntityId) -> bool {
        self.mailboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&actor)
    }

    pub fn registered_count(&self) -> usize {
        self.mailboxes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Enqueue `event` once for every registered member of `audience`
    ///
    /// Returns the number of mailboxes that accepted the event.
    pub fn publish(&self, event: Event, audience: Audience) -> usize {
        // Resolve before touching the registry lock
        let targets = match audience {
            Audience::Actor(actor) => Some(vec![actor]),
            Audience::Room(room) => Some(self.directory.characters_in_room(room)),
            Audience::Zone(zone) => Some(self.directory.characters_in_zone(zone)),
            Audience::Everyone => None,
        };

        let mailboxes = self.mailboxes.read().unwrap_or_else(PoisonError::into_inner);

        let slots: Vec<(&EntityId, &Slot)> = match &targets {
            Some(ids) => ids
                .iter()
                .filter_map(|id| mailboxes.get_key_value(id))
                .collect(),
            None => mailboxes.iter().collect(),
        };

        let mut delivered = 0;

        for (actor, slot) in slots {
            match slot.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(%actor, capacity = self.capacity, "Mailbox full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(%actor, "Mailbox closed, skipping");
                }
            }
        }

        debug!(?audience, delivered, "Published event");
        delivered
    }
}
