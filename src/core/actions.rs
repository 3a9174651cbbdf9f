/// World operations
///
/// Each operation validates its arguments, mutates the entities involved one
/// at a time (never holding two entity locks at once), and publishes the
/// event describing the change. Operations spanning two entities, such as
/// paired exits, are two independent commits: a failure between them leaves
/// the pair asymmetric.

use crate::core::entity::{EntityId, EntityKind};
use crate::core::events::{Audience, Directory, Event};
use crate::error::{MudError, Result};
use crate::model::{Area, Character, Coordinate, Direction, Item, Room, Zone};
use crate::state::ServerState;
use crate::text::validate_name;
use std::sync::Arc;
use tracing::{debug, info};

impl ServerState {
    /// Room a character currently stands in
    pub fn room_of(&self, character: &Character) -> Result<Arc<Room>> {
        let id = character.room_id();
        self.world.room(id).ok_or(MudError::EntityNotFound {
            kind: EntityKind::Room,
            id,
        })
    }

    pub fn zone_of(&self, room: &Room) -> Result<Arc<Zone>> {
        let id = room.zone_id();
        self.world.zone(id).ok_or(MudError::EntityNotFound {
            kind: EntityKind::Zone,
            id,
        })
    }

    // ========================================
    // Presence
    // ========================================

    pub fn login(&self, character: &Character) -> Result<()> {
        character.set_online(true)?;
        info!(id = %character.id(), name = %character.name(), "Character logged in");

        self.events.publish(
            Event::Login {
                character: character.id(),
                name: character.pretty_name(),
            },
            Audience::Everyone,
        );
        Ok(())
    }

    pub fn logout(&self, character: &Character) -> Result<()> {
        character.set_online(false)?;
        info!(id = %character.id(), name = %character.name(), "Character logged out");

        self.events.publish(
            Event::Logout {
                character: character.id(),
                name: character.pretty_name(),
            },
            Audience::Everyone,
        );
        Ok(())
    }

    // ========================================
    // Communication
    // ========================================

    pub fn say(&self, character: &Character, message: &str) {
        self.events.publish(
            Event::Say {
                speaker: character.id(),
                name: character.pretty_name(),
                message: message.to_string(),
            },
            Audience::Room(character.room_id()),
        );
    }

    pub fn emote(&self, character: &Character, action: &str) {
        self.events.publish(
            Event::Emote {
                actor: character.id(),
                name: character.pretty_name(),
                action: action.to_string(),
            },
            Audience::Room(character.room_id()),
        );
    }

    pub fn tell(&self, from: &Character, to: &Character, message: &str) {
        self.events.publish(
            Event::Tell {
                from: from.id(),
                name: from.pretty_name(),
                message: message.to_string(),
            },
            Audience::Actor(to.id()),
        );
    }

    pub fn broadcast(&self, character: &Character, message: &str) {
        self.events.publish(
            Event::Broadcast {
                speaker: character.id(),
                name: character.pretty_name(),
                message: message.to_string(),
            },
            Audience::Everyone,
        );
    }

    // ========================================
    // Movement
    // ========================================

    /// Walk through an exit of the current room
    ///
    /// An enabled exit that leads nowhere yet gets a fresh room, with the
    /// way back already open.
    pub fn move_character(&self, character: &Character, direction: Direction) -> Result<Arc<Room>> {
        let from = self.room_of(character)?;

        if !from.has_exit(direction) {
            return Err(MudError::NoExit);
        }

        let zone = from.zone_id();
        let location = from.next_location(direction).ok_or(MudError::NoExit)?;

        let to = match self.world.room_by_location(location, zone) {
            Some(room) => room,
            None => {
                let room = self.world.create_room(zone, location)?;
                room.set_exit_enabled(direction.opposite(), true)?;
                room
            }
        };

        self.relocate(character, &from, &to, Some(direction))?;
        Ok(to)
    }

    /// Jump to a location in a zone, creating the room when needed
    pub fn teleport(&self, character: &Character, zone: EntityId, location: Coordinate) -> Result<Arc<Room>> {
        let from = self.room_of(character)?;

        let to = match self.world.room_by_location(location, zone) {
            Some(room) => room,
            None => self.world.create_room(zone, location)?,
        };

        self.relocate(character, &from, &to, None)?;
        Ok(to)
    }

    /// Move the character and tell both rooms
    ///
    /// A move publishes two events: a leave to the old room, then an enter
    /// to the new one.
    fn relocate(&self, character: &Character, from: &Room, to: &Room, direction: Option<Direction>) -> Result<()> {
        character.set_room_id(to.id())?;
        debug!(id = %character.id(), from = %from.id(), to = %to.id(), "Character moved");

        let name = character.pretty_name();

        self.events.publish(
            Event::Leave {
                character: character.id(),
                name: name.clone(),
                room: from.id(),
                to: direction,
            },
            Audience::Room(from.id()),
        );
        self.events.publish(
            Event::Enter {
                character: character.id(),
                name,
                room: to.id(),
                from: direction.map(Direction::opposite),
            },
            Audience::Room(to.id()),
        );
        Ok(())
    }

    /// Open an exit, walk through it, and open the way back
    pub fn dig(&self, character: &Character, direction: Direction) -> Result<Arc<Room>> {
        let from = self.room_of(character)?;
        if from.next_location(direction).is_none() {
            return Err(MudError::NoExit);
        }
        from.set_exit_enabled(direction, true)?;

        let to = self.move_character(character, direction)?;
        to.set_exit_enabled(direction.opposite(), true)?;
        Ok(to)
    }

    // ========================================
    // Room editing
    // ========================================

    pub fn set_room_title(&self, room: &Room, title: &str) -> Result<()> {
        room.set_title(title)?;
        self.room_updated(room);
        Ok(())
    }

    pub fn set_room_description(&self, room: &Room, description: &str) -> Result<()> {
        room.set_description(description)?;
        self.room_updated(room);
        Ok(())
    }

    /// Flip an exit and mirror it in the neighbouring room, if there is one
    ///
    /// Returns the new state of the exit.
    pub fn toggle_exit(&self, room: &Room, direction: Direction) -> Result<bool> {
        let enable = !room.has_exit(direction);
        room.set_exit_enabled(direction, enable)?;

        let neighbour = room
            .next_location(direction)
            .and_then(|location| self.world.room_by_location(location, room.zone_id()));
        if let Some(neighbour) = neighbour {
            neighbour.set_exit_enabled(direction.opposite(), enable)?;
        }

        self.room_updated(room);
        Ok(enable)
    }

    /// Delete the room next to `room`, closing every exit that led into it
    pub fn destroy_room(&self, room: &Room, direction: Direction) -> Result<()> {
        let target = self
            .world
            .room_by_location(room.next_location(direction).ok_or(MudError::NoExit)?, room.zone_id())
            .ok_or(MudError::NoExit)?;

        if !self.world.characters_in_room(target.id()).is_empty() {
            return Err(MudError::RoomOccupied);
        }

        for exit in target.exits() {
            let neighbour = target
                .next_location(exit)
                .and_then(|location| self.world.room_by_location(location, target.zone_id()));
            if let Some(neighbour) = neighbour {
                neighbour.set_exit_enabled(exit.opposite(), false)?;
            }
        }

        for item in target.item_ids() {
            self.world.delete_item(item)?;
        }

        self.world.delete_room(target.id())?;
        info!(room = %target.id(), "Room destroyed");

        self.room_updated(room);
        Ok(())
    }

    fn room_updated(&self, room: &Room) {
        self.events.publish(Event::RoomUpdate { room: room.id() }, Audience::Room(room.id()));
    }

    // ========================================
    // Zones and areas
    // ========================================

    /// Create a zone with one room and move the character into it
    pub fn new_zone(&self, character: &Character, name: &str) -> Result<(Arc<Zone>, Arc<Room>)> {
        self.check_zone_name(name)?;

        let zone = self.world.create_zone(name)?;
        let room = self.teleport(character, zone.id(), Coordinate::default())?;
        Ok((zone, room))
    }

    pub fn rename_zone(&self, zone: &Zone, name: &str) -> Result<()> {
        self.check_zone_name(name)?;
        zone.set_name(name)?;

        self.events.publish(
            Event::ZoneUpdate {
                zone: zone.id(),
                name: name.to_string(),
            },
            Audience::Zone(zone.id()),
        );
        Ok(())
    }

    fn check_zone_name(&self, name: &str) -> Result<()> {
        if self.world.zone_by_name(name).is_some() {
            return Err(MudError::ValidationError {
                field: "zone".to_string(),
                reason: "A zone with that name already exists".to_string(),
            });
        }
        Ok(())
    }

    pub fn new_area(&self, zone: &Zone, name: &str) -> Result<Arc<Area>> {
        if self
            .world
            .areas_in_zone(zone.id())
            .iter()
            .any(|a| a.name().eq_ignore_ascii_case(name))
        {
            return Err(MudError::ValidationError {
                field: "area".to_string(),
                reason: "An area with that name already exists in this zone".to_string(),
            });
        }

        self.world.create_area(name, zone.id())
    }

    // ========================================
    // NPCs
    // ========================================

    /// Reject invalid or taken character names
    pub fn check_character_name(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        if self.world.character_by_name(name).is_some() {
            return Err(MudError::InvalidName {
                name: name.to_string(),
                reason: "that name is unavailable".to_string(),
            });
        }
        Ok(())
    }

    pub fn create_npc(&self, room: &Room, name: &str) -> Result<Arc<Character>> {
        self.check_character_name(name)?;
        let npc = self.world.create_npc(name, room.id())?;

        self.events.publish(
            Event::Enter {
                character: npc.id(),
                name: npc.pretty_name(),
                room: room.id(),
                from: None,
            },
            Audience::Room(room.id()),
        );
        Ok(npc)
    }

    pub fn rename_npc(&self, npc: &Character, name: &str) -> Result<()> {
        self.check_character_name(name)?;
        npc.set_name(name)?;
        self.events.publish(Event::RoomUpdate { room: npc.room_id() }, Audience::Room(npc.room_id()));
        Ok(())
    }

    pub fn delete_npc(&self, npc: &Character) -> Result<()> {
        let room = npc.room_id();
        self.world.delete_character(npc.id())?;

        self.events.publish(
            Event::Leave {
                character: npc.id(),
                name: npc.pretty_name(),
                room,
                to: None,
            },
            Audience::Room(room),
        );
        Ok(())
    }

    // ========================================
    // Items and cash
    // ========================================

    pub fn create_item(&self, room: &Room, name: &str) -> Result<Arc<Item>> {
        let item = self.world.create_item(name)?;
        room.add_item(item.id())?;
        self.room_updated(room);
        Ok(item)
    }

    /// Destroy the item called `name` lying in `room`; `false` if there is none
    pub fn destroy_item(&self, room: &Room, name: &str) -> Result<bool> {
        let found = self
            .world
            .items(&room.item_ids())
            .into_iter()
            .find(|item| item.name().eq_ignore_ascii_case(name));

        let Some(item) = found else {
            return Ok(false);
        };

        room.remove_item(item.id())?;
        self.world.delete_item(item.id())?;
        self.room_updated(room);
        Ok(true)
    }

    pub fn give_cash(&self, character: &Character, amount: i64) -> Result<()> {
        character.add_cash(amount)
    }
}
