/// World registry: every live entity, indexed by id
///
/// The registry maps are guarded by their own locks, separate from the
/// entity locks. Queries clone the `Arc`s out of a map and release the map
/// lock before reading any entity, so no code path ever holds a registry
/// lock and an entity lock at the same time.

use crate::core::entity::{Entity, EntityData, EntityId, EntityKind};
use crate::core::events::Directory;
use crate::core::store::Store;
use crate::error::{MudError, Result};
use crate::model::{
    Area, AreaData, Character, CharacterData, Coordinate, Item, ItemData, Room, RoomData, User, UserData, Zone,
    ZoneData,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

const DEFAULT_ZONE_NAME: &str = "Default";

/// Id-keyed map of one entity kind
struct Registry<T: EntityData> {
    entries: RwLock<HashMap<EntityId, Arc<Entity<T>>>>,
}

impl<T: EntityData> Registry<T> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Restore every stored record of this kind
    fn load(store: &Arc<dyn Store>) -> Result<Self> {
        let registry = Self::new();

        for record in store.load_all(T::KIND)? {
            match Entity::<T>::restore(&record, store.clone()) {
                Ok(entity) => registry.insert(entity),
                Err(e) => warn!(id = %record.id, kind = %T::KIND, "Skipping unreadable record: {}", e),
            }
        }

        Ok(registry)
    }

    fn insert(&self, entity: Arc<Entity<T>>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity.id(), entity);
    }

    fn get(&self, id: EntityId) -> Option<Arc<Entity<T>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn remove(&self, id: EntityId) -> Option<Arc<Entity<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(&id)
    }

    /// Snapshot of every entity; the map lock is released on return
    fn all(&self) -> Vec<Arc<Entity<T>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Exclusive hold on a character name for one connection
///
/// The name is released when the claim drops.
pub struct NameClaim {
    world: Arc<World>,
    name: String,
}

impl NameClaim {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NameClaim {
    fn drop(&mut self) {
        self.world
            .claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
        debug!(name = %self.name, "Released name");
    }
}

/// Every live entity of the running world
pub struct World {
    store: Arc<dyn Store>,
    /// Lowercased names currently held by a connection
    claims: Mutex<HashSet<String>>,
    users: Registry<UserData>,
    characters: Registry<CharacterData>,
    zones: Registry<ZoneData>,
    areas: Registry<AreaData>,
    rooms: Registry<RoomData>,
    items: Registry<ItemData>,
}

impl World {
    /// Empty world backed by `store`
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            claims: Mutex::new(HashSet::new()),
            users: Registry::new(),
            characters: Registry::new(),
            zones: Registry::new(),
            areas: Registry::new(),
            rooms: Registry::new(),
            items: Registry::new(),
        }
    }

    /// Load every entity from `store`
    ///
    /// Characters left online by an unclean shutdown are marked offline.
    pub fn load(store: Arc<dyn Store>) -> Result<Self> {
        let world = Self {
            users: Registry::load(&store)?,
            characters: Registry::load(&store)?,
            zones: Registry::load(&store)?,
            areas: Registry::load(&store)?,
            rooms: Registry::load(&store)?,
            items: Registry::load(&store)?,
            store,
            claims: Mutex::new(HashSet::new()),
        };

        for character in world.characters.all() {
            character.set_online(false)?;
        }

        info!(
            users = world.users.len(),
            characters = world.characters.len(),
            zones = world.zones.len(),
            rooms = world.rooms.len(),
            items = world.items.len(),
            "World loaded"
        );

        Ok(world)
    }

    /// Reserve a character name; `None` while another connection holds it
    pub fn claim_name(self: &Arc<Self>, name: &str) -> Option<NameClaim> {
        let name = name.to_lowercase();

        if !self
            .claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone())
        {
            return None;
        }

        debug!(name = %name, "Claimed name");
        Some(NameClaim {
            world: self.clone(),
            name,
        })
    }

    // ========================================
    // Users
    // ========================================

    pub fn create_user(&self, name: &str) -> Result<Arc<User>> {
        let user = User::create(
            UserData {
                name: name.to_string(),
                color_mode: Default::default(),
            },
            self.store.clone(),
        )?;
        self.users.insert(user.clone());
        Ok(user)
    }

    pub fn user(&self, id: EntityId) -> Option<Arc<User>> {
        self.users.get(id)
    }

    // ========================================
    // Characters
    // ========================================

    pub fn create_player(&self, name: &str, user: EntityId, room: EntityId) -> Result<Arc<Character>> {
        let character = Character::create(CharacterData::player(name, user, room), self.store.clone())?;
        self.characters.insert(character.clone());
        info!(id = %character.id(), name, "Created player character");
        Ok(character)
    }

    pub fn create_npc(&self, name: &str, room: EntityId) -> Result<Arc<Character>> {
        let npc = Character::create(CharacterData::npc(name, room), self.store.clone())?;
        self.characters.insert(npc.clone());
        info!(id = %npc.id(), name, "Created NPC");
        Ok(npc)
    }

    pub fn character(&self, id: EntityId) -> Option<Arc<Character>> {
        self.characters.get(id)
    }

    /// Case-insensitive exact name lookup
    pub fn character_by_name(&self, name: &str) -> Option<Arc<Character>> {
        self.characters
            .all()
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn online_characters(&self) -> Vec<Arc<Character>> {
        self.characters.all().into_iter().filter(|c| c.is_online()).collect()
    }

    /// Online players in `room`, optionally leaving one out
    pub fn players_in(&self, room: EntityId, except: Option<EntityId>) -> Vec<Arc<Character>> {
        self.characters
            .all()
            .into_iter()
            .filter(|c| !c.is_npc() && c.is_online() && c.room_id() == room && Some(c.id()) != except)
            .collect()
    }

    pub fn npcs_in(&self, room: EntityId) -> Vec<Arc<Character>> {
        self.characters
            .all()
            .into_iter()
            .filter(|c| c.is_npc() && c.room_id() == room)
            .collect()
    }

    pub fn delete_character(&self, id: EntityId) -> Result<()> {
        let character = self.characters.remove(id).ok_or(MudError::EntityNotFound {
            kind: EntityKind::Character,
            id,
        })?;
        character.erase()
    }

    // ========================================
    // Zones and areas
    // ========================================

    pub fn create_zone(&self, name: &str) -> Result<Arc<Zone>> {
        let zone = Zone::create(ZoneData { name: name.to_string() }, self.store.clone())?;
        self.zones.insert(zone.clone());
        info!(id = %zone.id(), name, "Created zone");
        Ok(zone)
    }

    pub fn zone(&self, id: EntityId) -> Option<Arc<Zone>> {
        self.zones.get(id)
    }

    pub fn zone_by_name(&self, name: &str) -> Option<Arc<Zone>> {
        self.zones.all().into_iter().find(|z| z.name().eq_ignore_ascii_case(name))
    }

    /// Every zone, sorted by name
    pub fn zones(&self) -> Vec<Arc<Zone>> {
        let mut zones: Vec<_> = self.zones.all().into_iter().map(|z| (z.name(), z)).collect();
        zones.sort_by(|a, b| a.0.cmp(&b.0));
        zones.into_iter().map(|(_, z)| z).collect()
    }

    pub fn create_area(&self, name: &str, zone: EntityId) -> Result<Arc<Area>> {
        let area = Area::create(
            AreaData {
                name: name.to_string(),
                zone_id: zone,
            },
            self.store.clone(),
        )?;
        self.areas.insert(area.clone());
        Ok(area)
    }

    pub fn areas_in_zone(&self, zone: EntityId) -> Vec<Arc<Area>> {
        self.areas.all().into_iter().filter(|a| a.zone_id() == zone).collect()
    }

    // ========================================
    // Rooms
    // ========================================

    pub fn create_room(&self, zone: EntityId, location: Coordinate) -> Result<Arc<Room>> {
        let room = Room::create(RoomData::new(zone, location), self.store.clone())?;
        self.rooms.insert(room.clone());
        info!(id = %room.id(), %location, "Created room");
        Ok(room)
    }

    pub fn room(&self, id: EntityId) -> Option<Arc<Room>> {
        self.rooms.get(id)
    }

    pub fn room_by_location(&self, location: Coordinate, zone: EntityId) -> Option<Arc<Room>> {
        self.rooms
            .all()
            .into_iter()
            .find(|r| r.zone_id() == zone && r.location() == location)
    }

    pub fn rooms_in_zone(&self, zone: EntityId) -> Vec<Arc<Room>> {
        self.rooms.all().into_iter().filter(|r| r.zone_id() == zone).collect()
    }

    /// Bounding box of a zone's rooms as (min, max) corners
    pub fn zone_corners(&self, zone: EntityId) -> Option<(Coordinate, Coordinate)> {
        let locations: Vec<Coordinate> = self.rooms_in_zone(zone).iter().map(|r| r.location()).collect();
        let first = *locations.first()?;

        Some(locations.iter().fold((first, first), |(min, max), c| {
            (
                Coordinate::new(min.x.min(c.x), min.y.min(c.y), min.z.min(c.z)),
                Coordinate::new(max.x.max(c.x), max.y.max(c.y), max.z.max(c.z)),
            )
        }))
    }

    /// Room where new players appear, creating a default zone on an empty world
    pub fn start_room(&self) -> Result<Arc<Room>> {
        let origin = Coordinate::default();

        let mut zones = self.zones();
        if let Some(room) = zones.iter().find_map(|z| self.room_by_location(origin, z.id())) {
            return Ok(room);
        }
        if let Some(room) = zones.drain(..).find_map(|z| self.rooms_in_zone(z.id()).into_iter().next()) {
            return Ok(room);
        }

        let zone = match self.zone_by_name(DEFAULT_ZONE_NAME) {
            Some(zone) => zone,
            None => self.create_zone(DEFAULT_ZONE_NAME)?,
        };
        self.create_room(zone.id(), origin)
    }

    pub fn delete_room(&self, id: EntityId) -> Result<()> {
        let room = self.rooms.remove(id).ok_or(MudError::EntityNotFound {
            kind: EntityKind::Room,
            id,
        })?;
        room.erase()
    }

    // ========================================
    // Items
    // ========================================

    pub fn create_item(&self, name: &str) -> Result<Arc<Item>> {
        let item = Item::create(ItemData { name: name.to_string() }, self.store.clone())?;
        self.items.insert(item.clone());
        Ok(item)
    }

    pub fn item(&self, id: EntityId) -> Option<Arc<Item>> {
        self.items.get(id)
    }

    /// Items for the given ids, skipping any that no longer exist
    pub fn items(&self, ids: &[EntityId]) -> Vec<Arc<Item>> {
        ids.iter().filter_map(|id| self.items.get(*id)).collect()
    }

    pub fn delete_item(&self, id: EntityId) -> Result<()> {
        let item = self.items.remove(id).ok_or(MudError::EntityNotFound {
            kind: EntityKind::Item,
            id,
        })?;
        item.erase()
    }
}

impl Directory for World {
    fn characters_in_room(&self, room: EntityId) -> Vec<EntityId> {
        self.characters
            .all()
            .into_iter()
            .filter(|c| c.room_id() == room)
            .map(|c| c.id())
            .collect()
    }

    fn characters_in_zone(&self, zone: EntityId) -> Vec<EntityId> {
        let rooms: HashSet<EntityId> = self.rooms_in_zone(zone).iter().map(|r| r.id()).collect();

        self.characters
            .all()
            .into_iter()
            .filter(|c| rooms.contains(&c.room_id()))
            .map(|c| c.id())
            .collect()
    }
}
