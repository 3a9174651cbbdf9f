/// Rooms, their grid coordinates, and directional exits

use crate::core::entity::{Entity, EntityData, EntityId, EntityKind};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

const DEFAULT_TITLE: &str = "The Void";
const DEFAULT_DESCRIPTION: &str = "You are floating in the blackness of space. Complete darkness surrounds you in all directions.";

/// One of the ten exit directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::Up,
        Direction::Down,
    ];

    /// Accepts both the short (`ne`) and long (`northeast`) forms
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.to_lowercase();
        Direction::ALL
            .into_iter()
            .find(|d| d.short() == input || d.name() == input)
    }

    pub fn short(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::NorthEast => "ne",
            Direction::East => "e",
            Direction::SouthEast => "se",
            Direction::South => "s",
            Direction::SouthWest => "sw",
            Direction::West => "w",
            Direction::NorthWest => "nw",
            Direction::Up => "u",
            Direction::Down => "d",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::NorthEast => "northeast",
            Direction::East => "east",
            Direction::SouthEast => "southeast",
            Direction::South => "south",
            Direction::SouthWest => "southwest",
            Direction::West => "west",
            Direction::NorthWest => "northwest",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Grid step; north is towards smaller `y`, up towards smaller `z`
    fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, -1, 0),
            Direction::NorthEast => (1, -1, 0),
            Direction::East => (1, 0, 0),
            Direction::SouthEast => (1, 1, 0),
            Direction::South => (0, 1, 0),
            Direction::SouthWest => (-1, 1, 0),
            Direction::West => (-1, 0, 0),
            Direction::NorthWest => (-1, -1, 0),
            Direction::Up => (0, 0, -1),
            Direction::Down => (0, 0, 1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// One step in `direction`; `None` past the edge of the grid
    pub fn next(self, direction: Direction) -> Option<Self> {
        let (dx, dy, dz) = direction.offset();
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        ))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomData {
    pub zone_id: EntityId,
    pub location: Coordinate,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub exits: BTreeSet<Direction>,
    #[serde(default)]
    pub item_ids: Vec<EntityId>,
}

impl RoomData {
    pub fn new(zone_id: EntityId, location: Coordinate) -> Self {
        Self {
            zone_id,
            location,
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            exits: BTreeSet::new(),
            item_ids: Vec::new(),
        }
    }
}

impl EntityData for RoomData {
    const KIND: EntityKind = EntityKind::Room;
}

pub type Room = Entity<RoomData>;

impl Entity<RoomData> {
    pub fn title(&self) -> String {
        self.read(|r| r.title.clone())
    }

    pub fn set_title(&self, title: impl Into<String>) -> Result<()> {
        self.update(title.into(), |r| &mut r.title)?;
        Ok(())
    }

    pub fn description(&self) -> String {
        self.read(|r| r.description.clone())
    }

    pub fn set_description(&self, description: impl Into<String>) -> Result<()> {
        self.update(description.into(), |r| &mut r.description)?;
        Ok(())
    }

    pub fn zone_id(&self) -> EntityId {
        self.read(|r| r.zone_id)
    }

    pub fn location(&self) -> Coordinate {
        self.read(|r| r.location)
    }

    /// Coordinate one step away in `direction`
    pub fn next_location(&self, direction: Direction) -> Option<Coordinate> {
        self.location().next(direction)
    }

    pub fn has_exit(&self, direction: Direction) -> bool {
        self.read(|r| r.exits.contains(&direction))
    }

    pub fn exits(&self) -> Vec<Direction> {
        self.read(|r| r.exits.iter().copied().collect())
    }

    /// Enable or disable one exit; returns whether anything changed
    pub fn set_exit_enabled(&self, direction: Direction, enabled: bool) -> Result<bool> {
        self.modify(|r| {
            if enabled {
                r.exits.insert(direction)
            } else {
                r.exits.remove(&direction)
            }
        })
    }

    pub fn item_ids(&self) -> Vec<EntityId> {
        self.read(|r| r.item_ids.clone())
    }

    pub fn add_item(&self, item_id: EntityId) -> Result<()> {
        self.modify(|r| {
            if r.item_ids.contains(&item_id) {
                return false;
            }
            r.item_ids.push(item_id);
            true
        })?;
        Ok(())
    }

    pub fn remove_item(&self, item_id: EntityId) -> Result<()> {
        self.modify(|r| {
            let before = r.item_ids.len();
            r.item_ids.retain(|id| *id != item_id);
            r.item_ids.len() != before
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn any_direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_opposite_is_involution(direction in any_direction()) {
            prop_assert_eq!(direction.opposite().opposite(), direction);
            prop_assert_ne!(direction.opposite(), direction);
        }

        #[test]
        fn prop_step_and_back_returns_home(
            direction in any_direction(),
            x in -1000i32..1000,
            y in -1000i32..1000,
            z in -10i32..10,
        ) {
            let start = Coordinate::new(x, y, z);
            let back = start.next(direction).and_then(|step| step.next(direction.opposite()));
            prop_assert_eq!(back, Some(start));
        }
    }

    #[test]
    fn test_step_off_the_grid_is_none() {
        let corner = Coordinate::new(i32::MAX, i32::MIN, 0);

        assert_eq!(corner.next(Direction::East), None);
        assert_eq!(corner.next(Direction::North), None);
        assert_eq!(corner.next(Direction::West), Some(Coordinate::new(i32::MAX - 1, i32::MIN, 0)));
    }

    #[test]
    fn test_parse_direction_forms() {
        assert_eq!(Direction::parse("n"), Some(Direction::North));
        assert_eq!(Direction::parse("NorthEast"), Some(Direction::NorthEast));
        assert_eq!(Direction::parse("d"), Some(Direction::Down));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn test_exit_toggle_commits_only_on_change() {
        let store = Arc::new(MemoryStore::new());
        let room = Room::create(RoomData::new(EntityId::new(), Coordinate::default()), store.clone()).unwrap();

        assert!(room.set_exit_enabled(Direction::East, true).unwrap());
        assert!(!room.set_exit_enabled(Direction::East, true).unwrap());
        assert!(room.has_exit(Direction::East));
        assert_eq!(store.commit_count(), 2);

        assert!(room.set_exit_enabled(Direction::East, false).unwrap());
        assert!(room.exits().is_empty());
    }

    #[test]
    fn test_items_are_not_duplicated() {
        let store = Arc::new(MemoryStore::new());
        let room = Room::create(RoomData::new(EntityId::new(), Coordinate::default()), store).unwrap();
        let item = EntityId::new();

        room.add_item(item).unwrap();
        room.add_item(item).unwrap();
        assert_eq!(room.item_ids(), vec![item]);

        room.remove_item(item).unwrap();
        assert!(room.item_ids().is_empty());
    }
}
