/// Concrete world entities
///
/// Each type is an `Entity<...Data>`; the accessors and mutators below follow
/// the entity rules: read lock for copies, write lock plus commit for changes.

pub mod user;
pub mod character;
pub mod zone;
pub mod area;
pub mod room;
pub mod item;

// Re-export commonly used types
pub use user::{User, UserData};
pub use character::{Character, CharacterData};
pub use zone::{Zone, ZoneData};
pub use area::{Area, AreaData};
pub use room::{Coordinate, Direction, Room, RoomData};
pub use item::{Item, ItemData};
