/// Player sessions
///
/// One session per connected player: a reader task doing throttled network
/// reads, and the dispatcher multiplexing that input with the player's
/// event mailbox while running commands, menus, and editors.

pub mod connection;
pub mod dispatcher;
pub mod throttle;
pub mod menu;
pub mod commands;
pub mod render;

// Re-export commonly used types
pub use connection::{handle_connection, serve};
pub use dispatcher::{InputMode, Session};
pub use menu::{EditorState, Menu, NpcState};
pub use throttle::Throttle;
