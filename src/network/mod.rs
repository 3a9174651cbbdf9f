/// Network layer: TCP listener, telnet line I/O, and ANSI colors
///
/// This module handles all communication with player clients:
/// - TCP listener accepting connections
/// - Line and keystroke input with telnet command filtering
/// - CR/LF output with prompt redraw support
/// - Color-mode dependent escape sequences

pub mod color;
pub mod line;
pub mod output;
pub mod server;

// Re-export commonly used types
pub use color::{colorize, Color, ColorMode};
pub use line::LineReader;
pub use output::LineWriter;
pub use server::TcpServer;
