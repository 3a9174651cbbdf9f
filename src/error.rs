/// Comprehensive error types for mudhost
///
/// This module provides typed error handling throughout the server,
/// eliminating the use of generic String errors and unwrap() calls.

use crate::core::entity::{EntityId, EntityKind};
use thiserror::Error;

/// Main error type for mudhost operations
#[derive(Error, Debug)]
pub enum MudError {
    // ========================================
    // Persistence Errors
    // ========================================

    #[error("Failed to commit {kind} {id}: {source}")]
    Storage {
        kind: EntityKind,
        id: EntityId,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open store at {path}: {source}")]
    StoreOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========================================
    // Network Errors
    // ========================================

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed by remote host")]
    ConnectionClosed,

    #[error("Input line too long: more than {max} bytes")]
    LineTooLong {
        max: usize,
    },

    #[error("Failed to bind listener on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ========================================
    // Session Errors
    // ========================================

    #[error("Session input channel closed")]
    SessionClosed,

    #[error("Input reader failed: {0}")]
    ReaderFailed(String),

    // ========================================
    // World Errors
    // ========================================

    #[error("{kind} {id} not found")]
    EntityNotFound {
        kind: EntityKind,
        id: EntityId,
    },

    #[error("You can't go that way")]
    NoExit,

    #[error("Room is not empty")]
    RoomOccupied,

    // ========================================
    // Validation Errors
    // ========================================

    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        name: String,
        reason: String,
    },

    #[error("Invalid input for field '{field}': {reason}")]
    ValidationError {
        field: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MudError {
    /// Whether this error ends the session rather than being shown to the player
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MudError::Io(_)
                | MudError::ConnectionClosed
                | MudError::LineTooLong { .. }
                | MudError::SessionClosed
                | MudError::ReaderFailed(_)
        )
    }
}

/// Result type alias for mudhost operations
pub type Result<T> = std::result::Result<T, MudError>;

// ========================================
// Unit Tests
// ========================================
