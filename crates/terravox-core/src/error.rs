//! Error types for the engine.

use thiserror::Error;

/// Engine-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A global-coordinate query landed outside any loaded chunk.
    #[error("coordinates ({x}, {y}, {z}) have no chunk")]
    OutOfRange { x: i32, y: i32, z: i32 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A zone file could not be parsed.
    #[error("corrupt zone file: {0}")]
    Corrupt(String),

    /// World metadata could not be read or written.
    #[error("world metadata: {0}")]
    Metadata(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
