//! Core types, coordinates, and math for the Terravox engine.
//!
//! This crate provides the foundational pieces shared by every other crate:
//! - Block and direction types
//! - Coordinate systems (world cells, chunk corners, zones, regions)
//! - Culling math (AABB, frustum)
//! - Common error types

pub mod coords;
pub mod error;
pub mod math;
pub mod types;

pub use coords::{ChunkPos, ZonePos};
pub use error::{Error, Result};
pub use types::{BlockType, Direction};

/// Engine-wide constants
pub mod constants {
    /// Chunk extent along X in blocks
    pub const CHUNK_X: usize = 16;
    /// Chunk extent along Y in blocks
    pub const CHUNK_Y: usize = 256;
    /// Chunk extent along Z in blocks
    pub const CHUNK_Z: usize = 16;
    /// Total blocks in a chunk (16 * 256 * 16)
    pub const CHUNK_VOLUME: usize = CHUNK_X * CHUNK_Y * CHUNK_Z;
    /// Zone extent in world cells (4 x 4 chunks)
    pub const ZONE_SIZE: i32 = 64;
    /// Chunks per zone edge
    pub const ZONE_CHUNKS: i32 = 4;
    /// Zones per region edge (filesystem grouping only)
    pub const REGION_ZONES: i32 = 4;
    /// Coarsest level of detail
    pub const MAX_LOD: u8 = 2;
}
