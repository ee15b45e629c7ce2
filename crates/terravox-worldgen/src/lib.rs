//! Deterministic terrain generation: noise, biomes, rivers, and the block
//! generator they feed.
//!
//! Everything here is a pure function of the world seed and the input
//! coordinates, which is what lets persistence store only diffs.

pub mod generator;
pub mod noise;
pub mod rivers;

pub use generator::Generator;
pub use noise::{Biome, BiomeNoise};
pub use rivers::River;

/// World seed for procedural generation.
pub type WorldSeed = u32;
