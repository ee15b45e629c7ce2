//! Block-type generation: noise, biomes, and rivers composed into the
//! base world.

use terravox_core::constants::{CHUNK_VOLUME, CHUNK_X, CHUNK_Y, CHUNK_Z};
use terravox_core::coords::block_index;
use terravox_core::{BlockType, ChunkPos};

use crate::noise::{Biome, BiomeNoise};
use crate::rivers::River;
use crate::WorldSeed;

/// Y level the open sea fills up to.
const SEA_LEVEL: i32 = 138;
/// Rivers only carve terrain whose surface stands above this height.
const RIVER_CUTOFF: i32 = 140;
/// Depth of the carved river channel below the cutoff.
const RIVER_DEPTH: i32 = 4;
/// Cave band, lower bound inclusive.
const CAVE_MIN_Y: i32 = 40;
/// Cave band, upper bound exclusive.
const CAVE_MAX_Y: i32 = 80;
/// Carved cells below this fill with lava instead of air.
const LAVA_CEILING: i32 = CAVE_MIN_Y + 5;
/// Snow caps mountains above this height.
const SNOW_LINE: i32 = 200;

/// Deterministic terrain generator.
///
/// For a fixed seed, [`Generator::block_at`] is a pure function of its
/// inputs; persisted zone files store only diffs against it.
pub struct Generator {
    noise: BiomeNoise,
}

impl Generator {
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            noise: BiomeNoise::new(seed),
        }
    }

    pub fn seed(&self) -> WorldSeed {
        self.noise.seed()
    }

    /// Surface height of the column at (x, z).
    pub fn height_at(&self, x: i32, z: i32) -> u8 {
        self.noise.height_at(x, z)
    }

    /// Biome of the column at (x, z).
    pub fn biome_at(&self, x: i32, z: i32) -> Biome {
        self.noise.biome_at(x, z)
    }

    /// Base block at a world cell, given the column's precomputed height
    /// and biome.
    pub fn block_at(
        &self,
        x: i32,
        y: i32,
        z: i32,
        height: i32,
        biome: Biome,
        rivers: &[River],
    ) -> BlockType {
        if !(0..CHUNK_Y as i32).contains(&y) {
            return BlockType::Empty;
        }
        if y == 0 {
            return BlockType::Bedrock;
        }

        // Caves carve everything in their band, riverbeds included.
        if (CAVE_MIN_Y..CAVE_MAX_Y).contains(&y) {
            let density =
                self.noise
                    .perlin3d(x as f32 * 0.1, y as f32 * 0.1, z as f32 * 0.1);
            if density < 0.0 {
                return if y < LAVA_CEILING {
                    BlockType::Lava
                } else {
                    BlockType::Empty
                };
            }
        }

        if height > RIVER_CUTOFF && rivers.iter().any(|river| river.contains(x, z)) {
            if y >= height {
                return BlockType::Empty;
            }
            if y > RIVER_CUTOFF - RIVER_DEPTH {
                return BlockType::Water;
            }
            if y == RIVER_CUTOFF - RIVER_DEPTH - 1 {
                return BlockType::Dirt;
            }
        }

        if y > height {
            // The sea fills the open column between the cave ceiling and
            // sea level wherever the ground sits below it.
            if height < SEA_LEVEL && y <= SEA_LEVEL && y >= (height + 1).max(CAVE_MAX_Y + 1) {
                BlockType::Water
            } else {
                BlockType::Empty
            }
        } else if y == height {
            match biome {
                Biome::Grassland => BlockType::Grass,
                Biome::Mountain if height > SNOW_LINE => BlockType::Snow,
                Biome::Mountain => BlockType::Stone,
            }
        } else {
            match biome {
                Biome::Grassland => BlockType::Dirt,
                Biome::Mountain => BlockType::Stone,
            }
        }
    }

    /// Fill a chunk-sized block array with generated terrain. Height and
    /// biome are evaluated once per column.
    pub fn generate_into(&self, blocks: &mut [BlockType], origin: ChunkPos, rivers: &[River]) {
        debug_assert_eq!(blocks.len(), CHUNK_VOLUME);
        for lx in 0..CHUNK_X {
            let x = origin.x + lx as i32;
            for lz in 0..CHUNK_Z {
                let z = origin.z + lz as i32;
                let height = i32::from(self.height_at(x, z));
                let biome = self.biome_at(x, z);
                for y in 0..CHUNK_Y {
                    blocks[block_index(lx, y, lz)] =
                        self.block_at(x, y as i32, z, height, biome, rivers);
                }
            }
        }
    }
}
