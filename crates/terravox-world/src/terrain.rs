//! The terrain grid: the chunk map, zone promotion, and global block
//! access.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use hashbrown::{HashMap, HashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use terravox_core::constants::{CHUNK_Y, ZONE_SIZE};
use terravox_core::{BlockType, ChunkPos, Direction, Error, Result, ZonePos};
use terravox_worldgen::{Generator, River, WorldSeed};
use tracing::info;

use crate::chunk::Chunk;
use crate::persist;
use crate::pipeline::{submit_generate, submit_load, submit_save, WorkerPool};

/// One fresh zone in this many seeds a new river.
const RIVER_CHANCE: u32 = 10;
/// Zones this far around the player's zone are kept promoted.
const ZONE_WINDOW: i32 = 1;

/// Process-global world state.
///
/// The chunk map and zone set are mutated only on the main thread; workers
/// receive `Arc<Chunk>` handles and an `Arc` snapshot of the river list,
/// so appending a river never races a reader.
pub struct Terrain {
    chunks: HashMap<i64, Arc<Chunk>>,
    generated_zones: HashSet<i64>,
    rivers: Arc<Vec<River>>,
    generator: Arc<Generator>,
    world_dir: PathBuf,
    river_rng: ChaCha8Rng,
}

impl Terrain {
    /// Open a world rooted at `world_dir`. Every world starts with the
    /// canonical river near spawn.
    pub fn new(world_dir: impl Into<PathBuf>, seed: WorldSeed) -> Self {
        let rivers = vec![River::standard(3, 22.5, 9.0, (48.0, 48.0))];
        Self {
            chunks: HashMap::new(),
            generated_zones: HashSet::new(),
            rivers: Arc::new(rivers),
            generator: Arc::new(Generator::new(seed)),
            world_dir: world_dir.into(),
            river_rng: ChaCha8Rng::seed_from_u64(u64::from(seed).wrapping_mul(0x9e37_79b9)),
        }
    }

    pub fn world_dir(&self) -> &Path {
        &self.world_dir
    }

    pub fn generator(&self) -> &Arc<Generator> {
        &self.generator
    }

    pub fn rivers(&self) -> &[River] {
        &self.rivers
    }

    /// Replace the river list with one restored from world metadata.
    pub fn restore_rivers(&mut self, rivers: Vec<River>) {
        if !rivers.is_empty() {
            self.rivers = Arc::new(rivers);
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn zone_count(&self) -> usize {
        self.generated_zones.len()
    }

    pub(crate) fn chunks(&self) -> impl Iterator<Item = &Arc<Chunk>> {
        self.chunks.values()
    }

    /// Whether a chunk covers the given world cell.
    pub fn has_chunk_at(&self, x: i32, z: i32) -> bool {
        self.chunks.contains_key(&ChunkPos::containing(x, z).key())
    }

    /// The chunk covering the given world cell, if present.
    pub fn chunk_at(&self, x: i32, z: i32) -> Option<&Arc<Chunk>> {
        self.chunks.get(&ChunkPos::containing(x, z).key())
    }

    /// Block at a world coordinate.
    ///
    /// Fails with [`Error::OutOfRange`] when no chunk covers the column.
    /// A chunk still waiting on its generation worker reads as stone so
    /// callers cannot fall through unloaded ground.
    pub fn global_block_at(&self, x: i32, y: i32, z: i32) -> Result<BlockType> {
        let chunk = self.chunk_at(x, z).ok_or(Error::OutOfRange { x, y, z })?;
        if !(0..CHUNK_Y as i32).contains(&y) {
            return Ok(BlockType::Empty);
        }
        if !chunk.has_block_data() {
            return Ok(BlockType::Stone);
        }
        let (lx, lz) = chunk.pos().local(x, z);
        Ok(chunk.local_block_at(lx, y as usize, lz))
    }

    /// Write a block at a world coordinate. Ignored while the chunk is
    /// still generating; out-of-range Y is ignored rather than fatal.
    pub fn set_global_block_at(&self, x: i32, y: i32, z: i32, block: BlockType) -> Result<()> {
        let chunk = self.chunk_at(x, z).ok_or(Error::OutOfRange { x, y, z })?;
        if (0..CHUNK_Y as i32).contains(&y) && chunk.has_block_data() {
            let (lx, lz) = chunk.pos().local(x, z);
            chunk.set_local_block_at(lx, y as usize, lz, block);
        }
        Ok(())
    }

    /// Create a chunk at the given corner and link any existing neighbors
    /// symmetrically.
    pub fn instantiate_chunk_at(&mut self, pos: ChunkPos) -> Arc<Chunk> {
        let chunk = Chunk::new(pos);
        self.chunks.insert(pos.key(), Arc::clone(&chunk));
        for dir in Direction::HORIZONTAL {
            if let Some(neighbor) = self.chunks.get(&pos.neighbor(dir).key()) {
                chunk.link_neighbor(neighbor, dir);
            }
        }
        chunk
    }

    /// Promote every zone in the window around the player: zones with a
    /// save file are loaded, the rest are generated (with a chance of a
    /// new river).
    pub fn update_zones(&mut self, player_pos: Vec3, pool: &WorkerPool) {
        let center = ZonePos::containing(player_pos.x, player_pos.z);
        for zx in (center.x - ZONE_WINDOW)..=(center.x + ZONE_WINDOW) {
            for zz in (center.z - ZONE_WINDOW)..=(center.z + ZONE_WINDOW) {
                let zone = ZonePos::new(zx, zz);
                if self.generated_zones.insert(zone.key()) {
                    self.promote_zone(zone, pool);
                }
            }
        }
    }

    fn promote_zone(&mut self, zone: ZonePos, pool: &WorkerPool) {
        if persist::zone_file_exists(&self.world_dir, zone) {
            // Chunks enter the map here, on the main thread; the worker
            // only reads the file and fills block data.
            let mut chunks = Vec::with_capacity(16);
            for pos in zone.chunks() {
                let chunk = match self.chunks.get(&pos.key()).cloned() {
                    Some(existing) => existing,
                    None => self.instantiate_chunk_at(pos),
                };
                chunks.push(chunk);
            }
            submit_load(
                pool,
                self.world_dir.clone(),
                zone,
                chunks,
                Arc::clone(&self.generator),
                Arc::clone(&self.rivers),
            );
            return;
        }

        if self.river_rng.gen_range(0..RIVER_CHANCE) == 0 {
            self.seed_river(zone);
        }

        for pos in zone.chunks() {
            if !self.chunks.contains_key(&pos.key()) {
                let chunk = self.instantiate_chunk_at(pos);
                submit_generate(
                    pool,
                    chunk,
                    Arc::clone(&self.generator),
                    Arc::clone(&self.rivers),
                );
            }
        }
    }

    /// Append a river somewhere in the zone's interior; later tasks see
    /// the new list, in-flight ones keep their snapshot.
    fn seed_river(&mut self, zone: ZonePos) {
        let (min_x, min_z) = zone.min_world();
        let start_x = f64::from(self.river_rng.gen_range(min_x + 1..min_x + ZONE_SIZE - 1));
        let start_z = f64::from(self.river_rng.gen_range(min_z + 1..min_z + ZONE_SIZE - 1));
        let iterations = self.river_rng.gen_range(2..=4);
        let angle = f64::from(self.river_rng.gen_range(20..=30));
        let step = f64::from(self.river_rng.gen_range(5..=15));

        info!(
            zone_x = zone.x,
            zone_z = zone.z,
            start_x,
            start_z,
            "seeding river"
        );
        let mut rivers = (*self.rivers).clone();
        rivers.push(River::standard(iterations, angle, step, (start_x, start_z)));
        self.rivers = Arc::new(rivers);
    }

    /// Remove a zone's chunks and its promotion key; the symmetric inverse
    /// of promotion. The streaming baseline keeps zones resident, so this
    /// is only called on explicit unloads.
    pub fn unload_zone(&mut self, zone: ZonePos) {
        for pos in zone.chunks() {
            self.chunks.remove(&pos.key());
        }
        self.generated_zones.remove(&zone.key());
    }

    /// Queue a save task for every promoted zone. Callers halt the tick
    /// timer and drain the pool around the snapshot.
    pub fn save_all(&self, pool: &WorkerPool) {
        for &key in &self.generated_zones {
            let zone = ZonePos::from_key(key);
            let chunks: Vec<Arc<Chunk>> = zone
                .chunks()
                .filter_map(|pos| self.chunks.get(&pos.key()).cloned())
                .collect();
            submit_save(
                pool,
                self.world_dir.clone(),
                zone,
                chunks,
                Arc::clone(&self.generator),
                Arc::clone(&self.rivers),
            );
        }
        info!(zones = self.generated_zones.len(), "queued zone saves");
    }
}
