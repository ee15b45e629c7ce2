//! The fixed-step engine loop: streaming, physics, and the draw sweep.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use glam::Vec3;
use terravox_physics::{InputBundle, Player};
use terravox_world::persist::{self, RiverMeta, WorldMeta};
use terravox_world::{Terrain, WorkerPool};
use tracing::{info, warn};

use crate::sink::RecordingSink;

/// Tick period of the ~60 Hz loop.
const TICK: Duration = Duration::from_millis(16);
/// Spawn point, above the canonical river.
const SPAWN: Vec3 = Vec3::new(48.0, 161.0, 48.0);
/// Default world seed.
const DEFAULT_SEED: u32 = 1;

pub struct Engine {
    terrain: Terrain,
    player: Player,
    pool: WorkerPool,
    sink: RecordingSink,
    input: InputBundle,
}

impl Engine {
    /// Create a fresh world folder with metadata and open it.
    pub fn create(dir: &Path, seed: u32) -> anyhow::Result<Self> {
        persist::write_world_meta(
            dir,
            &WorldMeta {
                seed,
                rivers: Vec::new(),
            },
        )
        .with_context(|| format!("creating world at {}", dir.display()))?;
        info!(seed, dir = %dir.display(), "created world");
        Ok(Self::open(dir, seed, Vec::new()))
    }

    /// Open an existing world, restoring seed and rivers from metadata.
    /// Worlds without readable metadata fall back to the default seed.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let (seed, rivers) = match persist::read_world_meta(dir) {
            Ok(meta) => (meta.seed, meta.rivers),
            Err(err) => {
                warn!(%err, "no readable world metadata; assuming default seed");
                (DEFAULT_SEED, Vec::new())
            }
        };
        info!(seed, rivers = rivers.len(), dir = %dir.display(), "loaded world");
        Ok(Self::open(dir, seed, rivers))
    }

    fn open(dir: &Path, seed: u32, rivers: Vec<RiverMeta>) -> Self {
        let mut terrain = Terrain::new(dir, seed);
        terrain.restore_rivers(rivers.iter().map(RiverMeta::build).collect());
        Self {
            terrain,
            player: Player::new(SPAWN),
            pool: WorkerPool::new(0),
            sink: RecordingSink::default(),
            // Drift forward in fly mode so a headless run streams terrain.
            input: InputBundle {
                fly: true,
                forward: true,
                ..InputBundle::default()
            },
        }
    }

    /// Run the loop for a bounded number of fixed steps.
    pub fn run(&mut self, ticks: u32) -> anyhow::Result<()> {
        let mut last = Instant::now();
        for _ in 0..ticks {
            let now = Instant::now();
            let dt = (now - last).as_secs_f32();
            last = now;

            self.tick(dt);

            let elapsed = last.elapsed();
            if elapsed < TICK {
                thread::sleep(TICK - elapsed);
            }
        }
        info!(
            position = ?self.player.position(),
            chunks = self.terrain.chunk_count(),
            zones = self.terrain.zone_count(),
            uploads = self.sink.uploads,
            draw_calls = self.sink.draw_calls,
            triangles = self.sink.triangles,
            resident = self.sink.resident_chunks(),
            "run complete"
        );
        Ok(())
    }

    fn tick(&mut self, dt: f32) {
        self.terrain.update_zones(self.player.position(), &self.pool);
        if let Err(err) = self.player.tick(dt, &self.input, &self.terrain) {
            // Probing past the loaded window is survivable; the zone
            // update catches up next tick.
            warn!(%err, "player tick skipped");
        }
        let frustum = self.player.camera().frustum();
        self.terrain
            .draw(self.player.position(), &frustum, &mut self.sink, &self.pool);
    }

    /// Ctrl+S semantics: the tick timer is halted (we are between runs),
    /// the pool drains so no zone is mid-mutation, then the snapshot is
    /// queued and drained.
    pub fn save(&mut self) -> anyhow::Result<()> {
        self.pool.wait_idle();
        let rivers: Vec<RiverMeta> = self.terrain.rivers().iter().map(RiverMeta::of).collect();
        persist::write_world_meta(
            self.terrain.world_dir(),
            &WorldMeta {
                seed: self.terrain.generator().seed(),
                rivers,
            },
        )
        .context("writing world metadata")?;
        self.terrain.save_all(&self.pool);
        self.pool.wait_idle();
        info!("world saved");
        Ok(())
    }
}
