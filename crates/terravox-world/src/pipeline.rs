//! The shared worker pool and the three task kinds it runs: block-type
//! generation, meshing, and zone save/load.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;
use rayon::ThreadPoolBuilder;
use terravox_core::ZonePos;
use terravox_worldgen::{Generator, River};
use tracing::error;

use crate::chunk::Chunk;
use crate::mesh::build_chunk_mesh;
use crate::persist;

/// Bounded pool shared by every worker kind.
///
/// In-flight tasks are tracked so the engine can drain the pool before a
/// persistence snapshot.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    in_flight: Arc<AtomicUsize>,
    epoch: Mutex<WaitGroup>,
}

impl WorkerPool {
    /// Build a pool with `threads` workers; 0 picks the CPU count.
    pub fn new(threads: usize) -> Self {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|i| format!("terravox-worker-{i}"));
        if threads > 0 {
            builder = builder.num_threads(threads);
        }
        Self {
            pool: builder
                .build()
                .expect("worker pool construction cannot fail with these settings"),
            in_flight: Arc::new(AtomicUsize::new(0)),
            epoch: Mutex::new(WaitGroup::new()),
        }
    }

    /// Run a task on the pool. Panics are caught and logged; a panicking
    /// task never takes the pool down.
    pub fn spawn<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.epoch.lock().clone();
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);
        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            if let Err(payload) = result {
                let reason = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("non-string panic payload");
                error!(reason, "worker task panicked");
            }
            drop(guard);
        });
    }

    /// Block until every task spawned so far has finished. Tasks spawned
    /// while waiting belong to the next epoch and are not waited on.
    pub fn wait_idle(&self) {
        let group = {
            let mut epoch = self.epoch.lock();
            std::mem::replace(&mut *epoch, WaitGroup::new())
        };
        group.wait();
    }

    /// Number of tasks currently queued or running.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Queue terrain generation for a freshly instantiated chunk.
///
/// Never submitted twice for the same chunk: `has_block_data` stays false
/// until the one outstanding task publishes it, and submission only
/// happens at instantiation.
pub fn submit_generate(
    pool: &WorkerPool,
    chunk: Arc<Chunk>,
    generator: Arc<Generator>,
    rivers: Arc<Vec<River>>,
) {
    pool.spawn(move || {
        chunk.generate(&generator, &rivers);
        chunk.set_has_block_data(true);
        chunk.set_needs_update(true);
    });
}

/// RAII mesh claim: restores the dirty flag if the task unwinds before
/// finishing, so a later cycle retries the chunk.
struct MeshClaim<'a> {
    chunk: &'a Chunk,
    finished: bool,
}

impl<'a> MeshClaim<'a> {
    fn begin(chunk: &'a Chunk) -> Self {
        chunk.take_needs_update();
        Self {
            chunk,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for MeshClaim<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.chunk.set_needs_update(true);
        }
        self.chunk.release_mesh_claim();
    }
}

/// Queue a remesh for a dirty chunk. The in-flight claim keeps two
/// meshers off the same chunk; losing the claim means one is already
/// running and will pick up the latest blocks or leave the chunk dirty.
pub fn submit_mesh(pool: &WorkerPool, chunk: Arc<Chunk>) {
    if !chunk.try_claim_mesh() {
        return;
    }
    pool.spawn(move || {
        let claim = MeshClaim::begin(&chunk);
        if !chunk.has_block_data() {
            return;
        }
        let mesh = build_chunk_mesh(&chunk);
        chunk.store_mesh(mesh);
        claim.finish();
    });
}

/// Queue a zone save. Failures are logged and the engine continues.
pub fn submit_save(
    pool: &WorkerPool,
    world_dir: PathBuf,
    zone: ZonePos,
    chunks: Vec<Arc<Chunk>>,
    generator: Arc<Generator>,
    rivers: Arc<Vec<River>>,
) {
    pool.spawn(move || {
        if let Err(err) = persist::save_zone(&world_dir, zone, &chunks, &generator, &rivers) {
            error!(zone_x = zone.x, zone_z = zone.z, %err, "zone save failed");
        }
    });
}

/// Queue a zone load into chunks the main thread already put in the map.
pub fn submit_load(
    pool: &WorkerPool,
    world_dir: PathBuf,
    zone: ZonePos,
    chunks: Vec<Arc<Chunk>>,
    generator: Arc<Generator>,
    rivers: Arc<Vec<River>>,
) {
    pool.spawn(move || {
        if let Err(err) = persist::load_zone(&world_dir, zone, &chunks, &generator, &rivers) {
            error!(zone_x = zone.x, zone_z = zone.z, %err, "zone load failed");
        }
    });
}
