//! The per-frame draw driver: LOD assignment, culling, and the three
//! main-thread sweeps (mesh submission, GPU upload, draw passes).

use std::sync::Arc;

use glam::{Vec2, Vec3};
use terravox_core::math::Frustum;
use terravox_core::ChunkPos;

use crate::chunk::Chunk;
use crate::mesh::MeshData;
use crate::pipeline::{submit_mesh, WorkerPool};
use crate::terrain::Terrain;

/// Face culling mode for the two transparent passes; drawing water twice,
/// back faces first, keeps it correct from either side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CullMode {
    Back,
    Front,
}

/// The vertex/index upload sink the engine renders through. Implemented
/// by the GL layer; tests and the headless app record calls instead.
///
/// Only the render thread calls these methods.
pub trait RenderSink {
    /// Upload a chunk's buffers, replacing any previous upload.
    fn upload(&mut self, pos: ChunkPos, mesh: &MeshData);
    /// Release the GPU buffers of a chunk that left the view range.
    fn release(&mut self, pos: ChunkPos);
    /// Draw the opaque pass over the given chunks.
    fn draw_opaque(&mut self, chunks: &[ChunkPos]);
    /// Draw one transparent pass with the given cull mode.
    fn draw_transparent(&mut self, chunks: &[ChunkPos], cull: CullMode);
}

/// Distance band for full detail.
const LOD1_DISTANCE: f32 = 64.0;
/// Distance band for medium detail.
const LOD2_DISTANCE: f32 = 128.0;
/// Chunks beyond this release their GPU buffers.
const MAX_VIEW_DISTANCE: f32 = 256.0;

fn lod_for_distance(distance: f32) -> u8 {
    if distance > LOD2_DISTANCE {
        2
    } else if distance > LOD1_DISTANCE {
        1
    } else {
        0
    }
}

impl Terrain {
    /// Per-frame sweep: admit chunks by distance and frustum, keep LODs
    /// current, drive meshing, upload ready buffers, and issue the draw
    /// passes.
    pub fn draw(
        &self,
        player_pos: Vec3,
        frustum: &Frustum,
        sink: &mut dyn RenderSink,
        pool: &WorkerPool,
    ) {
        let player_xz = Vec2::new(player_pos.x, player_pos.z);
        let mut admitted: Vec<Arc<Chunk>> = Vec::new();

        for chunk in self.chunks() {
            if !chunk.has_block_data() {
                continue;
            }

            let distance = chunk.center().distance(player_xz);
            if distance >= MAX_VIEW_DISTANCE {
                if chunk.has_gpu_data() {
                    sink.release(chunk.pos());
                    chunk.set_has_gpu_data(false);
                }
                continue;
            }

            if !frustum.contains_aabb(&chunk.aabb()) {
                continue;
            }

            chunk.set_lod(lod_for_distance(distance));
            admitted.push(Arc::clone(chunk));
        }

        // Every admitted LOD settles above before any mesh is built, so a
        // mesher never reads a neighbor level that is about to change
        // within the same frame.
        for chunk in &admitted {
            if chunk.needs_update() && chunk.has_block_data() {
                submit_mesh(pool, Arc::clone(chunk));
            }
        }

        for chunk in &admitted {
            if chunk.has_vbo_data() && !chunk.has_gpu_data() {
                let mesh = chunk.take_mesh();
                sink.upload(chunk.pos(), &mesh);
                chunk.set_has_gpu_data(true);
            }
        }

        let ready: Vec<ChunkPos> = admitted
            .iter()
            .filter(|chunk| chunk.has_gpu_data())
            .map(|chunk| chunk.pos())
            .collect();
        sink.draw_opaque(&ready);
        sink.draw_transparent(&ready, CullMode::Back);
        sink.draw_transparent(&ready, CullMode::Front);
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;
    use hashbrown::HashMap;
    use terravox_core::BlockType;

    use super::*;

    /// Sink that records resident buffers and pass order.
    #[derive(Default)]
    struct TestSink {
        resident: HashMap<i64, usize>,
        uploads: usize,
        releases: usize,
        passes: Vec<(&'static str, usize)>,
    }

    impl RenderSink for TestSink {
        fn upload(&mut self, pos: ChunkPos, mesh: &MeshData) {
            self.resident.insert(pos.key(), mesh.opaque_indices.len());
            self.uploads += 1;
        }

        fn release(&mut self, pos: ChunkPos) {
            self.resident.remove(&pos.key());
            self.releases += 1;
        }

        fn draw_opaque(&mut self, chunks: &[ChunkPos]) {
            self.passes.push(("opaque", chunks.len()));
        }

        fn draw_transparent(&mut self, chunks: &[ChunkPos], cull: CullMode) {
            let name = match cull {
                CullMode::Back => "transparent-back",
                CullMode::Front => "transparent-front",
            };
            self.passes.push((name, chunks.len()));
        }
    }

    /// A frustum that sees everything near the origin.
    fn wide_open_frustum() -> Frustum {
        let proj = Mat4::perspective_rh_gl(120_f32.to_radians(), 1.0, 0.1, 2000.0);
        let view = Mat4::look_at_rh(
            Vec3::new(8.0, 400.0, 8.0),
            Vec3::new(8.0, 0.0, 8.0),
            Vec3::X,
        );
        Frustum::from_view_projection(proj * view)
    }

    fn ready_terrain(tag: &str) -> (Terrain, WorkerPool) {
        let dir = std::env::temp_dir().join(format!(
            "terravox-view-{tag}-{}",
            std::process::id()
        ));
        let mut terrain = Terrain::new(dir, 1);
        let pool = WorkerPool::new(2);
        terrain.update_zones(Vec3::new(8.0, 150.0, 8.0), &pool);
        pool.wait_idle();
        (terrain, pool)
    }

    #[test]
    fn full_pipeline_reaches_the_draw_pass() {
        let (terrain, pool) = ready_terrain("pipeline");
        let frustum = wide_open_frustum();
        let mut sink = TestSink::default();
        let player = Vec3::new(8.0, 150.0, 8.0);

        // First frame submits mesh tasks; drain them, then a second frame
        // uploads and draws.
        terrain.draw(player, &frustum, &mut sink, &pool);
        pool.wait_idle();
        terrain.draw(player, &frustum, &mut sink, &pool);
        pool.wait_idle();

        assert!(sink.uploads > 0, "no chunk reached the upload sweep");
        let (name, drawn) = *sink.passes.last().expect("draw passes recorded");
        assert_eq!(name, "transparent-front");
        assert!(drawn > 0, "no chunk reached the draw pass");

        // Passes run opaque, then transparent back, then front.
        let tail: Vec<&str> = sink.passes.iter().rev().take(3).map(|p| p.0).collect();
        assert_eq!(tail, vec!["transparent-front", "transparent-back", "opaque"]);
    }

    #[test]
    fn drawn_chunks_satisfy_block_and_gpu_flags() {
        let (terrain, pool) = ready_terrain("flags");
        let frustum = wide_open_frustum();
        let mut sink = TestSink::default();
        let player = Vec3::new(8.0, 150.0, 8.0);

        terrain.draw(player, &frustum, &mut sink, &pool);
        pool.wait_idle();
        terrain.draw(player, &frustum, &mut sink, &pool);

        for chunk in terrain.chunks() {
            if sink.resident.contains_key(&chunk.pos().key()) {
                assert!(chunk.has_block_data() && chunk.has_gpu_data());
            }
        }
    }

    #[test]
    fn distance_bands_assign_lods() {
        let (terrain, pool) = ready_terrain("lods");
        let frustum = wide_open_frustum();
        let mut sink = TestSink::default();
        let player = Vec3::new(8.0, 150.0, 8.0);

        terrain.draw(player, &frustum, &mut sink, &pool);

        for chunk in terrain.chunks() {
            let distance = chunk.center().distance(Vec2::new(8.0, 8.0));
            if distance < 64.0 {
                assert_eq!(chunk.lod(), 0, "near chunk at {distance}");
            } else if distance > 128.0 && distance < 256.0 {
                assert_eq!(chunk.lod(), 2, "far chunk at {distance}");
            }
        }
    }

    #[test]
    fn distant_chunks_release_gpu_buffers() {
        let (terrain, pool) = ready_terrain("release");
        let frustum = wide_open_frustum();
        let mut sink = TestSink::default();
        let player = Vec3::new(8.0, 150.0, 8.0);

        terrain.draw(player, &frustum, &mut sink, &pool);
        pool.wait_idle();
        terrain.draw(player, &frustum, &mut sink, &pool);
        assert!(sink.uploads > 0);

        // Teleport far away: resident chunks beyond 256 units release.
        let far = Vec3::new(10_000.0, 150.0, 10_000.0);
        terrain.draw(far, &frustum, &mut sink, &pool);
        assert!(sink.releases > 0);
        assert!(sink.resident.is_empty());
        for chunk in terrain.chunks() {
            assert!(!chunk.has_gpu_data());
        }
    }

    #[test]
    fn lod_for_distance_bands() {
        assert_eq!(lod_for_distance(0.0), 0);
        assert_eq!(lod_for_distance(64.0), 0);
        assert_eq!(lod_for_distance(64.1), 1);
        assert_eq!(lod_for_distance(128.0), 1);
        assert_eq!(lod_for_distance(128.1), 2);
    }
}
