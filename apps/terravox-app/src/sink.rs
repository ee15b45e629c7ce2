//! Headless render sink: records what a GL backend would upload and draw.

use hashbrown::HashMap;
use terravox_core::ChunkPos;
use terravox_world::{CullMode, MeshData, RenderSink};

/// Per-chunk buffer sizes resident "on the GPU".
#[derive(Clone, Copy, Default)]
struct Resident {
    opaque_indices: usize,
    transparent_indices: usize,
}

/// Stand-in for the GPU while the engine runs without a window. Tracks
/// resident buffers and draw statistics so a run can report what it did.
#[derive(Default)]
pub struct RecordingSink {
    resident: HashMap<i64, Resident>,
    pub uploads: u64,
    pub releases: u64,
    pub draw_calls: u64,
    pub triangles: u64,
}

impl RecordingSink {
    pub fn resident_chunks(&self) -> usize {
        self.resident.len()
    }
}

impl RenderSink for RecordingSink {
    fn upload(&mut self, pos: ChunkPos, mesh: &MeshData) {
        self.resident.insert(
            pos.key(),
            Resident {
                opaque_indices: mesh.opaque_indices.len(),
                transparent_indices: mesh.transparent_indices.len(),
            },
        );
        self.uploads += 1;
    }

    fn release(&mut self, pos: ChunkPos) {
        if self.resident.remove(&pos.key()).is_some() {
            self.releases += 1;
        }
    }

    fn draw_opaque(&mut self, chunks: &[ChunkPos]) {
        self.draw_calls += 1;
        for pos in chunks {
            if let Some(resident) = self.resident.get(&pos.key()) {
                self.triangles += resident.opaque_indices as u64 / 3;
            }
        }
    }

    fn draw_transparent(&mut self, chunks: &[ChunkPos], _cull: CullMode) {
        self.draw_calls += 1;
        for pos in chunks {
            if let Some(resident) = self.resident.get(&pos.key()) {
                self.triangles += resident.transparent_indices as u64 / 3;
            }
        }
    }
}
