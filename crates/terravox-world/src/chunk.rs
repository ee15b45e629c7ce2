//! The chunk store: a 16 x 256 x 16 voxel column with lifecycle flags.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use glam::{Vec2, Vec3};
use parking_lot::{Mutex, RwLock};
use terravox_core::constants::{CHUNK_VOLUME, CHUNK_X, CHUNK_Y, CHUNK_Z, MAX_LOD};
use terravox_core::coords::block_index;
use terravox_core::math::Aabb;
use terravox_core::{BlockType, ChunkPos, Direction};
use terravox_worldgen::{Generator, River};

use crate::mesh::MeshData;

/// A column of the world and the unit of meshing and GPU buffering.
///
/// Block contents sit behind one mutex, the CPU-side mesh behind another;
/// the lifecycle flags are atomics published with release stores so a
/// thread that observes `has_block_data` sees a fully written volume.
/// Neighbor links are weak references in both directions; chunks never own
/// each other.
pub struct Chunk {
    pos: ChunkPos,
    blocks: Mutex<Box<[BlockType]>>,
    mesh: Mutex<MeshData>,
    neighbors: RwLock<[Weak<Chunk>; 4]>,
    lod: AtomicU8,
    has_block_data: AtomicBool,
    needs_update: AtomicBool,
    has_vbo_data: AtomicBool,
    has_gpu_data: AtomicBool,
    mesh_in_flight: AtomicBool,
}

impl Chunk {
    /// Create an empty chunk at the given corner; both coordinates must be
    /// multiples of 16.
    pub fn new(pos: ChunkPos) -> Arc<Self> {
        debug_assert_eq!(pos.x.rem_euclid(CHUNK_X as i32), 0);
        debug_assert_eq!(pos.z.rem_euclid(CHUNK_Z as i32), 0);
        Arc::new(Self {
            pos,
            blocks: Mutex::new(vec![BlockType::Empty; CHUNK_VOLUME].into_boxed_slice()),
            mesh: Mutex::new(MeshData::default()),
            neighbors: RwLock::new([Weak::new(), Weak::new(), Weak::new(), Weak::new()]),
            lod: AtomicU8::new(MAX_LOD),
            has_block_data: AtomicBool::new(false),
            needs_update: AtomicBool::new(true),
            has_vbo_data: AtomicBool::new(false),
            has_gpu_data: AtomicBool::new(false),
            mesh_in_flight: AtomicBool::new(false),
        })
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    /// Center of the chunk footprint on the XZ plane.
    pub fn center(&self) -> Vec2 {
        self.pos.center()
    }

    /// World-space bounds for frustum culling.
    pub fn aabb(&self) -> Aabb {
        let min = Vec3::new(self.pos.x as f32, 0.0, self.pos.z as f32);
        let max = min + Vec3::new(CHUNK_X as f32, CHUNK_Y as f32, CHUNK_Z as f32);
        Aabb::new(min, max)
    }

    // --- block access ---

    /// Read one block in local coordinates.
    pub fn local_block_at(&self, x: usize, y: usize, z: usize) -> BlockType {
        self.blocks.lock()[block_index(x, y, z)]
    }

    /// Write one block in local coordinates and mark the affected meshes
    /// dirty. Writes on a boundary slab also dirty the bordering neighbor
    /// so seam faces stay correct.
    pub fn set_local_block_at(&self, x: usize, y: usize, z: usize, block: BlockType) {
        {
            let mut blocks = self.blocks.lock();
            blocks[block_index(x, y, z)] = block;
        }
        self.set_needs_update(true);

        if x == 0 {
            self.mark_neighbor_dirty(Direction::XNeg);
        }
        if x == CHUNK_X - 1 {
            self.mark_neighbor_dirty(Direction::XPos);
        }
        if z == 0 {
            self.mark_neighbor_dirty(Direction::ZNeg);
        }
        if z == CHUNK_Z - 1 {
            self.mark_neighbor_dirty(Direction::ZPos);
        }
    }

    /// Copy the block volume under the lock. The mesher works from this
    /// single consistent snapshot.
    pub fn snapshot_blocks(&self) -> Box<[BlockType]> {
        self.blocks.lock().clone()
    }

    /// Fill the volume from the generator. Lifecycle flags are untouched;
    /// the submitting worker owns those transitions.
    pub fn generate(&self, generator: &Generator, rivers: &[River]) {
        let mut blocks = self.blocks.lock();
        generator.generate_into(&mut blocks, self.pos, rivers);
    }

    /// Most frequent non-empty block in the region starting at (x, y, z),
    /// clamped to the chunk bounds. Used by neighbors across chunk seams;
    /// callers never hold two block locks at once.
    pub fn dominant_block_in(
        &self,
        x: usize,
        y: usize,
        z: usize,
        size_xz: usize,
        size_y: usize,
    ) -> BlockType {
        let blocks = self.blocks.lock();
        dominant_in(&blocks, x, y, z, size_xz, size_y)
    }

    // --- neighbor links ---

    /// Symmetrically link `other` as this chunk's neighbor along `dir`.
    pub fn link_neighbor(self: &Arc<Self>, other: &Arc<Self>, dir: Direction) {
        let (Some(i), Some(j)) = (dir.horizontal_index(), dir.opposite().horizontal_index())
        else {
            return;
        };
        self.neighbors.write()[i] = Arc::downgrade(other);
        other.neighbors.write()[j] = Arc::downgrade(self);
    }

    /// Upgrade the neighbor link along `dir`, if that chunk still exists.
    pub fn neighbor(&self, dir: Direction) -> Option<Arc<Self>> {
        let i = dir.horizontal_index()?;
        self.neighbors.read()[i].upgrade()
    }

    fn mark_neighbor_dirty(&self, dir: Direction) {
        if let Some(neighbor) = self.neighbor(dir) {
            neighbor.set_needs_update(true);
        }
    }

    // --- level of detail ---

    pub fn lod(&self) -> u8 {
        self.lod.load(Ordering::Acquire)
    }

    /// Change the level of detail. Seam geometry differs between levels,
    /// so a change dirties this chunk and every linked neighbor.
    pub fn set_lod(&self, lod: u8) {
        debug_assert!(lod <= MAX_LOD);
        if self.lod.swap(lod, Ordering::AcqRel) != lod {
            self.set_needs_update(true);
            for dir in Direction::HORIZONTAL {
                self.mark_neighbor_dirty(dir);
            }
        }
    }

    // --- lifecycle flags ---

    pub fn has_block_data(&self) -> bool {
        self.has_block_data.load(Ordering::Acquire)
    }

    /// Publish the block volume; the release store pairs with the acquire
    /// load in [`Chunk::has_block_data`].
    pub fn set_has_block_data(&self, value: bool) {
        self.has_block_data.store(value, Ordering::Release);
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update.load(Ordering::Acquire)
    }

    pub fn set_needs_update(&self, value: bool) {
        self.needs_update.store(value, Ordering::Release);
    }

    pub fn has_vbo_data(&self) -> bool {
        self.has_vbo_data.load(Ordering::Acquire)
    }

    pub fn set_has_vbo_data(&self, value: bool) {
        self.has_vbo_data.store(value, Ordering::Release);
    }

    pub fn has_gpu_data(&self) -> bool {
        self.has_gpu_data.load(Ordering::Acquire)
    }

    pub fn set_has_gpu_data(&self, value: bool) {
        self.has_gpu_data.store(value, Ordering::Release);
    }

    /// Claim the exclusive right to mesh this chunk; the matching release
    /// happens when the mesh task finishes or unwinds.
    pub(crate) fn try_claim_mesh(&self) -> bool {
        self.mesh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_mesh_claim(&self) {
        self.mesh_in_flight.store(false, Ordering::Release);
    }

    /// Atomically consume the dirty flag (the claim step of a mesh pass).
    pub(crate) fn take_needs_update(&self) -> bool {
        self.needs_update.swap(false, Ordering::AcqRel)
    }

    // --- mesh buffers ---

    /// Store a freshly built CPU mesh and mark it ready for upload.
    pub fn store_mesh(&self, mesh: MeshData) {
        *self.mesh.lock() = mesh;
        self.set_has_vbo_data(true);
        self.set_has_gpu_data(false);
    }

    /// Take the CPU mesh for GPU upload, clearing the CPU copy.
    pub fn take_mesh(&self) -> MeshData {
        let mut guard = self.mesh.lock();
        let mesh = std::mem::take(&mut *guard);
        self.set_has_vbo_data(false);
        mesh
    }

    // --- persistence support ---

    /// Blocks whose current value differs from the generator baseline, as
    /// (packed local xz, y, raw type) records.
    pub fn modified_blocks(&self, generator: &Generator, rivers: &[River]) -> Vec<(u8, u8, u8)> {
        let blocks = self.blocks.lock();
        let mut modified = Vec::new();
        for x in 0..CHUNK_X {
            let world_x = self.pos.x + x as i32;
            for z in 0..CHUNK_Z {
                let world_z = self.pos.z + z as i32;
                let height = i32::from(generator.height_at(world_x, world_z));
                let biome = generator.biome_at(world_x, world_z);
                for y in 0..CHUNK_Y {
                    let actual = blocks[block_index(x, y, z)];
                    let baseline =
                        generator.block_at(world_x, y as i32, world_z, height, biome, rivers);
                    if actual != baseline {
                        let xz = ((x as u8) & 0x0f) << 4 | ((z as u8) & 0x0f);
                        modified.push((xz, y as u8, actual.raw()));
                    }
                }
            }
        }
        modified
    }

    /// Reset mesh and GPU lifecycle before reloading block data from disk.
    pub fn reset_for_load(&self) {
        self.set_has_block_data(false);
        self.set_has_vbo_data(false);
        self.set_has_gpu_data(false);
        *self.mesh.lock() = MeshData::default();
    }
}

/// Region vote over a block slice: the most frequent non-empty type wins,
/// ties resolved toward the lowest discriminant.
pub(crate) fn dominant_in(
    blocks: &[BlockType],
    x: usize,
    y: usize,
    z: usize,
    size_xz: usize,
    size_y: usize,
) -> BlockType {
    let mut counts = [0u32; BlockType::COUNT];
    for cz in z..(z + size_xz).min(CHUNK_Z) {
        for cx in x..(x + size_xz).min(CHUNK_X) {
            for cy in y..(y + size_y).min(CHUNK_Y) {
                let block = blocks[block_index(cx, cy, cz)];
                if block != BlockType::Empty {
                    counts[block.raw() as usize] += 1;
                }
            }
        }
    }

    let mut dominant = BlockType::Empty;
    let mut max = 0;
    for (raw, &count) in counts.iter().enumerate() {
        if count > max {
            max = count;
            dominant = BlockType::from_raw(raw as u8).unwrap_or(BlockType::Empty);
        }
    }
    dominant
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_is_empty_and_dirty() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        assert!(!chunk.has_block_data());
        assert!(chunk.needs_update());
        assert!(!chunk.has_vbo_data());
        assert!(!chunk.has_gpu_data());
        assert_eq!(chunk.lod(), MAX_LOD);
        assert_eq!(chunk.local_block_at(0, 0, 0), BlockType::Empty);
        assert_eq!(chunk.local_block_at(15, 255, 15), BlockType::Empty);
    }

    #[test]
    fn set_and_get_local_block() {
        let chunk = Chunk::new(ChunkPos::new(-16, 32));
        chunk.set_needs_update(false);
        chunk.set_local_block_at(3, 200, 7, BlockType::Snow);
        assert_eq!(chunk.local_block_at(3, 200, 7), BlockType::Snow);
        assert!(chunk.needs_update());
    }

    #[test]
    fn edge_writes_dirty_the_bordering_neighbor() {
        let a = Chunk::new(ChunkPos::new(0, 0));
        let east = Chunk::new(ChunkPos::new(16, 0));
        let north = Chunk::new(ChunkPos::new(0, 16));
        a.link_neighbor(&east, Direction::XPos);
        a.link_neighbor(&north, Direction::ZPos);

        east.set_needs_update(false);
        north.set_needs_update(false);

        // Interior write: neighbors stay clean.
        a.set_local_block_at(8, 100, 8, BlockType::Stone);
        assert!(!east.needs_update());
        assert!(!north.needs_update());

        // Max-X slab dirties the XPos neighbor only.
        a.set_local_block_at(15, 100, 8, BlockType::Stone);
        assert!(east.needs_update());
        assert!(!north.needs_update());

        // Max-Z slab dirties the ZPos neighbor.
        a.set_local_block_at(8, 100, 15, BlockType::Stone);
        assert!(north.needs_update());
    }

    #[test]
    fn neighbor_links_are_symmetric() {
        let a = Chunk::new(ChunkPos::new(0, 0));
        let b = Chunk::new(ChunkPos::new(16, 0));
        a.link_neighbor(&b, Direction::XPos);

        let forward = a.neighbor(Direction::XPos).expect("link set");
        let back = b.neighbor(Direction::XNeg).expect("back link set");
        assert_eq!(forward.pos(), b.pos());
        assert_eq!(back.pos(), a.pos());
    }

    #[test]
    fn dropped_neighbors_do_not_dangle() {
        let a = Chunk::new(ChunkPos::new(0, 0));
        {
            let b = Chunk::new(ChunkPos::new(16, 0));
            a.link_neighbor(&b, Direction::XPos);
            assert!(a.neighbor(Direction::XPos).is_some());
        }
        assert!(a.neighbor(Direction::XPos).is_none());
    }

    #[test]
    fn lod_change_dirties_self_and_neighbors() {
        let a = Chunk::new(ChunkPos::new(0, 0));
        let b = Chunk::new(ChunkPos::new(16, 0));
        a.link_neighbor(&b, Direction::XPos);

        a.set_needs_update(false);
        b.set_needs_update(false);

        // Same LOD: no-op.
        a.set_lod(MAX_LOD);
        assert!(!a.needs_update());
        assert!(!b.needs_update());

        a.set_lod(0);
        assert!(a.needs_update());
        assert!(b.needs_update());
        assert_eq!(a.lod(), 0);
    }

    #[test]
    fn mesh_claim_is_exclusive() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        assert!(chunk.try_claim_mesh());
        assert!(!chunk.try_claim_mesh());
        chunk.release_mesh_claim();
        assert!(chunk.try_claim_mesh());
    }

    #[test]
    fn dominant_vote_prefers_majority_then_enum_order() {
        let mut blocks = vec![BlockType::Empty; CHUNK_VOLUME];
        // Region (0..2, 0..1, 0..2): two stone, one dirt.
        blocks[block_index(0, 0, 0)] = BlockType::Stone;
        blocks[block_index(1, 0, 0)] = BlockType::Stone;
        blocks[block_index(0, 0, 1)] = BlockType::Dirt;
        assert_eq!(dominant_in(&blocks, 0, 0, 0, 2, 1), BlockType::Stone);

        // Tie between dirt (2) and stone (3): dirt wins by enum order.
        blocks[block_index(1, 0, 1)] = BlockType::Dirt;
        assert_eq!(dominant_in(&blocks, 0, 0, 0, 2, 1), BlockType::Dirt);

        // All empty regions vote empty.
        assert_eq!(dominant_in(&blocks, 8, 0, 8, 2, 1), BlockType::Empty);
    }

    #[test]
    fn modified_blocks_diff_against_the_generator() {
        let generator = Generator::new(1);
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.generate(&generator, &[]);
        assert!(chunk.modified_blocks(&generator, &[]).is_empty());

        // Bedrock is never generated above y = 0, so this is always a diff.
        chunk.set_local_block_at(3, 200, 7, BlockType::Bedrock);
        let modified = chunk.modified_blocks(&generator, &[]);
        assert_eq!(modified.len(), 1);
        let (xz, y, raw) = modified[0];
        assert_eq!(xz, (3 << 4) | 7);
        assert_eq!(y, 200);
        assert_eq!(raw, BlockType::Bedrock.raw());
    }

    #[test]
    fn take_mesh_clears_the_cpu_copy() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        let mut mesh = MeshData::default();
        mesh.opaque_indices.extend_from_slice(&[0, 1, 2]);
        chunk.store_mesh(mesh);
        assert!(chunk.has_vbo_data());

        let taken = chunk.take_mesh();
        assert_eq!(taken.opaque_indices.len(), 3);
        assert!(!chunk.has_vbo_data());
        assert!(chunk.take_mesh().opaque_indices.is_empty());
    }
}
