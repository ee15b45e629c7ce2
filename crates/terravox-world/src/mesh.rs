//! Vertex format and the level-of-detail mesher.
//!
//! Meshing reads one snapshot of the chunk's own blocks; neighbor regions
//! across a seam are sampled through the neighbor's lock, one chunk at a
//! time, so no two block locks are ever held together.

use bytemuck::{Pod, Zeroable};
use terravox_core::constants::{CHUNK_X, CHUNK_Y, CHUNK_Z};
use terravox_core::{BlockType, Direction};

use crate::chunk::{dominant_in, Chunk};

/// Interleaved vertex attributes streamed to the GPU. Indices are 32-bit.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub normal: [f32; 4],
    /// Unused by the shader but kept in the stream layout.
    pub color: [f32; 4],
    pub uv: [f32; 2],
    /// 1.0 for water and lava so the shader can scroll their UVs.
    pub animated: f32,
}

/// CPU-side mesh buffers held between meshing and GPU upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub opaque_vertices: Vec<Vertex>,
    pub opaque_indices: Vec<u32>,
    pub transparent_vertices: Vec<Vertex>,
    pub transparent_indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.opaque_indices.is_empty() && self.transparent_indices.is_empty()
    }
}

/// Atlas tile step; the texture is a 16 x 16 grid.
const TILE: f32 = 1.0 / 16.0;

/// Canonical face corners on the unit cube, one quad per direction, in
/// [`Direction`] order.
const FACE_CORNERS: [[[f32; 3]; 4]; 6] = [
    // XPos
    [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]],
    // XNeg
    [[0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]],
    // YPos
    [[0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
    // YNeg
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
    // ZPos
    [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
    // ZNeg
    [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
];

/// Atlas tile (column, row) for a block face.
fn atlas_tile(block: BlockType, dir: Direction) -> (u32, u32) {
    use BlockType as B;
    use Direction as D;
    match (block, dir) {
        (B::Grass, D::YPos) => (8, 2),
        (B::Grass, D::YNeg) => (2, 0),
        (B::Grass, _) => (3, 0),
        (B::Dirt, _) => (2, 0),
        (B::Stone, _) => (1, 0),
        (B::Bedrock, _) => (1, 1),
        (B::Lava, _) => (15, 14),
        (B::SnowDirt, D::YPos) => (2, 4),
        (B::SnowDirt, _) => (4, 4),
        (B::Snow, _) => (2, 4),
        (B::Water, _) => (15, 12),
        (B::Ice, _) => (3, 4),
        (B::Empty, _) => (0, 0),
    }
}

/// UV quad for a tile; v is flipped, and the winding differs between the
/// top face / X sides ("bottom-right first") and the rest ("bottom-left
/// first").
fn face_uvs(col: u32, row: u32, dir: Direction) -> [[f32; 2]; 4] {
    let u_min = col as f32 * TILE;
    let v_min = 1.0 - (row + 1) as f32 * TILE;
    let u_max = u_min + TILE;
    let v_max = 1.0 - row as f32 * TILE;

    match dir {
        Direction::YPos | Direction::XPos | Direction::XNeg => [
            [u_max, v_min],
            [u_max, v_max],
            [u_min, v_max],
            [u_min, v_min],
        ],
        _ => [
            [u_min, v_min],
            [u_max, v_min],
            [u_max, v_max],
            [u_min, v_max],
        ],
    }
}

/// Region extents at a level of detail: the XZ size doubles per level and
/// Y uses half of it, clamped to at least one cell.
fn lod_sizes(lod: u8) -> (usize, usize) {
    let size_xz = 1usize << lod;
    let size_y = (size_xz / 2).clamp(1, CHUNK_Y);
    (size_xz, size_y)
}

/// Build the opaque and transparent buffers for a chunk at its current
/// level of detail.
pub fn build_chunk_mesh(chunk: &Chunk) -> MeshData {
    let lod = chunk.lod();
    let (size_xz, size_y) = lod_sizes(lod);
    let blocks = chunk.snapshot_blocks();
    let mut mesh = MeshData::default();

    for x in (0..CHUNK_X).step_by(size_xz) {
        for y in (0..CHUNK_Y).step_by(size_y) {
            for z in (0..CHUNK_Z).step_by(size_xz) {
                let block = dominant_in(&blocks, x, y, z, size_xz, size_y);
                if block != BlockType::Empty {
                    emit_region(chunk, &blocks, lod, x, y, z, block, &mut mesh);
                }
            }
        }
    }

    mesh
}

/// Emit the visible faces of one dominant-block region.
#[allow(clippy::too_many_arguments)]
fn emit_region(
    chunk: &Chunk,
    blocks: &[BlockType],
    lod: u8,
    x: usize,
    y: usize,
    z: usize,
    block: BlockType,
    mesh: &mut MeshData,
) {
    let (size_xz, size_y) = lod_sizes(lod);
    let origin = chunk.pos();
    let world = [
        origin.x as f32 + x as f32,
        y as f32,
        origin.z as f32 + z as f32,
    ];
    let opaque = block.is_opaque();
    let animated = if block.is_animated() { 1.0 } else { 0.0 };

    for dir in Direction::ALL {
        if !face_visible(chunk, blocks, lod, x, y, z, block, dir) {
            continue;
        }

        let (vertices, indices) = if opaque {
            (&mut mesh.opaque_vertices, &mut mesh.opaque_indices)
        } else {
            (&mut mesh.transparent_vertices, &mut mesh.transparent_indices)
        };

        let base = vertices.len() as u32;
        let (col, row) = atlas_tile(block, dir);
        let uvs = face_uvs(col, row, dir);
        let normal = dir.normal().to_array();

        for (corner, uv) in FACE_CORNERS[dir as usize].iter().zip(uvs) {
            vertices.push(Vertex {
                position: [
                    world[0] + corner[0] * size_xz as f32,
                    world[1] + corner[1] * size_y as f32,
                    world[2] + corner[2] * size_xz as f32,
                    1.0,
                ],
                normal,
                color: [0.0; 4],
                uv,
                animated,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

/// Whether the face of the region at (x, y, z) toward `dir` is visible.
///
/// Culling-opaque sources hide a face only behind another culling-opaque
/// region; transparent sources (water, ice, and lava, which never hides
/// neighbors) hide one only behind empty space. Across a chunk seam a
/// missing neighbor always emits, and so does a neighbor at a finer level
/// of detail, whose side of the seam cannot line up with ours.
#[allow(clippy::too_many_arguments)]
fn face_visible(
    chunk: &Chunk,
    blocks: &[BlockType],
    lod: u8,
    x: usize,
    y: usize,
    z: usize,
    block: BlockType,
    dir: Direction,
) -> bool {
    let (size_xz, size_y) = lod_sizes(lod);

    let mut nx = x as i32;
    let mut ny = y as i32;
    let mut nz = z as i32;
    match dir {
        Direction::XPos => nx += size_xz as i32,
        Direction::XNeg => nx -= size_xz as i32,
        Direction::YPos => ny += size_y as i32,
        Direction::YNeg => ny -= size_y as i32,
        Direction::ZPos => nz += size_xz as i32,
        Direction::ZNeg => nz -= size_xz as i32,
    }

    let culling_opaque = block.culls_faces();

    // Above and below the world there is nothing to hide behind.
    if ny < 0 || ny >= CHUNK_Y as i32 {
        return true;
    }

    if nx < 0 || nx >= CHUNK_X as i32 || nz < 0 || nz >= CHUNK_Z as i32 {
        let Some(neighbor) = chunk.neighbor(dir) else {
            return true;
        };
        if neighbor.lod() < lod {
            return true;
        }
        let wx = nx.rem_euclid(CHUNK_X as i32) as usize;
        let wz = nz.rem_euclid(CHUNK_Z as i32) as usize;
        let other = neighbor.dominant_block_in(wx, ny as usize, wz, size_xz, size_y);
        return if culling_opaque {
            !other.culls_faces()
        } else {
            other == BlockType::Empty
        };
    }

    let other = dominant_in(blocks, nx as usize, ny as usize, nz as usize, size_xz, size_y);
    if culling_opaque {
        !other.culls_faces()
    } else {
        other == BlockType::Empty
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use terravox_core::ChunkPos;

    use super::*;

    fn lone_chunk() -> Arc<Chunk> {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_lod(0);
        chunk
    }

    #[test]
    fn vertex_layout_has_no_padding() {
        assert_eq!(std::mem::size_of::<Vertex>(), 60);
    }

    #[test]
    fn single_block_emits_six_faces() {
        let chunk = lone_chunk();
        chunk.set_local_block_at(8, 100, 8, BlockType::Stone);
        let mesh = build_chunk_mesh(&chunk);

        assert_eq!(mesh.opaque_vertices.len(), 24);
        assert_eq!(mesh.opaque_indices.len(), 36);
        assert!(mesh.transparent_indices.is_empty());
    }

    #[test]
    fn adjacent_blocks_share_no_interior_face() {
        let chunk = lone_chunk();
        chunk.set_local_block_at(8, 100, 8, BlockType::Dirt);
        chunk.set_local_block_at(9, 100, 8, BlockType::Dirt);
        let mesh = build_chunk_mesh(&chunk);

        // Ten visible faces on the two-block cluster, two triangles each.
        assert_eq!(mesh.opaque_indices.len(), 10 * 6);
        assert_eq!(mesh.opaque_vertices.len(), 10 * 4);
    }

    #[test]
    fn water_goes_to_the_transparent_buffers() {
        let chunk = lone_chunk();
        chunk.set_local_block_at(8, 100, 8, BlockType::Water);
        let mesh = build_chunk_mesh(&chunk);

        assert!(mesh.opaque_indices.is_empty());
        assert_eq!(mesh.transparent_vertices.len(), 24);
        assert_eq!(mesh.transparent_indices.len(), 36);
        for vertex in &mesh.transparent_vertices {
            assert_eq!(vertex.animated, 1.0);
        }
    }

    #[test]
    fn lava_is_opaque_but_does_not_cull_its_neighbor() {
        let chunk = lone_chunk();
        chunk.set_local_block_at(8, 100, 8, BlockType::Stone);
        chunk.set_local_block_at(9, 100, 8, BlockType::Lava);
        let mesh = build_chunk_mesh(&chunk);

        // Lava lands in the opaque buffers, animated.
        let animated = mesh
            .opaque_vertices
            .iter()
            .filter(|v| v.animated == 1.0)
            .count();
        assert!(animated > 0);

        // The stone face toward the lava is still emitted: 6 stone faces
        // plus 5 lava faces (lava's face toward stone is hidden).
        assert_eq!(mesh.opaque_indices.len(), 11 * 6);
    }

    #[test]
    fn water_face_is_culled_only_against_empty() {
        let chunk = lone_chunk();
        chunk.set_local_block_at(8, 100, 8, BlockType::Water);
        chunk.set_local_block_at(9, 100, 8, BlockType::Water);
        let mesh = build_chunk_mesh(&chunk);

        // Two water blocks: the interior faces see water (not empty), so
        // only the ten outer faces emit.
        assert_eq!(mesh.transparent_indices.len(), 10 * 6);
    }

    #[test]
    fn chunk_edge_without_neighbor_emits_the_seam_face() {
        let chunk = lone_chunk();
        chunk.set_local_block_at(0, 100, 8, BlockType::Stone);
        let mesh = build_chunk_mesh(&chunk);
        assert_eq!(mesh.opaque_indices.len(), 6 * 6);
    }

    #[test]
    fn solid_neighbor_culls_the_seam_face() {
        let chunk = lone_chunk();
        let west = Chunk::new(ChunkPos::new(-16, 0));
        west.set_lod(0);
        chunk.link_neighbor(&west, Direction::XNeg);

        chunk.set_local_block_at(0, 100, 8, BlockType::Stone);
        west.set_local_block_at(15, 100, 8, BlockType::Stone);

        let mesh = build_chunk_mesh(&chunk);
        // One face hidden by the neighbor's edge block.
        assert_eq!(mesh.opaque_indices.len(), 5 * 6);
    }

    #[test]
    fn finer_lod_neighbor_forces_the_seam_face() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_lod(1);
        let west = Chunk::new(ChunkPos::new(-16, 0));
        west.set_lod(0);
        chunk.link_neighbor(&west, Direction::XNeg);

        // Fill the seam region on both sides.
        for y in 100..101 {
            for z in 0..2 {
                chunk.set_local_block_at(0, y, z, BlockType::Stone);
                chunk.set_local_block_at(1, y, z, BlockType::Stone);
                west.set_local_block_at(15, y, z, BlockType::Stone);
                west.set_local_block_at(14, y, z, BlockType::Stone);
            }
        }

        let mesh = build_chunk_mesh(&chunk);
        let has_seam_face = mesh
            .opaque_vertices
            .iter()
            .any(|v| v.position[0] == 0.0 && v.normal[0] == -1.0);
        assert!(has_seam_face, "face against a finer-LOD neighbor must emit");
    }

    #[test]
    fn lod_scales_region_geometry() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.set_lod(2);
        // Fill one 4x2x4 region completely with stone.
        for x in 0..4 {
            for y in 100..102 {
                for z in 0..4 {
                    chunk.set_local_block_at(x, y, z, BlockType::Stone);
                }
            }
        }
        let mesh = build_chunk_mesh(&chunk);
        assert_eq!(mesh.opaque_indices.len(), 36);

        // Vertices span the whole scaled region.
        let max_x = mesh
            .opaque_vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        let max_y = mesh
            .opaque_vertices
            .iter()
            .map(|v| v.position[1])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 4.0);
        assert_eq!(max_y, 102.0);
    }

    #[test]
    fn grass_uses_distinct_top_and_bottom_tiles() {
        let (top_col, top_row) = atlas_tile(BlockType::Grass, Direction::YPos);
        let (bottom_col, bottom_row) = atlas_tile(BlockType::Grass, Direction::YNeg);
        let (side_col, side_row) = atlas_tile(BlockType::Grass, Direction::XPos);
        assert_eq!((top_col, top_row), (8, 2));
        assert_eq!((bottom_col, bottom_row), (2, 0));
        assert_eq!((side_col, side_row), (3, 0));
    }

    #[test]
    fn uv_tiles_are_sixteenths_with_v_flipped() {
        let uvs = face_uvs(1, 0, Direction::YNeg);
        // Bottom-left first: (u_min, v_min) with v_min = 1 - 1/16.
        assert_eq!(uvs[0], [1.0 / 16.0, 15.0 / 16.0]);
        assert_eq!(uvs[2], [2.0 / 16.0, 1.0]);

        // Bottom-right first for the top face.
        let top = face_uvs(1, 0, Direction::YPos);
        assert_eq!(top[0], [2.0 / 16.0, 15.0 / 16.0]);
    }

    #[test]
    fn face_corners_match_outward_normals() {
        // Every corner of a face lies on the plane its normal names.
        for dir in Direction::ALL {
            let normal = dir.normal();
            let corners = FACE_CORNERS[dir as usize];
            for corner in corners {
                let along = corner[0] * normal.x + corner[1] * normal.y + corner[2] * normal.z;
                let expected = if normal.x + normal.y + normal.z > 0.0 { 1.0 } else { 0.0 };
                assert_eq!(along.abs(), expected, "{dir:?} corner {corner:?}");
            }
        }
    }
}
