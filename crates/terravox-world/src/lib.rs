//! World streaming core: the chunk store, terrain grid, LOD mesher,
//! worker pipeline, and persistence.
//!
//! The per-chunk order is generate -> mesh -> upload -> draw; there is no
//! global ordering across chunks. The chunk map itself is mutated only on
//! the main thread, while workers receive `Arc<Chunk>` handles.

pub mod chunk;
pub mod mesh;
pub mod persist;
pub mod pipeline;
pub mod terrain;
pub mod view;

pub use chunk::Chunk;
pub use mesh::{build_chunk_mesh, MeshData, Vertex};
pub use pipeline::WorkerPool;
pub use terrain::Terrain;
pub use view::{CullMode, RenderSink};
