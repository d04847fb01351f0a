// ============================================
// Terrain Module - Чанки, генерация и стриминг
// ============================================

pub mod block_pos;
pub mod cache;
pub mod generation;
pub mod manager;
pub mod mesh;
pub mod voxel;

// Re-exports
pub use block_pos::BlockPos;
pub use cache::ChunkKey;
pub use generation::WorldGenerator;
pub use manager::{ChunkState, Clipboard, GenerationScheduler, StreamingController, StreamingStats};
pub use mesh::{GeometryData, HeadlessMeshSink, MeshId, MeshSink, TerrainVertex};
pub use voxel::{Chunk, ChunkHandle, Face, FaceMask, PointLight, Voxel, CHUNK_HEIGHT, CHUNK_WIDTH};
