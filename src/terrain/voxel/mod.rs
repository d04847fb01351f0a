// ============================================
// Voxel Module - Воксельная модель чанка
// ============================================

pub mod constants;
pub mod fixup;

mod chunk;
mod faces;
mod light;

pub use constants::{CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH};
pub use chunk::{lock_pair, Chunk, ChunkHandle, LocalPos, Voxel};
pub use faces::{Face, FaceMask};
pub use fixup::{fix_shared_faces, shared_side, sync_shared_cell};
pub use light::PointLight;
