// ============================================
// Terrain Stream - Стриминг воксельного мира
// ============================================
// Держит в памяти чанки вокруг наблюдателя: генерирует новые
// и восстанавливает изменённые из архива на пуле воркеров,
// выгружает далёкие, а меши грузит только в потоке рендера.

pub mod blocks;
pub mod core;
pub mod save;
pub mod terrain;

pub use crate::core::{StreamError, StreamingConfig, StreamingContext};
pub use save::{ArchiveError, BlobStore, ColdStorageArchiver, DirBlobStore, MemoryBlobStore};
pub use terrain::{BlockPos, ChunkKey, HeadlessMeshSink, MeshSink, StreamingController, WorldGenerator};
