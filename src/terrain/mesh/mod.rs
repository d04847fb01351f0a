// ============================================
// Mesh Module - Геометрия и загрузка мешей
// ============================================

mod geometry;
mod sink;
mod vertex;

#[cfg(feature = "gpu")]
mod gpu;

pub use geometry::GeometryData;
pub use sink::{HeadlessMeshSink, MeshId, MeshSink};
pub use vertex::TerrainVertex;

#[cfg(feature = "gpu")]
pub use gpu::{GpuChunk, GpuMeshSink};
