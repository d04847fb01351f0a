// ============================================
// GPU Mesh Sink - Буферы чанков на GPU
// ============================================

use std::collections::HashMap;
use std::sync::Arc;

use ultraviolet::Mat4;
use wgpu::util::DeviceExt;

use crate::terrain::cache::ChunkKey;

use super::geometry::GeometryData;
use super::sink::{MeshId, MeshSink};

/// GPU буферы для одного чанка
pub struct GpuChunk {
    pub key: ChunkKey,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    /// Матрица модели для uniform-буфера отрисовки
    pub transform: Mat4,
}

impl GpuChunk {
    pub fn new(device: &wgpu::Device, key: ChunkKey, geometry: &GeometryData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Chunk {} Vertices", key)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Chunk {} Indices", key)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            key,
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            transform: key.transform(),
        }
    }
}

/// Sink, загружающий меши в wgpu буферы
pub struct GpuMeshSink {
    chunks: HashMap<MeshId, GpuChunk>,
    device: Arc<wgpu::Device>,
    next_id: u64,
}

impl GpuMeshSink {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self {
            chunks: HashMap::with_capacity(1024),
            device,
            next_id: 0,
        }
    }

    /// Итератор по всем GPU чанкам для рендеринга (пустые пропускаются)
    pub fn iter(&self) -> impl Iterator<Item = &GpuChunk> {
        self.chunks.values().filter(|c| c.index_count > 0)
    }
}

impl MeshSink for GpuMeshSink {
    fn upload(&mut self, key: ChunkKey, geometry: &GeometryData) -> MeshId {
        self.next_id += 1;
        let id = MeshId(self.next_id);
        self.chunks.insert(id, GpuChunk::new(&self.device, key, geometry));
        id
    }

    fn release(&mut self, _key: ChunkKey, mesh: MeshId) {
        // Буферы освобождаются при drop
        self.chunks.remove(&mesh);
    }
}
