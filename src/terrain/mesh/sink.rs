// ============================================
// Mesh Sink - Куда уходят готовые меши
// ============================================
// Всё, что трогает ресурсы рендера, идёт через MeshSink.
// Трейт не требует Send: владелец sink'а - поток рендера.

use std::collections::HashMap;

use crate::terrain::cache::ChunkKey;

use super::geometry::GeometryData;

/// Идентификатор загруженного меша
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub u64);

/// Приёмник геометрии на стороне рендера
pub trait MeshSink {
    /// Загрузить геометрию чанка
    fn upload(&mut self, key: ChunkKey, geometry: &GeometryData) -> MeshId;

    /// Освободить меш (чанк выгружен или перестроен)
    fn release(&mut self, key: ChunkKey, mesh: MeshId);
}

/// Sink без GPU: только считает меши
#[derive(Default)]
pub struct HeadlessMeshSink {
    next_id: u64,
    live: HashMap<MeshId, (ChunkKey, usize)>,
    uploads: usize,
    releases: usize,
}

impl HeadlessMeshSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сколько мешей сейчас загружено
    pub fn live_meshes(&self) -> usize {
        self.live.len()
    }

    pub fn uploads(&self) -> usize {
        self.uploads
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    /// Количество граней в загруженном меше
    pub fn face_count(&self, mesh: MeshId) -> Option<usize> {
        self.live.get(&mesh).map(|(_, faces)| *faces)
    }

    /// Загружен ли меш для чанка
    pub fn has_mesh_for(&self, key: ChunkKey) -> bool {
        self.live.values().any(|(k, _)| *k == key)
    }
}

impl MeshSink for HeadlessMeshSink {
    fn upload(&mut self, key: ChunkKey, geometry: &GeometryData) -> MeshId {
        self.next_id += 1;
        let id = MeshId(self.next_id);
        self.live.insert(id, (key, geometry.face_count()));
        self.uploads += 1;
        id
    }

    fn release(&mut self, key: ChunkKey, mesh: MeshId) {
        if self.live.remove(&mesh).is_none() {
            log::warn!("[STREAM] Release of unknown mesh {:?} for chunk {}", mesh, key);
        }
        self.releases += 1;
    }
}
