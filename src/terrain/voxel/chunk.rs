// ============================================
// Voxel Chunk - Воксельный чанк
// ============================================
// Сетка 32x256x32, маска видимых граней на каждый воксель,
// производные источники света и двухфазная подготовка меша:
// compute_geometry() можно звать из любого потока,
// realize() - только из потока, владеющего рендером.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ultraviolet::Vec3;

use crate::blocks::{is_light_emitting, BlockType, AIR};
use crate::terrain::cache::ChunkKey;
use crate::terrain::mesh::{GeometryData, MeshId, MeshSink};

use super::constants::{CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH};
use super::faces::{Face, FaceMask};
use super::light::PointLight;

/// Локальная позиция внутри чанка (x, y, z)
pub type LocalPos = (usize, usize, usize);

/// Занятая ячейка: тип блока + видимые грани
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Voxel {
    pub block: BlockType,
    pub faces: FaceMask,
}

impl Voxel {
    const EMPTY: Voxel = Voxel { block: AIR, faces: FaceMask::NONE };

    #[inline]
    fn is_empty(&self) -> bool {
        self.block == AIR
    }
}

#[inline]
fn index(x: usize, y: usize, z: usize) -> usize {
    assert!(
        x < CHUNK_WIDTH as usize && y < CHUNK_HEIGHT as usize && z < CHUNK_WIDTH as usize,
        "voxel ({}, {}, {}) out of chunk bounds",
        x,
        y,
        z
    );
    (y * CHUNK_WIDTH as usize + z) * CHUNK_WIDTH as usize + x
}

#[inline]
fn coords(index: usize) -> LocalPos {
    let w = CHUNK_WIDTH as usize;
    (index % w, index / (w * w), (index / w) % w)
}

/// Соседняя ячейка внутри того же чанка
#[inline]
fn neighbour(x: usize, y: usize, z: usize, face: Face) -> Option<LocalPos> {
    let (dx, dy, dz) = face.offset();
    let nx = x as i32 + dx;
    let ny = y as i32 + dy;
    let nz = z as i32 + dz;
    if nx < 0 || nx >= CHUNK_WIDTH || ny < 0 || ny >= CHUNK_HEIGHT || nz < 0 || nz >= CHUNK_WIDTH {
        return None;
    }
    Some((nx as usize, ny as usize, nz as usize))
}

/// Воксельный чанк
pub struct Chunk {
    key: ChunkKey,
    cells: Vec<Voxel>,
    occupied: usize,
    modified: bool,
    lights: HashMap<LocalPos, PointLight>,
    /// Меш, посчитанный в фоне и ожидающий загрузки
    pending: Option<GeometryData>,
    /// Загруженный меш (ready == mesh.is_some())
    mesh: Option<MeshId>,
    /// Грани поменялись после подсчёта меша
    mesh_stale: bool,
}

impl Chunk {
    /// Пустой чанк
    pub fn new(key: ChunkKey) -> Self {
        Self {
            key,
            cells: vec![Voxel::EMPTY; CHUNK_VOLUME],
            occupied: 0,
            modified: false,
            lights: HashMap::new(),
            pending: None,
            mesh: None,
            mesh_stale: false,
        }
    }

    #[inline]
    pub fn key(&self) -> ChunkKey {
        self.key
    }

    /// Менялся ли чанк после генерации
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Меш загружен в рендер
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.mesh.is_some()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Количество занятых ячеек
    #[inline]
    pub fn voxel_count(&self) -> usize {
        self.occupied
    }

    /// Нужно пересчитать меш (грани поменял сосед)
    #[inline]
    pub fn is_mesh_stale(&self) -> bool {
        self.mesh_stale
    }

    /// Сбросить флаг modified после первичного заполнения
    pub(crate) fn mark_pristine(&mut self) {
        self.modified = false;
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<Voxel> {
        let voxel = self.cells[index(x, y, z)];
        (!voxel.is_empty()).then_some(voxel)
    }

    #[inline]
    pub fn block_at(&self, x: usize, y: usize, z: usize) -> BlockType {
        self.cells[index(x, y, z)].block
    }

    /// Поставить блок в локальные координаты
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: BlockType) {
        assert!(block != AIR, "set() with AIR, use remove()");
        let idx = index(x, y, z);
        self.modified = true;

        let current = self.cells[idx];
        if !current.is_empty() {
            // Замена типа: занятость и грани не меняются
            if is_light_emitting(current.block) {
                self.lights.remove(&(x, y, z));
            }
            self.cells[idx].block = block;
        } else {
            let mut faces = FaceMask::ALL;
            for face in Face::ALL {
                let Some((nx, ny, nz)) = neighbour(x, y, z, face) else { continue };
                let n = index(nx, ny, nz);
                if !self.cells[n].is_empty() {
                    faces.set(face, false);
                    self.cells[n].faces.set(face.opposite(), false);
                }
            }
            // Низ мира никто не видит
            if y == 0 {
                faces.set(Face::NegY, false);
            }
            self.cells[idx] = Voxel { block, faces };
            self.occupied += 1;
        }

        if is_light_emitting(block) {
            let [ox, oy, oz] = self.key.origin();
            let position = Vec3::new(
                (ox + x as i32) as f32 + 0.5,
                (oy + y as i32) as f32 + 0.5,
                (oz + z as i32) as f32 + 0.5,
            );
            self.lights.insert((x, y, z), PointLight::new(position));
        }
    }

    /// Убрать блок, вернуть его тип
    pub fn remove(&mut self, x: usize, y: usize, z: usize) -> Option<BlockType> {
        let idx = index(x, y, z);
        let current = self.cells[idx];
        if current.is_empty() {
            return None;
        }
        self.modified = true;

        if is_light_emitting(current.block) {
            self.lights.remove(&(x, y, z));
        }
        self.cells[idx] = Voxel::EMPTY;
        self.occupied -= 1;

        // Соседи снова видят эту сторону
        for face in Face::ALL {
            let Some((nx, ny, nz)) = neighbour(x, y, z, face) else { continue };
            let n = index(nx, ny, nz);
            if !self.cells[n].is_empty() {
                self.cells[n].faces.set(face.opposite(), true);
            }
        }
        Some(current.block)
    }

    /// Переключить видимость одной грани (для стыков с соседними чанками).
    /// Возвращает true если маска изменилась.
    pub(crate) fn set_face(&mut self, x: usize, y: usize, z: usize, face: Face, visible: bool) -> bool {
        let voxel = &mut self.cells[index(x, y, z)];
        if voxel.is_empty() || voxel.faces.is_visible(face) == visible {
            return false;
        }
        voxel.faces.set(face, visible);
        self.mesh_stale = true;
        true
    }

    /// Все занятые ячейки
    pub fn voxels(&self) -> impl Iterator<Item = (LocalPos, Voxel)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_empty())
            .map(|(i, v)| (coords(i), *v))
    }

    /// Id блоков в порядке индексации, 0 = пусто
    pub fn block_ids(&self) -> Vec<u8> {
        self.cells.iter().map(|v| v.block).collect()
    }

    /// Источники света этого чанка
    pub fn lights(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.values()
    }

    pub fn light_at(&self, x: usize, y: usize, z: usize) -> Option<&PointLight> {
        self.lights.get(&(x, y, z))
    }

    // --- Меш ---

    /// Посчитать геометрию всех видимых граней. Без побочных эффектов.
    pub fn compute_geometry(&self) -> GeometryData {
        let mut geometry = GeometryData::new();
        for ((x, y, z), voxel) in self.voxels() {
            if voxel.faces.is_hidden() {
                continue;
            }
            let local = [x as f32, y as f32, z as f32];
            for face in Face::ALL {
                if voxel.faces.is_visible(face) {
                    geometry.push_face(local, face, voxel.block);
                }
            }
        }
        geometry
    }

    /// Посчитать меш заранее (в фоне), загрузка позже через realize()
    pub fn prepare_mesh(&mut self) {
        self.pending = Some(self.compute_geometry());
        self.mesh_stale = false;
    }

    /// Загрузить меш в рендер. Только в потоке-владельце рендера.
    pub fn realize(&mut self, sink: &mut dyn MeshSink) -> MeshId {
        let geometry = match self.pending.take() {
            Some(geometry) if !self.mesh_stale => geometry,
            _ => self.compute_geometry(),
        };
        self.mesh_stale = false;
        if let Some(old) = self.mesh.take() {
            sink.release(self.key, old);
        }
        let mesh = sink.upload(self.key, &geometry);
        self.mesh = Some(mesh);
        mesh
    }

    /// Выгрузить меш из рендера
    pub fn release_mesh(&mut self, sink: &mut dyn MeshSink) {
        if let Some(mesh) = self.mesh.take() {
            sink.release(self.key, mesh);
        }
        self.pending = None;
    }
}

/// Чанк, разделяемый между главным потоком и воркерами.
/// Ключ хранится снаружи мьютекса, чтобы упорядочивать блокировки.
#[derive(Clone)]
pub struct ChunkHandle {
    key: ChunkKey,
    inner: Arc<Mutex<Chunk>>,
}

impl ChunkHandle {
    pub fn new(chunk: Chunk) -> Self {
        Self { key: chunk.key(), inner: Arc::new(Mutex::new(chunk)) }
    }

    #[inline]
    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn lock(&self) -> MutexGuard<'_, Chunk> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Заблокировать два разных чанка в порядке ключей (без дедлоков).
/// Гарды возвращаются в порядке аргументов.
pub fn lock_pair<'a>(a: &'a ChunkHandle, b: &'a ChunkHandle) -> (MutexGuard<'a, Chunk>, MutexGuard<'a, Chunk>) {
    assert!(a.key() != b.key(), "lock_pair on the same chunk {}", a.key());
    if a.key() < b.key() {
        let ga = a.lock();
        let gb = b.lock();
        (ga, gb)
    } else {
        let gb = b.lock();
        let ga = a.lock();
        (ga, gb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{DIRT, GOLD, STONE};
    use crate::terrain::mesh::HeadlessMeshSink;

    fn chunk() -> Chunk {
        Chunk::new(ChunkKey::new(0, 0, 0))
    }

    #[test]
    fn test_set_hides_shared_faces() {
        let mut c = chunk();
        c.set(5, 5, 5, STONE);
        c.set(6, 5, 5, DIRT);
        let a = c.get(5, 5, 5).unwrap();
        let b = c.get(6, 5, 5).unwrap();
        assert!(!a.faces.is_visible(Face::PosX));
        assert!(!b.faces.is_visible(Face::NegX));
        assert_eq!(a.faces.count(), 5);
        assert_eq!(b.faces.count(), 5);
        assert!(c.is_modified());
    }

    #[test]
    fn test_floor_face_always_hidden() {
        let mut c = chunk();
        c.set(0, 0, 0, STONE);
        let v = c.get(0, 0, 0).unwrap();
        assert!(!v.faces.is_visible(Face::NegY));
        // Граница чанка без соседа остаётся видимой
        assert!(v.faces.is_visible(Face::NegX));
        assert!(v.faces.is_visible(Face::NegZ));
    }

    #[test]
    fn test_remove_restores_neighbour_faces() {
        let mut c = chunk();
        c.set(5, 5, 5, STONE);
        c.set(5, 6, 5, STONE);
        c.set(5, 4, 5, STONE);
        assert_eq!(c.remove(5, 5, 5), Some(STONE));
        assert!(c.get(5, 6, 5).unwrap().faces.is_visible(Face::NegY));
        assert!(c.get(5, 4, 5).unwrap().faces.is_visible(Face::PosY));
        assert_eq!(c.voxel_count(), 2);
        assert_eq!(c.remove(5, 5, 5), None);
    }

    #[test]
    fn test_replace_keeps_faces() {
        let mut c = chunk();
        c.set(1, 1, 1, STONE);
        c.set(2, 1, 1, STONE);
        let before = c.get(1, 1, 1).unwrap().faces;
        c.set(1, 1, 1, DIRT);
        let after = c.get(1, 1, 1).unwrap();
        assert_eq!(after.block, DIRT);
        assert_eq!(after.faces, before);
        assert_eq!(c.voxel_count(), 2);
    }

    #[test]
    fn test_light_follows_gold() {
        let mut c = Chunk::new(ChunkKey::new(1, 0, 0));
        c.set(3, 4, 5, GOLD);
        let light = c.light_at(3, 4, 5).unwrap();
        assert_eq!(light.position, Vec3::new(35.5, 4.5, 5.5));
        c.set(3, 4, 5, STONE);
        assert!(c.light_at(3, 4, 5).is_none());
        c.set(3, 4, 5, GOLD);
        c.remove(3, 4, 5);
        assert_eq!(c.lights().count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_panics() {
        let mut c = chunk();
        c.set(CHUNK_WIDTH as usize, 0, 0, STONE);
    }

    #[test]
    fn test_geometry_only_visible_faces() {
        let mut c = chunk();
        c.set(4, 4, 4, STONE);
        assert_eq!(c.compute_geometry().face_count(), 6);
        c.set(5, 4, 4, STONE);
        // 2 куба, 2 скрытые грани
        let g = c.compute_geometry();
        assert_eq!(g.face_count(), 10);
        assert_eq!(g.vertices.len(), 40);
        assert_eq!(g.indices.len(), 60);
    }

    #[test]
    fn test_realize_uploads_once() {
        let mut c = chunk();
        c.set(4, 4, 4, STONE);
        c.prepare_mesh();
        assert!(!c.is_ready());

        let mut sink = HeadlessMeshSink::new();
        let mesh = c.realize(&mut sink);
        assert!(c.is_ready());
        assert_eq!(sink.live_meshes(), 1);
        assert_eq!(sink.face_count(mesh), Some(6));

        // Повторная загрузка освобождает старый меш
        c.realize(&mut sink);
        assert_eq!(sink.live_meshes(), 1);
        c.release_mesh(&mut sink);
        assert!(!c.is_ready());
        assert_eq!(sink.live_meshes(), 0);
    }

    #[test]
    fn test_stale_pending_geometry_is_recomputed() {
        let mut c = chunk();
        c.set(CHUNK_WIDTH as usize - 1, 4, 4, STONE);
        c.prepare_mesh();
        assert!(c.set_face(CHUNK_WIDTH as usize - 1, 4, 4, Face::PosX, false));
        assert!(c.is_mesh_stale());

        let mut sink = HeadlessMeshSink::new();
        let mesh = c.realize(&mut sink);
        assert_eq!(sink.face_count(mesh), Some(5));
        assert!(!c.is_mesh_stale());
    }

    #[test]
    fn test_voxels_iter_coords() {
        let mut c = chunk();
        c.set(31, 200, 7, STONE);
        let all: Vec<_> = c.voxels().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, (31, 200, 7));
    }

    #[test]
    fn test_lock_pair_either_order() {
        let a = ChunkHandle::new(Chunk::new(ChunkKey::new(0, 0, 0)));
        let b = ChunkHandle::new(Chunk::new(ChunkKey::new(1, 0, 0)));
        {
            let (ga, gb) = lock_pair(&b, &a);
            assert_eq!(ga.key(), b.key());
            assert_eq!(gb.key(), a.key());
        }
        let (ga, gb) = lock_pair(&a, &b);
        assert_eq!(ga.key(), a.key());
        assert_eq!(gb.key(), b.key());
    }
}
