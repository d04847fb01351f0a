// ============================================
// Chunk Key - Идентификатор чанка
// ============================================

use std::fmt;

use serde::{Deserialize, Serialize};
use ultraviolet::{Mat4, Vec3};

use crate::terrain::voxel::{CHUNK_HEIGHT, CHUNK_WIDTH};

/// Ключ чанка: координаты в сетке чанков (chunk_x, chunk_y, chunk_z).
///
/// Порядок `Ord` ничего не значит для мира и нужен только для того,
/// чтобы брать блокировки двух чанков всегда в одном и том же порядке.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkKey {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Ключ чанка, содержащего мировую колонку (world_x, world_z)
    #[inline]
    pub fn containing(world_x: i32, world_z: i32) -> Self {
        Self {
            x: world_x.div_euclid(CHUNK_WIDTH),
            y: 0,
            z: world_z.div_euclid(CHUNK_WIDTH),
        }
    }

    /// Мировые координаты угла чанка (минимальный блок)
    #[inline]
    pub fn origin(&self) -> [i32; 3] {
        [self.x * CHUNK_WIDTH, self.y * CHUNK_HEIGHT, self.z * CHUNK_WIDTH]
    }

    /// Матрица модели чанка: сдвиг в его угол
    pub fn transform(&self) -> Mat4 {
        let [ox, oy, oz] = self.origin();
        Mat4::from_translation(Vec3::new(ox as f32, oy as f32, oz as f32))
    }

    /// Горизонтальная дистанция от точки до угла чанка
    #[inline]
    pub fn horizontal_distance(&self, position: Vec3) -> f32 {
        let [ox, _, oz] = self.origin();
        let dx = position.x - ox as f32;
        let dz = position.z - oz as f32;
        (dx * dx + dz * dz).sqrt()
    }

    /// Сосед по горизонтали
    #[inline]
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y, self.z + dz)
    }

    /// Имя файла блоба в архиве
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.chunk", self.x, self.y, self.z)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
