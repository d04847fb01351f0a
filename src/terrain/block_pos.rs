// ============================================
// Block Position - Мировые координаты блока
// ============================================

use ultraviolet::Vec3;

use crate::terrain::cache::ChunkKey;
use crate::terrain::voxel::{CHUNK_HEIGHT, CHUNK_WIDTH};

/// Ключ для блока в мире
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Блок, в котором лежит точка
    pub fn from_vec(v: Vec3) -> Self {
        Self::new(v.x.floor() as i32, v.y.floor() as i32, v.z.floor() as i32)
    }

    #[inline]
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Получить ключ чанка для этого блока
    #[inline]
    pub fn chunk_key(&self) -> ChunkKey {
        ChunkKey::containing(self.x, self.z)
    }

    /// Локальные координаты внутри чанка, None если y вне мира
    #[inline]
    pub fn local(&self) -> Option<(usize, usize, usize)> {
        if self.y < 0 || self.y >= CHUNK_HEIGHT {
            return None;
        }
        Some((
            self.x.rem_euclid(CHUNK_WIDTH) as usize,
            self.y as usize,
            self.z.rem_euclid(CHUNK_WIDTH) as usize,
        ))
    }
}
