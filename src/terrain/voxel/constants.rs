// ============================================
// Voxel Constants - Размеры чанка
// ============================================

/// Ширина чанка по X и Z (в блоках)
pub const CHUNK_WIDTH: i32 = 32;

/// Высота чанка по Y (в блоках), мир не выше одного чанка
pub const CHUNK_HEIGHT: i32 = 256;

/// Количество ячеек в чанке
pub const CHUNK_VOLUME: usize = (CHUNK_WIDTH * CHUNK_WIDTH * CHUNK_HEIGHT) as usize;
