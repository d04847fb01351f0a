// ============================================
// Blob Header - Заголовок архивного чанка
// ============================================

use serde::{Deserialize, Serialize};

use crate::terrain::cache::ChunkKey;

/// Магическое число "TSCK" в ASCII
pub const MAGIC_NUMBER: [u8; 4] = [0x54, 0x53, 0x43, 0x4B];

/// Версия формата блоба
pub const BLOB_VERSION: u32 = 1;

/// Заголовок блоба (20 байт в bincode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHeader {
    /// Магическое число для валидации
    pub magic: [u8; 4],
    /// Версия формата
    pub version: u32,
    /// Чанк, который лежит в блобе
    pub key: ChunkKey,
}

impl BlobHeader {
    pub fn new(key: ChunkKey) -> Self {
        Self {
            magic: MAGIC_NUMBER,
            version: BLOB_VERSION,
            key,
        }
    }

    /// Размер заголовка в байтах
    pub fn size() -> usize {
        bincode::serialized_size(&Self::default()).unwrap_or(20) as usize
    }
}

impl Default for BlobHeader {
    fn default() -> Self {
        Self::new(ChunkKey::new(0, 0, 0))
    }
}
