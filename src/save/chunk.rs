// ============================================
// Chunk Codec - Чанк <-> блоб
// ============================================
// Формат: [BlobHeader][zstd(bincode(ChunkBody))]
// Тело - один байт id на ячейку, 0 = пусто. Маски граней не
// храним: они пересчитываются при восстановлении через set().

use serde::{Deserialize, Serialize};

use crate::blocks::{is_known, AIR};
use crate::terrain::cache::ChunkKey;
use crate::terrain::voxel::{Chunk, CHUNK_HEIGHT, CHUNK_VOLUME, CHUNK_WIDTH};

use super::header::{BlobHeader, BLOB_VERSION, MAGIC_NUMBER};
use super::store::ArchiveError;

/// Уровень сжатия zstd
const COMPRESSION_LEVEL: i32 = 3;

/// Тело блоба (сжимается ZSTD)
#[derive(Debug, Serialize, Deserialize)]
struct ChunkBody {
    ids: Vec<u8>,
}

/// Сериализовать чанк в блоб
pub fn encode_chunk(chunk: &Chunk) -> Result<Vec<u8>, ArchiveError> {
    let header = BlobHeader::new(chunk.key());
    let mut out = bincode::serialize(&header).map_err(|e| ArchiveError::Serialize(e.to_string()))?;

    let body = ChunkBody { ids: chunk.block_ids() };
    let body_bytes = bincode::serialize(&body).map_err(|e| ArchiveError::Serialize(e.to_string()))?;
    let compressed =
        zstd::encode_all(&body_bytes[..], COMPRESSION_LEVEL).map_err(|e| ArchiveError::Compression(e.to_string()))?;

    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Прочитать только заголовок блоба
pub fn read_header(bytes: &[u8]) -> Result<BlobHeader, ArchiveError> {
    let size = BlobHeader::size();
    if bytes.len() < size {
        return Err(ArchiveError::Truncated(bytes.len()));
    }
    let header: BlobHeader =
        bincode::deserialize(&bytes[..size]).map_err(|e| ArchiveError::Deserialize(e.to_string()))?;
    if header.magic != MAGIC_NUMBER {
        return Err(ArchiveError::InvalidMagic);
    }
    if header.version != BLOB_VERSION {
        return Err(ArchiveError::UnsupportedVersion(header.version));
    }
    Ok(header)
}

/// Восстановить чанк из блоба. Чанк считается изменённым.
pub fn decode_chunk(bytes: &[u8], key: ChunkKey) -> Result<Chunk, ArchiveError> {
    let header = read_header(bytes)?;
    if header.key != key {
        return Err(ArchiveError::KeyMismatch { expected: key, found: header.key });
    }

    let body_bytes =
        zstd::decode_all(&bytes[BlobHeader::size()..]).map_err(|e| ArchiveError::Compression(e.to_string()))?;
    let body: ChunkBody = bincode::deserialize(&body_bytes).map_err(|e| ArchiveError::Deserialize(e.to_string()))?;
    if body.ids.len() != CHUNK_VOLUME {
        return Err(ArchiveError::Truncated(body.ids.len()));
    }

    let mut chunk = Chunk::new(key);
    let mut ids = body.ids.iter();
    // Порядок совпадает с индексацией ячеек чанка: y, z, x
    for y in 0..CHUNK_HEIGHT as usize {
        for z in 0..CHUNK_WIDTH as usize {
            for x in 0..CHUNK_WIDTH as usize {
                let id = ids.next().copied().unwrap_or(AIR);
                if id == AIR {
                    continue;
                }
                if !is_known(id) {
                    return Err(ArchiveError::UnknownBlock(id));
                }
                chunk.set(x, y, z, id);
            }
        }
    }
    chunk.mark_modified();
    Ok(chunk)
}
