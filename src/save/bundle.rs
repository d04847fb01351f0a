// ============================================
// World Bundle - Экспорт/импорт мира
// ============================================
// Папка с world.json (генератор, позиция наблюдателя, индекс
// чанков) и одним блобом на каждый сохранённый чанк.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::terrain::cache::ChunkKey;
use crate::terrain::generation::WorldGenerator;

use super::chunk::read_header;
use super::store::ArchiveError;

/// Имя индекса внутри бандла
pub const INDEX_FILE: &str = "world.json";

/// Запись индекса: позиция чанка в сетке и имя блоба
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub p: [i32; 3],
    pub n: String,
}

impl BundleEntry {
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.p[0], self.p[1], self.p[2])
    }
}

/// world.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleIndex {
    pub generator: WorldGenerator,
    pub observer: [f32; 3],
    pub chunks: Vec<BundleEntry>,
}

/// Писатель бандла: блобы по одному, индекс в конце
pub struct BundleWriter<'a> {
    dir: &'a Path,
    entries: Vec<BundleEntry>,
}

impl<'a> BundleWriter<'a> {
    pub fn create(dir: &'a Path) -> Result<Self, ArchiveError> {
        fs::create_dir_all(dir)?;
        Ok(Self { dir, entries: Vec::new() })
    }

    /// Положить блоб чанка
    pub fn add(&mut self, key: ChunkKey, bytes: &[u8]) -> Result<(), ArchiveError> {
        let name = key.file_name();
        fs::write(self.dir.join(&name), bytes)?;
        self.entries.push(BundleEntry { p: [key.x, key.y, key.z], n: name });
        Ok(())
    }

    /// Записать world.json, вернуть число чанков
    pub fn finish(mut self, generator: &WorldGenerator, observer: [f32; 3]) -> Result<usize, ArchiveError> {
        self.entries.sort_by_key(|e| e.key());
        let count = self.entries.len();
        let index = BundleIndex {
            generator: generator.clone(),
            observer,
            chunks: self.entries,
        };
        let json = serde_json::to_string_pretty(&index).map_err(|e| ArchiveError::Serialize(e.to_string()))?;
        fs::write(self.dir.join(INDEX_FILE), json)?;
        Ok(count)
    }
}

/// Прочитать индекс бандла
pub fn read_index(dir: &Path) -> Result<BundleIndex, ArchiveError> {
    let text = fs::read_to_string(dir.join(INDEX_FILE))?;
    serde_json::from_str(&text).map_err(|e| ArchiveError::Deserialize(e.to_string()))
}

/// Прочитать блоб из бандла, проверив что он того чанка
pub fn read_entry(dir: &Path, entry: &BundleEntry) -> Result<Vec<u8>, ArchiveError> {
    // Имя из индекса - только имя файла, без путей
    if entry.n.contains(&['/', '\\'][..]) || entry.n.starts_with('.') {
        return Err(ArchiveError::Missing(entry.n.clone()));
    }
    let bytes = fs::read(dir.join(&entry.n))?;
    let header = read_header(&bytes)?;
    if header.key != entry.key() {
        return Err(ArchiveError::KeyMismatch { expected: entry.key(), found: header.key });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::STONE;
    use crate::save::encode_chunk;
    use crate::terrain::voxel::Chunk;

    fn blob(key: ChunkKey) -> Vec<u8> {
        let mut chunk = Chunk::new(key);
        chunk.set(0, 0, 0, STONE);
        encode_chunk(&chunk).unwrap()
    }

    #[test]
    fn test_write_read_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BundleWriter::create(dir.path()).unwrap();
        writer.add(ChunkKey::new(2, 0, 0), &blob(ChunkKey::new(2, 0, 0))).unwrap();
        writer.add(ChunkKey::new(-1, 0, 5), &blob(ChunkKey::new(-1, 0, 5))).unwrap();
        let count = writer.finish(&WorldGenerator::hills(11), [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(count, 2);

        let index = read_index(dir.path()).unwrap();
        assert_eq!(index.generator, WorldGenerator::hills(11));
        assert_eq!(index.observer, [1.0, 2.0, 3.0]);
        assert_eq!(index.chunks[0], BundleEntry { p: [-1, 0, 5], n: "-1_0_5.chunk".to_string() });

        for entry in &index.chunks {
            assert!(read_entry(dir.path(), entry).is_ok());
        }
    }

    #[test]
    fn test_index_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BundleWriter::create(dir.path()).unwrap();
        writer.add(ChunkKey::new(1, 0, 1), &blob(ChunkKey::new(1, 0, 1))).unwrap();
        writer.finish(&WorldGenerator::flat(), [0.0; 3]).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap()).unwrap();
        assert_eq!(json["chunks"][0]["p"], serde_json::json!([1, 0, 1]));
        assert_eq!(json["chunks"][0]["n"], "1_0_1.chunk");
        assert_eq!(json["generator"]["kind"], "flat");
    }

    #[test]
    fn test_entry_with_wrong_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.chunk"), blob(ChunkKey::new(0, 0, 0))).unwrap();
        let entry = BundleEntry { p: [5, 0, 5], n: "x.chunk".to_string() };
        assert!(matches!(read_entry(dir.path(), &entry), Err(ArchiveError::KeyMismatch { .. })));

        let escape = BundleEntry { p: [0, 0, 0], n: "../x.chunk".to_string() };
        assert!(matches!(read_entry(dir.path(), &escape), Err(ArchiveError::Missing(_))));
    }
}
