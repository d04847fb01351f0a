// ============================================
// World Persistence - Экспорт/импорт бандла мира
// ============================================

use std::path::Path;

use ultraviolet::Vec3;

use crate::core::{StreamError, StreamingConfig, StreamingContext};
use crate::save::{encode_chunk, read_entry, read_index, BundleWriter};
use crate::terrain::mesh::MeshSink;

use super::controller::StreamingController;

impl<S: MeshSink> StreamingController<S> {
    /// Сохранить архив и изменённые чанки в папку-бандл.
    /// Возвращает число сохранённых чанков.
    pub fn export_bundle(&mut self, dir: &Path, observer: Vec3) -> Result<usize, StreamError> {
        // Незаписанные блобы иначе не попадут в бандл
        self.flush_archive()?;

        let mut writer = BundleWriter::create(dir)?;
        for (key, blob) in self.archiver.archived_entries() {
            let bytes = self.archiver.read_blob(&blob)?;
            writer.add(key, &bytes)?;
        }
        for handle in self.resident_modified() {
            let bytes = encode_chunk(&handle.lock())?;
            writer.add(handle.key(), &bytes)?;
        }

        let count = writer.finish(&self.context.generator, [observer.x, observer.y, observer.z])?;
        log::info!("[SAVE] Exported {} chunks to {}", count, dir.display());
        Ok(count)
    }

    /// Открыть мир из бандла: генератор берётся из бандла, все
    /// сохранённые чанки ложатся в архив. Возвращает контроллер
    /// и позицию наблюдателя на момент экспорта.
    pub fn import_bundle(mut config: StreamingConfig, sink: S, dir: &Path) -> Result<(Self, Vec3), StreamError> {
        let index = read_index(dir)?;
        config.generator = index.generator.clone();
        let controller = Self::new(StreamingContext::new(config)?, sink);

        let mut entries = Vec::with_capacity(index.chunks.len());
        for entry in &index.chunks {
            let bytes = match read_entry(dir, entry) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("[SAVE] Skipping chunk {} from bundle: {}", entry.n, e);
                    continue;
                }
            };
            let blob = controller.archiver.store().write(entry.key(), &bytes)?;
            entries.push((entry.key(), blob));
        }

        controller.archiver.reset();
        controller.archiver.bulk_insert(entries);
        log::info!(
            "[SAVE] Imported {} chunks from {}",
            controller.archiver.archived_count(),
            dir.display()
        );

        let [x, y, z] = index.observer;
        Ok((controller, Vec3::new(x, y, z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BRICK, GOLD};
    use crate::terrain::block_pos::BlockPos;
    use crate::terrain::cache::ChunkKey;
    use crate::terrain::manager::controller::tests::{config, controller, settle};
    use crate::terrain::manager::ChunkState;
    use crate::terrain::mesh::HeadlessMeshSink;

    #[test]
    fn test_export_import_roundtrip() {
        let mut c = controller(32.0);
        let home = Vec3::new(0.0, 0.0, 0.0);
        c.prime(home).unwrap();

        // Один чанк уедет в архив, другой останется в памяти
        c.set_block(BlockPos::new(1, 20, 1), GOLD).unwrap();
        settle(&mut c, Vec3::new(500.0, 0.0, 0.0));
        c.set_block(BlockPos::new(510, 20, 3), BRICK).unwrap();
        let archived = ChunkKey::new(0, 0, 0);
        let resident = BlockPos::new(510, 20, 3).chunk_key();
        assert!(c.archiver().contains(archived));

        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("world");
        let count = c.export_bundle(&bundle, Vec3::new(500.0, 0.0, 0.0)).unwrap();
        assert_eq!(count, 2);

        let config = StreamingConfig { generator: Default::default(), ..config(32.0) };
        let (mut imported, observer) =
            StreamingController::import_bundle(config, HeadlessMeshSink::new(), &bundle).unwrap();
        assert_eq!(observer, Vec3::new(500.0, 0.0, 0.0));
        assert_eq!(imported.config().generator, c.config().generator);
        assert!(imported.archiver().contains(archived));
        assert!(imported.archiver().contains(resident));

        settle(&mut imported, observer);
        assert_eq!(imported.state(resident), ChunkState::Resident);
        assert_eq!(imported.block_at(BlockPos::new(510, 20, 3)), Some(BRICK));

        settle(&mut imported, home);
        assert_eq!(imported.block_at(BlockPos::new(1, 20, 1)), Some(GOLD));
    }

    #[test]
    fn test_import_missing_bundle_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = StreamingController::import_bundle(config(32.0), HeadlessMeshSink::new(), dir.path());
        assert!(matches!(result, Err(StreamError::Archive(_))));
    }
}
