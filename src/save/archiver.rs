// ============================================
// Cold Storage Archiver - Архив выгруженных чанков
// ============================================
// Изменённые чанки при выгрузке уходят в блобы, при возврате
// игрока восстанавливаются. Запись и чтение идут на пуле
// воркеров, главный поток только ставит задачи и забирает
// готовые чанки через drain().
//
// Каждая коллекция под своим Mutex, I/O под локом не делается.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{JobTicket, WorkerPool};
use crate::terrain::cache::ChunkKey;
use crate::terrain::voxel::{Chunk, ChunkHandle};

use super::chunk::{decode_chunk, encode_chunk};
use super::store::{ArchiveError, BlobRef, BlobStore};

type ArchiveMap = HashMap<ChunkKey, BlobRef>;

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Забрать завершённые тикеты, вернуть их ключи
fn reap(jobs: &Mutex<HashMap<ChunkKey, JobTicket>>) -> Vec<ChunkKey> {
    let mut jobs = lock(jobs);
    let finished: Vec<ChunkKey> = jobs
        .iter()
        .filter(|(_, ticket)| ticket.is_finished())
        .map(|(key, _)| *key)
        .collect();
    for key in &finished {
        jobs.remove(key);
    }
    finished
}

pub struct ColdStorageArchiver {
    pool: Arc<WorkerPool>,
    store: Arc<dyn BlobStore>,
    /// key -> блоб выгруженного чанка
    archive: Arc<Mutex<ArchiveMap>>,
    /// Идёт запись блоба
    storing: Mutex<HashMap<ChunkKey, JobTicket>>,
    /// Идёт восстановление
    restoring: Mutex<HashMap<ChunkKey, JobTicket>>,
    /// Восстановленные чанки, ждут drain()
    completed: Arc<Mutex<Vec<ChunkHandle>>>,
}

impl ColdStorageArchiver {
    pub fn new(pool: Arc<WorkerPool>, store: Arc<dyn BlobStore>) -> Self {
        Self {
            pool,
            store,
            archive: Arc::new(Mutex::new(HashMap::new())),
            storing: Mutex::new(HashMap::new()),
            restoring: Mutex::new(HashMap::new()),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Есть ли чанк в архиве
    pub fn contains(&self, key: ChunkKey) -> bool {
        lock(&self.archive).contains_key(&key)
    }

    /// Чанк сейчас пишется или читается
    pub fn is_busy(&self, key: ChunkKey) -> bool {
        self.is_storing(key) || self.is_restoring(key)
    }

    pub fn is_storing(&self, key: ChunkKey) -> bool {
        lock(&self.storing).contains_key(&key)
    }

    pub fn is_restoring(&self, key: ChunkKey) -> bool {
        lock(&self.restoring).contains_key(&key)
    }

    /// Выгрузить изменённый чанк в фоне
    pub fn archive(&self, chunk: ChunkHandle) {
        let key = chunk.key();
        assert!(!self.is_busy(key), "chunk {} archived while busy", key);

        let store = self.store.clone();
        let archive = self.archive.clone();
        let ticket = self.pool.spawn(move || {
            let result = {
                let chunk = chunk.lock();
                encode_chunk(&chunk)
            }
            .and_then(|bytes| store.write(key, &bytes));

            match result {
                Ok(blob) => {
                    log::debug!("[ARCHIVE] Archived chunk {} -> {}", key, blob);
                    lock(&archive).insert(key, blob);
                }
                Err(e) => log::error!("[ARCHIVE] Failed to archive chunk {}, edits lost: {}", key, e),
            }
        });
        lock(&self.storing).insert(key, ticket);
    }

    /// Восстановить чанк из архива в фоне. false если его там нет.
    pub fn restore(&self, key: ChunkKey) -> bool {
        assert!(!self.is_busy(key), "chunk {} restored while busy", key);
        let Some(blob) = lock(&self.archive).remove(&key) else {
            return false;
        };

        let store = self.store.clone();
        let completed = self.completed.clone();
        let ticket = self.pool.spawn(move || {
            let chunk = match Self::load(store.as_ref(), &blob, key) {
                Ok(chunk) => chunk,
                Err(e) => {
                    log::error!("[ARCHIVE] Failed to restore chunk {} from {}: {}", key, blob, e);
                    return;
                }
            };
            if let Err(e) = store.delete(&blob) {
                log::warn!("[ARCHIVE] Could not delete blob {}: {}", blob, e);
            }
            lock(&completed).push(ChunkHandle::new(chunk));
        });
        lock(&self.restoring).insert(key, ticket);
        true
    }

    fn load(store: &dyn BlobStore, blob: &BlobRef, key: ChunkKey) -> Result<Chunk, ArchiveError> {
        let bytes = store.read(blob)?;
        let mut chunk = decode_chunk(&bytes, key)?;
        chunk.prepare_mesh();
        Ok(chunk)
    }

    /// Забрать восстановленные чанки
    pub fn drain(&self) -> Vec<ChunkHandle> {
        self.reap_storing();
        let finished = reap(&self.restoring);
        let chunks = std::mem::take(&mut *lock(&self.completed));

        let mut restoring = lock(&self.restoring);
        for chunk in &chunks {
            restoring.remove(&chunk.key());
        }
        drop(restoring);

        for key in finished {
            if !chunks.iter().any(|c| c.key() == key) {
                log::warn!("[ARCHIVE] Restore of chunk {} produced nothing, it will be regenerated", key);
            }
        }
        chunks
    }

    /// Снять завершённые записи. Возвращает сколько ещё пишется.
    pub fn reap_storing(&self) -> usize {
        reap(&self.storing);
        lock(&self.storing).len()
    }

    // --- Доступ для экспорта/импорта мира ---

    /// Снимок архива
    pub fn archived_entries(&self) -> Vec<(ChunkKey, BlobRef)> {
        let mut entries: Vec<_> = lock(&self.archive).iter().map(|(k, b)| (*k, b.clone())).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }

    /// Добавить готовые блобы в архив
    pub fn bulk_insert(&self, entries: impl IntoIterator<Item = (ChunkKey, BlobRef)>) {
        lock(&self.archive).extend(entries);
    }

    pub fn read_blob(&self, blob: &BlobRef) -> Result<Vec<u8>, ArchiveError> {
        self.store.read(blob)
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Забыть архив (блобы остаются в хранилище)
    pub fn reset(&self) {
        lock(&self.archive).clear();
    }

    pub fn archived_count(&self) -> usize {
        lock(&self.archive).len()
    }

    pub fn storing_count(&self) -> usize {
        lock(&self.storing).len()
    }

    pub fn restoring_count(&self) -> usize {
        lock(&self.restoring).len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::blocks::{GOLD, STONE};
    use crate::save::MemoryBlobStore;
    use std::time::{Duration, Instant};

    /// Хранилище, в которое нельзя ничего записать
    pub struct FailingStore;

    impl BlobStore for FailingStore {
        fn write(&self, _key: ChunkKey, _bytes: &[u8]) -> Result<BlobRef, ArchiveError> {
            Err(ArchiveError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }

        fn read(&self, blob: &BlobRef) -> Result<Vec<u8>, ArchiveError> {
            Err(ArchiveError::Missing(blob.name().to_string()))
        }

        fn delete(&self, _blob: &BlobRef) -> Result<(), ArchiveError> {
            Ok(())
        }
    }

    fn archiver() -> (ColdStorageArchiver, Arc<MemoryBlobStore>) {
        let store = Arc::new(MemoryBlobStore::new());
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        (ColdStorageArchiver::new(pool, store.clone()), store)
    }

    fn settle(archiver: &ColdStorageArchiver) -> Vec<ChunkHandle> {
        let start = Instant::now();
        let mut out = Vec::new();
        loop {
            out.extend(archiver.drain());
            if archiver.storing_count() == 0 && archiver.restoring_count() == 0 {
                return out;
            }
            assert!(start.elapsed() < Duration::from_secs(10), "archiver did not settle");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn edited(key: ChunkKey) -> Chunk {
        let mut chunk = Chunk::new(key);
        chunk.set(1, 2, 3, STONE);
        chunk.set(4, 5, 6, GOLD);
        chunk
    }

    #[test]
    fn test_archive_then_restore() {
        let (archiver, store) = archiver();
        let key = ChunkKey::new(3, 0, 3);
        let original = edited(key).block_ids();

        archiver.archive(ChunkHandle::new(edited(key)));
        assert!(archiver.is_busy(key));
        assert!(settle(&archiver).is_empty());
        assert!(archiver.contains(key));
        assert_eq!(store.len(), 1);

        assert!(archiver.restore(key));
        // Запись ушла из карты сразу при постановке задачи
        assert!(!archiver.contains(key));
        assert!(archiver.is_restoring(key));

        let restored = settle(&archiver);
        assert_eq!(restored.len(), 1);
        let chunk = restored[0].lock();
        assert_eq!(chunk.key(), key);
        assert_eq!(chunk.block_ids(), original);
        assert!(chunk.is_modified());
        assert!(!archiver.is_busy(key));
        assert!(store.is_empty());
    }

    #[test]
    fn test_restore_missing_key() {
        let (archiver, _) = archiver();
        assert!(!archiver.restore(ChunkKey::new(9, 0, 9)));
        assert_eq!(archiver.restoring_count(), 0);
    }

    #[test]
    fn test_corrupt_blob_clears_key() {
        let (archiver, store) = archiver();
        let key = ChunkKey::new(0, 0, 1);
        let blob = store.write(key, b"garbage").unwrap();
        archiver.bulk_insert([(key, blob)]);

        assert!(archiver.restore(key));
        assert!(settle(&archiver).is_empty());
        assert!(!archiver.is_busy(key));
        assert!(!archiver.contains(key));
    }

    #[test]
    fn test_failed_write_leaves_key_free() {
        let pool = Arc::new(WorkerPool::new(2).unwrap());
        let archiver = ColdStorageArchiver::new(pool, Arc::new(FailingStore));
        let key = ChunkKey::new(2, 0, -1);

        archiver.archive(ChunkHandle::new(edited(key)));
        assert!(settle(&archiver).is_empty());
        assert!(!archiver.contains(key));
        assert!(!archiver.is_busy(key));
        assert!(!archiver.restore(key));
        assert_eq!(archiver.archived_count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_double_archive_panics() {
        let (archiver, _) = archiver();
        let key = ChunkKey::new(0, 0, 0);
        archiver.archive(ChunkHandle::new(edited(key)));
        archiver.archive(ChunkHandle::new(edited(key)));
    }

    #[test]
    fn test_entries_snapshot_and_reset() {
        let (archiver, _) = archiver();
        archiver.bulk_insert([
            (ChunkKey::new(1, 0, 0), BlobRef::new("b")),
            (ChunkKey::new(0, 0, 0), BlobRef::new("a")),
        ]);
        let entries = archiver.archived_entries();
        assert_eq!(entries[0].0, ChunkKey::new(0, 0, 0));
        assert_eq!(entries.len(), 2);
        archiver.reset();
        assert_eq!(archiver.archived_count(), 0);
    }
}
