// ============================================
// Generation Scheduler - Фоновая генерация чанков
// ============================================
// Один ключ - не больше одной задачи. Задача: заполнить чанк,
// сшить грани с соседями, посчитать меш. Загрузка меша в рендер
// остаётся главному потоку.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{JobTicket, WorkerPool};
use crate::terrain::cache::ChunkKey;
use crate::terrain::generation::WorldGenerator;
use crate::terrain::voxel::{fix_shared_faces, lock_pair, Chunk, ChunkHandle};

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct GenerationScheduler {
    pool: Arc<WorkerPool>,
    generator: Arc<WorldGenerator>,
    in_progress: Mutex<HashMap<ChunkKey, JobTicket>>,
    completed: Arc<Mutex<Vec<ChunkHandle>>>,
}

impl GenerationScheduler {
    pub fn new(pool: Arc<WorkerPool>, generator: Arc<WorldGenerator>) -> Self {
        Self {
            pool,
            generator,
            in_progress: Mutex::new(HashMap::new()),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Генерируется ли чанк прямо сейчас
    pub fn is_pending(&self, key: ChunkKey) -> bool {
        lock(&self.in_progress).contains_key(&key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.in_progress).len()
    }

    /// Поставить генерацию пустого чанка. `neighbours` - соседи,
    /// которые уже в памяти: с ними сшиваются грани на границе.
    pub fn dispatch(&self, neighbours: Vec<ChunkHandle>, chunk: Chunk) {
        let key = chunk.key();
        let mut in_progress = lock(&self.in_progress);
        assert!(!in_progress.contains_key(&key), "chunk {} dispatched twice", key);

        let generator = self.generator.clone();
        let completed = self.completed.clone();
        let handle = ChunkHandle::new(chunk);
        let ticket = self.pool.spawn(move || {
            generator.populate(&mut handle.lock());

            for neighbour in &neighbours {
                let (mut chunk, mut neighbour) = lock_pair(&handle, neighbour);
                fix_shared_faces(&mut chunk, &mut neighbour);
            }

            handle.lock().prepare_mesh();
            log::trace!("[GEN] Generated chunk {}", key);
            lock(&completed).push(handle);
        });
        in_progress.insert(key, ticket);
    }

    /// Забрать готовые чанки
    pub fn drain(&self) -> Vec<ChunkHandle> {
        let mut in_progress = lock(&self.in_progress);
        let finished: Vec<ChunkKey> = in_progress
            .iter()
            .filter(|(_, ticket)| ticket.is_finished())
            .map(|(key, _)| *key)
            .collect();
        for key in &finished {
            in_progress.remove(key);
        }

        let chunks = std::mem::take(&mut *lock(&self.completed));
        for chunk in &chunks {
            in_progress.remove(&chunk.key());
        }
        drop(in_progress);

        for key in finished {
            if !chunks.iter().any(|c| c.key() == key) {
                log::warn!("[GEN] Generation of chunk {} produced nothing, it will be retried", key);
            }
        }
        chunks
    }
}
