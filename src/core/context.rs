// ============================================
// Streaming Context - Общее состояние одного мира
// ============================================
// Всё, что раньше было бы глобальным: конфиг, пул, генератор
// и хранилище блобов. Несколько миров в одном процессе - это
// просто несколько контекстов.

use std::sync::Arc;

use crate::save::{BlobStore, DirBlobStore, MemoryBlobStore};
use crate::terrain::generation::WorldGenerator;

use super::config::StreamingConfig;
use super::error::StreamError;
use super::pool::WorkerPool;

#[derive(Clone)]
pub struct StreamingContext {
    pub config: StreamingConfig,
    pub pool: Arc<WorkerPool>,
    pub generator: Arc<WorldGenerator>,
    pub store: Arc<dyn BlobStore>,
}

impl StreamingContext {
    /// Контекст по конфигу: архив в папке или в памяти
    pub fn new(config: StreamingConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let store: Arc<dyn BlobStore> = match &config.archive_dir {
            Some(dir) => {
                log::info!("[ARCHIVE] Archive directory: {}", dir.display());
                Arc::new(DirBlobStore::new(dir)?)
            }
            None => {
                log::info!("[ARCHIVE] No archive directory configured, keeping archive in memory");
                Arc::new(MemoryBlobStore::new())
            }
        };
        Self::with_store(config, store)
    }

    /// Контекст с заданным хранилищем
    pub fn with_store(config: StreamingConfig, store: Arc<dyn BlobStore>) -> Result<Self, StreamError> {
        config.validate()?;
        let pool = WorkerPool::new(config.worker_threads)?;
        log::info!(
            "[STREAM] {} workers, load radius {}, unload radius {}, generator {}",
            pool.threads(),
            config.load_radius,
            config.unload_radius(),
            config.generator.kind()
        );
        Ok(Self {
            generator: Arc::new(config.generator.clone()),
            pool: Arc::new(pool),
            store,
            config,
        })
    }
}
