// ============================================
// Worker Pool - Ограниченный пул фоновых задач
// ============================================
// Генерация и архивация чанков идут на фиксированном числе
// потоков rayon. Каждая задача возвращает тикет, по которому
// главный поток без блокировки узнаёт, что задача закончилась
// (в том числе паникой).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Тикет фоновой задачи
#[derive(Debug, Clone)]
pub struct JobTicket {
    finished: Arc<AtomicBool>,
}

impl JobTicket {
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Ставит флаг завершения при выходе из задачи, даже при панике
struct FinishGuard(Arc<AtomicBool>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Пул фоновых воркеров
pub struct WorkerPool {
    pool: ThreadPool,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("chunk-worker-{}", i))
            .panic_handler(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!("[STREAM] Worker job panicked: {}", message);
            })
            .build()?;
        Ok(Self { pool, threads })
    }

    /// Запустить задачу в фоне
    pub fn spawn<F>(&self, job: F) -> JobTicket
    where
        F: FnOnce() + Send + 'static,
    {
        let finished = Arc::new(AtomicBool::new(false));
        let guard = FinishGuard(finished.clone());
        self.pool.spawn(move || {
            let _guard = guard;
            job();
        });
        JobTicket { finished }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}
