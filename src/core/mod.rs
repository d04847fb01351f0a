// ============================================
// Core Module - Конфиг, пул воркеров, контекст
// ============================================

mod config;
mod context;
mod error;
mod pool;

pub use config::{ConfigError, StreamingConfig, DEFAULT_RENDER_DISTANCE};
pub use context::StreamingContext;
pub use error::StreamError;
pub use pool::{JobTicket, WorkerPool};
