// ============================================
// Stream Error - Ошибки подсистемы стриминга
// ============================================

use std::fmt;

use super::config::ConfigError;
use crate::save::ArchiveError;
use crate::terrain::cache::ChunkKey;

#[derive(Debug)]
pub enum StreamError {
    Config(ConfigError),
    Archive(ArchiveError),
    Io(std::io::Error),
    /// Не удалось поднять пул воркеров
    Pool(String),
    /// prime() не дождался чанков
    Timeout { waited_ms: u64, pending: usize },
    /// Правка в чанке, которого нет в памяти
    NotResident(ChunkKey),
    /// Y вне мира
    OutOfWorld(i32),
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        StreamError::Io(e)
    }
}

impl From<ConfigError> for StreamError {
    fn from(e: ConfigError) -> Self {
        StreamError::Config(e)
    }
}

impl From<ArchiveError> for StreamError {
    fn from(e: ArchiveError) -> Self {
        StreamError::Archive(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for StreamError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        StreamError::Pool(e.to_string())
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Config(e) => write!(f, "{}", e),
            StreamError::Archive(e) => write!(f, "{}", e),
            StreamError::Io(e) => write!(f, "I/O error: {}", e),
            StreamError::Pool(e) => write!(f, "worker pool error: {}", e),
            StreamError::Timeout { waited_ms, pending } => {
                write!(f, "timed out after {} ms with {} chunks still pending", waited_ms, pending)
            }
            StreamError::NotResident(key) => write!(f, "chunk {} is not resident", key),
            StreamError::OutOfWorld(y) => write!(f, "y = {} is outside the world", y),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Config(e) => Some(e),
            StreamError::Archive(e) => Some(e),
            StreamError::Io(e) => Some(e),
            _ => None,
        }
    }
}
