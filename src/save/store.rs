// ============================================
// Blob Store - Где лежат архивные чанки
// ============================================

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::terrain::cache::ChunkKey;

/// Ошибки архива
#[derive(Debug)]
pub enum ArchiveError {
    Io(std::io::Error),
    Serialize(String),
    Deserialize(String),
    Compression(String),
    InvalidMagic,
    UnsupportedVersion(u32),
    /// Блоб короче, чем должен быть
    Truncated(usize),
    /// В блобе лежит другой чанк
    KeyMismatch { expected: ChunkKey, found: ChunkKey },
    UnknownBlock(u8),
    /// Нет такого блоба
    Missing(String),
}

impl From<std::io::Error> for ArchiveError {
    fn from(e: std::io::Error) -> Self {
        ArchiveError::Io(e)
    }
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Io(e) => write!(f, "archive I/O error: {}", e),
            ArchiveError::Serialize(e) => write!(f, "serialize error: {}", e),
            ArchiveError::Deserialize(e) => write!(f, "deserialize error: {}", e),
            ArchiveError::Compression(e) => write!(f, "compression error: {}", e),
            ArchiveError::InvalidMagic => write!(f, "not a chunk blob (bad magic)"),
            ArchiveError::UnsupportedVersion(v) => write!(f, "unsupported blob version {}", v),
            ArchiveError::Truncated(len) => write!(f, "truncated blob ({} bytes)", len),
            ArchiveError::KeyMismatch { expected, found } => {
                write!(f, "blob holds chunk {} instead of {}", found, expected)
            }
            ArchiveError::UnknownBlock(id) => write!(f, "unknown block id {}", id),
            ArchiveError::Missing(name) => write!(f, "blob {} not found", name),
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Ссылка на сохранённый блоб (имя внутри хранилища)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Хранилище блобов. Вызывается только из фоновых задач и экспорта.
pub trait BlobStore: Send + Sync {
    /// Записать блоб чанка, вернуть ссылку
    fn write(&self, key: ChunkKey, bytes: &[u8]) -> Result<BlobRef, ArchiveError>;

    fn read(&self, blob: &BlobRef) -> Result<Vec<u8>, ArchiveError>;

    fn delete(&self, blob: &BlobRef) -> Result<(), ArchiveError>;
}

/// Один файл на блоб в папке
pub struct DirBlobStore {
    dir: PathBuf,
}

impl DirBlobStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, blob: &BlobRef) -> PathBuf {
        self.dir.join(blob.name())
    }
}

impl BlobStore for DirBlobStore {
    fn write(&self, key: ChunkKey, bytes: &[u8]) -> Result<BlobRef, ArchiveError> {
        let blob = BlobRef::new(key.file_name());
        let path = self.path(&blob);
        // Сначала во временный файл: недописанный блоб не подменит старый
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(blob)
    }

    fn read(&self, blob: &BlobRef) -> Result<Vec<u8>, ArchiveError> {
        match fs::read(self.path(blob)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ArchiveError::Missing(blob.name().to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, blob: &BlobRef) -> Result<(), ArchiveError> {
        match fs::remove_file(self.path(blob)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ArchiveError::Missing(blob.name().to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Блобы в памяти (архив без папки, тесты)
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn write(&self, key: ChunkKey, bytes: &[u8]) -> Result<BlobRef, ArchiveError> {
        let blob = BlobRef::new(key.file_name());
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(blob.name().to_string(), bytes.to_vec());
        Ok(blob)
    }

    fn read(&self, blob: &BlobRef) -> Result<Vec<u8>, ArchiveError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(blob.name())
            .cloned()
            .ok_or_else(|| ArchiveError::Missing(blob.name().to_string()))
    }

    fn delete(&self, blob: &BlobRef) -> Result<(), ArchiveError> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(blob.name())
            .map(|_| ())
            .ok_or_else(|| ArchiveError::Missing(blob.name().to_string()))
    }
}
