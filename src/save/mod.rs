// ============================================
// Save System - Архив чанков и бандлы мира
// ============================================
// Блоб чанка: bincode заголовок + ZSTD тело

mod archiver;
mod bundle;
mod chunk;
mod header;
mod store;

pub use archiver::ColdStorageArchiver;
pub use bundle::{read_entry, read_index, BundleEntry, BundleIndex, BundleWriter, INDEX_FILE};
pub use chunk::{decode_chunk, encode_chunk, read_header};
pub use header::{BlobHeader, BLOB_VERSION, MAGIC_NUMBER};
pub use store::{ArchiveError, BlobRef, BlobStore, DirBlobStore, MemoryBlobStore};

#[cfg(test)]
pub(crate) use archiver::tests::FailingStore;
