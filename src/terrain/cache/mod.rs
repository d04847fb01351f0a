mod chunk_key;

pub use chunk_key::ChunkKey;
