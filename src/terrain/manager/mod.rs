// ============================================
// Manager Module - Стриминг чанков вокруг наблюдателя
// ============================================

mod controller;
mod edit;
mod persist;
mod scheduler;
mod types;

pub use controller::StreamingController;
pub use edit::Clipboard;
pub use scheduler::GenerationScheduler;
pub use types::{ChunkState, StreamingStats};
