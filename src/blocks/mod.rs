// ============================================
// Библиотека блоков
// ============================================

mod types;

pub use types::*;
