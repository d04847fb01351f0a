// ============================================
// Streaming Types - Состояние стриминга
// ============================================

use std::fmt;

/// Где сейчас находится ключ чанка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Нет ни в памяти, ни в работе (может лежать в архиве)
    Unloaded,
    /// Генерируется, восстанавливается или пишется в архив
    Pending,
    /// В памяти
    Resident,
}

/// Снимок счётчиков стриминга
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub resident: usize,
    pub ready: usize,
    pub generating: usize,
    pub restoring: usize,
    pub storing: usize,
    pub archived: usize,
}

impl fmt::Display for StreamingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resident {} (ready {}), generating {}, restoring {}, storing {}, archived {}",
            self.resident, self.ready, self.generating, self.restoring, self.storing, self.archived
        )
    }
}
