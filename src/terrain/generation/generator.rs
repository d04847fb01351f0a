// ============================================
// World Generator - Процедурное заполнение чанков
// ============================================
// Закрытый набор генераторов. Каждый отвечает на один вопрос:
// какая колонна блоков стоит в мировой точке (x, z).

use serde::{Deserialize, Serialize};

use crate::blocks::{BlockType, COBBLE, DIRT, GRASS, STONE};
use crate::terrain::voxel::{Chunk, CHUNK_HEIGHT, CHUNK_WIDTH};

use super::noise::fbm2d;

/// Октавы шума для холмов
const HILL_OCTAVES: u32 = 3;

/// Слой плоского мира: тип блока и толщина
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub block: BlockType,
    pub thickness: i32,
}

impl Layer {
    pub const fn new(block: BlockType, thickness: i32) -> Self {
        Self { block, thickness }
    }
}

/// Полоса материала в колонне: блок до высоты `top` (не включая)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub block: BlockType,
    pub top: i32,
}

/// Колонна блоков: высота + три полосы снизу вверх
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub height: i32,
    pub bands: [Band; 3],
}

impl Column {
    /// Блок на высоте y, None если выше поверхности
    pub fn block_at(&self, y: i32) -> Option<BlockType> {
        if y < 0 || y >= self.height {
            return None;
        }
        self.bands.iter().find(|band| y < band.top).map(|band| band.block)
    }
}

/// Генератор мира
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorldGenerator {
    /// Плоский мир из трёх слоёв
    Flat { bottom: Layer, middle: Layer, top: Layer },
    /// Холмы: h = height + noise * amplitude
    Hills {
        seed: i64,
        height: i32,
        amplitude: i32,
        frequency: f32,
    },
}

impl Default for WorldGenerator {
    fn default() -> Self {
        Self::hills(0)
    }
}

impl WorldGenerator {
    /// Плоский мир по умолчанию: камень, булыжник, трава
    pub fn flat() -> Self {
        Self::Flat {
            bottom: Layer::new(STONE, 4),
            middle: Layer::new(COBBLE, 3),
            top: Layer::new(GRASS, 1),
        }
    }

    /// Холмы с параметрами по умолчанию
    pub fn hills(seed: i64) -> Self {
        Self::Hills {
            seed,
            height: 30,
            amplitude: 15,
            frequency: 100.0,
        }
    }

    /// Колонна в мировой точке (x, z). Чистая функция.
    pub fn column(&self, world_x: i32, world_z: i32) -> Column {
        match *self {
            Self::Flat { bottom, middle, top } => {
                let b = bottom.thickness.max(0);
                let m = b + middle.thickness.max(0);
                let t = m + top.thickness.max(0);
                Column {
                    height: t,
                    bands: [
                        Band { block: bottom.block, top: b },
                        Band { block: middle.block, top: m },
                        Band { block: top.block, top: t },
                    ],
                }
            }
            Self::Hills { seed, height, amplitude, frequency } => {
                let frequency = if frequency > 0.0 { frequency } else { 1.0 };
                let sample = fbm2d(seed, world_x as f32 / frequency, world_z as f32 / frequency, HILL_OCTAVES);
                let h = height + (sample * amplitude as f32) as i32;
                Column {
                    height: h,
                    bands: [
                        Band { block: STONE, top: h - 5 },
                        Band { block: DIRT, top: h - 1 },
                        Band { block: GRASS, top: h },
                    ],
                }
            }
        }
    }

    /// Заполнить пустой чанк. Результат - нетронутый чанк (modified = false).
    pub fn populate(&self, chunk: &mut Chunk) {
        assert!(chunk.is_empty(), "populate() on non-empty chunk {}", chunk.key());
        let [ox, _, oz] = chunk.key().origin();

        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_WIDTH {
                let column = self.column(ox + x, oz + z);
                for y in 0..column.height.min(CHUNK_HEIGHT) {
                    if let Some(block) = column.block_at(y) {
                        chunk.set(x as usize, y as usize, z as usize, block);
                    }
                }
            }
        }
        chunk.mark_pristine();
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Flat { .. } => "flat",
            Self::Hills { .. } => "hills",
        }
    }
}
