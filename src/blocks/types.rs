// ============================================
// Block Types - Каталог блоков
// ============================================
// BlockType = u8 (numeric id). 0 зарезервирован под пустоту,
// поэтому id влезает в архив как один байт на воксель.

/// BlockType - просто numeric id блока
pub type BlockType = u8;

// Константы для всех блоков (id совпадают с id в архивных чанках)
pub const AIR: BlockType = 0;
pub const GRASS: BlockType = 1;
pub const STONE: BlockType = 2;
pub const DIRT: BlockType = 3;
pub const PLANKS: BlockType = 4;
pub const BRICK: BlockType = 5;
pub const COBBLE: BlockType = 6;
pub const SAND: BlockType = 7;
pub const WOOL_WHITE: BlockType = 8;
pub const LOG: BlockType = 9;
pub const IRON: BlockType = 10;
pub const GOLD: BlockType = 11;
pub const SAND_STONE: BlockType = 12;
pub const MUD: BlockType = 13;

/// Все непустые блоки в порядке id
pub const ALL_BLOCKS: [BlockType; 13] = [
    GRASS, STONE, DIRT, PLANKS, BRICK, COBBLE, SAND, WOOL_WHITE, LOG, IRON, GOLD, SAND_STONE, MUD,
];

/// Размер текстурного атласа в пикселях
pub const ATLAS_SIZE: u32 = 256;
/// Размер одной ячейки атласа
pub const ATLAS_CELL: u32 = 16;

/// Проверка: известный ли id (для валидации архивов)
#[inline]
pub fn is_known(block: BlockType) -> bool {
    (GRASS..=MUD).contains(&block)
}

/// Проверка: блок светится? Такие блоки дают точечный источник света
#[inline]
pub fn is_light_emitting(block: BlockType) -> bool {
    block == GOLD
}

/// Ячейка атласа (столбец, строка) для блока
#[inline]
pub fn atlas_cell(block: BlockType) -> (u32, u32) {
    match block {
        GRASS => (1, 1),
        STONE => (1, 0),
        DIRT => (2, 0),
        PLANKS => (4, 0),
        BRICK => (7, 0),
        COBBLE => (0, 1),
        SAND => (2, 1),
        WOOL_WHITE => (0, 4),
        LOG => (4, 1),
        IRON => (6, 1),
        GOLD => (7, 1),
        SAND_STONE => (0, 11),
        MUD => (8, 6),
        _ => (9, 1),
    }
}

/// Левый верхний угол ячейки атласа в UV координатах
#[inline]
pub fn atlas_uv(block: BlockType) -> [f32; 2] {
    let inc = ATLAS_CELL as f32 / ATLAS_SIZE as f32;
    let (col, row) = atlas_cell(block);
    [col as f32 * inc, row as f32 * inc]
}

/// Получить имя блока
pub fn block_name(block: BlockType) -> &'static str {
    match block {
        AIR => "air",
        GRASS => "grass",
        STONE => "stone",
        DIRT => "dirt",
        PLANKS => "planks",
        BRICK => "brick",
        COBBLE => "cobble",
        SAND => "sand",
        WOOL_WHITE => "wool_white",
        LOG => "log",
        IRON => "iron",
        GOLD => "gold",
        SAND_STONE => "sand_stone",
        MUD => "mud",
        _ => "unknown",
    }
}

/// Обратное к block_name (для конфигов)
pub fn block_by_name(name: &str) -> Option<BlockType> {
    ALL_BLOCKS.iter().copied().find(|&b| block_name(b) == name)
}
