// ============================================
// World Edits - Правки блоков в загруженном мире
// ============================================
// Правки адресуются мировыми координатами блока. Правка на
// границе чанка сразу пересчитывает стык с соседом, затронутые
// меши перестраиваются в конце операции.

use std::collections::{BTreeSet, HashMap};

use ultraviolet::Vec3;

use crate::blocks::{BlockType, AIR};
use crate::core::StreamError;
use crate::terrain::block_pos::BlockPos;
use crate::terrain::cache::ChunkKey;
use crate::terrain::mesh::MeshSink;
use crate::terrain::voxel::fixup::across;
use crate::terrain::voxel::{lock_pair, sync_shared_cell, Face, CHUNK_HEIGHT};

use super::controller::StreamingController;

/// Шаг трассировки линии
const LINE_STEP: f32 = 0.1;

/// Скопированный кусок мира: смещение от минимального угла -> блок
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    pub blocks: HashMap<[i32; 3], BlockType>,
}

impl Clipboard {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Упорядоченные углы коробки, y обрезан по миру
fn bounds(a: BlockPos, b: BlockPos) -> (BlockPos, BlockPos) {
    (
        BlockPos::new(a.x.min(b.x), a.y.min(b.y).max(0), a.z.min(b.z)),
        BlockPos::new(a.x.max(b.x), a.y.max(b.y).min(CHUNK_HEIGHT - 1), a.z.max(b.z)),
    )
}

fn box_positions(a: BlockPos, b: BlockPos) -> impl Iterator<Item = BlockPos> {
    let (min, max) = bounds(a, b);
    (min.x..=max.x).flat_map(move |x| {
        (min.y..=max.y).flat_map(move |y| (min.z..=max.z).map(move |z| BlockPos::new(x, y, z)))
    })
}

impl<S: MeshSink> StreamingController<S> {
    /// Блок в мировой позиции. None - пусто или чанк не в памяти.
    pub fn block_at(&self, pos: BlockPos) -> Option<BlockType> {
        let (x, y, z) = pos.local()?;
        let chunk = self.resident.get(&pos.chunk_key())?.lock();
        chunk.get(x, y, z).map(|voxel| voxel.block)
    }

    /// Поставить блок (AIR = убрать). true если что-то поменялось.
    pub fn set_block(&mut self, pos: BlockPos, block: BlockType) -> Result<bool, StreamError> {
        let mut dirty = BTreeSet::new();
        let changed = self.apply(pos, block, None, &mut dirty)?;
        self.remesh(&dirty);
        Ok(changed)
    }

    /// Убрать блок, вернуть его тип
    pub fn remove_block(&mut self, pos: BlockPos) -> Result<Option<BlockType>, StreamError> {
        let previous = self.block_at(pos);
        let mut dirty = BTreeSet::new();
        self.apply(pos, AIR, None, &mut dirty)?;
        self.remesh(&dirty);
        Ok(previous)
    }

    /// Заполнить коробку блоком (углы включительно)
    pub fn fill_box(&mut self, a: BlockPos, b: BlockPos, block: BlockType) -> usize {
        self.apply_all(box_positions(a, b), block, None)
    }

    /// Очистить коробку
    pub fn remove_box(&mut self, a: BlockPos, b: BlockPos) -> usize {
        self.apply_all(box_positions(a, b), AIR, None)
    }

    /// Заменить в коробке блоки `from` на `to`
    pub fn replace_box(&mut self, a: BlockPos, b: BlockPos, from: BlockType, to: BlockType) -> usize {
        if from == AIR {
            return 0;
        }
        self.apply_all(box_positions(a, b), to, Some(from))
    }

    /// Шар (или сфера толщиной в блок, если hollow)
    pub fn set_sphere(&mut self, center: Vec3, radius: f32, block: BlockType, hollow: bool) -> usize {
        let r = radius.ceil() as i32;
        let c = BlockPos::from_vec(center);
        let positions: Vec<BlockPos> = box_positions(c.offset(-r, -r, -r), c.offset(r, r, r))
            .filter(|pos| {
                let d = (Vec3::new(pos.x as f32, pos.y as f32, pos.z as f32) - center).mag();
                d <= radius && !(hollow && d < radius - 1.0)
            })
            .collect();
        self.apply_all(positions, block, None)
    }

    /// Линия блоков от `from` до `to`
    pub fn set_line(&mut self, from: Vec3, to: Vec3, block: BlockType) -> usize {
        let ray = to - from;
        let length = ray.mag();
        let steps = (length / LINE_STEP) as usize;
        let direction = if length > 0.0 { ray / length } else { Vec3::zero() };

        let mut positions: Vec<BlockPos> = Vec::with_capacity(steps + 1);
        for i in 0..=steps {
            let pos = BlockPos::from_vec(from + direction * (i as f32 * LINE_STEP));
            if positions.last() != Some(&pos) {
                positions.push(pos);
            }
        }
        self.apply_all(positions, block, None)
    }

    /// Скопировать непустые блоки коробки
    pub fn copy_box(&self, a: BlockPos, b: BlockPos) -> Clipboard {
        let (min, _) = bounds(a, b);
        let blocks = box_positions(a, b)
            .filter_map(|pos| {
                self.block_at(pos)
                    .map(|block| ([pos.x - min.x, pos.y - min.y, pos.z - min.z], block))
            })
            .collect();
        Clipboard { blocks }
    }

    /// Вставить скопированное с минимальным углом в `at`
    pub fn paste(&mut self, clipboard: &Clipboard, at: BlockPos) -> usize {
        let mut changed = 0;
        let mut dirty = BTreeSet::new();
        for (offset, block) in &clipboard.blocks {
            let pos = at.offset(offset[0], offset[1], offset[2]);
            if let Ok(true) = self.apply(pos, *block, None, &mut dirty) {
                changed += 1;
            }
        }
        self.remesh(&dirty);
        changed
    }

    fn apply_all(
        &mut self,
        positions: impl IntoIterator<Item = BlockPos>,
        block: BlockType,
        only: Option<BlockType>,
    ) -> usize {
        let mut changed = 0;
        let mut dirty = BTreeSet::new();
        for pos in positions {
            // Незагруженные чанки пропускаются
            if let Ok(true) = self.apply(pos, block, only, &mut dirty) {
                changed += 1;
            }
        }
        self.remesh(&dirty);
        changed
    }

    /// Одна правка без перестройки меша. Затронутые чанки - в `dirty`.
    fn apply(
        &mut self,
        pos: BlockPos,
        block: BlockType,
        only: Option<BlockType>,
        dirty: &mut BTreeSet<ChunkKey>,
    ) -> Result<bool, StreamError> {
        let (x, y, z) = pos.local().ok_or(StreamError::OutOfWorld(pos.y))?;
        let key = pos.chunk_key();
        let handle = self.resident.get(&key).ok_or(StreamError::NotResident(key))?.clone();

        let changed = {
            let mut chunk = handle.lock();
            let current = chunk.block_at(x, y, z);
            if only.is_some_and(|from| from != current) || current == block {
                false
            } else if block == AIR {
                chunk.remove(x, y, z).is_some()
            } else {
                chunk.set(x, y, z, block);
                true
            }
        };
        if !changed {
            return Ok(false);
        }
        dirty.insert(key);

        // Стык с соседним чанком
        for side in Face::SIDES {
            if across(x, z, side).is_none() {
                continue;
            }
            let (dx, _, dz) = side.offset();
            let neighbour_key = key.offset(dx, dz);
            let Some(neighbour) = self.resident.get(&neighbour_key) else { continue };
            let (mut chunk, mut neighbour) = lock_pair(&handle, neighbour);
            if sync_shared_cell(&mut chunk, &mut neighbour, x, y, z) {
                dirty.insert(neighbour_key);
            }
        }
        Ok(true)
    }

    fn remesh(&mut self, dirty: &BTreeSet<ChunkKey>) {
        for key in dirty {
            if let Some(handle) = self.resident.get(key) {
                handle.lock().realize(&mut self.sink);
            }
        }
    }
}
