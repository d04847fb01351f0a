// ============================================
// Face Fix-up - Стыки соседних чанков
// ============================================
// Внутри чанка грани скрываются при set(). На границе чанка
// соседа нет, поэтому грань остаётся видимой, пока оба чанка
// не окажутся в памяти и не пройдут fix-up.

use crate::terrain::cache::ChunkKey;

use super::chunk::Chunk;
use super::constants::{CHUNK_HEIGHT, CHUNK_WIDTH};
use super::faces::Face;

/// Сторона чанка `a`, которой он касается чанка `b`
pub fn shared_side(a: ChunkKey, b: ChunkKey) -> Option<Face> {
    if a.y != b.y {
        return None;
    }
    match (b.x - a.x, b.z - a.z) {
        (1, 0) => Some(Face::PosX),
        (-1, 0) => Some(Face::NegX),
        (0, 1) => Some(Face::PosZ),
        (0, -1) => Some(Face::NegZ),
        _ => None,
    }
}

/// Ячейка по ту сторону границы: локальные (x, z) в чанке-соседе.
/// None если (x, z) не лежит на этой стороне.
pub fn across(x: usize, z: usize, side: Face) -> Option<(usize, usize)> {
    let last = CHUNK_WIDTH as usize - 1;
    match side {
        Face::PosX if x == last => Some((0, z)),
        Face::NegX if x == 0 => Some((last, z)),
        Face::PosZ if z == last => Some((x, 0)),
        Face::NegZ if z == 0 => Some((x, last)),
        _ => None,
    }
}

/// Пары (x, z) ячеек вдоль общей стороны: (в `a`, в `b`)
fn boundary_cells(side: Face) -> impl Iterator<Item = ((usize, usize), (usize, usize))> {
    let last = CHUNK_WIDTH as usize - 1;
    (0..CHUNK_WIDTH as usize).filter_map(move |i| {
        let a = match side {
            Face::PosX => (last, i),
            Face::NegX => (0, i),
            Face::PosZ => (i, last),
            Face::NegZ => (i, 0),
            Face::PosY | Face::NegY => return None,
        };
        across(a.0, a.1, side).map(|b| (a, b))
    })
}

/// Выставить пару касающихся граней по ячейкам с обеих сторон:
/// скрыты если заняты обе, видна у занятой если другая пуста.
fn reconcile(
    a: &mut Chunk,
    b: &mut Chunk,
    side: Face,
    (ax, az): (usize, usize),
    (bx, bz): (usize, usize),
    y: usize,
) -> bool {
    let a_filled = a.get(ax, y, az).is_some();
    let b_filled = b.get(bx, y, bz).is_some();
    if !a_filled && !b_filled {
        return false;
    }
    let hidden = a_filled && b_filled;

    let changed_a = a.set_face(ax, y, az, side, !hidden);
    let changed_b = b.set_face(bx, y, bz, side.opposite(), !hidden);
    changed_a || changed_b
}

/// Сшить два соседних чанка по всей общей стороне. Грани, скрытые
/// раньше против ячейки, которая с тех пор опустела, снова видны.
/// Возвращает число пар, у которых поменялись маски.
pub fn fix_shared_faces(a: &mut Chunk, b: &mut Chunk) -> usize {
    let Some(side) = shared_side(a.key(), b.key()) else {
        return 0;
    };

    let mut changed = 0;
    for (cell_a, cell_b) in boundary_cells(side) {
        for y in 0..CHUNK_HEIGHT as usize {
            if reconcile(a, b, side, cell_a, cell_b, y) {
                changed += 1;
            }
        }
    }
    changed
}

/// Пересчитать одну пару касающихся граней после правки ячейки (x, y, z) в `a`.
/// Возвращает true если хоть одна маска изменилась.
pub fn sync_shared_cell(a: &mut Chunk, b: &mut Chunk, x: usize, y: usize, z: usize) -> bool {
    let Some(side) = shared_side(a.key(), b.key()) else {
        return false;
    };
    let Some(cell_b) = across(x, z, side) else {
        return false;
    };
    reconcile(a, b, side, (x, z), cell_b, y)
}
