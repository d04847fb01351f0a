// ============================================
// Geometry Data - Геометрия чанка до загрузки
// ============================================
// Четыре вершины и шесть индексов на каждую видимую грань.

use crate::blocks::{atlas_uv, BlockType, ATLAS_CELL, ATLAS_SIZE};
use crate::terrain::voxel::Face;

use super::vertex::TerrainVertex;

/// Порядок индексов квада (два треугольника)
const QUAD_INDICES: [u32; 6] = [0, 1, 3, 3, 1, 2];

/// Посчитанная, но ещё не загруженная геометрия
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить одну грань вокселя с локальным углом `local`
    pub fn push_face(&mut self, local: [f32; 3], face: Face, block: BlockType) {
        let inc = ATLAS_CELL as f32 / ATLAS_SIZE as f32;
        let [l, t] = atlas_uv(block);
        let uvs = [[l + inc, t], [l + inc, t + inc], [l, t + inc], [l, t]];
        let normal = face.normal();

        let base = self.vertices.len() as u32;
        for (corner, uv) in face.corners().iter().zip(uvs) {
            let position = [local[0] + corner[0], local[1] + corner[1], local[2] + corner[2]];
            self.vertices.push(TerrainVertex::new(position, uv, normal));
        }
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.vertices.len() / 4
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
