// ============================================
// Faces - Грани куба и маска видимости
// ============================================
// Порядок бит: -Z, +X, +Z, -X, +Y, -Y

/// Грань вокселя
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Face {
    NegZ = 0,
    PosX = 1,
    PosZ = 2,
    NegX = 3,
    PosY = 4,
    NegY = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::NegZ, Face::PosX, Face::PosZ, Face::NegX, Face::PosY, Face::NegY];

    /// Четыре горизонтальные грани (границы с соседними чанками)
    pub const SIDES: [Face; 4] = [Face::NegZ, Face::PosX, Face::PosZ, Face::NegX];

    #[inline]
    pub fn bit(self) -> u8 {
        1 << self as u8
    }

    #[inline]
    pub fn opposite(self) -> Face {
        match self {
            Face::NegZ => Face::PosZ,
            Face::PosX => Face::NegX,
            Face::PosZ => Face::NegZ,
            Face::NegX => Face::PosX,
            Face::PosY => Face::NegY,
            Face::NegY => Face::PosY,
        }
    }

    /// Смещение к соседней ячейке (dx, dy, dz)
    #[inline]
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Face::NegZ => (0, 0, -1),
            Face::PosX => (1, 0, 0),
            Face::PosZ => (0, 0, 1),
            Face::NegX => (-1, 0, 0),
            Face::PosY => (0, 1, 0),
            Face::NegY => (0, -1, 0),
        }
    }

    #[inline]
    pub fn normal(self) -> [f32; 3] {
        let (x, y, z) = self.offset();
        [x as f32, y as f32, z as f32]
    }

    /// Углы квада грани единичного куба, против часовой при взгляде снаружи
    #[inline]
    pub fn corners(self) -> [[f32; 3]; 4] {
        match self {
            Face::NegZ => [[1.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Face::PosX => [[1.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            Face::PosZ => [[0.0, 1.0, 1.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0]],
            Face::NegX => [[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
            Face::PosY => [[1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0], [0.0, 1.0, 1.0]],
            Face::NegY => [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
        }
    }
}

/// 6-битная маска видимых граней
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FaceMask(u8);

impl FaceMask {
    pub const NONE: FaceMask = FaceMask(0);
    pub const ALL: FaceMask = FaceMask(0b11_1111);

    #[inline]
    pub fn is_visible(self, face: Face) -> bool {
        self.0 & face.bit() != 0
    }

    #[inline]
    pub fn set(&mut self, face: Face, visible: bool) {
        if visible {
            self.0 |= face.bit();
        } else {
            self.0 &= !face.bit();
        }
    }

    /// Ни одной видимой грани - воксель можно не рисовать
    #[inline]
    pub fn is_hidden(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}
