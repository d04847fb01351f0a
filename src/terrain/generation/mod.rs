// ============================================
// Generation Module - Процедурная генерация
// ============================================

pub mod noise;

mod generator;

pub use generator::{Band, Column, Layer, WorldGenerator};
