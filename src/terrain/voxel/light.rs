// ============================================
// Point Light - Свет от светящихся блоков
// ============================================

use ultraviolet::Vec3;

/// Точечный источник света, порождённый блоком
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Мировая позиция (центр блока)
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Затухание: константа, линейный и квадратичный коэффициенты
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLight {
    /// Свет с затуханием примерно на 50 блоков
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ambient: Vec3::broadcast(0.5),
            diffuse: Vec3::broadcast(0.5),
            specular: Vec3::broadcast(0.2),
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}
