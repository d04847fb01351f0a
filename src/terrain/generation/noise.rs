// ============================================
// Noise Functions - Шумовые функции для генерации
// ============================================
// Value noise с сидом: один и тот же сид даёт один и тот же мир.

/// Hash2D с сидом, значение в диапазоне 0.0..1.0
#[inline(always)]
pub fn hash2d(seed: i64, x: i32, y: i32) -> f32 {
    let s = (seed as i32) ^ ((seed >> 32) as i32);
    let n = x
        .wrapping_mul(374761393)
        .wrapping_add(y.wrapping_mul(668265263))
        .wrapping_add(s.wrapping_mul(1274126177));
    let n = (n ^ (n >> 13)).wrapping_mul(1911520717);
    let n = n ^ (n >> 16);
    ((n as u32) as f32) / (u32::MAX as f32)
}

#[inline(always)]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// 2D Value Noise, 0.0..1.0
#[inline]
pub fn noise2d(seed: i64, x: f32, y: f32) -> f32 {
    let xi = x.floor() as i32;
    let yi = y.floor() as i32;
    let xf = smoothstep(x - x.floor());
    let yf = smoothstep(y - y.floor());

    let n00 = hash2d(seed, xi, yi);
    let n10 = hash2d(seed, xi + 1, yi);
    let n01 = hash2d(seed, xi, yi + 1);
    let n11 = hash2d(seed, xi + 1, yi + 1);

    let nx0 = n00 + xf * (n10 - n00);
    let nx1 = n01 + xf * (n11 - n01);

    nx0 + yf * (nx1 - nx0)
}

/// FBM 2D - несколько октав шума, результат в -1.0..1.0
#[inline]
pub fn fbm2d(seed: i64, x: f32, y: f32, octaves: u32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for octave in 0..octaves {
        // Каждая октава со своим сидом, чтобы не было повторов
        value += amplitude * noise2d(seed.wrapping_add(octave as i64), x * frequency, y * frequency);
        max_value += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }

    (value / max_value) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_deterministic() {
        assert_eq!(noise2d(42, 1.3, -7.9), noise2d(42, 1.3, -7.9));
        assert_eq!(fbm2d(42, 0.5, 0.25, 4), fbm2d(42, 0.5, 0.25, 4));
    }

    #[test]
    fn test_seed_changes_output() {
        let a: Vec<f32> = (0..16).map(|i| hash2d(1, i, i * 3)).collect();
        let b: Vec<f32> = (0..16).map(|i| hash2d(2, i, i * 3)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fbm_range() {
        for i in 0..200 {
            let v = fbm2d(7, i as f32 * 0.37, i as f32 * -0.11, 4);
            assert!((-1.0..=1.0).contains(&v), "{}", v);
        }
    }
}
