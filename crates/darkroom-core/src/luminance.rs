//! Luminance using ITU-R BT.709 coefficients.

/// ITU-R BT.709 coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.2126;

/// ITU-R BT.709 coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.7152;

/// ITU-R BT.709 coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.0722;

/// Luminance of an 8-bit RGB triple, unrounded, on the 0-255 scale.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    LUMINANCE_R * r as f32 + LUMINANCE_G * g as f32 + LUMINANCE_B * b as f32
}

/// Luminance of an 8-bit RGB triple, rounded to the nearest level.
#[inline]
pub fn luma_u8(r: u8, g: u8, b: u8) -> u8 {
    luma(r, g, b).clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_sum_to_one() {
        let sum = LUMINANCE_R + LUMINANCE_G + LUMINANCE_B;
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_gray_preserves_value() {
        for v in [0u8, 64, 128, 192, 255] {
            assert!((luma_u8(v, v, v) as i32 - v as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_primaries() {
        // 0.2126 * 255 ≈ 54.21
        assert_eq!(luma_u8(255, 0, 0), 54);
        // 0.7152 * 255 ≈ 182.38
        assert_eq!(luma_u8(0, 255, 0), 182);
        // 0.0722 * 255 ≈ 18.41
        assert_eq!(luma_u8(0, 0, 255), 18);
        assert!((luma(255, 0, 0) - 54.213).abs() < 1e-3);
    }
}
