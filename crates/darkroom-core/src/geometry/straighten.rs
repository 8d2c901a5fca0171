//! Straighten cover scale.
//!
//! Rotating an image by a non-multiple of 90 degrees exposes empty corners
//! inside its original frame. Scaling the rotated image up by the cover
//! scale hides them:
//!
//! ```text
//! bounding_w = W * |cos θ| + H * |sin θ|
//! bounding_h = W * |sin θ| + H * |cos θ|
//! scale      = max(bounding_w / W, bounding_h / H)
//! ```

/// Bounding box of a `width x height` rectangle rotated by `angle_degrees`.
///
/// # Arguments
///
/// * `width` - Rectangle width
/// * `height` - Rectangle height
/// * `angle_degrees` - Rotation angle in degrees (sign does not matter)
///
/// # Returns
///
/// Tuple of (bounding_width, bounding_height).
pub fn rotated_bounds(width: f64, height: f64, angle_degrees: f64) -> (f64, f64) {
    let angle_rad = angle_degrees.to_radians();
    let cos = angle_rad.cos().abs();
    let sin = angle_rad.sin().abs();

    (width * cos + height * sin, width * sin + height * cos)
}

/// Uniform scale that makes a rotated image cover its unrotated frame.
///
/// Always at least 1. Degenerate dimensions or a non-finite angle yield 1.
pub fn cover_scale(angle_degrees: f64, width: f64, height: f64) -> f64 {
    if width <= 0.0 || height <= 0.0 || !angle_degrees.is_finite() {
        return 1.0;
    }
    // Fast path: no rotation
    if angle_degrees.abs() < 1e-9 {
        return 1.0;
    }

    let (bounding_w, bounding_h) = rotated_bounds(width, height, angle_degrees);
    (bounding_w / width).max(bounding_h / height).max(1.0)
}
