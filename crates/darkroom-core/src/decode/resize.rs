//! Downscaling for analysis buffers.

use image::imageops::FilterType;

use super::{DecodeError, DecodedImage};

/// Resize an image so its longest edge is at most `max_edge`, keeping the
/// aspect ratio. Images that already fit are returned unchanged.
///
/// # Errors
///
/// Returns `DecodeError::EmptyImage` for a zero `max_edge` or an empty
/// source, `DecodeError::CorruptedFile` if the pixel buffer does not match
/// the dimensions.
pub fn resize_to_fit(image: &DecodedImage, max_edge: u32) -> Result<DecodedImage, DecodeError> {
    if max_edge == 0 || image.is_empty() {
        return Err(DecodeError::EmptyImage);
    }
    if image.width <= max_edge && image.height <= max_edge {
        return Ok(image.clone());
    }

    let (width, height) = fit_dimensions(image.width, image.height, max_edge);
    let rgb = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Pixel buffer size mismatch".to_string()))?;
    let resized = image::imageops::resize(&rgb, width, height, FilterType::Triangle);
    Ok(DecodedImage::from_rgb_image(resized))
}

fn fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let ratio = width as f64 / height as f64;
    if width >= height {
        let h = (max_edge as f64 / ratio).round() as u32;
        (max_edge, h.max(1))
    } else {
        let w = (max_edge as f64 * ratio).round() as u32;
        (w.max(1), max_edge)
    }
}
