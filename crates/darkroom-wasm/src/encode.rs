//! Encoding bindings for export.
//!
//! # Example
//!
//! ```typescript
//! import { encode_jpeg, encode_png } from '@darkroom/wasm';
//!
//! const jpegBytes = encode_jpeg(pixels, width, height, 92);
//! const pngBytes = encode_png(pixels, width, height);
//! ```

use crate::types::{js_error, JsDecodedImage};
use darkroom_core::encode;
use wasm_bindgen::prelude::*;

/// Encode RGB pixel data to JPEG bytes. Quality is clamped to 1-100.
#[wasm_bindgen]
pub fn encode_jpeg(pixels: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, JsValue> {
    encode::encode_jpeg(pixels, width, height, quality).map_err(js_error)
}

/// Encode RGB pixel data to lossless PNG bytes.
#[wasm_bindgen]
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, JsValue> {
    encode::encode_png(pixels, width, height).map_err(js_error)
}

/// Encode a decoded image to JPEG bytes.
#[wasm_bindgen]
pub fn encode_jpeg_from_image(image: &JsDecodedImage, quality: u8) -> Result<Vec<u8>, JsValue> {
    let decoded = image.to_decoded();
    encode_jpeg(&decoded.pixels, decoded.width, decoded.height, quality)
}
