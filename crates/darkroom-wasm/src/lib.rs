//! Darkroom WASM - WebAssembly bindings for Darkroom
//!
//! This crate exposes the darkroom-core edit session, ingestion pipeline,
//! encoders and segmentation service to JavaScript/TypeScript hosts.
//!
//! # Module Structure
//!
//! - `session` - The `EditSession` class (adjustments, crop, view, masks, history, export)
//! - `segmentation` - The `SegmentationService` class wrapping a JS model
//! - `decode` - Ingestion and decoding (HEIC conversion hook, RAW previews, resize)
//! - `encode` - JPEG/PNG encoding
//! - `types` - WASM-compatible wrapper types for image data
//!
//! # Usage
//!
//! ```typescript
//! import init, { EditSession, ingest } from '@darkroom/wasm';
//!
//! await init();
//!
//! const session = new EditSession();
//! const result = await ingest(bytes, file.type, file.name);
//! const image = result.image();
//! session.loadImage(url, image.width, image.height, result.fileName);
//! session.setAdjustment('contrast', 50);
//! canvas.style.filter = session.filterString();
//! ```

use wasm_bindgen::prelude::*;

mod decode;
mod encode;
mod segmentation;
mod session;
mod types;

// Re-export public types
pub use decode::{decode_image, extract_raw_preview, ingest, is_tiff_container, resize_to_fit, JsIngested};
pub use encode::{encode_jpeg, encode_jpeg_from_image, encode_png};
pub use segmentation::JsSegmentationService;
pub use session::{JsEditSession, JsExportedFile};
pub use types::JsDecodedImage;

/// Initialize the WASM module (called automatically on load).
///
/// Routes `log` output to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    // Already initialized when the module is instantiated twice
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
