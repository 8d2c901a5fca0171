//! Ingestion and decoding bindings.
//!
//! - [`ingest`] - Full pipeline: optional conversion, then direct decode
//! - [`decode_image`] - Decode JPEG/PNG bytes with EXIF orientation applied
//! - [`extract_raw_preview`] - Pull the embedded JPEG out of a TIFF-based RAW
//! - [`resize_to_fit`] - Downscale for analysis or thumbnails
//!
//! # Example
//!
//! ```typescript
//! import { ingest } from '@darkroom/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! // heicToJpeg: (bytes, mime) => Promise<Uint8Array>, optional
//! const result = await ingest(bytes, file.type, file.name, heicToJpeg);
//! const image = result.image();
//! session.loadImage(url, image.width, image.height, result.fileName);
//! ```

use darkroom_core::decode::{
    self, ConversionError, FormatConverter, Ingested, Ingestor, SourceFormat, SourceHint,
};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::types::{js_error, JsDecodedImage};

/// HEIC converter backed by a JS function `(bytes, mime) => Uint8Array | Promise<Uint8Array>`.
struct JsHeicConverter {
    convert: js_sys::Function,
}

impl FormatConverter for JsHeicConverter {
    fn handles(&self, format: SourceFormat) -> bool {
        format == SourceFormat::Heic
    }

    fn convert<'a>(
        &'a self,
        bytes: &'a [u8],
        hint: &'a SourceHint,
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, ConversionError>> {
        async move {
            let input = js_sys::Uint8Array::from(bytes);
            let returned = self
                .convert
                .call2(&JsValue::NULL, &input, &JsValue::from_str(&hint.mime))
                .map_err(|e| ConversionError::Converter(describe(&e)))?;
            let output = JsFuture::from(js_sys::Promise::resolve(&returned))
                .await
                .map_err(|e| ConversionError::Converter(describe(&e)))?;
            Ok(js_sys::Uint8Array::new(&output).to_vec())
        }
        .boxed_local()
    }
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Outcome of [`ingest`].
#[wasm_bindgen]
pub struct JsIngested {
    image: JsDecodedImage,
    file_name: String,
    format: SourceFormat,
    converted: bool,
}

#[wasm_bindgen]
impl JsIngested {
    /// Copy of the decoded image.
    pub fn image(&self) -> JsDecodedImage {
        JsDecodedImage::from_decoded(self.image.to_decoded())
    }

    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    /// "standard", "heic" or "tiffRaw"
    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        format_name(self.format).to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn converted(&self) -> bool {
        self.converted
    }
}

impl From<Ingested> for JsIngested {
    fn from(ingested: Ingested) -> Self {
        Self {
            image: JsDecodedImage::from_decoded(ingested.image),
            file_name: ingested.file_name,
            format: ingested.format,
            converted: ingested.converted,
        }
    }
}

fn format_name(format: SourceFormat) -> &'static str {
    match format {
        SourceFormat::Standard => "standard",
        SourceFormat::Heic => "heic",
        SourceFormat::TiffRaw => "tiffRaw",
    }
}

/// Decode an uploaded blob, converting HEIC or RAW sources first.
///
/// A failed conversion falls back to decoding the bytes directly; the
/// promise rejects only when both fail.
#[wasm_bindgen]
pub async fn ingest(
    bytes: Vec<u8>,
    mime: String,
    file_name: String,
    heic_converter: Option<js_sys::Function>,
) -> Result<JsIngested, JsValue> {
    let mut ingestor = Ingestor::new();
    if let Some(convert) = heic_converter {
        ingestor = ingestor.with_converter(JsHeicConverter { convert });
    }
    let hint = SourceHint::new(mime, file_name);
    ingestor
        .ingest(&bytes, &hint)
        .await
        .map(JsIngested::from)
        .map_err(js_error)
}

/// Decode JPEG or PNG bytes, applying EXIF orientation.
#[wasm_bindgen]
pub fn decode_image(bytes: &[u8]) -> Result<JsDecodedImage, JsValue> {
    decode::decode_image(bytes)
        .map(JsDecodedImage::from_decoded)
        .map_err(js_error)
}

/// Check for a TIFF container (the family most RAW formats belong to).
#[wasm_bindgen]
pub fn is_tiff_container(bytes: &[u8]) -> bool {
    decode::is_tiff_container(bytes)
}

/// Extract the largest embedded JPEG preview from a TIFF-based RAW.
#[wasm_bindgen]
pub fn extract_raw_preview(bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    decode::extract_preview(bytes).map_err(js_error)
}

/// Downscale so the longest edge is at most `max_edge`, keeping aspect ratio.
#[wasm_bindgen]
pub fn resize_to_fit(image: &JsDecodedImage, max_edge: u32) -> Result<JsDecodedImage, JsValue> {
    decode::resize_to_fit(&image.to_decoded(), max_edge)
        .map(JsDecodedImage::from_decoded)
        .map_err(js_error)
}
