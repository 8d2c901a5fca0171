//! Source ingestion: optional format conversion, then direct decode.
//!
//! Non-standard sources (HEIC, TIFF-based RAW) first go through a
//! [`FormatConverter`]. If conversion fails, or no converter is registered
//! for the format, the original bytes are decoded directly. Only when that
//! also fails does ingestion report an error.

use std::path::Path;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::raw_preview::{extract_preview, is_tiff_container};
use super::{decode_image, ConversionError, DecodeError, DecodedImage};

const HEIC_EXTENSIONS: [&str; 2] = ["heic", "heif"];
const RAW_EXTENSIONS: [&str; 9] = ["arw", "cr2", "dng", "nef", "nrw", "orf", "pef", "rw2", "srw"];

/// MIME type and file name supplied with an uploaded blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHint {
    pub mime: String,
    pub file_name: String,
}

/// How a source must be handled before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceFormat {
    /// Decodable as-is (JPEG, PNG)
    Standard,
    /// HEIC/HEIF, needs a host converter
    Heic,
    /// TIFF container with an embedded JPEG preview
    TiffRaw,
}

impl SourceHint {
    pub fn new(mime: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            file_name: file_name.into(),
        }
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Classify the source from the hint and the leading bytes.
    pub fn classify(&self, bytes: &[u8]) -> SourceFormat {
        let mime = self.mime.to_ascii_lowercase();
        let ext = self.extension();
        let has_ext = |list: &[&str]| ext.as_deref().is_some_and(|e| list.contains(&e));

        if mime == "image/heic" || mime == "image/heif" || has_ext(&HEIC_EXTENSIONS) {
            SourceFormat::Heic
        } else if is_tiff_container(bytes) || has_ext(&RAW_EXTENSIONS) {
            SourceFormat::TiffRaw
        } else {
            SourceFormat::Standard
        }
    }

    /// File name with its extension replaced by `.jpg`.
    pub fn converted_file_name(&self) -> String {
        let stem = Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image");
        format!("{}.jpg", stem)
    }
}

/// Turns a non-standard source into bytes the direct decoder understands.
pub trait FormatConverter {
    fn handles(&self, format: SourceFormat) -> bool;

    fn convert<'a>(
        &'a self,
        bytes: &'a [u8],
        hint: &'a SourceHint,
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, ConversionError>>;
}

/// Built-in converter: pulls the embedded JPEG out of a TIFF-based RAW.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPreviewConverter;

impl FormatConverter for RawPreviewConverter {
    fn handles(&self, format: SourceFormat) -> bool {
        format == SourceFormat::TiffRaw
    }

    fn convert<'a>(
        &'a self,
        bytes: &'a [u8],
        _hint: &'a SourceHint,
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, ConversionError>> {
        future::ready(extract_preview(bytes)).boxed_local()
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub image: DecodedImage,
    /// Name to show and to derive the export name from
    pub file_name: String,
    pub format: SourceFormat,
    /// Whether a converter produced the decoded bytes
    pub converted: bool,
}

/// Ingestion pipeline with an ordered list of converters.
pub struct Ingestor {
    converters: Vec<Box<dyn FormatConverter>>,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self {
            converters: vec![Box::new(RawPreviewConverter)],
        }
    }
}

impl Ingestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter. Later registrations take precedence.
    pub fn with_converter(mut self, converter: impl FormatConverter + 'static) -> Self {
        self.converters.insert(0, Box::new(converter));
        self
    }

    /// Decode a source blob, converting it first when needed.
    pub async fn ingest(&self, bytes: &[u8], hint: &SourceHint) -> Result<Ingested, DecodeError> {
        let format = hint.classify(bytes);
        let mut conversion_error = None;

        if format != SourceFormat::Standard {
            match self.convert(format, bytes, hint).await {
                Ok(image) => {
                    log::info!(
                        "Converted {} ({:?}) to {}x{}",
                        hint.file_name,
                        format,
                        image.width,
                        image.height
                    );
                    return Ok(Ingested {
                        image,
                        file_name: hint.converted_file_name(),
                        format,
                        converted: true,
                    });
                }
                Err(err) => {
                    log::warn!(
                        "Conversion of {} failed ({}), trying direct decode",
                        hint.file_name,
                        err
                    );
                    conversion_error = Some(err);
                }
            }
        }

        match decode_image(bytes) {
            Ok(image) => {
                log::info!("Decoded {} at {}x{}", hint.file_name, image.width, image.height);
                Ok(Ingested {
                    image,
                    file_name: hint.file_name.clone(),
                    format,
                    converted: false,
                })
            }
            Err(err) => {
                log::error!("Failed to decode {}: {}", hint.file_name, err);
                Err(match conversion_error {
                    Some(conversion) => DecodeError::ConversionAndFallback {
                        conversion,
                        fallback: Box::new(err),
                    },
                    None => err,
                })
            }
        }
    }

    async fn convert(
        &self,
        format: SourceFormat,
        bytes: &[u8],
        hint: &SourceHint,
    ) -> Result<DecodedImage, ConversionError> {
        let converter = self
            .converters
            .iter()
            .find(|c| c.handles(format))
            .ok_or_else(|| ConversionError::Converter(format!("no converter for {:?}", format)))?;

        let converted = converter.convert(bytes, hint).await?;
        decode_image(&converted)
            .map_err(|e| ConversionError::Converter(format!("converted output unreadable: {}", e)))
    }
}
