//! Image ingestion for Darkroom.
//!
//! This module provides functionality for:
//! - Decoding JPEG and PNG sources with EXIF orientation applied
//! - Extracting embedded JPEG previews from TIFF-based RAW files
//! - Pluggable format conversion (HEIC is supplied by the host)
//! - Downscaling decoded images for analysis
//!
//! # Fallback
//!
//! A failed conversion is never fatal on its own. The source bytes are then
//! decoded directly, and only if that fails too is a [`DecodeError`]
//! returned (carrying both causes).
//!
//! # Examples
//!
//! ```ignore
//! use darkroom_core::decode::{Ingestor, SourceHint};
//!
//! let ingested = Ingestor::new()
//!     .ingest(&bytes, &SourceHint::new("image/jpeg", "photo.jpg"))
//!     .await?;
//! println!("{}x{}", ingested.image.width, ingested.image.height);
//! ```

mod direct;
mod ingest;
mod raw_preview;
mod resize;
mod types;

pub use direct::{decode_image, read_orientation};
pub use ingest::{FormatConverter, Ingested, Ingestor, RawPreviewConverter, SourceFormat, SourceHint};
pub use raw_preview::{extract_preview, is_tiff_container};
pub use resize::resize_to_fit;
pub use types::{ConversionError, DecodeError, DecodedImage, Orientation};
