//! Session-level error type.
//!
//! Each fallible module owns its own error enum; [`EditorError`] gathers them
//! at the session boundary. Recoverable conditions (format conversion
//! fallback, crop clamping) never reach this type.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::export::ExportError;
use crate::mask::MaskId;
use crate::segmentation::SegmentationError;

/// Terminal failure of one session operation.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Ingestion could not produce a bitmap; no session was started.
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Segmentation never produced a mask; the registry is unchanged.
    #[error("Mask generation failed: {0}")]
    Segmentation(#[from] SegmentationError),

    /// Encoding or the export collaborator failed.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// The operation needs a loaded image.
    #[error("No image loaded")]
    NoImage,

    /// No mask with this id exists in the registry.
    #[error("Mask not found: {0}")]
    MaskNotFound(MaskId),
}

impl From<EncodeError> for EditorError {
    fn from(err: EncodeError) -> Self {
        EditorError::Export(ExportError::Encode(err))
    }
}

impl EditorError {
    /// True for failures of the segmentation model (as opposed to bad input).
    pub fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            EditorError::Segmentation(SegmentationError::ModelUnavailable { .. })
        )
    }
}
