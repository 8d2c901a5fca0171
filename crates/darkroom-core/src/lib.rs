//! Darkroom Core - Non-destructive photo adjustment engine
//!
//! This crate holds the editing state for one photo and derives everything a
//! renderer needs from it: the ordered filter chain, overlay descriptors,
//! crop/straighten geometry across coordinate spaces, local masks, and a
//! bounded undo/redo history. It never touches pixels on the render path;
//! pixel work belongs to the host renderer and exporter.

pub mod adjustments;
pub mod analysis;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod export;
pub mod filters;
pub mod geometry;
pub mod history;
pub mod luminance;
pub mod mask;
pub mod segmentation;
pub mod session;

pub use adjustments::{AdjustmentKey, Category};
pub use config::EditorConfig;
pub use error::EditorError;
pub use export::{ExportFormat, ExportPlan, ExportRenderer, ExportSettings, ExportedFile};
pub use filters::{derive_render, FilterChain, FilterOp, GrainOverlay, RenderDescription, VignetteOverlay};
pub use geometry::{AspectRatio, CropState, DisplayLayout, Rect, ViewMode, ViewState};
pub use history::{HistoryEntry, HistoryManager};
pub use mask::{BitmapHandle, Mask, MaskId, MaskKind, MaskRegistry};
pub use segmentation::{ModelState, SegmentationBackend, SegmentationService};
pub use session::{BrushSettings, EditSession, Tool};

use serde::{Deserialize, Serialize};

/// Edit parameters for an image (or for one mask's local adjustments).
///
/// Ranges are documented per field; the struct itself does not enforce them.
/// Clamping happens at the session boundary, see [`AdjustmentKey::clamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Adjustments {
    // Light
    /// Exposure (-100 to 100)
    pub exposure: f32,
    /// Brilliance (-100 to 100)
    pub brilliance: f32,
    /// Highlights (-100 to 100)
    pub highlights: f32,
    /// Shadows (-100 to 100)
    pub shadows: f32,
    /// Contrast (-100 to 100)
    pub contrast: f32,
    /// Brightness (-100 to 100)
    pub brightness: f32,
    /// Black point (-100 to 100)
    pub black_point: f32,

    // Color
    /// Saturation (-100 to 100)
    pub saturation: f32,
    /// Vibrance (-100 to 100)
    pub vibrance: f32,
    /// White balance temperature (-100 to 100)
    pub temperature: f32,
    /// White balance tint (-100 to 100)
    pub tint: f32,

    // Detail
    /// Sharpness (0 to 100)
    pub sharpness: f32,
    /// Clarity (-100 to 100)
    pub clarity: f32,
    /// Noise reduction (0 to 100)
    pub noise_reduction: f32,

    // Effects
    /// Vignette (-100 to 100), negative values lighten the edges
    pub vignette: f32,
    /// Film grain (0 to 100)
    pub grain: f32,

    // Geometry
    /// Quarter-turn rotation in degrees (0, 90, 180, 270)
    pub rotation: f32,
    /// Fine straighten angle in degrees (-45 to 45)
    pub straighten: f32,
    /// Cover scale derived from `straighten`, always >= 1
    pub straighten_scale: f32,
    /// Aspect ratio tag ("free" or "W:H")
    pub crop_aspect_ratio: String,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            brilliance: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            contrast: 0.0,
            brightness: 0.0,
            black_point: 0.0,
            saturation: 0.0,
            vibrance: 0.0,
            temperature: 0.0,
            tint: 0.0,
            sharpness: 0.0,
            clarity: 0.0,
            noise_reduction: 0.0,
            vignette: 0.0,
            grain: 0.0,
            rotation: 0.0,
            straighten: 0.0,
            straighten_scale: 1.0,
            crop_aspect_ratio: AspectRatio::FREE_TAG.to_string(),
        }
    }
}

impl Adjustments {
    /// Create a new Adjustments with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if all values are at their defaults
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Combined rotation in degrees (quarter turns plus straighten).
    ///
    /// The renderer applies this as a single rotation about the image center.
    pub fn total_rotation(&self) -> f32 {
        self.rotation + self.straighten
    }
}

/// Opaque reference to a decoded source image held by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(pub String);

impl ImageHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The image being edited. Origin of all coordinate conversions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageState {
    /// Handle to the decoded source, `None` before the first load
    pub source: Option<ImageHandle>,
    /// Original width in pixels
    pub original_width: u32,
    /// Original height in pixels
    pub original_height: u32,
    /// File name as supplied by the user
    pub file_name: String,
}

impl ImageState {
    pub fn new(source: ImageHandle, width: u32, height: u32, file_name: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            original_width: width,
            original_height: height,
            file_name: file_name.into(),
        }
    }

    /// Check whether an image with usable dimensions is loaded
    pub fn is_loaded(&self) -> bool {
        self.source.is_some() && self.original_width > 0 && self.original_height > 0
    }

    /// Original dimensions as floats, `None` when nothing is loaded.
    pub fn dimensions(&self) -> Option<(f64, f64)> {
        if self.is_loaded() {
            Some((self.original_width as f64, self.original_height as f64))
        } else {
            None
        }
    }

    /// File name without its final extension.
    pub fn base_name(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(idx) if idx > 0 => &self.file_name[..idx],
            _ => &self.file_name,
        }
    }
}
