//! Export of the edited image.
//!
//! Export is split in two. The core captures an [`ExportPlan`] from the
//! session at invocation time; an [`ExportRenderer`] supplied by the host
//! paints that plan onto full-resolution pixels; the core then encodes the
//! pixels in the chosen format.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::DecodedImage;
use crate::encode::{encode_jpeg, encode_png, EncodeError};
use crate::filters::{derive_filter_chain, FilterChain, VignetteColor};
use crate::geometry::{CropState, Rect};
use crate::{Adjustments, ImageState};

/// Errors from the export path.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid export settings: {0}")]
    InvalidSettings(String),

    #[error("Export renderer failed: {0}")]
    Render(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("An export is already running")]
    Busy,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossy, quality 1-100
    Jpeg { quality: u8 },
    /// Lossless
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg { .. } => "jpeg",
            ExportFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Jpeg { .. } => "image/jpeg",
            ExportFormat::Png => "image/png",
        }
    }
}

/// What the user picked in the export dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// File name without extension
    pub file_stem: String,
}

impl ExportSettings {
    /// Defaults for an image: JPEG at `quality`, stem `<base>_edited`.
    pub fn for_image(image: &ImageState, quality: u8) -> Self {
        Self {
            format: ExportFormat::Jpeg {
                quality: quality.clamp(1, 100),
            },
            file_stem: format!("{}_edited", image.base_name()),
        }
    }

    /// Reject settings that cannot produce a file.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.file_stem.trim().is_empty() {
            return Err(ExportError::InvalidSettings(
                "file name must not be empty".to_string(),
            ));
        }
        if let ExportFormat::Jpeg { quality } = self.format {
            if !(1..=100).contains(&quality) {
                return Err(ExportError::InvalidSettings(format!(
                    "JPEG quality {} outside 1-100",
                    quality
                )));
            }
        }
        Ok(())
    }

    /// `<stem>.<jpeg|png>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.file_stem.trim(), self.format.extension())
    }
}

/// Radial vignette painted over the full-resolution export.
///
/// Centered on the image, transparent up to half the radius, reaching
/// `edge_alpha` at `radius`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportVignette {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    /// Gradient offsets that stay fully transparent
    pub transparent_stops: [f64; 2],
    pub color: VignetteColor,
    pub edge_alpha: f32,
}

impl ExportVignette {
    pub fn new(vignette: f32, width: f64, height: f64) -> Option<Self> {
        if vignette == 0.0 {
            return None;
        }
        let intensity = vignette.abs() / 100.0;
        let (color, edge_alpha) = if vignette > 0.0 {
            (VignetteColor::Black, intensity * 0.8)
        } else {
            (VignetteColor::White, intensity * 0.5)
        };
        Some(Self {
            center_x: width / 2.0,
            center_y: height / 2.0,
            radius: width.max(height) / 1.5,
            transparent_stops: [0.0, 0.5],
            color,
            edge_alpha,
        })
    }
}

/// Point-in-time snapshot of everything the renderer needs.
///
/// The renderer rotates the full source by `rotation_radians` and scales it
/// by `straighten_scale` about its center, then cuts out `crop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPlan {
    /// Source width in pixels
    pub width: u32,
    /// Source height in pixels
    pub height: u32,
    /// Total rotation about the image center
    pub rotation_radians: f64,
    /// Cover scale for the straighten angle, always >= 1
    pub straighten_scale: f64,
    /// Output region in Original pixels
    pub crop: Rect,
    pub filter_chain: FilterChain,
    /// CSS form of `filter_chain`, for canvas renderers
    pub filter: String,
    pub vignette: Option<ExportVignette>,
}

impl ExportPlan {
    pub fn capture(image: &ImageState, adjustments: &Adjustments, crop: &CropState) -> Option<Self> {
        let (w, h) = image.dimensions()?;
        let filter_chain = derive_filter_chain(adjustments).effective();
        Some(Self {
            width: image.original_width,
            height: image.original_height,
            rotation_radians: (adjustments.total_rotation() as f64).to_radians(),
            straighten_scale: (adjustments.straighten_scale as f64).max(1.0),
            crop: crop.to_pixels(w, h),
            filter: filter_chain.to_string(),
            filter_chain,
            vignette: ExportVignette::new(adjustments.vignette, w, h),
        })
    }

    /// Pixel size of the exported file, at least 1×1.
    pub fn output_size(&self) -> (u32, u32) {
        (
            (self.crop.width.round() as u32).max(1),
            (self.crop.height.round() as u32).max(1),
        )
    }
}

/// Host collaborator that paints a plan onto the source pixels.
pub trait ExportRenderer {
    fn render<'a>(&'a self, plan: &'a ExportPlan) -> LocalBoxFuture<'a, Result<DecodedImage, ExportError>>;
}

/// An encoded file ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Encode rendered pixels according to the settings.
pub fn encode_rendered(image: &DecodedImage, settings: &ExportSettings) -> Result<ExportedFile, ExportError> {
    settings.validate()?;
    let bytes = match settings.format {
        ExportFormat::Jpeg { quality } => encode_jpeg(&image.pixels, image.width, image.height, quality)?,
        ExportFormat::Png => encode_png(&image.pixels, image.width, image.height)?,
    };
    Ok(ExportedFile {
        file_name: settings.file_name(),
        mime_type: settings.format.mime_type(),
        bytes,
    })
}

/// Render a plan with the host renderer and encode the result.
pub async fn run_export<R: ExportRenderer + ?Sized>(
    renderer: &R,
    plan: &ExportPlan,
    settings: &ExportSettings,
) -> Result<ExportedFile, ExportError> {
    settings.validate()?;
    let rendered = renderer.render(plan).await?;
    if rendered.is_empty() {
        return Err(ExportError::Render("renderer produced no pixels".to_string()));
    }
    let file = encode_rendered(&rendered, settings)?;
    log::info!("Exported {} ({} bytes)", file.file_name, file.bytes.len());
    Ok(file)
}
