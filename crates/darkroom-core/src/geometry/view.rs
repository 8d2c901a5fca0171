//! Display space: fit-to-container scale, zoom/pan and per-frame layout.

use serde::{Deserialize, Serialize};

use super::{CropState, Rect, ViewMode};
use crate::{Adjustments, EditorConfig};

/// Scale that fits an image into a container, never enlarging it.
///
/// # Arguments
///
/// * `container_w`, `container_h` - Container size in display pixels
/// * `image_w`, `image_h` - Image size in Original pixels
/// * `padding` - Space subtracted from each container dimension
///
/// # Returns
///
/// `min((cw - pad) / W, (ch - pad) / H, 1)`, floored at 0.
pub fn fit_scale(container_w: f64, container_h: f64, image_w: f64, image_h: f64, padding: f64) -> f64 {
    if image_w <= 0.0 || image_h <= 0.0 {
        return 1.0;
    }
    let scale_x = (container_w - padding) / image_w;
    let scale_y = (container_h - padding) / image_h;
    scale_x.min(scale_y).min(1.0).max(0.0)
}

/// Interactive zoom and pan, applied on top of the fit scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl ViewState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Zoom one step in or out, keeping the point under the pointer fixed.
    ///
    /// `pointer_x`/`pointer_y` are in display coordinates. The new zoom is
    /// clamped to the configured range.
    pub fn zoom_at(&mut self, pointer_x: f64, pointer_y: f64, zoom_in: bool, config: &EditorConfig) {
        if !pointer_x.is_finite() || !pointer_y.is_finite() {
            return;
        }
        let old = self.zoom;
        let (stage_x, stage_y) = self.to_stage(pointer_x, pointer_y);

        let next = if zoom_in {
            old * config.zoom_step
        } else {
            old / config.zoom_step
        };
        self.zoom = next.clamp(config.min_zoom, config.max_zoom);
        self.pan_x = pointer_x - stage_x * self.zoom;
        self.pan_y = pointer_y - stage_y * self.zoom;
    }

    pub fn pan_to(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.pan_x = x;
            self.pan_y = y;
        }
    }

    /// Stage coordinates to display coordinates.
    pub fn to_display(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.zoom + self.pan_x, y * self.zoom + self.pan_y)
    }

    /// Display coordinates to stage coordinates.
    pub fn to_stage(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pan_x) / self.zoom, (y - self.pan_y) / self.zoom)
    }
}

/// Everything the renderer needs to place the image for one frame.
///
/// Stage coordinates already include the fit scale; the stage itself is then
/// transformed by `zoom` and the pan offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayLayout {
    pub mode: ViewMode,
    pub fit_scale: f64,
    pub stage_width: f64,
    pub stage_height: f64,
    /// Image pivot (its center) in stage coordinates
    pub image_x: f64,
    pub image_y: f64,
    /// Unscaled image size; the pivot sits at half of it
    pub image_width: f64,
    pub image_height: f64,
    /// Straighten scale times fit scale
    pub image_scale: f64,
    pub rotation_degrees: f64,
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    /// Stage can be dragged to pan
    pub pannable: bool,
    /// Crop rectangle in stage coordinates, editing only
    pub crop_rect: Option<Rect>,
    /// Top, bottom, left, right dimming rectangles, editing only
    pub dim_rects: Vec<Rect>,
}

impl DisplayLayout {
    /// Compute the layout for an image of `width x height` Original pixels.
    pub fn compute(
        width: f64,
        height: f64,
        crop: &CropState,
        adjustments: &Adjustments,
        view: &ViewState,
        fit: f64,
    ) -> Self {
        let mode = ViewMode::from_crop(crop);
        let zone = mode.safe_zone(crop, width, height);
        let (shift_x, shift_y) = mode.origin_shift(crop, width, height);

        let stage_width = zone.width * fit;
        let stage_height = zone.height * fit;

        let (crop_rect, dim_rects) = match mode {
            ViewMode::Editing => {
                let r = crop.to_pixels(width, height).scaled(fit);
                let dims = vec![
                    Rect::new(0.0, 0.0, stage_width, r.y),
                    Rect::new(0.0, r.bottom(), stage_width, stage_height - r.bottom()),
                    Rect::new(0.0, r.y, r.x, r.height),
                    Rect::new(r.right(), r.y, stage_width - r.right(), r.height),
                ];
                (Some(r), dims)
            }
            ViewMode::Result => (None, Vec::new()),
        };

        Self {
            mode,
            fit_scale: fit,
            stage_width,
            stage_height,
            image_x: (shift_x + width / 2.0) * fit,
            image_y: (shift_y + height / 2.0) * fit,
            image_width: width,
            image_height: height,
            image_scale: adjustments.straighten_scale as f64 * fit,
            rotation_degrees: adjustments.total_rotation() as f64,
            zoom: view.zoom,
            pan_x: view.pan_x,
            pan_y: view.pan_y,
            pannable: mode.allows_pan(),
            crop_rect,
            dim_rects,
        }
    }
}
