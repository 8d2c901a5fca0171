//! Crop, straighten and display geometry.
//!
//! # Coordinate Spaces
//!
//! - **Original**: pixel rectangle `[0, W] x [0, H]` of the loaded image
//! - **Percentage**: crop rectangle as percentages of Original
//! - **Safe zone**: the whole Original space while crop editing, the crop
//!   rectangle otherwise (see [`ViewMode`])
//! - **Display**: safe zone times the fit-to-container scale, then interactive
//!   zoom and pan on top
//!
//! Origin is top-left. Rotation angles are in degrees, positive = clockwise
//! on screen.

mod crop;
mod straighten;
mod view;

pub use crop::{AspectRatio, CropState, ASPECT_PRESETS};
pub use straighten::{cover_scale, rotated_bounds};
pub use view::{fit_scale, DisplayLayout, ViewState};

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle. Units depend on the space it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Multiply every component by `factor`.
    pub fn scaled(&self, factor: f64) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Check containment in `[0, bound_w] x [0, bound_h]` with a small tolerance.
    pub fn is_within(&self, bound_w: f64, bound_h: f64) -> bool {
        const EPS: f64 = 1e-9;
        self.x >= -EPS
            && self.y >= -EPS
            && self.right() <= bound_w + EPS
            && self.bottom() <= bound_h + EPS
    }
}

/// Which coordinate space is authoritative for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Crop editing: full image shown with the crop overlay on top
    Editing,
    /// Cropped result shown on its own
    #[default]
    Result,
}

impl ViewMode {
    pub fn from_crop(crop: &CropState) -> Self {
        if crop.is_active {
            ViewMode::Editing
        } else {
            ViewMode::Result
        }
    }

    /// Safe-zone rectangle in Original pixels.
    pub fn safe_zone(self, crop: &CropState, width: f64, height: f64) -> Rect {
        match self {
            ViewMode::Editing => Rect::new(0.0, 0.0, width, height),
            ViewMode::Result => crop.to_pixels(width, height),
        }
    }

    /// Offset that moves the safe zone's top-left corner to the origin.
    pub fn origin_shift(self, crop: &CropState, width: f64, height: f64) -> (f64, f64) {
        match self {
            ViewMode::Editing => (0.0, 0.0),
            ViewMode::Result => {
                let zone = crop.to_pixels(width, height);
                (-zone.x, -zone.y)
            }
        }
    }

    /// Whether interactive panning applies in this mode.
    pub fn allows_pan(self) -> bool {
        matches!(self, ViewMode::Result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.scaled(0.5), Rect::new(5.0, 10.0, 15.0, 20.0));
    }

    #[test]
    fn test_rect_within() {
        assert!(Rect::new(0.0, 0.0, 100.0, 50.0).is_within(100.0, 50.0));
        assert!(!Rect::new(1.0, 0.0, 100.0, 50.0).is_within(100.0, 50.0));
        assert!(!Rect::new(-1.0, 0.0, 10.0, 10.0).is_within(100.0, 50.0));
    }

    #[test]
    fn test_safe_zone_editing_is_full_image() {
        let mut crop = CropState::default();
        crop.x = 10.0;
        crop.width = 50.0;
        crop.is_active = true;
        let mode = ViewMode::from_crop(&crop);
        assert_eq!(mode, ViewMode::Editing);
        assert_eq!(mode.safe_zone(&crop, 400.0, 300.0), Rect::new(0.0, 0.0, 400.0, 300.0));
        assert_eq!(mode.origin_shift(&crop, 400.0, 300.0), (0.0, 0.0));
        assert!(!mode.allows_pan());
    }

    #[test]
    fn test_safe_zone_result_is_crop() {
        let mut crop = CropState::default();
        crop.x = 25.0;
        crop.y = 10.0;
        crop.width = 50.0;
        crop.height = 50.0;
        let mode = ViewMode::from_crop(&crop);
        assert_eq!(mode, ViewMode::Result);
        assert_eq!(
            mode.safe_zone(&crop, 400.0, 300.0),
            Rect::new(100.0, 30.0, 200.0, 150.0)
        );
        assert_eq!(mode.origin_shift(&crop, 400.0, 300.0), (-100.0, -30.0));
        assert!(mode.allows_pan());
    }
}
