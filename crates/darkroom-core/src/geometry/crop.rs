//! Crop rectangle state and mutation rules.
//!
//! The rectangle is stored in percentages of the Original image so it
//! survives any display scaling. Every mutation is clamped back inside
//! `[0, 100]`; out-of-bounds input is never reported as an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Rect;

/// Aspect ratio tags offered by the crop tool.
pub const ASPECT_PRESETS: [&str; 8] = ["free", "1:1", "4:3", "3:4", "16:9", "9:16", "3:2", "2:3"];

/// Smallest crop edge in Original pixels.
const MIN_CROP_PX: f64 = 1.0;

/// Crop aspect ratio constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AspectRatio {
    Free,
    Fixed { width: f64, height: f64 },
}

impl AspectRatio {
    pub const FREE_TAG: &'static str = "free";

    /// Parse `"free"` or a `"W:H"` tag with positive finite components.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case(Self::FREE_TAG) {
            return Some(AspectRatio::Free);
        }
        let (w, h) = tag.split_once(':')?;
        let width: f64 = w.trim().parse().ok()?;
        let height: f64 = h.trim().parse().ok()?;
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            Some(AspectRatio::Fixed { width, height })
        } else {
            None
        }
    }

    /// Width over height, `None` when free.
    pub fn ratio(&self) -> Option<f64> {
        match *self {
            AspectRatio::Free => None,
            AspectRatio::Fixed { width, height } => Some(width / height),
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, AspectRatio::Free)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Free => f.write_str(Self::FREE_TAG),
            AspectRatio::Fixed { width, height } => write!(f, "{}:{}", width, height),
        }
    }
}

/// Largest rectangle of the given ratio that fits in `width x height`, centered.
///
/// # Arguments
///
/// * `ratio` - Target width / height
/// * `width` - Original width in pixels
/// * `height` - Original height in pixels
///
/// # Returns
///
/// The rectangle in Original pixels.
pub fn fit_aspect(ratio: f64, width: f64, height: f64) -> Rect {
    let mut new_w = width;
    let mut new_h = width / ratio;
    if new_h > height {
        new_h = height;
        new_w = height * ratio;
    }
    Rect::new((width - new_w) / 2.0, (height - new_h) / 2.0, new_w, new_h)
}

/// Crop editing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropState {
    /// Crop editing in progress
    pub is_active: bool,
    /// `"free"` or `"W:H"`
    pub aspect_ratio: String,
    /// Left edge, percent of Original width
    pub x: f64,
    /// Top edge, percent of Original height
    pub y: f64,
    /// Width, percent of Original width
    pub width: f64,
    /// Height, percent of Original height
    pub height: f64,
}

impl Default for CropState {
    fn default() -> Self {
        Self {
            is_active: false,
            aspect_ratio: AspectRatio::FREE_TAG.to_string(),
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        }
    }
}

impl CropState {
    pub fn percent_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// The rectangle in Original pixels.
    pub fn to_pixels(&self, width: f64, height: f64) -> Rect {
        Rect::new(
            self.x / 100.0 * width,
            self.y / 100.0 * height,
            self.width / 100.0 * width,
            self.height / 100.0 * height,
        )
    }

    /// Store a rectangle given in Original pixels, then clamp.
    pub fn set_from_pixels(&mut self, rect: Rect, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.x = rect.x / width * 100.0;
        self.y = rect.y / height * 100.0;
        self.width = rect.width / width * 100.0;
        self.height = rect.height / height * 100.0;
        self.clamp();
    }

    /// Parsed aspect ratio. Unparsable tags behave as free.
    pub fn aspect(&self) -> AspectRatio {
        AspectRatio::parse(&self.aspect_ratio).unwrap_or(AspectRatio::Free)
    }

    /// The rectangle covers the whole image.
    pub fn is_full(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.width == 100.0 && self.height == 100.0
    }

    /// Change the aspect ratio tag.
    ///
    /// When the tag changes to a fixed ratio and dimensions are known, the
    /// rectangle is replaced by the largest centered rectangle of that ratio.
    /// Switching to free keeps the current rectangle.
    ///
    /// # Returns
    ///
    /// `true` if the tag changed. Unchanged and unparsable tags return `false`.
    pub fn set_aspect_ratio(&mut self, tag: &str, dimensions: Option<(f64, f64)>) -> bool {
        let Some(aspect) = AspectRatio::parse(tag) else {
            log::warn!("Ignoring unknown aspect ratio '{}'", tag);
            return false;
        };
        let tag = aspect.to_string();
        if tag == self.aspect_ratio {
            return false;
        }
        self.aspect_ratio = tag;

        if let (Some(ratio), Some((width, height))) = (aspect.ratio(), dimensions) {
            let rect = fit_aspect(ratio, width, height);
            self.set_from_pixels(rect, width, height);
        }
        true
    }

    /// Move the rectangle so its top-left lands at (`x`, `y`) Original pixels.
    ///
    /// The position is clamped so the rectangle stays inside the image.
    pub fn drag_to(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        let mut rect = self.to_pixels(width, height);
        rect.x = x.clamp(0.0, (width - rect.width).max(0.0));
        rect.y = y.clamp(0.0, (height - rect.height).max(0.0));
        self.set_from_pixels(rect, width, height);
    }

    /// Apply a handle resize given as the proposed rectangle in Original pixels.
    ///
    /// Edges past the image bounds are pulled back in by shrinking the
    /// rectangle. With a fixed ratio the longer side is then reduced so the
    /// result keeps the ratio.
    pub fn resize_to(&mut self, proposed: Rect, width: f64, height: f64) {
        let finite = proposed.x.is_finite()
            && proposed.y.is_finite()
            && proposed.width.is_finite()
            && proposed.height.is_finite();
        if !finite || width <= 0.0 || height <= 0.0 {
            return;
        }

        let mut rect = proposed;
        if rect.x < 0.0 {
            rect.width += rect.x;
            rect.x = 0.0;
        }
        if rect.y < 0.0 {
            rect.height += rect.y;
            rect.y = 0.0;
        }
        if rect.right() > width {
            rect.width = width - rect.x;
        }
        if rect.bottom() > height {
            rect.height = height - rect.y;
        }

        let min_w = MIN_CROP_PX.min(width);
        let min_h = MIN_CROP_PX.min(height);
        rect.width = rect.width.max(min_w);
        rect.height = rect.height.max(min_h);

        if let Some(ratio) = self.aspect().ratio() {
            if rect.width / rect.height > ratio {
                rect.width = rect.height * ratio;
            } else {
                rect.height = rect.width / ratio;
            }
        }

        rect.x = rect.x.clamp(0.0, (width - rect.width).max(0.0));
        rect.y = rect.y.clamp(0.0, (height - rect.height).max(0.0));
        self.set_from_pixels(rect, width, height);
    }

    /// Pull the rectangle back inside `[0, 100]`.
    pub fn clamp(&mut self) {
        let defaults = CropState::default();
        if !self.width.is_finite() {
            self.width = defaults.width;
        }
        if !self.height.is_finite() {
            self.height = defaults.height;
        }
        if !self.x.is_finite() {
            self.x = defaults.x;
        }
        if !self.y.is_finite() {
            self.y = defaults.y;
        }
        self.width = self.width.clamp(0.0, 100.0);
        self.height = self.height.clamp(0.0, 100.0);
        self.x = self.x.clamp(0.0, 100.0 - self.width);
        self.y = self.y.clamp(0.0, 100.0 - self.height);
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimensions_strategy() -> impl Strategy<Value = (f64, f64)> {
        (1u32..=8000, 1u32..=8000).prop_map(|(w, h)| (w as f64, h as f64))
    }

    fn crop_strategy() -> impl Strategy<Value = CropState> {
        (0.0f64..=100.0, 0.0f64..=100.0, 0.0f64..=100.0, 0.0f64..=100.0).prop_map(
            |(x, y, w, h)| {
                let mut crop = CropState {
                    x,
                    y,
                    width: w,
                    height: h,
                    ..Default::default()
                };
                crop.clamp();
                crop
            },
        )
    }

    fn preset_strategy() -> impl Strategy<Value = &'static str> {
        prop::sample::select(ASPECT_PRESETS.to_vec())
    }

    proptest! {
        /// Property: percent -> pixel -> percent reproduces the rectangle.
        #[test]
        fn prop_percent_pixel_round_trip(
            crop in crop_strategy(),
            (w, h) in dimensions_strategy()
        ) {
            let mut copy = crop.clone();
            copy.set_from_pixels(crop.to_pixels(w, h), w, h);
            prop_assert!((copy.x - crop.x).abs() < 1e-9);
            prop_assert!((copy.y - crop.y).abs() < 1e-9);
            prop_assert!((copy.width - crop.width).abs() < 1e-9);
            prop_assert!((copy.height - crop.height).abs() < 1e-9);
        }

        /// Property: Dragging never leaves the image.
        #[test]
        fn prop_drag_stays_inside(
            crop in crop_strategy(),
            (w, h) in dimensions_strategy(),
            px in -20000.0f64..20000.0,
            py in -20000.0f64..20000.0
        ) {
            let mut crop = crop;
            crop.drag_to(px, py, w, h);
            prop_assert!(crop.percent_rect().is_within(100.0, 100.0));
        }

        /// Property: Resizing never leaves the image.
        #[test]
        fn prop_resize_stays_inside(
            tag in preset_strategy(),
            (w, h) in dimensions_strategy(),
            x in -5000.0f64..10000.0,
            y in -5000.0f64..10000.0,
            rw in 0.0f64..10000.0,
            rh in 0.0f64..10000.0
        ) {
            let mut crop = CropState::default();
            crop.set_aspect_ratio(tag, Some((w, h)));
            crop.resize_to(Rect::new(x, y, rw, rh), w, h);
            prop_assert!(crop.percent_rect().is_within(100.0, 100.0));
        }

        /// Property: A fixed-ratio fit has the requested ratio and fits.
        #[test]
        fn prop_fit_aspect_ratio(
            tag in preset_strategy(),
            (w, h) in dimensions_strategy()
        ) {
            if let Some(ratio) = AspectRatio::parse(tag).and_then(|a| a.ratio()) {
                let rect = fit_aspect(ratio, w, h);
                prop_assert!(rect.is_within(w, h));
                prop_assert!((rect.width / rect.height - ratio).abs() < 1e-6);
                // One side always spans the image
                prop_assert!((rect.width - w).abs() < 1e-6 || (rect.height - h).abs() < 1e-6);
            }
        }
    }
}
