//! Compositing derivation.
//!
//! Maps an [`Adjustments`] snapshot to the description a renderer applies:
//! an ordered filter chain plus two overlays (vignette and grain) that sit
//! on top of the filtered image rather than inside the chain.
//!
//! ## Chain Order
//! 1. Brightness
//! 2. Contrast
//! 3. Saturation
//! 4. Exposure (as brightness)
//! 5. Temperature (sepia when warm, hue rotation when cool)
//! 6. Tint (hue rotation)
//! 7. Highlights/shadows (combined brightness)
//! 8. Black point (contrast)
//! 9. Vibrance (saturation)
//! 10. Brilliance (brightness then contrast)
//! 11. Noise reduction (blur)
//!
//! Each stage runs on the output of the previous one, so the order is part
//! of the contract. Stages 1-4 are always emitted, the rest only when their
//! source field is non-zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Adjustments;

/// One visual operation in CSS filter terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "amount", rename_all = "kebab-case")]
pub enum FilterOp {
    /// Multiplier, 1 = unchanged
    Brightness(f32),
    /// Multiplier, 1 = unchanged
    Contrast(f32),
    /// Multiplier, 1 = unchanged
    Saturate(f32),
    /// Blend amount, 0 = unchanged
    Sepia(f32),
    /// Degrees, 0 = unchanged
    HueRotate(f32),
    /// Radius in pixels, 0 = unchanged
    Blur(f32),
}

impl FilterOp {
    pub fn name(&self) -> &'static str {
        match self {
            FilterOp::Brightness(_) => "brightness",
            FilterOp::Contrast(_) => "contrast",
            FilterOp::Saturate(_) => "saturate",
            FilterOp::Sepia(_) => "sepia",
            FilterOp::HueRotate(_) => "hue-rotate",
            FilterOp::Blur(_) => "blur",
        }
    }

    pub fn amount(&self) -> f32 {
        match *self {
            FilterOp::Brightness(v)
            | FilterOp::Contrast(v)
            | FilterOp::Saturate(v)
            | FilterOp::Sepia(v)
            | FilterOp::HueRotate(v)
            | FilterOp::Blur(v) => v,
        }
    }

    /// True when applying the operation cannot change any pixel.
    pub fn is_neutral(&self) -> bool {
        match *self {
            FilterOp::Brightness(v) | FilterOp::Contrast(v) | FilterOp::Saturate(v) => v == 1.0,
            FilterOp::Sepia(v) | FilterOp::Blur(v) => v == 0.0,
            FilterOp::HueRotate(v) => v.rem_euclid(360.0) == 0.0,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOp::HueRotate(deg) => write!(f, "hue-rotate({}deg)", deg),
            FilterOp::Blur(px) => write!(f, "blur({}px)", px),
            op => write!(f, "{}({})", op.name(), op.amount()),
        }
    }
}

/// Ordered list of filter operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterChain {
    ops: Vec<FilterOp>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: FilterOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterOp> {
        self.ops.iter()
    }

    /// True when every operation is neutral (including the empty chain).
    pub fn is_neutral(&self) -> bool {
        self.ops.iter().all(FilterOp::is_neutral)
    }

    /// Copy of the chain with neutral operations dropped.
    ///
    /// Two chains describe the same rendering exactly when their effective
    /// forms are equal.
    pub fn effective(&self) -> FilterChain {
        FilterChain {
            ops: self.ops.iter().copied().filter(|op| !op.is_neutral()).collect(),
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

/// Derive the ordered filter chain for a set of adjustments.
pub fn derive_filter_chain(adj: &Adjustments) -> FilterChain {
    let mut chain = FilterChain::new();

    chain.push(FilterOp::Brightness(1.0 + adj.brightness / 100.0));
    chain.push(FilterOp::Contrast(1.0 + adj.contrast / 100.0));
    chain.push(FilterOp::Saturate(1.0 + adj.saturation / 100.0));
    chain.push(FilterOp::Brightness(1.0 + adj.exposure / 50.0));

    if adj.temperature > 0.0 {
        // Warm
        chain.push(FilterOp::Sepia(adj.temperature / 200.0));
    } else if adj.temperature < 0.0 {
        // Cool
        chain.push(FilterOp::HueRotate(adj.temperature / 2.0));
    }

    if adj.tint != 0.0 {
        chain.push(FilterOp::HueRotate(adj.tint));
    }

    if adj.highlights != 0.0 || adj.shadows != 0.0 {
        let highlight = 1.0 + adj.highlights / 200.0;
        let shadow = 1.0 + adj.shadows / 200.0;
        chain.push(FilterOp::Brightness((highlight + shadow) / 2.0));
    }

    if adj.black_point != 0.0 {
        chain.push(FilterOp::Contrast(1.0 + adj.black_point / 100.0));
    }

    if adj.vibrance != 0.0 {
        chain.push(FilterOp::Saturate(1.0 + adj.vibrance / 150.0));
    }

    if adj.brilliance != 0.0 {
        chain.push(FilterOp::Brightness(1.0 + adj.brilliance / 150.0));
        chain.push(FilterOp::Contrast(1.0 + adj.brilliance / 300.0));
    }

    if adj.noise_reduction > 0.0 {
        chain.push(FilterOp::Blur(adj.noise_reduction / 50.0));
    }

    chain
}

/// Color of the vignette overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VignetteColor {
    /// Darkening vignette (positive values)
    Black,
    /// Lightening vignette (negative values)
    White,
}

impl VignetteColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            VignetteColor::Black => (0, 0, 0),
            VignetteColor::White => (255, 255, 255),
        }
    }
}

/// Radial gradient drawn over the filtered image.
///
/// Transparent from the center out to `inner_stop_percent` of the radius,
/// then ramps to `edge_alpha` at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VignetteOverlay {
    pub intensity: f32,
    pub color: VignetteColor,
    pub inner_stop_percent: f32,
    pub edge_alpha: f32,
}

impl VignetteOverlay {
    /// Build the overlay for a vignette value, `None` when it is zero.
    pub fn from_value(vignette: f32) -> Option<Self> {
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
            intensity,
            color,
            inner_stop_percent: 60.0 - intensity * 30.0,
            edge_alpha,
        })
    }

    /// CSS `background` value for an overlay element.
    pub fn to_css(&self) -> String {
        let (r, g, b) = self.color.rgb();
        format!(
            "radial-gradient(ellipse at center, transparent 0%, transparent {}%, rgba({},{},{},{}) 100%)",
            self.inner_stop_percent, r, g, b, self.edge_alpha
        )
    }
}

/// Blend mode for overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    Overlay,
}

/// Static fractal-noise texture used for film grain.
///
/// An SVG `feTurbulence` tile. The pattern only has to be stable, the exact
/// pixels carry no meaning.
pub const GRAIN_TEXTURE_SVG: &str = "<svg viewBox='0 0 200 200' xmlns='http://www.w3.org/2000/svg'>\
<filter id='noise'><feTurbulence type='fractalNoise' baseFrequency='0.9' numOctaves='4' stitchTiles='stitch'/></filter>\
<rect width='100%' height='100%' filter='url(#noise)'/></svg>";

/// Film grain overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrainOverlay {
    pub opacity: f32,
    pub blend: BlendMode,
}

impl GrainOverlay {
    /// Build the overlay for a grain value, `None` when there is no grain.
    pub fn from_value(grain: f32) -> Option<Self> {
        if grain <= 0.0 {
            return None;
        }
        Some(Self {
            opacity: grain / 100.0 * 0.3,
            blend: BlendMode::Overlay,
        })
    }

    /// The noise tile as a `data:` URL ready for `background-image`.
    pub fn texture_data_url() -> String {
        let mut encoded = String::with_capacity(GRAIN_TEXTURE_SVG.len() * 2);
        for c in GRAIN_TEXTURE_SVG.chars() {
            match c {
                '<' => encoded.push_str("%3C"),
                '>' => encoded.push_str("%3E"),
                '#' => encoded.push_str("%23"),
                '%' => encoded.push_str("%25"),
                _ => encoded.push(c),
            }
        }
        format!("data:image/svg+xml,{}", encoded)
    }
}

/// Everything the renderer pulls each frame for the global adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDescription {
    pub filter_chain: FilterChain,
    pub vignette: Option<VignetteOverlay>,
    pub grain: Option<GrainOverlay>,
    /// Rotation plus straighten, in degrees
    pub rotation_degrees: f32,
    pub straighten_scale: f32,
}

impl RenderDescription {
    /// Unedited look with the current geometry, used while comparing.
    pub fn original(adj: &Adjustments) -> Self {
        Self {
            filter_chain: FilterChain::new(),
            vignette: None,
            grain: None,
            rotation_degrees: adj.total_rotation(),
            straighten_scale: adj.straighten_scale,
        }
    }

    /// Nothing in the description alters pixel values.
    pub fn is_identity(&self) -> bool {
        self.filter_chain.is_neutral() && self.vignette.is_none() && self.grain.is_none()
    }
}

/// Derive the full render description. Pure: equal input, equal output.
pub fn derive_render(adj: &Adjustments) -> RenderDescription {
    RenderDescription {
        filter_chain: derive_filter_chain(adj),
        vignette: VignetteOverlay::from_value(adj.vignette),
        grain: GrainOverlay::from_value(adj.grain),
        rotation_degrees: adj.total_rotation(),
        straighten_scale: adj.straighten_scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effective(adj: &Adjustments) -> Vec<FilterOp> {
        derive_filter_chain(adj).effective().ops().to_vec()
    }

    // ===== Identity Tests =====

    #[test]
    fn test_default_is_identity() {
        let desc = derive_render(&Adjustments::default());
        assert!(desc.filter_chain.is_neutral());
        assert!(desc.vignette.is_none());
        assert!(desc.grain.is_none());
        assert!(desc.is_identity());
        assert_eq!(desc.rotation_degrees, 0.0);
    }

    #[test]
    fn test_default_chain_text() {
        let chain = derive_filter_chain(&Adjustments::default());
        assert_eq!(
            chain.to_string(),
            "brightness(1) contrast(1) saturate(1) brightness(1)"
        );
    }

    // ===== Single Field Tests =====

    #[test]
    fn test_contrast_only() {
        let mut adj = Adjustments::default();
        adj.contrast = 50.0;
        assert_eq!(effective(&adj), vec![FilterOp::Contrast(1.5)]);
    }

    #[test]
    fn test_exposure_uses_fifty_divisor() {
        let mut adj = Adjustments::default();
        adj.exposure = 25.0;
        assert_eq!(effective(&adj), vec![FilterOp::Brightness(1.5)]);
    }

    #[test]
    fn test_warm_temperature_is_sepia() {
        let mut adj = Adjustments::default();
        adj.temperature = 40.0;
        assert_eq!(effective(&adj), vec![FilterOp::Sepia(0.2)]);
    }

    #[test]
    fn test_cool_temperature_is_hue_rotate() {
        let mut adj = Adjustments::default();
        adj.temperature = -40.0;
        assert_eq!(effective(&adj), vec![FilterOp::HueRotate(-20.0)]);
    }

    #[test]
    fn test_highlights_and_shadows_average() {
        let mut adj = Adjustments::default();
        adj.highlights = 40.0;
        adj.shadows = -20.0;
        // (1.2 + 0.9) / 2
        let ops = effective(&adj);
        assert_eq!(ops.len(), 1);
        match ops[0] {
            FilterOp::Brightness(v) => assert!((v - 1.05).abs() < 1e-6),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_brilliance_emits_two_ops_in_order() {
        let mut adj = Adjustments::default();
        adj.brilliance = 30.0;
        assert_eq!(
            effective(&adj),
            vec![FilterOp::Brightness(1.2), FilterOp::Contrast(1.1)]
        );
    }

    #[test]
    fn test_noise_reduction_blur() {
        let mut adj = Adjustments::default();
        adj.noise_reduction = 100.0;
        assert_eq!(effective(&adj), vec![FilterOp::Blur(2.0)]);
    }

    #[test]
    fn test_negative_noise_reduction_ignored() {
        let mut adj = Adjustments::default();
        adj.noise_reduction = -10.0;
        assert!(derive_filter_chain(&adj).is_neutral());
    }

    #[test]
    fn test_detail_fields_do_not_touch_chain() {
        let mut adj = Adjustments::default();
        adj.sharpness = 80.0;
        adj.clarity = -30.0;
        assert!(derive_filter_chain(&adj).is_neutral());
    }

    // ===== Ordering Tests =====

    #[test]
    fn test_full_chain_order() {
        let mut adj = Adjustments::default();
        adj.brightness = 10.0;
        adj.contrast = 10.0;
        adj.saturation = 10.0;
        adj.exposure = 10.0;
        adj.temperature = 10.0;
        adj.tint = 10.0;
        adj.highlights = 10.0;
        adj.black_point = 10.0;
        adj.vibrance = 10.0;
        adj.brilliance = 10.0;
        adj.noise_reduction = 10.0;

        let names: Vec<&str> = derive_filter_chain(&adj).iter().map(|op| op.name()).collect();
        assert_eq!(
            names,
            vec![
                "brightness",
                "contrast",
                "saturate",
                "brightness",
                "sepia",
                "hue-rotate",
                "brightness",
                "contrast",
                "saturate",
                "brightness",
                "contrast",
                "blur",
            ]
        );
    }

    // ===== Text Form Tests =====

    #[test]
    fn test_op_display() {
        assert_eq!(FilterOp::Contrast(1.5).to_string(), "contrast(1.5)");
        assert_eq!(FilterOp::HueRotate(-20.0).to_string(), "hue-rotate(-20deg)");
        assert_eq!(FilterOp::Blur(0.5).to_string(), "blur(0.5px)");
    }

    // ===== Overlay Tests =====

    #[test]
    fn test_vignette_positive() {
        let v = VignetteOverlay::from_value(40.0).unwrap();
        assert!((v.intensity - 0.4).abs() < 1e-6);
        assert_eq!(v.color, VignetteColor::Black);
        assert!((v.inner_stop_percent - 48.0).abs() < 1e-4);
        assert!((v.edge_alpha - 0.32).abs() < 1e-6);
    }

    #[test]
    fn test_vignette_negative_is_white() {
        let v = VignetteOverlay::from_value(-100.0).unwrap();
        assert_eq!(v.color, VignetteColor::White);
        assert!((v.inner_stop_percent - 30.0).abs() < 1e-4);
        assert!((v.edge_alpha - 0.5).abs() < 1e-6);
        assert!(v.to_css().contains("rgba(255,255,255,0.5) 100%"));
    }

    #[test]
    fn test_vignette_zero_absent() {
        assert!(VignetteOverlay::from_value(0.0).is_none());
    }

    #[test]
    fn test_grain_opacity() {
        let g = GrainOverlay::from_value(50.0).unwrap();
        assert!((g.opacity - 0.15).abs() < 1e-6);
        assert_eq!(g.blend, BlendMode::Overlay);
        assert!(GrainOverlay::from_value(0.0).is_none());
    }

    #[test]
    fn test_grain_texture_is_stable() {
        let a = GrainOverlay::texture_data_url();
        let b = GrainOverlay::texture_data_url();
        assert_eq!(a, b);
        assert!(a.starts_with("data:image/svg+xml,%3Csvg"));
        assert!(!a.contains('#'));
    }

    #[test]
    fn test_overlays_not_in_chain() {
        let mut adj = Adjustments::default();
        adj.vignette = 50.0;
        adj.grain = 50.0;
        let desc = derive_render(&adj);
        assert!(desc.filter_chain.is_neutral());
        assert!(desc.vignette.is_some());
        assert!(desc.grain.is_some());
    }

    #[test]
    fn test_rotation_combined() {
        let mut adj = Adjustments::default();
        adj.rotation = 180.0;
        adj.straighten = 5.0;
        assert_eq!(derive_render(&adj).rotation_degrees, 185.0);
    }

    #[test]
    fn test_original_keeps_geometry_only() {
        let mut adj = Adjustments::default();
        adj.contrast = 30.0;
        adj.vignette = 30.0;
        adj.rotation = 90.0;
        let desc = RenderDescription::original(&adj);
        assert!(desc.is_identity());
        assert_eq!(desc.rotation_degrees, 90.0);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
