//! Adjustment field registry.
//!
//! Every numeric edit parameter is addressable through [`AdjustmentKey`],
//! which knows the field's wire name, panel category, default and documented
//! range. The [`Adjustments`] value itself stays a plain container: `set`
//! stores whatever it is given and never clamps.
//!
//! ## Categories
//! - Light: exposure, brilliance, highlights, shadows, contrast, brightness, black point
//! - Color: saturation, vibrance, temperature, tint
//! - Detail: sharpness, clarity, noise reduction
//! - Effects: vignette, grain
//! - Geometry: rotation, straighten, straighten scale (plus the aspect ratio tag)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Adjustments;

/// Panel grouping for adjustment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Light,
    Color,
    Detail,
    Effects,
    Geometry,
}

/// Numeric adjustment fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdjustmentKey {
    Exposure,
    Brilliance,
    Highlights,
    Shadows,
    Contrast,
    Brightness,
    BlackPoint,
    Saturation,
    Vibrance,
    Temperature,
    Tint,
    Sharpness,
    Clarity,
    NoiseReduction,
    Vignette,
    Grain,
    Rotation,
    Straighten,
    StraightenScale,
}

/// Returned when parsing an unknown field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown adjustment: {0}")]
pub struct UnknownAdjustment(pub String);

impl AdjustmentKey {
    /// All keys in panel order.
    pub const ALL: [AdjustmentKey; 19] = [
        AdjustmentKey::Exposure,
        AdjustmentKey::Brilliance,
        AdjustmentKey::Highlights,
        AdjustmentKey::Shadows,
        AdjustmentKey::Contrast,
        AdjustmentKey::Brightness,
        AdjustmentKey::BlackPoint,
        AdjustmentKey::Saturation,
        AdjustmentKey::Vibrance,
        AdjustmentKey::Temperature,
        AdjustmentKey::Tint,
        AdjustmentKey::Sharpness,
        AdjustmentKey::Clarity,
        AdjustmentKey::NoiseReduction,
        AdjustmentKey::Vignette,
        AdjustmentKey::Grain,
        AdjustmentKey::Rotation,
        AdjustmentKey::Straighten,
        AdjustmentKey::StraightenScale,
    ];

    /// The camelCase name used on the JavaScript side.
    pub fn name(self) -> &'static str {
        match self {
            AdjustmentKey::Exposure => "exposure",
            AdjustmentKey::Brilliance => "brilliance",
            AdjustmentKey::Highlights => "highlights",
            AdjustmentKey::Shadows => "shadows",
            AdjustmentKey::Contrast => "contrast",
            AdjustmentKey::Brightness => "brightness",
            AdjustmentKey::BlackPoint => "blackPoint",
            AdjustmentKey::Saturation => "saturation",
            AdjustmentKey::Vibrance => "vibrance",
            AdjustmentKey::Temperature => "temperature",
            AdjustmentKey::Tint => "tint",
            AdjustmentKey::Sharpness => "sharpness",
            AdjustmentKey::Clarity => "clarity",
            AdjustmentKey::NoiseReduction => "noiseReduction",
            AdjustmentKey::Vignette => "vignette",
            AdjustmentKey::Grain => "grain",
            AdjustmentKey::Rotation => "rotation",
            AdjustmentKey::Straighten => "straighten",
            AdjustmentKey::StraightenScale => "straightenScale",
        }
    }

    pub fn category(self) -> Category {
        match self {
            AdjustmentKey::Exposure
            | AdjustmentKey::Brilliance
            | AdjustmentKey::Highlights
            | AdjustmentKey::Shadows
            | AdjustmentKey::Contrast
            | AdjustmentKey::Brightness
            | AdjustmentKey::BlackPoint => Category::Light,
            AdjustmentKey::Saturation
            | AdjustmentKey::Vibrance
            | AdjustmentKey::Temperature
            | AdjustmentKey::Tint => Category::Color,
            AdjustmentKey::Sharpness | AdjustmentKey::Clarity | AdjustmentKey::NoiseReduction => {
                Category::Detail
            }
            AdjustmentKey::Vignette | AdjustmentKey::Grain => Category::Effects,
            AdjustmentKey::Rotation | AdjustmentKey::Straighten | AdjustmentKey::StraightenScale => {
                Category::Geometry
            }
        }
    }

    /// Value restored by a reset.
    pub fn default_value(self) -> f32 {
        match self {
            AdjustmentKey::StraightenScale => 1.0,
            _ => 0.0,
        }
    }

    /// Documented (min, max) range for the field.
    pub fn range(self) -> (f32, f32) {
        match self {
            AdjustmentKey::Sharpness | AdjustmentKey::NoiseReduction | AdjustmentKey::Grain => {
                (0.0, 100.0)
            }
            AdjustmentKey::Rotation => (0.0, 360.0),
            AdjustmentKey::Straighten => (-45.0, 45.0),
            AdjustmentKey::StraightenScale => (1.0, f32::MAX),
            _ => (-100.0, 100.0),
        }
    }

    /// Bring a value into the documented range.
    ///
    /// Rotation snaps to the nearest quarter turn and wraps instead of
    /// clamping, so -90 becomes 270. NaN maps to the field default.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        match self {
            AdjustmentKey::Rotation => ((value / 90.0).round() * 90.0).rem_euclid(360.0),
            _ => {
                let (min, max) = self.range();
                value.clamp(min, max)
            }
        }
    }

    /// Only `straighten` may write the derived scale.
    pub fn is_user_settable(self) -> bool {
        self != AdjustmentKey::StraightenScale
    }
}

impl fmt::Display for AdjustmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdjustmentKey {
    type Err = UnknownAdjustment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdjustmentKey::ALL
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| UnknownAdjustment(s.to_string()))
    }
}

impl Adjustments {
    /// Read one field.
    pub fn get(&self, key: AdjustmentKey) -> f32 {
        match key {
            AdjustmentKey::Exposure => self.exposure,
            AdjustmentKey::Brilliance => self.brilliance,
            AdjustmentKey::Highlights => self.highlights,
            AdjustmentKey::Shadows => self.shadows,
            AdjustmentKey::Contrast => self.contrast,
            AdjustmentKey::Brightness => self.brightness,
            AdjustmentKey::BlackPoint => self.black_point,
            AdjustmentKey::Saturation => self.saturation,
            AdjustmentKey::Vibrance => self.vibrance,
            AdjustmentKey::Temperature => self.temperature,
            AdjustmentKey::Tint => self.tint,
            AdjustmentKey::Sharpness => self.sharpness,
            AdjustmentKey::Clarity => self.clarity,
            AdjustmentKey::NoiseReduction => self.noise_reduction,
            AdjustmentKey::Vignette => self.vignette,
            AdjustmentKey::Grain => self.grain,
            AdjustmentKey::Rotation => self.rotation,
            AdjustmentKey::Straighten => self.straighten,
            AdjustmentKey::StraightenScale => self.straighten_scale,
        }
    }

    /// Replace one field. No clamping, no side effects.
    pub fn set(&mut self, key: AdjustmentKey, value: f32) {
        let slot = match key {
            AdjustmentKey::Exposure => &mut self.exposure,
            AdjustmentKey::Brilliance => &mut self.brilliance,
            AdjustmentKey::Highlights => &mut self.highlights,
            AdjustmentKey::Shadows => &mut self.shadows,
            AdjustmentKey::Contrast => &mut self.contrast,
            AdjustmentKey::Brightness => &mut self.brightness,
            AdjustmentKey::BlackPoint => &mut self.black_point,
            AdjustmentKey::Saturation => &mut self.saturation,
            AdjustmentKey::Vibrance => &mut self.vibrance,
            AdjustmentKey::Temperature => &mut self.temperature,
            AdjustmentKey::Tint => &mut self.tint,
            AdjustmentKey::Sharpness => &mut self.sharpness,
            AdjustmentKey::Clarity => &mut self.clarity,
            AdjustmentKey::NoiseReduction => &mut self.noise_reduction,
            AdjustmentKey::Vignette => &mut self.vignette,
            AdjustmentKey::Grain => &mut self.grain,
            AdjustmentKey::Rotation => &mut self.rotation,
            AdjustmentKey::Straighten => &mut self.straighten,
            AdjustmentKey::StraightenScale => &mut self.straighten_scale,
        };
        *slot = value;
    }

    /// Restore one field to its default.
    ///
    /// Resetting `straighten` also restores the derived scale, since a zero
    /// angle always needs a scale of exactly 1.
    pub fn reset(&mut self, key: AdjustmentKey) {
        self.set(key, key.default_value());
        if key == AdjustmentKey::Straighten {
            self.straighten_scale = AdjustmentKey::StraightenScale.default_value();
        }
    }

    /// Fields that differ from their defaults, in panel order.
    pub fn modified_keys(&self) -> Vec<AdjustmentKey> {
        AdjustmentKey::ALL
            .iter()
            .copied()
            .filter(|key| self.get(*key) != key.default_value())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for key in AdjustmentKey::ALL {
            assert_eq!(key.name().parse::<AdjustmentKey>(), Ok(key));
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = "clarityy".parse::<AdjustmentKey>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown adjustment: clarityy");
    }

    #[test]
    fn test_serde_name_matches_wire_name() {
        for key in AdjustmentKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.name()));
        }
    }

    #[test]
    fn test_set_and_get_every_field() {
        let mut adj = Adjustments::default();
        for (i, key) in AdjustmentKey::ALL.iter().enumerate() {
            adj.set(*key, i as f32 + 1.0);
        }
        for (i, key) in AdjustmentKey::ALL.iter().enumerate() {
            assert_eq!(adj.get(*key), i as f32 + 1.0, "field {}", key);
        }
    }

    #[test]
    fn test_set_does_not_clamp() {
        let mut adj = Adjustments::default();
        adj.set(AdjustmentKey::Contrast, 500.0);
        assert_eq!(adj.contrast, 500.0);
    }

    #[test]
    fn test_reset_restores_default() {
        let mut adj = Adjustments::default();
        adj.set(AdjustmentKey::Vignette, 40.0);
        adj.reset(AdjustmentKey::Vignette);
        assert!(adj.is_default());
    }

    #[test]
    fn test_reset_straighten_restores_scale() {
        let mut adj = Adjustments::default();
        adj.straighten = 30.0;
        adj.straighten_scale = 1.866;
        adj.reset(AdjustmentKey::Straighten);
        assert_eq!(adj.straighten, 0.0);
        assert_eq!(adj.straighten_scale, 1.0);
    }

    #[test]
    fn test_ranges() {
        assert_eq!(AdjustmentKey::Exposure.range(), (-100.0, 100.0));
        assert_eq!(AdjustmentKey::Sharpness.range(), (0.0, 100.0));
        assert_eq!(AdjustmentKey::NoiseReduction.range(), (0.0, 100.0));
        assert_eq!(AdjustmentKey::Straighten.range(), (-45.0, 45.0));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(AdjustmentKey::Contrast.clamp(150.0), 100.0);
        assert_eq!(AdjustmentKey::Grain.clamp(-5.0), 0.0);
        assert_eq!(AdjustmentKey::Straighten.clamp(-60.0), -45.0);
        assert_eq!(AdjustmentKey::StraightenScale.clamp(0.5), 1.0);
        assert_eq!(AdjustmentKey::Tint.clamp(f32::NAN), 0.0);
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(AdjustmentKey::Rotation.clamp(-90.0), 270.0);
        assert_eq!(AdjustmentKey::Rotation.clamp(360.0), 0.0);
        assert_eq!(AdjustmentKey::Rotation.clamp(450.0), 90.0);
    }

    #[test]
    fn test_rotation_snaps_to_quarter_turns() {
        assert_eq!(AdjustmentKey::Rotation.clamp(45.0), 90.0);
        assert_eq!(AdjustmentKey::Rotation.clamp(44.0), 0.0);
        assert_eq!(AdjustmentKey::Rotation.clamp(-100.0), 270.0);
        assert_eq!(AdjustmentKey::Rotation.clamp(359.0), 0.0);
    }

    #[test]
    fn test_categories() {
        assert_eq!(AdjustmentKey::BlackPoint.category(), Category::Light);
        assert_eq!(AdjustmentKey::Tint.category(), Category::Color);
        assert_eq!(AdjustmentKey::Clarity.category(), Category::Detail);
        assert_eq!(AdjustmentKey::Grain.category(), Category::Effects);
        assert_eq!(AdjustmentKey::Straighten.category(), Category::Geometry);
    }

    #[test]
    fn test_straighten_scale_not_user_settable() {
        assert!(!AdjustmentKey::StraightenScale.is_user_settable());
        assert!(AdjustmentKey::Straighten.is_user_settable());
    }

    #[test]
    fn test_modified_keys() {
        let mut adj = Adjustments::default();
        assert!(adj.modified_keys().is_empty());
        adj.contrast = 50.0;
        adj.grain = 10.0;
        assert_eq!(
            adj.modified_keys(),
            vec![AdjustmentKey::Contrast, AdjustmentKey::Grain]
        );
    }
}
