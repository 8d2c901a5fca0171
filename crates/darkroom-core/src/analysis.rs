//! One-click suggestions computed from image statistics.
//!
//! Both analyses sample a (typically downscaled) RGB buffer rather than
//! every pixel: auto enhance reads every 4th pixel, auto white balance every
//! 8th. The result is a set of adjustment values, never pixels.

use serde::{Deserialize, Serialize};

use crate::adjustments::AdjustmentKey;
use crate::decode::DecodedImage;
use crate::luminance::luma;

/// Pixel stride for auto enhance.
pub const ENHANCE_SAMPLE_STEP: usize = 4;

/// Pixel stride for auto white balance.
pub const WHITE_BALANCE_SAMPLE_STEP: usize = 8;

/// Longest edge of the buffer the host should analyze.
pub const ANALYSIS_MAX_EDGE: u32 = 512;

/// Luminance statistics of the sampled pixels, on the 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl LuminanceStats {
    pub fn range(&self) -> f32 {
        self.max - self.min
    }
}

/// Mean channel values of the sampled pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMeans {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

/// Suggested light and color values from auto enhance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoEnhance {
    pub exposure: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub brightness: f32,
    pub black_point: f32,
    pub saturation: f32,
    pub brilliance: f32,
}

impl AutoEnhance {
    /// Suggestion as (field, value) pairs.
    pub fn values(&self) -> [(AdjustmentKey, f32); 8] {
        [
            (AdjustmentKey::Exposure, self.exposure),
            (AdjustmentKey::Contrast, self.contrast),
            (AdjustmentKey::Highlights, self.highlights),
            (AdjustmentKey::Shadows, self.shadows),
            (AdjustmentKey::Brightness, self.brightness),
            (AdjustmentKey::BlackPoint, self.black_point),
            (AdjustmentKey::Saturation, self.saturation),
            (AdjustmentKey::Brilliance, self.brilliance),
        ]
    }
}

/// Suggested white balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoWhiteBalance {
    pub temperature: f32,
    pub tint: f32,
}

impl AutoWhiteBalance {
    pub fn values(&self) -> [(AdjustmentKey, f32); 2] {
        [
            (AdjustmentKey::Temperature, self.temperature),
            (AdjustmentKey::Tint, self.tint),
        ]
    }
}

fn sampled(pixels: &[u8], step: usize) -> impl Iterator<Item = &[u8]> {
    pixels.chunks_exact(3).step_by(step)
}

/// Luminance statistics over every `step`-th pixel. `None` for an empty buffer.
pub fn luminance_stats(pixels: &[u8], step: usize) -> Option<LuminanceStats> {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    let mut sum = 0.0f64;
    let mut count = 0usize;

    for px in sampled(pixels, step.max(1)) {
        let lum = luma(px[0], px[1], px[2]);
        min = min.min(lum);
        max = max.max(lum);
        sum += lum as f64;
        count += 1;
    }

    if count == 0 {
        return None;
    }
    Some(LuminanceStats {
        min,
        max,
        mean: (sum / count as f64) as f32,
    })
}

/// Per-channel means over every `step`-th pixel. `None` for an empty buffer.
pub fn channel_means(pixels: &[u8], step: usize) -> Option<ChannelMeans> {
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    let mut count = 0u64;

    for px in sampled(pixels, step.max(1)) {
        r += px[0] as u64;
        g += px[1] as u64;
        b += px[2] as u64;
        count += 1;
    }

    if count == 0 {
        return None;
    }
    let n = count as f32;
    Some(ChannelMeans {
        red: r as f32 / n,
        green: g as f32 / n,
        blue: b as f32 / n,
    })
}

/// Exposure toward mid gray, contrast for narrow ranges, and clipping recovery.
pub fn auto_enhance(image: &DecodedImage) -> Option<AutoEnhance> {
    let stats = luminance_stats(&image.pixels, ENHANCE_SAMPLE_STEP)?;
    let range = stats.range();

    let exposure = ((128.0 - stats.mean) / 2.0).clamp(-30.0, 30.0);
    let contrast = if range < 100.0 {
        ((150.0 - range) / 2.0).clamp(0.0, 30.0)
    } else {
        0.0
    };
    let highlights = if stats.max > 240.0 { -20.0 } else { 0.0 };
    let shadows = if stats.min < 15.0 { 20.0 } else { 0.0 };

    log::debug!(
        "Auto enhance: mean {:.1}, range {:.1} -> exposure {:.1}, contrast {:.1}",
        stats.mean,
        range,
        exposure,
        contrast
    );

    Some(AutoEnhance {
        exposure,
        contrast,
        highlights,
        shadows,
        brightness: 0.0,
        black_point: 0.0,
        saturation: 10.0,
        brilliance: 5.0,
    })
}

/// Gray-world white balance: pull red and blue toward each other and green
/// toward their mean.
pub fn auto_white_balance(image: &DecodedImage) -> Option<AutoWhiteBalance> {
    let means = channel_means(&image.pixels, WHITE_BALANCE_SAMPLE_STEP)?;

    let temperature = ((means.blue - means.red) * 1.5).clamp(-50.0, 50.0);
    let tint = ((means.green - (means.red + means.blue) / 2.0) * 1.5).clamp(-50.0, 50.0);

    Some(AutoWhiteBalance { temperature, tint })
}
