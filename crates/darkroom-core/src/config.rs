//! Editor configuration.
//!
//! Every tunable constant of the session lives here so a host can override
//! it with a partial JSON object; missing keys fall back to the defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for an [`EditSession`](crate::EditSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of history entries kept
    pub history_limit: usize,
    /// Readiness polls before the segmentation model is declared unavailable
    pub model_poll_attempts: u32,
    /// Delay between readiness polls, in milliseconds
    pub model_poll_interval_ms: u64,
    /// Lower bound for interactive zoom
    pub min_zoom: f64,
    /// Upper bound for interactive zoom
    pub max_zoom: f64,
    /// Multiplicative step per wheel notch
    pub zoom_step: f64,
    /// Padding subtracted from the container before fitting the image
    pub fit_padding: f64,
    /// Initial lossy export quality (1-100)
    pub default_export_quality: u8,
    /// Clamp adjustment input to documented ranges
    pub clamp_input: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            model_poll_attempts: 50,
            model_poll_interval_ms: 100,
            min_zoom: 0.1,
            max_zoom: 10.0,
            zoom_step: 1.1,
            fit_padding: 40.0,
            default_export_quality: 92,
            clamp_input: true,
        }
    }
}

impl EditorConfig {
    pub fn model_poll_interval(&self) -> Duration {
        Duration::from_millis(self.model_poll_interval_ms)
    }

    /// Copy with nonsensical values replaced by defaults.
    ///
    /// A zero history limit, an inverted zoom range or a quality outside
    /// 1-100 cannot be honored, so they are reset individually.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.history_limit == 0 {
            self.history_limit = defaults.history_limit;
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom && self.max_zoom.is_finite()) {
            self.min_zoom = defaults.min_zoom;
            self.max_zoom = defaults.max_zoom;
        }
        if !(self.zoom_step > 1.0 && self.zoom_step.is_finite()) {
            self.zoom_step = defaults.zoom_step;
        }
        if !(self.fit_padding >= 0.0 && self.fit_padding.is_finite()) {
            self.fit_padding = defaults.fit_padding;
        }
        if !(1..=100).contains(&self.default_export_quality) {
            self.default_export_quality = defaults.default_export_quality;
        }
        self
    }
}
