//! The edit session: one image and everything done to it.
//!
//! [`EditSession`] owns the adjustment model, crop and view geometry, the
//! mask registry and history. Synchronous mutations never interleave; the
//! async operations (mask generation, export) take their inputs at
//! invocation time and apply their result in one step.
//!
//! History is committed at interaction boundaries only. Continuous edits
//! (`set_adjustment`, `set_straighten`, crop drags, mask adjustments) leave
//! committing to the caller; discrete actions (resets, rotation, mask
//! add/remove, auto tools, image load) commit on their own.

use serde::{Deserialize, Serialize};

use crate::adjustments::AdjustmentKey;
use crate::analysis::{auto_enhance, auto_white_balance, AutoEnhance, AutoWhiteBalance};
use crate::decode::{DecodeError, DecodedImage};
use crate::export::{run_export, ExportError, ExportPlan, ExportRenderer, ExportSettings, ExportedFile};
use crate::filters::{derive_render, RenderDescription};
use crate::geometry::{cover_scale, fit_scale, CropState, DisplayLayout, Rect, ViewMode, ViewState};
use crate::history::{system_time_ms, HistoryEntry, HistoryManager};
use crate::mask::{BitmapHandle, Mask, MaskId, MaskKind, MaskRegistry};
use crate::segmentation::{SegmentationBackend, SegmentationError, SegmentationService};
use crate::{Adjustments, EditorConfig, EditorError, ImageHandle, ImageState};

/// Active canvas tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Move,
    Brush,
    Eraser,
}

/// Brush used for painting masks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    pub size: f32,
    /// 0-100
    pub hardness: f32,
    /// 0-100
    pub opacity: f32,
    pub color: String,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 50.0,
            hardness: 50.0,
            opacity: 100.0,
            color: "red".to_string(),
        }
    }
}

/// Partial brush update; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushUpdate {
    pub size: Option<f32>,
    pub hardness: Option<f32>,
    pub opacity: Option<f32>,
    pub color: Option<String>,
}

impl BrushSettings {
    pub fn apply(&mut self, update: BrushUpdate) {
        if let Some(size) = update.size.filter(|s| s.is_finite()) {
            self.size = size.max(1.0);
        }
        if let Some(hardness) = update.hardness.filter(|h| h.is_finite()) {
            self.hardness = hardness.clamp(0.0, 100.0);
        }
        if let Some(opacity) = update.opacity.filter(|o| o.is_finite()) {
            self.opacity = opacity.clamp(0.0, 100.0);
        }
        if let Some(color) = update.color {
            self.color = color;
        }
    }
}

/// Editing state for one image.
#[derive(Debug, Clone)]
pub struct EditSession {
    config: EditorConfig,
    image: ImageState,
    adjustments: Adjustments,
    crop: CropState,
    view: ViewState,
    masks: MaskRegistry,
    history: HistoryManager,
    tool: Tool,
    brush: BrushSettings,
    show_original: bool,
    exporting: bool,
    clock: fn() -> u64,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditSession {
    pub fn new(config: EditorConfig) -> Self {
        let config = config.sanitized();
        Self {
            history: HistoryManager::new(config.history_limit),
            config,
            image: ImageState::default(),
            adjustments: Adjustments::default(),
            crop: CropState::default(),
            view: ViewState::default(),
            masks: MaskRegistry::new(),
            tool: Tool::default(),
            brush: BrushSettings::default(),
            show_original: false,
            exporting: false,
            clock: system_time_ms,
        }
    }

    /// Replace the timestamp source used for history entries.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn image(&self) -> &ImageState {
        &self.image
    }

    pub fn adjustments(&self) -> &Adjustments {
        &self.adjustments
    }

    pub fn crop(&self) -> &CropState {
        &self.crop
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn masks(&self) -> &MaskRegistry {
        &self.masks
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn is_showing_original(&self) -> bool {
        self.show_original
    }

    // ===== Image =====

    /// Start editing a new image.
    ///
    /// Adjustments, masks, crop, view and history are all reset, then the
    /// pristine state is committed as the first history entry.
    pub fn load_image(
        &mut self,
        source: ImageHandle,
        width: u32,
        height: u32,
        file_name: impl Into<String>,
    ) -> Result<(), EditorError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage.into());
        }
        self.image = ImageState::new(source, width, height, file_name);
        self.adjustments = Adjustments::default();
        self.crop = CropState::default();
        self.view.reset();
        self.masks.clear();
        self.history.clear();
        self.show_original = false;
        log::info!(
            "Loaded {} ({}x{})",
            self.image.file_name,
            self.image.original_width,
            self.image.original_height
        );
        self.commit();
        Ok(())
    }

    pub fn clear_image(&mut self) {
        self.image = ImageState::default();
    }

    // ===== Adjustments =====

    /// Set one global adjustment without committing.
    ///
    /// Out-of-range input is clamped when `clamp_input` is on. The derived
    /// straighten scale cannot be set directly; `straighten` is routed
    /// through [`set_straighten`](Self::set_straighten).
    ///
    /// # Returns
    ///
    /// The value actually stored.
    pub fn set_adjustment(&mut self, key: AdjustmentKey, value: f32) -> f32 {
        if !key.is_user_settable() {
            log::warn!("{} is derived and cannot be set directly", key);
            return self.adjustments.get(key);
        }
        if key == AdjustmentKey::Straighten {
            return self.set_straighten(value);
        }
        let value = self.bounded(key, value);
        self.adjustments.set(key, value);
        value
    }

    /// Restore one field to its default and commit.
    ///
    /// The derived straighten scale is left alone; reset `straighten` instead.
    pub fn reset_adjustment(&mut self, key: AdjustmentKey) {
        if !key.is_user_settable() {
            log::warn!("{} is derived and cannot be reset directly", key);
            return;
        }
        self.adjustments.reset(key);
        self.commit();
    }

    /// Restore every field to its default, drop all masks, and commit.
    pub fn reset_all(&mut self) {
        self.adjustments = Adjustments::default();
        self.crop.aspect_ratio = self.adjustments.crop_aspect_ratio.clone();
        self.masks.clear();
        log::info!("Reset all adjustments");
        self.commit();
    }

    /// Add a rotation (normally ±90), snapped to a quarter turn, and commit.
    pub fn rotate_by(&mut self, degrees: f32) {
        if !degrees.is_finite() {
            return;
        }
        self.adjustments.rotation = AdjustmentKey::Rotation.clamp(self.adjustments.rotation + degrees);
        self.commit();
    }

    /// Set the straighten angle and recompute the cover scale.
    ///
    /// Without an image only the angle is stored.
    pub fn set_straighten(&mut self, angle: f32) -> f32 {
        let angle = self.bounded(AdjustmentKey::Straighten, angle);
        self.adjustments.straighten = angle;
        if let Some((w, h)) = self.image.dimensions() {
            self.adjustments.straighten_scale = cover_scale(angle as f64, w, h) as f32;
        }
        angle
    }

    /// Apply an auto-enhance suggestion computed from `preview` and commit once.
    pub fn apply_auto_enhance(&mut self, preview: &DecodedImage) -> Result<AutoEnhance, EditorError> {
        let suggestion = auto_enhance(preview).ok_or(DecodeError::EmptyImage)?;
        for (key, value) in suggestion.values() {
            self.set_adjustment(key, value);
        }
        self.commit();
        Ok(suggestion)
    }

    /// Apply an auto white balance suggestion computed from `preview` and commit once.
    pub fn apply_auto_white_balance(&mut self, preview: &DecodedImage) -> Result<AutoWhiteBalance, EditorError> {
        let suggestion = auto_white_balance(preview).ok_or(DecodeError::EmptyImage)?;
        for (key, value) in suggestion.values() {
            self.set_adjustment(key, value);
        }
        self.commit();
        Ok(suggestion)
    }

    fn bounded(&self, key: AdjustmentKey, value: f32) -> f32 {
        if !self.config.clamp_input {
            return value;
        }
        let clamped = key.clamp(value);
        if clamped != value {
            log::warn!("{} = {} out of range, using {}", key, value, clamped);
        }
        clamped
    }

    // ===== History =====

    /// Snapshot adjustments and masks as a new history entry.
    pub fn commit(&mut self) {
        let entry = HistoryEntry::capture(&self.adjustments, self.masks.masks(), (self.clock)());
        self.history.commit(entry);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(entry) => {
                self.restore(entry);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(entry) => {
                self.restore(entry);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, entry: HistoryEntry) {
        self.adjustments = entry.adjustments;
        self.crop.aspect_ratio = self.adjustments.crop_aspect_ratio.clone();
        self.masks.restore(entry.masks);
    }

    // ===== Crop =====

    pub fn set_crop_active(&mut self, active: bool) {
        self.crop.is_active = active;
    }

    /// Change the aspect ratio tag on both the crop and the adjustments.
    ///
    /// Re-fits the rectangle only when the tag actually changes.
    pub fn set_crop_aspect_ratio(&mut self, tag: &str) -> bool {
        let changed = self.crop.set_aspect_ratio(tag, self.image.dimensions());
        if changed {
            self.adjustments.crop_aspect_ratio = self.crop.aspect_ratio.clone();
        }
        changed
    }

    /// Move the crop so its top-left is at (`x`, `y`) Original pixels.
    pub fn drag_crop(&mut self, x: f64, y: f64) -> bool {
        let Some((w, h)) = self.image.dimensions() else {
            return false;
        };
        self.crop.drag_to(x, y, w, h);
        true
    }

    /// Apply a handle resize given as the proposed rectangle in Original pixels.
    pub fn resize_crop(&mut self, proposed: Rect) -> bool {
        let Some((w, h)) = self.image.dimensions() else {
            return false;
        };
        self.crop.resize_to(proposed, w, h);
        true
    }

    /// Set the crop rectangle directly in percent, clamped.
    pub fn set_crop_percent(&mut self, rect: Rect) {
        self.crop.x = rect.x;
        self.crop.y = rect.y;
        self.crop.width = rect.width;
        self.crop.height = rect.height;
        self.crop.clamp();
    }

    pub fn reset_crop(&mut self) {
        let active = self.crop.is_active;
        self.crop = CropState {
            is_active: active,
            ..CropState::default()
        };
        self.adjustments.crop_aspect_ratio = self.crop.aspect_ratio.clone();
    }

    // ===== Rendering =====

    /// Hold to compare against the unedited image.
    pub fn set_show_original(&mut self, show: bool) {
        self.show_original = show;
    }

    /// Filter chain and overlays for the current frame.
    pub fn render(&self) -> RenderDescription {
        if self.show_original {
            RenderDescription::original(&self.adjustments)
        } else {
            derive_render(&self.adjustments)
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        ViewMode::from_crop(&self.crop)
    }

    /// Display layout for a container, `None` without an image.
    pub fn layout(&self, container_width: f64, container_height: f64) -> Option<DisplayLayout> {
        let (w, h) = self.image.dimensions()?;
        let fit = fit_scale(container_width, container_height, w, h, self.config.fit_padding);
        Some(DisplayLayout::compute(w, h, &self.crop, &self.adjustments, &self.view, fit))
    }

    pub fn zoom_at(&mut self, pointer_x: f64, pointer_y: f64, zoom_in: bool) {
        self.view.zoom_at(pointer_x, pointer_y, zoom_in, &self.config);
    }

    /// Pan the stage. Ignored while editing the crop.
    pub fn pan_to(&mut self, x: f64, y: f64) -> bool {
        if !self.view_mode().allows_pan() {
            return false;
        }
        self.view.pan_to(x, y);
        true
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    // ===== Tools =====

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn update_brush(&mut self, update: BrushUpdate) {
        self.brush.apply(update);
    }

    // ===== Masks =====

    /// Add a fresh mask of `kind` and commit.
    pub fn add_mask(&mut self, kind: MaskKind) -> MaskId {
        self.insert_mask(Mask::new(kind))
    }

    /// Add a prepared mask, select it, and commit.
    ///
    /// Adding a brush mask switches to the brush tool.
    pub fn insert_mask(&mut self, mask: Mask) -> MaskId {
        if mask.kind == MaskKind::Brush {
            self.tool = Tool::Brush;
        }
        let id = self.masks.add(mask);
        self.commit();
        id
    }

    /// Add the subject mask produced by segmentation.
    ///
    /// An empty bitmap is a failed segmentation: no mask is added.
    pub fn add_subject_mask(&mut self, bitmap: BitmapHandle) -> Result<MaskId, EditorError> {
        if bitmap.as_str().is_empty() {
            return Err(SegmentationError::InferenceFailed("empty subject bitmap".to_string()).into());
        }
        Ok(self.insert_mask(Mask::new(MaskKind::Subject).with_bitmap(bitmap)))
    }

    /// Segment the current image and add the result as a subject mask.
    ///
    /// On failure the registry and history are untouched.
    pub async fn select_subject<B: SegmentationBackend>(
        &mut self,
        service: &SegmentationService<B>,
    ) -> Result<MaskId, EditorError> {
        let source = self.image.source.clone().ok_or(EditorError::NoImage)?;
        match service.generate_mask(&source).await {
            Ok(bitmap) => self.add_subject_mask(bitmap),
            Err(err) => {
                log::error!("Select subject failed: {}", err);
                Err(err.into())
            }
        }
    }

    pub fn remove_mask(&mut self, id: &MaskId) -> Result<Mask, EditorError> {
        let removed = self
            .masks
            .remove(id)
            .ok_or_else(|| EditorError::MaskNotFound(id.clone()))?;
        self.commit();
        Ok(removed)
    }

    /// Change the selected mask. No history commit.
    pub fn set_active_mask(&mut self, id: Option<MaskId>) -> Result<(), EditorError> {
        match id {
            Some(id) if !self.masks.contains(&id) => Err(EditorError::MaskNotFound(id)),
            id => {
                self.masks.set_active(id);
                Ok(())
            }
        }
    }

    /// Set one of a mask's private adjustments. No history commit.
    pub fn update_mask_adjustment(&mut self, id: &MaskId, key: AdjustmentKey, value: f32) -> Result<f32, EditorError> {
        if !key.is_user_settable() {
            log::warn!("{} is derived and cannot be set directly", key);
            return self
                .masks
                .get(id)
                .map(|m| m.adjustments.get(key))
                .ok_or_else(|| EditorError::MaskNotFound(id.clone()));
        }
        let value = self.bounded(key, value);
        self.found(id, |masks| masks.update_adjustment(id, key, value))?;
        Ok(value)
    }

    pub fn rename_mask(&mut self, id: &MaskId, name: impl Into<String>) -> Result<(), EditorError> {
        let name = name.into();
        self.found(id, |masks| masks.rename(id, name))
    }

    pub fn set_mask_opacity(&mut self, id: &MaskId, opacity: f32) -> Result<(), EditorError> {
        self.found(id, |masks| masks.set_opacity(id, opacity))
    }

    pub fn set_mask_visible(&mut self, id: &MaskId, visible: bool) -> Result<(), EditorError> {
        self.found(id, |masks| masks.set_visible(id, visible))
    }

    pub fn set_mask_bitmap(&mut self, id: &MaskId, bitmap: Option<BitmapHandle>) -> Result<(), EditorError> {
        self.found(id, |masks| masks.set_bitmap(id, bitmap))
    }

    fn found(&mut self, id: &MaskId, f: impl FnOnce(&mut MaskRegistry) -> bool) -> Result<(), EditorError> {
        if f(&mut self.masks) {
            Ok(())
        } else {
            Err(EditorError::MaskNotFound(id.clone()))
        }
    }

    // ===== Export =====

    /// Export settings pre-filled for the current image.
    pub fn default_export_settings(&self) -> ExportSettings {
        ExportSettings::for_image(&self.image, self.config.default_export_quality)
    }

    /// Validate settings, raise the exporting flag and snapshot the plan.
    ///
    /// Every successful call must be paired with
    /// [`finish_export`](Self::finish_export).
    pub fn begin_export(&mut self, settings: &ExportSettings) -> Result<ExportPlan, EditorError> {
        if self.exporting {
            return Err(ExportError::Busy.into());
        }
        settings.validate()?;
        let plan =
            ExportPlan::capture(&self.image, &self.adjustments, &self.crop).ok_or(EditorError::NoImage)?;
        self.exporting = true;
        log::info!("Exporting {}", settings.file_name());
        Ok(plan)
    }

    pub fn finish_export(&mut self) {
        self.exporting = false;
    }

    /// Render and encode the current edit. The exporting flag is always reset.
    pub async fn export<R: ExportRenderer + ?Sized>(
        &mut self,
        renderer: &R,
        settings: &ExportSettings,
    ) -> Result<ExportedFile, EditorError> {
        let plan = self.begin_export(settings)?;
        let result = run_export(renderer, &plan, settings).await;
        self.finish_export();
        result.map_err(|err| {
            log::error!("Export failed: {}", err);
            err.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::testing::FlatRenderer;
    use crate::export::ExportFormat;
    use crate::filters::{FilterOp, VignetteColor};
    use crate::segmentation::testing::FakeBackend;
    use futures::executor::block_on;

    fn fixed_clock() -> u64 {
        1_700_000_000_000
    }

    fn session_with(width: u32, height: u32) -> EditSession {
        let mut session = EditSession::default().with_clock(fixed_clock);
        session
            .load_image(ImageHandle::new("blob:img"), width, height, "photo.jpg")
            .unwrap();
        session
    }

    fn fast_config() -> EditorConfig {
        EditorConfig {
            model_poll_attempts: 3,
            ..EditorConfig::default()
        }
    }

    // ===== Load =====

    #[test]
    fn test_load_commits_first_entry() {
        let session = session_with(400, 300);
        assert_eq!(session.history().len(), 1);
        assert!(!session.can_undo());
        assert_eq!(session.history().entries()[0].timestamp, fixed_clock());
        assert!(session.adjustments().is_default());
    }

    #[test]
    fn test_load_rejects_empty_image() {
        let mut session = EditSession::default();
        let err = session
            .load_image(ImageHandle::new("blob:x"), 0, 10, "x.png")
            .unwrap_err();
        assert!(matches!(err, EditorError::Decode(DecodeError::EmptyImage)));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_load_resets_previous_state() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Contrast, 40.0);
        session.add_mask(MaskKind::Brush);
        session.zoom_at(10.0, 10.0, true);

        session
            .load_image(ImageHandle::new("blob:next"), 100, 100, "next.png")
            .unwrap();
        assert!(session.adjustments().is_default());
        assert!(session.masks().is_empty());
        assert_eq!(*session.view(), ViewState::default());
        assert_eq!(session.history().len(), 1);
    }

    // ===== Adjustments =====

    #[test]
    fn test_contrast_scenario() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Contrast, 50.0);
        session.commit();

        let chain = session.render().filter_chain.effective();
        assert_eq!(chain.ops(), &[FilterOp::Contrast(1.5)]);
    }

    #[test]
    fn test_vignette_scenario() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Vignette, 40.0);
        let vignette = session.render().vignette.unwrap();
        assert!((vignette.intensity - 0.4).abs() < 1e-6);
        assert_eq!(vignette.color, VignetteColor::Black);
        assert!((vignette.inner_stop_percent - 48.0).abs() < 1e-4);
    }

    #[test]
    fn test_set_adjustment_clamps() {
        let mut session = session_with(400, 300);
        assert_eq!(session.set_adjustment(AdjustmentKey::Exposure, 250.0), 100.0);
        assert_eq!(session.adjustments().exposure, 100.0);
        assert_eq!(session.set_adjustment(AdjustmentKey::Sharpness, -5.0), 0.0);
    }

    #[test]
    fn test_set_adjustment_unclamped_when_disabled() {
        let config = EditorConfig {
            clamp_input: false,
            ..EditorConfig::default()
        };
        let mut session = EditSession::new(config);
        assert_eq!(session.set_adjustment(AdjustmentKey::Exposure, 250.0), 250.0);
    }

    #[test]
    fn test_set_adjustment_does_not_commit() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Saturation, 20.0);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_straighten_scale_not_directly_settable() {
        let mut session = session_with(400, 300);
        assert_eq!(session.set_adjustment(AdjustmentKey::StraightenScale, 3.0), 1.0);
        assert_eq!(session.adjustments().straighten_scale, 1.0);
    }

    #[test]
    fn test_reset_straighten_scale_keeps_cover() {
        let mut session = session_with(200, 100);
        session.set_straighten(30.0);
        let len = session.history().len();
        session.reset_adjustment(AdjustmentKey::StraightenScale);
        assert_eq!(session.adjustments().straighten, 30.0);
        assert!(session.adjustments().straighten_scale > 1.8);
        assert_eq!(session.history().len(), len);
    }

    #[test]
    fn test_reset_adjustment_commits() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Tint, 30.0);
        session.reset_adjustment(AdjustmentKey::Tint);
        assert_eq!(session.adjustments().tint, 0.0);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_reset_all_clears_masks() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Grain, 30.0);
        session.add_mask(MaskKind::Subject);
        session.reset_all();
        assert!(session.adjustments().is_default());
        assert!(session.masks().is_empty());
        assert!(session.can_undo());
    }

    // ===== Geometry =====

    #[test]
    fn test_straighten_scenario() {
        let mut session = session_with(200, 100);
        session.set_adjustment(AdjustmentKey::Straighten, 30.0);
        let scale = session.adjustments().straighten_scale;
        assert!((scale - 1.866).abs() < 1e-3, "scale {}", scale);
        assert_eq!(session.render().rotation_degrees, 30.0);
    }

    #[test]
    fn test_straighten_without_image_keeps_scale() {
        let mut session = EditSession::default();
        session.set_straighten(20.0);
        assert_eq!(session.adjustments().straighten, 20.0);
        assert_eq!(session.adjustments().straighten_scale, 1.0);
    }

    #[test]
    fn test_reset_straighten_resets_scale() {
        let mut session = session_with(200, 100);
        session.set_straighten(10.0);
        session.reset_adjustment(AdjustmentKey::Straighten);
        assert_eq!(session.adjustments().straighten_scale, 1.0);
    }

    #[test]
    fn test_rotate_wraps() {
        let mut session = session_with(200, 100);
        session.rotate_by(-90.0);
        assert_eq!(session.adjustments().rotation, 270.0);
        session.rotate_by(90.0);
        assert_eq!(session.adjustments().rotation, 0.0);
        assert_eq!(session.history().len(), 3);
    }

    #[test]
    fn test_rotation_snaps_to_quarter_turn() {
        let mut session = session_with(200, 100);
        assert_eq!(session.set_adjustment(AdjustmentKey::Rotation, 45.0), 90.0);
        session.rotate_by(100.0);
        assert_eq!(session.adjustments().rotation, 180.0);
    }

    #[test]
    fn test_square_crop_scenario() {
        let mut session = session_with(400, 300);
        assert!(session.set_crop_aspect_ratio("1:1"));
        let crop = session.crop();
        assert!((crop.x - 12.5).abs() < 1e-9);
        assert!(crop.y.abs() < 1e-9);
        assert!((crop.width - 75.0).abs() < 1e-9);
        assert!((crop.height - 100.0).abs() < 1e-9);
        assert_eq!(session.adjustments().crop_aspect_ratio, "1:1");
    }

    #[test]
    fn test_same_aspect_does_not_refit() {
        let mut session = session_with(400, 300);
        session.set_crop_aspect_ratio("1:1");
        session.drag_crop(0.0, 0.0);
        assert!(!session.set_crop_aspect_ratio("1:1"));
        assert_eq!(session.crop().x, 0.0);
    }

    #[test]
    fn test_drag_crop_clamped() {
        let mut session = session_with(400, 300);
        session.set_crop_percent(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert!(session.drag_crop(1000.0, -50.0));
        let crop = session.crop();
        assert!((crop.x - 50.0).abs() < 1e-9);
        assert_eq!(crop.y, 0.0);
    }

    #[test]
    fn test_crop_needs_image() {
        let mut session = EditSession::default();
        assert!(!session.drag_crop(1.0, 1.0));
        assert!(!session.resize_crop(Rect::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_undo_restores_aspect_tag_on_crop() {
        let mut session = session_with(400, 300);
        session.set_crop_aspect_ratio("16:9");
        session.commit();
        session.undo();
        assert_eq!(session.adjustments().crop_aspect_ratio, "free");
        assert_eq!(session.crop().aspect_ratio, "free");
    }

    #[test]
    fn test_layout_modes() {
        let mut session = session_with(400, 300);
        session.set_crop_percent(Rect::new(25.0, 25.0, 50.0, 50.0));

        let result = session.layout(1000.0, 1000.0).unwrap();
        assert_eq!(result.mode, ViewMode::Result);
        assert_eq!((result.stage_width, result.stage_height), (200.0, 150.0));
        assert!(result.pannable);

        session.set_crop_active(true);
        let editing = session.layout(1000.0, 1000.0).unwrap();
        assert_eq!(editing.mode, ViewMode::Editing);
        assert_eq!((editing.stage_width, editing.stage_height), (400.0, 300.0));
        assert_eq!(editing.dim_rects.len(), 4);
        assert!(!session.pan_to(5.0, 5.0));
    }

    #[test]
    fn test_layout_without_image() {
        assert!(EditSession::default().layout(800.0, 600.0).is_none());
    }

    #[test]
    fn test_compare_mode_keeps_geometry() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Contrast, 50.0);
        session.rotate_by(90.0);
        session.set_show_original(true);
        let render = session.render();
        assert!(render.is_identity());
        assert_eq!(render.rotation_degrees, 90.0);
    }

    // ===== History =====

    #[test]
    fn test_undo_redo_round_trip() {
        let mut session = session_with(400, 300);
        session.set_adjustment(AdjustmentKey::Exposure, 20.0);
        session.commit();
        let before = session.adjustments().clone();

        assert!(session.undo());
        assert_eq!(session.adjustments().exposure, 0.0);
        assert!(session.redo());
        assert_eq!(*session.adjustments(), before);
        assert!(!session.redo());
    }

    #[test]
    fn test_history_isolated_from_live_edits() {
        let mut session = session_with(400, 300);
        let id = session.add_mask(MaskKind::Subject);
        session.update_mask_adjustment(&id, AdjustmentKey::Exposure, 50.0).unwrap();
        // Not committed yet: the stored entry still has the default
        let stored = &session.history().current().unwrap().masks[0];
        assert_eq!(stored.adjustments.exposure, 0.0);
    }

    #[test]
    fn test_undo_mask_add() {
        let mut session = session_with(400, 300);
        session.add_mask(MaskKind::Ai);
        assert_eq!(session.masks().len(), 1);
        session.undo();
        assert!(session.masks().is_empty());
        assert!(session.masks().active_id().is_none());
    }

    // ===== Masks =====

    #[test]
    fn test_brush_mask_switches_tool() {
        let mut session = session_with(400, 300);
        session.add_mask(MaskKind::Subject);
        assert_eq!(session.tool(), Tool::Move);
        session.add_mask(MaskKind::Brush);
        assert_eq!(session.tool(), Tool::Brush);
    }

    #[test]
    fn test_remove_mask_commits_and_clears_selection() {
        let mut session = session_with(400, 300);
        let id = session.add_mask(MaskKind::Background);
        let len = session.history().len();
        session.remove_mask(&id).unwrap();
        assert!(session.masks().active_id().is_none());
        assert_eq!(session.history().len(), len + 1);
        assert!(matches!(
            session.remove_mask(&id),
            Err(EditorError::MaskNotFound(_))
        ));
    }

    #[test]
    fn test_set_active_mask_does_not_commit() {
        let mut session = session_with(400, 300);
        let id = session.add_mask(MaskKind::Subject);
        let len = session.history().len();
        session.set_active_mask(None).unwrap();
        session.set_active_mask(Some(id.clone())).unwrap();
        assert_eq!(session.masks().active_id(), Some(&id));
        assert_eq!(session.history().len(), len);
        assert!(session.set_active_mask(Some(MaskId::from("nope"))).is_err());
    }

    #[test]
    fn test_mask_property_updates() {
        let mut session = session_with(400, 300);
        let id = session.add_mask(MaskKind::Subject);
        session.rename_mask(&id, "Sky").unwrap();
        session.set_mask_opacity(&id, 150.0).unwrap();
        session.set_mask_visible(&id, false).unwrap();
        let value = session
            .update_mask_adjustment(&id, AdjustmentKey::Contrast, -300.0)
            .unwrap();
        assert_eq!(value, -100.0);

        let mask = session.masks().get(&id).unwrap();
        assert_eq!(mask.name, "Sky");
        assert_eq!(mask.opacity, 100.0);
        assert!(!mask.is_visible);
        assert_eq!(mask.adjustments.contrast, -100.0);
    }

    #[test]
    fn test_brush_update_partial() {
        let mut session = EditSession::default();
        session.update_brush(BrushUpdate {
            size: Some(80.0),
            ..BrushUpdate::default()
        });
        assert_eq!(session.brush().size, 80.0);
        assert_eq!(session.brush().hardness, 50.0);
        assert_eq!(session.brush().color, "red");
    }

    // ===== Subject selection =====

    #[test]
    fn test_select_subject_adds_mask() {
        let mut session = session_with(400, 300);
        let service = SegmentationService::new(FakeBackend::default(), &fast_config());
        let id = block_on(session.select_subject(&service)).unwrap();

        let mask = session.masks().get(&id).unwrap();
        assert_eq!(mask.kind, MaskKind::Subject);
        assert_eq!(mask.name, "Subject");
        assert_eq!(mask.opacity, 100.0);
        assert!(mask.is_visible);
        assert_eq!(mask.bitmap, Some(BitmapHandle::new("blob:mask")));
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_select_subject_model_unavailable() {
        let mut session = session_with(400, 300);
        let service = SegmentationService::new(FakeBackend::never_ready(), &fast_config());
        let err = block_on(session.select_subject(&service)).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(session.masks().is_empty());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_select_subject_empty_bitmap_is_error() {
        let mut session = session_with(400, 300);
        let backend = FakeBackend::default();
        *backend.infer_result.borrow_mut() = Ok(BitmapHandle::new(""));
        let service = SegmentationService::new(backend, &fast_config());
        let err = block_on(session.select_subject(&service)).unwrap_err();
        assert!(matches!(
            err,
            EditorError::Segmentation(SegmentationError::InferenceFailed(_))
        ));
        assert!(session.masks().is_empty());
    }

    #[test]
    fn test_add_subject_mask_rejects_empty_bitmap() {
        let mut session = session_with(400, 300);
        let err = session.add_subject_mask(BitmapHandle::new("")).unwrap_err();
        assert!(matches!(
            err,
            EditorError::Segmentation(SegmentationError::InferenceFailed(_))
        ));
        assert!(session.masks().is_empty());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_select_subject_needs_image() {
        let mut session = EditSession::default();
        let service = SegmentationService::new(FakeBackend::default(), &fast_config());
        assert!(matches!(
            block_on(session.select_subject(&service)),
            Err(EditorError::NoImage)
        ));
    }

    // ===== Auto tools =====

    #[test]
    fn test_auto_enhance_commits_once() {
        let mut session = session_with(400, 300);
        let preview = DecodedImage::new(4, 4, vec![0; 48]);
        let suggestion = session.apply_auto_enhance(&preview).unwrap();
        assert_eq!(session.adjustments().exposure, suggestion.exposure);
        assert_eq!(session.adjustments().saturation, 10.0);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_auto_white_balance_commits_once() {
        let mut session = session_with(400, 300);
        let preview = DecodedImage::new(2, 2, [200u8, 150, 100].repeat(4));
        session.apply_auto_white_balance(&preview).unwrap();
        assert_eq!(session.adjustments().temperature, -50.0);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_auto_enhance_empty_preview() {
        let mut session = session_with(400, 300);
        assert!(session
            .apply_auto_enhance(&DecodedImage::new(0, 0, vec![]))
            .is_err());
        assert_eq!(session.history().len(), 1);
    }

    // ===== Export =====

    #[test]
    fn test_default_export_settings() {
        let session = session_with(40, 20);
        let settings = session.default_export_settings();
        assert_eq!(settings.file_name(), "photo_edited.jpeg");
        assert_eq!(settings.format, ExportFormat::Jpeg { quality: 92 });
    }

    #[test]
    fn test_export_resets_flag() {
        let mut session = session_with(40, 20);
        let settings = session.default_export_settings();
        let file = block_on(session.export(&FlatRenderer { fail: false }, &settings)).unwrap();
        assert_eq!(file.mime_type, "image/jpeg");
        assert!(!session.is_exporting());

        let err = block_on(session.export(&FlatRenderer { fail: true }, &settings)).unwrap_err();
        assert!(matches!(err, EditorError::Export(ExportError::Render(_))));
        assert!(!session.is_exporting());
    }

    #[test]
    fn test_export_rejects_concurrent_begin() {
        let mut session = session_with(40, 20);
        let settings = session.default_export_settings();
        session.begin_export(&settings).unwrap();
        assert!(matches!(
            session.begin_export(&settings),
            Err(EditorError::Export(ExportError::Busy))
        ));
        session.finish_export();
        assert!(session.begin_export(&settings).is_ok());
    }

    #[test]
    fn test_export_plan_carries_crop_and_scale() {
        let mut session = session_with(400, 300);
        session.set_crop_aspect_ratio("1:1");
        session.set_straighten(30.0);
        let settings = session.default_export_settings();
        let plan = session.begin_export(&settings).unwrap();
        assert_eq!(plan.crop, Rect::new(50.0, 0.0, 300.0, 300.0));
        assert!((plan.straighten_scale - session.adjustments().straighten_scale as f64).abs() < 1e-6);
        assert!(plan.straighten_scale > 1.0);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["crop"]["width"], 300.0);
        assert!(json.get("straightenScale").is_some());
    }

    #[test]
    fn test_export_needs_image() {
        let mut session = EditSession::default();
        let settings = ExportSettings {
            format: ExportFormat::Png,
            file_stem: "x".to_string(),
        };
        assert!(matches!(
            session.begin_export(&settings),
            Err(EditorError::NoImage)
        ));
        assert!(!session.is_exporting());
    }
}
