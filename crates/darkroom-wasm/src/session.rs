//! Edit session bindings.
//!
//! `EditSession` wraps the core session one-to-one. Structured values cross
//! the boundary as plain objects in the core's camelCase serde form.
//!
//! Async work never borrows the session: subject selection is
//! `await service.generateMask(src)` followed by `session.addSubjectMask(bitmap)`,
//! and export is `beginExport` / host render / `finishExport`.

use darkroom_core::adjustments::AdjustmentKey;
use darkroom_core::export::{encode_rendered, ExportSettings, ExportedFile};
use darkroom_core::mask::{BitmapHandle, MaskId, MaskKind};
use darkroom_core::session::{BrushUpdate, Tool};
use darkroom_core::{EditSession, EditorConfig, ImageHandle, Rect};
use wasm_bindgen::prelude::*;

use crate::types::{from_js, js_error, to_js, JsDecodedImage};

pub(crate) fn config_from_js(config: JsValue) -> Result<EditorConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        Ok(EditorConfig::default())
    } else {
        from_js(config)
    }
}

fn parse_key(key: &str) -> Result<AdjustmentKey, JsValue> {
    key.parse().map_err(js_error)
}

/// An encoded export ready for download.
#[wasm_bindgen]
pub struct JsExportedFile {
    inner: ExportedFile,
}

#[wasm_bindgen]
impl JsExportedFile {
    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.inner.file_name.clone()
    }

    #[wasm_bindgen(getter, js_name = mimeType)]
    pub fn mime_type(&self) -> String {
        self.inner.mime_type.to_string()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.inner.bytes.clone()
    }
}

#[wasm_bindgen(js_name = EditSession)]
pub struct JsEditSession {
    inner: EditSession,
}

impl JsEditSession {
    fn with_config(config: EditorConfig) -> Self {
        Self {
            inner: EditSession::new(config).with_clock(now_ms),
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> u64 {
    darkroom_core::history::system_time_ms()
}

#[wasm_bindgen(js_class = EditSession)]
impl JsEditSession {
    /// Create a session. `config` is an optional partial `EditorConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsEditSession, JsValue> {
        Ok(Self::with_config(config_from_js(config)?))
    }

    // ===== Image =====

    #[wasm_bindgen(js_name = loadImage)]
    pub fn load_image(&mut self, src: String, width: u32, height: u32, file_name: String) -> Result<(), JsValue> {
        self.inner
            .load_image(ImageHandle::new(src), width, height, file_name)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = clearImage)]
    pub fn clear_image(&mut self) {
        self.inner.clear_image();
    }

    pub fn image(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.image())
    }

    // ===== Adjustments =====

    pub fn adjustments(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.adjustments())
    }

    /// Set one field without committing. Returns the stored value.
    #[wasm_bindgen(js_name = setAdjustment)]
    pub fn set_adjustment(&mut self, key: &str, value: f32) -> Result<f32, JsValue> {
        Ok(self.inner.set_adjustment(parse_key(key)?, value))
    }

    #[wasm_bindgen(js_name = resetAdjustment)]
    pub fn reset_adjustment(&mut self, key: &str) -> Result<(), JsValue> {
        self.inner.reset_adjustment(parse_key(key)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = resetAll)]
    pub fn reset_all(&mut self) {
        self.inner.reset_all();
    }

    #[wasm_bindgen(js_name = rotateBy)]
    pub fn rotate_by(&mut self, degrees: f32) {
        self.inner.rotate_by(degrees);
    }

    #[wasm_bindgen(js_name = setStraighten)]
    pub fn set_straighten(&mut self, angle: f32) -> f32 {
        self.inner.set_straighten(angle)
    }

    #[wasm_bindgen(js_name = autoEnhance)]
    pub fn auto_enhance(&mut self, preview: &JsDecodedImage) -> Result<JsValue, JsValue> {
        let suggestion = self
            .inner
            .apply_auto_enhance(&preview.to_decoded())
            .map_err(js_error)?;
        to_js(&suggestion)
    }

    #[wasm_bindgen(js_name = autoWhiteBalance)]
    pub fn auto_white_balance(&mut self, preview: &JsDecodedImage) -> Result<JsValue, JsValue> {
        let suggestion = self
            .inner
            .apply_auto_white_balance(&preview.to_decoded())
            .map_err(js_error)?;
        to_js(&suggestion)
    }

    // ===== History =====

    /// Snapshot the current state, typically on pointer release.
    pub fn commit(&mut self) {
        self.inner.commit();
    }

    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.inner.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    // ===== Crop =====

    pub fn crop(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.crop())
    }

    #[wasm_bindgen(js_name = setCropActive)]
    pub fn set_crop_active(&mut self, active: bool) {
        self.inner.set_crop_active(active);
    }

    #[wasm_bindgen(js_name = setCropAspectRatio)]
    pub fn set_crop_aspect_ratio(&mut self, tag: &str) -> bool {
        self.inner.set_crop_aspect_ratio(tag)
    }

    /// Move the crop's top-left corner to (`x`, `y`) in image pixels.
    #[wasm_bindgen(js_name = dragCrop)]
    pub fn drag_crop(&mut self, x: f64, y: f64) -> bool {
        self.inner.drag_crop(x, y)
    }

    /// Resize to a proposed rectangle in image pixels.
    #[wasm_bindgen(js_name = resizeCrop)]
    pub fn resize_crop(&mut self, x: f64, y: f64, width: f64, height: f64) -> bool {
        self.inner.resize_crop(Rect::new(x, y, width, height))
    }

    #[wasm_bindgen(js_name = setCropPercent)]
    pub fn set_crop_percent(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.inner.set_crop_percent(Rect::new(x, y, width, height));
    }

    #[wasm_bindgen(js_name = resetCrop)]
    pub fn reset_crop(&mut self) {
        self.inner.reset_crop();
    }

    // ===== Rendering =====

    /// Filter chain, overlays and rotation for the current frame.
    pub fn render(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.render())
    }

    /// The filter chain as a CSS `filter` value.
    #[wasm_bindgen(js_name = filterString)]
    pub fn filter_string(&self) -> String {
        self.inner.render().filter_chain.effective().to_string()
    }

    /// Layout for a container, `undefined` without an image.
    pub fn layout(&self, container_width: f64, container_height: f64) -> Result<JsValue, JsValue> {
        to_js(&self.inner.layout(container_width, container_height))
    }

    #[wasm_bindgen(js_name = setShowOriginal)]
    pub fn set_show_original(&mut self, show: bool) {
        self.inner.set_show_original(show);
    }

    pub fn view(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.view())
    }

    #[wasm_bindgen(js_name = zoomAt)]
    pub fn zoom_at(&mut self, pointer_x: f64, pointer_y: f64, zoom_in: bool) {
        self.inner.zoom_at(pointer_x, pointer_y, zoom_in);
    }

    #[wasm_bindgen(js_name = panTo)]
    pub fn pan_to(&mut self, x: f64, y: f64) -> bool {
        self.inner.pan_to(x, y)
    }

    #[wasm_bindgen(js_name = resetView)]
    pub fn reset_view(&mut self) {
        self.inner.reset_view();
    }

    // ===== Tools =====

    pub fn tool(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.tool())
    }

    /// `"move"`, `"brush"` or `"eraser"`.
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&mut self, tool: JsValue) -> Result<(), JsValue> {
        let tool: Tool = from_js(tool)?;
        self.inner.set_tool(tool);
        Ok(())
    }

    pub fn brush(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.brush())
    }

    /// Partial update: `{ size?, hardness?, opacity?, color? }`.
    #[wasm_bindgen(js_name = updateBrush)]
    pub fn update_brush(&mut self, update: JsValue) -> Result<(), JsValue> {
        let update: BrushUpdate = from_js(update)?;
        self.inner.update_brush(update);
        Ok(())
    }

    // ===== Masks =====

    pub fn masks(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.masks())
    }

    /// Add a mask of `kind` ("subject", "background", "brush", "ai"). Returns its id.
    #[wasm_bindgen(js_name = addMask)]
    pub fn add_mask(&mut self, kind: JsValue) -> Result<String, JsValue> {
        let kind: MaskKind = from_js(kind)?;
        Ok(self.inner.add_mask(kind).to_string())
    }

    /// Add the bitmap from `SegmentationService.generateMask` as a subject mask.
    #[wasm_bindgen(js_name = addSubjectMask)]
    /// Rejects an empty bitmap.
    pub fn add_subject_mask(&mut self, bitmap: String) -> Result<String, JsValue> {
        self.inner
            .add_subject_mask(BitmapHandle::new(bitmap))
            .map(|id| id.to_string())
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = removeMask)]
    pub fn remove_mask(&mut self, id: &str) -> Result<(), JsValue> {
        self.inner
            .remove_mask(&MaskId::from(id))
            .map(|_| ())
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = setActiveMask)]
    pub fn set_active_mask(&mut self, id: Option<String>) -> Result<(), JsValue> {
        self.inner
            .set_active_mask(id.map(MaskId::from))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = updateMaskAdjustment)]
    pub fn update_mask_adjustment(&mut self, id: &str, key: &str, value: f32) -> Result<f32, JsValue> {
        let key = parse_key(key)?;
        self.inner
            .update_mask_adjustment(&MaskId::from(id), key, value)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = renameMask)]
    pub fn rename_mask(&mut self, id: &str, name: String) -> Result<(), JsValue> {
        self.inner.rename_mask(&MaskId::from(id), name).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setMaskOpacity)]
    pub fn set_mask_opacity(&mut self, id: &str, opacity: f32) -> Result<(), JsValue> {
        self.inner
            .set_mask_opacity(&MaskId::from(id), opacity)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = setMaskVisible)]
    pub fn set_mask_visible(&mut self, id: &str, visible: bool) -> Result<(), JsValue> {
        self.inner
            .set_mask_visible(&MaskId::from(id), visible)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = setMaskBitmap)]
    pub fn set_mask_bitmap(&mut self, id: &str, bitmap: Option<String>) -> Result<(), JsValue> {
        self.inner
            .set_mask_bitmap(&MaskId::from(id), bitmap.map(BitmapHandle::new))
            .map_err(js_error)
    }

    // ===== Export =====

    #[wasm_bindgen(js_name = defaultExportSettings)]
    pub fn default_export_settings(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.default_export_settings())
    }

    #[wasm_bindgen(getter, js_name = isExporting)]
    pub fn is_exporting(&self) -> bool {
        self.inner.is_exporting()
    }

    /// Validate settings and snapshot the export plan for the host renderer.
    #[wasm_bindgen(js_name = beginExport)]
    pub fn begin_export(&mut self, settings: JsValue) -> Result<JsValue, JsValue> {
        let settings: ExportSettings = from_js(settings)?;
        let plan = self.inner.begin_export(&settings).map_err(js_error)?;
        to_js(&plan)
    }

    /// Encode the host's rendered pixels. Always ends the export.
    #[wasm_bindgen(js_name = finishExport)]
    pub fn finish_export(&mut self, rendered: &JsDecodedImage, settings: JsValue) -> Result<JsExportedFile, JsValue> {
        let result = from_js::<ExportSettings>(settings)
            .and_then(|settings| encode_rendered(&rendered.to_decoded(), &settings).map_err(js_error));
        self.inner.finish_export();
        result.map(|inner| JsExportedFile { inner })
    }

    /// Abandon an export started with `beginExport`.
    #[wasm_bindgen(js_name = cancelExport)]
    pub fn cancel_export(&mut self) {
        self.inner.finish_export();
    }
}
