//! Ordered mask collection with an active selection.
//!
//! The registry owns its masks outright; callers refer to them by
//! [`MaskId`]. No operation here commits history, the session decides that.

use serde::{Deserialize, Serialize};

use super::{BitmapHandle, Mask, MaskId};
use crate::AdjustmentKey;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskRegistry {
    masks: Vec<Mask>,
    active_mask_id: Option<MaskId>,
}

impl MaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn get(&self, id: &MaskId) -> Option<&Mask> {
        self.masks.iter().find(|m| &m.id == id)
    }

    pub fn contains(&self, id: &MaskId) -> bool {
        self.get(id).is_some()
    }

    pub fn active_id(&self) -> Option<&MaskId> {
        self.active_mask_id.as_ref()
    }

    pub fn active(&self) -> Option<&Mask> {
        self.active_mask_id.as_ref().and_then(|id| self.get(id))
    }

    /// Append a mask and make it the active selection.
    ///
    /// A mask whose id is already present gets a fresh id.
    pub fn add(&mut self, mut mask: Mask) -> MaskId {
        if self.contains(&mask.id) {
            log::warn!("Duplicate mask id {}, assigning a new one", mask.id);
            mask.id = MaskId::new();
        }
        let id = mask.id.clone();
        log::debug!("Adding {:?} mask {}", mask.kind, id);
        self.masks.push(mask);
        self.active_mask_id = Some(id.clone());
        id
    }

    /// Remove a mask, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: &MaskId) -> Option<Mask> {
        let index = self.masks.iter().position(|m| &m.id == id)?;
        let removed = self.masks.remove(index);
        if self.active_mask_id.as_ref() == Some(id) {
            self.active_mask_id = None;
        }
        log::debug!("Removed mask {}", id);
        Some(removed)
    }

    /// Change the selection. Unknown ids are rejected and leave it unchanged.
    pub fn set_active(&mut self, id: Option<MaskId>) -> bool {
        match id {
            Some(id) if !self.contains(&id) => false,
            id => {
                self.active_mask_id = id;
                true
            }
        }
    }

    /// Set one field of a mask's private adjustments.
    pub fn update_adjustment(&mut self, id: &MaskId, key: AdjustmentKey, value: f32) -> bool {
        self.modify(id, |mask| mask.adjustments.set(key, value))
    }

    pub fn rename(&mut self, id: &MaskId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.modify(id, |mask| mask.name = name)
    }

    /// Set opacity, clamped to 0-100.
    pub fn set_opacity(&mut self, id: &MaskId, opacity: f32) -> bool {
        let opacity = if opacity.is_nan() {
            100.0
        } else {
            opacity.clamp(0.0, 100.0)
        };
        self.modify(id, |mask| mask.opacity = opacity)
    }

    pub fn set_visible(&mut self, id: &MaskId, visible: bool) -> bool {
        self.modify(id, |mask| mask.is_visible = visible)
    }

    pub fn set_bitmap(&mut self, id: &MaskId, bitmap: Option<BitmapHandle>) -> bool {
        self.modify(id, |mask| mask.bitmap = bitmap)
    }

    /// Replace the whole collection, as when restoring a history entry.
    ///
    /// The selection survives only if its mask is still present.
    pub fn restore(&mut self, masks: Vec<Mask>) {
        self.masks = masks;
        if let Some(id) = self.active_mask_id.clone() {
            if !self.contains(&id) {
                self.active_mask_id = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.masks.clear();
        self.active_mask_id = None;
    }

    fn modify(&mut self, id: &MaskId, f: impl FnOnce(&mut Mask)) -> bool {
        match self.masks.iter_mut().find(|m| &m.id == id) {
            Some(mask) => {
                f(mask);
                true
            }
            None => false,
        }
    }
}
