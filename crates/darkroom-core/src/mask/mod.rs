//! Local adjustment masks.
//!
//! A mask pairs an externally produced bitmap (subject segmentation, brush
//! strokes) with its own independent [`Adjustments`]. The engine never
//! generates or reads bitmap pixels; it only stores the handle it is given.
//!
//! ## Mask Kinds
//!
//! - **Subject**: foreground found by the segmentation collaborator
//! - **Background**: inverse of a subject selection
//! - **Brush**: painted by hand
//! - **Ai**: any other model-produced selection

mod registry;

pub use registry::MaskRegistry;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Adjustments;

/// Unique mask identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskId(String);

impl MaskId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for MaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for MaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a mask's bitmap came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskKind {
    Subject,
    Background,
    Brush,
    Ai,
}

impl MaskKind {
    pub fn default_name(self) -> &'static str {
        match self {
            MaskKind::Subject => "Subject",
            MaskKind::Background => "Background",
            MaskKind::Brush => "Brush",
            MaskKind::Ai => "AI Mask",
        }
    }
}

/// Opaque reference to a mask bitmap held by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitmapHandle(pub String);

impl BitmapHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A local adjustment layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mask {
    pub id: MaskId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MaskKind,
    pub bitmap: Option<BitmapHandle>,
    /// Opacity (0 to 100)
    pub opacity: f32,
    pub is_visible: bool,
    pub adjustments: Adjustments,
}

impl Mask {
    /// New visible mask at full opacity with default adjustments.
    pub fn new(kind: MaskKind) -> Self {
        Self {
            id: MaskId::new(),
            name: kind.default_name().to_string(),
            kind,
            bitmap: None,
            opacity: 100.0,
            is_visible: true,
            adjustments: Adjustments::default(),
        }
    }

    pub fn with_bitmap(mut self, bitmap: BitmapHandle) -> Self {
        self.bitmap = Some(bitmap);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether drawing this mask can change the image.
    pub fn has_effect(&self) -> bool {
        self.is_visible
            && self.opacity > 0.0
            && self.bitmap.is_some()
            && !self.adjustments.is_default()
    }
}
