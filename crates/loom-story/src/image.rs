use serde::{Deserialize, Serialize};

/// Horizontal placement of an image on the stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAlignment {
    /// Anchored to the left edge.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Anchored to the right edge.
    Right,
    /// Positioned by explicit `x`/`y`.
    Custom,
}

/// An entrance effect played when an image appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageEffect {
    /// Explicitly no effect (legacy single-effect field only).
    None,
    /// Fade from transparent.
    FadeIn,
    /// Horizontal shake.
    Shake,
    /// Slide in towards the left.
    SlideLeft,
    /// Slide in towards the right.
    SlideRight,
    /// Slide in upwards.
    SlideUp,
    /// Slide in downwards.
    SlideDown,
    /// Grow from small.
    ZoomIn,
    /// Shrink from large.
    ZoomOut,
    /// Bounce into place.
    Bounce,
    /// Brief white flash.
    Flash,
    /// Pulse in size.
    Pulse,
}

/// The effect played by an image being replaced in its slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitEffect {
    /// Remove immediately.
    #[default]
    None,
    /// Fade to transparent.
    FadeOut,
    /// Slide out to the left.
    SlideOutLeft,
    /// Slide out to the right.
    SlideOutRight,
    /// Slide out upwards.
    SlideOutUp,
    /// Slide out downwards.
    SlideOutDown,
    /// Zoom out of view.
    ZoomOut,
    /// Shrink to nothing.
    Shrink,
}

/// How a replacement image is sequenced against the outgoing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionTiming {
    /// The old image exits, then the new one enters.
    #[default]
    Sequential,
    /// The new image enters while the old one is still exiting.
    Crossfade,
}

/// Payload of an `image` node.
///
/// The slot an image occupies is `(layer, layer_order)`. An empty
/// `resource_path` clears the slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    /// Resource path or inline data URL. Empty means "clear this slot".
    #[serde(default)]
    pub resource_path: String,
    /// Layer name, e.g. `background` or `character`.
    #[serde(default)]
    pub layer: String,
    /// Order within the layer.
    #[serde(default)]
    pub layer_order: i32,
    /// Horizontal placement.
    #[serde(default)]
    pub alignment: ImageAlignment,
    /// X coordinate for custom alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// Y coordinate for custom alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Mirror horizontally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip_horizontal: Option<bool>,
    /// CSS-style object fit, passed through to the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_fit: Option<String>,
    /// Legacy single entrance effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<ImageEffect>,
    /// Entrance effects, played together.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<ImageEffect>,
    /// Entrance effect duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_duration: Option<u64>,
    /// Effect played by the image this one replaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_effect: Option<ExitEffect>,
    /// Exit effect duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_effect_duration: Option<u64>,
    /// Sequencing of exit and entrance.
    #[serde(default)]
    pub transition_timing: TransitionTiming,
}

impl ImageData {
    /// An image showing `resource_path` in the given slot.
    pub fn new(resource_path: impl Into<String>, layer: impl Into<String>, layer_order: i32) -> Self {
        Self {
            resource_path: resource_path.into(),
            layer: layer.into(),
            layer_order,
            ..Self::default()
        }
    }

    /// Whether this node clears its slot instead of showing an image.
    pub fn is_removal(&self) -> bool {
        self.resource_path.is_empty()
    }

    /// Whether an entrance effect is configured, either through `effects`
    /// or through the legacy `effect` field.
    pub fn has_entrance_effect(&self) -> bool {
        !self.effects.is_empty() || self.effect.is_some_and(|e| e != ImageEffect::None)
    }

    /// The configured exit effect, if it is anything other than `none`.
    pub fn active_exit_effect(&self) -> Option<ExitEffect> {
        self.exit_effect.filter(|e| *e != ExitEffect::None)
    }
}
