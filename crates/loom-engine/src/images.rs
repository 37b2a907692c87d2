//! Slot-addressed image state.
//!
//! A slot is a `(layer, layer_order)` pair. At most one non-exiting image
//! occupies a slot; any number of exiting images may linger in it until
//! their exit animation timer removes them.

use loom_story::{ExitEffect, ImageAlignment, ImageData, ImageEffect};
use serde::{Deserialize, Serialize};

/// An image currently on stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveImage {
    /// Id of the image node that showed it.
    pub id: String,
    /// Changes every time an image is (re)shown, so renderers replay its
    /// entrance effect even when nothing else differs.
    pub instance_id: u64,
    /// Resource path or inline data URL.
    pub resource_path: String,
    /// Layer name.
    pub layer: String,
    /// Order within the layer.
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
    /// Object fit passed through to the renderer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_fit: Option<String>,
    /// Legacy single entrance effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<ImageEffect>,
    /// Entrance effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<ImageEffect>,
    /// Entrance effect duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_duration: Option<u64>,
    /// Set while the exit animation plays.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_exiting: bool,
    /// Exit animation being played.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_effect: Option<ExitEffect>,
    /// Exit animation length in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_effect_duration: Option<u64>,
}

impl ActiveImage {
    /// Build the on-stage record for an image node's payload.
    pub fn new(node_id: impl Into<String>, instance_id: u64, data: &ImageData) -> Self {
        Self {
            id: node_id.into(),
            instance_id,
            resource_path: data.resource_path.clone(),
            layer: data.layer.clone(),
            layer_order: data.layer_order,
            alignment: data.alignment,
            x: data.x,
            y: data.y,
            flip_horizontal: data.flip_horizontal,
            object_fit: data.object_fit.clone(),
            effect: data.effect,
            effects: data.effects.clone(),
            effect_duration: data.effect_duration,
            is_exiting: false,
            exit_effect: None,
            exit_effect_duration: None,
        }
    }

    /// Whether this image sits in the given slot.
    pub fn in_slot(&self, layer: &str, layer_order: i32) -> bool {
        self.layer == layer && self.layer_order == layer_order
    }
}

/// Every image on stage, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageLayers {
    images: Vec<ActiveImage>,
}

impl ImageLayers {
    /// Create an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// All images, oldest first.
    pub fn images(&self) -> &[ActiveImage] {
        &self.images
    }

    /// Number of images, exiting ones included.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether nothing is on stage.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The non-exiting image in a slot.
    pub fn resident(&self, layer: &str, layer_order: i32) -> Option<&ActiveImage> {
        self.images
            .iter()
            .find(|img| img.in_slot(layer, layer_order) && !img.is_exiting)
    }

    /// Images in a slot, exiting ones included.
    pub fn in_slot(&self, layer: &str, layer_order: i32) -> impl Iterator<Item = &ActiveImage> {
        self.images
            .iter()
            .filter(move |img| img.in_slot(layer, layer_order))
    }

    /// Remove everything in a slot, exiting images included.
    pub fn clear_slot(&mut self, layer: &str, layer_order: i32) {
        self.images.retain(|img| !img.in_slot(layer, layer_order));
    }

    /// Start an image's exit animation.
    pub fn begin_exit(&mut self, instance_id: u64, effect: ExitEffect, duration: Option<u64>) {
        if let Some(img) = self.images.iter_mut().find(|i| i.instance_id == instance_id) {
            img.is_exiting = true;
            img.exit_effect = Some(effect);
            img.exit_effect_duration = duration;
        }
    }

    /// Remove one image instance. Returns whether it was present.
    pub fn remove_instance(&mut self, instance_id: u64) -> bool {
        let before = self.images.len();
        self.images.retain(|img| img.instance_id != instance_id);
        self.images.len() != before
    }

    /// Add an image, evicting the slot's non-exiting occupant.
    pub fn place(&mut self, image: ActiveImage) {
        let (layer, order) = (image.layer.clone(), image.layer_order);
        self.images
            .retain(|img| img.is_exiting || !img.in_slot(&layer, order));
        self.images.push(image);
    }

    /// Drop images whose exit animation was cut short.
    pub fn drop_exiting(&mut self) {
        self.images.retain(|img| !img.is_exiting);
    }

    /// Remove every image.
    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Highest instance id on stage.
    pub fn max_instance_id(&self) -> Option<u64> {
        self.images.iter().map(|img| img.instance_id).max()
    }
}
