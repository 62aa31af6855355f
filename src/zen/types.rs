//! Parsed ZenGin model data as handed over by the asset library.
//!
//! Nothing in here is interpreted yet: quaternions are still in the source
//! convention and root-bone samples still carry their translation.

use bevy::math::{Quat, Vec3};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
    pub struct AnimationFlags: u8 {
        const NONE   = 0;
        const MOVE   = 1 << 0; // "M" - root motion drives the character
        const ROTATE = 1 << 1; // "R" - root rotation drives the character
        const QUEUE  = 1 << 2; // "E" - wait for the same-layer predecessor's last frame
        const FLY    = 1 << 3; // "F" - no ground contact
        const IDLE   = 1 << 4; // "I" - idle animation
    }
}

impl AnimationFlags {
    /// Parses the MDS flag string (e.g. `"M."`, `"MR"`, `"E"`).
    pub fn from_script_str(flags: &str) -> Self {
        flags.chars().fold(AnimationFlags::NONE, |acc, c| {
            acc | match c.to_ascii_uppercase() {
                'M' => AnimationFlags::MOVE,
                'R' => AnimationFlags::ROTATE,
                'E' => AnimationFlags::QUEUE,
                'F' => AnimationFlags::FLY,
                'I' => AnimationFlags::IDLE,
                _ => AnimationFlags::NONE,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationSample {
    pub position: Vec3,
    pub rotation: Quat,
}

impl AnimationSample {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

/// Sampled key data of one animation (.MAN).
#[derive(Debug, Clone, Default)]
pub struct ModelAnimation {
    pub name: String,
    pub fps: f32,
    pub frame_count: u32,
    /// Hierarchy node index per animated bone.
    pub node_indices: Vec<u32>,
    /// `samples[frame * node_indices.len() + bone]`
    pub samples: Vec<AnimationSample>,
}

#[derive(Debug, Clone, Default)]
pub struct HierarchyNode {
    pub name: String,
    pub parent: Option<usize>,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Bone hierarchy (.MDH).
#[derive(Debug, Clone, Default)]
pub struct ModelHierarchy {
    pub name: String,
    pub nodes: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventTag {
    CreateItem(String),
    InsertItem,
    RemoveItem,
    DestroyItem,
    ExchangeItem(String),
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelEventKind {
    Tag { tag: EventTag, slots: Vec<String> },
    SoundEffect {
        name: String,
        range: f32,
        empty_slot: bool,
    },
    ParticleEffect { name: String, bone: String },
    MorphAnimation { animation: String, node: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvent {
    /// Frame relative to the animation's first frame.
    pub frame: u32,
    pub kind: ModelEventKind,
}

/// One `ani` block of a model script.
#[derive(Debug, Clone, Default)]
pub struct ScriptAnimation {
    pub name: String,
    pub layer: i32,
    pub next: String,
    pub blend_in: f32,
    pub blend_out: f32,
    pub flags: AnimationFlags,
    /// Source model file of the key data (informational).
    pub model: String,
    pub events: Vec<ModelEvent>,
}

/// One `aniAlias` block: reuses the key data of `alias` with its own metadata.
#[derive(Debug, Clone, Default)]
pub struct AnimationAlias {
    pub name: String,
    pub layer: i32,
    pub next: String,
    pub blend_in: f32,
    pub blend_out: f32,
    pub flags: AnimationFlags,
    pub alias: String,
}

/// Model script (.MDS).
#[derive(Debug, Clone, Default)]
pub struct ModelScript {
    pub name: String,
    /// Name of the hierarchy the key data is bound to.
    pub hierarchy: String,
    pub animations: Vec<ScriptAnimation>,
    pub aliases: Vec<AnimationAlias>,
}

impl ModelScript {
    pub fn animation(&self, name: &str) -> Option<&ScriptAnimation> {
        self.animations
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn alias(&self, name: &str) -> Option<&AnimationAlias> {
        self.aliases.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_script_flag_strings() {
        assert_eq!(AnimationFlags::from_script_str("M."), AnimationFlags::MOVE);
        assert_eq!(
            AnimationFlags::from_script_str("mr"),
            AnimationFlags::MOVE | AnimationFlags::ROTATE
        );
        assert!(AnimationFlags::from_script_str("E").contains(AnimationFlags::QUEUE));
        assert!(AnimationFlags::from_script_str("").is_empty());
    }
}
