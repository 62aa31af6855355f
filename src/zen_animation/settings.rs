use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

/// Tunables of the blending engine.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Root XZ displacement (first vs. last sample) above which a layer 1 track moves the character.
    pub movement_threshold: f32,
    pub root_bone_name: String,
    pub head_bone_name: String,
    pub hip_bone_name: String,
    /// Animation name prefixes whose hip rotation has to be mirrored around Y.
    pub sit_mirror_animations: Vec<String>,
    /// Used when a sound effect tag carries no range.
    pub default_sound_range: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            movement_threshold: 0.3,
            root_bone_name: "BIP01".to_string(),
            head_bone_name: "BIP01 HEAD".to_string(),
            hip_bone_name: "BIP01".to_string(),
            sit_mirror_animations: vec![
                "S_BENCH_S1".to_string(),
                "S_CHAIR_S1".to_string(),
                "S_THRONE_S1".to_string(),
            ],
            default_sound_range: 25.0,
        }
    }
}

impl AnimationSettings {
    pub fn needs_sit_mirror(&self, animation: &str) -> bool {
        self.sit_mirror_animations.iter().any(|prefix| {
            animation
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }
}
