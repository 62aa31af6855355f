// src/zen_animation/manager.rs

use std::collections::HashMap;
use std::sync::Arc;

use bevy::log::{debug, error, warn};
use bevy::math::Vec3;
use bevy::prelude::Resource;

use super::settings::AnimationSettings;
use super::track::{AnimationTrack, KeyFrame};
use crate::zen::error::{AnimationError, Result};
use crate::zen::helper_funcs::{flatten, to_engine_quat, track_cache_key};
use crate::zen::resources::ResourceProvider;
use crate::zen::types::{
    AnimationAlias, AnimationFlags, ModelAnimation, ModelEvent, ModelHierarchy, ScriptAnimation,
};

/// Script-side metadata of a track, taken either from an `ani` or an `aniAlias`.
struct TrackMeta<'a> {
    data_name: &'a str,
    alias_name: Option<&'a str>,
    layer: i32,
    next: &'a str,
    blend_in: f32,
    blend_out: f32,
    flags: AnimationFlags,
    events: &'a [ModelEvent],
}

impl<'a> TrackMeta<'a> {
    fn from_animation(ani: &'a ScriptAnimation) -> Self {
        Self {
            data_name: &ani.name,
            alias_name: None,
            layer: ani.layer,
            next: &ani.next,
            blend_in: ani.blend_in,
            blend_out: ani.blend_out,
            flags: ani.flags,
            events: &ani.events,
        }
    }

    fn from_alias(alias: &'a AnimationAlias, target: &'a ScriptAnimation) -> Self {
        Self {
            data_name: &target.name,
            alias_name: Some(&alias.name),
            layer: alias.layer,
            next: &alias.next,
            blend_in: alias.blend_in,
            blend_out: alias.blend_out,
            flags: alias.flags,
            events: &target.events,
        }
    }
}

/// Resolves `(model script, animation)` pairs into shared tracks and caches them,
/// including failed lookups, for the lifetime of the session.
#[derive(Resource)]
pub struct AnimationManager {
    resources: Arc<dyn ResourceProvider>,
    settings: AnimationSettings,
    tracks: HashMap<String, Option<Arc<AnimationTrack>>>,
}

impl AnimationManager {
    pub fn new(resources: Arc<dyn ResourceProvider>, settings: AnimationSettings) -> Self {
        Self {
            resources,
            settings,
            tracks: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn resources(&self) -> &dyn ResourceProvider {
        self.resources.as_ref()
    }

    /// Number of cache entries, negative ones included.
    pub fn cached_track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Drops every cached track. Instances keep their `Arc`s alive.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Overlay first, then base. `None` means the animation is unavailable.
    pub fn get_track(
        &mut self,
        anim_name: &str,
        mds_base: &str,
        mds_overlay: Option<&str>,
    ) -> Option<Arc<AnimationTrack>> {
        if let Some(overlay) = mds_overlay.filter(|o| !o.is_empty()) {
            if let Some(track) = self.resolve(overlay, anim_name) {
                return Some(track);
            }
        }
        self.resolve(mds_base, anim_name)
    }

    fn resolve(&mut self, mds_name: &str, anim_name: &str) -> Option<Arc<AnimationTrack>> {
        let key = track_cache_key(mds_name, anim_name);
        if let Some(cached) = self.tracks.get(&key) {
            return cached.clone();
        }

        let built = match self.build_track(mds_name, anim_name) {
            Ok(Some(track)) => Some(Arc::new(track)),
            Ok(None) => {
                debug!("Animation '{}' not found in '{}'", anim_name, mds_name);
                None
            }
            Err(e) => {
                error!("Failed to build animation track '{}': {}", key, e);
                None
            }
        };
        self.tracks.insert(key, built.clone());
        built
    }

    fn build_track(&self, mds_name: &str, anim_name: &str) -> Result<Option<AnimationTrack>> {
        let Some(script) = self.resources.try_get_model_script(mds_name) else {
            debug!("Model script '{}' is not loaded", mds_name);
            return Ok(None);
        };

        let meta = if let Some(ani) = script.animation(anim_name) {
            TrackMeta::from_animation(ani)
        } else if let Some(alias) = script.alias(anim_name) {
            let Some(target) = script.animation(&alias.alias) else {
                warn!(
                    "Alias '{}' in '{}' points to missing animation '{}'",
                    alias.name, mds_name, alias.alias
                );
                return Ok(None);
            };
            TrackMeta::from_alias(alias, target)
        } else {
            return Ok(None);
        };

        let data = self
            .resources
            .try_get_model_animation(mds_name, meta.data_name)
            .ok_or_else(|| AnimationError::MissingAnimation {
                script: mds_name.to_string(),
                animation: meta.data_name.to_string(),
            })?;
        let hierarchy = self
            .resources
            .try_get_model_hierarchy(&script.hierarchy)
            .ok_or_else(|| AnimationError::MissingHierarchy(script.hierarchy.clone()))?;

        build_track_from_data(&self.settings, &script.name, &meta, data, hierarchy).map(Some)
    }
}

fn build_track_from_data(
    settings: &AnimationSettings,
    script_name: &str,
    meta: &TrackMeta<'_>,
    data: &ModelAnimation,
    hierarchy: &ModelHierarchy,
) -> Result<AnimationTrack> {
    if !(data.fps > 0.0) {
        return Err(AnimationError::InvalidFrameRate {
            animation: data.name.clone(),
            fps: data.fps,
        });
    }
    if data.frame_count == 0 {
        return Err(AnimationError::EmptyAnimation(data.name.clone()));
    }

    let bone_count = data.node_indices.len();
    let expected = data.frame_count as usize * bone_count;
    if data.samples.len() != expected {
        return Err(AnimationError::SampleCountMismatch {
            animation: data.name.clone(),
            actual: data.samples.len(),
            expected,
            frames: data.frame_count,
            bones: bone_count,
        });
    }

    let bone_names = data
        .node_indices
        .iter()
        .map(|&node| {
            hierarchy
                .nodes
                .get(node as usize)
                .map(|n| n.name.clone())
                .ok_or_else(|| AnimationError::InvalidNodeIndex {
                    animation: data.name.clone(),
                    hierarchy: hierarchy.name.clone(),
                    node,
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let root_index = bone_names
        .iter()
        .position(|b| b.eq_ignore_ascii_case(&settings.root_bone_name));

    // The root translation is never written into the pose; locomotion comes from
    // `movement_speed` instead.
    let key_frames = data
        .samples
        .iter()
        .enumerate()
        .map(|(i, sample)| KeyFrame {
            position: if Some(i % bone_count) == root_index {
                Vec3::ZERO
            } else {
                sample.position
            },
            rotation: to_engine_quat(sample.rotation),
        })
        .collect();

    let duration = data.frame_count as f32 / data.fps;
    let (is_moving, movement_speed) = if meta.layer == 1 {
        match root_index {
            Some(root) => derive_movement(settings, data, bone_count, root, duration),
            None => {
                warn!(
                    "Animation '{}' has no '{}' bone, no movement derived",
                    data.name, settings.root_bone_name
                );
                (false, Vec3::ZERO)
            }
        }
    } else {
        (false, Vec3::ZERO)
    };

    let mut events = meta.events.to_vec();
    events.sort_by_key(|e| e.frame);

    Ok(AnimationTrack {
        name: meta.data_name.to_string(),
        alias_name: meta.alias_name.map(str::to_string),
        model_script: script_name.to_string(),
        bone_names,
        bone_count,
        key_frames,
        frame_count: data.frame_count,
        fps: data.fps,
        frame_time: 1.0 / data.fps,
        duration,
        layer: meta.layer,
        blend_in: meta.blend_in.max(0.0),
        blend_out: meta.blend_out.max(0.0),
        flags: meta.flags,
        next_ani: Some(meta.next.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        events,
        is_moving,
        movement_speed,
    })
}

/// Compares the root's first and last sample. Only XZ decides whether the track
/// moves; the speed keeps Y for vertical movement.
fn derive_movement(
    settings: &AnimationSettings,
    data: &ModelAnimation,
    bone_count: usize,
    root: usize,
    duration: f32,
) -> (bool, Vec3) {
    let last_frame = data.frame_count as usize - 1;
    let first = data.samples[root].position;
    let last = data.samples[last_frame * bone_count + root].position;
    let displacement = last - first;
    let threshold = settings.movement_threshold;
    if flatten(displacement).length_squared() > threshold * threshold {
        (true, displacement / duration)
    } else {
        (false, Vec3::ZERO)
    }
}
