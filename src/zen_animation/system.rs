// src/zen_animation/system.rs

use std::f32::consts::PI;
use std::sync::Arc;

use bevy::log::{debug, trace, warn};
use bevy::math::{Quat, Vec3};
use bevy::prelude::{Component, Transform};

use super::events::{FiredAnimationEvent, FiredEventKind, SlotAttachment};
use super::instance::{AnimationState, AnimationTrackInstance};
use super::manager::AnimationManager;
use super::settings::AnimationSettings;
use crate::zen::skeleton::Skeleton;
use crate::zen::types::{AnimationFlags, EventTag, ModelEvent, ModelEventKind};

/// The base locomotion layer.
pub const BASE_LAYER: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Result of blending every instance for one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBone {
    pub position: Vec3,
    pub rotation: Quat,
    /// Weight contributed by instances after the over-weight clamp.
    pub weight_sum: f32,
    /// Weight given to the bind pose, `1 - weight_sum`.
    pub fallback_weight: f32,
}

/// Bone claims to hand back to lower layers.
struct Release {
    layer: i32,
    bones: Vec<String>,
    duration: f32,
}

/// Per-character blending engine. Owns every playing instance and is the only
/// writer of the character's bone transforms.
#[derive(Component, Debug)]
pub struct AnimationSystem {
    mds_base: String,
    mds_overlay: Option<String>,
    idle_animation: String,
    skeleton: Skeleton,
    /// Sorted by layer DESC, then creation DESC.
    instances: Vec<AnimationTrackInstance>,
    pose: Vec<BonePose>,
    next_creation_time: u64,
    pending_events: Vec<FiredAnimationEvent>,
    head_look: Option<Quat>,
}

impl AnimationSystem {
    pub fn new(skeleton: Skeleton, mds_base: &str, idle_animation: &str) -> Self {
        let pose = bind_pose(&skeleton);
        Self {
            mds_base: mds_base.to_string(),
            mds_overlay: None,
            idle_animation: idle_animation.to_string(),
            skeleton,
            instances: Vec::new(),
            pose,
            next_creation_time: 0,
            pending_events: Vec::new(),
            head_look: None,
        }
    }

    pub fn with_overlay(mut self, overlay: &str) -> Self {
        self.set_overlay(Some(overlay));
        self
    }

    pub fn set_overlay(&mut self, overlay: Option<&str>) {
        self.mds_overlay = overlay.map(str::to_string);
    }

    pub fn mds_base(&self) -> &str {
        &self.mds_base
    }

    pub fn mds_overlay(&self) -> Option<&str> {
        self.mds_overlay.as_deref()
    }

    pub fn idle_animation(&self) -> &str {
        &self.idle_animation
    }

    pub fn set_idle_animation(&mut self, name: &str) {
        self.idle_animation = name.to_string();
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn skeleton_mut(&mut self) -> &mut Skeleton {
        &mut self.skeleton
    }

    pub fn instances(&self) -> &[AnimationTrackInstance] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&AnimationTrackInstance> {
        self.instances
            .iter()
            .find(|i| i.track.matches_name(name) && i.state() != AnimationState::Stop)
    }

    pub fn pose(&self) -> &[BonePose] {
        &self.pose
    }

    /// Extra rotation applied on top of the head bone's resolved pose.
    pub fn set_head_look(&mut self, rotation: Option<Quat>) {
        self.head_look = rotation;
    }

    pub fn head_look(&self) -> Option<Quat> {
        self.head_look
    }

    pub fn play_animation(&mut self, manager: &mut AnimationManager, name: &str) -> bool {
        self.admit(manager, name, &[])
    }

    /// Like `play_animation`, but the new instance leaves `excluded_bones` alone.
    pub fn play_animation_excluding(
        &mut self,
        manager: &mut AnimationManager,
        name: &str,
        excluded_bones: &[&str],
    ) -> bool {
        self.admit(manager, name, excluded_bones)
    }

    pub fn play_idle_animation(&mut self, manager: &mut AnimationManager) -> bool {
        let idle = self.idle_animation.clone();
        self.play_animation(manager, &idle)
    }

    fn admit(&mut self, manager: &mut AnimationManager, name: &str, excluded: &[&str]) -> bool {
        let Some(track) = manager.get_track(name, &self.mds_base, self.mds_overlay.as_deref())
        else {
            debug!("Animation '{}' unavailable for '{}'", name, self.mds_base);
            return false;
        };

        let playing = self.instances.iter().position(|i| {
            i.state().is_active()
                && (Arc::ptr_eq(&i.track, &track)
                    || i.track.display_name().eq_ignore_ascii_case(track.display_name()))
        });
        if let Some(index) = playing {
            // Take back bones a partial replacement left behind.
            let held = self.bones_held_above(self.instances[index].layer());
            let free: Vec<&String> = track
                .bone_names
                .iter()
                .filter(|bone| !held.iter().any(|h| h.eq_ignore_ascii_case(bone)))
                .collect();
            self.instances[index].blend_in_bones(&free, track.blend_in);
            return true;
        }

        let layer = track.layer;
        let mut instance =
            AnimationTrackInstance::new(track.clone(), self.next_creation_time, &self.skeleton);
        self.next_creation_time += 1;
        instance.start_blend_in(track.blend_in);

        for other in &mut self.instances {
            match other.layer().cmp(&layer) {
                std::cmp::Ordering::Less => {
                    other.blend_out_bones(&track.bone_names, track.blend_in);
                }
                std::cmp::Ordering::Equal => {
                    if track.flags.contains(AnimationFlags::QUEUE) && other.state().is_active() {
                        // TODO: defer the start until `other` reaches its last frame.
                        warn!(
                            "Queue flag of '{}' is not implemented, replacing '{}' immediately",
                            track.display_name(),
                            other.track.display_name()
                        );
                    }
                    other.cancel_chain();
                    if excluded.is_empty() {
                        other.blend_out(track.blend_in);
                    } else {
                        // Bones the newcomer leaves alone stay with the old instance.
                        let taken: Vec<&String> = track
                            .bone_names
                            .iter()
                            .filter(|bone| !excluded.iter().any(|e| e.eq_ignore_ascii_case(bone)))
                            .collect();
                        other.blend_out_bones(&taken, track.blend_in);
                    }
                }
                std::cmp::Ordering::Greater => {
                    if other.state().is_active() {
                        instance.suppress_bones(&other.active_bone_names());
                    }
                }
            }
        }
        if !excluded.is_empty() {
            instance.suppress_bones(excluded);
        }

        debug!(
            "Playing '{}' on layer {} ({} bones)",
            track.display_name(),
            layer,
            track.bone_count
        );
        self.instances.push(instance);
        self.sort_instances();
        true
    }

    /// Fades out every instance matching `name` and hands its bones back to lower layers.
    pub fn stop_animation(&mut self, name: &str) {
        let mut releases = Vec::new();
        for inst in &mut self.instances {
            if inst.track.matches_name(name) && inst.state().is_active() {
                let duration = inst.track.blend_out;
                inst.cancel_chain();
                inst.blend_out(duration);
                releases.push(Release {
                    layer: inst.layer(),
                    bones: inst.track.bone_names.clone(),
                    duration,
                });
            }
        }
        for release in releases {
            self.release_bones(&release);
        }
    }

    /// Re-blends the released bones on every lower, still playing instance unless
    /// another active instance above it holds them.
    fn release_bones(&mut self, release: &Release) {
        let holders: Vec<(i32, Vec<String>)> = self
            .instances
            .iter()
            .filter(|i| i.state().is_active())
            .map(|i| (i.layer(), i.active_bone_names()))
            .collect();

        for inst in &mut self.instances {
            if inst.layer() >= release.layer || !inst.state().is_active() {
                continue;
            }
            let own_layer = inst.layer();
            let free: Vec<&String> = release
                .bones
                .iter()
                .filter(|bone| {
                    !holders.iter().any(|(layer, held)| {
                        *layer > own_layer && held.iter().any(|h| h.eq_ignore_ascii_case(bone))
                    })
                })
                .collect();
            inst.blend_in_bones(&free, release.duration);
        }
    }

    /// Bone names driven by active instances on layers above `layer`.
    fn bones_held_above(&self, layer: i32) -> Vec<String> {
        self.instances
            .iter()
            .filter(|i| i.layer() > layer && i.state().is_active())
            .flat_map(|i| i.active_bone_names())
            .collect()
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.instances
            .iter()
            .any(|i| i.state().is_active() && i.track.matches_name(name))
    }

    /// Duration of the track `name`, 0 unless `is_playing(name)`.
    pub fn animation_duration(&self, name: &str) -> f32 {
        self.instances
            .iter()
            .find(|i| i.state().is_active() && i.track.matches_name(name))
            .map_or(0.0, |i| i.track.duration)
    }

    /// Hard reset without fading, e.g. when the character gets culled.
    pub fn stop_all_animations(&mut self) {
        self.instances.clear();
        self.pending_events.clear();
        self.head_look = None;
        self.pose = bind_pose(&self.skeleton);
    }

    pub fn drain_events(&mut self) -> Vec<FiredAnimationEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn pending_events(&self) -> &[FiredAnimationEvent] {
        &self.pending_events
    }

    fn sort_instances(&mut self) {
        self.instances.sort_by(|a, b| {
            b.layer()
                .cmp(&a.layer())
                .then(b.creation_time().cmp(&a.creation_time()))
        });
    }

    /// Runs one simulation step and moves `root` by the extracted root motion.
    pub fn tick(&mut self, manager: &mut AnimationManager, dt: f32, root: &mut Transform) {
        // --- Clocks and blend states ---
        let mut due: Vec<(String, ModelEvent)> = Vec::new();
        let mut ended: Vec<String> = Vec::new();
        let mut releases = Vec::new();
        let mut chained = Vec::new();

        for inst in &mut self.instances {
            let update = inst.update(dt);
            let name = inst.track.display_name().to_string();
            due.extend(update.events.into_iter().map(|e| (name.clone(), e)));
            if update.end_reached {
                ended.push(name.clone());
                // Hand the bones over while this instance fades out.
                releases.push(Release {
                    layer: inst.layer(),
                    bones: inst.track.bone_names.clone(),
                    duration: inst.track.blend_out,
                });
                if let Some(next) = inst.pending_chain() {
                    chained.push(next.to_string());
                }
                inst.cancel_chain();
            }
            if inst.state() == AnimationState::Stop {
                if !inst.end_reported() {
                    inst.mark_end_reported();
                    ended.push(name);
                }
                releases.push(Release {
                    layer: inst.layer(),
                    bones: inst.track.bone_names.clone(),
                    duration: inst.track.blend_out,
                });
                if let Some(next) = inst.pending_chain() {
                    chained.push(next.to_string());
                }
            }
        }
        self.instances
            .retain(|i| i.state() != AnimationState::Stop);
        for release in &releases {
            self.release_bones(release);
        }
        for next in chained {
            if !self.play_animation(manager, &next) {
                warn!("Chained animation '{}' is unavailable", next);
            }
        }

        // --- Idle guarantee ---
        let base_layer_busy = self.instances.iter().any(|i| {
            i.layer() == BASE_LAYER
                && (i.state().is_active() || i.pending_chain().is_some())
        });
        if !base_layer_busy && !self.play_idle_animation(manager) {
            trace!("Idle animation '{}' unavailable", self.idle_animation);
        }

        // --- Pose ---
        for bone in 0..self.skeleton.len() {
            let resolved = self.resolve_bone(bone);
            self.pose[bone] = BonePose {
                position: resolved.position,
                rotation: resolved.rotation,
            };
        }

        // --- Root motion ---
        let settings = manager.settings();
        let movement = self.root_motion(settings, dt);
        if movement != Vec3::ZERO {
            root.translation += root.rotation * movement;
        }

        // --- Post corrections ---
        self.apply_corrections(settings);

        // --- Events ---
        for (animation, event) in due {
            if let Some(kind) = self.fire_event(settings, &animation, &event) {
                self.pending_events.push(FiredAnimationEvent { animation, kind });
            }
        }
        self.pending_events
            .extend(ended.iter().map(|name| FiredAnimationEvent::ended(name)));
    }

    /// Blends every instance referencing `bone` in precedence order. Contributions
    /// past a total weight of 1 are clamped; the remainder goes to the bind pose.
    pub fn resolve_bone(&self, bone: usize) -> ResolvedBone {
        let Some(bind) = self.skeleton.bones.get(bone) else {
            return ResolvedBone {
                position: Vec3::ZERO,
                rotation: Quat::IDENTITY,
                weight_sum: 0.0,
                fallback_weight: 1.0,
            };
        };

        let mut position = Vec3::ZERO;
        let mut rotation = Quat::IDENTITY;
        let mut weight_sum = 0.0_f32;

        for inst in &self.instances {
            let Some(track_bone) = inst.track_bone(bone) else {
                continue;
            };
            let mut weight = inst.bone_weight(track_bone);
            if weight <= 0.0 {
                continue;
            }
            if weight_sum + weight > 1.0 {
                weight = 1.0 - weight_sum;
                if weight <= 0.0 {
                    break;
                }
            }
            let Some(key) = inst.sample(track_bone) else {
                continue;
            };
            position += key.position * weight;
            rotation = if weight_sum <= 0.0 {
                key.rotation
            } else {
                rotation.slerp(key.rotation, weight / (weight_sum + weight))
            };
            weight_sum += weight;
        }

        let fallback_weight = (1.0 - weight_sum).max(0.0);
        if fallback_weight > 0.0 {
            position += bind.bind_position * fallback_weight;
            rotation = if weight_sum <= 0.0 {
                bind.bind_rotation
            } else {
                rotation.slerp(bind.bind_rotation, fallback_weight)
            };
        }

        ResolvedBone {
            position,
            rotation,
            weight_sum,
            fallback_weight,
        }
    }

    /// Local displacement of this tick from every moving track, weighted by its root bone.
    fn root_motion(&self, settings: &AnimationSettings, dt: f32) -> Vec3 {
        let mut movement = Vec3::ZERO;
        let mut weight_sum = 0.0_f32;
        for inst in &self.instances {
            if !inst.track.is_moving {
                continue;
            }
            let Some(mut weight) = inst.bone_weight_by_name(&settings.root_bone_name) else {
                continue;
            };
            weight = weight.min(1.0 - weight_sum);
            if weight <= 0.0 {
                continue;
            }
            movement += inst.track.movement_speed * weight * dt;
            weight_sum += weight;
        }
        movement
    }

    fn apply_corrections(&mut self, settings: &AnimationSettings) {
        let sitting = self
            .instances
            .iter()
            .any(|i| i.state().is_active() && settings.needs_sit_mirror(i.track.display_name()));
        if sitting {
            if let Some(hip) = self.skeleton.bone_index(&settings.hip_bone_name) {
                let pose = &mut self.pose[hip];
                pose.rotation = Quat::from_rotation_y(PI) * pose.rotation;
            }
        }
        if let Some(look) = self.head_look {
            if let Some(head) = self.skeleton.bone_index(&settings.head_bone_name) {
                let pose = &mut self.pose[head];
                pose.rotation = look * pose.rotation;
            }
        }
    }

    fn slot_attachment(&self, slot: &str) -> Option<SlotAttachment> {
        let bone_index = self.skeleton.bone_index(slot)?;
        let pose = self.pose.get(bone_index)?;
        Some(SlotAttachment {
            bone_index,
            position: pose.position,
            rotation: pose.rotation,
        })
    }

    fn fire_event(
        &self,
        settings: &AnimationSettings,
        animation: &str,
        event: &ModelEvent,
    ) -> Option<FiredEventKind> {
        match &event.kind {
            ModelEventKind::Tag { tag, slots } => {
                let slot = slots.first().cloned().unwrap_or_default();
                Some(match tag {
                    EventTag::CreateItem(item) => FiredEventKind::CreateItem {
                        item: item.clone(),
                        attach: self.slot_attachment(&slot),
                        slot,
                    },
                    EventTag::InsertItem => FiredEventKind::InsertItem {
                        attach: self.slot_attachment(&slot),
                        slot,
                    },
                    EventTag::RemoveItem => FiredEventKind::RemoveItem { slot },
                    EventTag::DestroyItem => FiredEventKind::DestroyItem { slot },
                    EventTag::ExchangeItem(item) => FiredEventKind::ExchangeItem {
                        item: item.clone(),
                        attach: self.slot_attachment(&slot),
                        slot,
                    },
                    EventTag::Other(name) => FiredEventKind::Tag { name: name.clone() },
                })
            }
            ModelEventKind::SoundEffect {
                name,
                range,
                empty_slot,
            } => Some(FiredEventKind::Sound {
                name: name.clone(),
                range: if *range > 0.0 {
                    *range
                } else {
                    settings.default_sound_range
                },
                empty_slot: *empty_slot,
            }),
            ModelEventKind::ParticleEffect { name, .. } => {
                warn!(
                    "Particle effect '{}' of '{}' is not supported, skipping",
                    name, animation
                );
                None
            }
            ModelEventKind::MorphAnimation { animation, node } => Some(FiredEventKind::Morph {
                animation: animation.clone(),
                node: node.clone(),
            }),
        }
    }
}

fn bind_pose(skeleton: &Skeleton) -> Vec<BonePose> {
    skeleton
        .bones
        .iter()
        .map(|b| BonePose {
            position: b.bind_position,
            rotation: b.bind_rotation,
        })
        .collect()
}
