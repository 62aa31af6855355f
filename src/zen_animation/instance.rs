// src/zen_animation/instance.rs

use std::sync::Arc;

use super::track::{AnimationTrack, KeyFrame};
use crate::zen::skeleton::Skeleton;
use crate::zen::types::ModelEvent;

/// Ramps closer than this to their target snap onto it.
const WEIGHT_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    None,
    BlendIn,
    Play,
    BlendOut,
    Stop,
}

impl AnimationState {
    /// BlendIn or Play.
    pub fn is_active(self) -> bool {
        matches!(self, AnimationState::BlendIn | AnimationState::Play)
    }
}

/// Blend state of one bone of one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneBlend {
    pub state: AnimationState,
    pub weight: f32,
    duration: f32,
}

impl BoneBlend {
    fn blend_in(&mut self, duration: f32) {
        if duration <= 0.0 {
            self.weight = 1.0;
            self.state = AnimationState::Play;
        } else {
            self.state = AnimationState::BlendIn;
            self.duration = duration;
        }
    }

    fn blend_out(&mut self, duration: f32) {
        if duration <= 0.0 || self.weight <= 0.0 {
            self.weight = 0.0;
            self.state = AnimationState::Stop;
        } else {
            self.state = AnimationState::BlendOut;
            self.duration = duration;
        }
    }

    fn suppress(&mut self) {
        self.weight = 0.0;
        self.state = AnimationState::Stop;
    }

    fn update(&mut self, dt: f32) {
        match self.state {
            AnimationState::BlendIn => {
                self.weight += dt / self.duration;
                if self.weight >= 1.0 - WEIGHT_EPSILON {
                    self.weight = 1.0;
                    self.state = AnimationState::Play;
                }
            }
            AnimationState::BlendOut => {
                self.weight -= dt / self.duration;
                if self.weight <= WEIGHT_EPSILON {
                    self.weight = 0.0;
                    self.state = AnimationState::Stop;
                }
            }
            _ => {}
        }
    }
}

impl Default for BoneBlend {
    fn default() -> Self {
        Self {
            state: AnimationState::None,
            weight: 0.0,
            duration: 0.0,
        }
    }
}

/// What happened to an instance during one `update`.
#[derive(Debug, Default)]
pub struct InstanceUpdate {
    /// Events whose frame was passed this tick, in order.
    pub events: Vec<ModelEvent>,
    /// The clock wrapped around the track's duration.
    pub looped: bool,
    /// A play-once track reached its last frame this tick.
    pub end_reached: bool,
}

/// One playing occurrence of a track on one character.
#[derive(Debug, Clone)]
pub struct AnimationTrackInstance {
    pub track: Arc<AnimationTrack>,
    state: AnimationState,
    blend_weight: f32,
    blend_in_duration: f32,
    blend_out_duration: f32,
    current_time: f32,
    current_key_frame_index: usize,
    bone_blends: Vec<BoneBlend>,
    creation_time: u64,
    event_cursor: usize,
    end_reported: bool,
    chain_cancelled: bool,
    /// Track bone per skeleton bone.
    skeleton_lookup: Vec<Option<usize>>,
}

impl AnimationTrackInstance {
    pub fn new(track: Arc<AnimationTrack>, creation_time: u64, skeleton: &Skeleton) -> Self {
        let skeleton_lookup = skeleton
            .bones
            .iter()
            .map(|bone| track.bone_index(&bone.name))
            .collect();
        Self {
            bone_blends: vec![BoneBlend::default(); track.bone_count],
            track,
            state: AnimationState::None,
            blend_weight: 0.0,
            blend_in_duration: 0.0,
            blend_out_duration: 0.0,
            current_time: 0.0,
            current_key_frame_index: 0,
            creation_time,
            event_cursor: 0,
            end_reported: false,
            chain_cancelled: false,
            skeleton_lookup,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn layer(&self) -> i32 {
        self.track.layer
    }

    pub fn blend_weight(&self) -> f32 {
        self.blend_weight
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn current_key_frame_index(&self) -> usize {
        self.current_key_frame_index
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    /// True once an `AnimationEnded` was reported for this instance.
    pub fn end_reported(&self) -> bool {
        self.end_reported
    }

    pub(crate) fn mark_end_reported(&mut self) {
        self.end_reported = true;
    }

    /// Follow-up to start once this instance stops, unless it was replaced or stopped.
    pub fn pending_chain(&self) -> Option<&str> {
        if self.chain_cancelled {
            None
        } else {
            self.track.chained_animation()
        }
    }

    pub fn cancel_chain(&mut self) {
        self.chain_cancelled = true;
    }

    pub fn bone_blends(&self) -> &[BoneBlend] {
        &self.bone_blends
    }

    pub fn bone_weight(&self, track_bone: usize) -> f32 {
        self.bone_blends.get(track_bone).map_or(0.0, |b| b.weight)
    }

    pub fn bone_weight_by_name(&self, name: &str) -> Option<f32> {
        self.track.bone_index(name).map(|i| self.bone_weight(i))
    }

    pub fn bone_state_by_name(&self, name: &str) -> Option<AnimationState> {
        self.track
            .bone_index(name)
            .and_then(|i| self.bone_blends.get(i))
            .map(|b| b.state)
    }

    /// Track bone driving skeleton bone `skeleton_bone`, if any.
    pub fn track_bone(&self, skeleton_bone: usize) -> Option<usize> {
        self.skeleton_lookup.get(skeleton_bone).copied().flatten()
    }

    pub fn sample(&self, track_bone: usize) -> Option<KeyFrame> {
        self.track.sample(self.current_time, track_bone)
    }

    /// The bone belongs to this track and has not been released.
    pub fn controls_bone(&self, name: &str) -> bool {
        self.bone_state_by_name(name)
            .is_some_and(|s| s != AnimationState::Stop)
    }

    pub fn active_bone_names(&self) -> Vec<String> {
        self.track
            .bone_names
            .iter()
            .zip(&self.bone_blends)
            .filter(|(_, blend)| blend.state != AnimationState::Stop)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn start_blend_in(&mut self, duration: f32) {
        self.blend_in_duration = duration;
        for bone in &mut self.bone_blends {
            bone.blend_in(duration);
        }
        if duration <= 0.0 {
            self.blend_weight = 1.0;
            self.state = AnimationState::Play;
        } else {
            self.state = AnimationState::BlendIn;
        }
    }

    /// Fades every bone out. A no-op on instances already leaving.
    pub fn blend_out(&mut self, duration: f32) {
        if matches!(self.state, AnimationState::BlendOut | AnimationState::Stop) {
            return;
        }
        self.state = AnimationState::BlendOut;
        self.blend_out_duration = duration;
        for bone in &mut self.bone_blends {
            if bone.state != AnimationState::Stop {
                bone.blend_out(duration);
            }
        }
        self.stop_if_released();
    }

    /// Fades out only the named bones, leaving the instance itself playing.
    pub fn blend_out_bones<S: AsRef<str>>(&mut self, names: &[S], duration: f32) {
        for name in names {
            if let Some(i) = self.track.bone_index(name.as_ref()) {
                let bone = &mut self.bone_blends[i];
                if bone.state.is_active() {
                    bone.blend_out(duration);
                }
            }
        }
    }

    /// Fades the named bones back in. Only instances still BlendIn/Play take bones back.
    pub fn blend_in_bones<S: AsRef<str>>(&mut self, names: &[S], duration: f32) {
        if !self.state.is_active() {
            return;
        }
        for name in names {
            if let Some(i) = self.track.bone_index(name.as_ref()) {
                let bone = &mut self.bone_blends[i];
                if matches!(bone.state, AnimationState::BlendOut | AnimationState::Stop) {
                    bone.blend_in(duration);
                }
            }
        }
    }

    /// Zeroes the named bones immediately.
    pub fn suppress_bones<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            if let Some(i) = self.track.bone_index(name.as_ref()) {
                self.bone_blends[i].suppress();
            }
        }
    }

    /// Advances the clock, collects due events and steps every blend ramp.
    pub fn update(&mut self, dt: f32) -> InstanceUpdate {
        let mut result = InstanceUpdate::default();
        if self.state == AnimationState::Stop {
            return result;
        }

        // --- Clock ---
        let duration = self.track.duration;
        // The fade out that starts at the last frame ramps from the next update on,
        // in step with whatever takes the bones over.
        let mut step_ramps = true;
        self.current_time += dt;
        if self.current_time >= duration {
            if self.track.is_looping() {
                // Everything up to the last frame is due before wrapping.
                result
                    .events
                    .extend(self.track.events[self.event_cursor..].iter().cloned());
                self.event_cursor = 0;
                self.current_time = if duration > 0.0 {
                    self.current_time % duration
                } else {
                    0.0
                };
                result.looped = true;
            } else {
                self.current_time = duration;
                if !self.end_reported {
                    result.end_reached = true;
                    self.end_reported = true;
                    let blend_out = self.track.blend_out;
                    self.blend_out(blend_out);
                    step_ramps = false;
                }
            }
        }
        let last_frame = self.track.frame_count.saturating_sub(1) as usize;
        self.current_key_frame_index =
            ((self.current_time / self.track.frame_time) as usize).min(last_frame);

        while let Some(event) = self.track.events.get(self.event_cursor) {
            if event.frame as usize > self.current_key_frame_index {
                break;
            }
            result.events.push(event.clone());
            self.event_cursor += 1;
        }

        // --- Blend ramps ---
        if !step_ramps {
            self.stop_if_released();
            return result;
        }
        match self.state {
            AnimationState::BlendIn => {
                self.blend_weight = if self.blend_in_duration > 0.0 {
                    self.blend_weight + dt / self.blend_in_duration
                } else {
                    1.0
                };
                if self.blend_weight >= 1.0 - WEIGHT_EPSILON {
                    self.blend_weight = 1.0;
                    self.state = AnimationState::Play;
                }
            }
            AnimationState::BlendOut => {
                self.blend_weight = if self.blend_out_duration > 0.0 {
                    (self.blend_weight - dt / self.blend_out_duration).max(0.0)
                } else {
                    0.0
                };
            }
            _ => {}
        }
        for bone in &mut self.bone_blends {
            bone.update(dt);
        }
        self.stop_if_released();
        result
    }

    fn stop_if_released(&mut self) {
        if self.state == AnimationState::BlendOut
            && self
                .bone_blends
                .iter()
                .all(|b| b.state == AnimationState::Stop)
        {
            self.state = AnimationState::Stop;
            self.blend_weight = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zen::types::{EventTag, ModelEventKind};
    use crate::zen_animation::track::tests::simple_track;
    use bevy::math::{Quat, Vec3};

    fn skeleton() -> Skeleton {
        let mut skeleton = Skeleton::new();
        skeleton.add_bone("BIP01 SPINE", None, Vec3::ZERO, Quat::IDENTITY);
        skeleton
    }

    fn instance(track: AnimationTrack) -> AnimationTrackInstance {
        AnimationTrackInstance::new(Arc::new(track), 0, &skeleton())
    }

    #[test]
    fn blend_in_reaches_play_with_full_weight() {
        let mut inst = instance(simple_track("S_RUN", 10, 10.0, Some("S_RUN")));
        inst.start_blend_in(0.2);
        assert_eq!(inst.state(), AnimationState::BlendIn);
        for _ in 0..4 {
            inst.update(0.05);
        }
        assert_eq!(inst.state(), AnimationState::Play);
        assert_eq!(inst.blend_weight(), 1.0);
        assert_eq!(inst.bone_weight(0), 1.0);
    }

    #[test]
    fn blend_out_terminates_within_its_duration() {
        let mut inst = instance(simple_track("S_RUN", 10, 10.0, Some("S_RUN")));
        inst.start_blend_in(0.0);
        inst.blend_out(0.3);
        let mut elapsed = 0.0;
        let mut last_weight = inst.bone_weight(0);
        while inst.state() != AnimationState::Stop {
            inst.update(1.0 / 60.0);
            elapsed += 1.0 / 60.0;
            assert!(inst.bone_weight(0) <= last_weight);
            last_weight = inst.bone_weight(0);
            assert!(elapsed <= 0.3 + 1.0 / 60.0);
        }
        assert_eq!(inst.bone_weight(0), 0.0);
    }

    #[test]
    fn looping_track_wraps_and_refires_events() {
        let mut track = simple_track("S_RUN", 10, 10.0, Some("S_RUN"));
        track.events.push(ModelEvent {
            frame: 5,
            kind: ModelEventKind::Tag {
                tag: EventTag::Other("DEF_STEP".into()),
                slots: Vec::new(),
            },
        });
        let mut inst = instance(track);
        inst.start_blend_in(0.0);
        assert_eq!(inst.update(0.6).events.len(), 1);
        let wrapped = inst.update(0.6);
        assert!(wrapped.looped);
        assert!(wrapped.events.is_empty());
        assert!((inst.current_time() - 0.2).abs() < 1e-4);
        assert_eq!(inst.update(0.4).events.len(), 1);
    }

    #[test]
    fn play_once_track_blends_out_at_its_end() {
        let mut track = simple_track("T_STAND_2_SIT", 5, 10.0, Some("S_SIT"));
        track.blend_out = 0.1;
        let mut inst = instance(track);
        inst.start_blend_in(0.0);
        let update = inst.update(0.6);
        assert!(update.end_reached);
        assert_eq!(inst.current_key_frame_index(), 4);
        assert!(!inst.update(0.2).end_reached);
        assert_eq!(inst.state(), AnimationState::Stop);
    }

    #[test]
    fn end_fade_starts_on_the_following_update() {
        let mut track = simple_track("T_GESTURE", 5, 10.0, None);
        track.blend_out = 0.2;
        let mut inst = instance(track);
        inst.start_blend_in(0.0);
        assert!(inst.update(0.55).end_reached);
        assert_eq!(inst.state(), AnimationState::BlendOut);
        assert_eq!(inst.bone_weight(0), 1.0);
        inst.update(0.05);
        assert!((inst.bone_weight(0) - 0.75).abs() < 1e-5);
    }

    #[test]
    fn released_bones_only_return_while_playing() {
        let mut inst = instance(simple_track("S_RUN", 10, 10.0, Some("S_RUN")));
        inst.start_blend_in(0.0);
        inst.suppress_bones(&["bip01 spine"]);
        assert_eq!(inst.bone_weight(0), 0.0);
        assert!(!inst.controls_bone("BIP01 SPINE"));
        inst.blend_in_bones(&["BIP01 SPINE"], 0.1);
        inst.update(0.1);
        assert_eq!(inst.bone_weight(0), 1.0);

        inst.blend_out(0.1);
        inst.blend_in_bones(&["BIP01 SPINE"], 0.1);
        assert_eq!(inst.bone_state_by_name("BIP01 SPINE"), Some(AnimationState::BlendOut));
    }
}
