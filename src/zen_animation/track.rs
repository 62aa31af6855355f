// src/zen_animation/track.rs

use bevy::math::{Quat, Vec3};

use crate::zen::types::{AnimationFlags, ModelEvent};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Immutable, shared description of one loaded animation clip.
///
/// Built once by the `AnimationManager` and handed out as `Arc<AnimationTrack>`
/// to every instance that plays it.
#[derive(Debug, Clone)]
pub struct AnimationTrack {
    pub name: String,
    /// Set when the track was resolved through an `aniAlias`.
    pub alias_name: Option<String>,
    /// Model script the track was resolved from.
    pub model_script: String,

    pub bone_names: Vec<String>,
    pub bone_count: usize,
    /// `key_frames[frame * bone_count + bone]`
    pub key_frames: Vec<KeyFrame>,

    pub frame_count: u32,
    pub fps: f32,
    pub frame_time: f32,
    pub duration: f32,

    pub layer: i32,
    pub blend_in: f32,
    pub blend_out: f32,
    pub flags: AnimationFlags,
    pub next_ani: Option<String>,
    /// Sorted by frame.
    pub events: Vec<ModelEvent>,

    pub is_moving: bool,
    pub movement_speed: Vec3,
}

impl AnimationTrack {
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bone_names
            .iter()
            .position(|b| b.eq_ignore_ascii_case(name))
    }

    pub fn key_frame(&self, frame: usize, bone: usize) -> Option<&KeyFrame> {
        if bone >= self.bone_count {
            return None;
        }
        self.key_frames.get(frame * self.bone_count + bone)
    }

    /// Interpolated pose of `bone` at `time` seconds into the track.
    pub fn sample(&self, time: f32, bone: usize) -> Option<KeyFrame> {
        if self.frame_count == 0 {
            return None;
        }
        let last = self.frame_count as usize - 1;
        let exact = (time / self.frame_time).max(0.0);
        let frame = (exact.floor() as usize).min(last);
        let fraction = if frame >= last && !self.is_looping() {
            0.0
        } else {
            (exact - frame as f32).clamp(0.0, 1.0)
        };
        let next = if frame >= last {
            if self.is_looping() { 0 } else { last }
        } else {
            frame + 1
        };

        let a = self.key_frame(frame, bone)?;
        if fraction <= f32::EPSILON || next == frame {
            return Some(*a);
        }
        let b = self.key_frame(next, bone)?;
        Some(KeyFrame {
            position: a.position.lerp(b.position, fraction),
            rotation: a.rotation.slerp(b.rotation, fraction),
        })
    }

    /// Matches against the real name and the alias, ignoring case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .alias_name
                .as_deref()
                .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// The name this track was requested by.
    pub fn display_name(&self) -> &str {
        self.alias_name.as_deref().unwrap_or(&self.name)
    }

    /// Only a track chained to itself loops. Everything else plays once.
    pub fn is_looping(&self) -> bool {
        self.next_ani
            .as_deref()
            .is_some_and(|next| self.matches_name(next))
    }

    /// The follow-up animation to chain to once a play-once track stopped.
    pub fn chained_animation(&self) -> Option<&str> {
        if self.is_looping() {
            None
        } else {
            self.next_ani.as_deref()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn simple_track(name: &str, frames: u32, fps: f32, next: Option<&str>) -> AnimationTrack {
        let key_frames = (0..frames)
            .map(|f| KeyFrame {
                position: Vec3::new(f as f32, 0.0, 0.0),
                rotation: Quat::IDENTITY,
            })
            .collect();
        AnimationTrack {
            name: name.to_string(),
            alias_name: None,
            model_script: "humans".into(),
            bone_names: vec!["BIP01 SPINE".into()],
            bone_count: 1,
            key_frames,
            frame_count: frames,
            fps,
            frame_time: 1.0 / fps,
            duration: frames as f32 / fps,
            layer: 1,
            blend_in: 0.1,
            blend_out: 0.1,
            flags: AnimationFlags::NONE,
            next_ani: next.map(str::to_string),
            events: Vec::new(),
            is_moving: false,
            movement_speed: Vec3::ZERO,
        }
    }

    #[test]
    fn samples_between_frames() {
        let track = simple_track("S_RUN", 4, 10.0, None);
        let key = track.sample(0.15, 0).unwrap();
        assert!((key.position.x - 1.5).abs() < 1e-4);
    }

    #[test]
    fn looping_track_wraps_last_frame_to_first() {
        let track = simple_track("S_RUN", 4, 10.0, Some("s_run"));
        assert!(track.is_looping());
        let key = track.sample(0.35, 0).unwrap();
        assert!((key.position.x - 1.5).abs() < 1e-4);
    }

    #[test]
    fn track_without_follow_up_plays_once() {
        let track = simple_track("T_DIALOGGESTURE_01", 4, 10.0, None);
        assert!(!track.is_looping());
        assert_eq!(track.chained_animation(), None);
    }

    #[test]
    fn play_once_track_holds_last_frame() {
        let track = simple_track("T_RUN_2_STAND", 4, 10.0, Some("S_RUN"));
        assert!(!track.is_looping());
        assert_eq!(track.chained_animation(), Some("S_RUN"));
        let key = track.sample(0.39, 0).unwrap();
        assert!((key.position.x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn matches_alias_case_insensitively() {
        let mut track = simple_track("S_WALKL", 2, 10.0, None);
        track.alias_name = Some("S_SNEAKL".into());
        assert!(track.matches_name("s_walkl"));
        assert!(track.matches_name("s_sneakl"));
        assert!(!track.matches_name("s_runl"));
        assert_eq!(track.display_name(), "S_SNEAKL");
    }
}
