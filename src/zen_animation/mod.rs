// src/zen_animation/mod.rs

pub mod animation_update_system;
pub mod events;
pub mod instance;
pub mod manager;
pub mod settings;
pub mod system;
pub mod track;

pub use events::{FiredAnimationEvent, FiredEventKind, NpcAnimationEvent, SlotAttachment};
pub use instance::{AnimationState, AnimationTrackInstance, BoneBlend, InstanceUpdate};
pub use manager::AnimationManager;
pub use settings::AnimationSettings;
pub use system::{AnimationSystem, BASE_LAYER, BonePose, ResolvedBone};
pub use track::{AnimationTrack, KeyFrame};
