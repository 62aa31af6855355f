// src/zen_animation/events.rs

use bevy::ecs::entity::Entity;
use bevy::math::{Quat, Vec3};
use bevy::prelude::Event;

/// Resolved local pose of a slot bone at the time an item event fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotAttachment {
    pub bone_index: usize,
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FiredEventKind {
    Sound {
        name: String,
        range: f32,
        empty_slot: bool,
    },
    CreateItem {
        item: String,
        slot: String,
        attach: Option<SlotAttachment>,
    },
    InsertItem {
        slot: String,
        attach: Option<SlotAttachment>,
    },
    RemoveItem {
        slot: String,
    },
    DestroyItem {
        slot: String,
    },
    ExchangeItem {
        item: String,
        slot: String,
        attach: Option<SlotAttachment>,
    },
    Morph {
        animation: String,
        node: String,
    },
    Tag {
        name: String,
    },
    /// A play-once animation reached its last frame, or an instance stopped.
    AnimationEnded,
}

/// One side effect produced by an `AnimationSystem` tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredAnimationEvent {
    /// Name the animation was requested by.
    pub animation: String,
    pub kind: FiredEventKind,
}

impl FiredAnimationEvent {
    pub fn ended(animation: &str) -> Self {
        Self {
            animation: animation.to_string(),
            kind: FiredEventKind::AnimationEnded,
        }
    }

    pub fn is_animation_end(&self) -> bool {
        matches!(self.kind, FiredEventKind::AnimationEnded)
    }
}

/// ECS-side copy of a fired event, addressed to the character that produced it.
#[derive(Event, Debug, Clone)]
pub struct NpcAnimationEvent {
    pub entity: Entity,
    pub event: FiredAnimationEvent,
}
