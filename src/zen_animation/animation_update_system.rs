// src/zen_animation/animation_update_system.rs

use bevy::prelude::*;

use super::events::NpcAnimationEvent;
use super::manager::AnimationManager;
use super::system::AnimationSystem;

/// Advances every character's blending engine and applies its root motion.
pub fn tick_animation_systems(
    time: Res<Time>,
    mut manager: ResMut<AnimationManager>,
    mut characters: Query<(&mut AnimationSystem, &mut Transform)>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    for (mut system, mut transform) in &mut characters {
        system.tick(&mut manager, dt, &mut transform);
    }
}

/// Writes the resolved pose into the bound bone entities.
pub fn apply_bone_poses(
    characters: Query<&AnimationSystem>,
    mut bones: Query<&mut Transform, Without<AnimationSystem>>,
) {
    for system in &characters {
        for (bone, pose) in system.skeleton().bones.iter().zip(system.pose()) {
            let Some(entity) = bone.entity else {
                continue;
            };
            if let Ok(mut transform) = bones.get_mut(entity) {
                transform.translation = pose.position;
                transform.rotation = pose.rotation;
            }
        }
    }
}

/// Forwards the events queued during the tick.
pub fn dispatch_animation_events(
    mut characters: Query<(Entity, &mut AnimationSystem)>,
    mut writer: EventWriter<NpcAnimationEvent>,
) {
    for (entity, mut system) in &mut characters {
        if system.pending_events().is_empty() {
            continue;
        }
        for event in system.drain_events() {
            trace!("{:?} fired {:?}", entity, event);
            writer.write(NpcAnimationEvent { entity, event });
        }
    }
}
