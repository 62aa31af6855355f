use std::sync::Arc;

use bevy::prelude::*;
pub mod npc;
pub mod zen;
pub mod zen_animation;
use npc::context::{ActionSettings, ZenWorld};
use npc::queue::{
    NpcCommandEvent, drive_npc_actions, refresh_world_npc_positions, register_npcs,
    unregister_removed_npcs,
};
use npc::registry::NpcRegistry;
use zen::resources::ResourceProvider;
use zen_animation::animation_update_system::{
    apply_bone_poses, dispatch_animation_events, tick_animation_systems,
};
use zen_animation::{AnimationManager, AnimationSettings, NpcAnimationEvent};

/// Animation blending, root motion and behavior actions for ZenGin characters.
///
/// `AnimationSettings` and `ActionSettings` inserted before the plugin are kept.
pub struct ZenAnimationPlugin {
    resources: Arc<dyn ResourceProvider>,
}

impl ZenAnimationPlugin {
    pub fn new(resources: Arc<dyn ResourceProvider>) -> Self {
        Self { resources }
    }
}

impl Plugin for ZenAnimationPlugin {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<AnimationSettings>()
            .cloned()
            .unwrap_or_default();
        info!(
            "Animation movement threshold {}, root bone '{}'",
            settings.movement_threshold, settings.root_bone_name
        );
        app.insert_resource(AnimationManager::new(
            self.resources.clone(),
            settings.clone(),
        ))
        .insert_resource(settings)
        .init_resource::<ActionSettings>()
        .init_resource::<NpcRegistry>()
        .init_resource::<ZenWorld>()
        .add_event::<NpcAnimationEvent>()
        .add_event::<NpcCommandEvent>()
        .add_systems(
            Update,
            (
                register_npcs,
                tick_animation_systems,
                apply_bone_poses,
                dispatch_animation_events,
                refresh_world_npc_positions,
                drive_npc_actions,
                unregister_removed_npcs,
            )
                .chain(),
        );
    }
}
