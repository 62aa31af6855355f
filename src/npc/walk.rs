// src/npc/walk.rs

use bevy::log::{debug, warn};
use bevy::math::Vec3;

use super::context::{ActionContext, NpcCommand};
use crate::zen::helper_funcs::{flatten, look_rotation_xz, rotate_towards};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkState {
    #[default]
    Initial,
    WalkAndRotate,
    Done,
}

/// Shared locomotion of every walking action: the animation's root motion carries
/// the character forward while this steers it towards the destination.
#[derive(Debug, Clone, Default)]
pub struct WalkBehavior {
    state: WalkState,
    animation: Option<String>,
}

impl WalkBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn start(&mut self, ctx: &mut ActionContext) {
        let animation = ctx.state.walk_animation();
        if !ctx.play(&animation) {
            warn!("Walk animation '{}' is unavailable, the character will not move", animation);
        }
        debug!("{:?} walking with '{}'", ctx.npc, animation);
        self.animation = Some(animation);
        self.state = WalkState::WalkAndRotate;
    }

    /// Continues with the next leg of a route.
    pub fn resume(&mut self, ctx: &mut ActionContext) {
        let animation = ctx.state.walk_animation();
        if self.animation.as_deref() != Some(animation.as_str()) || !ctx.animation.is_playing(&animation)
        {
            self.start(ctx);
        } else {
            self.state = WalkState::WalkAndRotate;
        }
    }

    /// Steers towards `destination`. Returns true once it is within arrival distance.
    pub fn tick(&mut self, ctx: &mut ActionContext, destination: Vec3) -> bool {
        if self.state != WalkState::WalkAndRotate {
            return false;
        }
        let offset = flatten(destination - ctx.position());
        if offset.length() <= ctx.settings.arrival_distance {
            return true;
        }
        if let Some(target) = look_rotation_xz(offset) {
            let max_angle = ctx.settings.turn_speed_degrees.to_radians() * ctx.dt;
            ctx.transform.rotation = rotate_towards(ctx.transform.rotation, target, max_angle);
        }
        false
    }

    /// Ends the walk animation and hands collision back to the character.
    pub fn stop(&mut self, ctx: &mut ActionContext) {
        if let Some(animation) = self.animation.take() {
            ctx.stop(&animation);
        }
        ctx.emit(NpcCommand::SetPhysics(true));
        self.state = WalkState::Done;
    }
}
