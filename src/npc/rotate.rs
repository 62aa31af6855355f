// src/npc/rotate.rs

use std::f32::consts::FRAC_PI_2;

use bevy::log::{debug, warn};
use bevy::math::{Quat, Vec3};

use super::context::ActionContext;
use crate::zen::helper_funcs::rotate_towards;

/// Shared turning of the rotate actions: plays a turn animation on the body while
/// the transform rotates at a fixed speed, with the head leading into the turn.
#[derive(Debug, Clone)]
pub struct RotateBehavior {
    target: Quat,
    turn_animation: Option<String>,
    turning_left: bool,
    finished: bool,
}

impl RotateBehavior {
    pub fn new(target: Quat) -> Self {
        Self {
            target,
            turn_animation: None,
            turning_left: false,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn turning_left(&self) -> bool {
        self.turning_left
    }

    pub fn start(&mut self, ctx: &mut ActionContext) {
        let tolerance = ctx.settings.rotation_tolerance_degrees.to_radians();
        if ctx.transform.rotation.angle_between(self.target) < tolerance {
            ctx.transform.rotation = self.target;
            self.finished = true;
            return;
        }

        let forward = ctx.transform.rotation * Vec3::NEG_Z;
        let target_forward = self.target * Vec3::NEG_Z;
        self.turning_left = forward.cross(target_forward).y > 0.0;

        let animation = ctx.state.turn_animation(self.turning_left);
        let head = ctx.manager.settings().head_bone_name.clone();
        if ctx
            .animation
            .play_animation_excluding(ctx.manager, &animation, &[head.as_str()])
        {
            self.turn_animation = Some(animation);
        } else {
            warn!("Turn animation '{}' is unavailable, rotating without it", animation);
        }
        debug!(
            "{:?} turning {} by {:.1} degrees",
            ctx.npc,
            if self.turning_left { "left" } else { "right" },
            ctx.transform.rotation.angle_between(self.target).to_degrees()
        );
    }

    pub fn tick(&mut self, ctx: &mut ActionContext) {
        if self.finished {
            return;
        }
        let step = ctx.settings.turn_speed_degrees.to_radians() * ctx.dt;
        ctx.transform.rotation = rotate_towards(ctx.transform.rotation, self.target, step);

        let remaining = ctx.transform.rotation.angle_between(self.target);
        if remaining < ctx.settings.rotation_tolerance_degrees.to_radians() {
            self.finish(ctx);
            return;
        }

        let side = if self.turning_left { 1.0 } else { -1.0 };
        let head = ctx.settings.head_look_degrees.to_radians() * (remaining / FRAC_PI_2).min(1.0);
        ctx.animation
            .set_head_look(Some(Quat::from_rotation_y(side * head)));
    }

    fn finish(&mut self, ctx: &mut ActionContext) {
        ctx.transform.rotation = self.target;
        if let Some(animation) = self.turn_animation.take() {
            ctx.stop(&animation);
        }
        ctx.animation.set_head_look(None);
        ctx.play_idle();
        self.finished = true;
    }
}
