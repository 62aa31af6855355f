// src/npc/actions/rotate_actions.rs

use bevy::log::warn;
use bevy::math::Quat;

use crate::npc::action::AnimationAction;
use crate::npc::context::ActionContext;
use crate::npc::registry::NpcHandle;
use crate::npc::rotate::RotateBehavior;
use crate::zen::error::AnimationError;
use crate::zen::helper_funcs::look_rotation_xz;

/// What a turning action faces.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnTarget {
    /// The facing of the free point the character holds.
    AlignToFp,
    LookAt(String),
    LookAtNpc(NpcHandle),
    TurnToNpc(NpcHandle),
}

impl TurnTarget {
    fn resolve(&self, ctx: &ActionContext) -> Result<Option<Quat>, AnimationError> {
        let position = ctx.position();
        let face = |target: bevy::math::Vec3| look_rotation_xz(target - position);
        match self {
            TurnTarget::AlignToFp => {
                let Some(name) = ctx.state.current_free_point.as_deref() else {
                    return Ok(None);
                };
                let point = ctx
                    .world
                    .way_net()
                    .get_way_net_point(name)
                    .ok_or_else(|| AnimationError::UnknownWayPoint(name.to_string()))?;
                Ok(point.rotation())
            }
            TurnTarget::LookAt(name) => {
                let point = ctx
                    .world
                    .way_net()
                    .get_way_net_point(name)
                    .ok_or_else(|| AnimationError::UnknownWayPoint(name.clone()))?;
                Ok(face(point.position))
            }
            TurnTarget::LookAtNpc(npc) | TurnTarget::TurnToNpc(npc) => {
                let target = ctx
                    .world
                    .npc_transform(*npc)
                    .ok_or(AnimationError::UnknownNpc(*npc))?;
                Ok(face(target.translation))
            }
        }
    }
}

/// `AlignToFp`, `LookAt`, `LookAtNpc` and `TurnToNpc`: rotate the body in place.
#[derive(Debug, Clone)]
pub struct TurnAction {
    target: TurnTarget,
    rotate: Option<RotateBehavior>,
    finished: bool,
}

impl TurnAction {
    pub fn new(target: TurnTarget) -> Self {
        Self {
            target,
            rotate: None,
            finished: false,
        }
    }
}

impl AnimationAction for TurnAction {
    fn name(&self) -> &'static str {
        match self.target {
            TurnTarget::AlignToFp => "AlignToFp",
            TurnTarget::LookAt(_) => "LookAt",
            TurnTarget::LookAtNpc(_) => "LookAtNpc",
            TurnTarget::TurnToNpc(_) => "TurnToNpc",
        }
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        let target = match self.target.resolve(ctx) {
            Ok(Some(target)) => target,
            Ok(None) => {
                self.finished = true;
                return;
            }
            Err(e) => {
                warn!("{:?} {} failed: {}", ctx.npc, self.name(), e);
                self.finished = true;
                return;
            }
        };
        let mut rotate = RotateBehavior::new(target);
        rotate.start(ctx);
        self.finished = rotate.is_finished();
        self.rotate = Some(rotate);
    }

    fn tick(&mut self, ctx: &mut ActionContext) {
        match &mut self.rotate {
            Some(rotate) => {
                rotate.tick(ctx);
                self.finished = rotate.is_finished();
            }
            None => self.finished = true,
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::actions::test_support::{DT, Harness};
    use crate::npc::context::ZenWorld;
    use crate::zen::sample_model::{HEAD, LEFT_LEG};
    use crate::zen_animation::AnimationState;
    use crate::npc::waynet::WayNetGraph;
    use bevy::ecs::entity::Entity;
    use bevy::math::Vec3;
    use bevy::prelude::Transform;

    fn world() -> ZenWorld {
        ZenWorld::new(
            WayNetGraph::new()
                .with_way_point("WP_WEST", Vec3::new(-5.0, 0.0, 0.0))
                .with_free_point("FP_SIT", Vec3::ZERO, Vec3::Z),
        )
    }

    #[test]
    fn turns_left_towards_a_way_point() {
        let mut h = Harness::new(world());
        let mut action = TurnAction::new(TurnTarget::LookAt("WP_WEST".into()));
        h.start(&mut action);
        assert!(h.animation.is_playing("T_RUNTURNL"));
        let turn = h.animation.instance("T_RUNTURNL").unwrap();
        assert_eq!(
            turn.bone_state_by_name("BIP01 HEAD"),
            Some(crate::zen_animation::AnimationState::Stop)
        );

        h.step(&mut action);
        assert!(h.animation.head_look().is_some());

        // 90 degrees at 270 degrees per second
        let steps = h.run(&mut action, 60).unwrap();
        assert!((9..=11).contains(&steps), "took {} steps", steps);
        let forward = h.transform.rotation * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_X).length() < 1e-3);
        assert!(h.animation.head_look().is_none());
        assert!(!h.animation.is_playing("T_RUNTURNL"));
        assert!(h.animation.is_playing("S_RUN"));
    }

    #[test]
    fn turns_right_towards_another_character() {
        let mut h = Harness::new(world());
        let other = h.registry.register(Entity::from_raw(2));
        h.world
            .set_npc_transform(other, Transform::from_xyz(4.0, 0.0, 0.0));
        let mut action = TurnAction::new(TurnTarget::TurnToNpc(other));
        h.start(&mut action);
        assert!(h.animation.is_playing("T_RUNTURNR"));
        assert!(h.run(&mut action, 60).is_some());
        let forward = h.transform.rotation * Vec3::NEG_Z;
        assert!((forward - Vec3::X).length() < 1e-3);
    }

    #[test]
    fn already_aligned_finishes_without_turning() {
        let mut h = Harness::new(world());
        h.state.current_free_point = Some("FP_SIT".into());
        h.transform = Transform::from_rotation(look_rotation_xz(Vec3::Z).unwrap());
        let mut action = TurnAction::new(TurnTarget::AlignToFp);
        h.start(&mut action);
        assert!(action.is_finished());
        assert!(h.animation.instances().is_empty());
    }

    #[test]
    fn unknown_npc_finishes_immediately() {
        let mut h = Harness::new(world());
        let ghost = h.registry.register(Entity::from_raw(9));
        let mut action = TurnAction::new(TurnTarget::LookAtNpc(ghost));
        h.start(&mut action);
        assert!(action.is_finished());
    }

    #[test]
    fn idle_keeps_the_head_while_the_body_turns() {
        let mut h = Harness::new(world());
        h.animation.play_idle_animation(&mut h.manager);
        for _ in 0..5 {
            h.animation.tick(&mut h.manager, DT, &mut h.transform);
        }
        let mut action = TurnAction::new(TurnTarget::LookAt("WP_WEST".into()));
        h.start(&mut action);
        for _ in 0..5 {
            h.step(&mut action);
        }
        assert!(!action.is_finished());
        let idle = h.animation.instance("S_RUN").unwrap();
        assert_eq!(idle.bone_weight_by_name(HEAD), Some(1.0));
        assert_eq!(idle.bone_state_by_name(LEFT_LEG), Some(AnimationState::Stop));
        let head = h.animation.skeleton().bone_index(HEAD).unwrap();
        assert!(h.animation.resolve_bone(head).fallback_weight < 1e-3);

        assert!(h.run(&mut action, 60).is_some());
        let idle = h.animation.instance("S_RUN").unwrap();
        assert!(idle.state().is_active());
        assert_eq!(idle.bone_state_by_name(LEFT_LEG), Some(AnimationState::BlendIn));
    }
}
