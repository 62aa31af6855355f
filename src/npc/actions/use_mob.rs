// src/npc/actions/use_mob.rs

use bevy::log::{debug, warn};

use crate::npc::action::AnimationAction;
use crate::npc::context::{ActionContext, MobTarget, MobUsage, NpcCommand};
use crate::npc::walk::WalkBehavior;

/// Standing in front of the mob.
const STAND: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Walking,
    Transitioning,
    Done,
}

/// Walks to a mob of a scheme, takes a free slot and steps through the scheme's
/// state transitions until `target_state` is reached. A negative target leaves the
/// mob the same way back.
#[derive(Debug, Clone)]
pub struct UseMob {
    scheme: String,
    target_state: i32,
    phase: Phase,
    walk: WalkBehavior,
    slot: Option<MobTarget>,
    /// Transition clip currently playing and the state it leads to.
    pending: Option<(String, i32)>,
}

impl UseMob {
    pub fn new(scheme: String, target_state: i32) -> Self {
        Self {
            scheme: scheme.to_uppercase(),
            target_state: target_state.max(STAND),
            phase: Phase::Walking,
            walk: WalkBehavior::new(),
            slot: None,
            pending: None,
        }
    }

    fn transition_name(&self, from: i32, to: i32) -> String {
        match (from, to) {
            (STAND, _) => format!("T_{}_STAND_2_S0", self.scheme),
            (_, STAND) => format!("T_{}_S0_2_STAND", self.scheme),
            _ => format!("T_{}_S{}_2_S{}", self.scheme, from, to),
        }
    }

    /// Plays the next transition towards the target, skipping missing clips.
    fn advance(&mut self, ctx: &mut ActionContext) {
        loop {
            let Some(current) = ctx.state.current_mob.as_ref().map(|m| m.state) else {
                self.phase = Phase::Done;
                return;
            };
            if current == self.target_state {
                self.arrive(ctx);
                return;
            }
            let next = if self.target_state > current {
                current + 1
            } else {
                current - 1
            };
            let animation = self.transition_name(current, next);
            if ctx.play(&animation) {
                debug!("{:?} mob transition '{}'", ctx.npc, animation);
                self.pending = Some((animation, next));
                return;
            }
            warn!("Mob transition '{}' is missing, skipping it", animation);
            if let Some(usage) = ctx.state.current_mob.as_mut() {
                usage.state = next;
            }
        }
    }

    fn arrive(&mut self, ctx: &mut ActionContext) {
        if self.target_state == STAND {
            if let Some(usage) = ctx.state.current_mob.take() {
                ctx.world.release_mob_slot(&usage.mob, ctx.npc);
            }
            ctx.emit(NpcCommand::SetPhysics(true));
            ctx.play_idle();
        } else {
            let state = format!("S_{}_S{}", self.scheme, self.target_state);
            if !ctx.play(&state) {
                warn!("Mob state animation '{}' is missing", state);
            }
        }
        self.phase = Phase::Done;
    }

    /// Pins the character to its slot while the walk animation fades out.
    fn snap_to_slot(&self, ctx: &mut ActionContext) {
        if let Some(slot) = &self.slot {
            ctx.transform.translation = slot.position;
            ctx.transform.rotation = slot.rotation;
        }
    }

    fn begin_transitions(&mut self, ctx: &mut ActionContext) {
        self.phase = Phase::Transitioning;
        self.advance(ctx);
    }
}

impl AnimationAction for UseMob {
    fn name(&self) -> &'static str {
        "UseMob"
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        let in_use = ctx
            .state
            .current_mob
            .as_ref()
            .is_some_and(|m| m.scheme.eq_ignore_ascii_case(&self.scheme));
        if in_use {
            self.begin_transitions(ctx);
            return;
        }
        if self.target_state == STAND {
            debug!("{:?} is not using a '{}' mob", ctx.npc, self.scheme);
            self.phase = Phase::Done;
            return;
        }

        let Some(target) = ctx
            .world
            .find_mob(ctx.position(), &self.scheme, ctx.npc)
        else {
            warn!("{:?} found no free '{}' mob", ctx.npc, self.scheme);
            self.phase = Phase::Done;
            return;
        };
        if !ctx.world.occupy_mob_slot(&target.mob, target.slot, ctx.npc) {
            self.phase = Phase::Done;
            return;
        }
        ctx.state.current_mob = Some(MobUsage {
            mob: target.mob.clone(),
            scheme: self.scheme.clone(),
            slot: target.slot,
            state: STAND,
        });
        self.slot = Some(target);
        self.walk.start(ctx);
    }

    fn tick(&mut self, ctx: &mut ActionContext) {
        if self.phase != Phase::Walking {
            return;
        }
        let Some(slot) = &self.slot else {
            self.phase = Phase::Done;
            return;
        };
        if !self.walk.tick(ctx, slot.position) {
            return;
        }
        self.snap_to_slot(ctx);
        self.walk.stop(ctx);
        ctx.emit(NpcCommand::SetPhysics(false));
        self.begin_transitions(ctx);
    }

    fn on_animation_end(&mut self, ctx: &mut ActionContext, animation: &str) {
        let Some((pending, next)) = &self.pending else {
            return;
        };
        if !pending.eq_ignore_ascii_case(animation) {
            return;
        }
        let next = *next;
        self.pending = None;
        self.snap_to_slot(ctx);
        if let Some(usage) = ctx.state.current_mob.as_mut() {
            usage.state = next;
        }
        self.advance(ctx);
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::actions::test_support::Harness;
    use crate::npc::context::{Mob, MobSlot, NpcWorld, ZenWorld};
    use bevy::math::{Quat, Vec3};

    fn world() -> ZenWorld {
        ZenWorld::default().with_mob(Mob {
            name: "BENCH_01".into(),
            scheme: "BENCH".into(),
            slots: vec![MobSlot {
                name: "ZS_POS0".into(),
                position: Vec3::new(0.0, 0.0, -2.0),
                rotation: Quat::from_rotation_y(std::f32::consts::PI),
                occupant: None,
            }],
        })
    }

    #[test]
    fn sits_down_step_by_step_and_stands_up_again() {
        let mut h = Harness::new(world());
        let mut sit = UseMob::new("bench".into(), 1);
        h.start(&mut sit);
        assert!(h.run(&mut sit, 300).is_some());

        assert!(h.commands.contains(&NpcCommand::SetPhysics(false)));
        assert_eq!(h.state.current_mob.as_ref().map(|m| m.state), Some(1));
        assert!(h.animation.is_playing("S_BENCH_S1"));
        assert_eq!(h.transform.translation, Vec3::new(0.0, 0.0, -2.0));
        let other = h.registry.register(bevy::ecs::entity::Entity::from_raw(2));
        assert!(h.world.find_mob(Vec3::ZERO, "BENCH", other).is_none());

        h.commands.clear();
        let mut stand = UseMob::new("BENCH".into(), -1);
        h.start(&mut stand);
        assert!(h.run(&mut stand, 300).is_some());
        assert!(h.state.current_mob.is_none());
        assert_eq!(h.commands.last(), Some(&NpcCommand::SetPhysics(true)));
        assert!(h.animation.is_playing("S_RUN"));
        assert!(h.world.find_mob(Vec3::ZERO, "BENCH", other).is_some());
    }

    #[test]
    fn missing_mob_finishes_immediately() {
        let mut h = Harness::new(ZenWorld::default());
        let mut action = UseMob::new("CHAIR".into(), 0);
        h.start(&mut action);
        assert!(action.is_finished());
        assert!(h.commands.is_empty());
        assert!(h.state.current_mob.is_none());
    }
}
