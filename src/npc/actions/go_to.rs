// src/npc/actions/go_to.rs

use bevy::log::{debug, warn};

use crate::npc::action::AnimationAction;
use crate::npc::context::ActionContext;
use crate::npc::registry::NpcHandle;
use crate::npc::walk::WalkBehavior;
use crate::npc::waynet::WayNetPoint;
use crate::zen::error::AnimationError;

/// Walks the fastest way net route to a named way point.
#[derive(Debug, Clone)]
pub struct GoToWp {
    destination: String,
    /// Remaining hops, next one last.
    route: Vec<WayNetPoint>,
    walk: WalkBehavior,
    finished: bool,
}

impl GoToWp {
    pub fn new(destination: String) -> Self {
        Self {
            destination,
            route: Vec::new(),
            walk: WalkBehavior::new(),
            finished: false,
        }
    }

    pub fn remaining_hops(&self) -> usize {
        self.route.len()
    }

    fn plan(&self, ctx: &ActionContext) -> Result<Vec<WayNetPoint>, AnimationError> {
        let way_net = ctx.world.way_net();
        if way_net.get_way_net_point(&self.destination).is_none() {
            return Err(AnimationError::UnknownWayPoint(self.destination.clone()));
        }
        let start = way_net
            .find_nearest_way_point(ctx.position())
            .ok_or_else(|| AnimationError::UnknownWayPoint(self.destination.clone()))?;
        way_net
            .find_fastest_path(&start.name, &self.destination)
            .ok_or_else(|| AnimationError::UnknownWayPoint(self.destination.clone()))
    }

    fn on_destination_reached(&mut self, ctx: &mut ActionContext) {
        if let Some(hop) = self.route.pop() {
            debug!("{:?} reached '{}'", ctx.npc, hop.name);
        }
        if self.route.is_empty() {
            self.walk.stop(ctx);
            ctx.play_idle();
            self.finished = true;
        } else {
            self.walk.resume(ctx);
        }
    }
}

impl AnimationAction for GoToWp {
    fn name(&self) -> &'static str {
        "GoToWp"
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        match self.plan(ctx) {
            Ok(mut route) => {
                route.reverse();
                self.route = route;
                self.walk.start(ctx);
            }
            Err(e) => {
                warn!("{:?} cannot walk to '{}': {}", ctx.npc, self.destination, e);
                self.finished = true;
            }
        }
    }

    fn tick(&mut self, ctx: &mut ActionContext) {
        let Some(next) = self.route.last() else {
            self.on_destination_reached(ctx);
            return;
        };
        let position = next.position;
        if self.walk.tick(ctx, position) {
            self.on_destination_reached(ctx);
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Walks to the nearest free point matching a name fragment and claims it.
#[derive(Debug, Clone)]
pub struct GoToFp {
    prefix: String,
    target: Option<WayNetPoint>,
    walk: WalkBehavior,
    finished: bool,
}

impl GoToFp {
    pub fn new(prefix: String) -> Self {
        Self {
            prefix,
            target: None,
            walk: WalkBehavior::new(),
            finished: false,
        }
    }
}

impl AnimationAction for GoToFp {
    fn name(&self) -> &'static str {
        "GoToFp"
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        let Some(point) = ctx
            .world
            .way_net()
            .find_nearest_free_point(ctx.position(), &self.prefix, ctx.npc)
            .cloned()
        else {
            debug!("{:?} found no free point '{}'", ctx.npc, self.prefix);
            self.finished = true;
            return;
        };

        if let Some(previous) = ctx.state.current_free_point.take() {
            if !previous.eq_ignore_ascii_case(&point.name) {
                ctx.world.way_net_mut().release_free_point(&previous, ctx.npc);
            }
        }
        self.target = Some(point);
        self.walk.start(ctx);
    }

    fn tick(&mut self, ctx: &mut ActionContext) {
        let Some(point) = &self.target else {
            self.finished = true;
            return;
        };
        if !self.walk.tick(ctx, point.position) {
            return;
        }
        let name = point.name.clone();
        if ctx.world.way_net_mut().lock_free_point(&name, ctx.npc) {
            ctx.state.current_free_point = Some(name);
        } else {
            debug!("{:?} arrived at '{}' but it was taken", ctx.npc, name);
        }
        self.walk.stop(ctx);
        ctx.play_idle();
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Follows another character until it is within arrival distance.
#[derive(Debug, Clone)]
pub struct GoToNpc {
    target: NpcHandle,
    walk: WalkBehavior,
    finished: bool,
}

impl GoToNpc {
    pub fn new(target: NpcHandle) -> Self {
        Self {
            target,
            walk: WalkBehavior::new(),
            finished: false,
        }
    }
}

impl AnimationAction for GoToNpc {
    fn name(&self) -> &'static str {
        "GoToNpc"
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        if ctx.world.npc_transform(self.target).is_none() {
            warn!("{}", AnimationError::UnknownNpc(self.target));
            self.finished = true;
            return;
        }
        self.walk.start(ctx);
    }

    fn tick(&mut self, ctx: &mut ActionContext) {
        let Some(target) = ctx.world.npc_transform(self.target) else {
            debug!("{:?} lost its walk target {:?}", ctx.npc, self.target);
            self.walk.stop(ctx);
            ctx.play_idle();
            self.finished = true;
            return;
        };
        if self.walk.tick(ctx, target.translation) {
            self.walk.stop(ctx);
            ctx.play_idle();
            self.finished = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::npc::actions::test_support::Harness;
    use crate::npc::context::{NpcCommand, ZenWorld};
    use crate::npc::waynet::{WayNet, WayNetGraph};
    use bevy::ecs::entity::Entity;
    use bevy::math::Vec3;
    use bevy::prelude::Transform;

    fn world() -> ZenWorld {
        let mut net = WayNetGraph::new()
            .with_way_point("WP_START", Vec3::ZERO)
            .with_way_point("WP_GATE", Vec3::new(0.0, 0.0, -4.0))
            .with_way_point("WP_YARD", Vec3::new(-4.0, 0.0, -4.0))
            .with_free_point("FP_STAND_GATE", Vec3::new(0.0, 0.0, -3.0), Vec3::X);
        net.connect("WP_START", "WP_GATE").unwrap();
        net.connect("WP_GATE", "WP_YARD").unwrap();
        ZenWorld::new(net)
    }

    #[test]
    fn walks_every_hop_of_the_route() {
        let mut h = Harness::new(world());
        let mut action = GoToWp::new("WP_YARD".into());
        h.start(&mut action);
        assert_eq!(action.remaining_hops(), 3);
        assert!(h.animation.is_playing("S_RUNL"));

        assert!(h.run(&mut action, 600).is_some());
        assert!(h.transform.translation.distance(Vec3::new(-4.0, 0.0, -4.0)) < 0.5);
        assert!(h.commands.contains(&NpcCommand::SetPhysics(true)));
        assert!(!h.animation.is_playing("S_RUNL"));
        assert!(h.animation.is_playing("S_RUN"));
    }

    #[test]
    fn unknown_way_point_finishes_at_once() {
        let mut h = Harness::new(world());
        let mut action = GoToWp::new("WP_NOWHERE".into());
        h.start(&mut action);
        assert!(action.is_finished());
        assert!(h.animation.instances().is_empty());
    }

    #[test]
    fn claims_the_free_point_on_arrival() {
        let mut h = Harness::new(world());
        let mut action = GoToFp::new("STAND".into());
        h.start(&mut action);
        assert!(h.run(&mut action, 300).is_some());
        assert_eq!(h.state.current_free_point.as_deref(), Some("FP_STAND_GATE"));
        assert_eq!(h.world.way_net.free_point_owner("FP_STAND_GATE"), Some(h.npc));

        let other = h.registry.register(Entity::from_raw(2));
        assert!(
            h.world
                .way_net
                .find_nearest_free_point(Vec3::ZERO, "STAND", other)
                .is_none()
        );
    }

    #[test]
    fn follows_another_character() {
        let mut h = Harness::new(world());
        let friend = h.registry.register(Entity::from_raw(2));
        h.world
            .set_npc_transform(friend, Transform::from_xyz(3.0, 0.0, 0.0));
        let mut action = GoToNpc::new(friend);
        h.start(&mut action);
        assert!(h.run(&mut action, 300).is_some());
        assert!(h.transform.translation.distance(Vec3::new(3.0, 0.0, 0.0)) <= 0.5);
    }
}
