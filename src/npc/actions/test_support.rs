// src/npc/actions/test_support.rs

use std::sync::Arc;

use bevy::ecs::entity::Entity;
use bevy::prelude::Transform;

use crate::npc::action::AnimationAction;
use crate::npc::context::{ActionContext, ActionSettings, NpcCommand, NpcState, ZenWorld};
use crate::npc::registry::{NpcHandle, NpcRegistry};
use crate::zen::sample_model::{HUMANS, human_hierarchy, human_resources};
use crate::zen::skeleton::Skeleton;
use crate::zen_animation::manager::AnimationManager;
use crate::zen_animation::settings::AnimationSettings;
use crate::zen_animation::system::AnimationSystem;

pub(crate) const DT: f32 = 1.0 / 30.0;

/// One character plus the world, stepped like the frame loop does.
pub(crate) struct Harness {
    pub npc: NpcHandle,
    pub registry: NpcRegistry,
    pub manager: AnimationManager,
    pub animation: AnimationSystem,
    pub transform: Transform,
    pub state: NpcState,
    pub world: ZenWorld,
    pub settings: ActionSettings,
    pub commands: Vec<NpcCommand>,
}

impl Harness {
    pub fn new(world: ZenWorld) -> Self {
        let mut registry = NpcRegistry::new();
        let npc = registry.register(Entity::from_raw(1));
        let skeleton = Skeleton::from_hierarchy(&human_hierarchy());
        Self {
            npc,
            registry,
            manager: AnimationManager::new(Arc::new(human_resources()), AnimationSettings::default()),
            animation: AnimationSystem::new(skeleton, HUMANS, "S_RUN"),
            transform: Transform::default(),
            state: NpcState::default(),
            world,
            settings: ActionSettings::default(),
            commands: Vec::new(),
        }
    }

    pub fn ctx(&mut self, dt: f32) -> ActionContext<'_> {
        ActionContext {
            npc: self.npc,
            dt,
            transform: &mut self.transform,
            animation: &mut self.animation,
            manager: &mut self.manager,
            state: &mut self.state,
            world: &mut self.world,
            settings: &self.settings,
            commands: &mut self.commands,
        }
    }

    pub fn start(&mut self, action: &mut dyn AnimationAction) {
        let mut ctx = self.ctx(0.0);
        action.start(&mut ctx);
    }

    pub fn step(&mut self, action: &mut dyn AnimationAction) {
        self.animation
            .tick(&mut self.manager, DT, &mut self.transform);
        let ended: Vec<String> = self
            .animation
            .drain_events()
            .into_iter()
            .filter(|e| e.is_animation_end())
            .map(|e| e.animation)
            .collect();
        self.world.set_npc_transform(self.npc, self.transform);

        let mut ctx = self.ctx(DT);
        for animation in &ended {
            action.on_animation_end(&mut ctx, animation);
        }
        if !action.is_finished() {
            action.tick(&mut ctx);
        }
    }

    /// Steps until the action finishes. Returns the number of steps taken.
    pub fn run(&mut self, action: &mut dyn AnimationAction, max_steps: usize) -> Option<usize> {
        for step in 0..max_steps {
            if action.is_finished() {
                return Some(step);
            }
            self.step(action);
        }
        action.is_finished().then_some(max_steps)
    }
}
