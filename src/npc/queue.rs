// src/npc/queue.rs

use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;

use super::action::{AiCommand, AnimationAction};
use super::context::{ActionContext, ActionSettings, NpcCommand, NpcState, ZenWorld};
use super::registry::{Npc, NpcHandle, NpcRegistry};
use crate::zen_animation::events::NpcAnimationEvent;
use crate::zen_animation::manager::AnimationManager;
use crate::zen_animation::system::AnimationSystem;

/// Per character FIFO of behavior requests. Only the front one runs.
#[derive(Component, Default)]
pub struct NpcActionQueue {
    pending: VecDeque<AiCommand>,
    current: Option<Box<dyn AnimationAction>>,
}

impl NpcActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(commands: impl IntoIterator<Item = AiCommand>) -> Self {
        Self {
            pending: commands.into_iter().collect(),
            current: None,
        }
    }

    pub fn push(&mut self, command: AiCommand) {
        self.pending.push_back(command);
    }

    /// Drops everything queued. The running action is abandoned as is.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
    }

    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn current_action(&self) -> Option<&'static str> {
        self.current.as_ref().map(|a| a.name())
    }

    /// Delivers ended animations, ticks the running action and starts the next ones.
    pub fn drive(&mut self, ctx: &mut ActionContext, ended: &[String]) {
        if let Some(action) = self.current.as_mut() {
            for animation in ended {
                action.on_animation_end(ctx, animation);
            }
            if !action.is_finished() {
                action.tick(ctx);
            }
            if action.is_finished() {
                debug!("{:?} finished {}", ctx.npc, action.name());
                self.current = None;
            }
        }

        let mut started = 0;
        while self.current.is_none() && started < ctx.settings.max_instant_actions_per_tick {
            let Some(command) = self.pending.pop_front() else {
                break;
            };
            let mut action = command.into_action();
            debug!("{:?} starts {}", ctx.npc, action.name());
            action.start(ctx);
            started += 1;
            if !action.is_finished() {
                self.current = Some(action);
            }
        }
    }
}

/// Side effect requested by a character's action.
#[derive(Event, Debug, Clone)]
pub struct NpcCommandEvent {
    pub entity: Entity,
    pub npc: NpcHandle,
    pub command: NpcCommand,
}

/// Gives every new character a registry handle.
pub fn register_npcs(
    mut commands: Commands,
    mut registry: ResMut<NpcRegistry>,
    new_npcs: Query<Entity, (With<NpcActionQueue>, Without<Npc>)>,
) {
    for entity in &new_npcs {
        let handle = registry.register(entity);
        debug!("Registered {:?} as {:?}", entity, handle);
        commands.entity(entity).insert(Npc { handle });
    }
}

pub fn unregister_removed_npcs(
    mut removed: RemovedComponents<Npc>,
    mut registry: ResMut<NpcRegistry>,
    mut world: ResMut<ZenWorld>,
) {
    for entity in removed.read() {
        if let Some(handle) = registry.unregister_entity(entity) {
            world.remove_npc(handle);
        }
    }
}

pub fn refresh_world_npc_positions(
    npcs: Query<(&Npc, &Transform), Changed<Transform>>,
    mut world: ResMut<ZenWorld>,
) {
    for (npc, transform) in &npcs {
        world.set_npc_transform(npc.handle, *transform);
    }
}

pub fn drive_npc_actions(
    time: Res<Time>,
    settings: Res<ActionSettings>,
    mut manager: ResMut<AnimationManager>,
    mut world: ResMut<ZenWorld>,
    mut animation_events: EventReader<NpcAnimationEvent>,
    mut npcs: Query<(
        Entity,
        &Npc,
        &mut Transform,
        &mut AnimationSystem,
        &mut NpcState,
        &mut NpcActionQueue,
    )>,
    mut writer: EventWriter<NpcCommandEvent>,
) {
    let mut ended: HashMap<Entity, Vec<String>> = HashMap::new();
    for event in animation_events.read() {
        if event.event.is_animation_end() {
            ended
                .entry(event.entity)
                .or_default()
                .push(event.event.animation.clone());
        }
    }

    let dt = time.delta_secs();
    let mut out = Vec::new();
    for (entity, npc, mut transform, mut animation, mut state, mut queue) in &mut npcs {
        let ended = ended.remove(&entity).unwrap_or_default();
        if queue.is_empty() && ended.is_empty() {
            continue;
        }
        let mut ctx = ActionContext {
            npc: npc.handle,
            dt,
            transform: &mut *transform,
            animation: &mut *animation,
            manager: &mut *manager,
            state: &mut *state,
            world: &mut *world,
            settings: &*settings,
            commands: &mut out,
        };
        queue.drive(&mut ctx, &ended);
        world.set_npc_transform(npc.handle, *transform);

        for command in out.drain(..) {
            writer.write(NpcCommandEvent {
                entity,
                npc: npc.handle,
                command,
            });
        }
    }
}
