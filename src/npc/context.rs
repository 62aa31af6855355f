// src/npc/context.rs

use std::collections::HashMap;

use bevy::log::warn;
use bevy::math::{Quat, Vec3};
use bevy::prelude::{Component, Resource, Transform};
use serde::{Deserialize, Serialize};

use super::registry::NpcHandle;
use super::waynet::{WayNet, WayNetGraph};
use crate::zen_animation::manager::AnimationManager;
use crate::zen_animation::system::AnimationSystem;

/// Tunables of the behavior actions.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    pub turn_speed_degrees: f32,
    /// Rotations closer than this count as done.
    pub rotation_tolerance_degrees: f32,
    /// Planar distance at which a walk target counts as reached.
    pub arrival_distance: f32,
    /// Maximum head turn while the body rotates.
    pub head_look_degrees: f32,
    /// Number of `T_DIALOGGESTURE_NN` clips to pick from.
    pub dialog_gesture_count: u32,
    /// Actions that finish on start are chained within one frame up to this count.
    pub max_instant_actions_per_tick: usize,
    pub voice_range: f32,
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            turn_speed_degrees: 270.0,
            rotation_tolerance_degrees: 1.0,
            arrival_distance: 0.3,
            head_look_degrees: 30.0,
            dialog_gesture_count: 21,
            max_instant_actions_per_tick: 16,
            voice_range: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WalkMode {
    Walk,
    #[default]
    Run,
    Sneak,
    Water,
    Swim,
    Dive,
}

impl WalkMode {
    fn is_aquatic(self) -> bool {
        matches!(self, WalkMode::Swim | WalkMode::Dive)
    }

    fn name(self) -> &'static str {
        match self {
            WalkMode::Walk => "WALK",
            WalkMode::Run => "RUN",
            WalkMode::Sneak => "SNEAK",
            WalkMode::Water => "WALKW",
            WalkMode::Swim => "SWIM",
            WalkMode::Dive => "DIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeaponMode {
    #[default]
    None,
    Fist,
    Dagger,
    OneHanded,
    TwoHanded,
    Bow,
    Crossbow,
    Magic,
}

impl WeaponMode {
    /// Infix used in animation names, e.g. `S_1HRUN`.
    pub fn prefix(self) -> &'static str {
        match self {
            WeaponMode::None => "",
            WeaponMode::Fist => "FIST",
            WeaponMode::Dagger | WeaponMode::OneHanded => "1H",
            WeaponMode::TwoHanded => "2H",
            WeaponMode::Bow => "BOW",
            WeaponMode::Crossbow => "CBOW",
            WeaponMode::Magic => "MAG",
        }
    }
}

/// Mob a character currently sits on, stands at, or is walking to.
#[derive(Debug, Clone, PartialEq)]
pub struct MobUsage {
    pub mob: String,
    pub scheme: String,
    pub slot: usize,
    /// -1 is standing in front of the mob.
    pub state: i32,
}

#[derive(Component, Debug, Clone, Default)]
pub struct NpcState {
    pub walk_mode: WalkMode,
    pub weapon_mode: WeaponMode,
    pub is_player: bool,
    pub voice: u32,
    pub body_state: u32,
    pub current_free_point: Option<String>,
    pub current_mob: Option<MobUsage>,
}

impl NpcState {
    fn stance(&self) -> String {
        if self.walk_mode.is_aquatic() || self.walk_mode == WalkMode::Water {
            self.walk_mode.name().to_string()
        } else {
            format!("{}{}", self.weapon_mode.prefix(), self.walk_mode.name())
        }
    }

    pub fn idle_animation(&self) -> String {
        format!("S_{}", self.stance())
    }

    pub fn walk_animation(&self) -> String {
        if self.walk_mode.is_aquatic() {
            format!("S_{}F", self.stance())
        } else {
            format!("S_{}L", self.stance())
        }
    }

    pub fn turn_animation(&self, left: bool) -> String {
        format!("T_{}TURN{}", self.stance(), if left { 'L' } else { 'R' })
    }
}

/// Side effects for collaborators outside the animation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum NpcCommand {
    PlayVoice {
        name: String,
        /// `None` plays non-positional (the player's own lines).
        range: Option<f32>,
    },
    StopVoice,
    StartMorph {
        animation: String,
    },
    StopMorph {
        animation: String,
    },
    SetPhysics(bool),
    StopProcessInfos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobSlot {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub occupant: Option<NpcHandle>,
}

/// Interactive object with a scheme such as `BENCH`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mob {
    pub name: String,
    pub scheme: String,
    pub slots: Vec<MobSlot>,
}

/// Free slot picked by `NpcWorld::find_mob`.
#[derive(Debug, Clone, PartialEq)]
pub struct MobTarget {
    pub mob: String,
    pub scheme: String,
    pub slot: usize,
    pub position: Vec3,
    pub rotation: Quat,
}

/// What actions may ask about the world around them.
pub trait NpcWorld {
    fn way_net(&self) -> &dyn WayNet;
    fn way_net_mut(&mut self) -> &mut dyn WayNet;
    fn npc_transform(&self, npc: NpcHandle) -> Option<Transform>;
    /// Nearest mob of `scheme` with a slot that is free or already held by `npc`.
    fn find_mob(&self, position: Vec3, scheme: &str, npc: NpcHandle) -> Option<MobTarget>;
    fn occupy_mob_slot(&mut self, mob: &str, slot: usize, npc: NpcHandle) -> bool;
    fn release_mob_slot(&mut self, mob: &str, npc: NpcHandle);
    /// Length of a sound or voice line in seconds.
    fn sound_duration(&self, name: &str) -> Option<f32>;
}

#[derive(Resource, Debug, Default)]
pub struct ZenWorld {
    pub way_net: WayNetGraph,
    pub mobs: Vec<Mob>,
    npc_transforms: HashMap<NpcHandle, Transform>,
    sound_durations: HashMap<String, f32>,
}

impl ZenWorld {
    pub fn new(way_net: WayNetGraph) -> Self {
        Self {
            way_net,
            ..Default::default()
        }
    }

    pub fn with_mob(mut self, mob: Mob) -> Self {
        self.mobs.push(mob);
        self
    }

    pub fn with_sound(mut self, name: &str, seconds: f32) -> Self {
        self.set_sound_duration(name, seconds);
        self
    }

    pub fn set_sound_duration(&mut self, name: &str, seconds: f32) {
        self.sound_durations.insert(name.to_uppercase(), seconds);
    }

    pub fn set_npc_transform(&mut self, npc: NpcHandle, transform: Transform) {
        self.npc_transforms.insert(npc, transform);
    }

    pub fn remove_npc(&mut self, npc: NpcHandle) {
        self.npc_transforms.remove(&npc);
        self.way_net.release_all(npc);
        for slot in self.mobs.iter_mut().flat_map(|m| m.slots.iter_mut()) {
            if slot.occupant == Some(npc) {
                slot.occupant = None;
            }
        }
    }
}

impl NpcWorld for ZenWorld {
    fn way_net(&self) -> &dyn WayNet {
        &self.way_net
    }

    fn way_net_mut(&mut self) -> &mut dyn WayNet {
        &mut self.way_net
    }

    fn npc_transform(&self, npc: NpcHandle) -> Option<Transform> {
        self.npc_transforms.get(&npc).copied()
    }

    fn find_mob(&self, position: Vec3, scheme: &str, npc: NpcHandle) -> Option<MobTarget> {
        self.mobs
            .iter()
            .filter(|mob| mob.scheme.eq_ignore_ascii_case(scheme))
            .flat_map(|mob| {
                mob.slots
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.occupant.is_none_or(|o| o == npc))
                    .map(move |(i, slot)| MobTarget {
                        mob: mob.name.clone(),
                        scheme: mob.scheme.clone(),
                        slot: i,
                        position: slot.position,
                        rotation: slot.rotation,
                    })
            })
            .min_by(|a, b| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
    }

    fn occupy_mob_slot(&mut self, mob: &str, slot: usize, npc: NpcHandle) -> bool {
        let Some(target) = self
            .mobs
            .iter_mut()
            .find(|m| m.name.eq_ignore_ascii_case(mob))
            .and_then(|m| m.slots.get_mut(slot))
        else {
            warn!("Mob '{}' has no slot {}", mob, slot);
            return false;
        };
        match target.occupant {
            Some(other) if other != npc => false,
            _ => {
                target.occupant = Some(npc);
                true
            }
        }
    }

    fn release_mob_slot(&mut self, mob: &str, npc: NpcHandle) {
        if let Some(m) = self.mobs.iter_mut().find(|m| m.name.eq_ignore_ascii_case(mob)) {
            for slot in &mut m.slots {
                if slot.occupant == Some(npc) {
                    slot.occupant = None;
                }
            }
        }
    }

    fn sound_duration(&self, name: &str) -> Option<f32> {
        self.sound_durations.get(&name.to_uppercase()).copied()
    }
}

/// Everything one action sees of its character and the world during a call.
pub struct ActionContext<'a> {
    pub npc: NpcHandle,
    pub dt: f32,
    pub transform: &'a mut Transform,
    pub animation: &'a mut AnimationSystem,
    pub manager: &'a mut AnimationManager,
    pub state: &'a mut NpcState,
    pub world: &'a mut dyn NpcWorld,
    pub settings: &'a ActionSettings,
    pub commands: &'a mut Vec<NpcCommand>,
}

impl ActionContext<'_> {
    pub fn play(&mut self, animation: &str) -> bool {
        self.animation.play_animation(self.manager, animation)
    }

    pub fn stop(&mut self, animation: &str) {
        self.animation.stop_animation(animation);
    }

    /// Plays the idle of the current walk and weapon mode and keeps it as the fallback idle.
    pub fn play_idle(&mut self) {
        let idle = self.state.idle_animation();
        self.animation.set_idle_animation(&idle);
        if !self.play(&idle) {
            warn!("Idle animation '{}' is unavailable", idle);
        }
    }

    pub fn emit(&mut self, command: NpcCommand) {
        self.commands.push(command);
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_names_follow_walk_and_weapon_mode() {
        let mut state = NpcState::default();
        assert_eq!(state.idle_animation(), "S_RUN");
        assert_eq!(state.walk_animation(), "S_RUNL");
        assert_eq!(state.turn_animation(true), "T_RUNTURNL");

        state.weapon_mode = WeaponMode::Dagger;
        state.walk_mode = WalkMode::Walk;
        assert_eq!(state.walk_animation(), "S_1HWALKL");
        assert_eq!(state.turn_animation(false), "T_1HWALKTURNR");

        state.walk_mode = WalkMode::Swim;
        assert_eq!(state.idle_animation(), "S_SWIM");
        assert_eq!(state.walk_animation(), "S_SWIMF");
        state.walk_mode = WalkMode::Water;
        assert_eq!(state.walk_animation(), "S_WALKWL");
    }

    #[test]
    fn removed_character_frees_its_free_points() {
        use crate::npc::registry::NpcRegistry;
        use bevy::ecs::entity::Entity;

        let mut registry = NpcRegistry::new();
        let a = registry.register(Entity::from_raw(1));
        let b = registry.register(Entity::from_raw(2));
        let mut world = ZenWorld::new(WayNetGraph::new().with_free_point(
            "FP_SMALLTALK_01",
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::X,
        ));
        assert!(world.way_net_mut().lock_free_point("FP_SMALLTALK_01", a));
        assert!(world
            .way_net()
            .find_nearest_free_point(Vec3::ZERO, "SMALLTALK", b)
            .is_none());

        registry.unregister(a);
        world.remove_npc(a);
        let point = world
            .way_net()
            .find_nearest_free_point(Vec3::ZERO, "SMALLTALK", b)
            .map(|p| p.name.clone());
        assert_eq!(point.as_deref(), Some("FP_SMALLTALK_01"));
        assert!(world.way_net_mut().lock_free_point("FP_SMALLTALK_01", b));
    }
}
