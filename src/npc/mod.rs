// src/npc/mod.rs

pub mod action;
pub mod actions;
pub mod context;
pub mod queue;
pub mod registry;
pub mod rotate;
pub mod walk;
pub mod waynet;

pub use action::{AiCommand, AnimationAction};
pub use context::{
    ActionContext, ActionSettings, Mob, MobSlot, MobTarget, MobUsage, NpcCommand, NpcState,
    NpcWorld, WalkMode, WeaponMode, ZenWorld,
};
pub use queue::{NpcActionQueue, NpcCommandEvent};
pub use registry::{Npc, NpcHandle, NpcRegistry};
pub use waynet::{WayNet, WayNetGraph, WayNetPoint};
