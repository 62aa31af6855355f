// src/npc/registry.rs

use bevy::ecs::entity::Entity;
use bevy::prelude::{Component, Resource};

/// Generational reference to a registered character. Stays invalid forever once the
/// character was unregistered, even if its slot gets reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NpcHandle {
    index: u32,
    generation: u32,
}

impl NpcHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Marks an entity as a registered character.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Npc {
    pub handle: NpcHandle,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    entity: Option<Entity>,
    generation: u32,
}

#[derive(Resource, Debug, Default)]
pub struct NpcRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl NpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: Entity) -> NpcHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            return NpcHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            entity: Some(entity),
            generation: 0,
        });
        NpcHandle {
            index,
            generation: 0,
        }
    }

    /// Frees the handle's slot. Returns the entity it pointed to.
    pub fn unregister(&mut self, handle: NpcHandle) -> Option<Entity> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(entity)
    }

    pub fn unregister_entity(&mut self, entity: Entity) -> Option<NpcHandle> {
        let handle = self.handle_of(entity)?;
        self.unregister(handle)?;
        Some(handle)
    }

    pub fn entity(&self, handle: NpcHandle) -> Option<Entity> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entity)
    }

    pub fn contains(&self, handle: NpcHandle) -> bool {
        self.entity(handle).is_some()
    }

    pub fn handle_of(&self, entity: Entity) -> Option<NpcHandle> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, slot)| slot.entity == Some(entity))
            .map(|(index, slot)| NpcHandle {
                index: index as u32,
                generation: slot.generation,
            })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entity.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
