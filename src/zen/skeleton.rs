use std::collections::HashMap;

use bevy::ecs::entity::Entity;
use bevy::log::warn;
use bevy::math::{Quat, Vec3};

use super::helper_funcs::to_engine_quat;
use super::types::ModelHierarchy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneId(pub usize);

#[derive(Debug, Clone)]
pub struct BoneData {
    pub id: BoneId,
    pub name: String,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    /// Entity whose `Transform` receives the resolved pose, once bound.
    pub entity: Option<Entity>,
    pub bind_position: Vec3,
    pub bind_rotation: Quat,
}

#[derive(Default, Debug, Clone)]
pub struct Skeleton {
    pub bones: Vec<BoneData>,            // Arena storing all bone data
    name_to_id: HashMap<String, BoneId>, // Keyed by uppercase name
    roots: Vec<BoneId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_hierarchy(hierarchy: &ModelHierarchy) -> Self {
        let mut skeleton = Self::new();
        for node in &hierarchy.nodes {
            let parent_name = node
                .parent
                .and_then(|p| hierarchy.nodes.get(p))
                .map(|p| p.name.as_str());
            skeleton.add_bone(
                &node.name,
                parent_name,
                node.position,
                to_engine_quat(node.rotation),
            );
        }
        skeleton
    }

    pub fn add_bone(
        &mut self,
        name: &str,
        parent_name: Option<&str>,
        bind_position: Vec3,
        bind_rotation: Quat,
    ) -> BoneId {
        if let Some(existing) = self.name_to_id.get(&name.to_uppercase()) {
            warn!("Bone '{}' already exists in skeleton, keeping the first one", name);
            return *existing;
        }

        let new_id = BoneId(self.bones.len());
        let parent_id = parent_name.and_then(|p| self.name_to_id.get(&p.to_uppercase()).copied());

        self.bones.push(BoneData {
            id: new_id,
            name: name.to_string(),
            parent: parent_id,
            children: Vec::new(),
            entity: None,
            bind_position,
            bind_rotation,
        });
        self.name_to_id.insert(name.to_uppercase(), new_id);

        match parent_id.and_then(|p_id| self.bones.get_mut(p_id.0)) {
            Some(parent_node) => parent_node.children.push(new_id),
            None => self.roots.push(new_id),
        }
        new_id
    }

    /// Binds a bone to the entity whose transform it drives.
    pub fn bind_entity(&mut self, name: &str, entity: Entity) -> bool {
        match self.get_bone_by_name_mut(name) {
            Some(bone) => {
                bone.entity = Some(entity);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.name_to_id.get(&name.to_uppercase()).map(|id| id.0)
    }

    pub fn get_bone_by_id(&self, id: BoneId) -> Option<&BoneData> {
        self.bones.get(id.0)
    }

    pub fn get_bone_by_name(&self, name: &str) -> Option<&BoneData> {
        self.bone_index(name).and_then(|i| self.bones.get(i))
    }

    pub fn get_bone_by_name_mut(&mut self, name: &str) -> Option<&mut BoneData> {
        self.bone_index(name).and_then(move |i| self.bones.get_mut(i))
    }

    pub fn get_parent(&self, bone_id: BoneId) -> Option<&BoneData> {
        self.get_bone_by_id(bone_id)
            .and_then(|b| b.parent)
            .and_then(|p_id| self.get_bone_by_id(p_id))
    }

    pub fn get_roots(&self) -> Vec<&BoneData> {
        self.roots
            .iter()
            .filter_map(|root_id| self.get_bone_by_id(*root_id))
            .collect()
    }

    /// The bone and all of its descendants, depth first.
    pub fn get_all_children(&self, start_bone_name: &str) -> Vec<&BoneData> {
        let mut result = Vec::new();
        let Some(start) = self.get_bone_by_name(start_bone_name) else {
            return result;
        };
        let mut stack = vec![start.id];
        while let Some(current) = stack.pop() {
            let Some(bone) = self.get_bone_by_id(current) else {
                continue;
            };
            result.push(bone);
            // Reverse so the first child is visited first.
            stack.extend(bone.children.iter().rev().copied());
        }
        result
    }
}
