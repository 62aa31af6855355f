use std::collections::HashMap;

use super::helper_funcs::{normalize_asset_name, track_cache_key};
use super::types::{ModelAnimation, ModelHierarchy, ModelScript};

/// Read-only access to parsed model data. Names are matched case- and
/// extension-insensitively.
pub trait ResourceProvider: Send + Sync {
    fn try_get_model_script(&self, mds_name: &str) -> Option<&ModelScript>;
    fn try_get_model_hierarchy(&self, mdh_name: &str) -> Option<&ModelHierarchy>;
    fn try_get_model_animation(&self, mds_name: &str, anim_name: &str)
    -> Option<&ModelAnimation>;
}

/// Provider backed by plain maps, filled through the builder methods.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResources {
    scripts: HashMap<String, ModelScript>,
    hierarchies: HashMap<String, ModelHierarchy>,
    animations: HashMap<String, ModelAnimation>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: ModelScript) -> Self {
        self.add_script(script);
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: ModelHierarchy) -> Self {
        self.add_hierarchy(hierarchy);
        self
    }

    pub fn with_animation(mut self, mds_name: &str, animation: ModelAnimation) -> Self {
        self.add_animation(mds_name, animation);
        self
    }

    pub fn add_script(&mut self, script: ModelScript) {
        self.scripts
            .insert(normalize_asset_name(&script.name), script);
    }

    pub fn add_hierarchy(&mut self, hierarchy: ModelHierarchy) {
        self.hierarchies
            .insert(normalize_asset_name(&hierarchy.name), hierarchy);
    }

    pub fn add_animation(&mut self, mds_name: &str, animation: ModelAnimation) {
        self.animations
            .insert(track_cache_key(mds_name, &animation.name), animation);
    }
}

impl ResourceProvider for InMemoryResources {
    fn try_get_model_script(&self, mds_name: &str) -> Option<&ModelScript> {
        self.scripts.get(&normalize_asset_name(mds_name))
    }

    fn try_get_model_hierarchy(&self, mdh_name: &str) -> Option<&ModelHierarchy> {
        self.hierarchies.get(&normalize_asset_name(mdh_name))
    }

    fn try_get_model_animation(
        &self,
        mds_name: &str,
        anim_name: &str,
    ) -> Option<&ModelAnimation> {
        self.animations.get(&track_cache_key(mds_name, anim_name))
    }
}
