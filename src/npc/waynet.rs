// src/npc/waynet.rs

use std::collections::HashMap;

use bevy::log::{debug, warn};
use bevy::math::{Quat, Vec3};
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use super::registry::NpcHandle;
use crate::zen::error::{AnimationError, Result};
use crate::zen::helper_funcs::look_rotation_xz;

#[derive(Debug, Clone, PartialEq)]
pub struct WayNetPoint {
    pub name: String,
    pub position: Vec3,
    /// Facing of free points; zero for plain way points.
    pub direction: Vec3,
    pub is_free_point: bool,
}

impl WayNetPoint {
    pub fn way_point(name: &str, position: Vec3) -> Self {
        Self {
            name: name.to_string(),
            position,
            direction: Vec3::ZERO,
            is_free_point: false,
        }
    }

    pub fn free_point(name: &str, position: Vec3, direction: Vec3) -> Self {
        Self {
            name: name.to_string(),
            position,
            direction,
            is_free_point: true,
        }
    }

    /// Yaw a character standing on this point should face.
    pub fn rotation(&self) -> Option<Quat> {
        look_rotation_xz(self.direction)
    }
}

/// Navigation queries used by the walk actions.
pub trait WayNet: Send + Sync {
    fn get_way_net_point(&self, name: &str) -> Option<&WayNetPoint>;

    fn find_nearest_way_point(&self, position: Vec3) -> Option<&WayNetPoint>;

    /// Nearest free point whose name contains `prefix` and that is not locked by
    /// another character.
    fn find_nearest_free_point(
        &self,
        position: Vec3,
        prefix: &str,
        npc: NpcHandle,
    ) -> Option<&WayNetPoint>;

    /// Shortest route between two way points, both ends included.
    fn find_fastest_path(&self, from: &str, to: &str) -> Option<Vec<WayNetPoint>>;

    fn lock_free_point(&mut self, name: &str, npc: NpcHandle) -> bool;

    fn release_free_point(&mut self, name: &str, npc: NpcHandle);

    /// Drops every free point lock held by `npc`.
    fn release_all(&mut self, npc: NpcHandle);
}

/// In-memory way net: way points joined by undirected edges weighted by their
/// length, plus free points.
#[derive(Debug, Clone, Default)]
pub struct WayNetGraph {
    graph: UnGraph<WayNetPoint, f32>,
    by_name: HashMap<String, NodeIndex>,
    locks: HashMap<NodeIndex, NpcHandle>,
}

impl WayNetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, point: WayNetPoint) -> NodeIndex {
        let key = point.name.to_uppercase();
        if let Some(&existing) = self.by_name.get(&key) {
            warn!("Way net point '{}' already exists, replacing it", point.name);
            self.graph[existing] = point;
            return existing;
        }
        let index = self.graph.add_node(point);
        self.by_name.insert(key, index);
        index
    }

    pub fn with_way_point(mut self, name: &str, position: Vec3) -> Self {
        self.add_point(WayNetPoint::way_point(name, position));
        self
    }

    pub fn with_free_point(mut self, name: &str, position: Vec3, direction: Vec3) -> Self {
        self.add_point(WayNetPoint::free_point(name, position, direction));
        self
    }

    pub fn connect(&mut self, a: &str, b: &str) -> Result<()> {
        let ia = self.index(a)?;
        let ib = self.index(b)?;
        let length = self.graph[ia].position.distance(self.graph[ib].position);
        self.graph.update_edge(ia, ib, length);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Holder of a free point, if it is locked.
    pub fn free_point_owner(&self, name: &str) -> Option<NpcHandle> {
        let index = self.index(name).ok()?;
        self.locks.get(&index).copied()
    }

    fn index(&self, name: &str) -> Result<NodeIndex> {
        self.by_name
            .get(&name.to_uppercase())
            .copied()
            .ok_or_else(|| AnimationError::UnknownWayPoint(name.to_string()))
    }

    fn nearest(
        &self,
        position: Vec3,
        filter: impl Fn(NodeIndex, &WayNetPoint) -> bool,
    ) -> Option<&WayNetPoint> {
        self.graph
            .node_indices()
            .map(|i| (i, &self.graph[i]))
            .filter(|(i, p)| filter(*i, p))
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(position)
                    .total_cmp(&b.position.distance_squared(position))
            })
            .map(|(_, p)| p)
    }
}

impl WayNet for WayNetGraph {
    fn get_way_net_point(&self, name: &str) -> Option<&WayNetPoint> {
        self.index(name).ok().map(|i| &self.graph[i])
    }

    fn find_nearest_way_point(&self, position: Vec3) -> Option<&WayNetPoint> {
        self.nearest(position, |_, p| !p.is_free_point)
    }

    fn find_nearest_free_point(
        &self,
        position: Vec3,
        prefix: &str,
        npc: NpcHandle,
    ) -> Option<&WayNetPoint> {
        let prefix = prefix.to_uppercase();
        self.nearest(position, |i, p| {
            p.is_free_point
                && p.name.to_uppercase().contains(&prefix)
                && self.locks.get(&i).is_none_or(|owner| *owner == npc)
        })
    }

    fn find_fastest_path(&self, from: &str, to: &str) -> Option<Vec<WayNetPoint>> {
        let start = self.index(from).ok()?;
        let goal = self.index(to).ok()?;
        let target = self.graph[goal].position;

        let Some((length, path)) = astar(
            &self.graph,
            start,
            |node| node == goal,
            |edge| *edge.weight(),
            |node| self.graph[node].position.distance(target),
        ) else {
            debug!("No route from '{}' to '{}'", from, to);
            return None;
        };
        debug!(
            "Route '{}' -> '{}': {} points, {:.1} long",
            from,
            to,
            path.len(),
            length
        );
        Some(path.into_iter().map(|i| self.graph[i].clone()).collect())
    }

    fn lock_free_point(&mut self, name: &str, npc: NpcHandle) -> bool {
        let Ok(index) = self.index(name) else {
            return false;
        };
        match self.locks.get(&index) {
            Some(owner) if *owner != npc => false,
            _ => {
                self.locks.insert(index, npc);
                true
            }
        }
    }

    fn release_free_point(&mut self, name: &str, npc: NpcHandle) {
        if let Ok(index) = self.index(name) {
            if self.locks.get(&index) == Some(&npc) {
                self.locks.remove(&index);
            }
        }
    }

    fn release_all(&mut self, npc: NpcHandle) {
        self.locks.retain(|_, owner| *owner != npc);
    }
}
