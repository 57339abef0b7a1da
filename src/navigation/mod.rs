//! Targeting and obstacle avoidance for hostile agents
//!
//! Everything here is a pure read of the battlefield through [`SpatialRegistry`]
//! and an [`ObstacleGrid`](crate::pathfinding::ObstacleGrid). The only side
//! effect an agent produces is an [`AttackEvent`], handed to a [`DamageSink`].

use crate::components::Category;
use bevy::prelude::*;

pub mod blockage;
pub mod cluster;
pub mod detour;
pub mod state_machine;
pub mod targeting;

pub use blockage::*;
pub use cluster::*;
pub use detour::*;
pub use state_machine::*;
pub use targeting::*;

/// Slack added to range queries so that large obstacles whose centers sit just
/// outside the searched area are still returned
pub const OBSTACLE_QUERY_PADDING: f32 = 250.0;

/// Snapshot of an entity as seen through the registry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityRef {
    pub entity: Entity,
    pub category: Category,
    pub position: Vec2,
    pub radius: f32,
    pub alive: bool,
}

/// Read access to everything agents can see
pub trait SpatialRegistry {
    /// Live entities of `category` whose centers lie within `radius` of `center`,
    /// nearest first
    fn query(&self, category: Category, center: Vec2, radius: f32) -> Vec<EntityRef>;

    /// Current state of a previously seen entity; `None` once it is gone
    fn get(&self, entity: Entity) -> Option<EntityRef>;

    fn goal(&self) -> Option<EntityRef> {
        self.query(Category::Goal, Vec2::ZERO, f32::INFINITY)
            .into_iter()
            .next()
    }

    /// Bumped whenever a wall appears, moves or disappears
    fn wall_epoch(&self) -> u64 {
        0
    }
}

/// Receives damage produced by agent attacks
pub trait DamageSink {
    fn apply_damage(&mut self, entity: Entity, amount: f32);
}

/// One hit an agent wants to land this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackEvent {
    pub target: Entity,
    pub amount: f32,
}

impl AttackEvent {
    pub fn dispatch(self, sink: &mut impl DamageSink) {
        sink.apply_damage(self.target, self.amount);
    }
}

/// Live walls that could matter for the segment `a..b`
pub fn walls_near_segment<R: SpatialRegistry + ?Sized>(
    registry: &R,
    a: Vec2,
    b: Vec2,
    reach: f32,
) -> Vec<EntityRef> {
    let center = (a + b) * 0.5;
    let radius = a.distance(b) * 0.5 + reach + OBSTACLE_QUERY_PADDING;
    registry
        .query(Category::Wall, center, radius)
        .into_iter()
        .filter(|wall| wall.alive)
        .collect()
}

/// Closest live wall to `position`, measured edge to edge
pub fn nearest_wall<R: SpatialRegistry + ?Sized>(
    registry: &R,
    position: Vec2,
    search_radius: f32,
) -> Option<EntityRef> {
    registry
        .query(Category::Wall, position, search_radius + OBSTACLE_QUERY_PADDING)
        .into_iter()
        .filter(|wall| wall.alive)
        .min_by(|a, b| {
            let da = a.position.distance(position) - a.radius;
            let db = b.position.distance(position) - b.radius;
            da.total_cmp(&db)
        })
}
