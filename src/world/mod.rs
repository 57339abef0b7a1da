//! In-memory battlefield shared by every agent
//!
//! [`Battlefield`] mirrors the targetable entities of the host world, keeps
//! the wall occupancy grid in step with them and records how often the wall
//! layout changed so agents know when their cached plans went stale.

use crate::components::{Category, HealthPool, Targetable};
use crate::navigation::{DamageSink, EntityRef, SpatialRegistry};
use crate::pathfinding::{WallGrid, clear_circle, stamp_circle};
use bevy::prelude::*;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy)]
struct Record {
    category: Category,
    position: Vec2,
    radius: f32,
    health: HealthPool,
    /// Touched since the last `begin_sync`
    seen: bool,
}

impl Record {
    fn view(&self, entity: Entity) -> EntityRef {
        EntityRef {
            entity,
            category: self.category,
            position: self.position,
            radius: self.radius,
            alive: !self.health.is_dead(),
        }
    }
}

#[derive(Resource, Debug, Default)]
pub struct Battlefield {
    /// One bucket per category, ordered by entity for deterministic ties
    buckets: [BTreeMap<Entity, Record>; Category::ALL.len()],
    index: HashMap<Entity, Category>,
    grid: Option<WallGrid>,
    wall_epoch: u64,
    next_id: u32,
}

impl Battlefield {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an occupancy grid; walls already present are stamped into it
    pub fn with_grid(mut self, mut grid: WallGrid) -> Self {
        for record in self.buckets[Category::Wall.index()].values() {
            stamp_circle(&mut grid, record.position, record.radius);
        }
        self.grid = Some(grid);
        self
    }

    pub fn grid(&self) -> Option<&WallGrid> {
        self.grid.as_ref()
    }

    /// Direct access for hosts that keep extra occupancy of their own
    pub fn grid_mut(&mut self) -> Option<&mut WallGrid> {
        self.grid.as_mut()
    }

    /// Register a new entity without an ECS world behind it
    pub fn spawn(&mut self, targetable: &Targetable) -> Entity {
        self.next_id += 1;
        let entity = Entity::from_raw(self.next_id);
        self.insert(entity, targetable);
        entity
    }

    /// Add or refresh an entity. Walls that appear or move are re-stamped and
    /// bump the wall epoch.
    pub fn insert(&mut self, entity: Entity, targetable: &Targetable) {
        if let Some(category) = self.index.get(&entity).copied() {
            if category != targetable.category {
                self.remove(entity);
            }
        }

        let bucket = &mut self.buckets[targetable.category.index()];
        let previous = bucket.insert(
            entity,
            Record {
                category: targetable.category,
                position: targetable.position,
                radius: targetable.radius,
                health: targetable.health,
                seen: true,
            },
        );
        self.index.insert(entity, targetable.category);

        if targetable.category != Category::Wall {
            return;
        }

        let moved = previous.is_none_or(|old| {
            old.position != targetable.position || old.radius != targetable.radius
        });
        if !moved {
            return;
        }

        if let Some(grid) = self.grid.as_mut() {
            if let Some(old) = previous {
                clear_circle(grid, old.position, old.radius);
            }
            stamp_circle(grid, targetable.position, targetable.radius);
        }
        self.wall_epoch += 1;
    }

    /// Forget an entity; walls are cleared from the grid
    pub fn remove(&mut self, entity: Entity) -> Option<EntityRef> {
        let category = self.index.remove(&entity)?;
        let record = self.buckets[category.index()].remove(&entity)?;

        if category == Category::Wall {
            if let Some(grid) = self.grid.as_mut() {
                clear_circle(grid, record.position, record.radius);
            }
            self.wall_epoch += 1;
        }
        Some(record.view(entity))
    }

    /// Start a mirror pass; anything not re-inserted before [`Self::end_sync`]
    /// is dropped
    pub fn begin_sync(&mut self) {
        for bucket in &mut self.buckets {
            for record in bucket.values_mut() {
                record.seen = false;
            }
        }
    }

    /// Finish a mirror pass, returning how many entities vanished
    pub fn end_sync(&mut self) -> usize {
        let stale: Vec<Entity> = self
            .buckets
            .iter()
            .flat_map(|bucket| bucket.iter())
            .filter(|(_, record)| !record.seen)
            .map(|(entity, _)| *entity)
            .collect();

        for entity in &stale {
            self.remove(*entity);
        }
        stale.len()
    }

    pub fn health(&self, entity: Entity) -> Option<HealthPool> {
        let category = self.index.get(&entity)?;
        self.buckets[category.index()]
            .get(&entity)
            .map(|record| record.health)
    }

    pub fn count(&self, category: Category) -> usize {
        self.buckets[category.index()].len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl SpatialRegistry for Battlefield {
    fn query(&self, category: Category, center: Vec2, radius: f32) -> Vec<EntityRef> {
        let mut found: Vec<(f32, EntityRef)> = self.buckets[category.index()]
            .iter()
            .map(|(entity, record)| record.view(*entity))
            .filter(|view| view.alive)
            .map(|view| (view.position.distance(center), view))
            .filter(|(distance, _)| *distance <= radius)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().map(|(_, view)| view).collect()
    }

    fn get(&self, entity: Entity) -> Option<EntityRef> {
        let category = self.index.get(&entity)?;
        self.buckets[category.index()]
            .get(&entity)
            .map(|record| record.view(entity))
    }

    fn goal(&self) -> Option<EntityRef> {
        self.buckets[Category::Goal.index()]
            .iter()
            .map(|(entity, record)| record.view(*entity))
            .find(|view| view.alive)
    }

    fn wall_epoch(&self) -> u64 {
        self.wall_epoch
    }
}

impl DamageSink for Battlefield {
    fn apply_damage(&mut self, entity: Entity, amount: f32) {
        let Some(category) = self.index.get(&entity).copied() else {
            return;
        };
        let Some(record) = self.buckets[category.index()].get_mut(&entity) else {
            return;
        };

        record.health.drain(amount);
        if !record.health.is_dead() {
            return;
        }

        let position = record.position;
        self.remove(entity);
        match category {
            Category::Wall => info!(
                "Wall at ({:.0}, {:.0}) destroyed, epoch {}",
                position.x, position.y, self.wall_epoch
            ),
            _ => debug!("{category:?} at ({:.0}, {:.0}) destroyed", position.x, position.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinding::{GridCell, ObstacleGrid};

    fn grid() -> WallGrid {
        WallGrid::new(Vec2::ZERO, 5, 5, 40.0).unwrap()
    }

    #[test]
    fn test_query_filters_and_sorts() {
        let mut field = Battlefield::new();
        let far = field.spawn(&Targetable::wall(Vec2::new(100.0, 0.0), 10.0, 50.0));
        let near = field.spawn(&Targetable::wall(Vec2::new(30.0, 0.0), 10.0, 50.0));
        field.spawn(&Targetable::defender(Vec2::new(10.0, 0.0), 10.0, 50.0));
        field.spawn(&Targetable::wall(Vec2::new(500.0, 0.0), 10.0, 50.0));

        let walls: Vec<Entity> = field
            .query(Category::Wall, Vec2::ZERO, 200.0)
            .iter()
            .map(|wall| wall.entity)
            .collect();
        assert_eq!(walls, vec![near, far]);
    }

    #[test]
    fn test_goal_lookup() {
        let mut field = Battlefield::new();
        assert!(field.goal().is_none());

        let goal = field.spawn(&Targetable::goal(Vec2::new(0.0, -500.0), 30.0));
        assert_eq!(field.goal().map(|g| g.entity), Some(goal));
    }

    #[test]
    fn test_walls_are_stamped_and_cleared() {
        let mut field = Battlefield::new().with_grid(grid());
        let wall = field.spawn(&Targetable::wall(Vec2::new(80.0, 80.0), 15.0, 50.0));
        assert_eq!(field.wall_epoch(), 1);
        assert!(field.grid().is_some_and(|g| g.is_occupied(GridCell::new(2, 2))));

        field.remove(wall);
        assert_eq!(field.wall_epoch(), 2);
        assert!(field.grid().is_some_and(|g| !g.is_occupied(GridCell::new(2, 2))));
    }

    #[test]
    fn test_existing_walls_stamped_when_grid_attached() {
        let mut field = Battlefield::new();
        field.spawn(&Targetable::wall(Vec2::new(40.0, 40.0), 15.0, 50.0));
        let field = field.with_grid(grid());

        assert!(field.grid().is_some_and(|g| g.is_occupied(GridCell::new(1, 1))));
    }

    #[test]
    fn test_damage_destroys_wall() {
        let mut field = Battlefield::new().with_grid(grid());
        let wall = field.spawn(&Targetable::wall(Vec2::new(80.0, 80.0), 15.0, 25.0));
        let epoch = field.wall_epoch();

        field.apply_damage(wall, 10.0);
        assert_eq!(field.health(wall).map(|h| h.current), Some(15.0));
        assert_eq!(field.wall_epoch(), epoch, "Damage alone keeps plans valid");

        field.apply_damage(wall, 20.0);
        assert!(field.get(wall).is_none());
        assert_eq!(field.wall_epoch(), epoch + 1);
        assert!(field.grid().is_some_and(|g| g.occupied_cells() == 0));

        // Hitting something already gone is a no-op
        field.apply_damage(wall, 20.0);
    }

    #[test]
    fn test_sync_drops_unseen_entities() {
        let mut field = Battlefield::new();
        let kept = Entity::from_raw(40);
        let dropped = Entity::from_raw(41);
        field.insert(kept, &Targetable::defender(Vec2::ZERO, 10.0, 30.0));
        field.insert(dropped, &Targetable::wall(Vec2::ONE, 10.0, 30.0));
        let epoch = field.wall_epoch();

        field.begin_sync();
        field.insert(kept, &Targetable::defender(Vec2::new(5.0, 0.0), 10.0, 30.0));
        assert_eq!(field.end_sync(), 1);

        assert_eq!(field.len(), 1);
        assert_eq!(field.get(kept).map(|d| d.position), Some(Vec2::new(5.0, 0.0)));
        assert_eq!(field.wall_epoch(), epoch + 1);
    }

    #[test]
    fn test_wall_refresh_only_bumps_epoch_when_moved() {
        let mut field = Battlefield::new().with_grid(grid());
        let wall = Entity::from_raw(9);
        field.insert(wall, &Targetable::wall(Vec2::new(40.0, 40.0), 15.0, 30.0));
        let epoch = field.wall_epoch();

        field.insert(wall, &Targetable::wall(Vec2::new(40.0, 40.0), 15.0, 20.0));
        assert_eq!(field.wall_epoch(), epoch);

        field.insert(wall, &Targetable::wall(Vec2::new(120.0, 40.0), 15.0, 20.0));
        assert_eq!(field.wall_epoch(), epoch + 1);
        let grid = field.grid().unwrap();
        assert!(!grid.is_occupied(GridCell::new(1, 1)));
        assert!(grid.is_occupied(GridCell::new(3, 1)));
    }

    #[test]
    fn test_dead_entries_are_invisible() {
        let mut field = Battlefield::new();
        let tree = Entity::from_raw(3);
        let mut targetable = Targetable::new(Category::Vegetation, Vec2::ZERO, 10.0, 10.0);
        targetable.health.drain(10.0);
        field.insert(tree, &targetable);

        assert!(field.query(Category::Vegetation, Vec2::ZERO, 100.0).is_empty());
        assert_eq!(field.get(tree).map(|t| t.alive), Some(false));
    }
}
