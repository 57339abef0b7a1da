use crate::game_logic::AttackTimer;
use crate::pathfinding::GridPath;
use bevy::prelude::*;
use derive_more::{Add, Display, From, Mul};
use serde::{Deserialize, Serialize};
use validator::Validate;

// Generic resource pool; only health is tracked in a siege
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ResourcePool<T> {
    pub current: f32,
    pub max: f32,
    _marker: std::marker::PhantomData<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Health;

pub type HealthPool = ResourcePool<Health>;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Mul, Display, From)]
pub struct Speed(pub f32);

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Add, Mul, Display, From)]
pub struct Distance(pub f32);

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Add, Mul, Display, From)]
pub struct Damage(pub f32);

impl<T> ResourcePool<T> {
    pub fn new(current: f32, max: f32) -> Self {
        Self {
            current: current.max(0.0).min(max),
            max: max.max(0.0),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn new_full(max: f32) -> Self {
        Self::new(max, max)
    }

    pub fn drain(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl ResourcePool<Health> {
    pub fn is_dead(self) -> bool {
        self.current <= 0.0
    }

    pub fn take_damage(&mut self, damage: Damage) {
        self.drain(damage.0);
    }
}

impl<T> std::fmt::Display for ResourcePool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}/{:.0}", self.current, self.max)
    }
}

impl Speed {
    pub fn new(value: f32) -> Self {
        Self(value.max(0.0))
    }
}

impl Distance {
    pub fn new(value: f32) -> Self {
        Self(value.max(0.0))
    }
}

impl Damage {
    pub fn new(value: f32) -> Self {
        Self(value.max(0.0))
    }
}

impl std::ops::Mul<Speed> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: Speed) -> Self::Output {
        self * rhs.0
    }
}

/// What kind of thing an entity on the battlefield is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Goal,
    Wall,
    Vegetation,
    Character,
    Structure,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Goal,
        Category::Wall,
        Category::Vegetation,
        Category::Character,
        Category::Structure,
    ];

    /// Lower is more urgent. Walls only compete when they block the way for good.
    pub fn priority(self) -> f32 {
        match self {
            Category::Goal => 1.0,
            Category::Wall => 1.5,
            Category::Vegetation => 2.0,
            Category::Character => 3.0,
            Category::Structure => 4.0,
        }
    }

    /// Targets of these kinds are kept while they live
    pub fn is_sticky(self) -> bool {
        matches!(self, Category::Character | Category::Wall)
    }

    pub fn index(self) -> usize {
        match self {
            Category::Goal => 0,
            Category::Wall => 1,
            Category::Vegetation => 2,
            Category::Character => 3,
            Category::Structure => 4,
        }
    }
}

/// Navigation state of a hostile agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavState {
    #[default]
    Seeking,
    Detouring,
    ApproachingGapAboveGrid,
    GridPathfinding,
    Attacking,
    Dead,
}

/// Stats an agent is spawned with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AgentProfile {
    #[validate(range(min = 0.0, max = 1000.0))]
    pub speed: f32,
    #[validate(range(min = 1.0, max = 200.0))]
    pub radius: f32,
    #[validate(range(min = 1.0, max = 100000.0))]
    pub health: f32,
    #[validate(range(min = 0.0, max = 500.0))]
    pub attack_range: f32,
    #[validate(range(min = 0.0, max = 10000.0))]
    pub attack_damage: f32,
    #[validate(range(min = 0.0, max = 60.0))]
    pub attack_interval: f32,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            speed: 60.0,
            radius: 20.0,
            health: 100.0,
            attack_range: 10.0,
            attack_damage: 10.0,
            attack_interval: 1.0,
        }
    }
}

/// A hostile unit marching on the goal
#[derive(Component, Debug, Clone)]
pub struct Agent {
    pub position: Vec2,
    pub speed: Speed,
    pub radius: f32,
    pub attack_range: Distance,
    pub attack_damage: Damage,
    pub attack_timer: AttackTimer,
    pub health: HealthPool,
    /// Re-validated against the registry every tick
    pub target: Option<Entity>,
    pub state: NavState,
    pub detour_waypoint: Option<Vec2>,
    pub grid_path: GridPath,
    pub gap_waypoint: Option<Vec2>,
    /// Simulated time of the last grid path validity check
    pub last_path_check: f32,
    /// Seconds spent trying to move without getting anywhere
    pub blocked_secs: f32,
    /// Where the previous step started and how long it was
    pub last_position: Vec2,
    pub last_step: f32,
    /// Walls that left no way around on the last analysis
    pub unavoidable: Vec<Entity>,
    /// Wall layout revision the cached plans were made against
    pub wall_epoch: u64,
    pub reached_goal: bool,
}

impl Agent {
    pub fn new(position: Vec2, profile: &AgentProfile) -> Self {
        Self {
            position,
            speed: Speed::new(profile.speed),
            radius: profile.radius.max(0.0),
            attack_range: Distance::new(profile.attack_range),
            attack_damage: Damage::new(profile.attack_damage),
            attack_timer: AttackTimer::new(profile.attack_interval),
            health: HealthPool::new_full(profile.health),
            target: None,
            state: NavState::Seeking,
            detour_waypoint: None,
            grid_path: GridPath::default(),
            gap_waypoint: None,
            last_path_check: 0.0,
            blocked_secs: 0.0,
            last_position: position,
            last_step: 0.0,
            unavoidable: Vec::new(),
            wall_epoch: 0,
            reached_goal: false,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.state == NavState::Dead || self.health.is_dead()
    }

    pub fn has_plan(&self) -> bool {
        self.detour_waypoint.is_some() || self.gap_waypoint.is_some() || !self.grid_path.is_empty()
    }

    /// Drop every cached steering target
    pub fn clear_plans(&mut self) {
        self.detour_waypoint = None;
        self.gap_waypoint = None;
        self.grid_path.clear();
    }

    // The three setters below keep at most one steering target active

    pub fn set_detour(&mut self, waypoint: Vec2) {
        self.clear_plans();
        self.detour_waypoint = Some(waypoint);
    }

    pub fn set_gap(&mut self, waypoint: Vec2) {
        self.clear_plans();
        self.gap_waypoint = Some(waypoint);
    }

    pub fn set_grid_path(&mut self, path: GridPath) {
        self.clear_plans();
        self.grid_path = path;
    }

    /// The active steering point, if any plan is in progress
    pub fn steering_waypoint(&self) -> Option<Vec2> {
        self.detour_waypoint
            .or(self.gap_waypoint)
            .or_else(|| self.grid_path.current_waypoint())
    }
}

/// Anything agents can target or collide with: the goal, walls, defenders, trees, buildings
#[derive(Component, Debug, Clone, Copy)]
pub struct Targetable {
    pub category: Category,
    pub position: Vec2,
    pub radius: f32,
    pub health: HealthPool,
}

impl Targetable {
    pub fn new(category: Category, position: Vec2, radius: f32, health: f32) -> Self {
        Self {
            category,
            position,
            radius: radius.max(0.0),
            health: HealthPool::new_full(health),
        }
    }

    pub fn goal(position: Vec2, radius: f32) -> Self {
        Self::new(Category::Goal, position, radius, 1.0)
    }

    pub fn wall(position: Vec2, radius: f32, health: f32) -> Self {
        Self::new(Category::Wall, position, radius, health)
    }

    pub fn defender(position: Vec2, radius: f32, health: f32) -> Self {
        Self::new(Category::Character, position, radius, health)
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_pool_damage_system() {
        let mut health = HealthPool::new_full(100.0);

        health.take_damage(Damage::new(30.0));
        assert_eq!(health.current, 70.0);
        assert!(!health.is_dead());

        health.take_damage(Damage::new(100.0));
        assert_eq!(health.current, 0.0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_speed_positive_values() {
        assert_eq!(Speed::new(-5.0).0, 0.0);
        assert_eq!(Speed::new(10.0).0, 10.0);
    }

    #[test]
    fn test_category_priorities() {
        assert!(Category::Goal.priority() < Category::Wall.priority());
        assert!(Category::Wall.priority() < Category::Vegetation.priority());
        assert!(Category::Vegetation.priority() < Category::Character.priority());
        assert!(Category::Character.priority() < Category::Structure.priority());
        assert!(Category::Character.is_sticky());
        assert!(!Category::Goal.is_sticky());
    }

    #[test]
    fn test_agent_plans_are_mutually_exclusive() {
        let mut agent = Agent::new(Vec2::ZERO, &AgentProfile::default());

        agent.set_detour(Vec2::new(10.0, 0.0));
        assert_eq!(agent.steering_waypoint(), Some(Vec2::new(10.0, 0.0)));

        agent.set_gap(Vec2::new(0.0, 10.0));
        assert_eq!(agent.detour_waypoint, None);
        assert_eq!(agent.steering_waypoint(), Some(Vec2::new(0.0, 10.0)));

        agent.clear_plans();
        assert!(!agent.has_plan());
        assert_eq!(agent.steering_waypoint(), None);
    }

    #[test]
    fn test_agent_profile_validation() {
        let profile = AgentProfile {
            radius: 0.0,
            ..AgentProfile::default()
        };
        assert!(profile.validate().is_err());
        assert!(AgentProfile::default().validate().is_ok());
    }
}
