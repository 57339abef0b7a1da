use crate::components::{Agent, Category};
use crate::navigation::{EntityRef, SpatialRegistry};
use crate::resources::NavigationSettings;

/// Categories scanned on every re-selection. Walls are only proposed through
/// the `unavoidable` list.
const SCANNED_CATEGORIES: [Category; 4] = [
    Category::Goal,
    Category::Vegetation,
    Category::Character,
    Category::Structure,
];

/// Pick what the agent should go after this tick
///
/// A living sticky target (a defender or a wall already under attack) is kept
/// as is. Otherwise candidates within the detection radius are ranked by
/// category priority, then by distance; `unavoidable` holds the walls the
/// detour planner could not get around. With nothing in range the goal is
/// returned while it stands.
pub fn select_target<R: SpatialRegistry + ?Sized>(
    agent: &Agent,
    registry: &R,
    settings: &NavigationSettings,
    unavoidable: &[EntityRef],
) -> Option<EntityRef> {
    if let Some(current) = agent.target.and_then(|entity| registry.get(entity)) {
        if current.alive && current.category.is_sticky() {
            return Some(current);
        }
    }

    let radius = settings.detection_radius.get();
    let mut best: Option<(f32, f32, EntityRef)> = None;
    let mut consider = |candidate: EntityRef| {
        if !candidate.alive {
            return;
        }
        let priority = candidate.category.priority();
        let distance = candidate.position.distance(agent.position);
        if distance > radius {
            return;
        }
        let better = match &best {
            None => true,
            Some((best_priority, best_distance, _)) => {
                priority < *best_priority
                    || (priority == *best_priority && distance < *best_distance)
            }
        };
        if better {
            best = Some((priority, distance, candidate));
        }
    };

    for category in SCANNED_CATEGORIES {
        for candidate in registry.query(category, agent.position, radius) {
            consider(candidate);
        }
    }
    for wall in unavoidable {
        consider(*wall);
    }

    best.map(|(_, _, candidate)| candidate)
        .or_else(|| registry.goal().filter(|goal| goal.alive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::AgentProfile;
    use crate::navigation::test_support::ListRegistry;
    use bevy::prelude::*;
    use crate::navigation::EntityRef;

    fn agent_at(position: Vec2) -> Agent {
        Agent::new(position, &AgentProfile::default())
    }

    #[test]
    fn test_falls_back_to_goal_outside_detection_radius() {
        let mut registry = ListRegistry::default();
        let goal = registry.add(Category::Goal, Vec2::new(500.0, 0.0), 10.0);
        let settings = NavigationSettings::default();

        let picked = select_target(&agent_at(Vec2::ZERO), &registry, &settings, &[]);
        assert_eq!(picked.map(|t| t.entity), Some(goal));
    }

    #[test]
    fn test_priority_beats_distance() {
        let mut registry = ListRegistry::default();
        registry.add(Category::Goal, Vec2::new(900.0, 0.0), 10.0);
        let _structure = registry.add(Category::Structure, Vec2::new(20.0, 0.0), 10.0);
        let tree = registry.add(Category::Vegetation, Vec2::new(150.0, 0.0), 10.0);
        let settings = NavigationSettings::default();

        let picked = select_target(&agent_at(Vec2::ZERO), &registry, &settings, &[]);
        assert_eq!(picked.map(|t| t.entity), Some(tree));
    }

    #[test]
    fn test_nearest_wins_within_a_category() {
        let mut registry = ListRegistry::default();
        let _far = registry.add(Category::Character, Vec2::new(180.0, 0.0), 10.0);
        let near = registry.add(Category::Character, Vec2::new(0.0, -90.0), 10.0);
        let settings = NavigationSettings::default();

        let picked = select_target(&agent_at(Vec2::ZERO), &registry, &settings, &[]);
        assert_eq!(picked.map(|t| t.entity), Some(near));
    }

    #[test]
    fn test_walls_only_proposed_when_unavoidable() {
        let mut registry = ListRegistry::default();
        let goal = registry.add(Category::Goal, Vec2::new(900.0, 0.0), 10.0);
        let wall = registry.add(Category::Wall, Vec2::new(60.0, 0.0), 20.0);
        let settings = NavigationSettings::default();
        let agent = agent_at(Vec2::ZERO);

        let picked = select_target(&agent, &registry, &settings, &[]);
        assert_eq!(picked.map(|t| t.entity), Some(goal));

        let blocking: Vec<EntityRef> = registry.get(wall).into_iter().collect();
        let picked = select_target(&agent, &registry, &settings, &blocking);
        assert_eq!(picked.map(|t| t.entity), Some(wall));
    }

    #[test]
    fn test_sticky_character_is_kept() {
        let mut registry = ListRegistry::default();
        registry.add(Category::Goal, Vec2::new(900.0, 0.0), 10.0);
        let defender = registry.add(Category::Character, Vec2::new(150.0, 0.0), 15.0);
        let settings = NavigationSettings::default();
        let mut agent = agent_at(Vec2::ZERO);

        agent.target = select_target(&agent, &registry, &settings, &[]).map(|t| t.entity);
        assert_eq!(agent.target, Some(defender));

        // A tree shows up much closer and with a better priority
        registry.add(Category::Vegetation, Vec2::new(30.0, 0.0), 10.0);
        let picked = select_target(&agent, &registry, &settings, &[]);
        assert_eq!(picked.map(|t| t.entity), Some(defender));
    }

    #[test]
    fn test_dead_sticky_target_is_dropped() {
        let mut registry = ListRegistry::default();
        let goal = registry.add(Category::Goal, Vec2::new(900.0, 0.0), 10.0);
        let defender = registry.add(Category::Character, Vec2::new(150.0, 0.0), 15.0);
        let settings = NavigationSettings::default();
        let mut agent = agent_at(Vec2::ZERO);
        agent.target = Some(defender);

        registry.kill(defender);
        let picked = select_target(&agent, &registry, &settings, &[]);
        assert_eq!(picked.map(|t| t.entity), Some(goal));
    }

    #[test]
    fn test_no_goal_and_nothing_in_range() {
        let registry = ListRegistry::default();
        let settings = NavigationSettings::default();
        assert!(select_target(&agent_at(Vec2::ZERO), &registry, &settings, &[]).is_none());
    }

    #[test]
    fn test_selection_is_idempotent() {
        let mut registry = ListRegistry::default();
        registry.add(Category::Goal, Vec2::new(900.0, 0.0), 10.0);
        registry.add(Category::Vegetation, Vec2::new(120.0, 40.0), 10.0);
        registry.add(Category::Structure, Vec2::new(40.0, 40.0), 10.0);
        let settings = NavigationSettings::default();
        let agent = agent_at(Vec2::ZERO);

        let first = select_target(&agent, &registry, &settings, &[]);
        let second = select_target(&agent, &registry, &settings, &[]);
        assert_eq!(first, second);
    }
}
