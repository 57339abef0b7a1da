use crate::components::Agent;
use crate::geometry::{Bounds, closest_point_on_segment, dominant_axis, point_segment_distance};
use crate::navigation::{Blockage, Cluster, SpatialRegistry, walls_near_segment};
use crate::resources::NavigationSettings;
use bevy::prelude::*;

/// Outcome of detour planning for one blocked path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetourPlan {
    /// Nothing left to go around
    Clear,
    /// Steer here first, then re-check the path
    Waypoint(Vec2),
    /// No way around; fight through
    Unavoidable,
}

/// Pick the exit with the shortest total trip `agent -> exit -> goal`.
/// On a tie the earlier candidate wins.
pub fn select_best_exit(candidates: &[Vec2], agent: Vec2, goal: Vec2) -> Option<Vec2> {
    let mut best: Option<(f32, Vec2)> = None;
    for candidate in candidates {
        let trip = agent.distance(*candidate) + candidate.distance(goal);
        if best.is_none_or(|(best_trip, _)| trip < best_trip) {
            best = Some((trip, *candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Travel frame of one planning call: main axis toward the goal and the lateral axis
struct Frame {
    axis: usize,
    lateral: usize,
    forward_sign: f32,
}

impl Frame {
    fn new(start: Vec2, goal: Vec2) -> Self {
        let to_goal = goal - start;
        let axis = dominant_axis(to_goal);
        Self {
            axis,
            lateral: 1 - axis,
            forward_sign: if to_goal[axis] < 0.0 { -1.0 } else { 1.0 },
        }
    }

    /// True once the box lies entirely behind `point`
    fn has_passed(&self, point: Vec2, bounds: Bounds) -> bool {
        if self.forward_sign > 0.0 {
            point[self.axis] > bounds.max[self.axis]
        } else {
            point[self.axis] < bounds.min[self.axis]
        }
    }
}

/// Candidate checks shared by every planning step
struct Verifier<'a, R: SpatialRegistry + ?Sized> {
    registry: &'a R,
    settings: &'a NavigationSettings,
    start: Vec2,
    goal: Vec2,
    agent_radius: f32,
}

impl<R: SpatialRegistry + ?Sized> Verifier<'_, R> {
    fn in_map(&self, candidate: Vec2) -> bool {
        self.settings.clamp_to_map(candidate).distance(candidate) <= f32::EPSILON
    }

    /// The leg from the agent to the candidate must not cut through a wall,
    /// except those the agent is already pressed against
    fn approach_clear(&self, candidate: Vec2) -> bool {
        walls_near_segment(self.registry, self.start, candidate, self.agent_radius)
            .iter()
            .filter(|wall| self.start.distance(wall.position) >= wall.radius + self.agent_radius)
            .all(|wall| {
                point_segment_distance(wall.position, self.start, candidate)
                    >= wall.radius + self.agent_radius
            })
    }

    /// From the candidate the goal must be reachable without the analyzer
    /// reporting a collision
    fn onward_clear(&self, candidate: Vec2) -> bool {
        let spare = self.agent_radius + self.settings.blockage_margin.get();
        walls_near_segment(self.registry, candidate, self.goal, spare)
            .iter()
            .all(|wall| {
                point_segment_distance(wall.position, candidate, self.goal) >= wall.radius + spare
            })
    }

    fn accepts(&self, candidate: Vec2) -> bool {
        self.in_map(candidate) && self.approach_clear(candidate) && self.onward_clear(candidate)
    }
}

/// Find a way around the walls blocking the agent's straight path to `goal`
///
/// Tried in order: leaving the largest cluster's box by its nearer lateral
/// edge, the smallest side-step that clears the blocking cluster, then a fan
/// of growing offsets and angles. A waypoint is only returned when both legs
/// through it are clear.
pub fn plan_detour<R: SpatialRegistry + ?Sized>(
    agent: &Agent,
    goal: Vec2,
    blockage: &Blockage,
    clusters: &[Cluster],
    registry: &R,
    settings: &NavigationSettings,
) -> DetourPlan {
    let start = agent.position;
    let to_goal = goal - start;
    if to_goal.length() <= f32::EPSILON {
        return DetourPlan::Clear;
    }

    let Some(primary) = clusters
        .iter()
        .find(|cluster| cluster.contains(blockage.blocker.entity))
        .or_else(|| clusters.first())
    else {
        return DetourPlan::Clear;
    };

    let frame = Frame::new(start, goal);
    if frame.has_passed(start, primary.bounds) {
        return DetourPlan::Clear;
    }

    let verifier = Verifier {
        registry,
        settings,
        start,
        goal,
        agent_radius: agent.radius,
    };
    let clearance = agent.radius + settings.detour_clearance();

    if let Some(exit) = room_exit(&frame, clusters, &verifier, clearance) {
        debug!("Room exit at ({:.1}, {:.1})", exit.x, exit.y);
        return DetourPlan::Waypoint(exit);
    }

    let dir = to_goal.normalize();
    let perp = dir.perp();
    let base = closest_point_on_segment(primary.bounds.center(), start, goal);
    // Try the side away from the cluster first; dead center prefers +perp
    let cluster_side = (primary.bounds.center() - base).dot(perp);
    let sides: [f32; 2] = if cluster_side > 0.0 { [-1.0, 1.0] } else { [1.0, -1.0] };

    for side in sides {
        let outward = perp * side;
        let extent = primary
            .bounds
            .corners()
            .iter()
            .map(|corner| (*corner - base).dot(outward))
            .fold(0.0, f32::max);
        let offset = settings.side_step_granularity.round_up(extent + clearance);
        let candidate = base + outward * offset;
        if verifier.accepts(candidate) {
            debug!(
                "Side-step of {:.0} to ({:.1}, {:.1})",
                offset, candidate.x, candidate.y
            );
            return DetourPlan::Waypoint(candidate);
        }
    }

    for &offset in &settings.fan_offsets {
        for side in sides {
            let candidate = base + perp * side * offset;
            if verifier.accepts(candidate) {
                debug!("Fan detour at offset {:.0}", offset);
                return DetourPlan::Waypoint(candidate);
            }
        }

        for &angle in &settings.fan_angles_deg {
            let radians = angle.to_radians();
            for side in sides {
                let outward = perp * side;
                for turn in [radians, -radians] {
                    let candidate = base + Vec2::from_angle(turn).rotate(outward) * offset;
                    if verifier.accepts(candidate) {
                        debug!("Fan detour at offset {:.0}, {:.0} degrees", offset, angle);
                        return DetourPlan::Waypoint(candidate);
                    }
                }
            }
        }
    }

    DetourPlan::Unavoidable
}

fn room_exit<R: SpatialRegistry + ?Sized>(
    frame: &Frame,
    clusters: &[Cluster],
    verifier: &Verifier<'_, R>,
    clearance: f32,
) -> Option<Vec2> {
    let largest = clusters
        .iter()
        .fold(None::<&Cluster>, |best, cluster| match best {
            Some(b) if b.len() >= cluster.len() => Some(b),
            _ => Some(cluster),
        })?;
    let bounds = largest.bounds;
    if frame.has_passed(verifier.start, bounds) {
        return None;
    }

    let travel = verifier.start[frame.axis].clamp(bounds.min[frame.axis], bounds.max[frame.axis]);
    let mut low = Vec2::ZERO;
    low[frame.axis] = travel;
    low[frame.lateral] = bounds.min[frame.lateral] - clearance;
    let mut high = low;
    high[frame.lateral] = bounds.max[frame.lateral] + clearance;

    let candidates: Vec<Vec2> = [low, high]
        .into_iter()
        .map(|candidate| verifier.settings.clamp_to_map(candidate))
        .filter(|candidate| verifier.approach_clear(*candidate) && verifier.onward_clear(*candidate))
        .collect();

    select_best_exit(&candidates, verifier.start, verifier.goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AgentProfile, Category};
    use crate::navigation::test_support::ListRegistry;
    use crate::navigation::{find_blocking_obstacle, group};
    use crate::pathfinding::WallGrid;
    use std::f32::consts::TAU;

    fn plan(
        registry: &ListRegistry,
        agent: &Agent,
        goal: Vec2,
        settings: &NavigationSettings,
    ) -> Option<DetourPlan> {
        let blockage =
            find_blocking_obstacle::<_, WallGrid>(agent, goal, registry, None, settings)?;
        let clusters = group(&blockage.obstacles, settings.adjacency_tolerance.get());
        Some(plan_detour(agent, goal, &blockage, &clusters, registry, settings))
    }

    fn agent_at(position: Vec2) -> Agent {
        Agent::new(position, &AgentProfile::default())
    }

    #[test]
    fn test_best_exit_prefers_shorter_trip() {
        let agent = Vec2::ZERO;
        let goal = Vec2::new(100.0, 0.0);
        let candidates = [Vec2::new(50.0, 80.0), Vec2::new(50.0, -30.0)];
        assert_eq!(
            select_best_exit(&candidates, agent, goal),
            Some(Vec2::new(50.0, -30.0))
        );
    }

    #[test]
    fn test_best_exit_tie_keeps_first() {
        let candidates = [Vec2::new(50.0, 40.0), Vec2::new(50.0, -40.0)];
        assert_eq!(
            select_best_exit(&candidates, Vec2::ZERO, Vec2::new(100.0, 0.0)),
            Some(Vec2::new(50.0, 40.0))
        );
        assert_eq!(select_best_exit(&[], Vec2::ZERO, Vec2::X), None);
    }

    #[test]
    fn test_isolated_wall_gets_clear_detour() {
        let mut registry = ListRegistry::default();
        let wall_position = Vec2::new(250.0, 0.0);
        registry.add(Category::Wall, wall_position, 40.0);
        let settings = NavigationSettings::default();
        let agent = agent_at(Vec2::ZERO);
        let goal = Vec2::new(500.0, 0.0);

        let Some(DetourPlan::Waypoint(point)) = plan(&registry, &agent, goal, &settings) else {
            panic!("A lone wall with open sides should produce a waypoint");
        };

        assert!(point.y.abs() >= 60.0, "Detour {point:?} hugs the wall");
        assert!((point.x - 250.0).abs() < 60.0, "Detour {point:?} strays too far");
        // Both legs keep clear of the wall circle plus the agent radius
        assert!(point_segment_distance(wall_position, Vec2::ZERO, point) >= 60.0);
        assert!(point_segment_distance(wall_position, point, goal) >= 60.0);
    }

    #[test]
    fn test_side_step_avoids_cluster_side() {
        let mut registry = ListRegistry::default();
        // Wall mostly above the path (+y)
        registry.add(Category::Wall, Vec2::new(250.0, 30.0), 40.0);
        let settings = NavigationSettings::default();

        let Some(DetourPlan::Waypoint(point)) =
            plan(&registry, &agent_at(Vec2::ZERO), Vec2::new(500.0, 0.0), &settings)
        else {
            panic!("Expected a waypoint");
        };
        assert!(point.y < 0.0, "Detour {point:?} should pass below the wall");
    }

    #[test]
    fn test_room_exit_for_long_barrier() {
        let mut registry = ListRegistry::default();
        // A vertical line of touching walls from y = -100 to y = 100 at x = 250
        for i in 0..5 {
            registry.add(
                Category::Wall,
                Vec2::new(250.0, -100.0 + i as f32 * 50.0),
                25.0,
            );
        }
        let settings = NavigationSettings::default();
        let agent = agent_at(Vec2::new(0.0, 30.0));
        let goal = Vec2::new(1500.0, 30.0);

        let Some(DetourPlan::Waypoint(point)) = plan(&registry, &agent, goal, &settings) else {
            panic!("Expected a waypoint");
        };

        // The bottom exit runs into the last wall of the line, so the top edge (y = 125) is used
        assert!(point.y > 125.0, "Exit {point:?} should clear the top edge");
        assert_eq!(point.x, 225.0);
    }

    #[test]
    fn test_enclosing_ring_is_unavoidable() {
        let mut registry = ListRegistry::default();
        for i in 0..18 {
            let angle = i as f32 / 18.0 * TAU;
            registry.add(Category::Wall, Vec2::from_angle(angle) * 100.0, 20.0);
        }
        let settings = NavigationSettings::default();

        let result = plan(
            &registry,
            &agent_at(Vec2::ZERO),
            Vec2::new(500.0, 0.0),
            &settings,
        );
        assert_eq!(result, Some(DetourPlan::Unavoidable));
    }

    #[test]
    fn test_passed_cluster_is_clear() {
        let mut registry = ListRegistry::default();
        let wall = registry.add(Category::Wall, Vec2::new(250.0, 0.0), 40.0);
        let settings = NavigationSettings::default();
        let blocker = registry.get(wall).unwrap();
        let blockage = Blockage {
            blocker,
            obstacles: vec![blocker],
        };
        let clusters = group(&blockage.obstacles, 5.0);

        let agent = agent_at(Vec2::new(320.0, 50.0));
        let result = plan_detour(
            &agent,
            Vec2::new(500.0, 0.0),
            &blockage,
            &clusters,
            &registry,
            &settings,
        );
        assert_eq!(result, DetourPlan::Clear);
    }

    #[test]
    fn test_candidates_stay_inside_map() {
        let mut registry = ListRegistry::default();
        // Barrier touching the top map edge; only the bottom is open
        for i in 0..4 {
            registry.add(Category::Wall, Vec2::new(250.0, 180.0 - i as f32 * 45.0), 25.0);
        }
        let settings = NavigationSettings {
            map_min: Vec2::new(-1000.0, -1000.0),
            map_max: Vec2::new(1000.0, 200.0),
            ..NavigationSettings::default()
        };

        let Some(DetourPlan::Waypoint(point)) =
            plan(&registry, &agent_at(Vec2::new(0.0, 100.0)), Vec2::new(500.0, 100.0), &settings)
        else {
            panic!("Expected a waypoint");
        };
        assert!(point.y <= 200.0);
        assert!(point.y < 0.0, "Exit {point:?} should go around the open bottom side");
    }
}
