use crate::components::Agent;
use crate::geometry::{point_segment_distance, sample_segment};
use crate::navigation::{EntityRef, SpatialRegistry, walls_near_segment};
use crate::pathfinding::{GridZone, ObstacleGrid, classify_position};
use crate::resources::NavigationSettings;
use bevy::prelude::*;

/// Result of a straight-path check that found something in the way
#[derive(Debug, Clone, PartialEq)]
pub struct Blockage {
    /// Colliding wall nearest to the agent
    pub blocker: EntityRef,
    /// Every wall the path collides with plus those hugging its corridor
    pub obstacles: Vec<EntityRef>,
}

/// Check the straight line from the agent to `destination` for walls
///
/// The path counts as blocked only when the agent's swept circle collides with
/// a wall, either at a sample point or anywhere along the line between them.
/// Walls inside the corridor are returned alongside so that the clusterer sees
/// the whole blob, not just the part touching the line.
pub fn find_blocking_obstacle<R, G>(
    agent: &Agent,
    destination: Vec2,
    registry: &R,
    grid: Option<&G>,
    settings: &NavigationSettings,
) -> Option<Blockage>
where
    R: SpatialRegistry + ?Sized,
    G: ObstacleGrid + ?Sized,
{
    if let Some(grid) = grid {
        if classify_position(grid, agent.position) == GridZone::PastBottom {
            return None;
        }
    }

    let start = agent.position;
    let corridor = settings.corridor_half_width.get();
    let contact = agent.radius + settings.blockage_margin.get();
    let walls = walls_near_segment(registry, start, destination, corridor.max(contact));
    if walls.is_empty() {
        return None;
    }

    let samples = sample_segment(start, destination, settings.sample_step.get());
    let mut hits: Vec<EntityRef> = Vec::new();
    let mut obstacles: Vec<EntityRef> = Vec::new();

    for wall in &walls {
        let line_distance = point_segment_distance(wall.position, start, destination);
        // Walls smaller than the sample spacing can sit between two samples
        let collides = line_distance < wall.radius + contact
            || samples
                .iter()
                .any(|sample| sample.distance(wall.position) < wall.radius + contact);
        if collides {
            hits.push(*wall);
            obstacles.push(*wall);
        } else if line_distance < corridor + wall.radius {
            obstacles.push(*wall);
        }
    }

    let blocker = hits.into_iter().min_by(|a, b| {
        a.position
            .distance(start)
            .total_cmp(&b.position.distance(start))
    })?;

    Some(Blockage { blocker, obstacles })
}
