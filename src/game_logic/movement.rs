use bevy::prelude::*;

/// Separations closer than this are ignored to avoid normalizing a zero vector
const MIN_SEPARATION_DISTANCE: f32 = 0.1;

/// Per-tick displacement toward a point, never overshooting it
pub fn step_towards(current_position: Vec2, target: Vec2, speed: f32, delta_time: f32) -> Vec2 {
    let offset = target - current_position;
    let distance = offset.length();
    if distance <= f32::EPSILON {
        return Vec2::ZERO;
    }

    let max_move_distance = (speed * delta_time).max(0.0);
    offset / distance * max_move_distance.min(distance)
}

/// Mix a local avoidance nudge into a displacement without changing its length
pub fn blend_separation(step: Vec2, separation: Vec2, weight: f32) -> Vec2 {
    let length = step.length();
    if length <= f32::EPSILON || separation == Vec2::ZERO || weight <= 0.0 {
        return step;
    }

    let heading = step / length;
    let blended = (heading + separation * weight).normalize_or_zero();
    // Never let the nudge turn the agent around
    if blended.dot(heading) <= 0.0 {
        return step;
    }
    blended * length
}

/// Repulsion from nearby agents; closer neighbours push harder
pub fn separation_force(position: Vec2, neighbours: &[Vec2], separation_radius: f32) -> Vec2 {
    let mut force = Vec2::ZERO;

    for other in neighbours {
        let distance = position.distance(*other);

        if distance < separation_radius && distance > MIN_SEPARATION_DISTANCE {
            let away_from_other = (position - *other) / distance;
            let strength = (separation_radius - distance) / separation_radius;
            force += away_from_other * strength;
        }
    }

    force
}
