use crate::geometry::Bounds;
use crate::navigation::EntityRef;
use std::collections::VecDeque;

/// Walls in mutual near-contact, treated as one rigid blob
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub members: Vec<EntityRef>,
    pub bounds: Bounds,
}

impl Cluster {
    pub fn contains(&self, entity: bevy::prelude::Entity) -> bool {
        self.members.iter().any(|member| member.entity == entity)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn touching(a: &EntityRef, b: &EntityRef, tolerance: f32) -> bool {
    a.position.distance(b.position) < a.radius + b.radius + tolerance
}

/// Split obstacles into connected components, in order of first appearance
pub fn group(obstacles: &[EntityRef], tolerance: f32) -> Vec<Cluster> {
    let mut visited = vec![false; obstacles.len()];
    let mut clusters = Vec::new();

    for seed in 0..obstacles.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;

        let mut members = Vec::new();
        let mut queue = VecDeque::from([seed]);
        while let Some(current) = queue.pop_front() {
            members.push(obstacles[current]);
            for next in 0..obstacles.len() {
                if !visited[next] && touching(&obstacles[current], &obstacles[next], tolerance) {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }

        let bounds = members
            .iter()
            .map(|member| Bounds::from_circle(member.position, member.radius))
            .reduce(Bounds::union);
        if let Some(bounds) = bounds {
            clusters.push(Cluster { members, bounds });
        }
    }

    clusters
}
