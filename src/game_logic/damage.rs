use bevy::prelude::*;

/// Edge-to-edge reach check between an attacker and a target circle
pub fn in_attack_range(
    attacker_position: Vec2,
    attacker_radius: f32,
    target_position: Vec2,
    target_radius: f32,
    attack_range: f32,
) -> bool {
    let gap = attacker_position.distance(target_position) - attacker_radius - target_radius;
    gap <= attack_range
}

/// Cooldown between two attacks of the same agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackTimer {
    pub interval: f32,
    pub remaining: f32,
}

impl AttackTimer {
    /// New timer that is ready to fire immediately
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            remaining: 0.0,
        }
    }

    pub fn tick(&mut self, delta_time: f32) {
        self.remaining = (self.remaining - delta_time).max(0.0);
    }

    pub fn ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn reset(&mut self) {
        self.remaining = self.interval;
    }
}

impl Default for AttackTimer {
    fn default() -> Self {
        Self::new(1.0)
    }
}
