use crate::config::range_types::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Running totals for a siege, updated by the siege plugin
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SiegeStats {
    pub agents_arrived: u32,
    pub agents_killed: u32,
    pub walls_destroyed: u32,
    pub attacks: u32,
}

const MAX_FAN_OFFSET: f32 = 10000.0;
const MAX_SEPARATION_RADIUS: f32 = 500.0;
const MAX_SEPARATION_WEIGHT: f32 = 5.0;

#[derive(Resource, Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct RampartConfig {
    pub settings: NavigationSettings,
}

#[derive(Resource, Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
// NOTE: When adding new fields, keep the Default impl and the config tests in sync
pub struct NavigationSettings {
    // Targeting
    pub detection_radius: DetectionRadius,
    pub stuck_retarget_delay: RetargetDelay,

    // Blockage analysis
    pub sample_step: SampleStep,
    pub corridor_half_width: CorridorHalfWidth,
    pub blockage_margin: Clearance,
    pub adjacency_tolerance: AdjacencyTolerance,

    // Detour planning
    pub side_step_granularity: OffsetStep,
    pub fan_offsets: Vec<f32>,
    pub fan_angles_deg: Vec<f32>,
    pub map_min: Vec2,
    pub map_max: Vec2,

    // Arrival checks
    pub detour_arrival_tolerance: ArrivalTolerance,
    pub gap_arrival_tolerance: ArrivalTolerance,
    pub grid_waypoint_tolerance: ArrivalTolerance,
    pub goal_arrival_tolerance: ArrivalTolerance,

    // Grid pathfinding
    pub path_revalidation_interval: RevalidationInterval,

    // Local avoidance between agents
    pub separation_radius: f32,
    pub separation_weight: f32,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            detection_radius: DetectionRadius::new(200.0),
            stuck_retarget_delay: RetargetDelay::new(4.0),

            sample_step: SampleStep::new(50.0),
            corridor_half_width: CorridorHalfWidth::new(100.0),
            blockage_margin: Clearance::new(10.0),
            adjacency_tolerance: AdjacencyTolerance::new(5.0),

            side_step_granularity: OffsetStep::new(10.0),
            fan_offsets: (1..=15).map(|i| i as f32 * 50.0).collect(), // 50..=750
            fan_angles_deg: (1..=9).map(|i| i as f32 * 10.0).collect(), // 10..=90
            map_min: Vec2::splat(-5000.0),
            map_max: Vec2::splat(5000.0),

            detour_arrival_tolerance: ArrivalTolerance::new(10.0),
            gap_arrival_tolerance: ArrivalTolerance::new(8.0),
            grid_waypoint_tolerance: ArrivalTolerance::new(10.0),
            goal_arrival_tolerance: ArrivalTolerance::new(5.0),

            path_revalidation_interval: RevalidationInterval::new(0.5),

            separation_radius: 30.0,
            separation_weight: 0.5,
        }
    }
}

impl NavigationSettings {
    /// Clamp a point into the playable map rectangle
    pub fn clamp_to_map(&self, point: Vec2) -> Vec2 {
        let min = self.map_min.min(self.map_max);
        let max = self.map_min.max(self.map_max);
        point.clamp(min, max)
    }

    /// Bring the settings without a clamped newtype back into a usable range
    ///
    /// Returns true when anything had to change.
    pub fn sanitize(&mut self) -> bool {
        let defaults = Self::default();
        let before = (
            self.fan_offsets.clone(),
            self.fan_angles_deg.clone(),
            self.separation_radius,
            self.separation_weight,
        );

        self.fan_offsets
            .retain(|offset| offset.is_finite() && *offset > 0.0 && *offset <= MAX_FAN_OFFSET);
        self.fan_offsets.sort_by(f32::total_cmp);
        self.fan_offsets.dedup();
        if self.fan_offsets.is_empty() {
            self.fan_offsets = defaults.fan_offsets;
        }

        self.fan_angles_deg
            .retain(|angle| angle.is_finite() && *angle > 0.0 && *angle <= 180.0);
        if self.fan_angles_deg.is_empty() {
            self.fan_angles_deg = defaults.fan_angles_deg;
        }

        self.separation_radius = if self.separation_radius.is_finite() {
            self.separation_radius.clamp(0.0, MAX_SEPARATION_RADIUS)
        } else {
            defaults.separation_radius
        };
        self.separation_weight = if self.separation_weight.is_finite() {
            self.separation_weight.clamp(0.0, MAX_SEPARATION_WEIGHT)
        } else {
            defaults.separation_weight
        };

        before
            != (
                self.fan_offsets.clone(),
                self.fan_angles_deg.clone(),
                self.separation_radius,
                self.separation_weight,
            )
    }

    /// Space a detour must keep from an obstacle's edge, beyond the agent's own radius
    pub fn detour_clearance(&self) -> f32 {
        self.blockage_margin.get() + self.detour_arrival_tolerance.get()
    }
}
