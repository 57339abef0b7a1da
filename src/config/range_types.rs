use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A target detection radius constrained to [10.0, 5000.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct DetectionRadius(f32);

impl DetectionRadius {
    const MIN: f32 = 10.0;
    const MAX: f32 = 5000.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for DetectionRadius {
    fn default() -> Self {
        Self::new(200.0)
    }
}

/// Distance between samples when walking a straight path, constrained to [5.0, 500.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct SampleStep(f32);

impl SampleStep {
    const MIN: f32 = 5.0;
    const MAX: f32 = 500.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for SampleStep {
    fn default() -> Self {
        Self::new(50.0)
    }
}

/// Half width of the corridor swept along a path, constrained to [0.0, 1000.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct CorridorHalfWidth(f32);

impl CorridorHalfWidth {
    const MIN: f32 = 0.0;
    const MAX: f32 = 1000.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for CorridorHalfWidth {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Extra space kept between an agent and an obstacle, constrained to [0.0, 200.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct Clearance(f32);

impl Clearance {
    const MIN: f32 = 0.0;
    const MAX: f32 = 200.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Clearance {
    fn default() -> Self {
        Self::new(10.0)
    }
}

/// Gap allowed between two obstacles that still count as touching, constrained to [0.0, 100.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct AdjacencyTolerance(f32);

impl AdjacencyTolerance {
    const MIN: f32 = 0.0;
    const MAX: f32 = 100.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for AdjacencyTolerance {
    fn default() -> Self {
        Self::new(5.0)
    }
}

/// Distance at which a waypoint counts as reached, constrained to [1.0, 100.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct ArrivalTolerance(f32);

impl ArrivalTolerance {
    const MIN: f32 = 1.0;
    const MAX: f32 = 100.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for ArrivalTolerance {
    fn default() -> Self {
        Self::new(10.0)
    }
}

/// Seconds of simulated time between grid path checks, constrained to [0.05, 10.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct RevalidationInterval(f32);

impl RevalidationInterval {
    const MIN: f32 = 0.05;
    const MAX: f32 = 10.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for RevalidationInterval {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// Granularity that side-step offsets are rounded up to, constrained to [1.0, 200.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct OffsetStep(f32);

impl OffsetStep {
    const MIN: f32 = 1.0;
    const MAX: f32 = 200.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Round a raw offset up to the next multiple of this step
    pub fn round_up(self, offset: f32) -> f32 {
        (offset.max(0.0) / self.0).ceil() * self.0
    }
}

impl Default for OffsetStep {
    fn default() -> Self {
        Self::new(10.0)
    }
}

/// Seconds an agent may stay stuck before it drops its target, constrained to [0.5, 120.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)]
#[serde(from = "f32")]
pub struct RetargetDelay(f32);

impl RetargetDelay {
    const MIN: f32 = 0.5;
    const MAX: f32 = 120.0;

    pub fn new(value: f32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for RetargetDelay {
    fn default() -> Self {
        Self::new(4.0)
    }
}

/// Values read from config files go through the same clamp as `new`
macro_rules! clamp_on_load {
    ($($name:ident),* $(,)?) => {
        $(
            impl From<f32> for $name {
                fn from(value: f32) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

clamp_on_load!(
    DetectionRadius,
    SampleStep,
    CorridorHalfWidth,
    Clearance,
    AdjacencyTolerance,
    ArrivalTolerance,
    RevalidationInterval,
    OffsetStep,
    RetargetDelay,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_radius_clamping() {
        assert_eq!(DetectionRadius::new(1.0).get(), 10.0);
        assert_eq!(DetectionRadius::new(200.0).get(), 200.0);
        assert_eq!(DetectionRadius::new(1.0e6).get(), 5000.0);
    }

    #[test]
    fn test_revalidation_interval_default() {
        assert_eq!(RevalidationInterval::default().get(), 0.5);
    }

    #[test]
    fn test_offset_step_round_up() {
        let step = OffsetStep::new(10.0);
        assert_eq!(step.round_up(61.0), 70.0);
        assert_eq!(step.round_up(70.0), 70.0);
        assert_eq!(step.round_up(-5.0), 0.0);
    }

    #[test]
    fn test_range_types_serialize_transparently() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            radius: DetectionRadius,
        }

        let text = toml::to_string(&Wrapper {
            radius: DetectionRadius::new(250.0),
        })
        .unwrap();
        assert!(text.contains("radius = 250"));

        let parsed: Wrapper = toml::from_str("radius = 120.0").unwrap();
        assert_eq!(parsed.radius.get(), 120.0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped_on_load() {
        #[derive(Deserialize)]
        struct Wrapper {
            step: SampleStep,
            radius: DetectionRadius,
        }

        let parsed: Wrapper = toml::from_str("step = 0.0001\nradius = -50.0").unwrap();
        assert_eq!(parsed.step.get(), 5.0);
        assert_eq!(parsed.radius.get(), 10.0);
    }
}
