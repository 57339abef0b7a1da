use crate::components::{Agent, AgentProfile, Category, Targetable};
use crate::game_logic::errors::{RampartError, RampartResult};
use crate::pathfinding::WallGrid;
use crate::world::Battlefield;
use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationErrors};

/// A complete siege setup: what is defended, what stands in the way and who attacks
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Scenario {
    pub name: String,
    #[validate(nested)]
    pub goal: GoalSpec,
    #[validate(nested)]
    pub grid: Option<GridSpec>,
    #[serde(default)]
    #[validate(nested)]
    pub walls: Vec<ObstacleSpec>,
    #[serde(default)]
    #[validate(nested)]
    pub defenders: Vec<ObstacleSpec>,
    #[serde(default)]
    #[validate(nested)]
    pub vegetation: Vec<ObstacleSpec>,
    #[serde(default)]
    #[validate(nested)]
    pub structures: Vec<ObstacleSpec>,
    #[validate(length(min = 1), nested)]
    pub waves: Vec<WaveSpec>,
    /// Seed for spawn jitter, so runs are reproducible
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct GoalSpec {
    pub position: Vec2,
    #[validate(range(min = 1.0, max = 1000.0))]
    pub radius: f32,
}

/// Any static circular entity: wall, defender, tree or building
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct ObstacleSpec {
    pub position: Vec2,
    #[validate(range(min = 0.5, max = 1000.0))]
    pub radius: f32,
    #[validate(range(min = 1.0, max = 1_000_000.0))]
    pub health: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct GridSpec {
    /// World position of the center of cell (0, 0)
    pub origin: Vec2,
    #[validate(range(min = 1, max = 512))]
    pub width: u32,
    #[validate(range(min = 1, max = 512))]
    pub height: u32,
    #[validate(range(min = 1.0, max = 1000.0))]
    pub cell_size: f32,
}

/// A batch of agents spawned around one point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct WaveSpec {
    pub spawn_center: Vec2,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub spawn_jitter: f32,
    #[validate(range(min = 1, max = 1000))]
    pub count: u32,
    #[serde(default)]
    #[validate(nested)]
    pub profile: AgentProfile,
}

impl ObstacleSpec {
    pub fn new(x: f32, y: f32, radius: f32, health: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            radius,
            health,
        }
    }
}

impl GridSpec {
    pub fn build(&self) -> RampartResult<WallGrid> {
        WallGrid::new(self.origin, self.width, self.height, self.cell_size)
    }
}

fn describe(errors: &ValidationErrors) -> String {
    errors
        .errors()
        .iter()
        .map(|(field, kind)| format!("{field}: {kind:?}"))
        .collect::<Vec<String>>()
        .join("; ")
}

impl Scenario {
    /// Built-in siege used when no scenario file is given
    ///
    /// A fortified line of walls sits on a grid above the goal with a single
    /// opening, a few loose walls and trees dot the approach and two defenders
    /// guard the line.
    pub fn demo() -> Self {
        let grid = GridSpec {
            origin: Vec2::new(-200.0, -200.0),
            width: 11,
            height: 6,
            cell_size: 40.0,
        };

        // Top row of the grid, open at column 7
        let top_y = grid.origin.y + (grid.height - 1) as f32 * grid.cell_size;
        let mut walls: Vec<ObstacleSpec> = (0..grid.width)
            .filter(|col| *col != 7)
            .map(|col| {
                let x = grid.origin.x + col as f32 * grid.cell_size;
                ObstacleSpec::new(x, top_y, 18.0, 120.0)
            })
            .collect();
        // A spur inside the grid forcing a turn
        walls.extend((3..7).map(|col| {
            let x = grid.origin.x + col as f32 * grid.cell_size;
            ObstacleSpec::new(x, grid.origin.y + 2.0 * grid.cell_size, 18.0, 120.0)
        }));
        walls.push(ObstacleSpec::new(-60.0, 300.0, 40.0, 200.0));
        walls.push(ObstacleSpec::new(120.0, 420.0, 35.0, 200.0));

        Self {
            name: "demo".to_string(),
            goal: GoalSpec {
                position: Vec2::new(0.0, -400.0),
                radius: 30.0,
            },
            grid: Some(grid),
            walls,
            defenders: vec![
                ObstacleSpec::new(-260.0, 120.0, 15.0, 60.0),
                ObstacleSpec::new(260.0, 120.0, 15.0, 60.0),
            ],
            vegetation: vec![ObstacleSpec::new(-300.0, 520.0, 25.0, 40.0)],
            structures: vec![ObstacleSpec::new(350.0, -250.0, 45.0, 400.0)],
            waves: vec![
                WaveSpec {
                    spawn_center: Vec2::new(0.0, 650.0),
                    spawn_jitter: 120.0,
                    count: 12,
                    profile: AgentProfile::default(),
                },
                WaveSpec {
                    spawn_center: Vec2::new(400.0, 600.0),
                    spawn_jitter: 60.0,
                    count: 6,
                    profile: AgentProfile {
                        speed: 90.0,
                        radius: 14.0,
                        health: 60.0,
                        ..AgentProfile::default()
                    },
                },
            ],
            seed: 7,
        }
    }

    /// Read and validate a TOML scenario
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> RampartResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RampartError::ConfigFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = toml::from_str(&contents)?;
        scenario.check()?;

        info!(
            "Loaded scenario '{}' with {} walls and {} waves",
            scenario.name,
            scenario.walls.len(),
            scenario.waves.len()
        );
        Ok(scenario)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RampartResult<()> {
        self.check()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Field ranges plus the grid shape
    pub fn check(&self) -> RampartResult<()> {
        self.validate()
            .map_err(|validation_errors| RampartError::InvalidScenario {
                reason: format!(
                    "Scenario '{}' is invalid: {}",
                    self.name,
                    describe(&validation_errors)
                ),
            })?;

        if let Some(grid) = &self.grid {
            grid.build()?;
        }
        Ok(())
    }

    /// Empty battlefield carrying this scenario's grid, if any
    pub fn battlefield(&self) -> RampartResult<Battlefield> {
        let battlefield = Battlefield::new();
        match &self.grid {
            Some(grid) => Ok(battlefield.with_grid(grid.build()?)),
            None => Ok(battlefield),
        }
    }

    /// Every static entity of the scenario
    pub fn targetables(&self) -> Vec<Targetable> {
        let mut targetables = vec![Targetable::goal(self.goal.position, self.goal.radius)];
        targetables.extend(
            self.walls
                .iter()
                .map(|w| Targetable::wall(w.position, w.radius, w.health)),
        );
        targetables.extend(
            self.defenders
                .iter()
                .map(|d| Targetable::defender(d.position, d.radius, d.health)),
        );
        targetables.extend(
            self.vegetation
                .iter()
                .map(|v| Targetable::new(Category::Vegetation, v.position, v.radius, v.health)),
        );
        targetables.extend(
            self.structures
                .iter()
                .map(|s| Targetable::new(Category::Structure, s.position, s.radius, s.health)),
        );
        targetables
    }

    /// Every agent of every wave, spawn points jittered with the scenario seed
    pub fn agents(&self) -> Vec<Agent> {
        let mut rng = Pcg64::seed_from_u64(self.seed);
        let mut agents = Vec::new();

        for wave in &self.waves {
            let jitter = wave.spawn_jitter.max(0.0);
            for _ in 0..wave.count {
                let offset = Vec2::new(
                    rng.gen_range(-jitter..=jitter),
                    rng.gen_range(-jitter..=jitter),
                );
                agents.push(Agent::new(wave.spawn_center + offset, &wave.profile));
            }
        }
        agents
    }

    /// Populate a Bevy world: the battlefield resource, one entity per
    /// targetable and one per agent. Returns the number of agents spawned.
    pub fn spawn_into(&self, world: &mut World) -> RampartResult<usize> {
        self.check()?;
        world.insert_resource(self.battlefield()?);

        for targetable in self.targetables() {
            world.spawn(targetable);
        }

        let agents = self.agents();
        let count = agents.len();
        for agent in agents {
            world.spawn(agent);
        }

        info!("Scenario '{}' spawned {} agents", self.name, count);
        Ok(count)
    }
}
