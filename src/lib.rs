pub mod components;
pub mod config;
pub mod game_logic;
pub mod geometry;
pub mod navigation;
pub mod pathfinding;
pub mod plugins;
pub mod resources;
pub mod scenario;
pub mod world;

// Selective re-exports for external consumers

// Plugins - the headless binary needs the siege plugin
pub use plugins::*;

// Errors for everything that loads files or builds grids
pub use game_logic::errors::{RampartError, RampartResult};

// The navigation entry points and the concrete battlefield
pub use navigation::{NavWorld, SpatialRegistry, TickReport, tick};
pub use world::Battlefield;
