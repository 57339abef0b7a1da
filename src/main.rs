use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use clap::Parser;
use rampart::components::{Agent, Category};
use rampart::config::{load_config, load_config_from, save_config};
use rampart::plugins::SiegePlugin;
use rampart::resources::SiegeStats;
use rampart::scenario::Scenario;
use rampart::world::Battlefield;
use rampart::RampartResult;
use std::path::PathBuf;
use std::time::Duration;

/// Longest tick the virtual clock accepts without clamping
const MAX_TICK_SECS: f32 = 0.25;

#[derive(Parser, Clone)]
#[command(name = "rampart")]
#[command(about = "Run a headless siege and report how the attackers fared")]
struct Args {
    /// Scenario TOML file; the built-in demo is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "1200")]
    ticks: u32,

    /// Seconds of simulated time per tick
    #[arg(long, default_value = "0.1")]
    dt: f32,

    /// Override the scenario's spawn seed
    #[arg(long)]
    seed: Option<u64>,

    /// Navigation settings file instead of the user config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store the navigation settings in use as the user config
    #[arg(long)]
    save_config: bool,

    /// Write the scenario to this path and exit without simulating
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> RampartResult<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    if args.save_config {
        save_config(&config)?;
    }

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load_from_file(path)?,
        None => Scenario::demo(),
    };
    if let Some(seed) = args.seed {
        scenario.seed = seed;
    }

    if let Some(path) = &args.export {
        scenario.save_to_file(path)?;
        println!("Scenario '{}' written to {}", scenario.name, path.display());
        return Ok(());
    }

    let dt = args.dt.clamp(0.001, MAX_TICK_SECS);

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(config.settings.clone())
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(dt)))
        .add_plugins(SiegePlugin);
    app.finish();
    app.cleanup();

    if dt != args.dt {
        warn!("Tick length {} s clamped to {} s", args.dt, dt);
    }

    let spawned = scenario.spawn_into(app.world_mut())?;

    let mut ticks_run = 0;
    while ticks_run < args.ticks {
        app.update();
        ticks_run += 1;
        if remaining_agents(&mut app) == 0 {
            break;
        }
    }

    print_summary(&mut app, &scenario, spawned, ticks_run, dt);
    Ok(())
}

fn remaining_agents(app: &mut App) -> usize {
    let world = app.world_mut();
    world.query::<&Agent>().iter(world).count()
}

fn print_summary(app: &mut App, scenario: &Scenario, spawned: usize, ticks_run: u32, dt: f32) {
    let remaining = remaining_agents(app);
    let stats = *app.world().resource::<SiegeStats>();
    let walls_left = app
        .world()
        .resource::<Battlefield>()
        .count(Category::Wall);

    println!("Siege '{}' finished", scenario.name);
    println!(
        "  Simulated {} ticks ({:.1} s)",
        ticks_run,
        ticks_run as f32 * dt
    );
    println!("  Agents spawned:   {spawned}");
    println!("  Reached the goal: {}", stats.agents_arrived);
    println!("  Killed:           {}", stats.agents_killed);
    println!("  Still marching:   {remaining}");
    println!("  Attacks landed:   {}", stats.attacks);
    println!(
        "  Walls destroyed:  {} ({} left standing)",
        stats.walls_destroyed, walls_left
    );
}
