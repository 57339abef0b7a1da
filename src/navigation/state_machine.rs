//! Per-tick navigation of a single agent
//!
//! [`tick`] is the one transition function: it validates cached state, picks a
//! target, decides how to steer (grid route, gap above the grid, detour or a
//! straight line) and finally moves or attacks.

use crate::components::{Agent, Category, NavState};
use crate::game_logic::{blend_separation, in_attack_range, step_towards};
use crate::navigation::{
    AttackEvent, DetourPlan, EntityRef, SpatialRegistry, find_blocking_obstacle, group,
    nearest_wall, plan_detour, select_target,
};
use crate::pathfinding::{
    GridCell, GridPath, GridZone, ObstacleGrid, classify_position, find_path_to_goal_row,
    find_top_row_gap, is_passable, path_still_valid,
};
use crate::resources::NavigationSettings;
use bevy::prelude::*;

/// Share of the last step that must actually be covered to count as progress
const MIN_PROGRESS_RATIO: f32 = 0.25;

/// Everything an agent reads during its tick
pub struct NavWorld<'a, R: ?Sized, G: ?Sized> {
    pub registry: &'a R,
    pub grid: Option<&'a G>,
    pub settings: &'a NavigationSettings,
    /// Simulated seconds since the siege started
    pub now: f32,
}

/// What happened to the agent this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub state: NavState,
    pub attack: Option<AttackEvent>,
    pub reached_goal: bool,
    pub displacement: Vec2,
}

impl TickReport {
    fn idle(state: NavState) -> Self {
        Self {
            state,
            attack: None,
            reached_goal: false,
            displacement: Vec2::ZERO,
        }
    }
}

/// Steering decision for the current tick
#[derive(Debug, Clone, Copy)]
enum Steer {
    Hold,
    Toward(Vec2),
    /// Close in on the entity and hit it once in range
    Engage(EntityRef),
}

/// Advance one agent by `delta_time` seconds
///
/// `separation` is the local avoidance push from nearby agents; it bends the
/// heading but never the distance travelled.
pub fn tick<R, G>(
    agent: &mut Agent,
    world: &NavWorld<'_, R, G>,
    delta_time: f32,
    separation: Vec2,
) -> TickReport
where
    R: SpatialRegistry + ?Sized,
    G: ObstacleGrid + ?Sized,
{
    if agent.is_dead() {
        if agent.state != NavState::Dead {
            info!("Agent at ({:.0}, {:.0}) died", agent.position.x, agent.position.y);
            agent.state = NavState::Dead;
            agent.target = None;
            agent.clear_plans();
        }
        return TickReport::idle(NavState::Dead);
    }
    if agent.reached_goal {
        return TickReport::idle(agent.state);
    }

    agent.attack_timer.tick(delta_time);
    update_stuck_timer(agent, delta_time);
    invalidate_stale_plans(agent, world);

    let goal = world.registry.goal().filter(|goal| goal.alive);
    if let Some(goal) = goal {
        let arrival = goal.radius + world.settings.goal_arrival_tolerance.get();
        if agent.position.distance(goal.position) <= arrival {
            info!(
                "Agent reached the goal at ({:.0}, {:.0})",
                goal.position.x, goal.position.y
            );
            agent.reached_goal = true;
            agent.target = None;
            agent.clear_plans();
            agent.state = NavState::Seeking;
            return TickReport {
                reached_goal: true,
                ..TickReport::idle(NavState::Seeking)
            };
        }
    }

    if agent.blocked_secs > world.settings.stuck_retarget_delay.get() {
        warn!(
            "Agent stuck for {:.1}s at ({:.0}, {:.0}), dropping its target",
            agent.blocked_secs, agent.position.x, agent.position.y
        );
        agent.target = None;
        agent.unavoidable.clear();
        agent.clear_plans();
        agent.blocked_secs = 0.0;
    }

    let unavoidable: Vec<EntityRef> = agent
        .unavoidable
        .iter()
        .filter_map(|entity| world.registry.get(*entity))
        .filter(|wall| wall.alive)
        .collect();
    let target = select_target(agent, world.registry, world.settings, &unavoidable);
    agent.target = target.map(|t| t.entity);

    let steer = match target {
        None => {
            agent.state = NavState::Seeking;
            Steer::Hold
        }
        Some(target) if target.category == Category::Wall => {
            agent.clear_plans();
            agent.state = NavState::Seeking;
            Steer::Engage(target)
        }
        Some(target) if target.category != Category::Goal && within_reach(agent, &target) => {
            agent.clear_plans();
            Steer::Engage(target)
        }
        Some(target) => navigate(agent, world, target),
    };

    act(agent, world.settings, steer, delta_time, separation)
}

fn within_reach(agent: &Agent, target: &EntityRef) -> bool {
    in_attack_range(
        agent.position,
        agent.radius,
        target.position,
        target.radius,
        agent.attack_range.0,
    )
}

/// Compare how far the agent really got from where its last step started.
/// Being pushed back by the host counts as stuck; holding still on purpose
/// does not.
fn update_stuck_timer(agent: &mut Agent, delta_time: f32) {
    let travelled = agent.position.distance(agent.last_position);
    if agent.last_step > 0.0 && travelled < agent.last_step * MIN_PROGRESS_RATIO {
        agent.blocked_secs += delta_time;
    } else {
        agent.blocked_secs = 0.0;
    }
}

/// Drop cached plans that no longer describe the battlefield
fn invalidate_stale_plans<R, G>(agent: &mut Agent, world: &NavWorld<'_, R, G>)
where
    R: SpatialRegistry + ?Sized,
    G: ObstacleGrid + ?Sized,
{
    let epoch = world.registry.wall_epoch();
    if epoch != agent.wall_epoch {
        if agent.has_plan() {
            debug!("Walls changed since the last plan, replanning");
        }
        agent.wall_epoch = epoch;
        agent.clear_plans();
        agent.unavoidable.clear();
    }

    if let Some(entity) = agent.target {
        let gone = world
            .registry
            .get(entity)
            .is_none_or(|target| !target.alive);
        if gone {
            debug!("Target {entity:?} is gone");
            agent.target = None;
            agent.clear_plans();
        }
    }
}

/// Work out how to get to a non-wall target that is not yet in reach
fn navigate<R, G>(agent: &mut Agent, world: &NavWorld<'_, R, G>, target: EntityRef) -> Steer
where
    R: SpatialRegistry + ?Sized,
    G: ObstacleGrid + ?Sized,
{
    if let Some(grid) = world.grid {
        match classify_position(grid, agent.position) {
            GridZone::Inside(_) | GridZone::Above if agent.gap_waypoint.is_some() => {
                return approach_gap(agent, world, grid, target);
            }
            GridZone::Above => return approach_gap(agent, world, grid, target),
            GridZone::Inside(cell) => return follow_grid(agent, world, grid, cell, target),
            GridZone::PastBottom | GridZone::Beside => {
                agent.gap_waypoint = None;
                agent.grid_path.clear();
            }
        }
    }

    let settings = world.settings;
    if let Some(waypoint) = agent.detour_waypoint {
        if agent.position.distance(waypoint) > settings.detour_arrival_tolerance.get() {
            agent.state = NavState::Detouring;
            return Steer::Toward(waypoint);
        }
        debug!("Detour waypoint ({:.0}, {:.0}) reached", waypoint.x, waypoint.y);
        agent.detour_waypoint = None;
    }

    let Some(blockage) =
        find_blocking_obstacle(agent, target.position, world.registry, world.grid, settings)
    else {
        agent.unavoidable.clear();
        agent.state = NavState::Seeking;
        return Steer::Engage(target);
    };

    let clusters = group(&blockage.obstacles, settings.adjacency_tolerance.get());
    match plan_detour(
        agent,
        target.position,
        &blockage,
        &clusters,
        world.registry,
        settings,
    ) {
        DetourPlan::Clear => {
            agent.state = NavState::Seeking;
            Steer::Engage(target)
        }
        DetourPlan::Waypoint(point)
            if agent.position.distance(point) <= settings.detour_arrival_tolerance.get() =>
        {
            agent.state = NavState::Seeking;
            Steer::Engage(target)
        }
        DetourPlan::Waypoint(point) => {
            debug!(
                "Detouring around {} wall(s) via ({:.0}, {:.0})",
                blockage.obstacles.len(),
                point.x,
                point.y
            );
            agent.set_detour(point);
            agent.state = NavState::Detouring;
            Steer::Toward(point)
        }
        DetourPlan::Unavoidable => {
            warn!(
                "No way around {} wall(s) near ({:.0}, {:.0}), attacking",
                blockage.obstacles.len(),
                agent.position.x,
                agent.position.y
            );
            agent.unavoidable = blockage.obstacles.iter().map(|wall| wall.entity).collect();
            let position = agent.position;
            let nearest = blockage
                .obstacles
                .iter()
                .filter(|wall| wall.alive)
                .min_by(|a, b| {
                    let da = a.position.distance(position) - a.radius;
                    let db = b.position.distance(position) - b.radius;
                    da.total_cmp(&db)
                })
                .copied()
                .unwrap_or(blockage.blocker);
            agent.target = Some(nearest.entity);
            agent.state = NavState::Seeking;
            Steer::Engage(nearest)
        }
    }
}

/// Fallback when the grid offers no way through
fn engage_nearest_wall<R, G>(agent: &mut Agent, world: &NavWorld<'_, R, G>, fallback: EntityRef) -> Steer
where
    R: SpatialRegistry + ?Sized,
    G: ObstacleGrid + ?Sized,
{
    agent.clear_plans();
    agent.state = NavState::Seeking;
    match nearest_wall(world.registry, agent.position, world.settings.detection_radius.get()) {
        Some(wall) => {
            agent.target = Some(wall.entity);
            Steer::Engage(wall)
        }
        None => Steer::Engage(fallback),
    }
}

fn approach_gap<R, G>(
    agent: &mut Agent,
    world: &NavWorld<'_, R, G>,
    grid: &G,
    target: EntityRef,
) -> Steer
where
    R: SpatialRegistry + ?Sized,
    G: ObstacleGrid + ?Sized,
{
    let still_open = |point: Vec2| {
        grid.world_to_grid(point)
            .is_some_and(|cell| is_passable(grid, world.registry, cell))
    };

    let gap = match agent.gap_waypoint {
        Some(gap) if still_open(gap) => gap,
        _ => match find_top_row_gap(grid, world.registry, agent.position) {
            Some(cell) => {
                let gap = grid.grid_to_world(cell);
                debug!("Heading for top row gap at column {}", cell.col);
                agent.set_gap(gap);
                gap
            }
            None => {
                warn!("Top row of the grid is sealed, attacking the nearest wall");
                return engage_nearest_wall(agent, world, target);
            }
        },
    };

    if agent.position.distance(gap) <= world.settings.gap_arrival_tolerance.get() {
        agent.position = gap;
        agent.gap_waypoint = None;
        agent.state = NavState::GridPathfinding;
        return Steer::Hold;
    }

    agent.state = NavState::ApproachingGapAboveGrid;
    Steer::Toward(gap)
}

fn follow_grid<R, G>(
    agent: &mut Agent,
    world: &NavWorld<'_, R, G>,
    grid: &G,
    cell: GridCell,
    target: EntityRef,
) -> Steer
where
    R: SpatialRegistry + ?Sized,
    G: ObstacleGrid + ?Sized,
{
    agent.detour_waypoint = None;
    agent.gap_waypoint = None;

    let due = world.now - agent.last_path_check >= world.settings.path_revalidation_interval.get();
    let needs_route = agent.grid_path.is_empty()
        || (due && !path_still_valid(grid, world.registry, &agent.grid_path));

    if needs_route {
        if !agent.grid_path.is_empty() {
            debug!("Grid path blocked, recomputing from ({}, {})", cell.col, cell.row);
        }
        agent.last_path_check = world.now;
        match find_path_to_goal_row(grid, world.registry, cell) {
            Some(cells) if !cells.is_empty() => {
                agent.set_grid_path(GridPath::from_cells(grid, &cells));
            }
            _ => {
                warn!(
                    "No grid path from ({}, {}) to the goal row, attacking the nearest wall",
                    cell.col, cell.row
                );
                return engage_nearest_wall(agent, world, target);
            }
        }
    } else if due {
        agent.last_path_check = world.now;
    }

    agent.state = NavState::GridPathfinding;
    let Some(waypoint) = agent.grid_path.current() else {
        agent.state = NavState::Seeking;
        return Steer::Engage(target);
    };

    if agent.position.distance(waypoint.world) > world.settings.grid_waypoint_tolerance.get() {
        return Steer::Toward(waypoint.world);
    }

    agent.grid_path.advance();
    if waypoint.cell.row == 0 {
        debug!("Grid crossed at column {}", waypoint.cell.col);
        agent.grid_path.clear();
        agent.state = NavState::Seeking;
        return Steer::Engage(target);
    }

    match agent.grid_path.current_waypoint() {
        Some(next) => Steer::Toward(next),
        None => {
            agent.state = NavState::Seeking;
            Steer::Engage(target)
        }
    }
}

/// Carry out the steering decision: move, or hit what is in reach
fn act(
    agent: &mut Agent,
    settings: &NavigationSettings,
    steer: Steer,
    delta_time: f32,
    separation: Vec2,
) -> TickReport {
    let mut attack = None;
    let destination = match steer {
        Steer::Hold => None,
        Steer::Toward(point) => Some(point),
        Steer::Engage(target) if target.category != Category::Goal && within_reach(agent, &target) => {
            agent.state = NavState::Attacking;
            if agent.attack_timer.ready() {
                attack = Some(AttackEvent {
                    target: target.entity,
                    amount: agent.attack_damage.0,
                });
                agent.attack_timer.reset();
            }
            None
        }
        Steer::Engage(target) => Some(target.position),
    };

    let displacement = destination
        .map(|point| {
            let step = step_towards(agent.position, point, agent.speed.0, delta_time);
            blend_separation(step, separation, settings.separation_weight)
        })
        .unwrap_or(Vec2::ZERO);

    agent.last_position = agent.position;
    agent.position += displacement;
    agent.last_step = displacement.length();

    TickReport {
        state: agent.state,
        attack,
        reached_goal: false,
        displacement,
    }
}
