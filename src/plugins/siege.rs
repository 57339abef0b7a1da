use crate::{components::*, game_logic::separation_force, navigation::*, resources::*, world::Battlefield};
use bevy::prelude::*;

pub struct SiegePlugin;

impl Plugin for SiegePlugin {
    fn build(&self, app: &mut App) {
        // Hosts may insert their own settings or battlefield before adding the plugin
        app.init_resource::<NavigationSettings>()
            .init_resource::<SiegeStats>()
            .init_resource::<Battlefield>()
            .add_event::<DamageEvent>()
            .add_event::<GoalReached>()
            .add_event::<AgentDied>()
            .add_systems(
                Update,
                (
                    sync_battlefield,
                    drive_agents,
                    apply_damage_events,
                    despawn_finished_agents,
                )
                    .chain(),
            );
    }
}

/// An agent landed a hit
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub attacker: Entity,
    pub target: Entity,
    pub amount: f32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalReached {
    pub agent: Entity,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentDied {
    pub agent: Entity,
}

/// Mirror every targetable entity into the battlefield registry
fn sync_battlefield(mut battlefield: ResMut<Battlefield>, targetables: Query<(Entity, &Targetable)>) {
    battlefield.begin_sync();
    for (entity, targetable) in targetables.iter() {
        battlefield.insert(entity, targetable);
    }
    let removed = battlefield.end_sync();
    if removed > 0 {
        debug!("{removed} entities left the battlefield");
    }
}

fn drive_agents(
    time: Res<Time>,
    settings: Res<NavigationSettings>,
    battlefield: Res<Battlefield>,
    mut stats: ResMut<SiegeStats>,
    mut agent_query: Query<(Entity, &mut Agent)>,
    mut damage_events: EventWriter<DamageEvent>,
    mut goal_events: EventWriter<GoalReached>,
    mut death_events: EventWriter<AgentDied>,
) {
    let world = NavWorld {
        registry: &*battlefield,
        grid: battlefield.grid(),
        settings: &*settings,
        now: time.elapsed_secs(),
    };
    let delta_time = time.delta_secs();

    // First pass: collect active agent positions for separation
    let positions: Vec<(Entity, Vec2)> = agent_query
        .iter()
        .filter(|(_, agent)| !agent.is_dead() && !agent.reached_goal)
        .map(|(entity, agent)| (entity, agent.position))
        .collect();

    // Second pass: one navigation tick per agent
    for (entity, mut agent) in agent_query.iter_mut() {
        let was_dead = agent.state == NavState::Dead;
        let neighbours: Vec<Vec2> = positions
            .iter()
            .filter(|(other, _)| *other != entity)
            .map(|(_, position)| *position)
            .collect();
        let separation = separation_force(agent.position, &neighbours, settings.separation_radius);

        let report = tick(&mut agent, &world, delta_time, separation);

        if report.state == NavState::Dead && !was_dead {
            stats.agents_killed += 1;
            death_events.write(AgentDied { agent: entity });
        }
        if report.reached_goal {
            stats.agents_arrived += 1;
            goal_events.write(GoalReached { agent: entity });
        }
        if let Some(attack) = report.attack {
            stats.attacks += 1;
            damage_events.write(DamageEvent {
                attacker: entity,
                target: attack.target,
                amount: attack.amount,
            });
        }
    }
}

fn apply_damage_events(
    mut commands: Commands,
    mut damage_events: EventReader<DamageEvent>,
    mut battlefield: ResMut<Battlefield>,
    mut stats: ResMut<SiegeStats>,
    mut targetable_query: Query<&mut Targetable>,
    mut agent_query: Query<&mut Agent>,
) {
    for event in damage_events.read() {
        if let Ok(mut targetable) = targetable_query.get_mut(event.target) {
            if !targetable.is_alive() {
                continue;
            }
            targetable.health.take_damage(Damage::new(event.amount));
            debug!(
                "{:?} {:?} hit for {:.0}, health {}",
                targetable.category, event.target, event.amount, targetable.health
            );
            AttackEvent {
                target: event.target,
                amount: event.amount,
            }
            .dispatch(&mut *battlefield);

            if !targetable.is_alive() {
                if targetable.category == Category::Wall {
                    stats.walls_destroyed += 1;
                }
                commands.entity(event.target).despawn();
            }
        } else if let Ok(mut agent) = agent_query.get_mut(event.target) {
            // Host-inflicted damage; the agent notices on its next tick
            agent.health.take_damage(Damage::new(event.amount));
        }
    }
}

fn despawn_finished_agents(mut commands: Commands, agent_query: Query<(Entity, &Agent)>) {
    for (entity, agent) in agent_query.iter() {
        if agent.state == NavState::Dead || agent.reached_goal {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::time::TimeUpdateStrategy;
    use std::time::Duration;

    fn siege_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, SiegePlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
        app
    }

    fn run(app: &mut App, frames: usize) {
        for _ in 0..frames {
            app.update();
        }
    }

    fn agent_count(app: &mut App) -> usize {
        let world = app.world_mut();
        world.query::<&Agent>().iter(world).count()
    }

    #[test]
    fn test_sync_mirrors_targetables() {
        let mut app = siege_app();
        let wall = app
            .world_mut()
            .spawn(Targetable::wall(Vec2::new(50.0, 50.0), 20.0, 40.0))
            .id();
        app.world_mut().spawn(Targetable::goal(Vec2::ZERO, 10.0));
        app.update();

        let battlefield = app.world().resource::<Battlefield>();
        assert_eq!(battlefield.len(), 2);
        assert_eq!(battlefield.count(Category::Wall), 1);

        app.world_mut().despawn(wall);
        app.update();
        let battlefield = app.world().resource::<Battlefield>();
        assert_eq!(battlefield.count(Category::Wall), 0);
        assert!(battlefield.get(wall).is_none());
    }

    #[test]
    fn test_agent_reaches_goal_and_is_removed() {
        let mut app = siege_app();
        app.world_mut()
            .spawn(Targetable::goal(Vec2::new(0.0, -200.0), 10.0));
        app.world_mut()
            .spawn(Agent::new(Vec2::ZERO, &AgentProfile::default()));

        run(&mut app, 80);

        assert_eq!(app.world().resource::<SiegeStats>().agents_arrived, 1);
        assert_eq!(agent_count(&mut app), 0);
    }

    #[test]
    fn test_agent_breaks_wall_it_targets() {
        let mut app = siege_app();
        app.world_mut()
            .spawn(Targetable::goal(Vec2::new(0.0, -1000.0), 10.0));
        let wall = app
            .world_mut()
            .spawn(Targetable::wall(Vec2::new(0.0, -60.0), 20.0, 20.0))
            .id();
        let mut agent = Agent::new(Vec2::ZERO, &AgentProfile::default());
        agent.target = Some(wall);
        app.world_mut().spawn(agent);

        run(&mut app, 40);

        let stats = *app.world().resource::<SiegeStats>();
        assert_eq!(stats.walls_destroyed, 1);
        assert!(stats.attacks >= 2);
        assert!(app.world().get_entity(wall).is_err(), "Destroyed wall should be despawned");
        assert_eq!(app.world().resource::<Battlefield>().count(Category::Wall), 0);
    }

    #[test]
    fn test_dead_agent_is_counted_and_despawned() {
        let mut app = siege_app();
        app.world_mut()
            .spawn(Targetable::goal(Vec2::new(0.0, -1000.0), 10.0));
        let agent = app
            .world_mut()
            .spawn(Agent::new(Vec2::ZERO, &AgentProfile::default()))
            .id();
        app.update();

        if let Some(mut agent) = app.world_mut().get_mut::<Agent>(agent) {
            agent.health.drain(1000.0);
        }
        run(&mut app, 2);

        assert_eq!(app.world().resource::<SiegeStats>().agents_killed, 1);
        assert_eq!(agent_count(&mut app), 0);
    }

    #[test]
    fn test_crowded_agents_spread_out() {
        let mut app = siege_app();
        app.world_mut()
            .spawn(Targetable::goal(Vec2::new(0.0, -2000.0), 10.0));
        let a = app
            .world_mut()
            .spawn(Agent::new(Vec2::new(-1.0, 0.0), &AgentProfile::default()))
            .id();
        let b = app
            .world_mut()
            .spawn(Agent::new(Vec2::new(1.0, 0.0), &AgentProfile::default()))
            .id();

        run(&mut app, 5);

        let world = app.world();
        let (Some(a), Some(b)) = (world.get::<Agent>(a), world.get::<Agent>(b)) else {
            panic!("Both agents should still be marching");
        };
        assert!(a.position.distance(b.position) > 2.0);
    }
}
