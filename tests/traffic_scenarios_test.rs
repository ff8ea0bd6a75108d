//! End-to-end traffic behaviour on small hand-built maps

use rand::rngs::StdRng;
use rand::SeedableRng;

use grid_traffic::simulation::{
    default_personas, follow_gap_factor, governed_speed, lane_offset_point, nearest_ahead,
    plan_spawn, score_candidate, AgentId, Cell, DespawnReason, Direction, Grid, Persona,
    PersonaKind, PersonaTable, RoadNetwork, SpawnSkip, SpawnTimer, StaticHost, TrafficConfig,
    TrafficEvent, TrafficPeer, TrafficStepper, TurnKind, Vec2, ViewRect, WeightedPersona,
};

const DT: f32 = 1.0 / 60.0;

fn network(map: &str) -> RoadNetwork {
    RoadNetwork::new(Grid::from_ascii(map, 32.0).expect("test map should parse"))
}

fn stepper(map: &str, config: TrafficConfig) -> TrafficStepper {
    TrafficStepper::with_seed(network(map), config, 7).expect("stepper should build")
}

fn host_for(stepper: &TrafficStepper) -> StaticHost {
    StaticHost::centered(stepper.network().world_size())
}

fn despawn_reason(events: &[TrafficEvent], id: AgentId) -> Option<DespawnReason> {
    events.iter().find_map(|event| match event {
        TrafficEvent::Despawned { id: gone, reason } if *gone == id => Some(*reason),
        _ => None,
    })
}

fn assert_close(actual: Vec2, expected: Vec2) {
    assert!(
        actual.distance(&expected) < 1e-3,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

#[test]
fn test_straight_strip_drives_off_grid() {
    let mut stepper = stepper("=====", TrafficConfig::default());
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(0, 0), Direction::East, Persona::NEUTRAL)
        .expect("spawn should succeed");

    assert_close(
        stepper.agent(id).map(|agent| agent.position).unwrap_or_default(),
        Vec2::new(16.0, 22.4),
    );

    let mut despawned = None;
    for frame in 1..=400 {
        let events = stepper.step_agents(DT, &host);
        if let Some(reason) = despawn_reason(&events, id) {
            despawned = Some((frame, reason));
            break;
        }
        let agent = stepper.agent(id).expect("agent should still be live");
        assert_eq!(agent.direction, Direction::East);
        assert!((agent.position.y - 22.4).abs() < 1e-3);
    }

    let (frame, reason) = despawned.expect("agent should leave the grid");
    assert_eq!(reason, DespawnReason::OffGrid);
    assert!((159..=162).contains(&frame), "despawned at frame {}", frame);
    assert_eq!(stepper.stats().despawned_off_grid, 1);
    assert_eq!(stepper.agent_count(), 0);
}

#[test]
fn test_roundabout_orbits_a_full_lap_before_exiting() {
    let map = "\
B=B
BOB
B=B
";
    let mut stepper = stepper(map, TrafficConfig::default());
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(1, 2), Direction::North, Persona::NEUTRAL)
        .expect("spawn should succeed");

    let mut entered = None;
    let mut exited = None;
    let mut last_laps = 0.0f32;

    for _ in 0..1000 {
        let events = stepper.step_agents(DT, &host);
        for event in &events {
            match event {
                TrafficEvent::RoundaboutEntered { orbit_key, .. } => entered = Some(*orbit_key),
                TrafficEvent::RoundaboutExited { exit, laps, .. } => exited = Some((*exit, *laps)),
                _ => {}
            }
        }
        if let Some(orbit) = stepper.agent(id).and_then(|agent| agent.roundabout()) {
            assert!(orbit.laps >= last_laps, "laps went backwards");
            assert_eq!(orbit.anchor, Cell::new(1, 1));
            last_laps = orbit.laps;
        }
        if exited.is_some() {
            break;
        }
    }

    assert_eq!(entered, Some(Direction::East));
    let (exit, laps) = exited.expect("agent should leave the roundabout");
    assert_eq!(exit, Direction::North);
    assert!(laps >= 1.0);

    let agent = stepper.agent(id).expect("agent should still be live");
    assert!(agent.is_cruising());
    assert_eq!(agent.direction, Direction::North);
    assert_close(agent.position, Vec2::new(54.4, 16.0));
}

#[test]
fn test_roundabout_without_exits_orbits_forever() {
    let map = "\
BBB
BOB
BBB
";
    let mut stepper = stepper(map, TrafficConfig::default());
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(1, 1), Direction::North, Persona::NEUTRAL)
        .expect("spawn should succeed");

    for _ in 0..2000 {
        let events = stepper.step_agents(DT, &host);
        assert!(despawn_reason(&events, id).is_none());
    }

    let orbit = stepper
        .agent(id)
        .and_then(|agent| agent.roundabout())
        .copied()
        .expect("agent should still be orbiting");
    assert!(orbit.laps > 5.0, "only {} laps", orbit.laps);
    assert_eq!(stepper.stats().roundabout_exits, 0);
}

#[test]
fn test_follower_slows_until_gap_opens() {
    let mut stepper = stepper(&"=".repeat(20), TrafficConfig::default());
    let host = host_for(&stepper);
    let trailer = stepper
        .spawn_agent_at_position(Vec2::new(16.0, 22.4), Direction::East, Persona::NEUTRAL)
        .expect("trailer should spawn");
    let leader = stepper
        .spawn_agent_at_position(Vec2::new(26.0, 22.4), Direction::East, Persona::NEUTRAL)
        .expect("leader should spawn");

    let position = |stepper: &TrafficStepper, id| {
        stepper
            .agent(id)
            .map(|agent| agent.position.x)
            .expect("agent should be live")
    };

    let mut last_gap = position(&stepper, leader) - position(&stepper, trailer);
    let mut slowed = false;

    for _ in 0..2000 {
        if stepper.agent(leader).is_none() {
            break;
        }
        let gap = position(&stepper, leader) - position(&stepper, trailer);
        assert!(gap >= last_gap - 1e-4, "gap shrank from {} to {}", last_gap, gap);
        last_gap = gap;

        let speed = stepper.governed_speed_of(trailer).expect("trailer is live");
        if gap < 27.5 {
            assert!(speed < 60.0, "full speed with a gap of {}", gap);
            slowed = true;
        }
        assert_eq!(stepper.governed_speed_of(leader), Some(60.0));

        stepper.step_agents(DT, &host);
    }

    assert!(slowed);
    assert!(stepper.agent(leader).is_none(), "leader should have left");
    assert_eq!(stepper.governed_speed_of(trailer), Some(60.0));
}

#[test]
fn test_dead_end_despawns() {
    let map = "\
BBBBB
BBBBB
B==BB
BBBBB
BBBBB
";
    let mut stepper = stepper(map, TrafficConfig::default());
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(2, 2), Direction::West, Persona::NEUTRAL)
        .expect("spawn should succeed");

    let mut reason = None;
    for _ in 0..100 {
        let events = stepper.step_agents(DT, &host);
        reason = despawn_reason(&events, id);
        if reason.is_some() {
            break;
        }
    }

    assert_eq!(reason, Some(DespawnReason::DeadEnd));
    assert_eq!(stepper.stats().despawned_dead_end, 1);
}

#[test]
fn test_blocked_corner_turns_onto_curve() {
    let map = "\
BB=BB
BB=BB
===BB
BBBBB
BBBBB
";
    let config = TrafficConfig {
        exploration_probability: 0.0,
        ..TrafficConfig::default()
    };
    let mut stepper = stepper(map, config);
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(0, 2), Direction::East, Persona::NEUTRAL)
        .expect("spawn should succeed");

    let expected_end = lane_offset_point(Cell::new(2, 1), Direction::North, false, 32.0, 0.2, 0.12);
    let mut started = false;
    let mut completed = None;

    for _ in 0..300 {
        let before = stepper
            .agent(id)
            .map(|agent| agent.position)
            .expect("agent should be live");
        let events = stepper.step_agents(DT, &host);
        for event in &events {
            match event {
                TrafficEvent::TurnStarted {
                    kind, start, end, to, ..
                } => {
                    assert_eq!(*kind, TurnKind::Left);
                    assert_eq!(*to, Direction::North);
                    assert_eq!(*start, before);
                    assert_eq!(*end, expected_end);
                    assert!(before.x >= 64.0 && before.x < 66.0);
                    started = true;
                }
                TrafficEvent::TurnCompleted {
                    direction,
                    position,
                    ..
                } => {
                    assert_eq!(*direction, Direction::North);
                    completed = Some(*position);
                }
                _ => {}
            }
        }
        if completed.is_some() {
            break;
        }
    }

    assert!(started);
    let end = completed.expect("turn should finish");
    assert_eq!(end, expected_end);
    assert_close(end, Vec2::new(86.4, 48.0));
    assert_eq!(stepper.stats().turns_completed, 1);
}

#[test]
fn test_capacity_and_inactive_handles() {
    let config = TrafficConfig {
        max_vehicles: 3,
        ..TrafficConfig::default()
    };
    let mut stepper = TrafficStepper::with_seed(
        RoadNetwork::new(Grid::demo_city(32.0).expect("demo city should parse")),
        config,
        11,
    )
    .expect("stepper should build");
    let mut host = host_for(&stepper);

    let ids: Vec<AgentId> = (0..3)
        .map(|_| stepper.try_spawn(&host).expect("spawn under capacity"))
        .collect();
    assert_eq!(stepper.try_spawn(&host), Err(SpawnSkip::AtCapacity));
    assert_eq!(stepper.stats().skipped_spawns, 1);

    host.inactive.push(ids[0]);
    let events = stepper.step_agents(DT, &host);
    assert_eq!(
        despawn_reason(&events, ids[0]),
        Some(DespawnReason::HandleInactive)
    );
    assert_eq!(stepper.agent_count(), 2);

    assert!(stepper.try_spawn(&host).is_ok());
    assert_eq!(stepper.try_spawn(&host), Err(SpawnSkip::AtCapacity));
}

fn assert_on_roads(stepper: &TrafficStepper, seed: u64) {
    let network = stepper.network();
    for agent in stepper.agents() {
        let cell = network.cell_at(agent.position);
        assert!(
            !network.is_in_bounds(cell) || network.is_drivable(cell),
            "seed {}: agent {:?} in state {:?} on {:?}",
            seed,
            agent.id,
            agent.state,
            cell
        );
        if let Some(turn) = agent.turn() {
            assert!(network.is_drivable(network.cell_at(turn.start)));
            assert!(network.is_drivable(network.cell_at(turn.end)));
        }
        if agent.roundabout().is_some() {
            assert!(network.is_roundabout(cell));
        }
    }
}

fn demo_stepper(config: TrafficConfig, seed: u64) -> (TrafficStepper, StaticHost) {
    let network = RoadNetwork::new(Grid::demo_city(32.0).expect("demo city should parse"));
    let host = StaticHost::centered(network.world_size());
    let stepper = TrafficStepper::with_seed(network, config, seed).expect("stepper should build");
    (stepper, host)
}

#[test]
fn test_agents_stay_on_roads_and_lap_before_exiting() {
    for seed in 1..=4 {
        let config = TrafficConfig {
            spawn_interval: 0.05,
            ..TrafficConfig::default()
        };
        let max_vehicles = config.max_vehicles;
        let (mut stepper, host) = demo_stepper(config, seed);
        let mut saturated_frames = 0;

        for _ in 0..1800 {
            let full = stepper.agent_count() >= max_vehicles;
            let events = stepper.update(DT, &host);
            for event in &events {
                match event {
                    TrafficEvent::RoundaboutExited { laps, .. } => {
                        assert!(*laps >= 1.0, "seed {} exited after {} laps", seed, laps);
                    }
                    TrafficEvent::Spawned { .. } => {
                        assert!(!full, "seed {}: spawned while at capacity", seed);
                    }
                    _ => {}
                }
            }
            if full {
                saturated_frames += 1;
            }
            assert!(stepper.agent_count() <= max_vehicles);
            assert_on_roads(&stepper, seed);
        }

        assert!(saturated_frames > 0, "seed {} never reached capacity", seed);
        assert!(stepper.stats().spawned > 0);
        assert_eq!(stepper.stats().despawned_not_drivable, 0);
    }
}

#[test]
fn test_long_frames_keep_agents_on_roads() {
    for seed in 1..=4 {
        let (mut stepper, host) = demo_stepper(TrafficConfig::default(), seed);

        for _ in 0..600 {
            stepper.update(0.5, &host);
            assert!(stepper.agent_count() <= 10);
            assert_on_roads(&stepper, seed);
        }

        assert!(stepper.stats().spawned > 0);
        assert_eq!(stepper.stats().despawned_not_drivable, 0);
    }
}

#[test]
fn test_long_frame_covers_same_distance_as_short_frames() {
    let mut stepper = stepper(&"=".repeat(20), TrafficConfig::default());
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(0, 0), Direction::East, Persona::NEUTRAL)
        .expect("spawn should succeed");

    stepper.step_agents(2.0, &host);

    let agent = stepper.agent(id).expect("agent should still be live");
    assert!((agent.position.x - 136.0).abs() < 1e-2, "x = {}", agent.position.x);
    assert!((agent.position.y - 22.4).abs() < 1e-3);
}

#[test]
fn test_roundabout_cluster_keeps_lap_count() {
    let map = "\
BBBB
=OO=
BBBB
";
    let mut stepper = stepper(map, TrafficConfig::default());
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(0, 1), Direction::East, Persona::NEUTRAL)
        .expect("spawn should succeed");

    let mut entered = Vec::new();
    let mut transferred = None;
    let mut exited = None;
    let mut last_laps = 0.0f32;

    for _ in 0..1000 {
        let events = stepper.step_agents(DT, &host);
        for event in &events {
            match event {
                TrafficEvent::RoundaboutEntered { anchor, .. } => entered.push(*anchor),
                TrafficEvent::RoundaboutTransferred { from, to, laps, .. } => {
                    transferred = Some((*from, *to, *laps));
                }
                TrafficEvent::RoundaboutExited {
                    anchor, exit, laps, ..
                } => exited = Some((*anchor, *exit, *laps)),
                _ => {}
            }
        }
        if let Some(orbit) = stepper.agent(id).and_then(|agent| agent.roundabout()) {
            assert!(orbit.laps >= last_laps, "laps went backwards");
            last_laps = orbit.laps;
        }
        if exited.is_some() {
            break;
        }
    }

    assert_eq!(entered, vec![Cell::new(1, 1)]);
    assert_eq!(transferred, Some((Cell::new(1, 1), Cell::new(2, 1), 1.25)));
    assert_eq!(exited, Some((Cell::new(2, 1), Direction::East, 1.5)));

    let agent = stepper.agent(id).expect("agent should still be live");
    assert!(agent.is_cruising());
    assert_close(agent.position, Vec2::new(112.0, 54.4));
}

#[test]
fn test_spawns_prefer_cells_far_from_view() {
    let network = network(&"=".repeat(30));
    let config = TrafficConfig::default();
    let personas = config.validate().expect("default config is valid");
    let host = StaticHost::new(
        ViewRect::new(Vec2::ZERO, Vec2::new(64.0, 32.0)),
        Vec2::new(16.0, 16.0),
    );

    assert_eq!(score_candidate(&network, &config, &host, Cell::new(0, 0)), 0);
    assert_eq!(score_candidate(&network, &config, &host, Cell::new(29, 0)), 3);

    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let agent = plan_spawn(AgentId(seed), 0, &network, &config, &personas, &host, &mut rng)
            .expect("a candidate exists");
        assert_eq!(agent.last_cell, Some(Cell::new(29, 0)));
        assert_eq!(agent.direction, Direction::West);
    }
}

#[test]
fn test_persona_distribution_matches_weights() {
    let table = PersonaTable::new(default_personas()).expect("default personas are valid");
    let mut rng = StdRng::seed_from_u64(42);
    let samples = 20_000;
    let mut counts = [0usize; 4];

    for _ in 0..samples {
        let slot = match table.sample(&mut rng).kind {
            PersonaKind::Aggressive => 0,
            PersonaKind::Fast => 1,
            PersonaKind::Neutral => 2,
            PersonaKind::Slow => 3,
        };
        counts[slot] += 1;
    }

    for (count, expected) in counts.iter().zip([0.10, 0.25, 0.50, 0.15]) {
        let share = *count as f64 / samples as f64;
        assert!(
            (share - expected).abs() < 0.02,
            "share {} expected {}",
            share,
            expected
        );
    }
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let build = |config: TrafficConfig| TrafficStepper::with_seed(network("==="), config, 1);

    assert!(build(TrafficConfig::default()).is_ok());
    assert!(build(TrafficConfig {
        spawn_interval: 0.0,
        ..TrafficConfig::default()
    })
    .is_err());
    assert!(build(TrafficConfig {
        base_speed: -1.0,
        ..TrafficConfig::default()
    })
    .is_err());
    assert!(build(TrafficConfig {
        lane_offset_fraction: 0.6,
        ..TrafficConfig::default()
    })
    .is_err());
    assert!(build(TrafficConfig {
        exploration_probability: 1.5,
        ..TrafficConfig::default()
    })
    .is_err());
    assert!(build(TrafficConfig {
        personas: Vec::new(),
        ..TrafficConfig::default()
    })
    .is_err());
    assert!(build(TrafficConfig {
        personas: vec![WeightedPersona {
            persona: Persona {
                follow_gap: 0.0,
                ..Persona::SLOW
            },
            weight: 1.0,
        }],
        ..TrafficConfig::default()
    })
    .is_err());

    let flat = RoadNetwork::new(Grid::from_ascii("===", 0.0).expect("map should parse"));
    assert!(TrafficStepper::with_seed(flat, TrafficConfig::default(), 1).is_err());
}

#[test]
fn test_spawn_timer_fires_per_interval() {
    let mut timer = SpawnTimer::new(1.0);
    assert_eq!(timer.tick(0.5), 0);
    assert_eq!(timer.tick(0.6), 1);
    assert_eq!(timer.tick(2.0), 2);

    timer.cancel();
    assert!(timer.is_cancelled());
    assert_eq!(timer.tick(5.0), 0);
}

#[test]
fn test_shutdown_stops_everything() {
    let mut stepper = TrafficStepper::with_seed(
        RoadNetwork::new(Grid::demo_city(32.0).expect("demo city should parse")),
        TrafficConfig::default(),
        3,
    )
    .expect("stepper should build");
    let host = host_for(&stepper);

    assert!(stepper.try_spawn(&host).is_ok());
    assert!(stepper.try_spawn(&host).is_ok());

    stepper.shutdown();
    assert_eq!(stepper.agent_count(), 0);
    assert_eq!(stepper.try_spawn(&host), Err(SpawnSkip::Stopped));
    assert!(stepper
        .spawn_agent_at(Cell::new(3, 0), Direction::South, Persona::FAST)
        .is_none());

    for _ in 0..600 {
        assert!(stepper.update(DT, &host).is_empty());
    }
    assert_eq!(stepper.agent_count(), 0);
}

#[test]
fn test_replaced_grid_removes_stranded_agents() {
    let mut stepper = stepper("=====", TrafficConfig::default());
    let host = host_for(&stepper);
    let id = stepper
        .spawn_agent_at(Cell::new(1, 0), Direction::East, Persona::NEUTRAL)
        .expect("spawn should succeed");

    stepper.replace_grid(Grid::from_ascii("BBBBB", 32.0).expect("map should parse"));
    let events = stepper.step_agents(DT, &host);

    assert_eq!(
        despawn_reason(&events, id),
        Some(DespawnReason::CellNotDrivable)
    );
    assert_eq!(stepper.stats().despawned_not_drivable, 1);
}

#[test]
fn test_follow_gap_factor_is_monotonic() {
    let gap = Persona::NEUTRAL.follow_gap;
    assert_eq!(follow_gap_factor(0.0, gap), 0.0);
    assert_eq!(follow_gap_factor(gap, gap), 1.0);
    assert_eq!(follow_gap_factor(gap * 3.0, gap), 1.0);

    let mut previous = 0.0;
    for step in 0..=60 {
        let factor = follow_gap_factor(step as f32, gap);
        assert!(factor >= previous);
        assert!((0.0..=1.0).contains(&factor));
        previous = factor;
    }

    assert_eq!(governed_speed(60.0, &Persona::NEUTRAL, None), 60.0);
    assert_eq!(governed_speed(60.0, &Persona::NEUTRAL, Some(40.0)), 60.0);
    assert!((governed_speed(60.0, &Persona::NEUTRAL, Some(14.0)) - 30.0).abs() < 1e-4);
}

#[test]
fn test_nearest_ahead_ignores_other_lanes_and_traffic_behind() {
    let me = AgentId(0);
    let peer = |id, x: f32, direction| TrafficPeer {
        id: AgentId(id),
        position: Vec2::new(x, 10.0),
        direction,
    };
    let peers = vec![
        peer(0, 100.0, Direction::East),
        peer(1, 90.0, Direction::East),
        peer(2, 130.0, Direction::West),
        peer(3, 160.0, Direction::East),
        peer(4, 125.0, Direction::East),
    ];

    let ahead = nearest_ahead(me, Vec2::new(100.0, 10.0), Direction::East, &peers);
    assert_eq!(ahead, Some(25.0));

    let alone = nearest_ahead(me, Vec2::new(100.0, 10.0), Direction::North, &peers);
    assert_eq!(alone, None);
}
