//! Property tests for the simulation invariants.

use cellsim_core::{
    AgentConfig, AgentId, Coefficients, MotilityState, PopulationConfig, SimConfig, WoundConfig,
    WoundKind,
};
use cellsim_world::{
    Agent, Flock, GridIndex, LinearIndex, Population, RandomSource, Simulation, SpatialIndex,
    WoundRegion,
};
use glam::DVec2;
use proptest::prelude::*;

/// Never lets a probabilistic transition fire.
struct NoTransitions;

impl RandomSource for NoTransitions {
    fn roll(&mut self, upper: u32) -> u32 {
        upper - 1
    }
}

/// Fires only the first (growth) draw.
struct GrowOnce(bool);

impl RandomSource for GrowOnce {
    fn roll(&mut self, upper: u32) -> u32 {
        if self.0 {
            upper - 1
        } else {
            self.0 = true;
            0
        }
    }
}

fn coefficient() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), -1.0..1.0f64, 0.01..2.0f64]
}

/// Coordinates hugging either edge of a 256-unit domain, a little past it
/// included
fn edge_coordinate() -> impl Strategy<Value = f64> {
    prop_oneof![-0.4..0.6f64, 255.4..256.4f64]
}

fn wound_kind() -> impl Strategy<Value = WoundKind> {
    prop_oneof![
        Just(WoundKind::Line),
        Just(WoundKind::Polygon),
        Just(WoundKind::Circle)
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_seeded_runs_keep_invariants(seed in any::<u64>(), r1 in coefficient(), r2 in coefficient(), r3 in coefficient()) {
        let config = SimConfig {
            num_ticks: 60,
            seed,
            population: PopulationConfig {
                initial_agents: 25,
                coefficients: Coefficients { r1, r2, r3 },
                ..Default::default()
            },
            ..Default::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        sim.run().unwrap();

        for agent in sim.population().agents() {
            prop_assert!(agent.radius > 0.0);
            prop_assert!(agent.position.is_finite());
            prop_assert!(agent.velocity.is_finite());
            let c = agent.coefficients();
            prop_assert!(c.r1 >= 0.01 && c.r2 >= 0.01 && c.r3 >= 0.01);
        }
    }

    #[test]
    fn prop_boundary_crossing_flips_velocity(
        x in 250.0..256.0f64,
        y in 0.0..256.0f64,
        vx in 0.1..1.0f64,
        vy in -1.0..1.0f64,
    ) {
        let mut agent = Agent::new(AgentId(0), DVec2::new(x, y), Coefficients::default(), &AgentConfig::default(), 0);
        agent.state = MotilityState::Motile;
        agent.velocity = DVec2::new(vx, vy);
        let flock = Flock {
            neighbors: &[],
            avg_position: DVec2::ZERO,
            avg_velocity: DVec2::ZERO,
            population_size: 1,
            domain_size: 256.0,
        };

        let before = agent.position;
        agent.advance(1, &flock, &AgentConfig::default(), &mut NoTransitions);
        let step = agent.position - before;

        // The stored heading is the step just taken, negated on each axis
        // that left the domain
        if agent.position.x > 256.0 {
            prop_assert!((agent.velocity.x + step.x).abs() < 1e-9);
        } else {
            prop_assert!((agent.velocity.x - step.x).abs() < 1e-9);
        }
        if agent.position.y < 0.0 || agent.position.y > 256.0 {
            prop_assert!((agent.velocity.y + step.y).abs() < 1e-9);
        } else {
            prop_assert!((agent.velocity.y - step.y).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_reflection_holds_on_every_edge_over_many_ticks(
        x in edge_coordinate(),
        y in edge_coordinate(),
        heading in 0.0..std::f64::consts::TAU,
        ticks in 2u64..12,
    ) {
        let config = AgentConfig::default();
        let mut agent = Agent::new(AgentId(0), DVec2::new(x, y), Coefficients::default(), &config, 0);
        agent.state = MotilityState::Motile;
        agent.velocity = DVec2::new(heading.cos(), heading.sin()) * 0.5;
        let flock = Flock {
            neighbors: &[],
            avg_position: DVec2::ZERO,
            avg_velocity: DVec2::ZERO,
            population_size: 1,
            domain_size: 256.0,
        };
        let outside = |v: f64| !(0.0..=256.0).contains(&v);

        let mut previous: Option<(DVec2, DVec2)> = None;
        for tick in 1..=ticks {
            let before = agent.position;
            agent.advance(tick, &flock, &config, &mut NoTransitions);
            let step = agent.position - before;

            for (pos, vel, delta) in [
                (agent.position.x, agent.velocity.x, step.x),
                (agent.position.y, agent.velocity.y, step.y),
            ] {
                if outside(pos) {
                    prop_assert!((vel + delta).abs() < 1e-9);
                } else {
                    prop_assert!((vel - delta).abs() < 1e-9);
                }
            }

            // Once an axis ends a tick outside, the next step on it never
            // continues in the same direction
            if let Some((last_position, last_step)) = previous {
                if outside(last_position.x) {
                    prop_assert!(step.x * last_step.x <= 0.0);
                }
                if outside(last_position.y) {
                    prop_assert!(step.y * last_step.y <= 0.0);
                }
            }
            previous = Some((agent.position, step));
        }
    }

    #[test]
    fn prop_empty_neighborhood_and_lone_flock(
        r1 in coefficient(), r2 in coefficient(), r3 in coefficient(),
        vx in -1.0..1.0f64, vy in -1.0..1.0f64,
    ) {
        let mut agent = Agent::new(AgentId(0), DVec2::new(10.0, 10.0), Coefficients { r1, r2, r3 }, &AgentConfig::default(), 0);
        agent.velocity = DVec2::new(vx, vy);
        prop_assert_eq!(agent.neighbor_force(&[], 0.001), DVec2::ZERO);
        prop_assert_eq!(agent.alignment_force(DVec2::new(vx, vy), 1, 0.001), DVec2::ZERO);
        prop_assert_eq!(agent.alignment_force(DVec2::new(vx, vy), 0, 0.001), DVec2::ZERO);
    }

    #[test]
    fn prop_grid_index_matches_linear_scan(
        points in prop::collection::vec((-20.0..280.0f64, -20.0..280.0f64, 0.0..40.0f64), 0..80),
        probe in (-20.0..280.0f64, -20.0..280.0f64),
        padding in 1.0..60.0f64,
    ) {
        let mut grid = GridIndex::new(25.0);
        let mut linear = LinearIndex::new();
        for (i, (x, y, radius)) in points.iter().enumerate() {
            grid.insert(AgentId(i as u64), DVec2::new(*x, *y), *radius);
            linear.insert(AgentId(i as u64), DVec2::new(*x, *y), *radius);
        }
        let center = DVec2::new(probe.0, probe.1);
        prop_assert_eq!(grid.neighbors(center, padding), linear.neighbors(center, padding));
    }

    #[test]
    fn prop_division_adds_exactly_one(
        x in 20.0..230.0f64,
        y in 20.0..230.0f64,
        vx in -0.5..0.5f64,
        vy in -0.5..0.5f64,
    ) {
        let mut pop = Population::new(PopulationConfig::default(), AgentConfig::default()).unwrap();
        let parent = pop.add_agent(x, y);
        {
            let agent = pop.agent_mut(parent).unwrap();
            agent.radius = 11.0;
            agent.state = MotilityState::Motile;
            agent.velocity = DVec2::new(vx, vy);
        }
        let mut index = GridIndex::new(30.0);

        pop.tick(1, &mut index, &mut GrowOnce(false));

        prop_assert_eq!(pop.len(), 2);
        let parent_agent = pop.agent(parent).unwrap();
        let child = pop.agent(AgentId(1)).unwrap();
        prop_assert_eq!(parent_agent.radius, 8.0);
        prop_assert_eq!(child.radius, 8.0);
        prop_assert_eq!(child.velocity, -parent_agent.velocity);
    }

    #[test]
    fn prop_wound_round_trip_restores_agents(
        points in prop::collection::vec((0.0..512.0f64, 0.0..512.0f64), 1..60),
        kind in wound_kind(),
        area in 50.0..20_000.0f64,
        angles in 3u32..=50,
    ) {
        let mut pop = Population::new(PopulationConfig::default(), AgentConfig::default()).unwrap();
        for (x, y) in &points {
            pop.add_agent(*x, *y);
        }
        let before = pop.snapshot();

        let wound = WoundConfig { kind, area, angles, ..Default::default() };
        let region = WoundRegion::from_config(&wound).unwrap();
        let culled = pop.enable_wound(&wound).unwrap();

        let expected_hidden = points
            .iter()
            .filter(|(x, y)| region.contains(DVec2::new(*x, *y)))
            .count();
        prop_assert_eq!(culled, expected_hidden);
        prop_assert_eq!(pop.visible_len(), points.len() - expected_hidden);
        prop_assert_eq!(pop.len(), points.len());

        pop.disable_wound();
        let all: Vec<AgentId> = (0..points.len() as u64).map(AgentId).collect();
        prop_assert_eq!(pop.visible_ids(), all.as_slice());
        prop_assert_eq!(pop.snapshot(), before);
    }

    #[test]
    fn prop_circle_contains_by_distance(
        radius in 4.0..100.0f64,
        angle in 0.0..std::f64::consts::TAU,
        fraction in 0.0..2.0f64,
    ) {
        let area = std::f64::consts::PI * radius * radius;
        prop_assume!(area >= 50.0);
        let wound = WoundRegion::from_config(&WoundConfig {
            kind: WoundKind::Circle,
            area,
            ..Default::default()
        }).unwrap();

        let d = radius * fraction;
        let point = DVec2::new(256.0 + d * angle.cos(), 256.0 + d * angle.sin());
        if fraction < 0.999 {
            prop_assert!(wound.contains(point));
        } else if fraction > 1.001 {
            prop_assert!(!wound.contains(point));
        }
    }
}

#[test]
fn circle_of_area_100_pi_has_radius_10() {
    let wound = WoundRegion::from_config(&WoundConfig {
        kind: WoundKind::Circle,
        area: 100.0 * std::f64::consts::PI,
        ..Default::default()
    })
    .unwrap();
    assert!(wound.contains(DVec2::new(256.0, 256.0)));
    assert!(!wound.contains(DVec2::new(267.0, 256.0)));
}
