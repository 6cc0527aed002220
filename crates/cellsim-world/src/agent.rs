//! Agent state and per-tick kinetics.

use crate::rng::RandomSource;
use crate::spatial::Neighbor;
use cellsim_core::{normalize_or_self, AgentConfig, AgentId, Coefficients, MotilityState};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Range of the state-transition draws
const TRANSITION_ROLL: u32 = 1000;
/// Motility bias components are drawn as integers in [-10, 10]
const MOTILITY_STEPS: u32 = 10;

/// Population-supplied inputs for one agent's step.
///
/// Built fresh every tick and dropped afterwards; the agent never keeps it.
#[derive(Debug, Clone, Copy)]
pub struct Flock<'a> {
    pub neighbors: &'a [Neighbor],
    /// Flock centroid. Not a steering input; carried so observers of a step
    /// see the same aggregates the agent was given.
    pub avg_position: DVec2,
    pub avg_velocity: DVec2,
    pub population_size: usize,
    /// Velocity components reflect once the position leaves [0, domain_size]
    pub domain_size: f64,
}

/// What an `advance` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Tick 0: nothing happens
    Skipped,
    /// The state machine ended the tick before any motion
    Stationary,
    /// Kinetics ran and the position moved by the new velocity
    Moved,
}

/// Where a daughter cell starts and how it moves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivisionSeed {
    pub position: DVec2,
    pub velocity: DVec2,
}

/// A simulated cell
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub position: DVec2,
    pub velocity: DVec2,
    pub state: MotilityState,
    /// Random bias added to the velocity while motile
    pub motility_force: DVec2,
    /// Chance per tick of leaving the motile state
    pub motility_switch_prob: f64,
    /// Chance per tick of leaving the non-motile state
    pub nonmotile_switch_prob: f64,
    pub radius: f64,
    coefficients: Coefficients,
    pub birth_tick: u64,
    pub offspring_count: u32,
}

impl Agent {
    pub fn new(
        id: AgentId,
        position: DVec2,
        coefficients: Coefficients,
        config: &AgentConfig,
        birth_tick: u64,
    ) -> Self {
        Self {
            id,
            position,
            velocity: DVec2::ZERO,
            state: MotilityState::NonMotile,
            motility_force: DVec2::ZERO,
            motility_switch_prob: config.initial_motile_switch_prob,
            nonmotile_switch_prob: config.nonmotile_switch_prob,
            radius: config.initial_radius,
            coefficients: coefficients.floored(),
            birth_tick,
            offspring_count: 0,
        }
    }

    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }

    /// Replace the force weights; each is raised to the floor.
    pub fn set_coefficients(&mut self, coefficients: Coefficients) {
        self.coefficients = coefficients.floored();
    }

    pub fn is_motile(&self) -> bool {
        self.state == MotilityState::Motile
    }

    /// Run one tick: stochastic growth, the motility state machine, then
    /// kinetics and boundary reflection if the state machine allows motion.
    pub fn advance<R: RandomSource + ?Sized>(
        &mut self,
        tick: u64,
        flock: &Flock<'_>,
        config: &AgentConfig,
        rng: &mut R,
    ) -> StepOutcome {
        if tick == 0 {
            return StepOutcome::Skipped;
        }

        if rng.roll(config.growth_range) < config.growth_hits {
            self.radius += 1.0;
        }

        match self.state {
            MotilityState::NonMotile => {
                if !fires(rng.roll(TRANSITION_ROLL), self.nonmotile_switch_prob) {
                    return StepOutcome::Stationary;
                }
                self.switch_motile(config, rng);
            }
            MotilityState::Motile => {
                if fires(rng.roll(TRANSITION_ROLL), self.motility_switch_prob) {
                    self.state = MotilityState::NonMotile;
                    trace!(agent = %self.id, tick, "Agent became non-motile");
                    return StepOutcome::Stationary;
                }
                self.refresh_motility_switch(config);
            }
        }

        self.move_step(flock, config);
        StepOutcome::Moved
    }

    fn switch_motile<R: RandomSource + ?Sized>(&mut self, config: &AgentConfig, rng: &mut R) {
        self.state = MotilityState::Motile;
        let mut component =
            || (rng.roll(2 * MOTILITY_STEPS + 1) as f64 - MOTILITY_STEPS as f64) * config.motility_force_scale;
        let x = component();
        let y = component();
        self.motility_force = DVec2::new(x, y);
        self.refresh_motility_switch(config);
        trace!(agent = %self.id, force = ?self.motility_force, "Agent became motile");
    }

    /// Motile cells whose bias agrees with their heading persist longer.
    fn refresh_motility_switch(&mut self, config: &AgentConfig) {
        self.motility_switch_prob = if self.motility_force.dot(self.velocity) > 0.0 {
            config.aligned_switch_prob
        } else {
            config.misaligned_switch_prob
        };
    }

    fn move_step(&mut self, flock: &Flock<'_>, config: &AgentConfig) {
        let eps = config.degenerate_norm;
        let steer = self.neighbor_force(flock.neighbors, eps)
            + self.alignment_force(flock.avg_velocity, flock.population_size, eps)
            + self.velocity
            + self.motility_force;

        // Zero stays zero; anything else becomes a unit vector
        self.velocity = normalize_or_self(steer, 0.0) * config.step_size;
        self.position += self.velocity;

        // Position is left where it is; only the heading flips
        if self.position.x < 0.0 || self.position.x > flock.domain_size {
            self.velocity.x = -self.velocity.x;
        }
        if self.position.y < 0.0 || self.position.y > flock.domain_size {
            self.velocity.y = -self.velocity.y;
        }
    }

    /// Combined short-range repulsion and long-range cohesion.
    ///
    /// For each neighbor at distance `d`, adds `-(r2 / (d - 1) - r1)` along the
    /// direction from this agent to the neighbor: close neighbors push, far
    /// ones pull.
    pub fn neighbor_force(&self, neighbors: &[Neighbor], eps: f64) -> DVec2 {
        let Coefficients { r1, r2, .. } = self.coefficients;
        let mut force = DVec2::ZERO;

        for neighbor in neighbors.iter().filter(|n| n.id != self.id) {
            let offset = neighbor.position - self.position;
            let direction = normalize_or_self(offset, eps);

            let mut distance = offset.length();
            if distance == 1.0 {
                distance = 1.1;
            }

            force -= direction * (r2 / (distance - 1.0) - r1);
        }

        force
    }

    /// Pull toward the velocity of the rest of the flock.
    ///
    /// `avg_velocity` includes this agent; its contribution is removed before
    /// the result is scaled by `r3`. Zero for a flock of one or none.
    pub fn alignment_force(&self, avg_velocity: DVec2, population_size: usize, eps: f64) -> DVec2 {
        if population_size <= 1 {
            return DVec2::ZERO;
        }
        let n = population_size as f64;
        let perceived = (avg_velocity * n - self.velocity) * (1.0 / (n - 1.0));
        normalize_or_self(perceived, eps) * self.coefficients.r3
    }

    /// Split off a daughter: the parent shifts by +1 on both axes, the
    /// daughter starts at the parent's old position -1 with the opposite
    /// velocity, and both radii reset.
    pub fn divide(&mut self, reset_radius: f64) -> DivisionSeed {
        let seed = DivisionSeed {
            position: self.position - DVec2::new(1.0, 1.0),
            velocity: -self.velocity,
        };
        self.position += DVec2::new(1.0, 1.0);
        self.radius = reset_radius;
        self.offspring_count += 1;
        seed
    }

    pub fn view(&self, visible: bool) -> AgentView {
        AgentView {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            state: self.state,
            radius: self.radius,
            visible,
        }
    }
}

fn fires(roll: u32, probability: f64) -> bool {
    (roll as f64) < TRANSITION_ROLL as f64 * probability
}

/// Read-only agent state for presentation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub position: DVec2,
    pub velocity: DVec2,
    pub state: MotilityState,
    pub radius: f64,
    pub visible: bool,
}
