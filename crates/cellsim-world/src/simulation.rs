//! Simulation engine: owns the population, clock, index and random source.

use crate::agent::AgentView;
use crate::clock::SimulationClock;
use crate::population::{Population, TickSummary};
use crate::rng::RandomSource;
use crate::spatial::GridIndex;
use cellsim_core::{Coefficients, Result, SimConfig, WoundConfig};
use glam::DVec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{event, info, instrument, Level};

pub struct Simulation {
    population: Population,
    index: GridIndex,
    clock: SimulationClock,
    config: SimConfig,
    rng: ChaCha8Rng,
    last_tick: u64,
    wound_applied: bool,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut population = Population::new(config.population.clone(), config.agent.clone())?;
        let mut clock = SimulationClock::new(&config.clock)?;
        let index = GridIndex::new(config.population.padding);

        // Integer start positions across the domain
        let span = config.population.domain_size.max(1.0) as u32;
        for _ in 0..config.population.initial_agents {
            let x = rng.roll(span) as f64;
            let y = rng.roll(span) as f64;
            population.add_agent(x, y);
        }

        clock.start();
        info!(
            seed = config.seed,
            agents = population.len(),
            "Simulation created"
        );

        Ok(Self {
            population,
            index,
            clock,
            config,
            rng,
            last_tick: 0,
            wound_applied: false,
        })
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Index of the most recently fired tick
    pub fn tick(&self) -> u64 {
        self.last_tick
    }

    pub fn update_coefficients(&mut self, coefficients: Coefficients) {
        self.population
            .update_coefficients(coefficients.r1, coefficients.r2, coefficients.r3);
    }

    pub fn enable_wound(&mut self, wound: &WoundConfig) -> Result<usize> {
        self.population.enable_wound(wound)
    }

    pub fn disable_wound(&mut self) {
        self.population.disable_wound();
    }

    pub fn set_speed_factor(&mut self, speed_factor: f64) -> Result<()> {
        self.clock.set_speed_factor(speed_factor)
    }

    pub fn start(&mut self) {
        self.clock.start();
    }

    pub fn stop(&mut self) {
        self.clock.stop();
    }

    pub fn snapshot(&self) -> Vec<AgentView> {
        self.population.snapshot()
    }

    /// Fire one tick. Does nothing while the clock is stopped.
    pub fn step(&mut self) -> Result<Option<TickSummary>> {
        if !self.clock.is_running() {
            return Ok(None);
        }
        let tick = self.clock.advance();
        self.last_tick = tick;

        if !self.wound_applied && tick >= self.config.wound_at_tick {
            if let Some(wound) = self.config.wound.clone() {
                self.population.enable_wound(&wound)?;
                info!(tick, kind = %wound.kind, area = wound.area, "Scheduled wound applied");
            }
            self.wound_applied = true;
        }

        let summary = self.population.tick(tick, &mut self.index, &mut self.rng);

        if self.config.metrics_interval > 0 && tick > 0 && tick % self.config.metrics_interval == 0 {
            self.emit_population_metrics(&summary);
        }

        Ok(Some(summary))
    }

    /// Run the configured number of ticks back to back
    #[instrument(skip(self), fields(num_ticks = self.config.num_ticks))]
    pub fn run(&mut self) -> Result<SimulationReport> {
        info!("Starting simulation for {} ticks", self.config.num_ticks);
        self.clock.start();

        for i in 0..self.config.num_ticks {
            self.step()?;

            if i % 1000 == 0 {
                info!(
                    "Tick {}/{}: {} agents, {} visible",
                    i,
                    self.config.num_ticks,
                    self.population.len(),
                    self.population.visible_len()
                );
            }
        }

        let report = self.report();
        info!(
            event = "run_complete",
            ticks = report.ticks,
            total_agents = report.total_agents,
            visible_agents = report.visible_agents,
            divisions = report.divisions,
            max_offspring = report.max_offspring,
            "Simulation complete"
        );
        Ok(report)
    }

    fn emit_population_metrics(&self, summary: &TickSummary) {
        let report = self.report();

        info!(
            event = "population_metrics",
            tick = self.last_tick,
            total_agents = report.total_agents,
            visible_agents = report.visible_agents,
            motile_agents = report.motile_agents,
            mean_radius = report.mean_radius,
            moved = summary.moved,
            divisions_this_tick = summary.divisions,
            culled_this_tick = summary.culled,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_visible",
            gauge_value = report.visible_agents,
            tick = self.last_tick,
            "Visible population gauge"
        );

        event!(
            Level::INFO,
            counter_name = "agent_divisions",
            counter_value = report.divisions,
            tick = self.last_tick,
            "Division counter"
        );
    }

    /// Summary of the current state
    pub fn report(&self) -> SimulationReport {
        let visible: Vec<_> = self.population.visible_agents().collect();
        let mean_radius = if visible.is_empty() {
            0.0
        } else {
            visible.iter().map(|a| a.radius).sum::<f64>() / visible.len() as f64
        };

        SimulationReport {
            ticks: self.clock.current_tick(),
            total_agents: self.population.len(),
            visible_agents: visible.len(),
            motile_agents: visible.iter().filter(|a| a.is_motile()).count(),
            divisions: self.population.total_divisions(),
            max_offspring: self
                .population
                .agents()
                .iter()
                .map(|a| a.offspring_count)
                .max()
                .unwrap_or(0),
            mean_radius,
            centroid: self.population.aggregates().avg_position,
            wound_active: self.population.wound().is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub ticks: u64,
    pub total_agents: usize,
    pub visible_agents: usize,
    pub motile_agents: usize,
    pub divisions: u64,
    /// Most daughters produced by any single agent
    pub max_offspring: u32,
    pub mean_radius: f64,
    /// Mean visible position as of the last tick
    pub centroid: DVec2,
    pub wound_active: bool,
}
