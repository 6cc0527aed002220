//! Agent collection, flock aggregates, and lifecycle bookkeeping.

use crate::agent::{Agent, AgentView, Flock, StepOutcome};
use crate::rng::RandomSource;
use crate::spatial::SpatialIndex;
use crate::wound::WoundRegion;
use cellsim_core::{
    AgentConfig, AgentId, Coefficients, DivisionMode, PopulationConfig, Result, WoundConfig,
};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Flock-wide means over the visible agents.
///
/// Agents steer by `avg_velocity` only; `avg_position` is reported for
/// display of the flock centroid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub avg_position: DVec2,
    pub avg_velocity: DVec2,
}

/// Counts from one population tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub moved: usize,
    pub stationary: usize,
    pub divisions: usize,
    pub culled: usize,
}

pub struct Population {
    /// Every agent ever created, indexed by `AgentId`
    agents: Vec<Agent>,
    /// Agents currently simulated, in update order
    visible: Vec<AgentId>,
    visible_flags: Vec<bool>,
    coefficients: Coefficients,
    config: PopulationConfig,
    agent_config: AgentConfig,
    aggregates: Aggregates,
    wound: Option<WoundRegion>,
    current_tick: u64,
    total_divisions: u64,
}

impl Population {
    pub fn new(config: PopulationConfig, agent_config: AgentConfig) -> Result<Self> {
        config.validate()?;
        agent_config.validate()?;
        Ok(Self {
            agents: Vec::new(),
            visible: Vec::new(),
            visible_flags: Vec::new(),
            coefficients: config.coefficients.floored(),
            config,
            agent_config,
            aggregates: Aggregates::default(),
            wound: None,
            current_tick: 0,
            total_divisions: 0,
        })
    }

    /// Create a visible agent with the current default coefficients.
    pub fn add_agent(&mut self, x: f64, y: f64) -> AgentId {
        let id = AgentId(self.agents.len() as u64);
        let agent = Agent::new(
            id,
            DVec2::new(x, y),
            self.coefficients,
            &self.agent_config,
            self.current_tick,
        );
        self.agents.push(agent);
        self.visible_flags.push(true);
        self.visible.push(id);
        id
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.index())
    }

    /// All agents in creation order, hidden ones included
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn visible_ids(&self) -> &[AgentId] {
        &self.visible
    }

    pub fn visible_agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.visible.iter().map(move |id| &self.agents[id.index()])
    }

    pub fn is_visible(&self, id: AgentId) -> bool {
        self.visible_flags.get(id.index()).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn total_divisions(&self) -> u64 {
        self.total_divisions
    }

    pub fn wound(&self) -> Option<&WoundRegion> {
        self.wound.as_ref()
    }

    /// Last aggregates computed
    pub fn aggregates(&self) -> Aggregates {
        self.aggregates
    }

    /// Store new defaults and push them to every visible agent.
    pub fn update_coefficients(&mut self, r1: f64, r2: f64, r3: f64) {
        self.coefficients = Coefficients::new(r1, r2, r3);
        for id in &self.visible {
            self.agents[id.index()].set_coefficients(self.coefficients);
        }
        debug!(coefficients = ?self.coefficients, "Coefficients updated");
    }

    /// Mean position and velocity over the visible agents. With nothing
    /// visible the previous result is returned unchanged.
    pub fn compute_aggregates(&mut self) -> Aggregates {
        if self.visible.is_empty() {
            return self.aggregates;
        }

        let mut position_sum = DVec2::ZERO;
        let mut velocity_sum = DVec2::ZERO;
        for agent in self.visible_agents() {
            position_sum += agent.position;
            velocity_sum += agent.velocity;
        }
        let scale = 1.0 / self.visible.len() as f64;

        self.aggregates = Aggregates {
            avg_position: position_sum * scale,
            avg_velocity: velocity_sum * scale,
        };
        self.aggregates
    }

    /// Run one population update.
    ///
    /// Aggregates and the index are built from the positions at the start of
    /// the tick, so every neighbor query sees pre-tick positions no matter how
    /// many agents have already moved. Daughters created by division are
    /// inserted into the index straight away and show up in later queries of
    /// the same tick; they take their first step on the next tick.
    pub fn tick<R: RandomSource + ?Sized>(
        &mut self,
        tick: u64,
        index: &mut dyn SpatialIndex,
        rng: &mut R,
    ) -> TickSummary {
        self.current_tick = tick;
        let aggregates = self.compute_aggregates();
        let population_size = self.visible.len();

        index.clear();
        for id in &self.visible {
            let agent = &self.agents[id.index()];
            index.insert(*id, agent.position, agent.radius);
        }

        let mut summary = TickSummary::default();
        let order = self.visible.clone();

        for id in order {
            let agent = &mut self.agents[id.index()];
            let neighbors = index.neighbors(agent.position, self.config.padding);
            let flock = Flock {
                neighbors: &neighbors,
                avg_position: aggregates.avg_position,
                avg_velocity: aggregates.avg_velocity,
                population_size,
                domain_size: self.config.domain_size,
            };

            match agent.advance(tick, &flock, &self.agent_config, rng) {
                StepOutcome::Skipped => continue,
                StepOutcome::Stationary => summary.stationary += 1,
                StepOutcome::Moved => summary.moved += 1,
            }

            let divides = match self.config.division_mode {
                DivisionMode::Growth => agent.radius >= self.agent_config.division_radius,
                DivisionMode::Random { one_in } => rng.roll(one_in) == 0,
                DivisionMode::Disabled => false,
            };
            if divides {
                let child = self.divide(id);
                let daughter = &self.agents[child.index()];
                index.insert(child, daughter.position, daughter.radius);
                summary.divisions += 1;
            }
        }

        if let Some(region) = self.wound.take() {
            summary.culled = self.cull_by_wound(&region);
            self.wound = Some(region);
        }

        trace!(
            tick,
            moved = summary.moved,
            stationary = summary.stationary,
            divisions = summary.divisions,
            culled = summary.culled,
            "Population tick"
        );
        summary
    }

    fn divide(&mut self, parent: AgentId) -> AgentId {
        let reset_radius = self.agent_config.initial_radius;
        let parent_agent = &mut self.agents[parent.index()];
        let seed = parent_agent.divide(reset_radius);
        let parent_age = self.current_tick.saturating_sub(parent_agent.birth_tick);
        let parent_offspring = parent_agent.offspring_count;

        let child = self.add_agent(seed.position.x, seed.position.y);
        let daughter = &mut self.agents[child.index()];
        daughter.velocity = seed.velocity;
        daughter.radius = reset_radius;
        self.total_divisions += 1;

        debug!(
            event = "agent_division",
            parent = %parent,
            child = %child,
            parent_age,
            parent_offspring,
            tick = self.current_tick,
            population = self.agents.len(),
            "Agent divided"
        );
        child
    }

    /// Hide an agent. Returns false if it was already hidden or unknown.
    pub fn remove_agent(&mut self, id: AgentId) -> bool {
        match self.visible_flags.get_mut(id.index()) {
            Some(flag) if *flag => {
                *flag = false;
                self.visible.retain(|v| *v != id);
                true
            }
            _ => false,
        }
    }

    /// Show a hidden agent again, at the end of the update order. Returns
    /// false if it was already visible or unknown.
    pub fn show_agent(&mut self, id: AgentId) -> bool {
        match self.visible_flags.get_mut(id.index()) {
            Some(flag) if !*flag => {
                *flag = true;
                self.visible.push(id);
                true
            }
            _ => false,
        }
    }

    /// Hide every visible agent inside `region`; returns how many were hidden.
    pub fn cull_by_wound(&mut self, region: &WoundRegion) -> usize {
        let before = self.visible.len();
        let agents = &self.agents;
        let flags = &mut self.visible_flags;
        self.visible.retain(|id| {
            let inside = region.contains(agents[id.index()].position);
            if inside {
                flags[id.index()] = false;
            }
            !inside
        });
        before - self.visible.len()
    }

    /// Make every agent visible again, in creation order.
    fn restore_all(&mut self) {
        self.visible = (0..self.agents.len() as u64).map(AgentId).collect();
        self.visible_flags.iter_mut().for_each(|flag| *flag = true);
    }

    /// Replace any active wound with a new one and cull against it.
    ///
    /// Parameters are validated first; on error the current wound (if any)
    /// stays in place.
    pub fn enable_wound(&mut self, config: &WoundConfig) -> Result<usize> {
        let region = WoundRegion::from_config(config)?;
        if self.wound.is_some() {
            self.disable_wound();
        }

        let culled = self.cull_by_wound(&region);
        debug!(
            event = "wound_enabled",
            kind = %region.kind(),
            area = config.area,
            culled,
            visible = self.visible.len(),
            "Wound applied"
        );
        self.wound = Some(region);
        Ok(culled)
    }

    /// Clear the wound and restore every agent. No-op without a wound.
    pub fn disable_wound(&mut self) {
        if let Some(region) = self.wound.take() {
            self.restore_all();
            debug!(
                event = "wound_cleared",
                kind = %region.kind(),
                visible = self.visible.len(),
                "Wound cleared"
            );
        }
    }

    /// Presentation view of every agent
    pub fn snapshot(&self) -> Vec<AgentView> {
        self.agents
            .iter()
            .map(|agent| agent.view(self.is_visible(agent.id)))
            .collect()
    }
}
