//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::{Coefficients, WoundKind};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest accepted wound area
pub const MIN_WOUND_AREA: f64 = 50.0;
/// Largest accepted wound area
pub const MAX_WOUND_AREA: f64 = 100_000.0;
/// Fewest vertices a polygon wound may have
pub const MIN_WOUND_ANGLES: u32 = 3;
/// Most vertices a polygon wound may have
pub const MAX_WOUND_ANGLES: u32 = 50;
/// Shortest tick interval the clock accepts (one microsecond)
pub const MIN_TICK_INTERVAL_SECS: f64 = 1e-6;
/// Longest tick interval the clock accepts (one day)
pub const MAX_TICK_INTERVAL_SECS: f64 = 86_400.0;

/// Per-agent kinetics and state-machine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Radius of a freshly created or freshly divided agent
    pub initial_radius: f64,
    /// Radius at which an agent divides (growth division mode)
    pub division_radius: f64,
    /// Upper bound (exclusive) of the per-tick growth draw
    pub growth_range: u32,
    /// Draws below this value grow the radius by one
    pub growth_hits: u32,
    /// Probability per tick of leaving the non-motile state
    pub nonmotile_switch_prob: f64,
    /// Motile exit probability before the first alignment check
    pub initial_motile_switch_prob: f64,
    /// Motile exit probability when the bias points along the velocity
    pub aligned_switch_prob: f64,
    /// Motile exit probability otherwise
    pub misaligned_switch_prob: f64,
    /// Scale applied to the integer motility bias draw in [-10, 10]
    pub motility_force_scale: f64,
    /// Length of the velocity vector after normalization
    pub step_size: f64,
    /// Norms at or below this are treated as degenerate and never divided by
    pub degenerate_norm: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            initial_radius: 8.0,
            division_radius: 12.0,
            growth_range: 50,
            growth_hits: 2,
            nonmotile_switch_prob: 0.01,
            initial_motile_switch_prob: 0.005,
            aligned_switch_prob: 0.01,
            misaligned_switch_prob: 0.1,
            motility_force_scale: 0.1,
            step_size: 0.5,
            degenerate_norm: 0.001,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("initial_radius", self.initial_radius),
            ("division_radius", self.division_radius),
            ("motility_force_scale", self.motility_force_scale),
            ("step_size", self.step_size),
            ("degenerate_norm", self.degenerate_norm),
        ] {
            require_finite(name, value)?;
        }
        if !(self.initial_radius > 0.0) {
            return Err(Error::Validation(format!(
                "initial radius must be positive, got {}",
                self.initial_radius
            )));
        }
        if !(self.division_radius > self.initial_radius) {
            return Err(Error::Validation(format!(
                "division radius {} must exceed initial radius {}",
                self.division_radius, self.initial_radius
            )));
        }
        if self.growth_range == 0 {
            return Err(Error::Validation("growth range must be non-zero".to_string()));
        }
        for (name, p) in [
            ("nonmotile_switch_prob", self.nonmotile_switch_prob),
            ("initial_motile_switch_prob", self.initial_motile_switch_prob),
            ("aligned_switch_prob", self.aligned_switch_prob),
            ("misaligned_switch_prob", self.misaligned_switch_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Validation(format!(
                    "{} must lie in [0, 1], got {}",
                    name, p
                )));
            }
        }
        if self.motility_force_scale < 0.0 {
            return Err(Error::Validation(format!(
                "motility force scale must be non-negative, got {}",
                self.motility_force_scale
            )));
        }
        if self.step_size <= 0.0 || self.degenerate_norm < 0.0 {
            return Err(Error::Validation(
                "step size must be positive and degenerate norm non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reject NaN and infinities
fn require_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}

/// How agents divide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DivisionMode {
    /// Divide once stochastic growth brings the radius to the division radius
    #[default]
    Growth,
    /// Divide on a 1-in-`one_in` draw each tick, regardless of radius
    Random { one_in: u32 },
    /// Never divide; radius keeps growing
    Disabled,
}

/// Population-wide parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Default force coefficients for new agents
    pub coefficients: Coefficients,
    /// Half-width of the square neighbor window
    pub padding: f64,
    /// Side length of the square domain; velocities reflect outside [0, size]
    pub domain_size: f64,
    /// Agents spawned when a simulation starts
    pub initial_agents: usize,
    pub division_mode: DivisionMode,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            coefficients: Coefficients::default(),
            padding: 30.0,
            domain_size: 256.0,
            initial_agents: 2500,
            division_mode: DivisionMode::Growth,
        }
    }
}

impl PopulationConfig {
    pub fn validate(&self) -> Result<()> {
        require_finite("padding", self.padding)?;
        require_finite("domain_size", self.domain_size)?;
        let Coefficients { r1, r2, r3 } = self.coefficients;
        for (name, value) in [("r1", r1), ("r2", r2), ("r3", r3)] {
            require_finite(name, value)?;
        }
        if !(self.padding > 0.0) {
            return Err(Error::Validation(format!(
                "padding must be positive, got {}",
                self.padding
            )));
        }
        if !(self.domain_size > 0.0) {
            return Err(Error::Validation(format!(
                "domain size must be positive, got {}",
                self.domain_size
            )));
        }
        if let DivisionMode::Random { one_in: 0 } = self.division_mode {
            return Err(Error::Validation(
                "random division needs a non-zero one_in".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tick cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Ticks per second at speed factor 1.0
    pub base_hz: f64,
    /// Multiplier applied to the tick rate
    pub speed_factor: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            base_hz: 33.0,
            speed_factor: 1.0,
        }
    }
}

impl ClockConfig {
    pub fn validate(&self) -> Result<()> {
        self.interval_secs().map(|_| ())
    }

    /// Seconds between ticks, checked to lie in
    /// [`MIN_TICK_INTERVAL_SECS`, `MAX_TICK_INTERVAL_SECS`].
    pub fn interval_secs(&self) -> Result<f64> {
        validate_rate("base_hz", self.base_hz)?;
        validate_rate("speed_factor", self.speed_factor)?;
        let interval = 1.0 / (self.base_hz * self.speed_factor);
        if (MIN_TICK_INTERVAL_SECS..=MAX_TICK_INTERVAL_SECS).contains(&interval) {
            Ok(interval)
        } else {
            Err(Error::Validation(format!(
                "tick interval {}s from {} Hz at speed {} outside [{}, {}]",
                interval,
                self.base_hz,
                self.speed_factor,
                MIN_TICK_INTERVAL_SECS,
                MAX_TICK_INTERVAL_SECS
            )))
        }
    }
}

fn validate_rate(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}

/// Wound geometry as requested by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WoundConfig {
    pub kind: WoundKind,
    /// Area used to derive the characteristic radius sqrt(area / pi)
    pub area: f64,
    /// Vertex count, polygon only
    pub angles: u32,
    /// Center of polygon and circle wounds; the line band is centered on `center.y`
    pub center: DVec2,
}

impl Default for WoundConfig {
    fn default() -> Self {
        Self {
            kind: WoundKind::Line,
            area: 100.0,
            angles: MIN_WOUND_ANGLES,
            center: DVec2::new(256.0, 256.0),
        }
    }
}

impl WoundConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WOUND_AREA..=MAX_WOUND_AREA).contains(&self.area) {
            return Err(Error::Validation(format!(
                "wound area {} outside [{}, {}]",
                self.area, MIN_WOUND_AREA, MAX_WOUND_AREA
            )));
        }
        if self.kind == WoundKind::Polygon
            && !(MIN_WOUND_ANGLES..=MAX_WOUND_ANGLES).contains(&self.angles)
        {
            return Err(Error::Validation(format!(
                "polygon wound needs {}..={} vertices, got {}",
                MIN_WOUND_ANGLES, MAX_WOUND_ANGLES, self.angles
            )));
        }
        if !self.center.is_finite() {
            return Err(Error::Validation("wound center must be finite".to_string()));
        }
        Ok(())
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of ticks `Simulation::run` executes
    pub num_ticks: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Emit population metrics every this many ticks (0 disables)
    pub metrics_interval: u64,
    pub agent: AgentConfig,
    pub population: PopulationConfig,
    pub clock: ClockConfig,
    /// Wound applied automatically once the clock reaches `wound_at_tick`
    pub wound: Option<WoundConfig>,
    pub wound_at_tick: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_ticks: 10_000,
            seed: 0,
            metrics_interval: 100,
            agent: AgentConfig::default(),
            population: PopulationConfig::default(),
            clock: ClockConfig::default(),
            wound: None,
            wound_at_tick: 0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        self.agent.validate()?;
        self.population.validate()?;
        self.clock.validate()?;
        if let Some(wound) = &self.wound {
            wound.validate()?;
        }
        let floored = self.population.coefficients.floored();
        if floored != self.population.coefficients {
            tracing::debug!(
                requested = ?self.population.coefficients,
                applied = ?floored,
                "Coefficients below floor will be raised"
            );
        }
        Ok(())
    }
}

/// Headless runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub simulation: SimConfig,
    /// Pace ticks by the clock interval instead of running flat out
    pub realtime: bool,
    /// Write an agent frame every this many ticks (0 disables)
    pub frame_interval: u64,
    /// Where frames go; stdout when unset
    pub frame_path: Option<String>,
    /// Where the final report goes; stdout when unset
    pub report_path: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            simulation: SimConfig::default(),
            realtime: false,
            frame_interval: 0,
            frame_path: None,
            report_path: None,
        }
    }
}

impl RunnerConfig {
    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: RunnerConfig = serde_json::from_str(&raw)?;
        config.simulation.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let agent = AgentConfig::default();
        assert_eq!(agent.initial_radius, 8.0);
        assert_eq!(agent.division_radius, 12.0);
        assert_eq!(agent.growth_range, 50);
        assert_eq!(agent.nonmotile_switch_prob, 0.01);

        let population = PopulationConfig::default();
        assert_eq!(population.padding, 30.0);
        assert_eq!(population.domain_size, 256.0);
        assert_eq!(population.division_mode, DivisionMode::Growth);

        let clock = ClockConfig::default();
        assert_eq!(clock.base_hz, 33.0);

        let sim = SimConfig::default();
        assert!(sim.validate().is_ok());
        assert!(sim.wound.is_none());
    }

    #[test]
    fn test_wound_validation() {
        let ok = WoundConfig::default();
        assert!(ok.validate().is_ok());

        let small = WoundConfig { area: 49.0, ..Default::default() };
        assert!(matches!(small.validate(), Err(Error::Validation(_))));

        let triangle_ok = WoundConfig {
            kind: WoundKind::Polygon,
            angles: 3,
            ..Default::default()
        };
        assert!(triangle_ok.validate().is_ok());

        let digon = WoundConfig {
            kind: WoundKind::Polygon,
            angles: 2,
            ..Default::default()
        };
        assert!(digon.validate().is_err());

        // Vertex count only matters for polygons
        let circle = WoundConfig {
            kind: WoundKind::Circle,
            angles: 0,
            ..Default::default()
        };
        assert!(circle.validate().is_ok());
    }

    #[test]
    fn test_clock_validation() {
        assert!(ClockConfig { base_hz: 33.0, speed_factor: 0.0 }.validate().is_err());
        assert!(ClockConfig { base_hz: 33.0, speed_factor: f64::NAN }.validate().is_err());
        assert!(ClockConfig { base_hz: 33.0, speed_factor: 10.0 }.validate().is_ok());
    }

    #[test]
    fn test_clock_interval_bounds() {
        let tiny = ClockConfig { base_hz: 1e-200, speed_factor: 1e-200 };
        assert!(matches!(tiny.validate(), Err(Error::Validation(_))));

        let huge = ClockConfig { base_hz: 1e9, speed_factor: 1e9 };
        assert!(matches!(huge.validate(), Err(Error::Validation(_))));

        let interval = ClockConfig::default().interval_secs().unwrap();
        assert!((interval - 1.0 / 33.0).abs() < 1e-12);
    }

    #[test]
    fn test_agent_rejects_non_finite() {
        for bad in [
            AgentConfig { motility_force_scale: f64::NAN, ..Default::default() },
            AgentConfig { motility_force_scale: -0.1, ..Default::default() },
            AgentConfig { step_size: f64::INFINITY, ..Default::default() },
            AgentConfig { initial_radius: f64::NAN, ..Default::default() },
            AgentConfig { division_radius: f64::INFINITY, ..Default::default() },
            AgentConfig { degenerate_norm: f64::INFINITY, ..Default::default() },
        ] {
            assert!(matches!(bad.validate(), Err(Error::Validation(_))), "{:?}", bad);
        }
    }

    #[test]
    fn test_population_rejects_non_finite() {
        for bad in [
            PopulationConfig { padding: f64::INFINITY, ..Default::default() },
            PopulationConfig { domain_size: f64::NAN, ..Default::default() },
            PopulationConfig {
                coefficients: Coefficients { r1: f64::INFINITY, r2: 0.01, r3: 0.01 },
                ..Default::default()
            },
        ] {
            assert!(matches!(bad.validate(), Err(Error::Validation(_))), "{:?}", bad);
        }

        let sim = SimConfig {
            agent: AgentConfig { motility_force_scale: f64::NAN, ..Default::default() },
            ..Default::default()
        };
        assert!(sim.validate().is_err());
    }

    #[test]
    fn test_agent_validation() {
        let inverted = AgentConfig {
            division_radius: 8.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let bad_prob = AgentConfig {
            nonmotile_switch_prob: 1.5,
            ..Default::default()
        };
        assert!(bad_prob.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "seed": 7, "population": { "initial_agents": 10 } }"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.population.initial_agents, 10);
        assert_eq!(config.population.padding, 30.0);
        assert_eq!(config.num_ticks, 10_000);
    }

    #[test]
    fn test_sim_config_serialization() {
        let config = SimConfig {
            wound: Some(WoundConfig {
                kind: WoundKind::Circle,
                area: 500.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.wound.unwrap().kind, WoundKind::Circle);
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = RunnerConfig::from_json_file("/nonexistent/cellsim.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("cellsim-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "realtime": true, "simulation": { "seed": 9, "clock": { "speed_factor": 2.0 } } }"#,
        )
        .unwrap();
        let config = RunnerConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(config.realtime);
        assert_eq!(config.simulation.seed, 9);
        assert_eq!(config.simulation.clock.speed_factor, 2.0);
        assert_eq!(config.simulation.clock.base_hz, 33.0);
        assert_eq!(config.frame_interval, 0);
    }

    #[test]
    fn test_from_json_file_invalid_values() {
        let path = std::env::temp_dir().join(format!("cellsim-bad-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "simulation": { "population": { "padding": -1.0 } } }"#).unwrap();
        let err = RunnerConfig::from_json_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, Error::Validation(_)));
    }
}
