//! Flock simulation engine.
//!
//! This module implements the agent kinetics, the population update loop, wound
//! culling, and the tick clock that drives them.

pub mod agent;
pub mod clock;
pub mod population;
pub mod rng;
pub mod simulation;
pub mod spatial;
pub mod wound;

pub use agent::{Agent, AgentView, Flock, StepOutcome};
pub use clock::SimulationClock;
pub use population::{Aggregates, Population};
pub use rng::RandomSource;
pub use simulation::{Simulation, SimulationReport};
pub use spatial::{GridIndex, LinearIndex, Neighbor, SpatialIndex};
pub use wound::WoundRegion;
