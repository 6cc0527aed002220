//! Core type definitions for the simulation.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest value any force coefficient may take.
pub const COEFFICIENT_FLOOR: f64 = 0.01;

/// Unique identifier for an agent.
///
/// Ids are handed out sequentially by the population, so an id doubles as the
/// agent's creation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl AgentId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Unit vector in the direction of `v`, or `v` unchanged when its length is
/// at or below `epsilon`.
pub fn normalize_or_self(v: DVec2, epsilon: f64) -> DVec2 {
    let length = v.length();
    if length > epsilon {
        v / length
    } else {
        v
    }
}

/// Movement state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MotilityState {
    #[default]
    NonMotile,
    Motile,
}

/// Cohesion (`r1`), separation (`r2`) and alignment (`r3`) weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
}

impl Coefficients {
    /// Build a coefficient set, raising each weight to [`COEFFICIENT_FLOOR`].
    pub fn new(r1: f64, r2: f64, r3: f64) -> Self {
        Self { r1, r2, r3 }.floored()
    }

    /// Copy with every weight raised to at least [`COEFFICIENT_FLOOR`].
    /// Non-finite weights collapse to the floor as well.
    pub fn floored(&self) -> Self {
        Self {
            r1: floor_coefficient(self.r1),
            r2: floor_coefficient(self.r2),
            r3: floor_coefficient(self.r3),
        }
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            r1: COEFFICIENT_FLOOR,
            r2: COEFFICIENT_FLOOR,
            r3: COEFFICIENT_FLOOR,
        }
    }
}

fn floor_coefficient(value: f64) -> f64 {
    if value.is_finite() {
        value.max(COEFFICIENT_FLOOR)
    } else {
        COEFFICIENT_FLOOR
    }
}

/// Geometry of a wound region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WoundKind {
    #[default]
    Line,
    Polygon,
    Circle,
}

impl fmt::Display for WoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WoundKind::Line => "line",
            WoundKind::Polygon => "polygon",
            WoundKind::Circle => "circle",
        };
        f.write_str(name)
    }
}
