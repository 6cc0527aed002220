//! Wound geometry and containment.

use cellsim_core::{Result, WoundConfig, WoundKind};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A region that hides every agent inside it.
///
/// All shapes derive their size from the same area parameter through the
/// characteristic radius `sqrt(area / pi)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WoundRegion {
    /// Full-width horizontal band
    Line { center_y: f64, half_height: f64 },
    /// Regular polygon inscribed in a circle
    Polygon { vertices: Vec<DVec2> },
    Circle { center: DVec2, radius: f64 },
}

impl WoundRegion {
    /// Build a region from validated user parameters.
    pub fn from_config(config: &WoundConfig) -> Result<Self> {
        config.validate()?;
        let region = match config.kind {
            WoundKind::Line => WoundRegion::Line {
                center_y: config.center.y,
                half_height: config.area / 2.0,
            },
            WoundKind::Polygon => {
                let radius = characteristic_radius(config.area);
                let n = config.angles as f64;
                let vertices = (1..=config.angles)
                    .map(|i| {
                        let theta = 2.0 * PI * i as f64 / n;
                        config.center + DVec2::new(radius * theta.cos(), radius * theta.sin())
                    })
                    .collect();
                WoundRegion::Polygon { vertices }
            }
            WoundKind::Circle => WoundRegion::Circle {
                center: config.center,
                radius: characteristic_radius(config.area),
            },
        };
        Ok(region)
    }

    pub fn kind(&self) -> WoundKind {
        match self {
            WoundRegion::Line { .. } => WoundKind::Line,
            WoundRegion::Polygon { .. } => WoundKind::Polygon,
            WoundRegion::Circle { .. } => WoundKind::Circle,
        }
    }

    pub fn contains(&self, point: DVec2) -> bool {
        match self {
            WoundRegion::Line { center_y, half_height } => (point.y - center_y).abs() <= *half_height,
            WoundRegion::Polygon { vertices } => polygon_contains(vertices, point),
            WoundRegion::Circle { center, radius } => point.distance(*center) <= *radius,
        }
    }
}

/// Radius of the circle whose area is `area`
pub fn characteristic_radius(area: f64) -> f64 {
    (area / PI).sqrt()
}

/// Even-odd ray casting toward +x
fn polygon_contains(vertices: &[DVec2], point: DVec2) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > point.y) != (b.y > point.y) {
            let crossing_x = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
