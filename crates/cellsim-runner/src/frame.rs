//! Headless presentation: per-agent shapes and JSON-lines frames.

use anyhow::{Context, Result};
use cellsim_core::{normalize_or_self, AgentId, MotilityState};
use cellsim_world::AgentView;
use glam::DVec2;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Outline used to draw one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    /// Axis-aligned ellipse anchored at the agent position
    Ellipse { width: f64, height: f64 },
    /// Arrowhead whose tip is the agent position, trailing against the velocity
    Triangle { tip: DVec2, left: DVec2, right: DVec2 },
}

/// Pick a shape from how fast the agent moves.
///
/// Still or slow agents are round, moderately fast ones stretch by one or two
/// units along their dominant axis, and fast ones become triangles.
pub fn shape_for(position: DVec2, velocity: DVec2, radius: f64, state: MotilityState) -> Shape {
    let (vx, vy) = (velocity.x.abs(), velocity.y.abs());

    if state == MotilityState::NonMotile || (vx < 0.1 && vy < 0.1) {
        return Shape::Ellipse { width: radius, height: radius };
    }

    let stretch = if vx < 0.3 && vy < 0.3 {
        Some(1.0)
    } else if vx < 0.5 && vy < 0.5 {
        Some(2.0)
    } else {
        None
    };
    if let Some(stretch) = stretch {
        return if vx > vy {
            Shape::Ellipse { width: radius + stretch, height: radius }
        } else {
            Shape::Ellipse { width: radius, height: radius + stretch }
        };
    }

    let heading = normalize_or_self(velocity, 0.0);
    let base = position - heading * radius;
    let normal = DVec2::new(-heading.y, heading.x) * (radius / 2.0).floor();
    Shape::Triangle {
        tip: position,
        left: base - normal,
        right: base + normal,
    }
}

#[derive(Debug, Serialize)]
struct FrameAgent {
    id: AgentId,
    position: DVec2,
    radius: f64,
    state: MotilityState,
    #[serde(flatten)]
    shape: Shape,
}

#[derive(Debug, Serialize)]
struct Frame {
    tick: u64,
    agents: Vec<FrameAgent>,
}

/// Writes one JSON object per frame
pub struct FrameWriter {
    out: Box<dyn Write + Send>,
}

impl FrameWriter {
    /// Frames go to `path` when given, stdout otherwise.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let out: Box<dyn Write + Send> = match path {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating frame file {}", path))?,
            )),
            None => Box::new(std::io::stdout()),
        };
        Ok(Self { out })
    }

    #[cfg(test)]
    fn from_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    /// Write the visible agents as one frame
    pub fn write(&mut self, tick: u64, views: &[AgentView]) -> Result<()> {
        let agents = views
            .iter()
            .filter(|v| v.visible)
            .map(|v| FrameAgent {
                id: v.id,
                position: v.position,
                radius: v.radius,
                state: v.state,
                shape: shape_for(v.position, v.velocity, v.radius, v.state),
            })
            .collect();
        serde_json::to_writer(&mut self.out, &Frame { tick, agents })?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
