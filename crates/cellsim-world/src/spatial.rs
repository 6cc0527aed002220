//! Neighbor discovery.

use cellsim_core::AgentId;
use glam::DVec2;
use std::collections::HashMap;

/// A neighbor as seen through the index: the id, position and radius the
/// agent had when it was inserted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: AgentId,
    pub position: DVec2,
    /// Half-width of the agent's square bounding box
    pub radius: f64,
}

/// Spatial query collaborator used by the population.
///
/// The index holds a snapshot: positions are whatever was passed to `insert`,
/// and moving an agent afterwards does not move its entry.
pub trait SpatialIndex {
    /// Drop every entry
    fn clear(&mut self);

    /// Register an agent whose bounding box is the square of half-width
    /// `radius` around `position`
    fn insert(&mut self, id: AgentId, position: DVec2, radius: f64);

    /// Every entry whose bounding box intersects the square window of
    /// half-width `padding` centered on `position`, touching edges included.
    /// Results are sorted by id.
    fn neighbors(&self, position: DVec2, padding: f64) -> Vec<Neighbor>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn in_window(center: DVec2, padding: f64, neighbor: &Neighbor) -> bool {
    let reach = padding + neighbor.radius;
    (neighbor.position.x - center.x).abs() <= reach
        && (neighbor.position.y - center.y).abs() <= reach
}

/// Uniform bucket grid
#[derive(Debug, Clone)]
pub struct GridIndex {
    cell_size: f64,
    buckets: HashMap<(i64, i64), Vec<Neighbor>>,
    count: usize,
    /// Largest radius inserted since the last clear; widens the bucket scan
    max_radius: f64,
}

impl GridIndex {
    /// `cell_size` should be close to the padding used for queries.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            buckets: HashMap::new(),
            count: 0,
            max_radius: 0.0,
        }
    }

    fn cell_coords(&self, position: DVec2) -> (i64, i64) {
        (
            (position.x / self.cell_size).floor() as i64,
            (position.y / self.cell_size).floor() as i64,
        )
    }
}

impl SpatialIndex for GridIndex {
    fn clear(&mut self) {
        // Keep bucket allocations for the next rebuild
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        self.count = 0;
        self.max_radius = 0.0;
    }

    fn insert(&mut self, id: AgentId, position: DVec2, radius: f64) {
        let cell = self.cell_coords(position);
        self.buckets
            .entry(cell)
            .or_default()
            .push(Neighbor { id, position, radius });
        self.count += 1;
        self.max_radius = self.max_radius.max(radius);
    }

    fn neighbors(&self, position: DVec2, padding: f64) -> Vec<Neighbor> {
        let reach = DVec2::splat(padding + self.max_radius);
        let (min_x, min_y) = self.cell_coords(position - reach);
        let (max_x, max_y) = self.cell_coords(position + reach);

        let mut found = Vec::new();
        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                if let Some(bucket) = self.buckets.get(&(cx, cy)) {
                    found.extend(
                        bucket
                            .iter()
                            .filter(|n| in_window(position, padding, n))
                            .copied(),
                    );
                }
            }
        }
        // Creation order, independent of bucket layout
        found.sort_by_key(|n| n.id);
        found
    }

    fn len(&self) -> usize {
        self.count
    }
}

/// Linear scan over every entry
#[derive(Debug, Clone, Default)]
pub struct LinearIndex {
    entries: Vec<Neighbor>,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for LinearIndex {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(&mut self, id: AgentId, position: DVec2, radius: f64) {
        self.entries.push(Neighbor { id, position, radius });
    }

    fn neighbors(&self, position: DVec2, padding: f64) -> Vec<Neighbor> {
        let mut found: Vec<Neighbor> = self
            .entries
            .iter()
            .filter(|n| in_window(position, padding, n))
            .copied()
            .collect();
        found.sort_by_key(|n| n.id);
        found
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
