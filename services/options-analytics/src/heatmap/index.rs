//! Nearest-point search over the strike x premium plane
//!
//! Both implementations answer every query identically: the point with the
//! smallest Euclidean distance, ties broken by the lowest input index.
//! Points with a non-finite coordinate are never returned.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Result of a nearest-point query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the input slice
    pub index: usize,
    /// Euclidean distance in data space
    pub distance: f64,
}

/// Nearest-point search
pub trait NearestPoint {
    /// Closest point to `(x, y)`, `None` when the index holds no usable point
    fn nearest(&self, x: f64, y: f64) -> Option<Neighbor>;
}

/// Which search strategy the heatmap uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Linear scan over every point
    #[default]
    BruteForce,
    /// Uniform bucket grid with ring search
    BucketGrid,
}

impl IndexKind {
    /// Build an index of this kind over `(strike, premium)` coordinates
    pub fn build(self, coords: Vec<(f64, f64)>) -> Box<dyn NearestPoint> {
        match self {
            IndexKind::BruteForce => Box::new(BruteForceIndex::new(coords)),
            IndexKind::BucketGrid => Box::new(BucketGridIndex::new(coords)),
        }
    }
}

#[inline]
fn squared_distance((px, py): (f64, f64), x: f64, y: f64) -> f64 {
    let dx = px - x;
    let dy = py - y;
    dx * dx + dy * dy
}

#[inline]
fn is_usable((x, y): (f64, f64)) -> bool {
    x.is_finite() && y.is_finite()
}

/// Keeps the best `(squared distance, index)` seen so far
#[derive(Default)]
struct Best(Option<(f64, usize)>);

impl Best {
    #[inline]
    fn offer(&mut self, d2: f64, index: usize) {
        let better = match self.0 {
            None => true,
            Some((best_d2, best_index)) => d2 < best_d2 || (d2 == best_d2 && index < best_index),
        };
        if better {
            self.0 = Some((d2, index));
        }
    }

    fn into_neighbor(self) -> Option<Neighbor> {
        self.0.map(|(d2, index)| Neighbor {
            index,
            distance: d2.sqrt(),
        })
    }
}

// ============================================================================
// BRUTE FORCE
// ============================================================================

/// Linear scan, O(points) per query
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    coords: Vec<(f64, f64)>,
}

impl BruteForceIndex {
    /// Index the given coordinates
    pub fn new(coords: Vec<(f64, f64)>) -> Self {
        Self { coords }
    }
}

impl NearestPoint for BruteForceIndex {
    fn nearest(&self, x: f64, y: f64) -> Option<Neighbor> {
        if !is_usable((x, y)) {
            return None;
        }
        let mut best = Best::default();
        for (index, &point) in self.coords.iter().enumerate() {
            if is_usable(point) {
                best.offer(squared_distance(point, x, y), index);
            }
        }
        best.into_neighbor()
    }
}

// ============================================================================
// BUCKET GRID
// ============================================================================

/// Uniform grid of buckets over the bounding box of the points
///
/// Queries visit rings of buckets around the query's cell and stop once the
/// next ring cannot contain anything closer than the best hit so far.
#[derive(Debug, Clone)]
pub struct BucketGridIndex {
    coords: Vec<(f64, f64)>,
    buckets: FxHashMap<(i64, i64), Vec<usize>>,
    origin: (f64, f64),
    cell: (f64, f64),
    dims: (i64, i64),
}

impl BucketGridIndex {
    /// Index the given coordinates
    pub fn new(coords: Vec<(f64, f64)>) -> Self {
        let usable: Vec<usize> = (0..coords.len()).filter(|&i| is_usable(coords[i])).collect();

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &i in &usable {
            let (x, y) = coords[i];
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let side = ((usable.len() as f64).sqrt().ceil() as i64).max(1);
        let cell_size = |span: f64| {
            let size = span / side as f64;
            if size > 0.0 && size.is_finite() { size } else { 1.0 }
        };

        let mut index = Self {
            coords,
            buckets: FxHashMap::default(),
            origin: if usable.is_empty() { (0.0, 0.0) } else { (min_x, min_y) },
            cell: (cell_size(max_x - min_x), cell_size(max_y - min_y)),
            dims: (side, side),
        };

        for i in usable {
            let (x, y) = index.coords[i];
            let key = index.cell_of(x, y);
            index.buckets.entry(key).or_default().push(i);
        }
        index
    }

    /// Bucket containing `(x, y)`, clamped into the grid
    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        let axis = |v: f64, origin: f64, size: f64, dim: i64| {
            let raw = ((v - origin) / size).floor();
            if raw.is_nan() {
                0
            } else {
                (raw.clamp(0.0, (dim - 1) as f64)) as i64
            }
        };
        (
            axis(x, self.origin.0, self.cell.0, self.dims.0),
            axis(y, self.origin.1, self.cell.1, self.dims.1),
        )
    }

    fn scan_bucket(&self, key: (i64, i64), x: f64, y: f64, best: &mut Best) {
        if let Some(members) = self.buckets.get(&key) {
            for &i in members {
                best.offer(squared_distance(self.coords[i], x, y), i);
            }
        }
    }
}

impl NearestPoint for BucketGridIndex {
    fn nearest(&self, x: f64, y: f64) -> Option<Neighbor> {
        if self.buckets.is_empty() || !is_usable((x, y)) {
            return None;
        }

        let (cx, cy) = self.cell_of(x, y);
        let (nx, ny) = self.dims;
        let max_ring = nx.max(ny);
        let step = self.cell.0.min(self.cell.1);
        let mut best = Best::default();

        for ring in 0..=max_ring {
            if let Some((best_d2, _)) = best.0 {
                // Ring members are at least (ring - 1) cells away on one axis,
                // less one cell of slack for rounding at bucket edges
                let bound = (ring - 2).max(0) as f64 * step;
                if bound * bound > best_d2 {
                    break;
                }
            }

            for i in (cx - ring)..=(cx + ring) {
                if i < 0 || i >= nx {
                    continue;
                }
                for j in (cy - ring)..=(cy + ring) {
                    if j < 0 || j >= ny {
                        continue;
                    }
                    if (i - cx).abs() == ring || (j - cy).abs() == ring {
                        self.scan_bucket((i, j), x, y, &mut best);
                    }
                }
            }
        }
        best.into_neighbor()
    }
}
