//! Rectangular raster excerpts: exchange patches and read-only snapshots.

use tessera_core::{Point2D, RasterId, Rect};

use crate::raster::RasterKind;

/// Values and per-cell maxima of one raster over a rectangle.
///
/// This is the unit of boundary exchange: the owner of `area` extracts a
/// patch and the neighbour that ghosts it applies it verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterPatch {
    /// Raster the patch belongs to.
    pub raster: RasterId,
    /// Covered cells, in global coordinates.
    pub area: Rect,
    /// Row-major values over `area`.
    pub values: Vec<i32>,
    /// Row-major per-cell maxima over `area`.
    pub max_values: Vec<i32>,
}

/// Owned, read-only copy of a raster region handed to serializers and
/// viewers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterSnapshot {
    /// Raster index.
    pub raster: RasterId,
    /// Raster name.
    pub name: String,
    /// Static or dynamic.
    pub kind: RasterKind,
    /// Covered cells, in global coordinates.
    pub area: Rect,
    /// Raster-wide lower bound.
    pub min: i32,
    /// Row-major values over `area`.
    pub values: Vec<i32>,
}

impl RasterSnapshot {
    /// Value at global position `p`, if covered.
    pub fn get(&self, p: &Point2D) -> Option<i32> {
        self.area.local_index(p).and_then(|i| self.values.get(i).copied())
    }

    /// Sum of all covered values.
    pub fn total(&self) -> i64 {
        self.values.iter().map(|&v| i64::from(v)).sum()
    }
}
