//! A single bounded raster grid.

use tessera_core::{Point2D, RasterError, RasterId, Rect};

use crate::patch::{RasterPatch, RasterSnapshot};

/// Lifecycle class of a raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RasterKind {
    /// Filled during initialization, read-only afterwards (except
    /// [`Raster::grow_to_max`]).
    Static,
    /// Updated every step by the environment.
    Dynamic,
}

/// Integer grid over one task's boundaries.
///
/// Positions are global; the raster stores only the cells inside
/// [`bounds`](Self::bounds). Values and per-cell maxima are packed
/// row-major.
#[derive(Clone, Debug)]
pub struct Raster {
    id: RasterId,
    name: String,
    kind: RasterKind,
    serialize: bool,
    bounds: Rect,
    min: i32,
    default_max: i32,
    values: Vec<i32>,
    max_values: Vec<i32>,
    frozen: bool,
}

impl Raster {
    /// Create a raster covering `bounds`, zero-filled, bounded by
    /// `[0, i32::MAX]` until [`set_init_values`](Self::set_init_values).
    pub fn new(
        id: RasterId,
        name: impl Into<String>,
        kind: RasterKind,
        serialize: bool,
        bounds: Rect,
    ) -> Self {
        let cells = bounds.area();
        Self {
            id,
            name: name.into(),
            kind,
            serialize,
            bounds,
            min: 0,
            default_max: i32::MAX,
            values: vec![0; cells],
            max_values: vec![i32::MAX; cells],
            frozen: false,
        }
    }

    /// Registration index.
    pub fn id(&self) -> RasterId {
        self.id
    }

    /// Registration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static or dynamic.
    pub fn kind(&self) -> RasterKind {
        self.kind
    }

    /// Whether the serializer receives this raster.
    pub fn serialize(&self) -> bool {
        self.serialize
    }

    /// Region this raster stores (owned region plus overlap band).
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Raster-wide lower bound.
    pub fn min_value(&self) -> i32 {
        self.min
    }

    /// Upper bound assigned to every cell by the last
    /// [`set_init_values`](Self::set_init_values).
    pub fn default_max_value(&self) -> i32 {
        self.default_max
    }

    /// `true` once a static raster has been sealed.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn freeze(&mut self) {
        if self.kind == RasterKind::Static {
            self.frozen = true;
        }
    }

    /// Raw row-major values over [`bounds`](Self::bounds).
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Raw row-major per-cell maxima over [`bounds`](Self::bounds).
    pub fn max_values(&self) -> &[i32] {
        &self.max_values
    }

    /// Reset bounds and fill every cell.
    ///
    /// Sets the lower bound to `min`, every cell's upper bound to `max`
    /// and every value to `default`. Fails if `min > max` or `default`
    /// lies outside `[min, max]`.
    pub fn set_init_values(&mut self, min: i32, max: i32, default: i32) -> Result<(), RasterError> {
        self.check_writable()?;
        if min > max || default < min || default > max {
            return Err(RasterError::InvalidBounds {
                raster: self.name.clone(),
                min,
                max,
                default,
            });
        }
        self.min = min;
        self.default_max = max;
        self.values.fill(default);
        self.max_values.fill(max);
        Ok(())
    }

    /// Current value at global position `p`.
    pub fn value(&self, p: &Point2D) -> Result<i32, RasterError> {
        let idx = self.index(p)?;
        Ok(self.values[idx])
    }

    /// Upper bound at global position `p`.
    pub fn max_value_at(&self, p: &Point2D) -> Result<i32, RasterError> {
        let idx = self.index(p)?;
        Ok(self.max_values[idx])
    }

    /// Write `value` at `p`.
    ///
    /// Rejects values outside `[min, max(p)]` and writes to a frozen
    /// static raster.
    pub fn set_value(&mut self, p: &Point2D, value: i32) -> Result<(), RasterError> {
        self.check_writable()?;
        let idx = self.index(p)?;
        let max = self.max_values[idx];
        if value < self.min || value > max {
            return Err(RasterError::ValueOutOfRange {
                raster: self.name.clone(),
                position: *p,
                value,
                min: self.min,
                max,
            });
        }
        self.values[idx] = value;
        Ok(())
    }

    /// Set the upper bound at `p`.
    ///
    /// A bound below the raster minimum is rejected. A bound below the
    /// current value clamps the value down to it.
    pub fn set_max_value(&mut self, p: &Point2D, max: i32) -> Result<(), RasterError> {
        self.check_writable()?;
        let idx = self.index(p)?;
        if max < self.min {
            return Err(RasterError::ValueOutOfRange {
                raster: self.name.clone(),
                position: *p,
                value: max,
                min: self.min,
                max: self.max_values[idx],
            });
        }
        self.max_values[idx] = max;
        if self.values[idx] > max {
            self.values[idx] = max;
        }
        Ok(())
    }

    /// Move every cell `step` towards its bounds, clamped to
    /// `[min, max(cell)]`. Negative steps shrink.
    pub fn grow_by(&mut self, step: i32) {
        let min = self.min;
        for (v, &max) in self.values.iter_mut().zip(&self.max_values) {
            *v = v.saturating_add(step).clamp(min, max);
        }
    }

    /// Raise every cell to its upper bound.
    ///
    /// Allowed on frozen static rasters.
    pub fn grow_to_max(&mut self) {
        self.values.copy_from_slice(&self.max_values);
    }

    /// Copy the cells of `area` (clipped to [`bounds`](Self::bounds)).
    ///
    /// Returns `None` if `area` misses this raster entirely.
    pub fn extract_patch(&self, area: &Rect) -> Option<RasterPatch> {
        let area = area.intersection(&self.bounds)?;
        let mut values = Vec::with_capacity(area.area());
        let mut max_values = Vec::with_capacity(area.area());
        for p in area.iter() {
            // area ⊆ bounds, so every index exists.
            let idx = self.bounds.local_index(&p)?;
            values.push(self.values[idx]);
            max_values.push(self.max_values[idx]);
        }
        Some(RasterPatch {
            raster: self.id,
            area,
            values,
            max_values,
        })
    }

    /// Overwrite the cells covered by `patch`.
    ///
    /// This is the boundary-merge path: it ignores the frozen flag, since
    /// ghost cells of static rasters must still track their owner. The
    /// patch must lie inside [`bounds`](Self::bounds) and carry one value
    /// and one bound per cell, with every value inside its bound.
    pub fn apply_patch(&mut self, patch: &RasterPatch) -> Result<(), RasterError> {
        if !self.bounds.contains_rect(&patch.area) {
            return Err(RasterError::OutOfBounds {
                raster: self.name.clone(),
                position: patch.area.origin,
                bounds: self.bounds,
            });
        }
        let expected = patch.area.area();
        for found in [patch.values.len(), patch.max_values.len()] {
            if found != expected {
                return Err(RasterError::ShapeMismatch {
                    raster: self.name.clone(),
                    expected,
                    found,
                });
            }
        }
        for ((p, &value), &max) in patch.area.iter().zip(&patch.values).zip(&patch.max_values) {
            if value < self.min || value > max {
                return Err(RasterError::ValueOutOfRange {
                    raster: self.name.clone(),
                    position: p,
                    value,
                    min: self.min,
                    max,
                });
            }
        }
        for ((p, &value), &max) in patch.area.iter().zip(&patch.values).zip(&patch.max_values) {
            let idx = self.index(&p)?;
            self.values[idx] = value;
            self.max_values[idx] = max;
        }
        Ok(())
    }

    /// Owned copy of the cells of `region` (clipped to
    /// [`bounds`](Self::bounds)) for serializers and viewers.
    pub fn snapshot(&self, region: &Rect) -> RasterSnapshot {
        let (area, values) = match self.extract_patch(region) {
            Some(patch) => (patch.area, patch.values),
            None => (Rect::new(region.origin, Default::default()), Vec::new()),
        };
        RasterSnapshot {
            raster: self.id,
            name: self.name.clone(),
            kind: self.kind,
            area,
            min: self.min,
            values,
        }
    }

    fn index(&self, p: &Point2D) -> Result<usize, RasterError> {
        self.bounds.local_index(p).ok_or_else(|| RasterError::OutOfBounds {
            raster: self.name.clone(),
            position: *p,
            bounds: self.bounds,
        })
    }

    fn check_writable(&self) -> Result<(), RasterError> {
        if self.frozen {
            return Err(RasterError::Immutable {
                raster: self.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tessera_core::Size2D;

    fn raster(kind: RasterKind) -> Raster {
        Raster::new(
            RasterId(0),
            "food",
            kind,
            true,
            Rect::new(Point2D::new(2, 3), Size2D::new(4, 3)),
        )
    }

    #[test]
    fn set_and_get_in_global_coordinates() {
        let mut r = raster(RasterKind::Dynamic);
        r.set_init_values(0, 10, 1).unwrap();
        r.set_value(&Point2D::new(5, 5), 7).unwrap();
        assert_eq!(r.value(&Point2D::new(5, 5)).unwrap(), 7);
        assert_eq!(r.value(&Point2D::new(2, 3)).unwrap(), 1);
    }

    #[test]
    fn outside_bounds_is_rejected() {
        let mut r = raster(RasterKind::Dynamic);
        match r.set_value(&Point2D::new(1, 3), 0) {
            Err(RasterError::OutOfBounds { position, .. }) => {
                assert_eq!(position, Point2D::new(1, 3));
            }
            other => panic!("expected OutOfBounds, got {other:?}"),
        }
        assert!(r.value(&Point2D::new(6, 3)).is_err());
    }

    #[test]
    fn value_outside_range_is_rejected() {
        let mut r = raster(RasterKind::Dynamic);
        r.set_init_values(-2, 5, 0).unwrap();
        let p = Point2D::new(3, 4);
        assert!(matches!(
            r.set_value(&p, 6),
            Err(RasterError::ValueOutOfRange { value: 6, min: -2, max: 5, .. })
        ));
        assert!(r.set_value(&p, -3).is_err());
        assert_eq!(r.value(&p).unwrap(), 0);
    }

    #[test]
    fn invalid_init_values_are_rejected() {
        let mut r = raster(RasterKind::Dynamic);
        assert!(matches!(
            r.set_init_values(5, 1, 3),
            Err(RasterError::InvalidBounds { .. })
        ));
        assert!(r.set_init_values(0, 4, 9).is_err());
    }

    #[test]
    fn lowering_max_clamps_value() {
        let mut r = raster(RasterKind::Dynamic);
        r.set_init_values(0, 10, 8).unwrap();
        let p = Point2D::new(4, 4);
        r.set_max_value(&p, 3).unwrap();
        assert_eq!(r.value(&p).unwrap(), 3);
        assert_eq!(r.max_value_at(&p).unwrap(), 3);
        assert!(r.set_max_value(&p, -1).is_err());
    }

    #[test]
    fn grow_by_clamps_per_cell() {
        let mut r = raster(RasterKind::Dynamic);
        r.set_init_values(0, 5, 0).unwrap();
        let p = Point2D::new(2, 3);
        r.set_max_value(&p, 1).unwrap();
        r.grow_by(2);
        assert_eq!(r.value(&p).unwrap(), 1);
        assert_eq!(r.value(&Point2D::new(3, 3)).unwrap(), 2);
        r.grow_by(-10);
        assert!(r.values().iter().all(|&v| v == 0));
    }

    #[test]
    fn frozen_static_raster_only_grows() {
        let mut r = raster(RasterKind::Static);
        r.set_init_values(0, 9, 0).unwrap();
        r.set_max_value(&Point2D::new(2, 3), 4).unwrap();
        r.freeze();
        assert!(matches!(
            r.set_value(&Point2D::new(2, 3), 1),
            Err(RasterError::Immutable { .. })
        ));
        assert!(r.set_max_value(&Point2D::new(2, 3), 1).is_err());
        r.grow_to_max();
        assert_eq!(r.value(&Point2D::new(2, 3)).unwrap(), 4);
        assert_eq!(r.value(&Point2D::new(5, 5)).unwrap(), 9);
    }

    #[test]
    fn freeze_ignores_dynamic_rasters() {
        let mut r = raster(RasterKind::Dynamic);
        r.freeze();
        assert!(!r.is_frozen());
    }

    #[test]
    fn patch_moves_values_and_bounds() {
        let mut src = raster(RasterKind::Dynamic);
        src.set_init_values(0, 10, 2).unwrap();
        src.set_max_value(&Point2D::new(3, 4), 6).unwrap();
        src.set_value(&Point2D::new(3, 4), 6).unwrap();

        let patch = src
            .extract_patch(&Rect::new(Point2D::new(0, 4), Size2D::new(4, 1)))
            .unwrap();
        assert_eq!(patch.area, Rect::new(Point2D::new(2, 4), Size2D::new(2, 1)));
        assert_eq!(patch.values, vec![2, 6]);

        let mut dst = raster(RasterKind::Static);
        dst.set_init_values(0, 10, 0).unwrap();
        dst.freeze();
        dst.apply_patch(&patch).unwrap();
        assert_eq!(dst.value(&Point2D::new(3, 4)).unwrap(), 6);
        assert_eq!(dst.max_value_at(&Point2D::new(3, 4)).unwrap(), 6);
    }

    #[test]
    fn malformed_patches_are_rejected() {
        let mut r = raster(RasterKind::Dynamic);
        let outside = RasterPatch {
            raster: RasterId(0),
            area: Rect::new(Point2D::new(0, 0), Size2D::new(1, 1)),
            values: vec![0],
            max_values: vec![0],
        };
        assert!(matches!(r.apply_patch(&outside), Err(RasterError::OutOfBounds { .. })));
        let short = RasterPatch {
            raster: RasterId(0),
            area: Rect::new(Point2D::new(2, 3), Size2D::new(2, 1)),
            values: vec![0],
            max_values: vec![0, 0],
        };
        assert!(matches!(
            r.apply_patch(&short),
            Err(RasterError::ShapeMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn snapshot_clips_to_region() {
        let mut r = raster(RasterKind::Dynamic);
        r.set_init_values(0, 3, 3).unwrap();
        let snap = r.snapshot(&Rect::new(Point2D::new(4, 3), Size2D::new(10, 1)));
        assert_eq!(snap.area, Rect::new(Point2D::new(4, 3), Size2D::new(2, 1)));
        assert_eq!(snap.values, vec![3, 3]);
        assert_eq!(snap.name, "food");
        let empty = r.snapshot(&Rect::new(Point2D::new(50, 50), Size2D::new(1, 1)));
        assert!(empty.values.is_empty());
    }

    #[derive(Clone, Debug)]
    enum Op {
        Set(i32, i32, i32),
        SetMax(i32, i32, i32),
        Grow(i32),
        Fill,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (2..6i32, 3..6i32, -20..40i32).prop_map(|(x, y, v)| Op::Set(x, y, v)),
            (2..6i32, 3..6i32, -20..40i32).prop_map(|(x, y, v)| Op::SetMax(x, y, v)),
            (-15..15i32).prop_map(Op::Grow),
            Just(Op::Fill),
        ]
    }

    proptest! {
        #[test]
        fn bound_invariant_holds_under_any_mutation(ops in prop::collection::vec(op(), 0..60)) {
            let mut r = raster(RasterKind::Dynamic);
            r.set_init_values(-5, 20, 0).unwrap();
            for op in ops {
                // Rejected writes are fine; the invariant must hold either way.
                let _ = match op {
                    Op::Set(x, y, v) => r.set_value(&Point2D::new(x, y), v),
                    Op::SetMax(x, y, v) => r.set_max_value(&Point2D::new(x, y), v),
                    Op::Grow(step) => { r.grow_by(step); Ok(()) }
                    Op::Fill => { r.grow_to_max(); Ok(()) }
                };
                for (v, m) in r.values().iter().zip(r.max_values()) {
                    prop_assert!(r.min_value() <= *v && v <= m, "{v} outside [{}, {m}]", r.min_value());
                }
            }
        }
    }
}
