//! Per-task registry of rasters.

use indexmap::IndexMap;
use tessera_core::{Point2D, RasterError, RasterId, Rect};

use crate::patch::RasterPatch;
use crate::raster::{Raster, RasterKind};

/// Lookup key for a raster: its name or its index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterKey<'a> {
    /// Registration name.
    Name(&'a str),
    /// Registration index.
    Id(RasterId),
}

impl<'a> From<&'a str> for RasterKey<'a> {
    fn from(name: &'a str) -> Self {
        RasterKey::Name(name)
    }
}

impl<'a> From<&'a String> for RasterKey<'a> {
    fn from(name: &'a String) -> Self {
        RasterKey::Name(name.as_str())
    }
}

impl From<RasterId> for RasterKey<'_> {
    fn from(id: RasterId) -> Self {
        RasterKey::Id(id)
    }
}

impl std::fmt::Display for RasterKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterKey::Name(name) => write!(f, "{name}"),
            RasterKey::Id(id) => write!(f, "#{id}"),
        }
    }
}

/// All rasters of one task, addressable by name or index.
///
/// Every raster covers the same region: the task's owned rectangle plus
/// its overlap band. Registration is open until [`seal`](Self::seal), which
/// also freezes static rasters.
///
/// # Examples
///
/// ```
/// use tessera_core::{Point2D, Rect, Size2D};
/// use tessera_raster::RasterStore;
///
/// let mut store = RasterStore::new(Rect::from_size(Size2D::new(4, 4)));
/// let food = store.register_dynamic("food", true, None).unwrap();
/// store.set_init_values(food, 0, 10, 2).unwrap();
/// store.set_value("food", &Point2D::new(1, 1), 9).unwrap();
/// assert_eq!(store.get_value(food, &Point2D::new(1, 1)).unwrap(), 9);
/// ```
#[derive(Clone, Debug)]
pub struct RasterStore {
    bounds: Rect,
    rasters: Vec<Option<Raster>>,
    names: IndexMap<String, RasterId>,
    sealed: bool,
}

impl RasterStore {
    /// Empty store whose rasters will cover `bounds`.
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            rasters: Vec::new(),
            names: IndexMap::new(),
            sealed: false,
        }
    }

    /// Region every raster covers.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Register a static raster. See [`register_dynamic`](Self::register_dynamic).
    pub fn register_static(
        &mut self,
        name: &str,
        serialize: bool,
        index: Option<RasterId>,
    ) -> Result<RasterId, RasterError> {
        self.register(name, RasterKind::Static, serialize, index)
    }

    /// Register a dynamic raster.
    ///
    /// Without an explicit `index` the raster takes the slot after the
    /// highest one in use. Fails if the name or the explicit index is
    /// already taken, or if the store is sealed.
    pub fn register_dynamic(
        &mut self,
        name: &str,
        serialize: bool,
        index: Option<RasterId>,
    ) -> Result<RasterId, RasterError> {
        self.register(name, RasterKind::Dynamic, serialize, index)
    }

    fn register(
        &mut self,
        name: &str,
        kind: RasterKind,
        serialize: bool,
        index: Option<RasterId>,
    ) -> Result<RasterId, RasterError> {
        if self.sealed {
            return Err(RasterError::Immutable {
                raster: name.to_string(),
            });
        }
        if self.names.contains_key(name) {
            return Err(RasterError::DuplicateName {
                name: name.to_string(),
            });
        }
        let id = index.unwrap_or(RasterId(self.rasters.len() as u32));
        if self.rasters.get(id.index()).is_some_and(Option::is_some) {
            return Err(RasterError::DuplicateIndex { index: id });
        }
        if self.rasters.len() <= id.index() {
            self.rasters.resize_with(id.index() + 1, || None);
        }
        self.rasters[id.index()] = Some(Raster::new(id, name, kind, serialize, self.bounds));
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Close registration and freeze every static raster.
    pub fn seal(&mut self) {
        self.sealed = true;
        for raster in self.rasters.iter_mut().flatten() {
            raster.freeze();
        }
    }

    /// `true` after [`seal`](Self::seal).
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of registered rasters.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` if no raster is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Look up a raster.
    pub fn get<'a>(&self, key: impl Into<RasterKey<'a>>) -> Result<&Raster, RasterError> {
        let key = key.into();
        self.slot(key)
            .and_then(|i| self.rasters.get(i))
            .and_then(Option::as_ref)
            .ok_or_else(|| not_found(key))
    }

    /// Look up a raster mutably.
    pub fn get_mut<'a>(&mut self, key: impl Into<RasterKey<'a>>) -> Result<&mut Raster, RasterError> {
        let key = key.into();
        self.slot(key)
            .and_then(|i| self.rasters.get_mut(i))
            .and_then(Option::as_mut)
            .ok_or_else(|| not_found(key))
    }

    /// Index registered under `name`.
    pub fn id_of(&self, name: &str) -> Result<RasterId, RasterError> {
        self.get(name).map(Raster::id)
    }

    /// Name registered at `id`.
    pub fn name(&self, id: RasterId) -> Option<&str> {
        self.get(id).ok().map(Raster::name)
    }

    /// Rasters in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Raster> {
        self.rasters.iter().flatten()
    }

    /// Indices of dynamic rasters, in index order.
    pub fn dynamic_ids(&self) -> Vec<RasterId> {
        self.iter()
            .filter(|r| r.kind() == RasterKind::Dynamic)
            .map(Raster::id)
            .collect()
    }

    /// Reset bounds and fill. See [`Raster::set_init_values`].
    pub fn set_init_values<'a>(
        &mut self,
        key: impl Into<RasterKey<'a>>,
        min: i32,
        max: i32,
        default: i32,
    ) -> Result<(), RasterError> {
        self.get_mut(key)?.set_init_values(min, max, default)
    }

    /// Value at global position `p`.
    pub fn get_value<'a>(&self, key: impl Into<RasterKey<'a>>, p: &Point2D) -> Result<i32, RasterError> {
        self.get(key)?.value(p)
    }

    /// Write `value` at global position `p`.
    pub fn set_value<'a>(
        &mut self,
        key: impl Into<RasterKey<'a>>,
        p: &Point2D,
        value: i32,
    ) -> Result<(), RasterError> {
        self.get_mut(key)?.set_value(p, value)
    }

    /// Upper bound at global position `p`.
    pub fn get_max_value_at<'a>(
        &self,
        key: impl Into<RasterKey<'a>>,
        p: &Point2D,
    ) -> Result<i32, RasterError> {
        self.get(key)?.max_value_at(p)
    }

    /// Set the upper bound at global position `p`.
    pub fn set_max_value<'a>(
        &mut self,
        key: impl Into<RasterKey<'a>>,
        p: &Point2D,
        max: i32,
    ) -> Result<(), RasterError> {
        self.get_mut(key)?.set_max_value(p, max)
    }

    /// Raise every cell of a raster to its bound.
    pub fn grow_to_max<'a>(&mut self, key: impl Into<RasterKey<'a>>) -> Result<(), RasterError> {
        self.get_mut(key)?.grow_to_max();
        Ok(())
    }

    /// Move every cell of a raster by `step`, clamped to its bounds.
    pub fn grow_by<'a>(&mut self, key: impl Into<RasterKey<'a>>, step: i32) -> Result<(), RasterError> {
        self.get_mut(key)?.grow_by(step);
        Ok(())
    }

    /// Patches of every raster over `area`, in index order.
    ///
    /// Static rasters are skipped unless `include_static` is set; they only
    /// travel during the initial exchange.
    pub fn extract_patches(&self, area: &Rect, include_static: bool) -> Vec<RasterPatch> {
        self.iter()
            .filter(|r| include_static || r.kind() == RasterKind::Dynamic)
            .filter_map(|r| r.extract_patch(area))
            .collect()
    }

    /// Overwrite the cells a patch covers.
    pub fn apply_patch(&mut self, patch: &RasterPatch) -> Result<(), RasterError> {
        self.get_mut(patch.raster)?.apply_patch(patch)
    }

    fn slot(&self, key: RasterKey<'_>) -> Option<usize> {
        match key {
            RasterKey::Name(name) => self.names.get(name).map(|id| id.index()),
            RasterKey::Id(id) => Some(id.index()),
        }
    }
}

fn not_found(key: RasterKey<'_>) -> RasterError {
    RasterError::NotFound {
        key: key.to_string(),
    }
}
