//! Raster store for Tessera simulations.
//!
//! A [`Raster`] is a named integer grid covering one task's boundaries
//! (owned region plus overlap band). Every cell carries its own upper
//! bound; the lower bound is raster-wide. The [`RasterStore`] registers
//! rasters by name and index, enforces the static/dynamic lifecycle, and
//! moves rectangular [`RasterPatch`]es in and out for boundary exchange.
//!
//! # Bound invariant
//!
//! After any successful mutation, every cell satisfies
//! `min <= value <= max(cell)`. Writes that would break it are rejected
//! with [`RasterError::ValueOutOfRange`](tessera_core::RasterError); bound
//! changes clamp existing values instead.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod patch;
pub mod raster;
pub mod store;

pub use patch::{RasterPatch, RasterSnapshot};
pub use raster::{Raster, RasterKind};
pub use store::{RasterKey, RasterStore};
