//! Error types for layout construction.

use std::fmt;

use tessera_core::Size2D;

/// Errors arising from partition layout construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceError {
    /// The global domain has zero cells.
    EmptyDomain,
    /// A layout needs at least one task.
    NoTasks,
    /// A dimension exceeds what `i32` coordinates can address.
    DimensionTooLarge {
        /// Which dimension.
        name: &'static str,
        /// The offending value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },
    /// No grid of `tasks` sections fits the domain with at least one cell each.
    TooManyTasks {
        /// Requested task count.
        tasks: u32,
        /// Domain that had to be split.
        domain: Size2D,
    },
    /// The overlap band is wider than the narrowest section, so a band would
    /// reach past the adjacent sections.
    OverlapTooWide {
        /// Requested band width.
        overlap: u32,
        /// Narrowest section span in the layout.
        narrowest: u32,
    },
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDomain => write!(f, "domain must have at least one cell"),
            Self::NoTasks => write!(f, "layout needs at least one task"),
            Self::DimensionTooLarge { name, value, max } => {
                write!(f, "{name} = {value} exceeds maximum {max}")
            }
            Self::TooManyTasks { tasks, domain } => {
                write!(f, "cannot split {domain} domain into {tasks} sections")
            }
            Self::OverlapTooWide { overlap, narrowest } => write!(
                f,
                "overlap {overlap} is wider than the narrowest section ({narrowest})"
            ),
        }
    }
}

impl std::error::Error for SpaceError {}
