//! Agent type filters for queries.

use std::fmt;

/// Restricts a query to one agent type, or matches every type.
///
/// The string `"all"` converts to [`TypeFilter::All`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeFilter {
    /// Match every agent.
    #[default]
    All,
    /// Match agents whose type tag equals this one.
    Kind(String),
}

impl TypeFilter {
    /// Sentinel type name that matches everything.
    pub const ALL: &'static str = "all";

    /// Whether an agent of type `kind` passes.
    pub fn matches(&self, kind: &str) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Kind(k) => k == kind,
        }
    }
}

impl From<&str> for TypeFilter {
    fn from(kind: &str) -> Self {
        if kind == Self::ALL {
            TypeFilter::All
        } else {
            TypeFilter::Kind(kind.to_string())
        }
    }
}

impl From<String> for TypeFilter {
    fn from(kind: String) -> Self {
        if kind == Self::ALL {
            TypeFilter::All
        } else {
            TypeFilter::Kind(kind)
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFilter::All => f.write_str(Self::ALL),
            TypeFilter::Kind(k) => f.write_str(k),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sentinel_matches_everything() {
        let f = TypeFilter::from("all");
        assert_eq!(f, TypeFilter::All);
        assert!(f.matches("sheep"));
        assert!(f.matches(""));
    }

    #[test]
    fn kind_matches_exactly() {
        let f = TypeFilter::from("wolf".to_string());
        assert!(f.matches("wolf"));
        assert!(!f.matches("Wolf"));
        assert!(!f.matches("sheep"));
        assert_eq!(f.to_string(), "wolf");
    }
}
