//! Agent records.

use indexmap::IndexMap;
use tessera_core::{AgentId, Point2D, TaskId};

/// Which task holds the authoritative copy of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// This task is authoritative.
    Owned,
    /// Read-only copy of an agent owned by a neighbouring task.
    Ghost {
        /// Task holding the authoritative copy.
        owner: TaskId,
    },
}

/// Declared type of an agent attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttrKind {
    /// 64-bit signed integer.
    Int,
    /// UTF-8 string.
    Str,
}

/// Value of an agent attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttrValue {
    /// Integer attribute.
    Int(i64),
    /// String attribute.
    Str(String),
}

impl AttrValue {
    /// Declared type of this value.
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Int(_) => AttrKind::Int,
            AttrValue::Str(_) => AttrKind::Str,
        }
    }

    /// The integer, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Str(_) => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            AttrValue::Int(_) => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

/// A mobile agent.
///
/// The position is only changed through
/// [`AgentRegistry::move_to`](crate::AgentRegistry::move_to) so the
/// registry's cell index stays consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    id: AgentId,
    kind: String,
    position: Point2D,
    exists: bool,
    ownership: Ownership,
    executed: bool,
    attributes: IndexMap<String, AttrValue>,
}

impl Agent {
    /// A live, owned agent of type `kind` at `position`.
    pub fn new(id: impl Into<AgentId>, kind: impl Into<String>, position: Point2D) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            position,
            exists: true,
            ownership: Ownership::Owned,
            executed: false,
            attributes: IndexMap::new(),
        }
    }

    /// Unique id.
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Type tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Global position.
    pub fn position(&self) -> Point2D {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Point2D) {
        self.position = position;
    }

    /// `false` once the agent has been killed; the record is purged at the
    /// end of the step.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Clear the existence flag.
    pub fn kill(&mut self) {
        self.exists = false;
    }

    /// Owned or ghost.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub(crate) fn set_ownership(&mut self, ownership: Ownership) {
        self.ownership = ownership;
    }

    /// `true` if this task is authoritative.
    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    /// `true` if this is a copy of another task's agent.
    pub fn is_ghost(&self) -> bool {
        !self.is_owned()
    }

    /// Whether the agent already acted this step.
    pub fn executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn set_executed(&mut self, executed: bool) {
        self.executed = executed;
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Builder form of [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Attribute value, if set.
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Integer attribute, if set and an integer.
    pub fn int_attribute(&self, key: &str) -> Option<i64> {
        self.attribute(key).and_then(AttrValue::as_int)
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Owned copy for serializers.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id.clone(),
            kind: self.kind.clone(),
            position: self.position,
            attributes: self
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Serializable view of an owned agent at one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentSnapshot {
    /// Agent id.
    pub id: AgentId,
    /// Type tag.
    pub kind: String,
    /// Global position.
    pub position: Point2D,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, AttrValue)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_is_live_and_owned() {
        let a = Agent::new("sheep_0", "sheep", Point2D::new(1, 2));
        assert!(a.exists());
        assert!(a.is_owned());
        assert!(!a.executed());
        assert_eq!(a.id().as_str(), "sheep_0");
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let a = Agent::new("w", "wolf", Point2D::new(0, 0))
            .with_attribute("energy", 5i64)
            .with_attribute("name", "grey")
            .with_attribute("energy", 7i64);
        let keys: Vec<&str> = a.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["energy", "name"]);
        assert_eq!(a.int_attribute("energy"), Some(7));
        assert_eq!(a.attribute("name").and_then(AttrValue::as_str), Some("grey"));
        assert_eq!(a.int_attribute("name"), None);
    }

    #[test]
    fn snapshot_copies_state() {
        let a = Agent::new("w", "wolf", Point2D::new(3, 4)).with_attribute("age", 2i64);
        let s = a.snapshot();
        assert_eq!(s.position, Point2D::new(3, 4));
        assert_eq!(s.attributes, vec![("age".to_string(), AttrValue::Int(2))]);
    }
}
