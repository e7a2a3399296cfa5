//! Agent registry for Tessera simulations.
//!
//! Agents live in one table per task keyed by [`AgentId`](tessera_core::AgentId).
//! Whether the task is authoritative for an agent is a field on the record
//! ([`Ownership`]), not a separate container: owned agents act and are
//! serialized, ghost agents are read-only copies of a neighbour's agents
//! that sit in this task's overlap band and only answer spatial queries.
//!
//! Neighbour searches go through a single lazy traversal
//! ([`AgentRegistry::neighbours_iter`]); counting and collecting are
//! terminal operations on it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod agent;
pub mod filter;
pub mod registry;

pub use agent::{Agent, AgentSnapshot, AttrKind, AttrValue, Ownership};
pub use filter::TypeFilter;
pub use registry::{AgentRegistry, NEIGHBOUR_EPSILON};
