//! Physical topology module.
//!
//! This module contains the node/port model of the test environment, the
//! physical link index, and the resolver that assigns each port its
//! functional role from the node at the other end of its link.

pub mod types;
pub mod link;
pub mod node_manager;

// Re-export key types for easier access
pub use types::{DutHostPort, Node, NodeRole, Port, PortRole, TestHostPort};
pub use link::{Link, LinkElement, LinkManager};
pub use node_manager::NodeManager;
