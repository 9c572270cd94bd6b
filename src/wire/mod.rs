//! Logical wires and wire groups over the physical topology.

pub mod logical_wire;
pub mod manager;
pub mod wire_group;

pub use logical_wire::{HopPair, LogicalWire, PathElement, PortEntity, WireMode};
pub use manager::WireManager;
pub use wire_group::WireGroup;
