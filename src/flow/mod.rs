//! Flow rule compiler.
//!
//! This module turns flat per-hop requests into protocol-version-specific
//! rule bodies, and defines the commands used to hand them to the
//! controller runtime.

pub mod builder;
pub mod command;
pub mod request;
pub mod rule;
pub mod version;

pub use builder::{build_flow, FlowRuleBuilder};
pub use command::{FlowCommand, FlowMod};
pub use request::{merge_flow_requests, FlowRequest, FlowRequestMap};
pub use rule::{Action, FlowMatch, FlowRule, FlowRuleEncoding};
pub use version::OfpVersion;
