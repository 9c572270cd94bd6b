//! # L1patch - Flow rule compiler for layer-1 patch wiring
//!
//! This library compiles a physical switch/host topology and a set of logical
//! "wires" between test hosts and a device under test (DUT) into per-switch
//! OpenFlow rule sets.
//!
//! ## Overview
//!
//! A wire behaves like a patch cable between a test host port and a DUT port.
//! Exclusive wires own their path and forward by in-port only. Shared wires
//! multiplex one DUT port among several test hosts: they match the test
//! host's MAC address and, when the DUT port is a VLAN trunk, tag and untag
//! frames at the DUT edge. Wire groups join shared wires into one broadcast
//! domain.
//!
//! ## Architecture
//!
//! - `config_v2`: Input schemas for topology/wire JSON and the YAML run configuration
//! - `config_loader`: File loading
//! - `topology`: Nodes, ports, links and port role resolution
//! - `wire`: Logical wires, wire groups and their per-hop requests
//! - `flow`: Protocol-version-aware rule builder and flow commands
//! - `orchestrator`: Generation and merging of rules for a whole topology
//! - `error`: Error types
//! - `utils`: Address validation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use l1patch::flow::OfpVersion;
//! use l1patch::orchestrator::{FlowRuleGenerator, GenerateMode};
//! use std::path::Path;
//!
//! let generator = FlowRuleGenerator::from_files(
//!     Path::new("nodeinfo.json"),
//!     Path::new("wireinfo.json"),
//!     OfpVersion::OpenFlow13,
//! )?;
//!
//! // switch name -> per-hop requests
//! let requests = generator.generate(GenerateMode::All)?;
//! // switch name -> {priority, match, actions} rule bodies
//! let rules = generator.compile(GenerateMode::All)?;
//! # Ok::<(), color_eyre::eyre::Error>(())
//! ```
//!
//! ## Priorities
//!
//! | rule | priority |
//! |---|---|
//! | exclusive wire | 65535 |
//! | shared wire | 32767 |
//! | wire group broadcast | 16535 |
//! | default deny | 0 |

pub mod config_loader;
pub mod config_v2;
pub mod error;
pub mod flow;
pub mod orchestrator;
pub mod topology;
pub mod utils;
pub mod wire;

pub use error::{ControllerError, DefinitionError, Error, RestRequestError};
