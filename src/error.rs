//! Error types.
//!
//! Three kinds of failure are distinguished:
//!
//! - [`DefinitionError`]: the topology or wire input is malformed or
//!   inconsistent. Fatal to the current compilation.
//! - [`RestRequestError`]: an ad hoc flow request lacks a mandatory field,
//!   does not match the request schema, or carries an out-of-range tag.
//!   Fatal to that one request.
//! - [`ControllerError`]: the target protocol version or command is not
//!   supported.

use crate::flow::version::OfpVersion;

/// Malformed or internally inconsistent topology/wire definition
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Could not find '{section}' data in {source_name}")]
    MissingSection {
        section: &'static str,
        source_name: &'static str,
    },

    #[error("{file}: json parse error: {reason}")]
    Parse { file: String, reason: String },

    #[error("Node '{node}' is defined more than once")]
    DuplicateNode { node: String },

    #[error("Node,Port={node},{port}: invalid port data: {reason}")]
    InvalidPort {
        node: String,
        port: String,
        reason: String,
    },

    #[error("Could not find link counterpart of Node,Port={node},{port}")]
    LinkNotFound { node: String, port: String },

    #[error("Node,Port={node},{port} is linked to unknown node '{counterpart}'")]
    UnknownCounterpart {
        node: String,
        port: String,
        counterpart: String,
    },

    #[error("{role},Port={node},{port} does not connect {expected} (connected to {found})")]
    UnexpectedCounterpart {
        role: String,
        node: String,
        port: String,
        expected: &'static str,
        found: String,
    },

    #[error("Wire:{wire} does not have key:{key}")]
    MissingWireKey { wire: String, key: &'static str },

    #[error("Wire:{wire} have invalid 'mode': {mode}")]
    InvalidMode { wire: String, mode: String },

    #[error("Wire:{wire} is not resolved against the topology")]
    UnresolvedWire { wire: String },

    #[error("Wire:{wire}: node or port definition missing in path element {node},{port}")]
    UnresolvedHop {
        wire: String,
        node: String,
        port: String,
    },

    #[error("Wire:{wire}: path element pairs not found for path {path}")]
    EmptyPath { wire: String, path: String },

    #[error("Wire:{wire}: wire head/tail is same type: dut-edge or host-edge")]
    AmbiguousOrientation { wire: String },

    #[error("Wire:{wire}: {endpoint} endpoint {node},{port} is not a {expected} port")]
    InvalidEndpoint {
        wire: String,
        endpoint: &'static str,
        node: String,
        port: String,
        expected: &'static str,
    },

    #[error("Wire group:{group} does not have key:{key}")]
    MissingGroupKey { group: String, key: &'static str },

    #[error("Wire group:{group} refers to unknown wire '{wire}'")]
    UnknownWire { group: String, wire: String },

    #[error("Wire group:{group}: member wire '{wire}' is not shared mode")]
    NonSharedMember { group: String, wire: String },

    #[error("Wire group:{group} has no member wires")]
    EmptyWireGroup { group: String },

    #[error("Wire group:{group}: id {id} is not usable as a VLAN id (1-4095)")]
    InvalidGroupId { group: String, id: u64 },

    #[error("OpenFlow version unknown for generation wire flow rule: {tag}")]
    UnknownOfpVersion { tag: String },

    #[error("Node,Port={node},{port}: invalid MAC address '{mac}'")]
    InvalidMacAddress {
        node: String,
        port: String,
        mac: String,
    },

    #[error("Node,Port={node},{port}: invalid IP address '{ip}'")]
    InvalidIpAddress {
        node: String,
        port: String,
        ip: String,
    },
}

/// Ad hoc flow request rejected before any rule is built
#[derive(Debug, thiserror::Error)]
pub enum RestRequestError {
    #[error("REST request does not include 'inport' key.")]
    MissingInport,

    #[error("REST request does not include any outport(s) action.")]
    MissingOutport,

    #[error("REST request body is invalid: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("REST request '{field}' is not a valid VLAN id (1-4095): {value}")]
    InvalidVlanId { field: &'static str, value: u16 },

    #[error("REST request '{field}' is not a valid MPLS label (0-1048575): {value}")]
    InvalidMplsLabel { field: &'static str, value: u32 },
}

/// Unsupported protocol version, command, or action encoding
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Unsupported OFP version: {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Action '{action}' is not supported by {version}")]
    UnsupportedAction {
        action: &'static str,
        version: OfpVersion,
    },
}

/// Any error produced while compiling flow rules
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Request error: {0}")]
    RestRequest(#[from] RestRequestError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
}
