//! Input schemas.
//!
//! Topology ("node info") and wire ("wire info") files are JSON; the run
//! configuration is YAML. Required sections are `Option` so their absence
//! can be reported as a [`DefinitionError`](crate::error::DefinitionError)
//! naming the section instead of a bare parse error.

use crate::flow::version::OfpVersion;
use crate::orchestrator::GenerateMode;
use crate::topology::link::LinkElement;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Physical topology: switches, hosts and the links between them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatchers: Option<IndexMap<String, SwitchDefinition>>,
    #[serde(default, rename = "test-hosts", skip_serializing_if = "Option::is_none")]
    pub test_hosts: Option<IndexMap<String, HostDefinition>>,
    #[serde(default, rename = "dut-hosts", skip_serializing_if = "Option::is_none")]
    pub dut_hosts: Option<IndexMap<String, HostDefinition>>,
    #[serde(default, rename = "link-list", skip_serializing_if = "Option::is_none")]
    pub link_list: Option<Vec<LinkDefinition>>,
}

/// Undirected link: `[[node, port], [node, port]]`
pub type LinkDefinition = (LinkElement, LinkElement);

/// OpenFlow switch ("dispatcher")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchDefinition {
    #[serde(rename = "datapath-id")]
    pub datapath_id: u64,
    #[serde(rename = "port-index")]
    pub port_index: IndexMap<String, serde_json::Value>,
}

/// Test host or DUT host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostDefinition {
    #[serde(rename = "port-index")]
    pub port_index: IndexMap<String, serde_json::Value>,
}

/// Port payload of a switch port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchPortData {
    pub number: u32,
}

/// Port payload of a test host port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestHostPortData {
    #[serde(rename = "mac-addr")]
    pub mac_addr: String,
    #[serde(rename = "ip-addr")]
    pub ip_addr: String,
    #[serde(default)]
    pub gateway: Option<String>,
}

/// Port payload of a DUT host port
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DutHostPortData {
    #[serde(default, rename = "vlan-id")]
    pub vlan_id: Option<u32>,
    #[serde(default, rename = "vlan-tagged")]
    pub vlan_tagged: Option<bool>,
}

/// Logical wires and wire groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireInfo {
    #[serde(default, rename = "wire-index", skip_serializing_if = "Option::is_none")]
    pub wire_index: Option<IndexMap<String, WireDefinition>>,
    #[serde(default, rename = "wire-group-index", skip_serializing_if = "Option::is_none")]
    pub wire_group_index: Option<IndexMap<String, WireGroupDefinition>>,
}

/// One logical wire. Every key is required; missing keys are reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<LinkElement>>,
    #[serde(default, rename = "test-host-port", skip_serializing_if = "Option::is_none")]
    pub test_host_port: Option<LinkElement>,
    #[serde(default, rename = "dut-host-port", skip_serializing_if = "Option::is_none")]
    pub dut_host_port: Option<LinkElement>,
}

/// One wire group (broadcast domain)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireGroupDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wires: Option<Vec<String>>,
}

/// Run configuration (YAML). Command-line flags override these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub compile: CompileConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// env_logger filter, e.g. "info" or "l1patch=debug"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Physical topology (node info) JSON file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical: Option<PathBuf>,
    /// Logical topology (wire info) JSON file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GenerateMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ofp_version: Option<OfpVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_deny: Option<bool>,
}

impl RunConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(level) = &self.general.log_level {
            if level.trim().is_empty() {
                return Err(ValidationError::InvalidGeneral(
                    "log_level cannot be empty".to_string(),
                ));
            }
        }

        for (key, path) in [
            ("physical", &self.compile.physical),
            ("logical", &self.compile.logical),
        ] {
            if let Some(path) = path {
                if path.as_os_str().is_empty() {
                    return Err(ValidationError::InvalidCompile(format!(
                        "{} path cannot be empty",
                        key
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Run configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid compile configuration: {0}")]
    InvalidCompile(String),
}
