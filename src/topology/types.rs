//! Node and port type definitions.
//!
//! A port starts as [`PortRole::Generic`] when its node is created and is
//! replaced by a typed port once the role of the node at the far end of its
//! link is known (see [`NodeManager`](crate::topology::NodeManager)).

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Role of a node in the test environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    TestHost,
    DutHost,
    Switch,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TestHost => "test-host",
            Self::DutHost => "dut-host",
            Self::Switch => "switch",
        };
        f.write_str(name)
    }
}

/// Addressing of a test host port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestHostPort {
    pub mac_addr: String,
    pub ip_addr: String,
    pub gateway: Option<String>,
}

/// VLAN setting of a DUT host port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DutHostPort {
    pub vlan_id: u32,
    pub vlan_tagged: bool,
}

impl DutHostPort {
    /// The DUT port is a VLAN trunk with a usable VLAN id
    pub fn has_vlan(&self) -> bool {
        self.vlan_tagged && 0 < self.vlan_id && self.vlan_id < 4096
    }

    /// VLAN id, when [`has_vlan`](Self::has_vlan) holds
    pub fn vlan(&self) -> Option<u16> {
        if self.has_vlan() {
            u16::try_from(self.vlan_id).ok()
        } else {
            None
        }
    }
}

/// Functional role of a port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "kebab-case")]
pub enum PortRole {
    /// Not resolved yet
    Generic,
    /// Switch port facing a test host
    HostEdge,
    /// Switch port facing a DUT host
    DutEdge,
    /// Switch port facing another switch
    InterSwitch,
    TestHost(TestHostPort),
    DutHost(DutHostPort),
}

impl PortRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::HostEdge => "host-edge",
            Self::DutEdge => "dut-edge",
            Self::InterSwitch => "inter-switch",
            Self::TestHost(_) => "test-host",
            Self::DutHost(_) => "dut-host",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Port {
    pub name: String,
    /// Port payload as written in the topology file
    pub data: serde_json::Value,
    /// OpenFlow port number; 0 for host ports
    pub number: u32,
    pub role: PortRole,
}

impl Port {
    pub fn generic(name: &str, data: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            data,
            number: 0,
            role: PortRole::Generic,
        }
    }

    pub fn is_host_edge_port(&self) -> bool {
        matches!(self.role, PortRole::HostEdge)
    }

    pub fn is_dut_edge_port(&self) -> bool {
        matches!(self.role, PortRole::DutEdge)
    }

    pub fn is_inter_switch_port(&self) -> bool {
        matches!(self.role, PortRole::InterSwitch)
    }

    pub fn test_host_port(&self) -> Option<&TestHostPort> {
        match &self.role {
            PortRole::TestHost(port) => Some(port),
            _ => None,
        }
    }

    pub fn dut_host_port(&self) -> Option<&DutHostPort> {
        match &self.role {
            PortRole::DutHost(port) => Some(port),
            _ => None,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Port:{{ name:{}, role:{}, data:{} }}",
            self.name,
            self.role.name(),
            self.data
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub role: NodeRole,
    /// Datapath id; 0 for hosts
    pub datapath_id: u64,
    pub ports: IndexMap<String, Port>,
}

impl Node {
    pub fn new(
        name: &str,
        role: NodeRole,
        datapath_id: u64,
        port_index: &IndexMap<String, serde_json::Value>,
    ) -> Self {
        let ports = port_index
            .iter()
            .map(|(port_name, data)| (port_name.clone(), Port::generic(port_name, data.clone())))
            .collect();
        Self {
            name: name.to_string(),
            role,
            datapath_id,
            ports,
        }
    }

    pub fn port_names(&self) -> impl Iterator<Item = &str> {
        self.ports.keys().map(String::as_str)
    }

    pub fn port_by_name(&self, port_name: &str) -> Option<&Port> {
        self.ports.get(port_name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node: {} (dpid:{})", self.name, self.datapath_id)
    }
}
