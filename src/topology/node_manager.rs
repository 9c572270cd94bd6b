//! Topology construction and port role resolution.
//!
//! Construction happens in two phases:
//!
//! 1. Build every node with generic ports and index the physical links.
//! 2. For each port, look up the node at the other end of its link and
//!    replace the port with a typed one derived from that node's role.
//!
//! Port references obtained before resolution are stale afterwards; always
//! look ports up again through the manager.

use crate::config_v2::{DutHostPortData, SwitchPortData, TestHostPortData, TopologyDefinition};
use crate::error::DefinitionError;
use crate::topology::link::LinkManager;
use crate::topology::types::{DutHostPort, Node, NodeRole, Port, PortRole, TestHostPort};
use crate::utils::validation::validate_test_host_port;
use indexmap::IndexMap;
use log::{debug, info};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct NodeManager {
    dispatcher_index: IndexMap<String, Node>,
    test_host_index: IndexMap<String, Node>,
    dut_host_index: IndexMap<String, Node>,
    link_manager: LinkManager,
}

impl NodeManager {
    /// Build and resolve the topology
    pub fn new(topology: &TopologyDefinition) -> Result<Self, DefinitionError> {
        let mut manager = Self::build(topology)?;
        manager.resolve_ports()?;
        info!(
            "Topology resolved: {} dispatcher(s), {} test host(s), {} DUT host(s), {} link(s)",
            manager.dispatcher_index.len(),
            manager.test_host_index.len(),
            manager.dut_host_index.len(),
            manager.link_manager.links().len()
        );
        Ok(manager)
    }

    fn build(topology: &TopologyDefinition) -> Result<Self, DefinitionError> {
        let link_list = required(&topology.link_list, "link-list")?;
        let dispatchers = required(&topology.dispatchers, "dispatchers")?;
        let test_hosts = required(&topology.test_hosts, "test-hosts")?;
        let dut_hosts = required(&topology.dut_hosts, "dut-hosts")?;

        let mut manager = Self {
            dispatcher_index: IndexMap::new(),
            test_host_index: IndexMap::new(),
            dut_host_index: IndexMap::new(),
            link_manager: LinkManager::new(link_list),
        };

        for (name, switch) in dispatchers {
            manager.check_unique(name)?;
            let node = Node::new(name, NodeRole::Switch, switch.datapath_id, &switch.port_index);
            manager.dispatcher_index.insert(name.clone(), node);
        }
        for (name, host) in test_hosts {
            manager.check_unique(name)?;
            let node = Node::new(name, NodeRole::TestHost, 0, &host.port_index);
            manager.test_host_index.insert(name.clone(), node);
        }
        for (name, host) in dut_hosts {
            manager.check_unique(name)?;
            let node = Node::new(name, NodeRole::DutHost, 0, &host.port_index);
            manager.dut_host_index.insert(name.clone(), node);
        }
        Ok(manager)
    }

    fn check_unique(&self, name: &str) -> Result<(), DefinitionError> {
        if self.has_node(name) {
            return Err(DefinitionError::DuplicateNode {
                node: name.to_string(),
            });
        }
        Ok(())
    }

    fn resolve_ports(&mut self) -> Result<(), DefinitionError> {
        let mut resolved = Vec::new();
        for node in self.nodes() {
            for port in node.ports.values() {
                let typed = self.resolve_port(node, port)?;
                debug!("{}: {}", node.name, typed);
                resolved.push((node.role, node.name.clone(), typed));
            }
        }

        for (role, node_name, port) in resolved {
            let index = match role {
                NodeRole::Switch => &mut self.dispatcher_index,
                NodeRole::TestHost => &mut self.test_host_index,
                NodeRole::DutHost => &mut self.dut_host_index,
            };
            if let Some(node) = index.get_mut(&node_name) {
                node.ports.insert(port.name.clone(), port);
            }
        }
        Ok(())
    }

    fn counterpart_node_role(
        &self,
        node_name: &str,
        port_name: &str,
    ) -> Result<NodeRole, DefinitionError> {
        let counterpart = self
            .link_manager
            .counterpart_by_name(node_name, port_name)
            .ok_or_else(|| DefinitionError::LinkNotFound {
                node: node_name.to_string(),
                port: port_name.to_string(),
            })?;
        self.node_by_name(&counterpart.node)
            .map(|node| node.role)
            .ok_or_else(|| DefinitionError::UnknownCounterpart {
                node: node_name.to_string(),
                port: port_name.to_string(),
                counterpart: counterpart.node.clone(),
            })
    }

    /// Derive the typed port for `port` of `node` from its link counterpart
    fn resolve_port(&self, node: &Node, port: &Port) -> Result<Port, DefinitionError> {
        let counterpart_role = self.counterpart_node_role(&node.name, &port.name)?;
        let mut typed = port.clone();

        match node.role {
            NodeRole::Switch => {
                let data: SwitchPortData = parse_port_data(node, port)?;
                typed.number = data.number;
                typed.role = match counterpart_role {
                    NodeRole::TestHost => PortRole::HostEdge,
                    NodeRole::DutHost => PortRole::DutEdge,
                    NodeRole::Switch => PortRole::InterSwitch,
                };
            }
            NodeRole::TestHost => {
                expect_switch(node, port, counterpart_role)?;
                let data: TestHostPortData = parse_port_data(node, port)?;
                validate_test_host_port(&node.name, &port.name, &data)?;
                typed.role = PortRole::TestHost(TestHostPort {
                    mac_addr: data.mac_addr,
                    ip_addr: data.ip_addr,
                    gateway: data.gateway,
                });
            }
            NodeRole::DutHost => {
                expect_switch(node, port, counterpart_role)?;
                let data: DutHostPortData = parse_port_data(node, port)?;
                typed.role = PortRole::DutHost(DutHostPort {
                    vlan_id: data.vlan_id.unwrap_or(0),
                    vlan_tagged: data.vlan_tagged.unwrap_or(false),
                });
            }
        }
        Ok(typed)
    }

    /// All nodes: dispatchers, then test hosts, then DUT hosts
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.dispatcher_index
            .values()
            .chain(self.test_host_index.values())
            .chain(self.dut_host_index.values())
    }

    pub fn dispatchers(&self) -> impl Iterator<Item = &Node> {
        self.dispatcher_index.values()
    }

    pub fn test_hosts(&self) -> impl Iterator<Item = &Node> {
        self.test_host_index.values()
    }

    pub fn dut_hosts(&self) -> impl Iterator<Item = &Node> {
        self.dut_host_index.values()
    }

    pub fn link_manager(&self) -> &LinkManager {
        &self.link_manager
    }

    pub fn has_test_host(&self, name: &str) -> bool {
        self.test_host_index.contains_key(name)
    }

    pub fn has_dut_host(&self, name: &str) -> bool {
        self.dut_host_index.contains_key(name)
    }

    pub fn has_dispatcher(&self, name: &str) -> bool {
        self.dispatcher_index.contains_key(name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.has_test_host(name) || self.has_dispatcher(name) || self.has_dut_host(name)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.test_host_index
            .get(name)
            .or_else(|| self.dut_host_index.get(name))
            .or_else(|| self.dispatcher_index.get(name))
    }

    pub fn dispatcher_port_by_name(&self, node_name: &str, port_name: &str) -> Option<&Port> {
        self.dispatcher_index.get(node_name)?.port_by_name(port_name)
    }

    /// Port `port_name` of any node named `node_name`
    pub fn node_port_by_name(&self, node_name: &str, port_name: &str) -> Option<&Port> {
        self.node_by_name(node_name)?.port_by_name(port_name)
    }
}

fn required<'a, T>(section: &'a Option<T>, name: &'static str) -> Result<&'a T, DefinitionError> {
    section.as_ref().ok_or(DefinitionError::MissingSection {
        section: name,
        source_name: "node info",
    })
}

fn expect_switch(
    node: &Node,
    port: &Port,
    counterpart_role: NodeRole,
) -> Result<(), DefinitionError> {
    if counterpart_role == NodeRole::Switch {
        return Ok(());
    }
    Err(DefinitionError::UnexpectedCounterpart {
        role: node.role.to_string(),
        node: node.name.clone(),
        port: port.name.clone(),
        expected: "switch",
        found: counterpart_role.to_string(),
    })
}

fn parse_port_data<T: DeserializeOwned>(node: &Node, port: &Port) -> Result<T, DefinitionError> {
    serde_json::from_value(port.data.clone()).map_err(|err| DefinitionError::InvalidPort {
        node: node.name.clone(),
        port: port.name.clone(),
        reason: err.to_string(),
    })
}
