//! Logical wires.
//!
//! A wire is an ordered path of `(node, port)` elements between a test host
//! and a DUT. Consecutive elements on the same node form a hop pair
//! (in-port, out-port), and each hop pair becomes one flow request on that
//! node.
//!
//! - Exclusive wires forward by in-port alone at priority 65535. The path
//!   has no direction: forward pairs follow the path, backward pairs follow
//!   the reversed path.
//! - Shared wires additionally match the test host's MAC address at
//!   priority 32767. The host-edge/dut-edge roles of the path's head and
//!   tail decide which traversal runs from host to DUT. When the DUT port is
//!   VLAN tagged, the hop next to the DUT pushes the tag towards the DUT and
//!   pops it towards the host.

use crate::config_v2::WireDefinition;
use crate::error::DefinitionError;
use crate::flow::request::{push_flow_request, FlowRequest, FlowRequestMap};
use crate::flow::version::OfpVersion;
use crate::topology::link::LinkElement;
use crate::topology::types::{DutHostPort, NodeRole, Port, TestHostPort};
use crate::topology::NodeManager;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const EXCLUSIVE_WIRE_PRIORITY: u16 = 65535;
pub const SHARED_WIRE_PRIORITY: u16 = 32767;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireMode {
    /// Dedicated path, forwarded by port only
    Exclusive,
    /// Multiplexed path, distinguished by test host MAC address
    Shared,
}

impl FromStr for WireMode {
    type Err = ();

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "exclusive" => Ok(Self::Exclusive),
            "shared" => Ok(Self::Shared),
            _ => Err(()),
        }
    }
}

impl fmt::Display for WireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => f.write_str("exclusive"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

/// Topology entities bound to a path element
#[derive(Debug, Clone, PartialEq)]
pub struct PortEntity {
    pub node_role: NodeRole,
    pub datapath_id: u64,
    pub port: Port,
}

/// One `(node, port)` element of a wire, with its resolved entity
#[derive(Debug, Clone, PartialEq)]
pub struct PathElement {
    pub elm: LinkElement,
    pub entity: Option<PortEntity>,
}

impl PathElement {
    fn new(elm: LinkElement) -> Self {
        Self { elm, entity: None }
    }

    pub fn node(&self) -> &str {
        &self.elm.node
    }

    pub fn port(&self) -> &str {
        &self.elm.port
    }

    fn bind(&mut self, nodes: &NodeManager) {
        self.entity = nodes.node_by_name(&self.elm.node).and_then(|node| {
            node.port_by_name(&self.elm.port).map(|port| PortEntity {
                node_role: node.role,
                datapath_id: node.datapath_id,
                port: port.clone(),
            })
        });
    }

    pub fn entity(&self, wire: &str) -> Result<&PortEntity, DefinitionError> {
        self.entity.as_ref().ok_or_else(|| DefinitionError::UnresolvedHop {
            wire: wire.to_string(),
            node: self.elm.node.clone(),
            port: self.elm.port.clone(),
        })
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkElm: {}", self.elm)
    }
}

/// One switch's forwarding decision for one traversal direction
#[derive(Debug, Clone, Copy)]
pub struct HopPair<'a> {
    pub input: &'a PathElement,
    pub output: &'a PathElement,
}

impl fmt::Display for HopPair<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hop: [{}, {}]", self.input.elm, self.output.elm)
    }
}

#[derive(Debug, Clone)]
pub struct LogicalWire {
    pub name: String,
    pub mode: WireMode,
    pub ofp_version: OfpVersion,
    pub path: Vec<PathElement>,
    pub test_host: PathElement,
    pub dut_host: PathElement,
    resolved: bool,
}

impl LogicalWire {
    pub fn new(
        name: &str,
        definition: &WireDefinition,
        ofp_version: OfpVersion,
    ) -> Result<Self, DefinitionError> {
        let missing = |key: &'static str| DefinitionError::MissingWireKey {
            wire: name.to_string(),
            key,
        };
        let mode_str = definition.mode.as_deref().ok_or_else(|| missing("mode"))?;
        let mode = mode_str.parse().map_err(|_| DefinitionError::InvalidMode {
            wire: name.to_string(),
            mode: mode_str.to_string(),
        })?;
        let path = definition.path.as_ref().ok_or_else(|| missing("path"))?;
        let test_host = definition
            .test_host_port
            .as_ref()
            .ok_or_else(|| missing("test-host-port"))?;
        let dut_host = definition
            .dut_host_port
            .as_ref()
            .ok_or_else(|| missing("dut-host-port"))?;

        Ok(Self {
            name: name.to_string(),
            mode,
            ofp_version,
            path: path.iter().cloned().map(PathElement::new).collect(),
            test_host: PathElement::new(test_host.clone()),
            dut_host: PathElement::new(dut_host.clone()),
            resolved: false,
        })
    }

    /// Bind path elements and endpoints to topology entities.
    ///
    /// Elements naming unknown nodes or ports stay unbound and are reported
    /// when rules are generated from them.
    pub fn setup_wire_entity(&mut self, nodes: &NodeManager) {
        self.test_host.bind(nodes);
        self.dut_host.bind(nodes);
        for elm in &mut self.path {
            elm.bind(nodes);
        }
        self.resolved = true;
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn is_exclusive(&self) -> bool {
        self.mode == WireMode::Exclusive
    }

    pub fn is_shared(&self) -> bool {
        self.mode == WireMode::Shared
    }

    /// Flow requests for both directions, keyed by switch name
    pub fn generate_flow_rule(&self) -> Result<FlowRequestMap, DefinitionError> {
        if !self.resolved {
            return Err(DefinitionError::UnresolvedWire {
                wire: self.name.clone(),
            });
        }
        let mut flow_rule = FlowRequestMap::new();
        // forward (host -> DUT)
        self.generate_wire_rule(&mut flow_rule, true)?;
        // backward (DUT -> host)
        self.generate_wire_rule(&mut flow_rule, false)?;
        Ok(flow_rule)
    }

    fn generate_wire_rule(
        &self,
        flow_rule: &mut FlowRequestMap,
        forward: bool,
    ) -> Result<(), DefinitionError> {
        let pairs = if forward {
            self.host_to_dut_port_pairs()?
        } else {
            self.dut_to_host_port_pairs()?
        };
        debug!(
            "{}: {} {} hop pair(s)",
            self,
            if forward { "forward" } else { "backward" },
            pairs.len()
        );
        match self.mode {
            WireMode::Exclusive => self.generate_exclusive_rule(flow_rule, &pairs),
            WireMode::Shared => self.generate_shared_rule(flow_rule, &pairs, forward),
        }
    }

    fn generate_exclusive_rule(
        &self,
        flow_rule: &mut FlowRequestMap,
        pairs: &[HopPair<'_>],
    ) -> Result<(), DefinitionError> {
        for pair in pairs {
            let input = pair.input.entity(&self.name)?;
            let output = pair.output.entity(&self.name)?;
            let request = FlowRequest::forward(
                input.datapath_id,
                input.port.number,
                output.port.number,
                EXCLUSIVE_WIRE_PRIORITY,
            );
            push_flow_request(flow_rule, pair.input.node(), request);
        }
        Ok(())
    }

    fn generate_shared_rule(
        &self,
        flow_rule: &mut FlowRequestMap,
        pairs: &[HopPair<'_>],
        forward: bool,
    ) -> Result<(), DefinitionError> {
        let host_mac = &self.test_host_port()?.mac_addr;
        let dut_host_port = self.dut_host_port()?;

        for pair in pairs {
            let input = pair.input.entity(&self.name)?;
            let output = pair.output.entity(&self.name)?;
            let mut request = FlowRequest::forward(
                input.datapath_id,
                input.port.number,
                output.port.number,
                SHARED_WIRE_PRIORITY,
            );
            if forward {
                request.eth_src = Some(host_mac.clone());
            } else {
                request.eth_dst = Some(host_mac.clone());
            }

            // the hop facing the DUT translates between untagged and tagged
            let dut_side = if forward { &output.port } else { &input.port };
            if let (true, Some(vlan_id)) = (dut_side.is_dut_edge_port(), dut_host_port.vlan()) {
                if !forward {
                    request.vlan_vid = Some(vlan_id);
                    request.pop_vlan = true;
                } else if self.ofp_version.has_push_vlan() {
                    request.push_vlan = Some(vlan_id);
                } else {
                    request.set_vlan = Some(vlan_id);
                }
            }
            push_flow_request(flow_rule, pair.input.node(), request);
        }
        Ok(())
    }

    /// Hop pairs from the test host towards the DUT
    pub fn host_to_dut_port_pairs(&self) -> Result<Vec<HopPair<'_>>, DefinitionError> {
        match self.mode {
            WireMode::Exclusive => self.forward_path_port_pairs(self.path.iter().collect()),
            WireMode::Shared => {
                if self.path_starts_at_host()? {
                    self.forward_path_port_pairs(self.path.iter().collect())
                } else {
                    self.forward_path_port_pairs(self.path.iter().rev().collect())
                }
            }
        }
    }

    /// Hop pairs from the DUT towards the test host
    pub fn dut_to_host_port_pairs(&self) -> Result<Vec<HopPair<'_>>, DefinitionError> {
        match self.mode {
            WireMode::Exclusive => self.forward_path_port_pairs(self.path.iter().rev().collect()),
            WireMode::Shared => {
                if self.path_starts_at_host()? {
                    self.forward_path_port_pairs(self.path.iter().rev().collect())
                } else {
                    self.forward_path_port_pairs(self.path.iter().collect())
                }
            }
        }
    }

    /// Path element on the switch port facing the test host
    pub fn host_edge_element(&self) -> Result<&PathElement, DefinitionError> {
        let (head, tail) = self.path_ends()?;
        if self.path_starts_at_host()? {
            Ok(head)
        } else {
            Ok(tail)
        }
    }

    pub fn test_host_port(&self) -> Result<&TestHostPort, DefinitionError> {
        self.test_host
            .entity(&self.name)?
            .port
            .test_host_port()
            .ok_or_else(|| self.invalid_endpoint("test-host", &self.test_host))
    }

    pub fn dut_host_port(&self) -> Result<&DutHostPort, DefinitionError> {
        self.dut_host
            .entity(&self.name)?
            .port
            .dut_host_port()
            .ok_or_else(|| self.invalid_endpoint("dut-host", &self.dut_host))
    }

    fn invalid_endpoint(&self, endpoint: &'static str, elm: &PathElement) -> DefinitionError {
        DefinitionError::InvalidEndpoint {
            wire: self.name.clone(),
            endpoint,
            node: elm.node().to_string(),
            port: elm.port().to_string(),
            expected: endpoint,
        }
    }

    fn path_ends(&self) -> Result<(&PathElement, &PathElement), DefinitionError> {
        match (self.path.first(), self.path.last()) {
            (Some(head), Some(tail)) => Ok((head, tail)),
            _ => Err(self.empty_path()),
        }
    }

    /// Orientation of a shared wire: true if the head faces the test host
    fn path_starts_at_host(&self) -> Result<bool, DefinitionError> {
        let (head, tail) = self.path_ends()?;
        let head_port = &head.entity(&self.name)?.port;
        let tail_port = &tail.entity(&self.name)?.port;
        if head_port.is_host_edge_port() && tail_port.is_dut_edge_port() {
            Ok(true)
        } else if head_port.is_dut_edge_port() && tail_port.is_host_edge_port() {
            Ok(false)
        } else {
            Err(DefinitionError::AmbiguousOrientation {
                wire: self.name.clone(),
            })
        }
    }

    fn forward_path_port_pairs<'a>(
        &self,
        path: Vec<&'a PathElement>,
    ) -> Result<Vec<HopPair<'a>>, DefinitionError> {
        let pairs: Vec<HopPair<'a>> = path
            .windows(2)
            .filter(|w| w[0].node() == w[1].node())
            .map(|w| HopPair {
                input: w[0],
                output: w[1],
            })
            .collect();
        if pairs.is_empty() {
            return Err(self.empty_path());
        }
        Ok(pairs)
    }

    fn empty_path(&self) -> DefinitionError {
        let path = self
            .path
            .iter()
            .map(|elm| elm.elm.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        DefinitionError::EmptyPath {
            wire: self.name.clone(),
            path: format!("[{}]", path),
        }
    }
}

impl fmt::Display for LogicalWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wire: {}({})", self.name, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_v2::TopologyDefinition;
    use pretty_assertions::assert_eq;

    // h1 - s1 - s2 - dut (vlan 200, tagged)
    const TOPOLOGY: &str = r#"{
        "dispatchers": {
            "s1": {"datapath-id": 1, "port-index": {
                "s1-eth1": {"number": 1}, "s1-eth2": {"number": 2}}},
            "s2": {"datapath-id": 2, "port-index": {
                "s2-eth1": {"number": 1}, "s2-eth2": {"number": 2}}}
        },
        "test-hosts": {
            "h1": {"port-index": {"h1-eth0": {
                "mac-addr": "0a:00:00:00:00:01", "ip-addr": "192.168.2.101/24"}}}
        },
        "dut-hosts": {
            "dut": {"port-index": {"dut-eth0": {"vlan-id": 200, "vlan-tagged": true}}}
        },
        "link-list": [
            [["h1", "h1-eth0"], ["s1", "s1-eth1"]],
            [["s1", "s1-eth2"], ["s2", "s2-eth1"]],
            [["s2", "s2-eth2"], ["dut", "dut-eth0"]]
        ]
    }"#;

    fn nodes() -> NodeManager {
        let topology: TopologyDefinition = serde_json::from_str(TOPOLOGY).unwrap();
        NodeManager::new(&topology).unwrap()
    }

    fn wire(mode: &str, path: &[(&str, &str)], version: OfpVersion) -> LogicalWire {
        let definition = WireDefinition {
            mode: Some(mode.to_string()),
            path: Some(path.iter().map(|(n, p)| LinkElement::new(n, p)).collect()),
            test_host_port: Some(LinkElement::new("h1", "h1-eth0")),
            dut_host_port: Some(LinkElement::new("dut", "dut-eth0")),
        };
        let mut wire = LogicalWire::new("wire1", &definition, version).unwrap();
        wire.setup_wire_entity(&nodes());
        wire
    }

    const PATH: [(&str, &str); 4] = [
        ("s1", "s1-eth1"),
        ("s1", "s1-eth2"),
        ("s2", "s2-eth1"),
        ("s2", "s2-eth2"),
    ];

    #[test]
    fn test_missing_mode() {
        let definition = WireDefinition {
            mode: None,
            ..Default::default()
        };
        assert!(matches!(
            LogicalWire::new("wire9", &definition, OfpVersion::OpenFlow10),
            Err(DefinitionError::MissingWireKey { wire, key: "mode" }) if wire == "wire9"
        ));
    }

    #[test]
    fn test_invalid_mode() {
        let definition = WireDefinition {
            mode: Some("dedicated".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            LogicalWire::new("wire9", &definition, OfpVersion::OpenFlow10),
            Err(DefinitionError::InvalidMode { mode, .. }) if mode == "dedicated"
        ));
    }

    #[test]
    fn test_unresolved_wire() {
        let definition = WireDefinition {
            mode: Some("exclusive".to_string()),
            path: Some(vec![]),
            test_host_port: Some(LinkElement::new("h1", "h1-eth0")),
            dut_host_port: Some(LinkElement::new("dut", "dut-eth0")),
        };
        let wire = LogicalWire::new("wire1", &definition, OfpVersion::OpenFlow10).unwrap();
        assert!(matches!(
            wire.generate_flow_rule(),
            Err(DefinitionError::UnresolvedWire { .. })
        ));
    }

    #[test]
    fn test_exclusive_wire() {
        let wire = wire("exclusive", &PATH, OfpVersion::OpenFlow10);
        let rules = wire.generate_flow_rule().unwrap();

        assert_eq!(
            rules["s1"],
            vec![
                FlowRequest::forward(1, 1, 2, EXCLUSIVE_WIRE_PRIORITY),
                FlowRequest::forward(1, 2, 1, EXCLUSIVE_WIRE_PRIORITY),
            ]
        );
        assert_eq!(
            rules["s2"],
            vec![
                FlowRequest::forward(2, 1, 2, EXCLUSIVE_WIRE_PRIORITY),
                FlowRequest::forward(2, 2, 1, EXCLUSIVE_WIRE_PRIORITY),
            ]
        );
    }

    #[test]
    fn test_exclusive_wire_has_no_direction() {
        // reversed path is accepted without any orientation check
        let mut reversed = PATH;
        reversed.reverse();
        let wire = wire("exclusive", &reversed, OfpVersion::OpenFlow10);
        let pairs = wire.host_to_dut_port_pairs().unwrap();
        assert_eq!(pairs[0].input.port(), "s2-eth2");
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_shared_wire_vlan_at_dut_edge() {
        let wire = wire("shared", &PATH, OfpVersion::OpenFlow13);
        let rules = wire.generate_flow_rule().unwrap();

        let s1 = &rules["s1"];
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].eth_src.as_deref(), Some("0a:00:00:00:00:01"));
        assert_eq!(s1[1].eth_dst.as_deref(), Some("0a:00:00:00:00:01"));
        assert!(s1.iter().all(|r| r.push_vlan.is_none() && r.vlan_vid.is_none() && !r.pop_vlan));

        let s2 = &rules["s2"];
        // forward towards the DUT: push the DUT's VLAN
        assert_eq!(s2[0].inport, Some(1));
        assert_eq!(s2[0].outport, Some(2));
        assert_eq!(s2[0].push_vlan, Some(200));
        // backward from the DUT: match and pop it
        assert_eq!(s2[1].inport, Some(2));
        assert_eq!(s2[1].vlan_vid, Some(200));
        assert!(s2[1].pop_vlan);
        assert!(rules.values().flatten().all(|r| r.priority == Some(SHARED_WIRE_PRIORITY)));
    }

    #[test]
    fn test_shared_wire_legacy_sets_vlan() {
        let wire = wire("shared", &PATH, OfpVersion::OpenFlow10);
        let rules = wire.generate_flow_rule().unwrap();
        assert_eq!(rules["s2"][0].set_vlan, Some(200));
        assert_eq!(rules["s2"][0].push_vlan, None);
    }

    #[test]
    fn test_shared_wire_orientation_from_roles() {
        // path written from the DUT side still runs host -> DUT forward
        let mut reversed = PATH;
        reversed.reverse();
        let wire = wire("shared", &reversed, OfpVersion::OpenFlow13);
        let pairs = wire.host_to_dut_port_pairs().unwrap();
        assert_eq!(pairs[0].input.port(), "s1-eth1");
        assert_eq!(wire.host_edge_element().unwrap().port(), "s1-eth1");

        let rules = wire.generate_flow_rule().unwrap();
        assert_eq!(rules["s1"][0].eth_src.as_deref(), Some("0a:00:00:00:00:01"));
        assert_eq!(rules["s1"][0].outport, Some(2));
    }

    #[test]
    fn test_shared_wire_ambiguous_orientation() {
        let wire = wire("shared", &PATH[..2], OfpVersion::OpenFlow13);
        assert!(matches!(
            wire.generate_flow_rule(),
            Err(DefinitionError::AmbiguousOrientation { wire }) if wire == "wire1"
        ));
    }

    #[test]
    fn test_path_without_hop_pairs() {
        let wire = wire(
            "exclusive",
            &[("s1", "s1-eth1"), ("s2", "s2-eth2")],
            OfpVersion::OpenFlow10,
        );
        assert!(matches!(
            wire.generate_flow_rule(),
            Err(DefinitionError::EmptyPath { .. })
        ));
    }

    #[test]
    fn test_unknown_port_in_path() {
        let wire = wire(
            "exclusive",
            &[("s1", "s1-eth1"), ("s1", "s1-eth7")],
            OfpVersion::OpenFlow10,
        );
        assert!(matches!(
            wire.generate_flow_rule(),
            Err(DefinitionError::UnresolvedHop { port, .. }) if port == "s1-eth7"
        ));
    }
}
