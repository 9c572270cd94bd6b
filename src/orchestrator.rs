//! Flow rule generation.
//!
//! This module drives the whole compilation: it resolves every wire against
//! the topology, generates per-hop requests for the selected wire mode and
//! merges them per switch. The merged requests can then be compiled into
//! rule bodies for the configured protocol version.

use crate::config_loader;
use crate::config_v2::{TopologyDefinition, WireInfo};
use crate::error::{DefinitionError, Error};
use crate::flow::builder::build_flow;
use crate::flow::command::{FlowCommand, FlowMod};
use crate::flow::request::{merge_flow_requests, FlowRequestMap};
use crate::flow::rule::FlowRule;
use crate::flow::version::OfpVersion;
use crate::topology::NodeManager;
use crate::wire::WireManager;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Switch name to compiled rule bodies
pub type FlowRuleMap = BTreeMap<String, Vec<FlowRule>>;

/// Which wires to generate rules for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GenerateMode {
    #[default]
    All,
    Exclusive,
    Shared,
}

impl GenerateMode {
    pub fn includes_exclusive(self) -> bool {
        matches!(self, Self::All | Self::Exclusive)
    }

    pub fn includes_shared(self) -> bool {
        matches!(self, Self::All | Self::Shared)
    }
}

impl fmt::Display for GenerateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Exclusive => f.write_str("exclusive"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

/// Compiler over one topology/wire snapshot
#[derive(Debug, Clone)]
pub struct FlowRuleGenerator {
    node_manager: NodeManager,
    wire_manager: WireManager,
}

impl FlowRuleGenerator {
    pub fn new(
        topology: &TopologyDefinition,
        wire_info: &WireInfo,
        ofp_version: OfpVersion,
    ) -> Result<Self, DefinitionError> {
        let node_manager = NodeManager::new(topology)?;
        let mut wire_manager = WireManager::new(wire_info, ofp_version)?;
        wire_manager.setup_wire_entity(&node_manager);
        Ok(Self {
            node_manager,
            wire_manager,
        })
    }

    /// Load the topology (node info) and wire (wire info) files
    pub fn from_files(
        physical: &Path,
        logical: &Path,
        ofp_version: OfpVersion,
    ) -> color_eyre::Result<Self> {
        let topology = config_loader::load_topology(physical)?;
        let wire_info = config_loader::load_wire_info(logical)?;
        Ok(Self::new(&topology, &wire_info, ofp_version)?)
    }

    pub fn ofp_version(&self) -> OfpVersion {
        self.wire_manager.ofp_version()
    }

    pub fn node_manager(&self) -> &NodeManager {
        &self.node_manager
    }

    pub fn wire_manager(&self) -> &WireManager {
        &self.wire_manager
    }

    /// Per-hop requests for `mode`, merged per switch.
    ///
    /// Exclusive wires come first, then each wire group's members followed
    /// by the group's broadcast rules.
    pub fn generate(&self, mode: GenerateMode) -> Result<FlowRequestMap, DefinitionError> {
        info!("Generating {} wire rules for {}", mode, self.ofp_version());
        let mut flow_rules = FlowRequestMap::new();
        if mode.includes_exclusive() {
            merge_flow_requests(&mut flow_rules, self.generate_exclusive_wire_rule()?);
        }
        if mode.includes_shared() {
            merge_flow_requests(&mut flow_rules, self.generate_shared_wire_rule()?);
        }
        info!(
            "Generated {} request(s) for {} switch(es)",
            flow_rules.values().map(Vec::len).sum::<usize>(),
            flow_rules.len()
        );
        Ok(flow_rules)
    }

    pub fn generate_exclusive_wire_rule(&self) -> Result<FlowRequestMap, DefinitionError> {
        let mut flow_rules = FlowRequestMap::new();
        for wire in self.wire_manager.exclusive_wires() {
            debug!("{}", wire);
            merge_flow_requests(&mut flow_rules, wire.generate_flow_rule()?);
        }
        Ok(flow_rules)
    }

    pub fn generate_shared_wire_rule(&self) -> Result<FlowRequestMap, DefinitionError> {
        for name in self.wire_manager.ungrouped_shared_wires() {
            warn!("Shared wire '{}' belongs to no wire group; no rules generated", name);
        }

        let mut flow_rules = FlowRequestMap::new();
        for group in self.wire_manager.wire_groups() {
            let members = self.wire_manager.group_wires(group)?;
            for wire in &members {
                debug!("{}: {}", group, wire);
                merge_flow_requests(&mut flow_rules, wire.generate_flow_rule()?);
            }
            let representative = members.first().ok_or_else(|| DefinitionError::EmptyWireGroup {
                group: group.name.clone(),
            })?;
            let out_ports = self.wire_manager.generate_bcast_outports_by_wire_group(group)?;
            merge_flow_requests(
                &mut flow_rules,
                group.generate_bcast_rule_by_wire_group(representative, &out_ports)?,
            );
        }
        Ok(flow_rules)
    }

    /// Rule bodies for every generated request, per switch
    pub fn compile(&self, mode: GenerateMode) -> Result<FlowRuleMap, Error> {
        let requests = self.generate(mode)?;
        let mut compiled = FlowRuleMap::new();
        for (switch, switch_requests) in &requests {
            let rules = compiled.entry(switch.clone()).or_default();
            for request in switch_requests {
                rules.extend(build_flow(self.ofp_version(), request)?);
            }
        }
        Ok(compiled)
    }

    /// Flow-mod messages for every compiled rule.
    ///
    /// With `default_deny`, each switch gets a drop-all rule ahead of its
    /// compiled rules.
    pub fn flow_mods(
        &self,
        mode: GenerateMode,
        command: FlowCommand,
        default_deny: bool,
    ) -> Result<Vec<FlowMod>, Error> {
        let requests = self.generate(mode)?;
        let mut flow_mods = Vec::new();

        if default_deny {
            for switch in self.node_manager.dispatchers() {
                flow_mods.push(FlowMod {
                    switch: switch.name.clone(),
                    dpid: switch.datapath_id,
                    command,
                    rule: FlowRule::default_deny(),
                });
            }
        }

        for (switch, switch_requests) in &requests {
            for request in switch_requests {
                for rule in build_flow(self.ofp_version(), request)? {
                    flow_mods.push(FlowMod {
                        switch: switch.clone(),
                        dpid: request.dpid,
                        command,
                        rule,
                    });
                }
            }
        }
        info!("Prepared {} flow mod(s) ({})", flow_mods.len(), command);
        Ok(flow_mods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::rule::Action;

    // h1,h2 - s1 - s2 - dut(eth0: shared trunk, eth1: exclusive)
    const TOPOLOGY: &str = r#"{
        "dispatchers": {
            "s1": {"datapath-id": 1, "port-index": {
                "s1-eth1": {"number": 1}, "s1-eth2": {"number": 2},
                "s1-eth3": {"number": 3}, "s1-eth4": {"number": 4}}},
            "s2": {"datapath-id": 2, "port-index": {
                "s2-eth1": {"number": 1}, "s2-eth2": {"number": 2},
                "s2-eth3": {"number": 3}, "s2-eth4": {"number": 4}}}
        },
        "test-hosts": {
            "h1": {"port-index": {"h1-eth0": {
                "mac-addr": "0a:00:00:00:00:01", "ip-addr": "192.168.2.101/24"}}},
            "h2": {"port-index": {"h2-eth0": {
                "mac-addr": "0a:00:00:00:00:02", "ip-addr": "192.168.2.102/24"}}}
        },
        "dut-hosts": {
            "dut": {"port-index": {
                "dut-eth0": {"vlan-id": 200, "vlan-tagged": true},
                "dut-eth1": {}}}
        },
        "link-list": [
            [["h1", "h1-eth0"], ["s1", "s1-eth1"]],
            [["h2", "h2-eth0"], ["s1", "s1-eth2"]],
            [["s1", "s1-eth3"], ["s2", "s2-eth1"]],
            [["s1", "s1-eth4"], ["s2", "s2-eth4"]],
            [["s2", "s2-eth2"], ["dut", "dut-eth0"]],
            [["s2", "s2-eth3"], ["dut", "dut-eth1"]]
        ]
    }"#;

    const WIRES: &str = r#"{
        "wire-index": {
            "wire1": {"mode": "shared",
                "path": [["s1", "s1-eth1"], ["s1", "s1-eth3"],
                         ["s2", "s2-eth1"], ["s2", "s2-eth2"]],
                "test-host-port": ["h1", "h1-eth0"], "dut-host-port": ["dut", "dut-eth0"]},
            "wire2": {"mode": "shared",
                "path": [["s1", "s1-eth2"], ["s1", "s1-eth3"],
                         ["s2", "s2-eth1"], ["s2", "s2-eth2"]],
                "test-host-port": ["h2", "h2-eth0"], "dut-host-port": ["dut", "dut-eth0"]},
            "wire3": {"mode": "exclusive",
                "path": [["s2", "s2-eth3"], ["s2", "s2-eth4"],
                         ["s1", "s1-eth4"], ["s1", "s1-eth2"]],
                "test-host-port": ["h2", "h2-eth0"], "dut-host-port": ["dut", "dut-eth1"]}
        },
        "wire-group-index": {"grp": {"id": 10, "wires": ["wire1", "wire2"]}}
    }"#;

    fn generator(version: OfpVersion) -> FlowRuleGenerator {
        let topology: TopologyDefinition = serde_json::from_str(TOPOLOGY).unwrap();
        let wire_info: WireInfo = serde_json::from_str(WIRES).unwrap();
        FlowRuleGenerator::new(&topology, &wire_info, version).unwrap()
    }

    #[test]
    fn test_generate_modes() {
        let generator = generator(OfpVersion::OpenFlow13);

        let exclusive = generator.generate(GenerateMode::Exclusive).unwrap();
        assert!(exclusive.values().flatten().all(|r| r.priority == Some(65535)));
        assert_eq!(exclusive.values().map(Vec::len).sum::<usize>(), 4);

        let shared = generator.generate(GenerateMode::Shared).unwrap();
        // 2 wires x 2 switches x 2 directions, plus 2 broadcast hops
        assert_eq!(shared.values().map(Vec::len).sum::<usize>(), 10);

        let all = generator.generate(GenerateMode::All).unwrap();
        assert_eq!(all.values().map(Vec::len).sum::<usize>(), 14);
    }

    #[test]
    fn test_merge_keeps_exclusive_first() {
        let generator = generator(OfpVersion::OpenFlow13);
        let all = generator.generate(GenerateMode::All).unwrap();
        let priorities: Vec<_> = all["s2"].iter().map(|r| r.priority.unwrap()).collect();
        assert_eq!(priorities, vec![65535, 65535, 32767, 32767, 32767, 32767, 16535]);
    }

    #[test]
    fn test_broadcast_fans_out_to_every_member() {
        let generator = generator(OfpVersion::OpenFlow13);
        let shared = generator.generate(GenerateMode::Shared).unwrap();
        let bcast = shared["s1"].iter().find(|r| r.priority == Some(16535)).unwrap();
        assert_eq!(bcast.outports, Some(vec![1, 2]));
        assert_eq!(bcast.vlan_vid, Some(10));
        assert!(bcast.pop_vlan);
    }

    #[test]
    fn test_compile_forks_pop_vlan() {
        let generator = generator(OfpVersion::OpenFlow13);
        let compiled = generator.compile(GenerateMode::Shared).unwrap();
        // s1: 4 member rules, broadcast pop forks into 2
        assert_eq!(compiled["s1"].len(), 6);
        // s2: 2 forward pushes, 2 backward pops forking into 4, 1 broadcast tag
        assert_eq!(compiled["s2"].len(), 7);
        assert!(compiled["s2"]
            .iter()
            .any(|rule| rule.actions.contains(&Action::PushVlan { ethertype: 0x8100 })));
    }

    #[test]
    fn test_flow_mods_with_default_deny() {
        let generator = generator(OfpVersion::OpenFlow10);
        let flow_mods = generator
            .flow_mods(GenerateMode::Exclusive, FlowCommand::Put, true)
            .unwrap();
        assert_eq!(flow_mods.len(), 6);
        assert!(flow_mods[0].rule.is_drop());
        assert_eq!(flow_mods[0].switch, "s1");
        assert_eq!(flow_mods[1].dpid, 2);
        assert!(flow_mods[2..].iter().all(|m| m.command == FlowCommand::Put && !m.rule.is_drop()));
    }

    #[test]
    fn test_generate_mode_names() {
        assert_eq!(GenerateMode::default(), GenerateMode::All);
        assert!(GenerateMode::Shared.includes_shared());
        assert!(!GenerateMode::Shared.includes_exclusive());
        assert_eq!(GenerateMode::Exclusive.to_string(), "exclusive");
    }
}
