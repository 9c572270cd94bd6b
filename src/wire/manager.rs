//! Wire and wire group registry.

use crate::config_v2::WireInfo;
use crate::error::DefinitionError;
use crate::flow::version::OfpVersion;
use crate::topology::NodeManager;
use crate::wire::logical_wire::LogicalWire;
use crate::wire::wire_group::WireGroup;
use indexmap::IndexMap;
use log::{info, warn};

#[derive(Debug, Clone)]
pub struct WireManager {
    ofp_version: OfpVersion,
    wire_index: IndexMap<String, LogicalWire>,
    wire_group_index: IndexMap<String, WireGroup>,
}

impl WireManager {
    /// Build every wire and wire group, in file order.
    ///
    /// Group membership is checked here: members must exist and be shared.
    pub fn new(wire_info: &WireInfo, ofp_version: OfpVersion) -> Result<Self, DefinitionError> {
        let wires = required(&wire_info.wire_index, "wire-index")?;
        let groups = required(&wire_info.wire_group_index, "wire-group-index")?;

        let mut wire_index = IndexMap::new();
        for (name, definition) in wires {
            wire_index.insert(name.clone(), LogicalWire::new(name, definition, ofp_version)?);
        }

        let mut wire_group_index = IndexMap::new();
        for (name, definition) in groups {
            let group = WireGroup::new(name, definition, ofp_version)?;
            for member in &group.wires {
                let wire = wire_index.get(member).ok_or_else(|| DefinitionError::UnknownWire {
                    group: name.clone(),
                    wire: member.clone(),
                })?;
                if !wire.is_shared() {
                    return Err(DefinitionError::NonSharedMember {
                        group: name.clone(),
                        wire: member.clone(),
                    });
                }
            }
            wire_group_index.insert(name.clone(), group);
        }

        info!(
            "Loaded {} wire(s) and {} wire group(s) for {}",
            wire_index.len(),
            wire_group_index.len(),
            ofp_version
        );
        Ok(Self {
            ofp_version,
            wire_index,
            wire_group_index,
        })
    }

    pub fn ofp_version(&self) -> OfpVersion {
        self.ofp_version
    }

    /// Bind every wire to topology entities
    pub fn setup_wire_entity(&mut self, nodes: &NodeManager) {
        for wire in self.wire_index.values_mut() {
            wire.setup_wire_entity(nodes);
        }
    }

    pub fn wires(&self) -> impl Iterator<Item = &LogicalWire> {
        self.wire_index.values()
    }

    pub fn exclusive_wires(&self) -> impl Iterator<Item = &LogicalWire> {
        self.wire_index.values().filter(|wire| wire.is_exclusive())
    }

    pub fn wire_groups(&self) -> impl Iterator<Item = &WireGroup> {
        self.wire_group_index.values()
    }

    pub fn wire_by_name(&self, name: &str) -> Option<&LogicalWire> {
        self.wire_index.get(name)
    }

    /// Members of `group`, in listed order
    pub fn group_wires(&self, group: &WireGroup) -> Result<Vec<&LogicalWire>, DefinitionError> {
        group
            .wires
            .iter()
            .map(|name| {
                self.wire_by_name(name).ok_or_else(|| DefinitionError::UnknownWire {
                    group: group.name.clone(),
                    wire: name.clone(),
                })
            })
            .collect()
    }

    /// Shared wires that belong to no wire group
    pub fn ungrouped_shared_wires(&self) -> Vec<&str> {
        self.wire_index
            .values()
            .filter(|wire| wire.is_shared())
            .filter(|wire| !self.wire_groups().any(|group| group.wires.contains(&wire.name)))
            .map(|wire| wire.name.as_str())
            .collect()
    }

    /// Host-facing port numbers of every member of `group`
    pub fn generate_bcast_outports_by_wire_group(
        &self,
        group: &WireGroup,
    ) -> Result<Vec<u32>, DefinitionError> {
        let members = self.group_wires(group)?;
        let mut host_edge_switch: Option<&str> = None;
        let mut out_ports = Vec::with_capacity(members.len());

        for wire in members {
            let elm = wire.host_edge_element()?;
            match host_edge_switch {
                None => host_edge_switch = Some(elm.node()),
                Some(switch) if switch != elm.node() => {
                    warn!(
                        "{}: {} reaches its host on {}, not {}; its port number is used on {}",
                        group,
                        wire,
                        elm.node(),
                        switch,
                        switch
                    );
                }
                Some(_) => {}
            }
            out_ports.push(elm.entity(&wire.name)?.port.number);
        }
        Ok(out_ports)
    }
}

fn required<'a, T>(section: &'a Option<T>, name: &'static str) -> Result<&'a T, DefinitionError> {
    section.as_ref().ok_or(DefinitionError::MissingSection {
        section: name,
        source_name: "wire info",
    })
}
