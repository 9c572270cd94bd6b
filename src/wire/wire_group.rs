//! Wire groups.
//!
//! A wire group is a broadcast domain over shared wires. Broadcast frames
//! from the DUT are carried from the DUT edge to the host edge tagged with
//! the group id, then untagged and fanned out to every member's host-facing
//! port.

use crate::config_v2::WireGroupDefinition;
use crate::error::DefinitionError;
use crate::flow::request::{push_flow_request, FlowRequest, FlowRequestMap};
use crate::flow::version::OfpVersion;
use crate::wire::logical_wire::LogicalWire;
use log::debug;
use std::fmt;

pub const BROADCAST_PRIORITY: u16 = 16535;
pub const BROADCAST_MAC: &str = "ff:ff:ff:ff:ff:ff";

#[derive(Debug, Clone, PartialEq)]
pub struct WireGroup {
    pub name: String,
    /// Group id, also the transit VLAN id of the broadcast path
    pub id: u16,
    /// Member wire names; the first member carries the broadcast path
    pub wires: Vec<String>,
    pub ofp_version: OfpVersion,
}

impl WireGroup {
    pub fn new(
        name: &str,
        definition: &WireGroupDefinition,
        ofp_version: OfpVersion,
    ) -> Result<Self, DefinitionError> {
        let raw_id = definition.id.ok_or_else(|| DefinitionError::MissingGroupKey {
            group: name.to_string(),
            key: "id",
        })?;
        let wires = definition.wires.clone().ok_or_else(|| DefinitionError::MissingGroupKey {
            group: name.to_string(),
            key: "wires",
        })?;
        let id = u16::try_from(raw_id)
            .ok()
            .filter(|id| (1..=4095).contains(id))
            .ok_or_else(|| DefinitionError::InvalidGroupId {
                group: name.to_string(),
                id: raw_id,
            })?;
        if wires.is_empty() {
            return Err(DefinitionError::EmptyWireGroup {
                group: name.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            id,
            wires,
            ofp_version,
        })
    }

    /// Member carrying the broadcast path
    pub fn representative(&self) -> &str {
        &self.wires[0]
    }

    /// Broadcast rules along `bcast_wire` from the DUT to the host edge.
    ///
    /// `out_ports` are the host-facing port numbers of every member wire.
    pub fn generate_bcast_rule_by_wire_group(
        &self,
        bcast_wire: &LogicalWire,
        out_ports: &[u32],
    ) -> Result<FlowRequestMap, DefinitionError> {
        let dut_vlan = bcast_wire.dut_host_port()?.vlan();
        let mut flow_rule = FlowRequestMap::new();

        for pair in bcast_wire.dut_to_host_port_pairs()? {
            let input = pair.input.entity(&bcast_wire.name)?;
            let output = pair.output.entity(&bcast_wire.name)?;
            let mut request = FlowRequest::forward(
                input.datapath_id,
                input.port.number,
                output.port.number,
                BROADCAST_PRIORITY,
            );
            request.eth_dst = Some(BROADCAST_MAC.to_string());

            match (input.port.is_dut_edge_port(), output.port.is_host_edge_port()) {
                // DUT edge and host edge on one switch
                (true, true) => {
                    if let Some(vlan_id) = dut_vlan {
                        request.vlan_vid = Some(vlan_id);
                        request.pop_vlan = true;
                    }
                    self.fan_out(&mut request, out_ports);
                }
                // DUT edge: tag with the group id
                (true, false) => {
                    if let Some(vlan_id) = dut_vlan {
                        request.vlan_vid = Some(vlan_id);
                        request.set_vlan = Some(self.id);
                    } else if self.ofp_version.has_push_vlan() {
                        request.push_vlan = Some(self.id);
                    } else {
                        request.set_vlan = Some(self.id);
                    }
                }
                // host edge: untag and fan out
                (false, true) => {
                    request.vlan_vid = Some(self.id);
                    request.pop_vlan = true;
                    self.fan_out(&mut request, out_ports);
                }
                // transit
                (false, false) => {
                    request.vlan_vid = Some(self.id);
                }
            }
            debug!("{}: {} -> {:?}", self, pair, request);
            push_flow_request(&mut flow_rule, pair.input.node(), request);
        }
        Ok(flow_rule)
    }

    fn fan_out(&self, request: &mut FlowRequest, out_ports: &[u32]) {
        request.outport = None;
        request.outports = Some(out_ports.to_vec());
    }
}

impl fmt::Display for WireGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireGroup: {}(id:{})", self.name, self.id)
    }
}
