//! Build rule bodies from a flow request.
//!
//! Checks run in a fixed order: VLAN/MPLS value ranges, priority, in-port
//! (mandatory), ethernet addresses, VLAN id, MPLS label, then VLAN actions, MPLS actions and
//! output (mandatory).

use crate::error::{ControllerError, Error, RestRequestError};
use crate::flow::request::FlowRequest;
use crate::flow::rule::{FlowRule, FlowRuleEncoding};
use crate::flow::version::OfpVersion;
use log::debug;

pub struct FlowRuleBuilder<'a> {
    request: &'a FlowRequest,
    flow_rule: Box<dyn FlowRuleEncoding>,
}

impl<'a> FlowRuleBuilder<'a> {
    pub fn new(version: OfpVersion, request: &'a FlowRequest) -> Self {
        Self {
            request,
            flow_rule: version.encoding(),
        }
    }

    /// Builder for a switch that negotiated header version `wire_version`
    pub fn for_wire_version(
        wire_version: u8,
        request: &'a FlowRequest,
    ) -> Result<Self, ControllerError> {
        let version = OfpVersion::from_wire(wire_version)?;
        Ok(Self::new(version, request))
    }

    pub fn build_flow(mut self) -> Result<Vec<FlowRule>, Error> {
        self.request.validate()?;
        self.check_flow_property();
        // match conditions
        self.check_inport_conditions()?;
        self.check_ether_conditions();
        self.check_vlan_conditions();
        self.check_mpls_conditions()?;
        // actions
        self.check_vlan_actions();
        self.check_mpls_actions()?;
        self.check_outport_actions()?;

        let rules = self.flow_rule.rules();
        debug!(
            "dpid:{} ({}): built {} rule(s)",
            self.request.dpid,
            self.flow_rule.version(),
            rules.len()
        );
        Ok(rules)
    }

    fn check_flow_property(&mut self) {
        if let Some(priority) = self.request.priority {
            self.flow_rule.update_priority(priority);
        }
    }

    fn check_inport_conditions(&mut self) -> Result<(), RestRequestError> {
        let inport = self.request.inport.ok_or(RestRequestError::MissingInport)?;
        self.flow_rule.update_match_inport(inport);
        Ok(())
    }

    fn check_ether_conditions(&mut self) {
        if let Some(eth_src) = &self.request.eth_src {
            self.flow_rule.update_match_eth_src(eth_src);
        }
        if let Some(eth_dst) = &self.request.eth_dst {
            self.flow_rule.update_match_eth_dst(eth_dst);
        }
    }

    fn check_vlan_conditions(&mut self) {
        if let Some(vlan_vid) = self.request.vlan_vid {
            self.flow_rule.update_match_vlan_vid(vlan_vid);
        }
    }

    fn check_mpls_conditions(&mut self) -> Result<(), ControllerError> {
        if let Some(mpls_label) = self.request.mpls_label {
            self.flow_rule.update_match_mpls_label(mpls_label)?;
        }
        Ok(())
    }

    fn check_vlan_actions(&mut self) {
        if let Some(vlan_vid) = self.request.push_vlan {
            self.flow_rule.action_push_vlan(vlan_vid);
        }
        if self.request.pop_vlan {
            self.flow_rule.action_pop_vlan();
        }
        if let Some(vlan_vid) = self.request.set_vlan {
            self.flow_rule.action_set_vlan_vid(vlan_vid);
        }
    }

    fn check_mpls_actions(&mut self) -> Result<(), ControllerError> {
        if let Some(mpls_label) = self.request.push_mpls {
            self.flow_rule.action_push_mpls(mpls_label)?;
        }
        if self.request.pop_mpls {
            self.flow_rule.action_pop_mpls()?;
        }
        Ok(())
    }

    fn check_outport_actions(&mut self) -> Result<(), RestRequestError> {
        let ports = self.request.output_ports();
        if ports.is_empty() {
            return Err(RestRequestError::MissingOutport);
        }
        for port in ports {
            self.flow_rule.action_output(port);
        }
        Ok(())
    }
}

/// Compile one request for the given protocol version
pub fn build_flow(version: OfpVersion, request: &FlowRequest) -> Result<Vec<FlowRule>, Error> {
    FlowRuleBuilder::new(version, request).build_flow()
}
