//! Flow rule bodies and their per-version encodings.
//!
//! A rule is built by a sequence of `update_match_*` and `action_*` calls
//! on a [`FlowRuleEncoding`]. Two sibling encodings exist:
//!
//! - [`LegacyFlowRule`]: OpenFlow 1.0 (`dl_*` match fields, `SET_VLAN_VID`,
//!   `STRIP_VLAN`, no MPLS).
//! - [`OxmFlowRule`]: OpenFlow 1.2/1.3 (`eth_*` match fields, push/pop and
//!   set-field actions, MPLS).
//!
//! Popping a VLAN tag under the OXM encoding needs separate rules for ARP
//! and IP traffic, so every encoding tracks an ARP and an IP variant of the
//! rule and [`FlowRuleEncoding::rules`] emits both once they diverge.

use crate::error::ControllerError;
use crate::flow::version::OfpVersion;
use serde::{Deserialize, Serialize};

pub const ETH_TYPE_IP: u16 = 0x0800;
pub const ETH_TYPE_ARP: u16 = 0x0806;
pub const ETH_TYPE_8021Q: u16 = 0x8100;
pub const ETH_TYPE_MPLS: u16 = 0x8847;

/// Marks `vlan_vid` set-field values as carrying a tag
pub const OFPVID_PRESENT: u32 = 0x1000;

/// Match conditions of a rule. Which fields are used depends on the encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_dst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dl_vlan: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_dst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_type: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpls_label: Option<u32>,
}

impl FlowMatch {
    /// True when the match has no condition at all (matches any packet)
    pub fn is_any(&self) -> bool {
        *self == Self::default()
    }
}

/// A single action of a rule, serialized in the controller's action format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Output { port: u32 },
    SetVlanVid { vlan_vid: u16 },
    StripVlan,
    PushVlan { ethertype: u16 },
    PopVlan,
    PushMpls { ethertype: u16 },
    PopMpls { ethertype: u16 },
    SetField { field: String, value: u32 },
}

/// A compiled rule body: `{priority, match, actions}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(rename = "match")]
    pub flow_match: FlowMatch,
    pub actions: Vec<Action>,
}

impl FlowRule {
    /// Lowest-priority rule matching everything with no action.
    ///
    /// Installed once per switch so that traffic not covered by a wire
    /// is dropped.
    pub fn default_deny() -> Self {
        Self {
            priority: Some(0),
            flow_match: FlowMatch::default(),
            actions: Vec::new(),
        }
    }

    /// An empty action list drops the packet
    pub fn is_drop(&self) -> bool {
        self.actions.is_empty()
    }

    /// Ports of all output actions, in action order
    pub fn output_ports(&self) -> Vec<u32> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Output { port } => Some(*port),
                _ => None,
            })
            .collect()
    }
}

/// ARP and IP variants of one rule under construction
#[derive(Debug, Clone, Default)]
pub struct RuleVariants {
    priority: Option<u16>,
    arp_match: FlowMatch,
    ip_match: FlowMatch,
    arp_actions: Vec<Action>,
    ip_actions: Vec<Action>,
    // set once an operation needs distinct ARP/IP rules
    forked: bool,
}

impl RuleVariants {
    fn update_priority(&mut self, priority: u16) {
        self.priority = Some(priority);
    }

    fn update_match(&mut self, update: impl Fn(&mut FlowMatch)) {
        update(&mut self.arp_match);
        update(&mut self.ip_match);
    }

    fn update_respective_match(
        &mut self,
        arp: impl FnOnce(&mut FlowMatch),
        ip: impl FnOnce(&mut FlowMatch),
    ) {
        arp(&mut self.arp_match);
        ip(&mut self.ip_match);
        self.forked = true;
    }

    fn append_action(&mut self, action: Action) {
        self.arp_actions.push(action.clone());
        self.ip_actions.push(action);
    }

    fn rules(&self) -> Vec<FlowRule> {
        let ip_rule = FlowRule {
            priority: self.priority,
            flow_match: self.ip_match.clone(),
            actions: self.ip_actions.clone(),
        };
        if !self.forked {
            return vec![ip_rule];
        }
        let arp_rule = FlowRule {
            priority: self.priority,
            flow_match: self.arp_match.clone(),
            actions: self.arp_actions.clone(),
        };
        vec![arp_rule, ip_rule]
    }
}

/// Match/action builder contract shared by all protocol versions
pub trait FlowRuleEncoding {
    fn version(&self) -> OfpVersion;

    fn variants(&self) -> &RuleVariants;

    fn variants_mut(&mut self) -> &mut RuleVariants;

    fn update_priority(&mut self, priority: u16) {
        self.variants_mut().update_priority(priority);
    }

    fn update_match_inport(&mut self, inport: u32) {
        self.variants_mut().update_match(|m| m.in_port = Some(inport));
    }

    fn update_match_eth_src(&mut self, eth_src: &str);

    fn update_match_eth_dst(&mut self, eth_dst: &str);

    fn update_match_vlan_vid(&mut self, vlan_vid: u16);

    fn update_match_mpls_label(&mut self, mpls_label: u32) -> Result<(), ControllerError>;

    fn action_output(&mut self, outport: u32) {
        self.variants_mut()
            .append_action(Action::Output { port: outport });
    }

    /// Push a tag if the frame has none, otherwise rewrite the VLAN id
    fn action_set_vlan_vid(&mut self, vlan_vid: u16);

    fn action_push_vlan(&mut self, vlan_vid: u16);

    fn action_pop_vlan(&mut self);

    fn action_push_mpls(&mut self, mpls_label: u32) -> Result<(), ControllerError>;

    fn action_pop_mpls(&mut self) -> Result<(), ControllerError>;

    /// One rule body, or two (ARP then IP) when the rule had to be forked
    fn rules(&self) -> Vec<FlowRule> {
        self.variants().rules()
    }
}

/// OpenFlow 1.0 encoding
#[derive(Debug, Clone, Default)]
pub struct LegacyFlowRule {
    variants: RuleVariants,
}

impl FlowRuleEncoding for LegacyFlowRule {
    fn version(&self) -> OfpVersion {
        OfpVersion::OpenFlow10
    }

    fn variants(&self) -> &RuleVariants {
        &self.variants
    }

    fn variants_mut(&mut self) -> &mut RuleVariants {
        &mut self.variants
    }

    fn update_match_eth_src(&mut self, eth_src: &str) {
        self.variants.update_match(|m| m.dl_src = Some(eth_src.to_string()));
    }

    fn update_match_eth_dst(&mut self, eth_dst: &str) {
        self.variants.update_match(|m| m.dl_dst = Some(eth_dst.to_string()));
    }

    fn update_match_vlan_vid(&mut self, vlan_vid: u16) {
        self.variants.update_match(|m| m.dl_vlan = Some(vlan_vid));
    }

    fn update_match_mpls_label(&mut self, _mpls_label: u32) -> Result<(), ControllerError> {
        Err(ControllerError::UnsupportedAction {
            action: "mpls_label",
            version: self.version(),
        })
    }

    fn action_set_vlan_vid(&mut self, vlan_vid: u16) {
        self.variants.append_action(Action::SetVlanVid { vlan_vid });
    }

    fn action_push_vlan(&mut self, vlan_vid: u16) {
        // SET_VLAN_VID adds the tag when the frame is untagged
        self.action_set_vlan_vid(vlan_vid);
    }

    fn action_pop_vlan(&mut self) {
        self.variants.append_action(Action::StripVlan);
    }

    fn action_push_mpls(&mut self, _mpls_label: u32) -> Result<(), ControllerError> {
        Err(ControllerError::UnsupportedAction {
            action: "push_mpls",
            version: self.version(),
        })
    }

    fn action_pop_mpls(&mut self) -> Result<(), ControllerError> {
        Err(ControllerError::UnsupportedAction {
            action: "pop_mpls",
            version: self.version(),
        })
    }
}

/// OpenFlow 1.2/1.3 encoding
#[derive(Debug, Clone)]
pub struct OxmFlowRule {
    version: OfpVersion,
    variants: RuleVariants,
}

impl OxmFlowRule {
    pub fn new(version: OfpVersion) -> Self {
        Self {
            version,
            variants: RuleVariants::default(),
        }
    }

    fn action_set_field(&mut self, field: &str, value: u32) {
        self.variants.append_action(Action::SetField {
            field: field.to_string(),
            value,
        });
    }
}

impl Default for OxmFlowRule {
    fn default() -> Self {
        Self::new(OfpVersion::OpenFlow13)
    }
}

impl FlowRuleEncoding for OxmFlowRule {
    fn version(&self) -> OfpVersion {
        self.version
    }

    fn variants(&self) -> &RuleVariants {
        &self.variants
    }

    fn variants_mut(&mut self) -> &mut RuleVariants {
        &mut self.variants
    }

    fn update_match_eth_src(&mut self, eth_src: &str) {
        self.variants.update_match(|m| m.eth_src = Some(eth_src.to_string()));
    }

    fn update_match_eth_dst(&mut self, eth_dst: &str) {
        self.variants.update_match(|m| m.eth_dst = Some(eth_dst.to_string()));
    }

    fn update_match_vlan_vid(&mut self, vlan_vid: u16) {
        // tagged broadcast traffic is matched as ARP unless a pop forks the rule
        self.variants.update_match(|m| {
            m.eth_type = Some(ETH_TYPE_ARP);
            m.vlan_vid = Some(vlan_vid);
        });
    }

    fn update_match_mpls_label(&mut self, mpls_label: u32) -> Result<(), ControllerError> {
        self.variants.update_match(|m| {
            m.eth_type = Some(ETH_TYPE_MPLS);
            m.mpls_label = Some(mpls_label);
        });
        Ok(())
    }

    fn action_set_vlan_vid(&mut self, vlan_vid: u16) {
        self.action_set_field("vlan_vid", OFPVID_PRESENT + u32::from(vlan_vid));
    }

    fn action_push_vlan(&mut self, vlan_vid: u16) {
        self.variants.append_action(Action::PushVlan {
            ethertype: ETH_TYPE_8021Q,
        });
        self.action_set_vlan_vid(vlan_vid);
    }

    fn action_pop_vlan(&mut self) {
        self.variants.update_respective_match(
            |arp| arp.eth_type = Some(ETH_TYPE_ARP),
            |ip| ip.eth_type = Some(ETH_TYPE_IP),
        );
        self.variants.append_action(Action::PopVlan);
    }

    fn action_push_mpls(&mut self, mpls_label: u32) -> Result<(), ControllerError> {
        self.variants.append_action(Action::PushMpls {
            ethertype: ETH_TYPE_MPLS,
        });
        self.action_set_field("mpls_label", mpls_label);
        Ok(())
    }

    fn action_pop_mpls(&mut self) -> Result<(), ControllerError> {
        self.variants.append_action(Action::PopMpls {
            ethertype: ETH_TYPE_ARP,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_legacy_match_field_names() {
        let mut rule = LegacyFlowRule::default();
        rule.update_match_inport(2);
        rule.update_match_eth_src("0a:00:00:00:00:01");
        rule.update_match_vlan_vid(200);
        rule.action_output(1);

        let rules = rule.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            serde_json::to_value(&rules[0]).unwrap(),
            json!({
                "match": {"in_port": 2, "dl_src": "0a:00:00:00:00:01", "dl_vlan": 200},
                "actions": [{"type": "OUTPUT", "port": 1}]
            })
        );
    }

    #[test]
    fn test_legacy_vlan_actions_are_single() {
        let mut rule = LegacyFlowRule::default();
        rule.update_match_inport(1);
        rule.action_push_vlan(100);
        rule.action_pop_vlan();
        rule.action_output(3);

        let rules = rule.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].actions,
            vec![
                Action::SetVlanVid { vlan_vid: 100 },
                Action::StripVlan,
                Action::Output { port: 3 },
            ]
        );
    }

    #[test]
    fn test_legacy_rejects_mpls() {
        let mut rule = LegacyFlowRule::default();
        assert!(matches!(
            rule.action_push_mpls(101),
            Err(ControllerError::UnsupportedAction { action: "push_mpls", .. })
        ));
        assert!(rule.action_pop_mpls().is_err());
        assert!(rule.update_match_mpls_label(101).is_err());
    }

    #[test]
    fn test_oxm_push_vlan_is_two_actions() {
        let mut rule = OxmFlowRule::default();
        rule.update_match_inport(2);
        rule.update_match_eth_src("0a:00:00:00:00:01");
        rule.action_push_vlan(200);
        rule.action_output(1);

        let rules = rule.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].flow_match.eth_src.as_deref(), Some("0a:00:00:00:00:01"));
        assert_eq!(rules[0].flow_match.dl_src, None);
        assert_eq!(
            rules[0].actions,
            vec![
                Action::PushVlan { ethertype: ETH_TYPE_8021Q },
                Action::SetField { field: "vlan_vid".to_string(), value: 0x1000 + 200 },
                Action::Output { port: 1 },
            ]
        );
    }

    #[test]
    fn test_oxm_pop_vlan_forks_by_ethertype() {
        let mut rule = OxmFlowRule::default();
        rule.update_priority(32767);
        rule.update_match_inport(2);
        rule.update_match_eth_dst("0a:00:00:00:00:01");
        rule.update_match_vlan_vid(200);
        rule.action_pop_vlan();
        rule.action_output(1);

        let rules = rule.rules();
        assert_eq!(rules.len(), 2);
        let (arp, ip) = (&rules[0], &rules[1]);
        assert_eq!(arp.flow_match.eth_type, Some(ETH_TYPE_ARP));
        assert_eq!(ip.flow_match.eth_type, Some(ETH_TYPE_IP));

        // identical apart from the ethertype
        let mut arp_as_ip = arp.clone();
        arp_as_ip.flow_match.eth_type = Some(ETH_TYPE_IP);
        assert_eq!(&arp_as_ip, ip);
        assert_eq!(ip.actions, vec![Action::PopVlan, Action::Output { port: 1 }]);
    }

    #[test]
    fn test_oxm_mpls() {
        let mut rule = OxmFlowRule::default();
        rule.update_match_inport(1);
        rule.update_match_mpls_label(102).unwrap();
        rule.action_push_mpls(101).unwrap();
        rule.action_pop_mpls().unwrap();
        rule.action_output(2);

        let rules = rule.rules();
        assert_eq!(
            serde_json::to_value(&rules).unwrap(),
            json!([{
                "match": {"in_port": 1, "eth_type": 0x8847, "mpls_label": 102},
                "actions": [
                    {"type": "PUSH_MPLS", "ethertype": 0x8847},
                    {"type": "SET_FIELD", "field": "mpls_label", "value": 101},
                    {"type": "POP_MPLS", "ethertype": 0x0806},
                    {"type": "OUTPUT", "port": 2}
                ]
            }])
        );
    }

    #[test]
    fn test_default_deny() {
        let rule = FlowRule::default_deny();
        assert!(rule.is_drop());
        assert!(rule.flow_match.is_any());
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"priority": 0, "match": {}, "actions": []})
        );
    }
}
