//! Per-hop flow request bodies.
//!
//! A [`FlowRequest`] describes one switch's forwarding decision in the flat
//! form accepted by the controller's REST interface:
//!
//! ```json
//! {"dpid": 3, "inport": 2, "outport": 1, "eth_dst": "0a:00:00:00:00:01",
//!  "vlan_vid": 200, "pop_vlan": true, "priority": 32767}
//! ```
//!
//! Wires and wire groups emit these in batch; an ad hoc request parsed with
//! [`FlowRequest::from_json`] goes through the same rule builder.

use crate::error::RestRequestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest VLAN id usable in a match or tag action
pub const VLAN_VID_MAX: u16 = 4095;

/// Highest 20-bit MPLS label
pub const MPLS_LABEL_MAX: u32 = 0xF_FFFF;

/// Switch name to the requests for that switch, in generation order
pub type FlowRequestMap = BTreeMap<String, Vec<FlowRequest>>;

/// Flat match/action request for a single switch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowRequest {
    /// Datapath id of the target switch
    pub dpid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inport: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outport: Option<u32>,
    /// Fan-out ports; takes precedence over `outport`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outports: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_dst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_vid: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpls_label: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_vlan: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_vlan: Option<u16>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pop_vlan: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_mpls: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pop_mpls: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl FlowRequest {
    /// Request forwarding `inport` to `outport` on switch `dpid`
    pub fn forward(dpid: u64, inport: u32, outport: u32, priority: u16) -> Self {
        Self {
            dpid,
            priority: Some(priority),
            inport: Some(inport),
            outport: Some(outport),
            ..Default::default()
        }
    }

    /// Strictly parse a request body; unknown keys and out-of-range
    /// VLAN ids or MPLS labels are rejected
    pub fn from_json(body: &str) -> Result<Self, RestRequestError> {
        let request: Self = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    /// Check VLAN ids are 1..=4095 and MPLS labels fit in 20 bits
    pub fn validate(&self) -> Result<(), RestRequestError> {
        let vlan_fields = [
            ("vlan_vid", self.vlan_vid),
            ("push_vlan", self.push_vlan),
            ("set_vlan", self.set_vlan),
        ];
        for (field, value) in vlan_fields {
            if let Some(value) = value {
                if !(1..=VLAN_VID_MAX).contains(&value) {
                    return Err(RestRequestError::InvalidVlanId { field, value });
                }
            }
        }

        for (field, value) in [("mpls_label", self.mpls_label), ("push_mpls", self.push_mpls)] {
            if let Some(value) = value {
                if value > MPLS_LABEL_MAX {
                    return Err(RestRequestError::InvalidMplsLabel { field, value });
                }
            }
        }
        Ok(())
    }

    /// Output ports in action order: `outports` if given, else `outport`
    pub fn output_ports(&self) -> Vec<u32> {
        match (&self.outports, self.outport) {
            (Some(ports), _) if !ports.is_empty() => ports.clone(),
            (_, Some(port)) => vec![port],
            _ => Vec::new(),
        }
    }
}

/// Append every request list of `from` to the same switch's list in `into`.
///
/// Lists are concatenated; nothing is replaced or deduplicated.
pub fn merge_flow_requests(into: &mut FlowRequestMap, from: FlowRequestMap) {
    for (switch, requests) in from {
        into.entry(switch).or_default().extend(requests);
    }
}

/// Append one request to a switch's list
pub fn push_flow_request(into: &mut FlowRequestMap, switch: &str, request: FlowRequest) {
    into.entry(switch.to_string()).or_default().push(request);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = FlowRequest::from_json(
            r#"{"outport": 1, "dpid": 3, "eth_dst": "0a:00:00:00:00:01",
                "inport": 2, "pop_vlan": true, "vlan_vid": 200}"#,
        )
        .unwrap();
        assert_eq!(request.dpid, 3);
        assert_eq!(request.inport, Some(2));
        assert_eq!(request.vlan_vid, Some(200));
        assert!(request.pop_vlan);
        assert_eq!(request.output_ports(), vec![1]);
    }

    #[test]
    fn test_reject_unknown_and_mistyped_keys() {
        assert!(matches!(
            FlowRequest::from_json(r#"{"dpid": 1, "inport": 1, "outport": 2, "os.system": "x"}"#),
            Err(RestRequestError::InvalidBody(_))
        ));
        assert!(
            FlowRequest::from_json(r#"{"dpid": 1, "inport": "s1-eth1", "outport": 2}"#).is_err()
        );
        assert!(FlowRequest::from_json("{'dpid': 1}").is_err());
    }

    #[test]
    fn test_reject_out_of_range_tags() {
        assert!(matches!(
            FlowRequest::from_json(r#"{"dpid": 1, "inport": 1, "outport": 2, "push_vlan": 5000}"#),
            Err(RestRequestError::InvalidVlanId { field: "push_vlan", value: 5000 })
        ));
        assert!(matches!(
            FlowRequest::from_json(r#"{"dpid": 1, "inport": 1, "outport": 2, "vlan_vid": 0}"#),
            Err(RestRequestError::InvalidVlanId { field: "vlan_vid", value: 0 })
        ));
        assert!(matches!(
            FlowRequest::from_json(r#"{"dpid": 1, "inport": 1, "outport": 2, "set_vlan": 4096}"#),
            Err(RestRequestError::InvalidVlanId { field: "set_vlan", value: 4096 })
        ));
        assert!(matches!(
            FlowRequest::from_json(
                r#"{"dpid": 1, "inport": 1, "outport": 2, "push_mpls": 1048576}"#
            ),
            Err(RestRequestError::InvalidMplsLabel { field: "push_mpls", value: 1048576 })
        ));
        // u16 overflow is a schema error
        assert!(matches!(
            FlowRequest::from_json(r#"{"dpid": 1, "inport": 1, "outport": 2, "push_vlan": 70000}"#),
            Err(RestRequestError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_accept_boundary_tags() {
        let request = FlowRequest::from_json(
            r#"{"dpid": 1, "inport": 1, "outport": 2, "vlan_vid": 1,
                "push_vlan": 4095, "mpls_label": 0, "push_mpls": 1048575}"#,
        )
        .unwrap();
        assert_eq!(request.push_vlan, Some(VLAN_VID_MAX));
        assert_eq!(request.push_mpls, Some(MPLS_LABEL_MAX));
        assert!(FlowRequest::forward(1, 1, 2, 65535).validate().is_ok());
    }

    #[test]
    fn test_outports_take_precedence() {
        let request = FlowRequest {
            outport: Some(9),
            outports: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        assert_eq!(request.output_ports(), vec![1, 2, 3]);
        assert!(FlowRequest::default().output_ports().is_empty());
    }

    #[test]
    fn test_merge_concatenates() {
        let mut into = FlowRequestMap::new();
        push_flow_request(&mut into, "s1", FlowRequest::forward(1, 1, 2, 65535));

        let mut from = FlowRequestMap::new();
        push_flow_request(&mut from, "s1", FlowRequest::forward(1, 1, 2, 65535));
        push_flow_request(&mut from, "s2", FlowRequest::forward(2, 1, 2, 65535));
        merge_flow_requests(&mut into, from);

        assert_eq!(into["s1"].len(), 2);
        assert_eq!(into["s2"].len(), 1);
    }

    #[test]
    fn test_serialize_skips_unset_fields() {
        let request = FlowRequest::forward(1, 3, 4, 65535);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"dpid": 1, "priority": 65535, "inport": 3, "outport": 4})
        );
    }
}
