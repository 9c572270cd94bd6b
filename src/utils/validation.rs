//! Address validation utilities.
//!
//! Test host ports carry the MAC address used to tell shared wires apart,
//! so a malformed address is rejected before any rule is generated.

use crate::config_v2::TestHostPortData;
use crate::error::DefinitionError;
use regex::Regex;
use std::sync::OnceLock;

fn mac_regex() -> &'static Regex {
    static MAC_RE: OnceLock<Regex> = OnceLock::new();
    MAC_RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{2}(:[0-9a-fA-F]{2}){5}$").expect("MAC address regex is valid")
    })
}

/// Check for a colon-separated 48-bit MAC address, e.g. `0a:00:00:00:00:01`
pub fn is_valid_mac_addr(mac: &str) -> bool {
    mac_regex().is_match(mac)
}

/// Check for an IPv4/IPv6 address, with or without a prefix length
pub fn is_valid_ip_addr(ip: &str) -> bool {
    let (addr, prefix) = match ip.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (ip, None),
    };
    let Ok(addr) = addr.parse::<std::net::IpAddr>() else {
        return false;
    };
    match prefix {
        None => true,
        Some(prefix) => match prefix.parse::<u8>() {
            Ok(len) if addr.is_ipv4() => len <= 32,
            Ok(len) => len <= 128,
            Err(_) => false,
        },
    }
}

/// Validate the addressing of a test host port
///
/// # Returns
/// * `Ok(())` if the MAC, IP and optional gateway addresses are well formed
/// * `Err(DefinitionError)` naming the node and port otherwise
pub fn validate_test_host_port(
    node: &str,
    port: &str,
    data: &TestHostPortData,
) -> Result<(), DefinitionError> {
    if !is_valid_mac_addr(&data.mac_addr) {
        return Err(DefinitionError::InvalidMacAddress {
            node: node.to_string(),
            port: port.to_string(),
            mac: data.mac_addr.clone(),
        });
    }
    let addresses = std::iter::once(&data.ip_addr).chain(data.gateway.as_ref());
    for ip in addresses {
        if !is_valid_ip_addr(ip) {
            return Err(DefinitionError::InvalidIpAddress {
                node: node.to_string(),
                port: port.to_string(),
                ip: ip.clone(),
            });
        }
    }
    Ok(())
}
