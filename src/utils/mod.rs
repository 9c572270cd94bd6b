//! Shared utilities: address validation.

pub mod validation;

pub use validation::{is_valid_ip_addr, is_valid_mac_addr, validate_test_host_port};
