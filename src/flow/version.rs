//! OpenFlow protocol versions supported by the rule compiler.

use crate::error::{ControllerError, DefinitionError};
use crate::flow::rule::{FlowRuleEncoding, LegacyFlowRule, OxmFlowRule};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol version of a target switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfpVersion {
    #[default]
    OpenFlow10,
    OpenFlow12,
    OpenFlow13,
}

impl OfpVersion {
    /// Version number as carried in the OpenFlow header
    pub fn wire_version(self) -> u8 {
        match self {
            Self::OpenFlow10 => 0x01,
            Self::OpenFlow12 => 0x03,
            Self::OpenFlow13 => 0x04,
        }
    }

    /// Map a negotiated header version to a supported version
    pub fn from_wire(version: u8) -> Result<Self, ControllerError> {
        match version {
            0x01 => Ok(Self::OpenFlow10),
            0x03 => Ok(Self::OpenFlow12),
            0x04 => Ok(Self::OpenFlow13),
            other => Err(ControllerError::UnsupportedVersion(other)),
        }
    }

    /// Whether VLAN tags are added with an explicit push action.
    ///
    /// OpenFlow 1.0 has no push; its set-VLAN action adds a tag when
    /// the frame has none.
    pub fn has_push_vlan(self) -> bool {
        !matches!(self, Self::OpenFlow10)
    }

    /// Create an empty rule in the encoding of this version
    pub fn encoding(self) -> Box<dyn FlowRuleEncoding> {
        match self {
            Self::OpenFlow10 => Box::new(LegacyFlowRule::default()),
            Self::OpenFlow12 | Self::OpenFlow13 => Box::new(OxmFlowRule::new(self)),
        }
    }
}

impl fmt::Display for OfpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::OpenFlow10 => "OpenFlow10",
            Self::OpenFlow12 => "OpenFlow12",
            Self::OpenFlow13 => "OpenFlow13",
        };
        f.write_str(tag)
    }
}

impl FromStr for OfpVersion {
    type Err = DefinitionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "OpenFlow10" => Ok(Self::OpenFlow10),
            "OpenFlow12" => Ok(Self::OpenFlow12),
            "OpenFlow13" => Ok(Self::OpenFlow13),
            _ => Err(DefinitionError::UnknownOfpVersion {
                tag: tag.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_tags() {
        assert_eq!("OpenFlow10".parse::<OfpVersion>().unwrap(), OfpVersion::OpenFlow10);
        assert_eq!("OpenFlow13".parse::<OfpVersion>().unwrap(), OfpVersion::OpenFlow13);
        assert!(matches!(
            "OpenFlow15".parse::<OfpVersion>(),
            Err(DefinitionError::UnknownOfpVersion { tag }) if tag == "OpenFlow15"
        ));
    }

    #[test]
    fn test_default_version() {
        assert_eq!(OfpVersion::default(), OfpVersion::OpenFlow10);
        assert!(!OfpVersion::default().has_push_vlan());
    }

    #[test]
    fn test_wire_versions() {
        for version in [OfpVersion::OpenFlow10, OfpVersion::OpenFlow12, OfpVersion::OpenFlow13] {
            assert_eq!(OfpVersion::from_wire(version.wire_version()).unwrap(), version);
        }
        // OpenFlow 1.1 and 1.4 are not supported
        assert!(matches!(
            OfpVersion::from_wire(0x02),
            Err(ControllerError::UnsupportedVersion(0x02))
        ));
        assert!(OfpVersion::from_wire(0x05).is_err());
    }
}
