//! Install/remove commands addressed to the controller runtime.

use crate::error::ControllerError;
use crate::flow::rule::FlowRule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flow modification command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowCommand {
    /// Install the rule
    Put,
    /// Remove the rule
    Delete,
}

impl fmt::Display for FlowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => f.write_str("put"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

impl FromStr for FlowCommand {
    type Err = ControllerError;

    fn from_str(command: &str) -> Result<Self, Self::Err> {
        match command.to_ascii_lowercase().as_str() {
            "put" => Ok(Self::Put),
            "delete" => Ok(Self::Delete),
            _ => Err(ControllerError::UnknownCommand(command.to_string())),
        }
    }
}

/// One rule body addressed to one switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMod {
    pub switch: String,
    pub dpid: u64,
    pub command: FlowCommand,
    pub rule: FlowRule,
}
