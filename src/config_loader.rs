use crate::config_v2::{RunConfig, TopologyDefinition, WireInfo};
use crate::error::DefinitionError;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;

/// Load the physical topology (node info) JSON file
pub fn load_topology(path: &Path) -> Result<TopologyDefinition> {
    info!("Loading topology from: {:?}", path);
    load_json(path)
}

/// Load the logical wire (wire info) JSON file
pub fn load_wire_info(path: &Path) -> Result<WireInfo> {
    info!("Loading wires from: {:?}", path);
    load_json(path)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read '{}'", path.display()))?;
    let value = serde_json::from_str(&content).map_err(|e| DefinitionError::Parse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(value)
}

/// Load and validate the YAML run configuration
pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    info!("Loading configuration from: {:?}", path);

    let file = File::open(path).wrap_err_with(|| format!("Failed to open '{}'", path.display()))?;
    let config: RunConfig = serde_yaml::from_reader(file)?;
    config.validate()?;

    Ok(config)
}
