use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use l1patch::config_loader;
use l1patch::config_v2::RunConfig;
use l1patch::flow::{FlowCommand, FlowRequest, FlowRuleBuilder, OfpVersion};
use l1patch::orchestrator::{FlowRuleGenerator, GenerateMode};
use log::info;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

/// Flow rule compiler for layer-1 patch wiring over OpenFlow switches
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run configuration YAML file; command-line flags take precedence
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print per-hop flow requests for every switch
    Generate(GenerateArgs),

    /// Print the flow-mod messages for every switch
    Compile {
        #[command(flatten)]
        generate: GenerateArgs,

        /// Flow command to emit
        #[arg(
            long = "command",
            default_value = "put",
            value_parser = FlowCommand::from_str
        )]
        flow_command: FlowCommand,

        /// Add a drop-all rule for every switch
        #[arg(long)]
        default_deny: bool,
    },

    /// Compile a single flow request body read from a file or stdin
    BuildFlow {
        /// OpenFlow version tag (OpenFlow10, OpenFlow12, OpenFlow13)
        #[arg(
            long,
            value_parser = OfpVersion::from_str,
            required_unless_present = "wire_version",
            conflicts_with = "wire_version"
        )]
        ofp_version: Option<OfpVersion>,

        /// Negotiated OpenFlow header version byte (1, 3, 4 or 0x01, 0x03, 0x04)
        #[arg(long, value_parser = parse_wire_version)]
        wire_version: Option<u8>,

        /// Request body JSON file; stdin when omitted
        file: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Physical topology (node info) JSON file
    #[arg(short, long)]
    physical: Option<PathBuf>,

    /// Logical topology (wire info) JSON file
    #[arg(short, long)]
    logical: Option<PathBuf>,

    /// Wires to generate rules for
    #[arg(short, long, value_enum)]
    mode: Option<GenerateMode>,

    /// OpenFlow version tag (OpenFlow10, OpenFlow12, OpenFlow13)
    #[arg(long, value_parser = OfpVersion::from_str)]
    ofp_version: Option<OfpVersion>,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Generation settings after merging command-line flags over the run configuration
#[derive(Debug)]
struct GenerateSettings {
    physical: PathBuf,
    logical: PathBuf,
    mode: GenerateMode,
    ofp_version: OfpVersion,
    output: Option<PathBuf>,
}

impl GenerateArgs {
    fn resolve(&self, config: &RunConfig) -> Result<GenerateSettings> {
        let compile = &config.compile;
        let physical = self
            .physical
            .clone()
            .or_else(|| compile.physical.clone())
            .ok_or_else(|| {
                eyre!("Physical topology file is required (--physical or compile.physical)")
            })?;
        let logical = self
            .logical
            .clone()
            .or_else(|| compile.logical.clone())
            .ok_or_else(|| {
                eyre!("Logical topology file is required (--logical or compile.logical)")
            })?;

        Ok(GenerateSettings {
            physical,
            logical,
            mode: self.mode.or(compile.mode).unwrap_or_default(),
            ofp_version: self.ofp_version.or(compile.ofp_version).unwrap_or_default(),
            output: self.output.clone(),
        })
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config_loader::load_run_config(path)?,
        None => RunConfig::default(),
    };

    let log_level = config.general.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match &args.command {
        Command::Generate(generate) => {
            let settings = generate.resolve(&config)?;
            let generator = load_generator(&settings)?;
            let requests = generator.generate(settings.mode)?;
            write_json(&requests, &settings.output)?;
        }
        Command::Compile {
            generate,
            flow_command,
            default_deny,
        } => {
            let settings = generate.resolve(&config)?;
            let default_deny = *default_deny || config.compile.default_deny.unwrap_or(false);
            let generator = load_generator(&settings)?;
            let flow_mods = generator.flow_mods(settings.mode, *flow_command, default_deny)?;
            write_json(&flow_mods, &settings.output)?;
        }
        Command::BuildFlow {
            ofp_version,
            wire_version,
            file,
        } => {
            let body = match file {
                Some(path) => std::fs::read_to_string(path)
                    .wrap_err_with(|| format!("Failed to read '{}'", path.display()))?,
                None => {
                    let mut body = String::new();
                    std::io::stdin()
                        .read_to_string(&mut body)
                        .wrap_err("Failed to read request body from stdin")?;
                    body
                }
            };
            let request = FlowRequest::from_json(&body)?;
            let builder = match (ofp_version, wire_version) {
                (Some(version), _) => FlowRuleBuilder::new(*version, &request),
                (None, Some(wire_version)) => {
                    FlowRuleBuilder::for_wire_version(*wire_version, &request)?
                }
                (None, None) => return Err(eyre!("--ofp-version or --wire-version is required")),
            };
            let rules = builder.build_flow()?;
            write_json(&rules, &None)?;
        }
    }

    info!("Flow rule generation completed successfully");
    Ok(())
}

fn load_generator(settings: &GenerateSettings) -> Result<FlowRuleGenerator> {
    info!("Physical topology: {:?}", settings.physical);
    info!("Logical topology: {:?}", settings.logical);
    FlowRuleGenerator::from_files(&settings.physical, &settings.logical, settings.ofp_version)
}

fn parse_wire_version(value: &str) -> std::result::Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid wire version '{}': {}", value, e))
}

fn write_json<T: Serialize>(value: &T, output: &Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
            info!("Output written to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
