pub mod config_cmd;
pub mod inspect;
pub mod scan;
pub mod signatures;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sd_meta::{Inspector, SignatureRegistry};
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "sd-inspect",
    version,
    about = "Read prompts, generation parameters and model types from Stable Diffusion files"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Args, Clone)]
pub struct GlobalArgs {
    /// Model signature file (overrides config; built-in list by default).
    #[arg(long, global = true, env = "SD_INSPECT_SIGNATURES")]
    pub signatures: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect one or more files and print the results as JSON.
    Inspect(InspectArgs),

    /// Inspect every supported file under a directory.
    Scan(ScanArgs),

    /// List the known model types in match order.
    Signatures,

    /// View / edit configuration.
    Config(ConfigArgs),
}

//  Subcommand argument structs

#[derive(Debug, clap::Args, Clone)]
pub struct InspectArgs {
    /// Image or model files.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Single-line JSON output.
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct ScanArgs {
    /// Directory to scan.
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Concurrent inspections (overrides config).
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print full results as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Display the current configuration.
    Show,
    /// Set a configuration value (`pretty`, `scan_jobs`, `signatures`).
    Set { key: String, value: String },
}

//  Shared helpers

/// Load the signature registry chosen by flags, then config, then the
/// built-in list.
pub fn load_registry(global: &GlobalArgs, config: &AppConfig) -> anyhow::Result<SignatureRegistry> {
    let registry = match global.signatures.as_ref().or(config.signatures.as_ref()) {
        Some(path) => {
            info!(path = %path.display(), "Using custom model signatures");
            SignatureRegistry::load(path)?
        }
        None => SignatureRegistry::builtin()?,
    };
    Ok(registry)
}

pub fn build_inspector(global: &GlobalArgs, config: &AppConfig) -> anyhow::Result<Inspector> {
    Ok(Inspector::new(Arc::new(load_registry(global, config)?)))
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}
