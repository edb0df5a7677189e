//! CLI argument parsing

use clap::{Parser, Subcommand};
use flashlogs_core::Platform;
use flashlogs_device::device_names_short;
use std::path::PathBuf;

/// Generate dynamic help text for the device argument
fn device_help() -> String {
    format!("Device to read from [available: {}]", device_names_short())
}

#[derive(Parser)]
#[command(name = "flashlogs")]
#[command(author, version, about = "Watch flash log dumper", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Region file (TOML) adding or overriding platform flash log regions
    #[arg(long, global = true)]
    pub regions: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dump flash logs (PBL_LOG) from the watch
    #[command(name = "flash_logs", visible_alias = "flash-logs")]
    FlashLogs {
        /// Device to read from
        #[arg(short, long, help = device_help())]
        device: String,

        /// Hardware platform whose log region to read
        #[arg(long, default_value = Platform::DEFAULT.name())]
        platform: String,

        /// Directory to write the dump to (defaults to the current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List platforms and their flash log regions
    ListPlatforms {
        /// Print the table as a region file instead
        #[arg(long)]
        toml: bool,
    },

    /// List supported devices
    ListDevices,
}
