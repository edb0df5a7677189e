//! flashlogs - Dump the debug log region from a watch's flash
//!
//! Reads the flash region that holds PBL_LOG output, saves it as a raw
//! binary file, and points at the offline dehashing tool.
//!
//! # Architecture
//!
//! The `flash_logs` command talks to a `ByteRangeReader`, which is one of:
//! - **getbytes** - the watch's GetBytes endpoint over a serial port or the
//!   emulator's TCP serial socket
//! - **dummy** - an in-memory flash image for testing
//!
//! Which region is read depends on the hardware platform. The built-in table
//! can be extended or overridden with `--regions <file.toml>`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use flashlogs_core::RegionMap;
use flashlogs_device::open_device;
use std::path::Path;

fn main() {
    let cli = Cli::parse();
    logger_builder(cli.verbose).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let regions = load_region_map(cli.regions.as_deref())?;

    match cli.command {
        Commands::FlashLogs {
            device,
            platform,
            output_dir,
        } => {
            // Resolve before connecting so a typo doesn't cost a connection
            let region = commands::resolve_region(&regions, &platform)?;
            let mut handle = open_device(&device)?;
            log::info!("Connected to {} ({})", handle.spec(), platform);
            commands::cmd_flash_logs(&mut handle, region, output_dir)?;
            Ok(())
        }
        Commands::ListPlatforms { toml: true } => {
            print!("{}", regions.to_toml_string());
            Ok(())
        }
        Commands::ListPlatforms { toml: false } => {
            commands::list_platforms(&regions);
            Ok(())
        }
        Commands::ListDevices => {
            commands::list_devices();
            Ok(())
        }
    }
}

/// Level forced by `-v` (Debug) or `-vv` (Trace); `None` leaves RUST_LOG or info
fn verbosity_filter(verbose: u8) -> Option<log::LevelFilter> {
    match verbose {
        0 => None,
        1 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    }
}

fn logger_builder(verbose: u8) -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = verbosity_filter(verbose) {
        builder.filter_level(level);
    }
    builder
}

/// Built-in region table, overlaid with the user's region file if given
fn load_region_map(path: Option<&Path>) -> Result<RegionMap, Box<dyn std::error::Error>> {
    let mut regions = RegionMap::builtin();

    if let Some(path) = path {
        let file = RegionMap::from_toml_file(path)?;
        log::info!(
            "Loaded {} platform region(s) from {}",
            file.len(),
            path.display()
        );
        regions.merge(file);
    }

    Ok(regions)
}
