//! List commands implementation

use flashlogs_core::region_map::format_size;
use flashlogs_core::{Platform, RegionMap};
use flashlogs_device::available_devices;

/// List all supported devices
pub fn list_devices() {
    println!("Supported devices:");
    println!();
    for device in available_devices() {
        if device.aliases.is_empty() {
            println!("  {:<9} - {}", device.name, device.description);
        } else {
            println!(
                "  {:<9} - {} (aliases: {})",
                device.name,
                device.description,
                device.aliases.join(", ")
            );
        }
    }
}

/// List platforms and their flash log regions
pub fn list_platforms(regions: &RegionMap) {
    println!("Flash log regions:");
    println!();
    println!("{:<12} {:>12} {:>12} {:>10}", "Platform", "Start", "End", "Size");
    println!("{}", "-".repeat(50));

    for (name, region) in regions.iter() {
        println!(
            "{:<12} {:>12} {:>12} {:>10}",
            name,
            format!("0x{:08X}", region.start),
            format!("0x{:08X}", region.end()),
            format_size(region.size)
        );
    }

    // Known platforms the table cannot serve yet
    let missing: Vec<&str> = Platform::ALL
        .iter()
        .map(|p| p.name())
        .filter(|name| regions.get(name).is_none())
        .collect();
    if !missing.is_empty() {
        println!();
        println!(
            "No fixed region (supply one with --regions): {}",
            missing.join(", ")
        );
    }
}
