//! CLI command implementations
//!
//! Commands work against `&mut dyn ByteRangeReader`, so they behave the same
//! whether the device is a watch, the emulator, or the dummy.

pub mod flash_logs;
mod list;
mod progress;

pub use flash_logs::{cmd_flash_logs, resolve_region};
pub use list::{list_devices, list_platforms};
