//! Device selection for flashlogs
//!
//! This crate turns a `--device` string into an open connection. The CLI
//! only interacts with [`DeviceHandle`] and never names a concrete reader.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              CLI (bin/flashlogs)              │
//! │  - Only imports flashlogs-device and core     │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │          flashlogs-device (this crate)        │
//! │  - DeviceHandle: owns the open reader         │
//! │  - open_device: opens devices by name         │
//! └──────────────────────────────────────────────┘
//!                        │
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//! ┌──────────────────────┐ ┌──────────────────────┐
//! │  flashlogs-getbytes  │ │   flashlogs-dummy    │
//! │  - serial / TCP      │ │  - in-memory flash   │
//! └──────────────────────┘ └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use flashlogs_device::open_device;
//!
//! let mut handle = open_device("qemu")?;
//! let data = handle.read_region(0x1FD0000, 0x20000)?;
//! ```

mod handle;
mod registry;

pub use handle::DeviceHandle;
pub use registry::{
    available_devices, device_names_short, open_device, parse_device_params, DeviceInfo,
    DeviceParams,
};

// Re-export core types that CLI needs
pub use flashlogs_core::{ByteRangeReader, ReadProgress};
