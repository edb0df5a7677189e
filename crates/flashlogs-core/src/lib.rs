//! flashlogs-core - Core types for reading watch flash log regions
//!
//! This crate defines what every other crate in the workspace agrees on:
//!
//! - [`FlashRegion`] and [`Platform`]: where the debug log lives in flash
//! - [`RegionMap`]: the table mapping hardware variants to regions, built in
//!   or loaded from a TOML file
//! - [`ByteRangeReader`]: the seam between the CLI and whatever talks to the
//!   watch (GetBytes client, dummy emulator)
//! - [`ReadError`] and [`GetBytesErrorCode`]: the tagged error taxonomy a
//!   reader returns
//!
//! # Example
//!
//! ```ignore
//! use flashlogs_core::{ByteRangeReader, RegionMap};
//!
//! fn dump<R: ByteRangeReader + ?Sized>(reader: &mut R) -> flashlogs_core::Result<Vec<u8>> {
//!     let map = RegionMap::builtin();
//!     let region = map.get("asterix").expect("asterix is built in");
//!     reader.read_region(region.start, region.size)
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod reader;
pub mod region;
pub mod region_map;

pub use error::{GetBytesErrorCode, ReadError, Result};
pub use reader::{ByteRangeReader, NoProgress, ReadProgress};
pub use region::{FlashRegion, Platform};
pub use region_map::{RegionMap, RegionMapError};
