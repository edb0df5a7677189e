//! Platform to flash log region table
//!
//! The built-in table covers the platforms that keep their debug log at a
//! fixed offset. A TOML file can add platforms or override built-in entries:
//!
//! ```toml
//! [[platform]]
//! name = "silk"
//! start = 0x0
//! size = "128 KiB"
//!
//! [[platform]]
//! name = "asterix"
//! start = "0x1FD0000"
//! size = 0x20000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::region::{FlashRegion, Platform};

/// Errors from loading a region table
#[derive(Debug, Error)]
pub enum RegionMapError {
    /// The region file could not be read
    #[error("failed to read region file {path:?}: {source}")]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The region file is not valid TOML or has the wrong shape
    #[error("invalid region file: {0}")]
    Parse(String),

    /// The same platform appears twice in one file
    #[error("platform '{0}' is defined more than once")]
    DuplicatePlatform(String),

    /// A region is empty or runs past the 32-bit address space
    #[error("platform '{name}' has an invalid region (start 0x{start:X}, size 0x{size:X})")]
    InvalidRegion {
        /// Platform name
        name: String,
        /// Region start
        start: u32,
        /// Region size
        size: u32,
    },
}

/// Region file structure
#[derive(Debug, serde::Deserialize)]
struct TomlRegionFile {
    #[serde(default)]
    platform: Vec<TomlPlatform>,
}

/// One platform entry in a region file
#[derive(Debug, serde::Deserialize)]
struct TomlPlatform {
    name: String,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    start: u32,
    #[serde(deserialize_with = "deserialize_size")]
    size: u32,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Deserialize a size that can be a number or a string like "128 KiB"
fn deserialize_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
pub fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// Parse a size string like "128 KiB", "0x20000" or "131072"
pub fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = parse_number(s) {
        return Ok(n);
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mb") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("kb") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix('b') {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

/// Format a byte count the way region files spell it
pub fn format_size(size: u32) -> String {
    if size >= 1024 * 1024 && size % (1024 * 1024) == 0 {
        format!("{} MiB", size / (1024 * 1024))
    } else if size >= 1024 && size % 1024 == 0 {
        format!("{} KiB", size / 1024)
    } else {
        format!("{} B", size)
    }
}

/// Mapping from platform name to flash log region
///
/// Names are matched case-insensitively and kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    entries: Vec<(String, FlashRegion)>,
}

impl RegionMap {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table of every platform with a fixed flash log region
    pub fn builtin() -> Self {
        let mut map = Self::new();
        for platform in Platform::ALL {
            if let Some(region) = platform.flash_log_region() {
                map.insert(platform.name(), region);
            }
        }
        map
    }

    /// Add or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, region: FlashRegion) {
        let name = name.into().to_lowercase();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = region,
            None => self.entries.push((name, region)),
        }
    }

    /// Look up a platform's region (case-insensitive)
    pub fn get(&self, name: &str) -> Option<FlashRegion> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, region)| *region)
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, FlashRegion)> + '_ {
        self.entries.iter().map(|(n, r)| (n.as_str(), *r))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of this table; its entries win
    pub fn merge(&mut self, other: RegionMap) {
        for (name, region) in other.entries {
            self.insert(name, region);
        }
    }

    /// Load a table from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RegionMapError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| RegionMapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_toml_str(&content)?;
        log::debug!("Loaded {} platform region(s) from {:?}", map.len(), path);
        Ok(map)
    }

    /// Parse a table from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, RegionMapError> {
        let file: TomlRegionFile =
            toml::from_str(content).map_err(|e| RegionMapError::Parse(e.to_string()))?;

        let mut map = Self::new();
        for entry in file.platform {
            if map.get(&entry.name).is_some() {
                return Err(RegionMapError::DuplicatePlatform(entry.name));
            }
            let region = FlashRegion::new(entry.start, entry.size);
            if !region.is_valid() {
                return Err(RegionMapError::InvalidRegion {
                    name: entry.name,
                    start: entry.start,
                    size: entry.size,
                });
            }
            map.insert(entry.name, region);
        }

        Ok(map)
    }

    /// Render the table in region file format
    pub fn to_toml_string(&self) -> String {
        let mut output = String::new();
        for (name, region) in self.iter() {
            output.push_str("[[platform]]\n");
            output.push_str(&format!("name = \"{}\"\n", name));
            output.push_str(&format!("start = 0x{:08X}\n", region.start));
            output.push_str(&format!("size = \"{}\"\n", format_size(region.size)));
            output.push('\n');
        }
        output
    }
}
