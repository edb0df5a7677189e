//! Flash regions and hardware platforms
//!
//! The debug log lives in a fixed window of the watch's external flash. Where
//! that window sits depends on the flash part each hardware platform uses.

use core::fmt;
use core::str::FromStr;

/// A contiguous window of flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlashRegion {
    /// Start offset (inclusive)
    pub start: u32,
    /// Length in bytes
    pub size: u32,
}

impl FlashRegion {
    /// Create a new region
    pub const fn new(start: u32, size: u32) -> Self {
        Self { start, size }
    }

    /// End offset (exclusive)
    ///
    /// Returns `None` if the region runs past the 32-bit address space.
    pub fn checked_end(&self) -> Option<u32> {
        self.start.checked_add(self.size)
    }

    /// End offset (exclusive), saturating at `u32::MAX`
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.size)
    }

    /// Size in whole KiB
    pub fn size_kib(&self) -> u32 {
        self.size / 1024
    }

    /// Whether the region fits in the 32-bit address space and is non-empty
    pub fn is_valid(&self) -> bool {
        self.size > 0 && self.checked_end().is_some()
    }
}

impl fmt::Display for FlashRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:X} - 0x{:X} ({} KB)",
            self.start,
            self.end(),
            self.size_kib()
        )
    }
}

/// Hardware platform
///
/// Each platform pairs a board with a flash part. Only some of them keep the
/// debug log at a fixed offset; the rest compute it in firmware and need a
/// region file to be usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// GD25LQ255E, 32 MiB
    Asterix,
    /// N25Q, 4 MiB
    Tintin,
    /// S29VS, 16 MiB
    Snowy,
    /// S29VS, 16 MiB
    Spalding,
    /// MX25U (layout computed in firmware)
    Silk,
    /// MT25Q (layout computed in firmware)
    Robert,
    /// MT25Q (layout computed in firmware)
    Calculus,
    /// GD25Q256E (layout computed in firmware)
    Obelix,
}

impl Platform {
    /// All known platforms
    pub const ALL: [Platform; 8] = [
        Platform::Asterix,
        Platform::Tintin,
        Platform::Snowy,
        Platform::Spalding,
        Platform::Silk,
        Platform::Robert,
        Platform::Calculus,
        Platform::Obelix,
    ];

    /// Platform used when none is given
    pub const DEFAULT: Platform = Platform::Asterix;

    /// Lowercase name, as used on the command line and in region files
    pub fn name(self) -> &'static str {
        match self {
            Platform::Asterix => "asterix",
            Platform::Tintin => "tintin",
            Platform::Snowy => "snowy",
            Platform::Spalding => "spalding",
            Platform::Silk => "silk",
            Platform::Robert => "robert",
            Platform::Calculus => "calculus",
            Platform::Obelix => "obelix",
        }
    }

    /// Debug log region, if it sits at a fixed offset on this platform
    pub fn flash_log_region(self) -> Option<FlashRegion> {
        match self {
            Platform::Asterix => Some(FlashRegion::new(0x1FD_0000, 0x2_0000)),
            Platform::Tintin => Some(FlashRegion::new(0x3E_0000, 0x2_0000)),
            Platform::Snowy | Platform::Spalding => Some(FlashRegion::new(0x0, 0x2_0000)),
            Platform::Silk | Platform::Robert | Platform::Calculus | Platform::Obelix => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown platform: {}", s))
    }
}
