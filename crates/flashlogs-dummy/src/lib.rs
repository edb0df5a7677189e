//! flashlogs-dummy - In-memory watch flash emulator for testing
//!
//! This crate provides a dummy device that answers byte-range reads from a
//! flash image held in memory. It's useful for testing and development
//! without a watch or emulator.

use flashlogs_core::{ByteRangeReader, GetBytesErrorCode, ReadError, ReadProgress, Result};

/// Bytes reported per progress update
const CHUNK_SIZE: usize = 4096;

/// Configuration for the dummy watch
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Flash size in bytes
    pub size: usize,
    /// Value every flash byte starts with
    pub fill: u8,
    /// Behave like release firmware, which refuses flash reads
    pub release_firmware: bool,
    /// Fail every read with this device error code
    pub fail_with: Option<GetBytesErrorCode>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            size: 32 * 1024 * 1024, // GD25LQ255E
            fill: 0xFF,
            release_firmware: false,
            fail_with: None,
        }
    }
}

/// Dummy watch
///
/// Emulates a watch's external flash in memory for testing purposes.
pub struct DummyWatch {
    config: DummyConfig,
    data: Vec<u8>,
    reads: usize,
}

impl DummyWatch {
    /// Create a new dummy watch with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![config.fill; config.size];
        Self {
            config,
            data,
            reads: 0,
        }
    }

    /// Create a new dummy watch with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy watch with `initial_data` written at `offset`
    pub fn with_data(config: DummyConfig, offset: usize, initial_data: &[u8]) -> Self {
        let mut watch = Self::new(config);
        let start = offset.min(watch.data.len());
        let len = initial_data.len().min(watch.data.len() - start);
        watch.data[start..start + len].copy_from_slice(&initial_data[..len]);
        watch
    }

    /// Number of read requests answered so far, failed ones included
    pub fn read_count(&self) -> usize {
        self.reads
    }

    fn check_request(&self, start: u32, length: u32) -> Result<core::ops::Range<usize>> {
        if let Some(code) = self.config.fail_with {
            return Err(ReadError::Device(code));
        }
        if self.config.release_firmware {
            log::debug!("dummy: Release firmware refuses flash reads");
            return Err(ReadError::Device(GetBytesErrorCode::DoesNotExist));
        }

        let end = start
            .checked_add(length)
            .ok_or(ReadError::OutOfRange { start, length })?;
        let (start, end) = (start as usize, end as usize);
        if end > self.data.len() {
            log::debug!(
                "dummy: Read 0x{:X}..0x{:X} beyond {} byte flash",
                start,
                end,
                self.data.len()
            );
            return Err(ReadError::Device(GetBytesErrorCode::DoesNotExist));
        }
        Ok(start..end)
    }
}

impl ByteRangeReader for DummyWatch {
    fn name(&self) -> &str {
        "dummy"
    }

    fn read_region(&mut self, start: u32, length: u32) -> Result<Vec<u8>> {
        self.reads += 1;
        let range = self.check_request(start, length)?;
        Ok(self.data[range].to_vec())
    }

    fn read_region_with_progress(
        &mut self,
        start: u32,
        length: u32,
        progress: &mut dyn ReadProgress,
    ) -> Result<Vec<u8>> {
        self.reads += 1;
        let range = self.check_request(start, length)?;

        progress.start(u64::from(length));
        let mut out = Vec::with_capacity(range.len());
        for chunk in self.data[range].chunks(CHUNK_SIZE) {
            out.extend_from_slice(chunk);
            progress.advance(chunk.len() as u64);
        }
        progress.finish();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashlogs_core::NoProgress;

    #[test]
    fn test_read_erased_flash() {
        let mut watch = DummyWatch::new_default();
        let data = watch.read_region(0x1FD0000, 0x20000).unwrap();
        assert_eq!(data.len(), 131072);
        assert!(data.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_read_prefilled() {
        let config = DummyConfig {
            size: 0x1000,
            ..Default::default()
        };
        let mut watch = DummyWatch::with_data(config, 0x100, &[0x12, 0x34, 0x56]);
        assert_eq!(
            watch.read_region(0xFF, 5).unwrap(),
            vec![0xFF, 0x12, 0x34, 0x56, 0xFF]
        );
    }

    #[test]
    fn test_release_firmware() {
        let mut watch = DummyWatch::new(DummyConfig {
            release_firmware: true,
            ..Default::default()
        });
        assert_eq!(
            watch.read_region(0, 16),
            Err(ReadError::Device(GetBytesErrorCode::DoesNotExist))
        );
        assert_eq!(watch.read_count(), 1);
    }

    #[test]
    fn test_forced_failure() {
        let mut watch = DummyWatch::new(DummyConfig {
            fail_with: Some(GetBytesErrorCode::Corrupted),
            ..Default::default()
        });
        assert_eq!(
            watch.read_region_with_progress(0, 16, &mut NoProgress),
            Err(ReadError::Device(GetBytesErrorCode::Corrupted))
        );
    }

    #[test]
    fn test_read_past_end() {
        let mut watch = DummyWatch::new(DummyConfig {
            size: 0x1000,
            ..Default::default()
        });
        assert_eq!(
            watch.read_region(0xFF0, 0x20),
            Err(ReadError::Device(GetBytesErrorCode::DoesNotExist))
        );
        assert_eq!(
            watch.read_region(0xFFFF_FFFF, 2),
            Err(ReadError::OutOfRange {
                start: 0xFFFF_FFFF,
                length: 2
            })
        );
    }

    #[test]
    fn test_progress_in_chunks() {
        struct Count(Vec<u64>);
        impl ReadProgress for Count {
            fn advance(&mut self, bytes: u64) {
                self.0.push(bytes);
            }
        }

        let mut watch = DummyWatch::new(DummyConfig {
            size: 0x3000,
            ..Default::default()
        });
        let mut progress = Count(Vec::new());
        let data = watch
            .read_region_with_progress(0, 0x2800, &mut progress)
            .unwrap();
        assert_eq!(data.len(), 0x2800);
        assert_eq!(progress.0, vec![4096, 4096, 2048]);
    }
}
