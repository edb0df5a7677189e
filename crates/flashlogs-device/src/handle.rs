//! DeviceHandle - owns an open connection to a watch

use flashlogs_core::{ByteRangeReader, ReadProgress, Result};

/// An open watch connection
///
/// Wraps whichever reader the registry opened. The handle itself implements
/// [`ByteRangeReader`], so commands take `&mut dyn ByteRangeReader` and work
/// the same against a real watch and the dummy.
pub struct DeviceHandle {
    reader: Box<dyn ByteRangeReader>,
    spec: String,
}

impl DeviceHandle {
    /// Wrap an already opened reader
    pub fn new(reader: Box<dyn ByteRangeReader>, spec: impl Into<String>) -> Self {
        Self {
            reader,
            spec: spec.into(),
        }
    }

    /// The device string this handle was opened from
    pub fn spec(&self) -> &str {
        &self.spec
    }
}

impl ByteRangeReader for DeviceHandle {
    fn name(&self) -> &str {
        self.reader.name()
    }

    fn read_region(&mut self, start: u32, length: u32) -> Result<Vec<u8>> {
        log::debug!(
            "{}: Reading 0x{:X} bytes at 0x{:08X}",
            self.reader.name(),
            length,
            start
        );
        self.reader.read_region(start, length)
    }

    fn read_region_with_progress(
        &mut self,
        start: u32,
        length: u32,
        progress: &mut dyn ReadProgress,
    ) -> Result<Vec<u8>> {
        log::debug!(
            "{}: Reading 0x{:X} bytes at 0x{:08X}",
            self.reader.name(),
            length,
            start
        );
        self.reader.read_region_with_progress(start, length, progress)
    }
}
