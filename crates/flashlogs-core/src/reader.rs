//! Byte-range reader trait
//!
//! A [`ByteRangeReader`] is anything that can fetch a contiguous slice of a
//! watch's flash: the GetBytes client talking to a real (or emulated) watch,
//! or the in-memory dummy. The CLI only ever sees this trait.

use crate::error::Result;

/// Progress sink for long reads
///
/// Readers that receive data in pieces call [`advance`](Self::advance) once
/// per piece. All methods default to doing nothing.
pub trait ReadProgress {
    /// Called once before any data arrives
    fn start(&mut self, _total: u64) {}

    /// Called after `bytes` more bytes have been received
    fn advance(&mut self, _bytes: u64) {}

    /// Called once after the last byte has been received
    fn finish(&mut self) {}
}

/// Progress sink that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ReadProgress for NoProgress {}

/// Reads contiguous byte ranges from a device's flash
///
/// The read is a single blocking round trip from the caller's point of view.
/// Implementations own any chunking and timeout policy; they do not retry.
pub trait ByteRangeReader {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Read `length` bytes starting at flash offset `start`
    fn read_region(&mut self, start: u32, length: u32) -> Result<Vec<u8>>;

    /// Read a region while reporting progress
    ///
    /// The default implementation performs a plain [`read_region`] and
    /// reports the whole payload at once.
    ///
    /// [`read_region`]: Self::read_region
    fn read_region_with_progress(
        &mut self,
        start: u32,
        length: u32,
        progress: &mut dyn ReadProgress,
    ) -> Result<Vec<u8>> {
        progress.start(u64::from(length));
        let data = self.read_region(start, length)?;
        progress.advance(data.len() as u64);
        progress.finish();
        Ok(data)
    }
}

impl<R: ByteRangeReader + ?Sized> ByteRangeReader for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_region(&mut self, start: u32, length: u32) -> Result<Vec<u8>> {
        (**self).read_region(start, length)
    }

    fn read_region_with_progress(
        &mut self,
        start: u32,
        length: u32,
        progress: &mut dyn ReadProgress,
    ) -> Result<Vec<u8>> {
        (**self).read_region_with_progress(start, length, progress)
    }
}
