//! `flash_logs` command implementation
//!
//! Reads the platform's debug log region from the watch in one request and
//! saves it to `flash_logs_<timestamp>.bin`. Decoding the dump is left to
//! `tools/dehash_flash_logs.py`.

use super::progress::IndicatifProgress;
use chrono::{Local, NaiveDateTime};
use flashlogs_core::{
    ByteRangeReader, FlashRegion, GetBytesErrorCode, Platform, ReadError, ReadProgress, RegionMap,
};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Offline tool that turns a dump into readable log lines
pub const DEHASH_TOOL: &str = "tools/dehash_flash_logs.py";

/// strftime pattern for dump file names (local time)
pub const FILE_NAME_FORMAT: &str = "flash_logs_%Y-%m-%d_%H-%M-%S.bin";

/// Errors from the `flash_logs` command
#[derive(Debug, Error)]
pub enum FlashLogsError {
    /// The watch refused to read the region; release firmware does this
    #[error("Could not read flash region. This may require non-release firmware.")]
    RegionUnavailable,

    /// Any other read failure, passed through untouched
    #[error(transparent)]
    Read(ReadError),

    /// The dump could not be saved
    #[error("failed to write {path:?}: {source}")]
    Write {
        /// Dump file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Status output could not be written
    #[error(transparent)]
    Output(#[from] io::Error),

    /// Platform name not in the region table and not a known platform
    #[error("unknown platform '{0}' (see list-platforms)")]
    UnknownPlatform(String),

    /// Known platform without a fixed log region
    #[error("platform '{0}' has no fixed flash log region; provide one with --regions")]
    NoRegion(String),
}

impl From<ReadError> for FlashLogsError {
    fn from(e: ReadError) -> Self {
        if e.device_code() == Some(GetBytesErrorCode::DoesNotExist) {
            FlashLogsError::RegionUnavailable
        } else {
            FlashLogsError::Read(e)
        }
    }
}

/// Look up the log region for `platform`
pub fn resolve_region(regions: &RegionMap, platform: &str) -> Result<FlashRegion, FlashLogsError> {
    if let Some(region) = regions.get(platform) {
        return Ok(region);
    }
    match platform.parse::<Platform>() {
        Ok(known) => Err(FlashLogsError::NoRegion(known.name().to_string())),
        Err(_) => Err(FlashLogsError::UnknownPlatform(platform.to_string())),
    }
}

/// Dump file name for a local wall-clock timestamp
pub fn dump_file_name(timestamp: &NaiveDateTime) -> String {
    timestamp.format(FILE_NAME_FORMAT).to_string()
}

/// Reads one flash region and saves it to disk
pub struct FlashLogReader {
    region: FlashRegion,
    output_dir: Option<PathBuf>,
}

impl FlashLogReader {
    /// Reader for `region`, saving into `output_dir` (current directory if `None`)
    pub fn new(region: FlashRegion, output_dir: Option<PathBuf>) -> Self {
        Self { region, output_dir }
    }

    /// Region this reader dumps
    pub fn region(&self) -> FlashRegion {
        self.region
    }

    /// Read the region, save it, and print where it went
    ///
    /// `now` names the dump and is consulted once the read has finished.
    /// Returns the absolute path of the dump. No file is created when the
    /// read fails.
    pub fn run<W, C>(
        &self,
        device: &mut dyn ByteRangeReader,
        progress: &mut dyn ReadProgress,
        now: C,
        out: &mut W,
    ) -> Result<PathBuf, FlashLogsError>
    where
        W: Write,
        C: FnOnce() -> NaiveDateTime,
    {
        let region = self.region;

        writeln!(out, "Reading flash log region: {}", region)?;
        log::debug!("Reading from {} device", device.name());

        let data = device.read_region_with_progress(region.start, region.size, progress)?;
        writeln!(out, "Read {} bytes from flash", data.len())?;

        let file_name = dump_file_name(&now());
        let path = match &self.output_dir {
            Some(dir) => dir.join(&file_name),
            None => PathBuf::from(&file_name),
        };

        write_dump(&path, &data).map_err(|source| FlashLogsError::Write {
            path: path.clone(),
            source,
        })?;

        let abs_path = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
        log::debug!("Wrote {} bytes to {:?}", data.len(), abs_path);

        writeln!(out, "Saved flash logs to {}", abs_path.display())?;
        writeln!(out)?;
        writeln!(out, "To parse and dehash the logs:")?;
        writeln!(out, "  {} {}", DEHASH_TOOL, path.display())?;

        Ok(abs_path)
    }
}

/// Run the command against an open device, printing to stdout
pub fn cmd_flash_logs(
    device: &mut dyn ByteRangeReader,
    region: FlashRegion,
    output_dir: Option<PathBuf>,
) -> Result<PathBuf, FlashLogsError> {
    let reader = FlashLogReader::new(region, output_dir);
    log::debug!(
        "Flash log region 0x{:08X}+0x{:X}",
        reader.region().start,
        reader.region().size
    );

    let mut progress = IndicatifProgress::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    reader.run(
        device,
        &mut progress,
        || Local::now().naive_local(),
        &mut out,
    )
}

/// Write `data` to a new file at `path`
///
/// Refuses to replace an existing dump. The file is closed on every path
/// out of this function.
fn write_dump(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(data)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use flashlogs_core::NoProgress;
    use flashlogs_dummy::{DummyConfig, DummyWatch};
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    const ASTERIX: FlashRegion = FlashRegion::new(0x1FD0000, 0x20000);

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 5, 9)
            .unwrap()
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    /// Reader that always fails with the given error
    struct Failing(ReadError);

    impl ByteRangeReader for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn read_region(&mut self, _start: u32, _length: u32) -> flashlogs_core::Result<Vec<u8>> {
            Err(self.0.clone())
        }
    }

    /// Reader whose read takes `duration` of wall-clock time on `clock`
    struct SlowWatch {
        inner: DummyWatch,
        clock: Rc<Cell<NaiveDateTime>>,
        duration: TimeDelta,
    }

    impl ByteRangeReader for SlowWatch {
        fn name(&self) -> &str {
            "slow"
        }

        fn read_region(&mut self, start: u32, length: u32) -> flashlogs_core::Result<Vec<u8>> {
            let data = self.inner.read_region(start, length)?;
            self.clock.set(self.clock.get() + self.duration);
            Ok(data)
        }
    }

    #[test]
    fn test_file_named_after_read_completes() {
        let dir = tempdir().unwrap();
        let clock = Rc::new(Cell::new(timestamp()));
        let mut watch = SlowWatch {
            inner: DummyWatch::new_default(),
            clock: Rc::clone(&clock),
            duration: TimeDelta::seconds(12),
        };
        let reader = FlashLogReader::new(ASTERIX, Some(dir.path().to_path_buf()));

        let path = reader
            .run(&mut watch, &mut NoProgress, || clock.get(), &mut io::sink())
            .unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "flash_logs_2026-10-19_08-05-21.bin"
        );
    }

    #[test]
    fn test_clock_not_read_when_read_fails() {
        let consulted = Cell::new(false);
        let mut device = Failing(ReadError::Timeout);
        let reader = FlashLogReader::new(ASTERIX, None);

        let now = || {
            consulted.set(true);
            timestamp()
        };
        assert!(reader
            .run(&mut device, &mut NoProgress, now, &mut io::sink())
            .is_err());
        assert!(!consulted.get());
    }

    #[test]
    fn test_erased_region_scenario() {
        let dir = tempdir().unwrap();
        let mut watch = DummyWatch::new_default();
        let reader = FlashLogReader::new(ASTERIX, Some(dir.path().to_path_buf()));

        let mut out = Vec::new();
        let path = reader
            .run(&mut watch, &mut NoProgress, timestamp, &mut out)
            .unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), 131072);
        assert!(written.iter().all(|&b| b == 0xFF));
        assert!(path.is_absolute());
        assert_eq!(
            path.file_name().unwrap(),
            "flash_logs_2026-10-19_08-05-09.bin"
        );

        let text = String::from_utf8(out).unwrap();
        let dump = dir.path().join("flash_logs_2026-10-19_08-05-09.bin");
        let expected = format!(
            "Reading flash log region: 0x1FD0000 - 0x1FF0000 (128 KB)\n\
             Read 131072 bytes from flash\n\
             Saved flash logs to {}\n\
             \n\
             To parse and dehash the logs:\n\
             \x20 tools/dehash_flash_logs.py {}\n",
            std::path::absolute(&dump).unwrap().display(),
            dump.display()
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_dump_matches_flash_contents() {
        let dir = tempdir().unwrap();
        let pattern: Vec<u8> = (0..0x20000u32).map(|i| (i % 251) as u8).collect();
        let mut watch = DummyWatch::with_data(DummyConfig::default(), 0x1FD0000, &pattern);
        let reader = FlashLogReader::new(ASTERIX, Some(dir.path().to_path_buf()));

        let path = reader
            .run(&mut watch, &mut NoProgress, timestamp, &mut io::sink())
            .unwrap();

        assert_eq!(std::fs::read(path).unwrap(), pattern);
        assert_eq!(watch.read_count(), 1);
    }

    #[test]
    fn test_short_read_is_saved_as_received() {
        let dir = tempdir().unwrap();
        let mut watch = DummyWatch::new_default();
        let reader = FlashLogReader::new(
            FlashRegion::new(0x1FD0000, 1000),
            Some(dir.path().to_path_buf()),
        );

        let mut out = Vec::new();
        let path = reader
            .run(&mut watch, &mut NoProgress, timestamp, &mut out)
            .unwrap();
        assert_eq!(std::fs::metadata(path).unwrap().len(), 1000);
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Read 1000 bytes from flash"));
    }

    #[test]
    fn test_release_firmware_is_translated() {
        let dir = tempdir().unwrap();
        let mut watch = DummyWatch::new(DummyConfig {
            release_firmware: true,
            ..Default::default()
        });
        let reader = FlashLogReader::new(ASTERIX, Some(dir.path().to_path_buf()));

        let err = reader
            .run(&mut watch, &mut NoProgress, timestamp, &mut io::sink())
            .unwrap_err();

        assert!(matches!(err, FlashLogsError::RegionUnavailable));
        assert!(err.to_string().contains("non-release firmware"));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_other_device_errors_pass_through() {
        let dir = tempdir().unwrap();
        let mut watch = DummyWatch::new(DummyConfig {
            fail_with: Some(GetBytesErrorCode::Corrupted),
            ..Default::default()
        });
        let reader = FlashLogReader::new(ASTERIX, Some(dir.path().to_path_buf()));

        let err = reader
            .run(&mut watch, &mut NoProgress, timestamp, &mut io::sink())
            .unwrap_err();

        match &err {
            FlashLogsError::Read(inner) => {
                assert_eq!(*inner, ReadError::Device(GetBytesErrorCode::Corrupted));
                assert_eq!(err.to_string(), inner.to_string());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!err.to_string().contains("non-release"));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_transport_errors_pass_through() {
        let dir = tempdir().unwrap();
        let reader = FlashLogReader::new(ASTERIX, Some(dir.path().to_path_buf()));

        for failure in [
            ReadError::Timeout,
            ReadError::Transport("connection reset".into()),
        ] {
            let mut device = Failing(failure.clone());
            let err = reader
                .run(&mut device, &mut NoProgress, timestamp, &mut io::sink())
                .unwrap_err();
            assert!(matches!(&err, FlashLogsError::Read(inner) if *inner == failure));
        }
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_same_second_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let reader = FlashLogReader::new(ASTERIX, Some(dir.path().to_path_buf()));

        let mut first = DummyWatch::new(DummyConfig {
            fill: 0x11,
            ..Default::default()
        });
        let path = reader
            .run(&mut first, &mut NoProgress, timestamp, &mut io::sink())
            .unwrap();

        let mut second = DummyWatch::new_default();
        let err = reader
            .run(&mut second, &mut NoProgress, timestamp, &mut io::sink())
            .unwrap_err();

        match err {
            FlashLogsError::Write { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists)
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(std::fs::read(path).unwrap().iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_dump_file_name() {
        assert_eq!(
            dump_file_name(&timestamp()),
            "flash_logs_2026-10-19_08-05-09.bin"
        );

        let now = chrono::Local::now().naive_local();
        let name = dump_file_name(&now);
        assert!(name.starts_with("flash_logs_"));
        assert!(name.ends_with(".bin"));
        assert_eq!(name.len(), "flash_logs_YYYY-MM-DD_HH-MM-SS.bin".len());
        assert!(NaiveDateTime::parse_from_str(&name, FILE_NAME_FORMAT).is_ok());
    }

    #[test]
    fn test_resolve_region() {
        let regions = RegionMap::builtin();
        assert_eq!(resolve_region(&regions, "asterix").unwrap(), ASTERIX);
        assert!(matches!(
            resolve_region(&regions, "silk"),
            Err(FlashLogsError::NoRegion(name)) if name == "silk"
        ));
        assert!(matches!(
            resolve_region(&regions, "basalt"),
            Err(FlashLogsError::UnknownPlatform(name)) if name == "basalt"
        ));

        let mut regions = RegionMap::builtin();
        regions.insert("silk", FlashRegion::new(0x0, 0x20000));
        assert_eq!(
            resolve_region(&regions, "Silk").unwrap(),
            FlashRegion::new(0x0, 0x20000)
        );
    }
}
