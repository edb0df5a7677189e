//! Byte links to the watch
//!
//! A real watch is reached over a serial port and the emulator over its
//! serial-over-TCP socket. Both carry the same framed stream, so one
//! [`StreamTransport`] wraps either.

use crate::error::{GetBytesError, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Default read/write timeout for both transports
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default serial baud rate for the watch's debug UART
pub const DEFAULT_BAUD: u32 = 115_200;

/// Moves raw bytes to and from the watch
pub trait Transport {
    /// Write all bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `buf.len()` bytes
    ///
    /// Fails with a timeout if the peer stays silent longer than the
    /// transport's timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<()>;
}

/// [`Transport`] over any blocking byte stream
pub struct StreamTransport<S> {
    stream: S,
    peer: String,
}

/// Serial link to a watch
pub type SerialTransport = StreamTransport<Box<dyn SerialPort>>;

/// TCP link to the emulator's serial socket
pub type TcpTransport = StreamTransport<TcpStream>;

impl<S: Read + Write> StreamTransport<S> {
    /// Wrap an already open stream; `peer` is only used in log messages
    pub fn from_stream(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
        }
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl SerialTransport {
    /// Open a serial port, 8N1 without flow control
    ///
    /// Uses [`DEFAULT_BAUD`] when `baud` is `None`.
    pub fn open(device: &str, baud: Option<u32>) -> Result<Self> {
        let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

        let port = serialport::new(device, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .open()?;

        log::info!("Opened serial port {} at {} baud", device, baud_rate);
        Ok(Self::from_stream(port, device))
    }
}

impl TcpTransport {
    /// Connect to the emulator's serial socket
    ///
    /// Every resolved address is tried in turn, each bounded by
    /// [`DEFAULT_TIMEOUT_SECS`].
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| GetBytesError::ConnectionFailed(format!("{}:{}: {}", host, port, e)))?;

        let mut last_err = None;
        for addr in addrs {
            log::debug!("Connecting to {}", addr);
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    configure_stream(&stream, timeout)?;
                    log::info!("Connected to {}", addr);
                    return Ok(Self::from_stream(stream, addr.to_string()));
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(GetBytesError::ConnectionFailed(match last_err {
            Some(e) => format!("{}:{}: {}", host, port, e),
            None => format!("{}:{}: no addresses resolved", host, port),
        }))
    }
}

fn configure_stream(stream: &TcpStream, timeout: Duration) -> Result<()> {
    let setup = |what: &str, r: std::io::Result<()>| {
        r.map_err(|e| GetBytesError::ConnectionFailed(format!("failed to set {}: {}", what, e)))
    };
    // Requests are a single small frame
    setup("TCP_NODELAY", stream.set_nodelay(true))?;
    setup("read timeout", stream.set_read_timeout(Some(timeout)))?;
    setup("write timeout", stream.set_write_timeout(Some(timeout)))
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        log::trace!("{} <- {} bytes", self.peer, data.len());
        self.stream.write_all(data)?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stream.read_exact(buf)?;
        log::trace!("{} -> {} bytes", self.peer, buf.len());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}
