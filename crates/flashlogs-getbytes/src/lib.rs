//! flashlogs-getbytes - GetBytes endpoint client
//!
//! This crate reads raw flash ranges from a watch through its GetBytes
//! endpoint. The watch (or the emulator) exposes a framed serial stream on a
//! TCP socket or a serial port; pebble protocol frames travel inside it.
//!
//! # Supported Transports
//!
//! - TCP socket: `ip=localhost:12344` (emulator serial socket)
//! - Serial port: `dev=/dev/ttyUSB0`, `dev=/dev/pts/3:230400`
//!
//! # Example
//!
//! ```no_run
//! use flashlogs_core::ByteRangeReader;
//! use flashlogs_getbytes::{GetBytesClient, TcpTransport};
//!
//! let transport = TcpTransport::connect("localhost", 12344)?;
//! let mut client = GetBytesClient::new(transport);
//!
//! let data = client.read_region(0x1FD0000, 0x20000)?;
//! println!("Read {} bytes", data.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod device;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports
pub use device::GetBytesClient;
pub use error::{GetBytesError, Result};
pub use transport::{SerialTransport, StreamTransport, TcpTransport, Transport};

use flashlogs_core::ByteRangeReader;

/// Default emulator serial socket port
pub const DEFAULT_EMULATOR_PORT: u16 = 12344;

/// Connection options for the GetBytes client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetBytesConnection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate (None for the default)
        baud: Option<u32>,
    },
    /// TCP socket connection
    Tcp {
        /// Hostname or IP address
        host: String,
        /// Port number
        port: u16,
    },
}

impl GetBytesConnection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyUSB0` - Serial with default baud
    /// - `dev=/dev/ttyUSB0:115200` - Serial with specified baud
    /// - `ip=host:port` - TCP connection
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(dev) = s.strip_prefix("dev=") {
            if let Some((device, baud_str)) = dev.rsplit_once(':') {
                let baud = baud_str
                    .parse()
                    .map_err(|_| format!("Invalid baud rate: {}", baud_str))?;
                Ok(GetBytesConnection::Serial {
                    device: device.to_string(),
                    baud: Some(baud),
                })
            } else {
                Ok(GetBytesConnection::Serial {
                    device: dev.to_string(),
                    baud: None,
                })
            }
        } else if let Some(ip) = s.strip_prefix("ip=") {
            let (host, port_str) = ip
                .rsplit_once(':')
                .ok_or_else(|| "Missing port in ip= parameter".to_string())?;
            let port = port_str
                .parse()
                .map_err(|_| format!("Invalid port: {}", port_str))?;
            Ok(GetBytesConnection::Tcp {
                host: host.to_string(),
                port,
            })
        } else {
            Err(format!(
                "Invalid getbytes connection string: {}. Use dev=... or ip=...",
                s
            ))
        }
    }

    /// Open the connection and return a boxed reader
    pub fn open(&self) -> Result<Box<dyn ByteRangeReader>> {
        match self {
            GetBytesConnection::Serial { device, baud } => {
                let transport = SerialTransport::open(device, *baud)?;
                Ok(Box::new(GetBytesClient::new(transport)))
            }
            GetBytesConnection::Tcp { host, port } => {
                let transport = TcpTransport::connect(host, *port)?;
                Ok(Box::new(GetBytesClient::new(transport)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial() {
        assert_eq!(
            GetBytesConnection::parse("dev=/dev/ttyUSB0").unwrap(),
            GetBytesConnection::Serial {
                device: "/dev/ttyUSB0".into(),
                baud: None
            }
        );
        assert_eq!(
            GetBytesConnection::parse("dev=/dev/pts/3:230400").unwrap(),
            GetBytesConnection::Serial {
                device: "/dev/pts/3".into(),
                baud: Some(230400)
            }
        );
        assert!(GetBytesConnection::parse("dev=/dev/ttyUSB0:fast").is_err());
    }

    #[test]
    fn test_parse_tcp() {
        assert_eq!(
            GetBytesConnection::parse("ip=localhost:12344").unwrap(),
            GetBytesConnection::Tcp {
                host: "localhost".into(),
                port: DEFAULT_EMULATOR_PORT
            }
        );
        assert!(GetBytesConnection::parse("ip=localhost").is_err());
        assert!(GetBytesConnection::parse("ip=localhost:99999").is_err());
    }

    #[test]
    fn test_parse_unknown() {
        assert!(GetBytesConnection::parse("usb=1").is_err());
    }
}
