//! Device registry and initialization
//!
//! This module handles opening devices by name and creating DeviceHandles.

use crate::handle::DeviceHandle;
use std::collections::HashMap;

/// Parsed device parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    /// Device name
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

/// Parse a device string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_device_params("getbytes:ip=localhost:12344")?;
/// assert_eq!(params.name, "getbytes");
/// assert_eq!(params.params.get("ip"), Some(&"localhost:12344".to_string()));
/// ```
pub fn parse_device_params(s: &str) -> Result<DeviceParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    if name.is_empty() {
        return Err("Empty device name".into());
    }

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(DeviceParams {
        name: name.to_string(),
        params,
    })
}

/// Open a device and create a DeviceHandle
///
/// # Arguments
/// * `device` - Device specification (e.g., "qemu" or "getbytes:dev=/dev/ttyUSB0")
///
/// # Example
/// ```ignore
/// let mut handle = open_device("dummy")?;
/// let data = handle.read_region(0, 16)?;
/// ```
pub fn open_device(device: &str) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    let params = parse_device_params(device)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, device),

        #[cfg(feature = "getbytes")]
        "getbytes" => open_getbytes(&params, device),

        #[cfg(feature = "getbytes")]
        "qemu" | "emulator" => open_qemu(&params, device),

        _ => Err(format!("Unknown device: {}", params.name).into()),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &DeviceParams,
    spec: &str,
) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    use flashlogs_core::region_map::{parse_number, parse_size};
    use flashlogs_dummy::{DummyConfig, DummyWatch};

    let mut config = DummyConfig::default();

    if let Some(release) = params.params.get("release") {
        config.release_firmware = parse_bool(release)
            .ok_or_else(|| format!("Invalid release value: {}", release))?;
    }
    if let Some(fill) = params.params.get("fill") {
        let fill = parse_number(fill).map_err(|e| format!("Invalid fill value: {}", e))?;
        config.fill = u8::try_from(fill).map_err(|_| format!("Fill value 0x{:X} is not a byte", fill))?;
    }
    if let Some(size) = params.params.get("size") {
        config.size = parse_size(size).map_err(|e| format!("Invalid size: {}", e))? as usize;
    }

    log::info!(
        "Opening dummy watch ({} bytes, {} firmware)",
        config.size,
        if config.release_firmware { "release" } else { "debug" }
    );

    Ok(DeviceHandle::new(Box::new(DummyWatch::new(config)), spec))
}

#[cfg(feature = "getbytes")]
fn open_getbytes(
    params: &DeviceParams,
    spec: &str,
) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    use flashlogs_getbytes::GetBytesConnection;

    log::info!("Opening GetBytes connection...");

    // Build connection string from dev= or ip= parameters
    let conn_str = params
        .params
        .iter()
        .filter(|(k, _)| *k == "dev" || *k == "ip")
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>();

    let conn_str = match conn_str.as_slice() {
        [one] => one.clone(),
        [] => {
            return Err("getbytes requires connection parameters.\n\
                 Usage: getbytes:dev=/dev/ttyUSB0[:baud] or getbytes:ip=host:port"
                .into())
        }
        _ => return Err("getbytes takes either dev= or ip=, not both".into()),
    };

    let conn = GetBytesConnection::parse(&conn_str)
        .map_err(|e| format!("Invalid getbytes parameters: {}", e))?;
    let reader = conn.open()?;

    Ok(DeviceHandle::new(reader, spec))
}

#[cfg(feature = "getbytes")]
fn open_qemu(params: &DeviceParams, spec: &str) -> Result<DeviceHandle, Box<dyn std::error::Error>> {
    use flashlogs_getbytes::{GetBytesConnection, DEFAULT_EMULATOR_PORT};

    let conn = match params.params.get("ip") {
        Some(ip) => GetBytesConnection::parse(&format!("ip={}", ip))?,
        None => {
            let port = match params.params.get("port") {
                Some(port) => port
                    .parse()
                    .map_err(|_| format!("Invalid port: {}", port))?,
                None => DEFAULT_EMULATOR_PORT,
            };
            GetBytesConnection::Tcp {
                host: "localhost".to_string(),
                port,
            }
        }
    };

    log::info!("Opening emulator connection...");
    let reader = conn.open()?;
    Ok(DeviceHandle::new(reader, spec))
}

#[cfg(feature = "dummy")]
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Device information and listing
/// Information about a device type
pub struct DeviceInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available devices (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    #[cfg(feature = "dummy")]
    devices.push(DeviceInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory watch emulator for testing (release=<bool>,fill=<byte>,size=<size>)",
    });

    #[cfg(feature = "getbytes")]
    devices.push(DeviceInfo {
        name: "getbytes",
        aliases: &[],
        description: "GetBytes endpoint over serial/network (dev=<port>[:baud] or ip=<host:port>)",
    });

    #[cfg(feature = "getbytes")]
    devices.push(DeviceInfo {
        name: "qemu",
        aliases: &["emulator"],
        description: "Emulator serial socket on localhost:12344 (port=<n> or ip=<host:port>)",
    });

    devices
}

/// Generate a short list of device names for CLI help
pub fn device_names_short() -> String {
    let devices = available_devices();
    if devices.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = devices.iter().map(|d| d.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashlogs_core::{ByteRangeReader, GetBytesErrorCode, ReadError};

    #[test]
    fn test_parse_plain_name() {
        let params = parse_device_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_parse_params_with_colons() {
        let params = parse_device_params("getbytes:ip=localhost:12344").unwrap();
        assert_eq!(params.name, "getbytes");
        assert_eq!(
            params.params.get("ip").map(String::as_str),
            Some("localhost:12344")
        );

        let params = parse_device_params("dummy:release=1,fill=0x00").unwrap();
        assert_eq!(params.params.len(), 2);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_device_params("dummy:release").is_err());
        assert!(parse_device_params(":ip=x:1").is_err());
    }

    #[test]
    fn test_unknown_device() {
        let err = open_device("bluetooth").err().unwrap();
        assert_eq!(err.to_string(), "Unknown device: bluetooth");
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        let mut handle = open_device("dummy:fill=0x5A,size=64 KiB").unwrap();
        assert_eq!(handle.name(), "dummy");
        assert_eq!(handle.spec(), "dummy:fill=0x5A,size=64 KiB");
        assert_eq!(handle.read_region(0, 4).unwrap(), vec![0x5A; 4]);
        assert!(handle.read_region(0x1FD0000, 4).is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_release() {
        let mut handle = open_device("dummy:release=yes").unwrap();
        assert_eq!(
            handle.read_region(0x1FD0000, 0x20000),
            Err(ReadError::Device(GetBytesErrorCode::DoesNotExist))
        );
        assert!(open_device("dummy:fill=0x100").is_err());
        assert!(open_device("dummy:release=maybe").is_err());
    }

    #[cfg(feature = "getbytes")]
    #[test]
    fn test_getbytes_requires_connection() {
        assert!(open_device("getbytes").is_err());
        assert!(open_device("getbytes:ip=a:1,dev=/dev/null").is_err());
    }

    #[test]
    fn test_device_names() {
        let names = device_names_short();
        #[cfg(feature = "dummy")]
        assert!(names.contains("dummy"));
        #[cfg(feature = "getbytes")]
        assert!(names.contains("qemu"));
    }
}
