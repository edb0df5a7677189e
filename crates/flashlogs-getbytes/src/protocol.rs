//! GetBytes wire format
//!
//! Three layers, all big-endian:
//!
//! ```text
//! serial frame : FEED | protocol:u16 | len:u16 | payload[len] | BEEF
//! pebble frame : len:u16 | endpoint:u16 | payload[len]
//! getbytes     : command:u8 | transaction_id:u8 | body
//! ```
//!
//! Serial frames with protocol [`QEMU_PROTOCOL_SPP`] carry a byte stream of
//! pebble frames. A pebble frame may be split across serial frames.

use flashlogs_core::GetBytesErrorCode;

use crate::error::{GetBytesError, Result};

/// Serial frame start marker
pub const QEMU_HEADER: u16 = 0xFEED;
/// Serial frame end marker
pub const QEMU_FOOTER: u16 = 0xBEEF;
/// Serial protocol id for the pebble frame stream
pub const QEMU_PROTOCOL_SPP: u16 = 0x0001;
/// Largest serial frame payload accepted or produced
pub const QEMU_MAX_PAYLOAD: usize = 2048;
/// Bytes before a serial frame's payload
pub const QEMU_HEADER_LEN: usize = 6;

/// Bytes before a pebble frame's payload
pub const PEBBLE_HEADER_LEN: usize = 4;

/// GetBytes endpoint id
pub const GETBYTES_ENDPOINT: u16 = 0x2328;

// GetBytes commands
/// Request the last coredump
pub const CMD_COREDUMP_REQUEST: u8 = 0x00;
/// Response header: error code and total byte count
pub const CMD_INFO_RESPONSE: u8 = 0x01;
/// One chunk of response data
pub const CMD_DATA_RESPONSE: u8 = 0x02;
/// Request a named file
pub const CMD_FILE_REQUEST: u8 = 0x03;
/// Request a raw flash range
pub const CMD_FLASH_REQUEST: u8 = 0x04;
/// Request the last coredump only if unread
pub const CMD_UNREAD_COREDUMP_REQUEST: u8 = 0x05;

/// A decoded GetBytes message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetBytesMessage {
    /// Coredump request (no body)
    CoredumpRequest,
    /// Response header
    InfoResponse {
        /// Outcome of the request
        error_code: GetBytesErrorCode,
        /// Total bytes that will follow in data responses
        num_bytes: u32,
    },
    /// Response data chunk
    DataResponse {
        /// Offset of `data` within the response
        offset: u32,
        /// Chunk payload
        data: Vec<u8>,
    },
    /// Raw flash range request
    FlashRequest {
        /// Flash offset
        offset: u32,
        /// Byte count
        length: u32,
    },
    /// Unread coredump request (no body)
    UnreadCoredumpRequest,
    /// Any other command, body kept as-is
    Other {
        /// Command byte
        command: u8,
        /// Undecoded body
        body: Vec<u8>,
    },
}

/// A GetBytes packet: transaction id plus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBytesPacket {
    /// Correlates requests and responses
    pub transaction_id: u8,
    /// Message body
    pub message: GetBytesMessage,
}

impl GetBytesPacket {
    /// Build a flash range request
    pub fn flash_request(transaction_id: u8, offset: u32, length: u32) -> Self {
        Self {
            transaction_id,
            message: GetBytesMessage::FlashRequest { offset, length },
        }
    }

    /// Encode to the GetBytes endpoint payload
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        match &self.message {
            GetBytesMessage::CoredumpRequest => {
                out.extend_from_slice(&[CMD_COREDUMP_REQUEST, self.transaction_id]);
            }
            GetBytesMessage::InfoResponse {
                error_code,
                num_bytes,
            } => {
                out.extend_from_slice(&[CMD_INFO_RESPONSE, self.transaction_id]);
                out.push(error_code.as_u8());
                out.extend_from_slice(&num_bytes.to_be_bytes());
            }
            GetBytesMessage::DataResponse { offset, data } => {
                out.extend_from_slice(&[CMD_DATA_RESPONSE, self.transaction_id]);
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(data);
            }
            GetBytesMessage::FlashRequest { offset, length } => {
                out.extend_from_slice(&[CMD_FLASH_REQUEST, self.transaction_id]);
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&length.to_be_bytes());
            }
            GetBytesMessage::UnreadCoredumpRequest => {
                out.extend_from_slice(&[CMD_UNREAD_COREDUMP_REQUEST, self.transaction_id]);
            }
            GetBytesMessage::Other { command, body } => {
                out.extend_from_slice(&[*command, self.transaction_id]);
                out.extend_from_slice(body);
            }
        }
        out
    }

    /// Decode a GetBytes endpoint payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(GetBytesError::Malformed(format!(
                "GetBytes packet of {} byte(s)",
                payload.len()
            )));
        }

        let command = payload[0];
        let transaction_id = payload[1];
        let body = &payload[2..];

        let message = match command {
            CMD_COREDUMP_REQUEST => GetBytesMessage::CoredumpRequest,
            CMD_INFO_RESPONSE => {
                if body.len() < 5 {
                    return Err(GetBytesError::Malformed(format!(
                        "info response body of {} byte(s)",
                        body.len()
                    )));
                }
                GetBytesMessage::InfoResponse {
                    error_code: GetBytesErrorCode::from_u8(body[0]),
                    num_bytes: be_u32(&body[1..5]),
                }
            }
            CMD_DATA_RESPONSE => {
                if body.len() < 4 {
                    return Err(GetBytesError::Malformed(format!(
                        "data response body of {} byte(s)",
                        body.len()
                    )));
                }
                GetBytesMessage::DataResponse {
                    offset: be_u32(&body[..4]),
                    data: body[4..].to_vec(),
                }
            }
            CMD_FLASH_REQUEST => {
                if body.len() < 8 {
                    return Err(GetBytesError::Malformed(format!(
                        "flash request body of {} byte(s)",
                        body.len()
                    )));
                }
                GetBytesMessage::FlashRequest {
                    offset: be_u32(&body[..4]),
                    length: be_u32(&body[4..8]),
                }
            }
            CMD_UNREAD_COREDUMP_REQUEST => GetBytesMessage::UnreadCoredumpRequest,
            command => GetBytesMessage::Other {
                command,
                body: body.to_vec(),
            },
        };

        Ok(Self {
            transaction_id,
            message,
        })
    }
}

/// A pebble protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PebbleFrame {
    /// Destination endpoint
    pub endpoint: u16,
    /// Endpoint payload
    pub payload: Vec<u8>,
}

impl PebbleFrame {
    /// Encode with the 4-byte length/endpoint header
    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = u16::try_from(self.payload.len()).map_err(|_| {
            GetBytesError::InvalidParameter(format!(
                "payload of {} bytes does not fit a frame",
                self.payload.len()
            ))
        })?;
        let mut out = Vec::with_capacity(PEBBLE_HEADER_LEN + self.payload.len());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.endpoint.to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Take one complete frame off the front of `buf`
    ///
    /// Returns `None` and leaves `buf` untouched if the frame is incomplete.
    pub fn take_from(buf: &mut Vec<u8>) -> Option<Self> {
        if buf.len() < PEBBLE_HEADER_LEN {
            return None;
        }
        let len = usize::from(be_u16(&buf[0..2]));
        let endpoint = be_u16(&buf[2..4]);
        if buf.len() < PEBBLE_HEADER_LEN + len {
            return None;
        }
        let payload = buf[PEBBLE_HEADER_LEN..PEBBLE_HEADER_LEN + len].to_vec();
        buf.drain(..PEBBLE_HEADER_LEN + len);
        Some(Self { endpoint, payload })
    }
}

/// Wrap `payload` in one serial frame
pub fn encode_qemu_frame(protocol: u16, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > QEMU_MAX_PAYLOAD {
        return Err(GetBytesError::InvalidParameter(format!(
            "serial frame payload of {} bytes exceeds {}",
            payload.len(),
            QEMU_MAX_PAYLOAD
        )));
    }
    let mut out = Vec::with_capacity(QEMU_HEADER_LEN + payload.len() + 2);
    out.extend_from_slice(&QEMU_HEADER.to_be_bytes());
    out.extend_from_slice(&protocol.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&QEMU_FOOTER.to_be_bytes());
    Ok(out)
}

/// Split a pebble frame stream into serial frames
pub fn encode_spp_stream(stream: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(stream.len() + 8);
    for chunk in stream.chunks(QEMU_MAX_PAYLOAD) {
        out.extend_from_slice(&encode_qemu_frame(QEMU_PROTOCOL_SPP, chunk)?);
    }
    Ok(out)
}

/// Parse the protocol and payload length after a serial frame's start marker
pub fn parse_qemu_header(rest: &[u8; 4]) -> Result<(u16, usize)> {
    let protocol = be_u16(&rest[0..2]);
    let len = usize::from(be_u16(&rest[2..4]));
    if len > QEMU_MAX_PAYLOAD {
        return Err(GetBytesError::Framing(format!(
            "serial frame length {} exceeds {}",
            len, QEMU_MAX_PAYLOAD
        )));
    }
    Ok((protocol, len))
}

fn be_u16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b[1]])
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_request_bytes() {
        let packet = GetBytesPacket::flash_request(7, 0x1FD0000, 0x20000);
        assert_eq!(
            packet.encode(),
            vec![0x04, 0x07, 0x01, 0xFD, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00]
        );
    }

    #[test]
    fn test_decode_info_response() {
        let packet = GetBytesPacket::decode(&[0x01, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(packet.transaction_id, 3);
        assert_eq!(
            packet.message,
            GetBytesMessage::InfoResponse {
                error_code: GetBytesErrorCode::DoesNotExist,
                num_bytes: 0,
            }
        );
    }

    #[test]
    fn test_decode_data_response() {
        let packet =
            GetBytesPacket::decode(&[0x02, 0x01, 0x00, 0x00, 0x10, 0x00, 0xAA, 0xBB]).unwrap();
        assert_eq!(
            packet.message,
            GetBytesMessage::DataResponse {
                offset: 0x1000,
                data: vec![0xAA, 0xBB],
            }
        );
    }

    #[test]
    fn test_decode_short_packets() {
        assert!(matches!(
            GetBytesPacket::decode(&[0x01]),
            Err(GetBytesError::Malformed(_))
        ));
        assert!(matches!(
            GetBytesPacket::decode(&[0x01, 0x00, 0x00, 0x00]),
            Err(GetBytesError::Malformed(_))
        ));
        assert!(matches!(
            GetBytesPacket::decode(&[0x02, 0x00, 0x00]),
            Err(GetBytesError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_unknown_command() {
        let packet = GetBytesPacket::decode(&[0x03, 0x09, b'a', b'b']).unwrap();
        assert_eq!(
            packet.message,
            GetBytesMessage::Other {
                command: CMD_FILE_REQUEST,
                body: b"ab".to_vec(),
            }
        );
    }

    #[test]
    fn test_pebble_frame_take_partial() {
        let frame = PebbleFrame {
            endpoint: GETBYTES_ENDPOINT,
            payload: vec![1, 2, 3],
        };
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes, vec![0x00, 0x03, 0x23, 0x28, 1, 2, 3]);

        let mut buf = bytes[..5].to_vec();
        assert_eq!(PebbleFrame::take_from(&mut buf), None);
        assert_eq!(buf.len(), 5);

        buf.extend_from_slice(&bytes[5..]);
        buf.push(0xEE);
        assert_eq!(PebbleFrame::take_from(&mut buf), Some(frame));
        assert_eq!(buf, vec![0xEE]);
    }

    #[test]
    fn test_qemu_frame() {
        let bytes = encode_qemu_frame(QEMU_PROTOCOL_SPP, &[0xAB]).unwrap();
        assert_eq!(bytes, vec![0xFE, 0xED, 0x00, 0x01, 0x00, 0x01, 0xAB, 0xBE, 0xEF]);
        assert_eq!(
            parse_qemu_header(&[0x00, 0x01, 0x00, 0x01]).unwrap(),
            (QEMU_PROTOCOL_SPP, 1)
        );
        assert!(matches!(
            parse_qemu_header(&[0x00, 0x01, 0xFF, 0xFF]),
            Err(GetBytesError::Framing(_))
        ));
        assert!(encode_qemu_frame(QEMU_PROTOCOL_SPP, &[0; QEMU_MAX_PAYLOAD + 1]).is_err());
    }

    #[test]
    fn test_spp_stream_splits_large_payloads() {
        let stream = vec![0x55; QEMU_MAX_PAYLOAD + 10];
        let bytes = encode_spp_stream(&stream).unwrap();
        assert_eq!(bytes.len(), stream.len() + 2 * (QEMU_HEADER_LEN + 2));
    }
}
