//! GetBytes client
//!
//! This module provides `GetBytesClient`, which speaks the GetBytes endpoint
//! over any [`Transport`] and implements [`ByteRangeReader`].

use crate::error::{GetBytesError, Result};
use crate::protocol::*;
use crate::transport::Transport;

use flashlogs_core::{ByteRangeReader, NoProgress, ReadProgress};

/// Connection to the GetBytes endpoint of a watch
pub struct GetBytesClient<T: Transport> {
    /// Transport layer (serial or TCP)
    transport: T,
    /// Pebble frame bytes received but not yet parsed
    rx: Vec<u8>,
    /// Transaction id for the next request
    next_transaction: u8,
}

impl<T: Transport> GetBytesClient<T> {
    /// Create a client over an open transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            rx: Vec::new(),
            next_transaction: 0,
        }
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Read a flash range, reporting progress per received chunk
    pub fn get_flash_region(
        &mut self,
        offset: u32,
        length: u32,
        progress: &mut dyn ReadProgress,
    ) -> Result<Vec<u8>> {
        let transaction_id = self.allocate_transaction_id();
        log::debug!(
            "getbytes: Requesting flash 0x{:08X}+0x{:X} (transaction {})",
            offset,
            length,
            transaction_id
        );

        self.send(&GetBytesPacket::flash_request(transaction_id, offset, length))?;

        let num_bytes = self.wait_for_info(transaction_id)?;
        if num_bytes != length {
            log::warn!(
                "getbytes: Watch will send {} bytes, {} were requested",
                num_bytes,
                length
            );
        }

        self.collect_data(transaction_id, num_bytes, progress)
    }

    fn allocate_transaction_id(&mut self) -> u8 {
        let id = self.next_transaction;
        self.next_transaction = self.next_transaction.wrapping_add(1);
        id
    }

    /// Wait for the info response of `transaction_id` and return its byte count
    fn wait_for_info(&mut self, transaction_id: u8) -> Result<u32> {
        loop {
            let packet = self.recv()?;
            if packet.transaction_id != transaction_id {
                log::debug!(
                    "getbytes: Ignoring message for transaction {}",
                    packet.transaction_id
                );
                continue;
            }

            match packet.message {
                GetBytesMessage::InfoResponse {
                    error_code,
                    num_bytes,
                } => {
                    if !error_code.is_success() {
                        log::debug!("getbytes: Watch refused request: {}", error_code);
                        return Err(GetBytesError::Device(error_code));
                    }
                    return Ok(num_bytes);
                }
                other => {
                    return Err(GetBytesError::Malformed(format!(
                        "expected info response, got {:?}",
                        other
                    )));
                }
            }
        }
    }

    fn collect_data(
        &mut self,
        transaction_id: u8,
        num_bytes: u32,
        progress: &mut dyn ReadProgress,
    ) -> Result<Vec<u8>> {
        let total = num_bytes as usize;
        let mut data = vec![0u8; total];
        let mut filled = vec![false; total];
        let mut received = 0usize;

        progress.start(u64::from(num_bytes));

        while received < total {
            let packet = self.recv()?;
            if packet.transaction_id != transaction_id {
                log::debug!(
                    "getbytes: Ignoring message for transaction {}",
                    packet.transaction_id
                );
                continue;
            }

            let (offset, chunk) = match packet.message {
                GetBytesMessage::DataResponse { offset, data } => (offset as usize, data),
                other => {
                    return Err(GetBytesError::Malformed(format!(
                        "expected data response, got {:?}",
                        other
                    )));
                }
            };

            let end = offset
                .checked_add(chunk.len())
                .filter(|&end| end <= total)
                .ok_or_else(|| {
                    GetBytesError::Malformed(format!(
                        "data chunk at {} (+{}) outside response of {} bytes",
                        offset,
                        chunk.len(),
                        total
                    ))
                })?;

            // A repeated chunk would otherwise count twice and leave a gap
            if filled[offset..end].iter().any(|&f| f) {
                return Err(GetBytesError::Malformed(format!(
                    "data chunk at {} (+{}) overlaps bytes already received",
                    offset,
                    chunk.len()
                )));
            }
            filled[offset..end].fill(true);

            data[offset..end].copy_from_slice(&chunk);
            received += chunk.len();
            log::trace!("getbytes: {} / {} bytes", received, total);
            progress.advance(chunk.len() as u64);
        }

        progress.finish();
        Ok(data)
    }

    fn send(&mut self, packet: &GetBytesPacket) -> Result<()> {
        let frame = PebbleFrame {
            endpoint: GETBYTES_ENDPOINT,
            payload: packet.encode(),
        }
        .encode()?;
        let bytes = encode_spp_stream(&frame)?;
        self.transport.write(&bytes)?;
        self.transport.flush()
    }

    /// Receive the next GetBytes packet, skipping other endpoints
    fn recv(&mut self) -> Result<GetBytesPacket> {
        loop {
            if let Some(frame) = PebbleFrame::take_from(&mut self.rx) {
                if frame.endpoint != GETBYTES_ENDPOINT {
                    log::trace!(
                        "getbytes: Skipping {} byte frame for endpoint 0x{:04X}",
                        frame.payload.len(),
                        frame.endpoint
                    );
                    continue;
                }
                return GetBytesPacket::decode(&frame.payload);
            }

            self.fill_rx()?;
        }
    }

    /// Read one serial frame and append its stream bytes to `rx`
    fn fill_rx(&mut self) -> Result<()> {
        self.sync_to_header()?;

        let mut header = [0u8; 4];
        self.transport.read(&mut header)?;
        let (protocol, len) = parse_qemu_header(&header)?;

        let mut payload = vec![0u8; len];
        self.transport.read(&mut payload)?;

        let mut footer = [0u8; 2];
        self.transport.read(&mut footer)?;
        if u16::from_be_bytes(footer) != QEMU_FOOTER {
            return Err(GetBytesError::Framing(format!(
                "bad frame footer 0x{:02X}{:02X}",
                footer[0], footer[1]
            )));
        }

        if protocol == QEMU_PROTOCOL_SPP {
            self.rx.extend_from_slice(&payload);
        } else {
            log::trace!(
                "getbytes: Skipping {} byte frame for protocol {}",
                len,
                protocol
            );
        }
        Ok(())
    }

    /// Discard bytes until a frame start marker has been consumed
    fn sync_to_header(&mut self) -> Result<()> {
        let [hi, lo] = QEMU_HEADER.to_be_bytes();
        let mut consumed = 0usize;
        let mut prev = 0u8;
        loop {
            let mut byte = [0u8];
            self.transport.read(&mut byte)?;
            consumed += 1;
            if consumed >= 2 && prev == hi && byte[0] == lo {
                if consumed > 2 {
                    log::debug!("getbytes: Skipped {} byte(s) of line noise", consumed - 2);
                }
                return Ok(());
            }
            prev = byte[0];
        }
    }
}

impl<T: Transport> ByteRangeReader for GetBytesClient<T> {
    fn name(&self) -> &str {
        "getbytes"
    }

    fn read_region(&mut self, start: u32, length: u32) -> flashlogs_core::Result<Vec<u8>> {
        self.read_region_with_progress(start, length, &mut NoProgress)
    }

    fn read_region_with_progress(
        &mut self,
        start: u32,
        length: u32,
        progress: &mut dyn ReadProgress,
    ) -> flashlogs_core::Result<Vec<u8>> {
        if start.checked_add(length).is_none() {
            return Err(flashlogs_core::ReadError::OutOfRange { start, length });
        }
        self.get_flash_region(start, length, progress)
            .map_err(Into::into)
    }
}
