//! High-level Modbus client implementations
//!
//! This module provides the master-side façades that drive one request and
//! one response per call.
//!
//! # Architecture
//!
//! Modbus TCP/UDP and RTU share the same application layer (PDU), differing
//! only in how the PDU is wrapped on the wire:
//! - **IP**: MBAP Header + PDU
//! - **RTU**: Unit ID + PDU + CRC
//!
//! [`GenericModbusClient`] implements the request flow once and takes the
//! wrapping from a [`FrameCodec`]:
//!
//! ```text
//! limits check → PDU body → codec.frame → transport.send
//!              → transport.receive → codec.validate → payload or raw frame
//! ```
//!
//! # API Naming Convention
//!
//! This library provides a **dual-track API**:
//!
//! | Function Code | Primary Name | Semantic Alias |
//! |---------------|--------------|----------------|
//! | 0x03 | `read_03()` | `read_holding_registers()` |
//! | 0x04 | `read_04()` | `read_input_registers()` |
//! | 0x10 | `write_10()` | `write_multiple_registers()` |
//!
//! Every operation returns the complete response frame, or with
//! `registers_only` set, the bytes after the function code with the envelope
//! stripped (for reads this starts with the byte-count field).
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use modbus_master::{ModbusClient, ModbusIpClient, ModbusResult, TcpTransport};
//! use std::time::Duration;
//!
//! fn main() -> ModbusResult<()> {
//!     let transport = TcpTransport::connect("127.0.0.1:502", Duration::from_secs(5))?;
//!     let mut client = ModbusIpClient::from_transport(transport);
//!
//!     // Read 10 holding registers from unit 1, starting at address 0
//!     let data = client.read_03(1, 0, 10, true)?;
//!     println!("Byte count {} followed by {:02X?}", data[0], &data[1..]);
//!     Ok(())
//! }
//! ```

use bytes::Bytes;
use tracing::debug;

use crate::bytes::RegisterPayload;
use crate::device_limits::DeviceLimits;
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{FrameCodec, IpCodec, RtuCodec, ValidatedResponse};
use crate::pdu::{build_read_command_body, build_write_multiple_registers_body, ModbusPdu};
use crate::protocol::{ModbusFunction, UnitId};
use crate::transport::ModbusTransport;

/// Trait defining the interface for Modbus master operations.
///
/// Each call is synchronous and performs exactly one send and one receive
/// on the transport, unless a pre-flight check fails first, in which case
/// the transport is not touched.
///
/// # Implemented By
///
/// - [`ModbusIpClient`] - Modbus TCP/UDP client
/// - [`ModbusRtuClient`] - Modbus RTU client
///
/// # Protocol Limits
///
/// | Operation | Max registers |
/// |-----------|---------------|
/// | read | 125 |
/// | write | 123 |
///
/// Exceeding a limit fails with [`ModbusError::MessageSizeExceeded`].
pub trait ModbusClient {
    /// Read holding registers (function code 0x03).
    ///
    /// # Arguments
    ///
    /// * `unit_id` - Device address
    /// * `start_address` - First register address
    /// * `count` - Number of registers to read (1..=125)
    /// * `registers_only` - Strip the envelope from the returned bytes
    ///
    /// With `registers_only` the result starts at the byte-count field on
    /// both IP and RTU: `[byte_count, data...]`. Use
    /// [`ValidatedResponse::register_data`](crate::ValidatedResponse::register_data)
    /// or skip the first byte to get the register bytes alone.
    fn read_03(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        registers_only: bool,
    ) -> ModbusResult<Bytes>;

    /// Read input registers (function code 0x04).
    ///
    /// Same arguments as [`Self::read_03`].
    fn read_04(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        registers_only: bool,
    ) -> ModbusResult<Bytes>;

    /// Write multiple registers (function code 0x10).
    ///
    /// # Arguments
    ///
    /// * `unit_id` - Device address
    /// * `start_address` - First register address
    /// * `count` - Number of registers to write (1..=123), must equal `payload.len()`
    /// * `payload` - Values to write
    /// * `registers_only` - Return only the echoed address and quantity
    fn write_10(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        payload: &RegisterPayload,
        registers_only: bool,
    ) -> ModbusResult<Bytes>;

    // ========================================================================
    // Semantic aliases
    // ========================================================================

    /// Alias for [`Self::read_03`]
    fn read_holding_registers(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        registers_only: bool,
    ) -> ModbusResult<Bytes> {
        self.read_03(unit_id, start_address, count, registers_only)
    }

    /// Alias for [`Self::read_04`]
    fn read_input_registers(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        registers_only: bool,
    ) -> ModbusResult<Bytes> {
        self.read_04(unit_id, start_address, count, registers_only)
    }

    /// Alias for [`Self::write_10`]
    fn write_multiple_registers(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        payload: &RegisterPayload,
        registers_only: bool,
    ) -> ModbusResult<Bytes> {
        self.write_10(unit_id, start_address, count, payload, registers_only)
    }
}

/// Generic Modbus client that works with any transport and either codec.
///
/// The transport may be owned or borrowed (`&mut T`); several clients can
/// take turns on one transport as long as calls do not interleave.
pub struct GenericModbusClient<T: ModbusTransport, C: FrameCodec> {
    transport: T,
    codec: C,
    limits: DeviceLimits,
}

/// Modbus TCP/UDP client (MBAP framing)
pub type ModbusIpClient<T> = GenericModbusClient<T, IpCodec>;

/// Modbus RTU client (CRC framing)
pub type ModbusRtuClient<T> = GenericModbusClient<T, RtuCodec>;

impl<T: ModbusTransport, C: FrameCodec> GenericModbusClient<T, C> {
    /// Create a client from a transport and a codec
    pub fn new(transport: T, codec: C) -> Self {
        Self {
            transport,
            codec,
            limits: DeviceLimits::default(),
        }
    }

    /// Replace the device limits used for pre-flight checks
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Device limits in effect
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Get a reference to the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Frame `body`, exchange it and validate the answer.
    pub fn execute_request(
        &mut self,
        unit_id: UnitId,
        body: &ModbusPdu,
    ) -> ModbusResult<ValidatedResponse> {
        let request = self.codec.frame(body.as_slice(), unit_id)?;

        let sent = self.transport.send(&request)?;
        if sent != request.len() {
            return Err(ModbusError::connection(format!(
                "transport sent {} of {} bytes",
                sent,
                request.len()
            )));
        }

        let response = self.transport.receive(self.codec.max_adu())?;
        self.codec.validate(&request, Bytes::from(response))
    }

    fn read(
        &mut self,
        function: ModbusFunction,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        registers_only: bool,
    ) -> ModbusResult<Bytes> {
        debug!(
            "[MODBUS-{}] {} unit={} address={} count={}",
            C::PROTOCOL,
            function,
            unit_id,
            start_address,
            count
        );
        self.limits.check_read(count)?;
        let body = build_read_command_body(function.to_u8(), start_address, count)?;
        let response = self.execute_request(unit_id, &body)?;
        Ok(extract(response, registers_only))
    }
}

fn extract(response: ValidatedResponse, registers_only: bool) -> Bytes {
    if registers_only {
        response.payload()
    } else {
        response.into_raw()
    }
}

impl<T: ModbusTransport> ModbusIpClient<T> {
    /// IP client with random transaction ids
    pub fn from_transport(transport: T) -> Self {
        Self::new(transport, IpCodec::new())
    }
}

impl<T: ModbusTransport> ModbusRtuClient<T> {
    /// RTU client
    pub fn from_transport(transport: T) -> Self {
        Self::new(transport, RtuCodec::new())
    }
}

impl<T: ModbusTransport, C: FrameCodec> ModbusClient for GenericModbusClient<T, C> {
    fn read_03(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        registers_only: bool,
    ) -> ModbusResult<Bytes> {
        self.read(
            ModbusFunction::ReadHoldingRegisters,
            unit_id,
            start_address,
            count,
            registers_only,
        )
    }

    fn read_04(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        registers_only: bool,
    ) -> ModbusResult<Bytes> {
        self.read(
            ModbusFunction::ReadInputRegisters,
            unit_id,
            start_address,
            count,
            registers_only,
        )
    }

    fn write_10(
        &mut self,
        unit_id: UnitId,
        start_address: u16,
        count: u16,
        payload: &RegisterPayload,
        registers_only: bool,
    ) -> ModbusResult<Bytes> {
        debug!(
            "[MODBUS-{}] {} unit={} address={} count={} order={}",
            C::PROTOCOL,
            ModbusFunction::WriteMultipleRegisters,
            unit_id,
            start_address,
            count,
            payload.order()
        );
        self.limits.check_write(count)?;
        let body = build_write_multiple_registers_body(start_address, count, payload)?;
        let response = self.execute_request(unit_id, &body)?;
        Ok(extract(response, registers_only))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes::ByteOrder;
    use crate::crc::crc16;
    use crate::frame::SequentialTransactionIds;
    use std::collections::VecDeque;

    /// Records sent frames and replays canned responses
    #[derive(Default)]
    struct MockTransport {
        sent: Vec<Vec<u8>>,
        responses: VecDeque<Vec<u8>>,
        max_bytes: Vec<usize>,
    }

    impl MockTransport {
        fn replying(responses: impl IntoIterator<Item = Vec<u8>>) -> Self {
            Self {
                responses: responses.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl ModbusTransport for MockTransport {
        fn send(&mut self, data: &[u8]) -> ModbusResult<usize> {
            self.sent.push(data.to_vec());
            Ok(data.len())
        }

        fn receive(&mut self, max_bytes: usize) -> ModbusResult<Vec<u8>> {
            self.max_bytes.push(max_bytes);
            Ok(self.responses.pop_front().unwrap_or_default())
        }
    }

    fn with_crc(bytes: &[u8]) -> Vec<u8> {
        let mut frame = bytes.to_vec();
        frame.extend_from_slice(&crc16(bytes).to_be_bytes());
        frame
    }

    #[test]
    fn test_rtu_read_input_registers() {
        let transport = MockTransport::replying([with_crc(&[0x01, 0x04, 0x02, 0xFF, 0xFF])]);
        let mut client = ModbusRtuClient::from_transport(transport);

        let data = client.read_input_registers(1, 0, 1, true).unwrap();
        assert_eq!(data.as_ref(), &[0x02, 0xFF, 0xFF]);

        let transport = client.into_inner();
        assert_eq!(
            transport.sent,
            vec![vec![0x01, 0x04, 0x00, 0x00, 0x00, 0x01, 0x31, 0xCA]]
        );
        assert_eq!(transport.max_bytes, vec![256]);
    }

    #[test]
    fn test_rtu_write_frame_on_the_wire() {
        let transport = MockTransport::replying([vec![
            0x2A, 0x10, 0x00, 0x01, 0x00, 0x02, 0x16, 0x13,
        ]]);
        let mut client = ModbusRtuClient::from_transport(transport);
        let payload = RegisterPayload::new(ByteOrder::LittleEndian, vec![0x000a, 0x0102]);

        let raw = client
            .write_multiple_registers(0x2A, 0x0001, 2, &payload, false)
            .unwrap();
        assert_eq!(raw.as_ref(), &[0x2A, 0x10, 0x00, 0x01, 0x00, 0x02, 0x16, 0x13]);
        assert_eq!(
            client.transport().sent[0],
            vec![0x2A, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0a, 0x01, 0x02, 0x1C, 0xD4]
        );
    }

    #[test]
    fn test_ip_read_holding_registers() {
        let transport = MockTransport::replying([vec![
            0x00, 0x07, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x12, 0x34,
        ]]);
        let codec = IpCodec::with_id_source(SequentialTransactionIds::starting_at(7));
        let mut client = GenericModbusClient::new(transport, codec);

        let data = client.read_holding_registers(1, 0x0010, 1, true).unwrap();
        assert_eq!(data.as_ref(), &[0x02, 0x12, 0x34]);
        assert_eq!(
            client.transport().sent[0],
            vec![0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x10, 0x00, 0x01]
        );
        assert_eq!(client.transport().max_bytes, vec![260]);
    }

    #[test]
    fn test_limits_checked_before_io() {
        let mut client = ModbusRtuClient::from_transport(MockTransport::default())
            .with_limits(DeviceLimits::new().with_max_read_registers(10));

        assert!(matches!(
            client.read_03(1, 0, 11, false),
            Err(ModbusError::MessageSizeExceeded {
                requested: 11,
                max: 10
            })
        ));
        assert!(matches!(
            client.read_04(1, 0, 0, false),
            Err(ModbusError::InvalidData { .. })
        ));
        let payload = RegisterPayload::from_values(vec![1, 2]);
        assert!(matches!(
            client.write_10(1, 0, 3, &payload, false),
            Err(ModbusError::InvalidData { .. })
        ));
        assert!(client.transport().sent.is_empty());
        assert!(client.transport().max_bytes.is_empty());
    }

    #[test]
    fn test_timeout_surfaces_as_empty_response() {
        let mut client = ModbusRtuClient::from_transport(MockTransport::default());
        assert!(matches!(
            client.read_03(1, 0, 1, false),
            Err(ModbusError::EmptyResponse)
        ));
        assert_eq!(client.transport().sent.len(), 1);
    }

    #[test]
    fn test_borrowed_transport_shared_sequentially() {
        let mut transport = MockTransport::replying([
            with_crc(&[0x01, 0x03, 0x02, 0x00, 0x01]),
            with_crc(&[0x02, 0x03, 0x02, 0x00, 0x02]),
        ]);

        {
            let mut first = ModbusRtuClient::from_transport(&mut transport);
            assert!(first.read_03(1, 0, 1, true).is_ok());
        }
        {
            let mut second = ModbusRtuClient::from_transport(&mut transport);
            assert!(second.read_03(2, 0, 1, true).is_ok());
        }
        assert_eq!(transport.sent.len(), 2);
    }
}
