//! # Modbus Master - Strictly Validating Modbus Client Library
//!
//! A master-side Modbus implementation for TCP/UDP (MBAP framing) and RTU
//! (CRC-16 framing). Every response is checked against the request that
//! produced it before any data is handed back.
//!
//! ## Features
//!
//! - **Bit-exact framing**: MBAP header with dynamic length field, RTU frames with table-driven CRC-16
//! - **Transaction matching**: transaction id, protocol id, unit id, function code and write echo
//! - **Typed errors**: device exceptions are distinguishable from corrupted or lost traffic
//! - **Pre-flight limits**: oversized requests are refused before any I/O
//! - **Pluggable transports**: blocking TCP and UDP sockets included, any byte pipe works
//!
//! ## Supported Function Codes
//!
//! | Code | Function | IP | RTU |
//! |------|----------|----|-----|
//! | 0x03 | Read Holding Registers | ✅ | ✅ |
//! | 0x04 | Read Input Registers | ✅ | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ | ✅ |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modbus_master::{ByteOrder, ModbusClient, ModbusIpClient, ModbusResult, RegisterPayload, TcpTransport};
//! use std::time::Duration;
//!
//! fn main() -> ModbusResult<()> {
//!     let transport = TcpTransport::connect("127.0.0.1:502", Duration::from_secs(5))?;
//!     let mut client = ModbusIpClient::from_transport(transport);
//!
//!     // Full response frame
//!     let frame = client.read_holding_registers(1, 0, 10, false)?;
//!     println!("Response: {:02X?}", frame);
//!
//!     // Write two registers
//!     let payload = RegisterPayload::new(ByteOrder::LittleEndian, vec![0x000A, 0x0102]);
//!     client.write_multiple_registers(1, 100, 2, &payload, true)?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants based on official specification
pub mod constants;

/// Stack-allocated PDU and request body builders
pub mod pdu;

/// Function codes and exception categories
pub mod protocol;

/// CRC-16/MODBUS for RTU frames
pub mod crc;

/// MBAP and RTU framing plus response validation
pub mod frame;

/// Byte transports for TCP and UDP
pub mod transport;

/// Modbus client implementations
pub mod client;

/// Utility functions
pub mod utils;

/// Byte order handling for register values
pub mod bytes;

/// Device-specific protocol limits configuration
pub mod device_limits;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Core client API ===
pub use client::{GenericModbusClient, ModbusClient, ModbusIpClient, ModbusRtuClient};

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use crate::bytes::{registers_from_wire, ByteOrder, RegisterPayload};
pub use protocol::{ModbusException, ModbusFunction, UnitId};

// === Framing ===
pub use frame::{
    FrameCodec, IpCodec, RandomTransactionIds, RtuCodec, SequentialTransactionIds, Transaction,
    TransactionIdSource, ValidatedResponse,
};

// === Configuration ===
pub use device_limits::DeviceLimits;

// === Transports ===
pub use transport::{ModbusTransport, TcpTransport, TransportStats, UdpTransport};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    DEFAULT_TCP_PORT, MAX_PDU_SIZE, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS, RTU_MAX_ADU_SIZE,
    TCP_MAX_ADU_SIZE,
};

// === PDU (advanced usage) ===
pub use pdu::{
    build_read_command_body, build_write_multiple_registers_body, ModbusPdu, PduBuilder,
};

pub use crate::crc::crc16;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
