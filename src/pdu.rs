//! Modbus PDU data structure and request body builders
//!
//! Use a fixed-size stack array to avoid heap allocation while assembling
//! request bodies. A body is function code + data, independent of transport.

use tracing::debug;

use crate::bytes::{high_byte, low_byte, RegisterPayload};
use crate::constants::{MAX_PDU_SIZE, MAX_WRITE_REGISTERS};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::ModbusFunction;

/// PDU with stack-allocated fixed array
#[derive(Debug, Clone)]
pub struct ModbusPdu {
    /// Fixed-size buffer (stack)
    data: [u8; MAX_PDU_SIZE],
    /// Actual data length
    len: usize,
}

impl ModbusPdu {
    /// Create an empty PDU
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PDU_SIZE],
            len: 0,
        }
    }

    /// Create a PDU from a byte slice
    pub fn from_slice(data: &[u8]) -> ModbusResult<Self> {
        if data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::invalid_data(format!(
                "PDU too large: {} bytes (max {})",
                data.len(),
                MAX_PDU_SIZE
            )));
        }

        let mut pdu = Self::new();
        pdu.data[..data.len()].copy_from_slice(data);
        pdu.len = data.len();
        Ok(pdu)
    }

    /// Push a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> ModbusResult<()> {
        if self.len >= MAX_PDU_SIZE {
            return Err(ModbusError::invalid_data("PDU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push u16 in big-endian
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> ModbusResult<()> {
        self.extend(&[high_byte(value), low_byte(value)])
    }

    /// Extend with a byte slice
    #[inline]
    pub fn extend(&mut self, data: &[u8]) -> ModbusResult<()> {
        if self.len + data.len() > MAX_PDU_SIZE {
            return Err(ModbusError::invalid_data(format!(
                "PDU would exceed max size: {} + {} > {}",
                self.len,
                data.len(),
                MAX_PDU_SIZE
            )));
        }
        self.data[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    /// Get immutable data slice
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Get current length
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get function code (first byte)
    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        if self.len > 0 {
            Some(self.data[0])
        } else {
            None
        }
    }

}

impl Default for ModbusPdu {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for ModbusPdu {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// PDU builder - fluent API
pub struct PduBuilder {
    pdu: ModbusPdu,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    /// Create a new builder
    #[inline]
    pub fn new() -> Self {
        Self {
            pdu: ModbusPdu::new(),
        }
    }

    /// Set function code
    #[inline]
    pub fn function(mut self, function: ModbusFunction) -> ModbusResult<Self> {
        self.pdu.push(function.to_u8())?;
        Ok(self)
    }

    /// Add address
    #[inline]
    pub fn address(mut self, addr: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(addr)?;
        Ok(self)
    }

    /// Add quantity
    #[inline]
    pub fn quantity(mut self, qty: u16) -> ModbusResult<Self> {
        self.pdu.push_u16(qty)?;
        Ok(self)
    }

    /// Add a byte
    #[inline]
    pub fn byte(mut self, b: u8) -> ModbusResult<Self> {
        self.pdu.push(b)?;
        Ok(self)
    }

    /// Add data
    #[inline]
    pub fn data(mut self, data: &[u8]) -> ModbusResult<Self> {
        self.pdu.extend(data)?;
        Ok(self)
    }

    /// Build the PDU
    #[inline]
    pub fn build(self) -> ModbusPdu {
        match self
            .pdu
            .function_code()
            .and_then(|fc| ModbusFunction::from_u8(fc).ok())
        {
            Some(function) => debug!("PDU built: {}, total_len={}", function, self.pdu.len()),
            None => debug!("PDU built: len={}", self.pdu.len()),
        }
        self.pdu
    }
}

/// Body of a register read: `[fc, addr_hi, addr_lo, count_hi, count_lo]`.
///
/// Only the read functions (0x03 and 0x04) are accepted.
pub fn build_read_command_body(
    function_code: u8,
    start_address: u16,
    count: u16,
) -> ModbusResult<ModbusPdu> {
    let function = ModbusFunction::from_u8(function_code)?;
    if !function.is_read() {
        return Err(ModbusError::invalid_function(function_code));
    }
    Ok(PduBuilder::new()
        .function(function)?
        .address(start_address)?
        .quantity(count)?
        .build())
}

/// Body of a Write Multiple Registers request:
/// `[0x10, addr_hi, addr_lo, count_hi, count_lo, byte_count, data...]`.
///
/// `count` must equal the number of registers in `payload` and lie in
/// 1..=123.
pub fn build_write_multiple_registers_body(
    start_address: u16,
    count: u16,
    payload: &RegisterPayload,
) -> ModbusResult<ModbusPdu> {
    if count == 0 {
        return Err(ModbusError::invalid_data(
            "write register count must be at least 1",
        ));
    }
    if count > MAX_WRITE_REGISTERS {
        return Err(ModbusError::MessageSizeExceeded {
            requested: count,
            max: MAX_WRITE_REGISTERS,
        });
    }
    if payload.len() != count as usize {
        return Err(ModbusError::invalid_data(format!(
            "register count {} does not match payload of {} registers",
            count,
            payload.len()
        )));
    }

    // count <= 123 so the byte count fits in one byte
    let byte_count = (count * 2) as u8;
    Ok(PduBuilder::new()
        .function(ModbusFunction::WriteMultipleRegisters)?
        .address(start_address)?
        .quantity(count)?
        .byte(byte_count)?
        .data(&payload.to_wire_bytes())?
        .build())
}
