//! # Device Limits Configuration
//!
//! Register counts a device accepts per request. The client checks every
//! call against these limits before any frame is sent.
//!
//! ## Modbus Specification Limits
//!
//! - **Read Holding/Input Registers (FC03/04)**: Max 125 registers per request
//! - **Write Multiple Registers (FC16)**: Max 123 registers per request
//!
//! Some devices accept fewer. Limits above the protocol maximum are clamped.

use crate::constants::{MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};
use crate::error::{ModbusError, ModbusResult};

/// Device-specific register limits.
///
/// # Example
///
/// ```rust
/// use modbus_master::DeviceLimits;
///
/// // A meter that answers at most 50 registers per read
/// let limits = DeviceLimits::new().with_max_read_registers(50);
/// assert_eq!(limits.max_read_registers(), 50);
///
/// // Values beyond the protocol limit are clamped
/// let limits = DeviceLimits::new().with_max_write_registers(500);
/// assert_eq!(limits.max_write_registers(), 123);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    max_read_registers: u16,
    max_write_registers: u16,
}

impl DeviceLimits {
    /// Create new device limits with the protocol maximums.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits for older or less capable devices: 50 registers per read/write.
    pub fn conservative() -> Self {
        Self {
            max_read_registers: 50,
            max_write_registers: 50,
        }
    }

    /// Set maximum read registers, clamped to 125.
    pub fn with_max_read_registers(mut self, count: u16) -> Self {
        self.max_read_registers = count.min(MAX_READ_REGISTERS);
        self
    }

    /// Set maximum write registers, clamped to 123.
    pub fn with_max_write_registers(mut self, count: u16) -> Self {
        self.max_write_registers = count.min(MAX_WRITE_REGISTERS);
        self
    }

    /// Maximum registers per read request
    pub fn max_read_registers(&self) -> u16 {
        self.max_read_registers
    }

    /// Maximum registers per write request
    pub fn max_write_registers(&self) -> u16 {
        self.max_write_registers
    }

    /// Pre-flight check for a read of `count` registers.
    pub fn check_read(&self, count: u16) -> ModbusResult<()> {
        check_count(count, self.max_read_registers)
    }

    /// Pre-flight check for a write of `count` registers.
    pub fn check_write(&self, count: u16) -> ModbusResult<()> {
        check_count(count, self.max_write_registers)
    }
}

fn check_count(count: u16, max: u16) -> ModbusResult<()> {
    if count == 0 {
        return Err(ModbusError::invalid_data("register count must be at least 1"));
    }
    if count > max {
        return Err(ModbusError::MessageSizeExceeded {
            requested: count,
            max,
        });
    }
    Ok(())
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_read_registers: MAX_READ_REGISTERS,
            max_write_registers: MAX_WRITE_REGISTERS,
        }
    }
}
