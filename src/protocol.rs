//! Modbus function codes and exception categories
//!
//! Only the register functions a master needs are modelled: reading holding
//! registers, reading input registers and writing multiple registers.

use std::fmt;

use crate::constants::{
    EXCEPTION_ACKNOWLEDGE, EXCEPTION_GATEWAY_PATH_UNAVAILABLE, EXCEPTION_GATEWAY_TARGET_FAILED,
    EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE, EXCEPTION_ILLEGAL_FUNCTION,
    EXCEPTION_MEMORY_PARITY_ERROR, EXCEPTION_SERVER_DEVICE_BUSY, EXCEPTION_SERVER_DEVICE_FAILURE,
    FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS, FC_WRITE_MULTIPLE_REGISTERS,
};
use crate::error::{ModbusError, ModbusResult};

/// Unit identifier (slave address on RTU, gateway routing id on IP)
pub type UnitId = u8;

/// Supported Modbus function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusFunction {
    /// Read Holding Registers (0x03)
    ReadHoldingRegisters = FC_READ_HOLDING_REGISTERS,
    /// Read Input Registers (0x04)
    ReadInputRegisters = FC_READ_INPUT_REGISTERS,
    /// Write Multiple Registers (0x10)
    WriteMultipleRegisters = FC_WRITE_MULTIPLE_REGISTERS,
}

impl ModbusFunction {
    /// Parse a raw function code.
    pub fn from_u8(code: u8) -> ModbusResult<Self> {
        match code {
            FC_READ_HOLDING_REGISTERS => Ok(Self::ReadHoldingRegisters),
            FC_READ_INPUT_REGISTERS => Ok(Self::ReadInputRegisters),
            FC_WRITE_MULTIPLE_REGISTERS => Ok(Self::WriteMultipleRegisters),
            _ => Err(ModbusError::invalid_function(code)),
        }
    }

    /// Raw function code.
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Read functions carry a byte-count field in their response.
    #[inline]
    pub fn is_read(self) -> bool {
        matches!(self, Self::ReadHoldingRegisters | Self::ReadInputRegisters)
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.to_u8())
    }
}

impl TryFrom<u8> for ModbusFunction {
    type Error = ModbusError;

    fn try_from(code: u8) -> ModbusResult<Self> {
        Self::from_u8(code)
    }
}

/// Category of a device-reported exception code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusException {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    /// Any code outside the standard table
    Unknown,
}

impl ModbusException {
    /// Map a raw exception code to its category.
    pub fn from_u8(code: u8) -> Self {
        match code {
            EXCEPTION_ILLEGAL_FUNCTION => Self::IllegalFunction,
            EXCEPTION_ILLEGAL_DATA_ADDRESS => Self::IllegalDataAddress,
            EXCEPTION_ILLEGAL_DATA_VALUE => Self::IllegalDataValue,
            EXCEPTION_SERVER_DEVICE_FAILURE => Self::ServerDeviceFailure,
            EXCEPTION_ACKNOWLEDGE => Self::Acknowledge,
            EXCEPTION_SERVER_DEVICE_BUSY => Self::ServerDeviceBusy,
            EXCEPTION_MEMORY_PARITY_ERROR => Self::MemoryParityError,
            EXCEPTION_GATEWAY_PATH_UNAVAILABLE => Self::GatewayPathUnavailable,
            EXCEPTION_GATEWAY_TARGET_FAILED => Self::GatewayTargetFailedToRespond,
            _ => Self::Unknown,
        }
    }

    /// Description as printed in device manuals.
    pub fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "ILLEGAL FUNCTION",
            Self::IllegalDataAddress => "ILLEGAL DATA ADDRESS",
            Self::IllegalDataValue => "ILLEGAL DATA VALUE",
            Self::ServerDeviceFailure => "SERVER DEVICE FAILURE",
            Self::Acknowledge => "ACKNOWLEDGE",
            Self::ServerDeviceBusy => "SERVER DEVICE BUSY",
            Self::MemoryParityError => "MEMORY PARITY ERROR",
            Self::GatewayPathUnavailable => "GATEWAY PATH UNAVAILABLE",
            Self::GatewayTargetFailedToRespond => "GATEWAY TARGET DEVICE FAILED TO RESPOND",
            Self::Unknown => "UNKNOWN ERROR",
        }
    }

    /// The device is alive but temporarily unable to serve the request.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Acknowledge | Self::ServerDeviceBusy | Self::GatewayTargetFailedToRespond
        )
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
