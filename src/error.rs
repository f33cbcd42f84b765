//! Error types for Modbus master operations
//!
//! Every failure of a read/write operation surfaces as one [`ModbusError`]
//! variant. Nothing is retried inside the library; the helpers at the bottom
//! of this module let callers decide how to recover.
//!
//! | Variant | Meaning | Retrying helps? |
//! |---------|---------|-----------------|
//! | `MessageSizeExceeded` | request refused before any I/O | no |
//! | `EmptyResponse` | nothing came back (usually a timeout) | yes |
//! | `UnmatchedResponse` | response belongs to another transaction | yes |
//! | `ChecksumError` | RTU frame corrupted on the line | yes |
//! | `ExceptionResponse` | the device rejected the request | no |
//! | `MalformedResponse` / `ShouldNeverHappen` | device or transport bug | no |

use std::io;

use thiserror::Error;

use crate::protocol::ModbusException;

/// Result type for Modbus operations
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors produced while building, exchanging or validating Modbus frames.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// The caller asked for more registers than the protocol or device allows.
    #[error("Message size exceeded: {requested} registers requested, at most {max} allowed")]
    MessageSizeExceeded {
        /// Number of registers requested
        requested: u16,
        /// Limit in effect
        max: u16,
    },

    /// The transport delivered zero bytes.
    #[error("Empty response, maybe a timeout while reading from the device")]
    EmptyResponse,

    /// A correlation field differs between request and response.
    #[error("Unmatched response: {field} expected {expected:#06x}, got {actual:#06x}")]
    UnmatchedResponse {
        /// Name of the mismatching field
        field: &'static str,
        /// Value sent in the request
        expected: u16,
        /// Value found in the response
        actual: u16,
    },

    /// RTU CRC-16 mismatch.
    #[error("Checksum error: calculated {expected:#06x}, received {actual:#06x}")]
    ChecksumError {
        /// CRC computed over the received frame
        expected: u16,
        /// CRC carried in the frame trailer
        actual: u16,
    },

    /// The device answered with a Modbus exception.
    #[error("Modbus exception for function {function_code:#04x}: code {code:#04x} ({exception})")]
    ExceptionResponse {
        /// Function code of the request (without the exception flag)
        function_code: u8,
        /// Raw exception code
        code: u8,
        /// Decoded exception category
        exception: ModbusException,
    },

    /// The response is structurally invalid.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        /// Description
        message: String,
    },

    /// An invariant that the transport must uphold was violated.
    #[error("Should never happen: {message}")]
    ShouldNeverHappen {
        /// Description
        message: String,
    },

    /// Inconsistent arguments supplied by the caller.
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Description
        message: String,
    },

    /// Function code outside the supported set.
    #[error("Invalid function code: {code:#04x}")]
    InvalidFunction {
        /// Offending code
        code: u8,
    },

    /// Connection could not be established or was lost.
    #[error("Connection error: {message}")]
    Connection {
        /// Description
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description
        message: String,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ModbusError {
    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid function error
    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    /// Create an unmatched response error
    pub fn unmatched(field: &'static str, expected: u16, actual: u16) -> Self {
        Self::UnmatchedResponse {
            field,
            expected,
            actual,
        }
    }

    /// Create an exception response error from the raw exception code
    pub fn exception(function_code: u8, code: u8) -> Self {
        Self::ExceptionResponse {
            function_code,
            code,
            exception: ModbusException::from_u8(code),
        }
    }

    /// Raw exception code if the device reported one.
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            Self::ExceptionResponse { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The remote device explicitly rejected the request.
    pub fn is_device_exception(&self) -> bool {
        matches!(self, Self::ExceptionResponse { .. })
    }

    /// The exchange was lost or corrupted between master and device.
    pub fn is_communication_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse
                | Self::UnmatchedResponse { .. }
                | Self::ChecksumError { .. }
                | Self::Connection { .. }
                | Self::Io(_)
        )
    }

    /// Repeating the same request may succeed.
    ///
    /// Device exceptions are only recoverable when the device signalled a
    /// transient state (acknowledge, busy, gateway target silent).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ExceptionResponse { exception, .. } => exception.is_transient(),
            other => other.is_communication_error(),
        }
    }
}
