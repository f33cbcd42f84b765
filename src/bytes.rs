//! # Byte Order Handling for Modbus Registers
//!
//! Modbus carries every 16-bit register big-endian on the wire. Callers
//! writing registers may hold their values in either order; [`RegisterPayload`]
//! records which one and normalises to the wire layout.
//!
//! ## Naming Convention
//!
//! For register value `0x1234`:
//! - `LittleEndian`: the value is a plain host number, sent as \[0x12, 0x34\]
//! - `BigEndian`: the value already holds the wire bytes in memory order
//!   (first wire byte in the low byte), so `0x3412` is sent as \[0x12, 0x34\]

use std::fmt;

use crate::error::{ModbusError, ModbusResult};

/// Order in which caller-supplied register values are stored.
///
/// # Example
///
/// ```rust
/// use modbus_master::ByteOrder;
///
/// let order = ByteOrder::from_str("BE").unwrap();
/// assert_eq!(order, ByteOrder::BigEndian);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Values already hold the big-endian wire bytes in memory order.
    BigEndian,

    /// Values are logical host-order numbers.
    LittleEndian,
}

impl ByteOrder {
    /// Convert from common string formats.
    ///
    /// - "AB", "BE", "BIG_ENDIAN" → BigEndian
    /// - "BA", "LE", "LITTLE_ENDIAN" → LittleEndian
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "AB" | "BE" | "BIGENDIAN" => Some(Self::BigEndian),
            "BA" | "LE" | "LITTLEENDIAN" => Some(Self::LittleEndian),
            _ => None,
        }
    }

    /// Get descriptive name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "AB (Big-Endian)",
            Self::LittleEndian => "BA (Little-Endian)",
        }
    }

    /// Wire bytes of one register value stored in this order.
    #[inline]
    pub fn to_wire(self, value: u16) -> [u8; 2] {
        match self {
            Self::LittleEndian => value.to_be_bytes(),
            Self::BigEndian => value.to_le_bytes(),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for ByteOrder {
    /// Plain numbers are the common case.
    fn default() -> Self {
        Self::LittleEndian
    }
}

// ============================================================================
// 16-bit split / join
// ============================================================================

/// Most significant byte of a 16-bit value.
#[inline]
pub const fn high_byte(value: u16) -> u8 {
    (value >> 8) as u8
}

/// Least significant byte of a 16-bit value.
#[inline]
pub const fn low_byte(value: u16) -> u8 {
    (value & 0xFF) as u8
}

/// Join a big-endian byte pair.
#[inline]
pub const fn join_be(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

/// Decode big-endian register data (as returned by a read) into values.
///
/// Fails if `data` has an odd length.
pub fn registers_from_wire(data: &[u8]) -> ModbusResult<Vec<u16>> {
    if data.len() % 2 != 0 {
        return Err(ModbusError::invalid_data(format!(
            "register data must have an even length, got {} bytes",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| join_be(pair[0], pair[1]))
        .collect())
}

// ============================================================================
// Outgoing register values
// ============================================================================

/// Register values for a write request, tagged with their byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPayload {
    order: ByteOrder,
    values: Vec<u16>,
}

impl RegisterPayload {
    /// Create a payload from values stored in `order`.
    pub fn new(order: ByteOrder, values: impl Into<Vec<u16>>) -> Self {
        Self {
            order,
            values: values.into(),
        }
    }

    /// Payload of logical host-order values.
    pub fn from_values(values: impl Into<Vec<u16>>) -> Self {
        Self::new(ByteOrder::LittleEndian, values)
    }

    /// Byte order the values are stored in
    #[inline]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Values as supplied
    #[inline]
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Number of registers
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Big-endian wire bytes; always `2 * len()` long.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.values.len() * 2);
        self.write_wire_bytes(&mut out);
        out
    }

    /// Append the wire bytes to `out`.
    pub fn write_wire_bytes(&self, out: &mut Vec<u8>) {
        for &value in &self.values {
            out.extend_from_slice(&self.order.to_wire(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_valid() {
        assert_eq!(ByteOrder::from_str("BE"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_str("big_endian"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_str("ab"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_str("LE"), Some(ByteOrder::LittleEndian));
        assert_eq!(
            ByteOrder::from_str("Little-Endian"),
            Some(ByteOrder::LittleEndian)
        );
    }

    #[test]
    fn test_from_str_invalid() {
        assert_eq!(ByteOrder::from_str("ABCD"), None);
        assert_eq!(ByteOrder::from_str(""), None);
    }

    #[test]
    fn test_default() {
        assert_eq!(ByteOrder::default(), ByteOrder::LittleEndian);
    }

    #[test]
    fn test_split_join() {
        assert_eq!(high_byte(0x9C44), 0x9C);
        assert_eq!(low_byte(0x9C44), 0x44);
        assert_eq!(join_be(0x9C, 0x44), 0x9C44);
    }

    #[test]
    fn test_both_orders_normalise_to_same_wire_bytes() {
        let le = RegisterPayload::new(ByteOrder::LittleEndian, vec![0xff00, 0x4224]);
        let be = RegisterPayload::new(ByteOrder::BigEndian, vec![0x00ff, 0x2442]);

        assert_eq!(le.to_wire_bytes(), vec![0xff, 0x00, 0x42, 0x24]);
        assert_eq!(be.to_wire_bytes(), le.to_wire_bytes());
    }

    #[test]
    fn test_little_endian_values() {
        let payload = RegisterPayload::from_values([0x000a, 0x0102]);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.to_wire_bytes(), vec![0x00, 0x0a, 0x01, 0x02]);
    }

    #[test]
    fn test_empty_payload() {
        let payload = RegisterPayload::new(ByteOrder::BigEndian, Vec::new());
        assert!(payload.is_empty());
        assert!(payload.to_wire_bytes().is_empty());
    }

    #[test]
    fn test_registers_from_wire() {
        assert_eq!(
            registers_from_wire(&[0x00, 0x0a, 0x01, 0x02]).unwrap(),
            vec![0x000a, 0x0102]
        );
        assert!(registers_from_wire(&[0x01]).is_err());
    }
}
