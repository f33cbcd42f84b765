//! Utility functions for frame diagnostics

/// Format raw bytes as a space separated, upper-case hex string.
///
/// ```rust
/// use modbus_master::utils::format_hex;
///
/// assert_eq!(format_hex(&[0x2A, 0x03, 0x9C]), "2A 03 9C");
/// ```
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(" ")
}
