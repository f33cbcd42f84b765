#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modbus_master::{
    build_read_command_body, build_write_multiple_registers_body, ByteOrder, RegisterPayload,
    MAX_PDU_SIZE,
};

#[derive(Debug, Arbitrary)]
enum Op {
    Read { fc: u8, start: u16, count: u16 },
    Write { start: u16, count: u16, big_endian: bool, values: Vec<u16> },
}

fuzz_target!(|op: Op| {
    match op {
        Op::Read { fc, start, count } => {
            if let Ok(pdu) = build_read_command_body(fc, start, count) {
                assert_eq!(pdu.len(), 5);
                assert!(fc == 0x03 || fc == 0x04);
            }
        }
        Op::Write {
            start,
            count,
            big_endian,
            values,
        } => {
            let order = if big_endian {
                ByteOrder::BigEndian
            } else {
                ByteOrder::LittleEndian
            };
            let payload = RegisterPayload::new(order, values);
            assert_eq!(payload.to_wire_bytes().len(), 2 * payload.len());
            if let Ok(pdu) = build_write_multiple_registers_body(start, count, &payload) {
                assert!(pdu.len() <= MAX_PDU_SIZE);
                assert_eq!(pdu.as_slice()[5] as usize, 2 * count as usize);
            }
        }
    }
});
