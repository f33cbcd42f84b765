#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use modbus_master::{build_read_command_body, FrameCodec, ModbusError, RtuCodec};

#[derive(Debug, Arbitrary)]
struct Input {
    unit_id: u8,
    input_registers: bool,
    start: u16,
    count: u8,
    response: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let fc = if input.input_registers { 0x04 } else { 0x03 };
    let count = u16::from(input.count % 125) + 1;
    let mut codec = RtuCodec::new();
    let Ok(body) = build_read_command_body(fc, input.start, count) else {
        return;
    };
    let Ok(request) = codec.frame(body.as_slice(), input.unit_id) else {
        return;
    };

    match codec.validate(&request, Bytes::from(input.response)) {
        Ok(validated) => {
            // a frame that passes carries exactly the requested register data
            assert_eq!(validated.payload_len(), 1 + 2 * count as usize);
            assert_eq!(validated.raw()[0], input.unit_id);
        }
        Err(ModbusError::ShouldNeverHappen { .. })
        | Err(ModbusError::EmptyResponse)
        | Err(ModbusError::ChecksumError { .. })
        | Err(ModbusError::UnmatchedResponse { .. })
        | Err(ModbusError::ExceptionResponse { .. })
        | Err(ModbusError::MalformedResponse { .. }) => {}
        Err(other) => panic!("unexpected validation error: {other}"),
    }
});
