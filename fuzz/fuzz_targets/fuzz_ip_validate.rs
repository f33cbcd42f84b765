#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use modbus_master::{
    build_read_command_body, FrameCodec, IpCodec, SequentialTransactionIds,
};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let count = u16::from(data[0] % 125) + 1;
    let mut codec = IpCodec::with_id_source(SequentialTransactionIds::starting_at(0));
    let Ok(body) = build_read_command_body(0x03, 0, count) else {
        return;
    };
    let Ok(request) = codec.frame(body.as_slice(), data[1]) else {
        return;
    };

    if let Ok(validated) = codec.validate(&request, Bytes::copy_from_slice(&data[2..])) {
        let raw = validated.raw();
        assert_eq!(&raw[..2], &request[..2]);
        assert_eq!(usize::from(u16::from_be_bytes([raw[4], raw[5]])), raw.len() - 6);
        assert_eq!(validated.payload_len(), 1 + 2 * count as usize);
    }
});
