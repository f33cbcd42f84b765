//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Once;

use modbus_master::{crc16, ModbusError, ModbusResult, ModbusTransport};

/// Captured "get common model" exchange with a BSM-WS36A meter at unit 42.
pub const COMMON_MODEL_REQUEST: &str = "2A039C440042ADA5";
pub const COMMON_MODEL_RESPONSE: &str = "2A0384424155455220456C656374726F6E69630000000000000000000000000000000042534D2D57533336412D4830312D313331312D3030303000000000000000000000000000000000000000000000000000312E393A333243413A414646340000003231303730303139000000000000000000000000000000000000000000000000002A8000C856";

/// Captured "get ac_meter" response body from the same meter, without CRC.
pub const AC_METER_BODY: &str = "2A03D20013001300000000FFFE800008EF000000008000800080008000FFFF01F4FFFF0003000300000000000100040004000000000001FFFEFFFE0000000000018000030700000000FFFF000000000000000000000000000000000000096A00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000800000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000800000000000";

/// Decode a hex string; test fixtures only.
pub fn hex(s: &str) -> Vec<u8> {
    ::hex::decode(s).unwrap()
}

/// Append the RTU CRC trailer.
pub fn with_crc(body: &[u8]) -> Vec<u8> {
    let mut frame = body.to_vec();
    frame.extend_from_slice(&crc16(body).to_be_bytes());
    frame
}

/// Install a test subscriber once so `RUST_LOG=debug` shows frame dumps.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Scripted transport: records every send, replays queued receive results.
#[derive(Default)]
pub struct MockTransport {
    pub sent: Vec<Vec<u8>>,
    pub receive_calls: Vec<usize>,
    responses: VecDeque<ModbusResult<Vec<u8>>>,
    fail_send: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next receive.
    pub fn reply(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.responses.push_back(Ok(bytes.into()));
        self
    }

    /// Queue a transport error for the next receive.
    pub fn reply_err(mut self, err: ModbusError) -> Self {
        self.responses.push_back(Err(err));
        self
    }

    /// Make every send fail.
    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    /// Total number of transport invocations.
    pub fn calls(&self) -> usize {
        self.sent.len() + self.receive_calls.len()
    }
}

impl ModbusTransport for MockTransport {
    fn send(&mut self, data: &[u8]) -> ModbusResult<usize> {
        self.sent.push(data.to_vec());
        if self.fail_send {
            return Err(ModbusError::connection("mock send failure"));
        }
        Ok(data.len())
    }

    fn receive(&mut self, max_bytes: usize) -> ModbusResult<Vec<u8>> {
        self.receive_calls.push(max_bytes);
        // an empty queue behaves like a read timeout
        self.responses.pop_front().unwrap_or(Ok(Vec::new()))
    }
}
