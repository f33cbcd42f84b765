//! Transport framing and response validation
//!
//! A [`FrameCodec`] wraps a PDU body into a full ADU and checks a received ADU
//! against the request that produced it. Exactly two codecs exist:
//!
//! | Codec | Envelope | Correlation | Integrity |
//! |-------|----------|-------------|-----------|
//! | [`IpCodec`] | MBAP header (7 bytes) | transaction id, protocol id, unit id, function | MBAP length field |
//! | [`RtuCodec`] | unit id + CRC-16 trailer | unit id, function | CRC-16 |
//!
//! Validation runs in a fixed order and stops at the first failure:
//!
//! 1. empty response → [`ModbusError::EmptyResponse`]
//! 2. longer than the max ADU → [`ModbusError::ShouldNeverHappen`]
//! 3. envelope checks (CRC for RTU, MBAP fields for IP)
//! 4. unit id
//! 5. exception flag → [`ModbusError::ExceptionResponse`]
//! 6. function code
//! 7. function specific layout (byte count for reads, echo for writes)

use std::fmt;
use std::ops::Range;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::bytes::join_be;
use crate::constants::{
    EXCEPTION_FLAG, MAX_PDU_SIZE, MBAP_HEADER_LEN, MBAP_LENGTH_OFFSET, MODBUS_PROTOCOL_ID,
    RTU_CRC_LEN, RTU_MAX_ADU_SIZE, TCP_MAX_ADU_SIZE,
};
use crate::crc::crc16;
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{ModbusFunction, UnitId};
use crate::utils::format_hex;

// ============================================================================
// Transaction
// ============================================================================

/// Fields of a request that its response must echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    /// MBAP transaction id, `None` on RTU
    pub transaction_id: Option<u16>,
    pub unit_id: UnitId,
    pub function: ModbusFunction,
    pub start_address: u16,
    pub quantity: u16,
}

impl Transaction {
    /// Parse the correlation fields from a PDU body (function code first).
    fn from_pdu(
        transaction_id: Option<u16>,
        unit_id: UnitId,
        pdu: &[u8],
    ) -> ModbusResult<Self> {
        if pdu.len() < 5 {
            return Err(ModbusError::invalid_data(format!(
                "request PDU too short: {} bytes",
                pdu.len()
            )));
        }
        Ok(Self {
            transaction_id,
            unit_id,
            function: ModbusFunction::from_u8(pdu[0])?,
            start_address: join_be(pdu[1], pdu[2]),
            quantity: join_be(pdu[3], pdu[4]),
        })
    }
}

// ============================================================================
// Validated response
// ============================================================================

/// A received frame that passed validation.
///
/// Holds the raw bytes plus the location of the data that follows the
/// function code, with the envelope (MBAP header or CRC trailer) excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResponse {
    raw: Bytes,
    payload: Range<usize>,
    function: ModbusFunction,
}

impl ValidatedResponse {
    /// Complete frame as received
    #[inline]
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Consume into the complete frame
    #[inline]
    pub fn into_raw(self) -> Bytes {
        self.raw
    }

    /// Data after the function code.
    ///
    /// For reads this starts with the byte-count field, for writes it is the
    /// echoed start address and quantity. Shares storage with [`Self::raw`].
    pub fn payload(&self) -> Bytes {
        self.raw.slice(self.payload.clone())
    }

    /// Length of [`Self::payload`]
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Function the response answers
    #[inline]
    pub fn function(&self) -> ModbusFunction {
        self.function
    }

    /// Register data of a read response, without the byte-count field.
    pub fn register_data(&self) -> Option<&[u8]> {
        if self.function.is_read() {
            self.raw.get(self.payload.start + 1..self.payload.end)
        } else {
            None
        }
    }
}

// ============================================================================
// Transaction id sources
// ============================================================================

/// Supplies MBAP transaction ids.
pub trait TransactionIdSource: Send {
    /// Next id to stamp on a request
    fn next_id(&mut self) -> u16;
}

/// Unpredictable ids from a generator seeded once.
pub struct RandomTransactionIds {
    rng: StdRng,
}

impl RandomTransactionIds {
    /// Seed from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests and simulations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomTransactionIds {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionIdSource for RandomTransactionIds {
    fn next_id(&mut self) -> u16 {
        self.rng.gen()
    }
}

/// Incrementing ids, wrapping at `u16::MAX`.
#[derive(Debug, Clone, Default)]
pub struct SequentialTransactionIds {
    next: u16,
}

impl SequentialTransactionIds {
    /// Start counting at `first`.
    pub fn starting_at(first: u16) -> Self {
        Self { next: first }
    }
}

impl TransactionIdSource for SequentialTransactionIds {
    fn next_id(&mut self) -> u16 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

// ============================================================================
// Codec capability
// ============================================================================

mod private {
    pub trait Sealed {}
}

/// Framing and validation for one transport family.
///
/// Sealed: implemented by [`IpCodec`] and [`RtuCodec`] only.
pub trait FrameCodec: private::Sealed {
    /// Short name used in log records
    const PROTOCOL: &'static str;

    /// Largest frame this transport carries
    fn max_adu(&self) -> usize;

    /// Largest PDU body
    fn max_pdu(&self) -> usize {
        MAX_PDU_SIZE
    }

    /// Wrap a PDU body addressed to `unit_id` into a full frame.
    fn frame(&mut self, body: &[u8], unit_id: UnitId) -> ModbusResult<Vec<u8>>;

    /// Correlation fields of a frame produced by [`Self::frame`].
    fn transaction(&self, request: &[u8]) -> ModbusResult<Transaction>;

    /// Envelope checks; returns the unit id and the PDU location.
    #[doc(hidden)]
    fn open_envelope(
        &self,
        transaction: &Transaction,
        response: &[u8],
    ) -> ModbusResult<(UnitId, Range<usize>)>;

    /// Check `response` against the request frame it answers.
    fn validate(&self, request: &[u8], response: Bytes) -> ModbusResult<ValidatedResponse> {
        let result = self
            .transaction(request)
            .and_then(|transaction| validate_with(self, &transaction, response));
        if let Err(err) = &result {
            warn!("[MODBUS-{}] response rejected: {}", Self::PROTOCOL, err);
        }
        result
    }
}

fn validate_with<C: FrameCodec + ?Sized>(
    codec: &C,
    transaction: &Transaction,
    response: Bytes,
) -> ModbusResult<ValidatedResponse> {
    if response.is_empty() {
        return Err(ModbusError::EmptyResponse);
    }
    if response.len() > codec.max_adu() {
        return Err(ModbusError::ShouldNeverHappen {
            message: format!(
                "response of {} bytes exceeds the {} byte maximum",
                response.len(),
                codec.max_adu()
            ),
        });
    }

    let (unit_id, pdu_range) = codec.open_envelope(transaction, &response)?;
    if unit_id != transaction.unit_id {
        return Err(ModbusError::unmatched(
            "unit id",
            transaction.unit_id as u16,
            unit_id as u16,
        ));
    }

    let pdu = &response[pdu_range.clone()];
    let expected_fc = transaction.function.to_u8();
    let fc = pdu[0];

    if fc & EXCEPTION_FLAG != 0 {
        if pdu.len() < 2 {
            return Err(ModbusError::malformed("exception response without code"));
        }
        let base = fc & !EXCEPTION_FLAG;
        if base != expected_fc {
            return Err(ModbusError::unmatched(
                "function code",
                expected_fc as u16,
                base as u16,
            ));
        }
        return Err(ModbusError::exception(base, pdu[1]));
    }

    if fc != expected_fc {
        return Err(ModbusError::unmatched(
            "function code",
            expected_fc as u16,
            fc as u16,
        ));
    }

    if transaction.function.is_read() {
        check_read_layout(transaction, pdu)?;
    } else {
        check_write_echo(transaction, pdu)?;
    }

    debug!(
        "[MODBUS-{}] valid {} response, {} payload bytes",
        C::PROTOCOL,
        transaction.function,
        pdu.len() - 1
    );
    Ok(ValidatedResponse {
        raw: response,
        payload: pdu_range.start + 1..pdu_range.end,
        function: transaction.function,
    })
}

fn check_read_layout(transaction: &Transaction, pdu: &[u8]) -> ModbusResult<()> {
    if pdu.len() < 2 {
        return Err(ModbusError::malformed("read response without byte count"));
    }
    let byte_count = pdu[1] as usize;
    let expected = transaction.quantity as usize * 2;
    if byte_count != expected {
        return Err(ModbusError::malformed(format!(
            "byte count {} does not match {} requested registers",
            byte_count, transaction.quantity
        )));
    }
    if pdu.len() != 2 + byte_count {
        return Err(ModbusError::malformed(format!(
            "byte count {} but {} data bytes received",
            byte_count,
            pdu.len() - 2
        )));
    }
    Ok(())
}

fn check_write_echo(transaction: &Transaction, pdu: &[u8]) -> ModbusResult<()> {
    if pdu.len() != 5 {
        return Err(ModbusError::malformed(format!(
            "write response PDU must be 5 bytes, got {}",
            pdu.len()
        )));
    }
    let address = join_be(pdu[1], pdu[2]);
    if address != transaction.start_address {
        return Err(ModbusError::unmatched(
            "start address",
            transaction.start_address,
            address,
        ));
    }
    let quantity = join_be(pdu[3], pdu[4]);
    if quantity != transaction.quantity {
        return Err(ModbusError::unmatched(
            "quantity",
            transaction.quantity,
            quantity,
        ));
    }
    Ok(())
}

fn check_body(body: &[u8], max_pdu: usize) -> ModbusResult<()> {
    if body.is_empty() || body.len() > max_pdu {
        return Err(ModbusError::invalid_data(format!(
            "PDU body must be 1..={} bytes, got {}",
            max_pdu,
            body.len()
        )));
    }
    Ok(())
}

// ============================================================================
// IP (TCP/UDP)
// ============================================================================

/// MBAP framing for Modbus TCP and UDP.
pub struct IpCodec {
    ids: Box<dyn TransactionIdSource>,
}

impl IpCodec {
    /// Codec with random transaction ids.
    pub fn new() -> Self {
        Self::with_id_source(RandomTransactionIds::new())
    }

    /// Codec drawing transaction ids from `ids`.
    pub fn with_id_source(ids: impl TransactionIdSource + 'static) -> Self {
        Self { ids: Box::new(ids) }
    }
}

impl Default for IpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IpCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpCodec").finish_non_exhaustive()
    }
}

impl private::Sealed for IpCodec {}

impl FrameCodec for IpCodec {
    const PROTOCOL: &'static str = "IP";

    fn max_adu(&self) -> usize {
        TCP_MAX_ADU_SIZE
    }

    fn frame(&mut self, body: &[u8], unit_id: UnitId) -> ModbusResult<Vec<u8>> {
        check_body(body, self.max_pdu())?;

        let transaction_id = self.ids.next_id();
        // body.len() <= 253, so the length field cannot overflow
        let length = (body.len() + 1) as u16;

        let mut frame = Vec::with_capacity(MBAP_HEADER_LEN + body.len());
        frame.extend_from_slice(&transaction_id.to_be_bytes());
        frame.extend_from_slice(&MODBUS_PROTOCOL_ID.to_be_bytes());
        frame.extend_from_slice(&length.to_be_bytes());
        frame.push(unit_id);
        frame.extend_from_slice(body);

        debug!("[MODBUS-IP] framed request: {}", format_hex(&frame));
        Ok(frame)
    }

    fn transaction(&self, request: &[u8]) -> ModbusResult<Transaction> {
        if request.len() < MBAP_HEADER_LEN {
            return Err(ModbusError::invalid_data("request shorter than MBAP header"));
        }
        Transaction::from_pdu(
            Some(join_be(request[0], request[1])),
            request[MBAP_HEADER_LEN - 1],
            &request[MBAP_HEADER_LEN..],
        )
    }

    fn open_envelope(
        &self,
        transaction: &Transaction,
        response: &[u8],
    ) -> ModbusResult<(UnitId, Range<usize>)> {
        if response.len() < MBAP_HEADER_LEN + 1 {
            return Err(ModbusError::malformed(format!(
                "IP response of {} bytes is shorter than MBAP header and function code",
                response.len()
            )));
        }

        let transaction_id = join_be(response[0], response[1]);
        if let Some(expected) = transaction.transaction_id {
            if transaction_id != expected {
                return Err(ModbusError::unmatched(
                    "transaction id",
                    expected,
                    transaction_id,
                ));
            }
        }

        let protocol_id = join_be(response[2], response[3]);
        if protocol_id != MODBUS_PROTOCOL_ID {
            return Err(ModbusError::unmatched(
                "protocol id",
                MODBUS_PROTOCOL_ID,
                protocol_id,
            ));
        }

        let length = join_be(response[4], response[5]) as usize;
        if length != response.len() - MBAP_LENGTH_OFFSET {
            return Err(ModbusError::malformed(format!(
                "MBAP length field {} but {} bytes follow it",
                length,
                response.len() - MBAP_LENGTH_OFFSET
            )));
        }

        Ok((response[MBAP_HEADER_LEN - 1], MBAP_HEADER_LEN..response.len()))
    }
}

// ============================================================================
// RTU
// ============================================================================

/// Unit id + CRC framing for Modbus RTU.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtuCodec;

impl RtuCodec {
    /// Create an RTU codec
    pub fn new() -> Self {
        Self
    }
}

impl private::Sealed for RtuCodec {}

impl FrameCodec for RtuCodec {
    const PROTOCOL: &'static str = "RTU";

    fn max_adu(&self) -> usize {
        RTU_MAX_ADU_SIZE
    }

    fn frame(&mut self, body: &[u8], unit_id: UnitId) -> ModbusResult<Vec<u8>> {
        check_body(body, self.max_pdu())?;

        let mut frame = Vec::with_capacity(1 + body.len() + RTU_CRC_LEN);
        frame.push(unit_id);
        frame.extend_from_slice(body);
        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());

        debug!("[MODBUS-RTU] framed request: {}", format_hex(&frame));
        Ok(frame)
    }

    fn transaction(&self, request: &[u8]) -> ModbusResult<Transaction> {
        if request.len() < 1 + RTU_CRC_LEN {
            return Err(ModbusError::invalid_data("request shorter than RTU envelope"));
        }
        Transaction::from_pdu(None, request[0], &request[1..request.len() - RTU_CRC_LEN])
    }

    fn open_envelope(
        &self,
        _transaction: &Transaction,
        response: &[u8],
    ) -> ModbusResult<(UnitId, Range<usize>)> {
        // unit id + function code + CRC
        if response.len() < 2 + RTU_CRC_LEN {
            return Err(ModbusError::malformed(format!(
                "RTU response of {} bytes is too short",
                response.len()
            )));
        }

        let crc_at = response.len() - RTU_CRC_LEN;
        let expected = crc16(&response[..crc_at]);
        let actual = join_be(response[crc_at], response[crc_at + 1]);
        if expected != actual {
            return Err(ModbusError::ChecksumError { expected, actual });
        }

        Ok((response[0], 1..crc_at))
    }
}
