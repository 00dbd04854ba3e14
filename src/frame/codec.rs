use thiserror::Error;

/// Width of the zero-padded decimal timestamp field.
pub const TIMESTAMP_WIDTH: usize = 20;
/// Width of the dash-padded reply address field.
pub const ADDRESS_WIDTH: usize = 15;
pub const TRAILER_LEN: usize = TIMESTAMP_WIDTH + ADDRESS_WIDTH;

/// End-of-stream marker published once by every sender.
pub const SENTINEL: &[u8] = b"1";

const ADDRESS_PAD: u8 = b'-';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame of {0} bytes is shorter than the 35-byte trailer")]
    TooShort(usize),

    #[error("reply address '{0}' is longer than 15 bytes")]
    AddressTooLong(String),

    #[error("reply address is empty")]
    EmptyAddress,

    #[error("reply address is not printable ASCII")]
    InvalidAddress,

    #[error("timestamp field is not a 20-digit decimal number")]
    InvalidTimestamp,

    #[error("ack of {0} bytes is shorter than the 20-byte timestamp")]
    AckTooShort(usize),
}

/// A decoded work message. Borrows from the received bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkFrame<'a> {
    pub payload: &'a [u8],
    pub origin_ns: u64,
    /// Raw timestamp field, echoed verbatim in the ack.
    pub timestamp_field: &'a [u8],
    pub reply_to: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<'a> {
    Sentinel,
    Work(WorkFrame<'a>),
}

/// Checks that `addr` fits the reply address field.
pub fn validate_address(addr: &str) -> Result<(), FrameError> {
    if addr.is_empty() {
        return Err(FrameError::EmptyAddress);
    }
    if addr.len() > ADDRESS_WIDTH {
        return Err(FrameError::AddressTooLong(addr.to_string()));
    }
    if !addr.bytes().all(|b| b.is_ascii_graphic()) || addr.starts_with('-') {
        return Err(FrameError::InvalidAddress);
    }
    Ok(())
}

/// Builds `payload ‖ pad0(now_ns, 20) ‖ pad-(local_addr, 15)`.
///
/// Any `u64` fits in 20 decimal digits, so only the address can be rejected.
pub fn encode(payload: &[u8], now_ns: u64, local_addr: &str) -> Result<Vec<u8>, FrameError> {
    validate_address(local_addr)?;

    let mut frame = Vec::with_capacity(payload.len() + TRAILER_LEN);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(format!("{:0>width$}", now_ns, width = TIMESTAMP_WIDTH).as_bytes());
    frame.extend_from_slice(format!("{:->width$}", local_addr, width = ADDRESS_WIDTH).as_bytes());
    Ok(frame)
}

pub fn decode(frame: &[u8]) -> Result<Decoded<'_>, FrameError> {
    if frame == SENTINEL {
        return Ok(Decoded::Sentinel);
    }
    let len = frame.len();
    if len < TRAILER_LEN {
        return Err(FrameError::TooShort(len));
    }

    let address_field = &frame[len - ADDRESS_WIDTH..];
    let timestamp_field = &frame[len - TRAILER_LEN..len - ADDRESS_WIDTH];

    let start = address_field
        .iter()
        .position(|&b| b != ADDRESS_PAD)
        .ok_or(FrameError::EmptyAddress)?;
    let reply_to = std::str::from_utf8(&address_field[start..])
        .ok()
        .filter(|a| a.bytes().all(|b| b.is_ascii_graphic()))
        .ok_or(FrameError::InvalidAddress)?;

    Ok(Decoded::Work(WorkFrame {
        payload: &frame[..len - TRAILER_LEN],
        origin_ns: parse_timestamp(timestamp_field)?,
        timestamp_field,
        reply_to,
    }))
}

/// Builds an ack: optional result text followed by the echoed timestamp field.
pub fn encode_ack(result: Option<&[u8]>, timestamp_field: &[u8]) -> Vec<u8> {
    let result = result.unwrap_or_default();
    let mut ack = Vec::with_capacity(result.len() + timestamp_field.len());
    ack.extend_from_slice(result);
    ack.extend_from_slice(timestamp_field);
    ack
}

/// Returns the origin timestamp carried in the last 20 bytes of an ack.
pub fn decode_ack(ack: &[u8]) -> Result<u64, FrameError> {
    if ack.len() < TIMESTAMP_WIDTH {
        return Err(FrameError::AckTooShort(ack.len()));
    }
    parse_timestamp(&ack[ack.len() - TIMESTAMP_WIDTH..])
}

fn parse_timestamp(field: &[u8]) -> Result<u64, FrameError> {
    if field.len() != TIMESTAMP_WIDTH || !field.iter().all(u8::is_ascii_digit) {
        return Err(FrameError::InvalidTimestamp);
    }
    // all digits, so only overflow past u64::MAX can fail here
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(FrameError::InvalidTimestamp)
}
