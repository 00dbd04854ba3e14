//! Wire framing shared by the publisher and the subscriber.
//!
//! A work message is `payload ‖ timestamp ‖ reply address`, with the two
//! trailer fields at fixed widths so both sides parse from the tail without a
//! length prefix. An ack is the 20-byte timestamp field echoed back,
//! optionally preceded by result text.

pub mod codec;

pub use codec::{
    ADDRESS_WIDTH, Decoded, FrameError, SENTINEL, TIMESTAMP_WIDTH, TRAILER_LEN, WorkFrame,
    decode, decode_ack, encode, encode_ack, validate_address,
};

/// Wall-clock nanoseconds since the UNIX epoch.
pub fn now_ns() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .and_then(|ns| u64::try_from(ns).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests;
