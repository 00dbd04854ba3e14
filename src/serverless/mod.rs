//! HTTP variant of the dataplane.
//!
//! Instead of a broker round trip, the publisher POSTs each item as JSON to a
//! function endpoint and treats the response as the ack. The handler is
//! stateless: it decodes the image, classifies it inline and echoes the
//! origin timestamp.

pub mod handler;
pub mod publisher;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::{Error, Result};

pub use handler::{router, serve};
pub use publisher::ServerlessPublisher;

pub const FUNCTION_PATH: &str = "/function/image";
pub const HEALTH_PATH: &str = "/healthz";

/// Body of a function invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRequest {
    /// Base64 of the raw image bytes.
    pub image: String,
    /// Origin timestamp in nanoseconds, as a decimal string.
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub time: u64,
}

/// Extracts the echoed origin timestamp from a function response.
///
/// Accepts a JSON body, or runtime output whose last non-empty line is a
/// dict written with single quotes, e.g. `{'time': 1700000000000000000}`.
/// The timestamp may be a number or a decimal string.
pub fn parse_response(body: &str) -> Result<u64> {
    if let Some(time) = serde_json::from_str::<Value>(body.trim())
        .ok()
        .as_ref()
        .and_then(time_field)
    {
        return Ok(time);
    }

    let last = body
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| Error::Protocol("empty function response".to_string()))?;
    serde_json::from_str::<Value>(&last.replace('\'', "\""))
        .ok()
        .as_ref()
        .and_then(time_field)
        .ok_or_else(|| Error::Protocol(format!("can't decode the function output: {last}")))
}

fn time_field(value: &Value) -> Option<u64> {
    match value.get("time")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
