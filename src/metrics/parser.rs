//! Parser for the nginx stub_status text block.
//!
//! The module only understands the fixed four-line layout:
//!
//! ```text
//! Active connections: 2
//! server accepts handled requests
//!  31 30 42
//! Reading: 0 Writing: 10 Waiting: 1
//! ```

use crate::error::{AgentError, Result};
use crate::metrics::data::RawReading;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::str::FromStr;

lazy_static! {
    static ref STATUS_PATTERN: Regex = Regex::new(concat!(
        r"^Active connections:\s+(?P<connections>[0-9]+)\s+[\w ]+\n",
        r"\s+(?P<accepts>[0-9]+)",
        r"\s+(?P<handled>[0-9]+)",
        r"\s+(?P<requests>[0-9]+)",
        r"\s+Reading:\s+(?P<reading>[0-9]+)",
        r"\s+Writing:\s+(?P<writing>[0-9]+)",
        r"\s+Waiting:\s+(?P<waiting>[0-9]+)",
    ))
    .expect("stub status pattern is a valid regex");
}

/// Parse one stub_status response body into a [`RawReading`].
///
/// Every field has to be present; a partial match is an error rather than a
/// reading with zeroes in it.
pub fn parse_status(text: &str) -> Result<RawReading> {
    let caps = STATUS_PATTERN
        .captures(text)
        .ok_or_else(|| AgentError::parse_error("response does not look like stub_status output"))?;

    Ok(RawReading {
        connections: field(&caps, "connections")?,
        accepts: field(&caps, "accepts")?,
        handled: field(&caps, "handled")?,
        requests: field(&caps, "requests")?,
        reading: field(&caps, "reading")?,
        writing: field(&caps, "writing")?,
        waiting: field(&caps, "waiting")?,
    })
}

fn field(caps: &Captures<'_>, name: &str) -> Result<i64> {
    let raw = caps
        .name(name)
        .ok_or_else(|| AgentError::parse_error(format!("missing field '{}'", name)))?
        .as_str();

    raw.parse::<i64>()
        .map_err(|e| AgentError::parse_error(format!("field '{}' = '{}': {}", name, raw, e)))
}

impl FromStr for RawReading {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        parse_status(s)
    }
}
