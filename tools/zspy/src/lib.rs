//! Host-side utilities for reading captured ZAppSI traffic.
//!
//! A capture is the raw byte stream seen on one direction of the serial
//! link. The decoder resynchronizes on start-of-frame markers and the
//! formatter renders each frame as a text line or a JSON object.

mod decoder;
mod formatter;

pub use decoder::{parse_hex, DecodeError, StreamDecoder};
pub use formatter::{parse_domain, FrameFormatter, FrameRecord};
