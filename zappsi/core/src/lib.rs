#![no_std]
#![forbid(unsafe_code)]

//! # ZAppSI Core
//!
//! Frame model, wire codec and error taxonomy shared by every ZAppSI crate.
//! A ZAppSI frame carries one command between the host application and the
//! network processor over a byte-oriented serial link.

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

pub mod codec;
pub mod domain;
pub mod frame;
pub mod result;
pub mod sequence;

pub use codec::*;
pub use domain::*;
pub use frame::*;
pub use result::*;
pub use sequence::*;

/// ZAppSI core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the ZAppSI crates
pub type ZResult<T> = Result<T, ZError>;

/// Broad classes of failure.
///
/// Only [`ErrorClass::ResourceExhaustion`] is ever absorbed by the engine;
/// every other class halts the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ResourceExhaustion,
    ProtocolViolation,
    Codec,
    Transport,
}

/// Error types for ZAppSI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZError {
    /// No free frame buffer in the requested pool
    OutOfMemory,
    /// A bounded engine queue is full
    QueueFull,
    /// Frame does not begin with the start-of-frame byte
    InvalidSof(u8),
    /// Frame control carries an unknown command type
    InvalidFrameControl(u8),
    /// Declared frame length is outside the accepted range
    InvalidLength(u16),
    /// No handler table for the domain
    UnknownDomain(u8),
    /// No handler for the command in a known domain
    UnknownCommand { domain: u8, command_id: u8 },
    /// SRSP received outside a blocking transaction or with the wrong sequence
    UnexpectedSrsp { sequence: u8 },
    /// A second SREQ was issued while one is outstanding
    SreqInProgress,
    /// A correlated reply arrived without a matching bearing entity
    UnmatchedReply { sequence: u8 },
    /// An SREQ handler on the network processor did not produce an SRSP
    MissingReply { domain: u8, command_id: u8 },
    /// Payload write past the frame capacity
    PayloadOverflow,
    /// Payload read past the received bytes
    PayloadUnderrun,
    /// Payload value is out of range for the command
    InvalidValue,
    /// The serial port reported a failure
    Transport,
}

impl ZError {
    /// Classifies the error.
    pub const fn class(&self) -> ErrorClass {
        match self {
            ZError::OutOfMemory | ZError::QueueFull => ErrorClass::ResourceExhaustion,
            ZError::InvalidSof(_)
            | ZError::InvalidFrameControl(_)
            | ZError::InvalidLength(_)
            | ZError::UnknownDomain(_)
            | ZError::UnknownCommand { .. }
            | ZError::UnexpectedSrsp { .. }
            | ZError::SreqInProgress
            | ZError::UnmatchedReply { .. }
            | ZError::MissingReply { .. } => ErrorClass::ProtocolViolation,
            ZError::PayloadOverflow | ZError::PayloadUnderrun | ZError::InvalidValue => {
                ErrorClass::Codec
            }
            ZError::Transport => ErrorClass::Transport,
        }
    }

    /// Returns true when the engine may absorb the error and retry later.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self.class(), ErrorClass::ResourceExhaustion)
    }
}

impl fmt::Display for ZError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZError::OutOfMemory => write!(f, "Frame pool exhausted"),
            ZError::QueueFull => write!(f, "Engine queue is full"),
            ZError::InvalidSof(byte) => write!(f, "Invalid start of frame {byte:#04x}"),
            ZError::InvalidFrameControl(fc) => write!(f, "Invalid frame control {fc:#04x}"),
            ZError::InvalidLength(len) => write!(f, "Invalid frame length {len}"),
            ZError::UnknownDomain(domain) => write!(f, "Unknown domain {domain:#04x}"),
            ZError::UnknownCommand { domain, command_id } => {
                write!(f, "Unknown command {domain:#04x}/{command_id:#04x}")
            }
            ZError::UnexpectedSrsp { sequence } => write!(f, "Unexpected SRSP (seq {sequence})"),
            ZError::SreqInProgress => write!(f, "SREQ already outstanding"),
            ZError::UnmatchedReply { sequence } => {
                write!(f, "Reply without bearing entity (seq {sequence})")
            }
            ZError::MissingReply { domain, command_id } => {
                write!(f, "SREQ {domain:#04x}/{command_id:#04x} produced no SRSP")
            }
            ZError::PayloadOverflow => write!(f, "Payload overflow"),
            ZError::PayloadUnderrun => write!(f, "Payload underrun"),
            ZError::InvalidValue => write!(f, "Invalid payload value"),
            ZError::Transport => write!(f, "Serial transport failure"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ZError {}

#[cfg(feature = "defmt")]
impl defmt::Format for ZError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ZError::OutOfMemory => defmt::write!(fmt, "OutOfMemory"),
            ZError::QueueFull => defmt::write!(fmt, "QueueFull"),
            ZError::InvalidSof(byte) => defmt::write!(fmt, "InvalidSof({=u8:#x})", byte),
            ZError::InvalidFrameControl(fc) => defmt::write!(fmt, "InvalidFrameControl({=u8:#x})", fc),
            ZError::InvalidLength(len) => defmt::write!(fmt, "InvalidLength({})", len),
            ZError::UnknownDomain(d) => defmt::write!(fmt, "UnknownDomain({=u8:#x})", d),
            ZError::UnknownCommand { domain, command_id } => {
                defmt::write!(fmt, "UnknownCommand({=u8:#x}/{=u8:#x})", domain, command_id)
            }
            ZError::UnexpectedSrsp { sequence } => defmt::write!(fmt, "UnexpectedSrsp({})", sequence),
            ZError::SreqInProgress => defmt::write!(fmt, "SreqInProgress"),
            ZError::UnmatchedReply { sequence } => defmt::write!(fmt, "UnmatchedReply({})", sequence),
            ZError::MissingReply { domain, command_id } => {
                defmt::write!(fmt, "MissingReply({=u8:#x}/{=u8:#x})", domain, command_id)
            }
            ZError::PayloadOverflow => defmt::write!(fmt, "PayloadOverflow"),
            ZError::PayloadUnderrun => defmt::write!(fmt, "PayloadUnderrun"),
            ZError::InvalidValue => defmt::write!(fmt, "InvalidValue"),
            ZError::Transport => defmt::write!(fmt, "Transport"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_exhaustion_is_recoverable() {
        assert!(ZError::OutOfMemory.is_recoverable());
        assert!(ZError::QueueFull.is_recoverable());
        assert!(!ZError::SreqInProgress.is_recoverable());
        assert!(!ZError::PayloadUnderrun.is_recoverable());
        assert_eq!(
            ZError::UnknownCommand { domain: 1, command_id: 2 }.class(),
            ErrorClass::ProtocolViolation
        );
        assert_eq!(ZError::Transport.class(), ErrorClass::Transport);
    }
}
