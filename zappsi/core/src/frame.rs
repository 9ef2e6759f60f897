//! Command frames and the byte-exact wire format
//!
//! ```text
//! [SOF:1][LENGTH:2 LE][FRAME_CONTROL:1][SEQUENCE:1][DOMAIN:1][COMMAND_ID:1][PAYLOAD]
//! ```
//!
//! `LENGTH` counts everything after itself, so it is always
//! `HEADER_LEN + payload.len()`.

use core::fmt;

use heapless::Vec;

use crate::{Domain, ZError, ZResult};

/// Start-of-frame marker
pub const SOF: u8 = 0xFE;

/// Bytes counted by `LENGTH` before the payload starts
pub const HEADER_LEN: usize = 4;

/// Largest payload a frame buffer can carry
pub const MAX_PAYLOAD_LEN: usize = 128;

/// SOF + LENGTH
pub const PREAMBLE_LEN: usize = 3;

/// Largest encoded frame
pub const MAX_FRAME_LEN: usize = PREAMBLE_LEN + HEADER_LEN + MAX_PAYLOAD_LEN;

const FRAME_CONTROL_TYPE_MASK: u8 = 0x03;

/// Frame payload storage
pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;

/// Encoded frame storage
pub type WireFrame = Vec<u8, MAX_FRAME_LEN>;

/// Command type selected by the low bits of `FRAME_CONTROL`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// Asynchronous request, confirmation or indication
    Areq = 0x00,
    /// Synchronous request
    Sreq = 0x01,
    /// Synchronous response
    Srsp = 0x02,
}

impl CommandType {
    /// Decode the command type from a raw frame-control byte
    pub const fn from_frame_control(fc: u8) -> ZResult<Self> {
        match fc & FRAME_CONTROL_TYPE_MASK {
            0x00 => Ok(CommandType::Areq),
            0x01 => Ok(CommandType::Sreq),
            0x02 => Ok(CommandType::Srsp),
            _ => Err(ZError::InvalidFrameControl(fc)),
        }
    }

    /// Encode as a frame-control byte; reserved bits are zero
    pub const fn frame_control(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            CommandType::Areq => "AREQ",
            CommandType::Sreq => "SREQ",
            CommandType::Srsp => "SRSP",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandType {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.name());
    }
}

/// One ZAppSI command: header fields plus payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub command_type: CommandType,
    pub sequence: u8,
    pub domain: Domain,
    pub command_id: u8,
    pub payload: Payload,
}

impl Default for CommandFrame {
    fn default() -> Self {
        Self::new(CommandType::Areq, Domain::CONFIG, 0)
    }
}

impl CommandFrame {
    /// Create a frame with an empty payload and sequence number zero
    pub const fn new(command_type: CommandType, domain: Domain, command_id: u8) -> Self {
        Self {
            command_type,
            sequence: 0,
            domain,
            command_id,
            payload: Vec::new(),
        }
    }

    /// Start-of-frame marker this frame is sent with
    pub const fn sof(&self) -> u8 {
        SOF
    }

    /// Value of the `LENGTH` field
    pub fn length(&self) -> u16 {
        (HEADER_LEN + self.payload.len()) as u16
    }

    /// Number of bytes [`CommandFrame::encode_into`] writes
    pub fn encoded_len(&self) -> usize {
        PREAMBLE_LEN + HEADER_LEN + self.payload.len()
    }

    /// Rewrite the header in place; the payload is cleared.
    pub fn reset(&mut self, command_type: CommandType, domain: Domain, command_id: u8) {
        self.command_type = command_type;
        self.domain = domain;
        self.command_id = command_id;
        self.payload.clear();
    }

    /// Encode into `out`, returning the number of bytes written
    pub fn encode_into(&self, out: &mut [u8]) -> ZResult<usize> {
        let len = self.encoded_len();
        if out.len() < len {
            return Err(ZError::PayloadOverflow);
        }

        let length = self.length().to_le_bytes();
        out[0] = SOF;
        out[1] = length[0];
        out[2] = length[1];
        out[3] = self.command_type.frame_control();
        out[4] = self.sequence;
        out[5] = self.domain.raw();
        out[6] = self.command_id;
        out[PREAMBLE_LEN + HEADER_LEN..len].copy_from_slice(&self.payload);
        Ok(len)
    }

    /// Encode into an owned wire buffer
    pub fn to_bytes(&self) -> WireFrame {
        let mut wire = WireFrame::new();
        // The payload is bounded by MAX_PAYLOAD_LEN, so this always fits.
        let _ = wire.resize(self.encoded_len(), 0);
        let _ = self.encode_into(&mut wire);
        wire
    }

    /// Decode one complete frame starting at `bytes[0]`
    pub fn decode(bytes: &[u8]) -> ZResult<Self> {
        if bytes.len() < PREAMBLE_LEN + HEADER_LEN {
            return Err(ZError::PayloadUnderrun);
        }
        if bytes[0] != SOF {
            return Err(ZError::InvalidSof(bytes[0]));
        }

        let length = u16::from_le_bytes([bytes[1], bytes[2]]);
        check_length(length)?;
        let end = PREAMBLE_LEN + length as usize;
        if bytes.len() < end {
            return Err(ZError::PayloadUnderrun);
        }

        Self::from_body(&bytes[PREAMBLE_LEN..end])
    }

    /// Build a frame from the bytes counted by `LENGTH`
    fn from_body(body: &[u8]) -> ZResult<Self> {
        let command_type = CommandType::from_frame_control(body[0])?;
        let mut frame = CommandFrame::new(command_type, Domain(body[2]), body[3]);
        frame.sequence = body[1];
        frame
            .payload
            .extend_from_slice(&body[HEADER_LEN..])
            .map_err(|_| ZError::PayloadOverflow)?;
        Ok(frame)
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {}/{:#04x} len={}",
            self.command_type,
            self.sequence,
            self.domain,
            self.command_id,
            self.payload.len()
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandFrame {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "{} #{} {}/{=u8:#x} len={}",
            self.command_type,
            self.sequence,
            self.domain,
            self.command_id,
            self.payload.len()
        );
    }
}

fn check_length(length: u16) -> ZResult<()> {
    if (length as usize) < HEADER_LEN || (length as usize) > HEADER_LEN + MAX_PAYLOAD_LEN {
        Err(ZError::InvalidLength(length))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblerState {
    Sof,
    LengthLo,
    LengthHi(u8),
    Body(usize),
}

/// Incremental frame reassembler fed one received byte at a time.
///
/// Bytes before a start-of-frame marker are discarded. A bad length or
/// frame-control byte is reported and the assembler starts over.
#[derive(Debug)]
pub struct FrameAssembler {
    state: AssemblerState,
    body: Vec<u8, { HEADER_LEN + MAX_PAYLOAD_LEN }>,
    discarded: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub const fn new() -> Self {
        Self {
            state: AssemblerState::Sof,
            body: Vec::new(),
            discarded: 0,
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.state = AssemblerState::Sof;
        self.body.clear();
    }

    /// True while a frame is partially received
    pub fn in_frame(&self) -> bool {
        self.state != AssemblerState::Sof
    }

    /// Count of noise bytes skipped while hunting for SOF
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Feed one byte; yields a frame when its last byte arrives
    pub fn push(&mut self, byte: u8) -> ZResult<Option<CommandFrame>> {
        match self.state {
            AssemblerState::Sof => {
                if byte == SOF {
                    self.body.clear();
                    self.state = AssemblerState::LengthLo;
                } else {
                    self.discarded += 1;
                }
                Ok(None)
            }
            AssemblerState::LengthLo => {
                self.state = AssemblerState::LengthHi(byte);
                Ok(None)
            }
            AssemblerState::LengthHi(lo) => {
                let length = u16::from_le_bytes([lo, byte]);
                if let Err(err) = check_length(length) {
                    self.reset();
                    return Err(err);
                }
                self.state = AssemblerState::Body(length as usize);
                Ok(None)
            }
            AssemblerState::Body(length) => {
                // Capacity equals the largest accepted length.
                let _ = self.body.push(byte);
                if self.body.len() < length {
                    return Ok(None);
                }

                let result = CommandFrame::from_body(&self.body);
                self.reset();
                result.map(Some)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CommandFrame {
        let mut frame = CommandFrame::new(CommandType::Sreq, Domain::NWK, 0x10);
        frame.sequence = 7;
        frame.payload.extend_from_slice(&[0x34, 0x12]).unwrap();
        frame
    }

    #[test]
    fn encodes_header_byte_exact() {
        let wire = sample().to_bytes();
        assert_eq!(&wire[..], &[SOF, 0x06, 0x00, 0x01, 0x07, 0x02, 0x10, 0x34, 0x12]);
    }

    #[test]
    fn length_excludes_preamble() {
        let frame = sample();
        assert_eq!(frame.length(), 6);
        assert_eq!(frame.encoded_len(), 9);
    }

    #[test]
    fn frame_control_low_bits_select_type() {
        assert_eq!(CommandType::from_frame_control(0x00), Ok(CommandType::Areq));
        assert_eq!(CommandType::from_frame_control(0xF1), Ok(CommandType::Sreq));
        assert_eq!(CommandType::from_frame_control(0x02), Ok(CommandType::Srsp));
        assert_eq!(
            CommandType::from_frame_control(0x03),
            Err(ZError::InvalidFrameControl(0x03))
        );
    }

    #[test]
    fn decode_rejects_missing_start_byte() {
        let mut wire = sample().to_bytes();
        wire[0] = 0x7E;
        assert_eq!(CommandFrame::decode(&wire), Err(ZError::InvalidSof(0x7E)));
    }

    #[test]
    fn assembler_skips_noise_and_yields_frame() {
        let wire = sample().to_bytes();
        let mut assembler = FrameAssembler::new();

        assert_eq!(assembler.push(0x00), Ok(None));
        assert_eq!(assembler.push(0x55), Ok(None));
        assert_eq!(assembler.discarded(), 2);

        let mut out = None;
        for &byte in wire.iter() {
            if let Some(frame) = assembler.push(byte).unwrap() {
                out = Some(frame);
            }
        }
        assert_eq!(out, Some(sample()));
        assert!(!assembler.in_frame());
    }

    #[test]
    fn assembler_rejects_short_length() {
        let mut assembler = FrameAssembler::new();
        assembler.push(SOF).unwrap();
        assembler.push(0x02).unwrap();
        assert_eq!(assembler.push(0x00), Err(ZError::InvalidLength(2)));
        assert!(!assembler.in_frame());
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        let wire = sample().to_bytes();
        assert_eq!(
            CommandFrame::decode(&wire[..wire.len() - 1]),
            Err(ZError::PayloadUnderrun)
        );
        assert_eq!(CommandFrame::decode(&wire), Ok(sample()));
    }
}
