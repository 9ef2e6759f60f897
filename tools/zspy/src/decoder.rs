use thiserror::Error;
use zappsi_core::{CommandFrame, FrameAssembler, ZError};

/// Errors produced while reading a capture.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid hex token {0:?}")]
    InvalidHex(String),
    #[error("malformed frame: {0}")]
    Frame(#[from] ZError),
}

/// Incremental decoder that accepts arbitrary byte chunks and yields
/// complete frames.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    assembler: FrameAssembler,
    frames: usize,
    errors: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears any partial frame state.
    pub fn reset(&mut self) {
        self.assembler.reset();
    }

    /// Feeds raw bytes and returns every frame or framing error they
    /// complete, in stream order. Decoding resumes at the next SOF after an
    /// error.
    pub fn push_bytes(&mut self, input: &[u8]) -> Vec<Result<CommandFrame, DecodeError>> {
        let mut out = Vec::new();
        for &byte in input {
            match self.assembler.push(byte) {
                Ok(Some(frame)) => {
                    self.frames += 1;
                    out.push(Ok(frame));
                }
                Ok(None) => {}
                Err(err) => {
                    self.errors += 1;
                    out.push(Err(err.into()));
                }
            }
        }
        out
    }

    /// True while a frame is partially received
    pub fn in_frame(&self) -> bool {
        self.assembler.in_frame()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Bytes skipped while looking for a start-of-frame marker
    pub fn skipped(&self) -> usize {
        self.assembler.discarded()
    }
}

/// Parses a hex dump such as `FE 06 00 01` or `0xfe,0x06` or `FE060001`.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, DecodeError> {
    let mut bytes = Vec::new();
    for token in text.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(DecodeError::InvalidHex(token.to_string()));
        }
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| DecodeError::InvalidHex(token.to_string()))?;
            let byte =
                u8::from_str_radix(pair, 16).map_err(|_| DecodeError::InvalidHex(token.to_string()))?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}
