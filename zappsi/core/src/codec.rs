//! Fixed-width little-endian payload marshaling
//!
//! Every multi-byte field on the wire is little-endian and there is no
//! padding between fields.

use crate::{Payload, ZError, ZResult};

/// Appends fields to a frame payload
pub struct PayloadWriter<'a> {
    payload: &'a mut Payload,
}

impl<'a> PayloadWriter<'a> {
    /// Start writing after any bytes already in `payload`
    pub fn new(payload: &'a mut Payload) -> Self {
        Self { payload }
    }

    pub fn u8(&mut self, value: u8) -> ZResult<&mut Self> {
        self.payload.push(value).map_err(|_| ZError::PayloadOverflow)?;
        Ok(self)
    }

    pub fn u16(&mut self, value: u16) -> ZResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u32(&mut self, value: u32) -> ZResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u64(&mut self, value: u64) -> ZResult<&mut Self> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn bool(&mut self, value: bool) -> ZResult<&mut Self> {
        self.u8(value as u8)
    }

    pub fn bytes(&mut self, data: &[u8]) -> ZResult<&mut Self> {
        self.payload
            .extend_from_slice(data)
            .map_err(|_| ZError::PayloadOverflow)?;
        Ok(self)
    }

    /// Length-prefixed (one byte) byte string
    pub fn prefixed(&mut self, data: &[u8]) -> ZResult<&mut Self> {
        let len = u8::try_from(data.len()).map_err(|_| ZError::PayloadOverflow)?;
        self.u8(len)?.bytes(data)
    }

    /// Bytes written so far, including anything present before
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Reads fields from a received payload
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn u8(&mut self) -> ZResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(ZError::PayloadUnderrun)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn u16(&mut self) -> ZResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> ZResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> ZResult<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn bool(&mut self) -> ZResult<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ZError::InvalidValue),
        }
    }

    pub fn bytes(&mut self, len: usize) -> ZResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(ZError::PayloadUnderrun)?;
        let slice = self.data.get(self.pos..end).ok_or(ZError::PayloadUnderrun)?;
        self.pos = end;
        Ok(slice)
    }

    /// Length-prefixed (one byte) byte string
    pub fn prefixed(&mut self) -> ZResult<&'a [u8]> {
        let len = self.u8()? as usize;
        self.bytes(len)
    }

    /// Unread bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fails if any bytes were left unread
    pub fn finish(self) -> ZResult<()> {
        if self.remaining() == 0 {
            Ok(())
        } else {
            Err(ZError::InvalidValue)
        }
    }

    fn array<const N: usize>(&mut self) -> ZResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }
}
