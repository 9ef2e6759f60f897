//! Link configuration commands

use zappsi_core::{CommandType, Domain, PayloadReader, PayloadWriter, ZError, ZResult};

use crate::Command;

pub const RESET: u8 = 0x00;
pub const GET_VERSION: u8 = 0x01;

/// How thoroughly the network processor resets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResetType {
    /// Restart, keeping persistent network state
    Soft = 0x00,
    /// Restart and erase persistent network state
    FactoryNew = 0x01,
}

impl TryFrom<u8> for ResetType {
    type Error = ZError;

    fn try_from(value: u8) -> ZResult<Self> {
        match value {
            0x00 => Ok(ResetType::Soft),
            0x01 => Ok(ResetType::FactoryNew),
            _ => Err(ZError::InvalidValue),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetReq {
    pub reset_type: ResetType,
}

impl Command for ResetReq {
    const DOMAIN: Domain = Domain::CONFIG;
    const COMMAND_ID: u8 = RESET;
    const TYPE: CommandType = CommandType::Sreq;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u8(self.reset_type as u8)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self {
            reset_type: ResetType::try_from(r.u8()?)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRsp {
    pub status: u8,
}

impl Command for ResetRsp {
    const DOMAIN: Domain = Domain::CONFIG;
    const COMMAND_ID: u8 = RESET;
    const TYPE: CommandType = CommandType::Srsp;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u8(self.status)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self { status: r.u8()? })
    }
}

/// Protocol version query; empty payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetVersionReq;

impl Command for GetVersionReq {
    const DOMAIN: Domain = Domain::CONFIG;
    const COMMAND_ID: u8 = GET_VERSION;
    const TYPE: CommandType = CommandType::Sreq;

    fn write_payload(&self, _w: &mut PayloadWriter<'_>) -> ZResult<()> {
        Ok(())
    }

    fn read_payload(_r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetVersionRsp {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Command for GetVersionRsp {
    const DOMAIN: Domain = Domain::CONFIG;
    const COMMAND_ID: u8 = GET_VERSION;
    const TYPE: CommandType = CommandType::Srsp;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u8(self.major)?.u8(self.minor)?.u8(self.patch)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self {
            major: r.u8()?,
            minor: r.u8()?,
            patch: r.u8()?,
        })
    }
}
