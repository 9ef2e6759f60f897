//! Network layer commands

use zappsi_core::{CommandType, Domain, PayloadReader, PayloadWriter, ZResult};

use crate::Command;

pub const GET_NEXT_HOP: u8 = 0x10;
pub const PERMIT_JOINING: u8 = 0x11;

/// Next hop toward a destination short address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetNextHopReq {
    pub short_addr: u16,
}

impl Command for GetNextHopReq {
    const DOMAIN: Domain = Domain::NWK;
    const COMMAND_ID: u8 = GET_NEXT_HOP;
    const TYPE: CommandType = CommandType::Sreq;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u16(self.short_addr)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self {
            short_addr: r.u16()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetNextHopRsp {
    pub next_hop: u16,
}

impl Command for GetNextHopRsp {
    const DOMAIN: Domain = Domain::NWK;
    const COMMAND_ID: u8 = GET_NEXT_HOP;
    const TYPE: CommandType = CommandType::Srsp;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u16(self.next_hop)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self {
            next_hop: r.u16()?,
        })
    }
}

/// Open the network for joining; fire-and-forget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermitJoiningReq {
    /// Seconds, 0 closes, 0xFF keeps it open
    pub duration: u8,
}

impl Command for PermitJoiningReq {
    const DOMAIN: Domain = Domain::NWK;
    const COMMAND_ID: u8 = PERMIT_JOINING;
    const TYPE: CommandType = CommandType::Areq;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u8(self.duration)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self { duration: r.u8()? })
    }
}
