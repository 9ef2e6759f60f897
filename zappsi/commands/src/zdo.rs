//! ZigBee device object indications

use zappsi_core::{CommandType, Domain, PayloadReader, PayloadWriter, ZResult};

use crate::Command;

pub const DEVICE_ANNOUNCE_IND: u8 = 0x20;

/// A device joined or rejoined the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAnnounceInd {
    pub nwk_addr: u16,
    pub ieee_addr: u64,
    pub capability: u8,
}

impl Command for DeviceAnnounceInd {
    const DOMAIN: Domain = Domain::ZDO;
    const COMMAND_ID: u8 = DEVICE_ANNOUNCE_IND;
    const TYPE: CommandType = CommandType::Areq;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u16(self.nwk_addr)?.u64(self.ieee_addr)?.u8(self.capability)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self {
            nwk_addr: r.u16()?,
            ieee_addr: r.u64()?,
            capability: r.u8()?,
        })
    }
}
