//! Application support sublayer commands
//!
//! `DataConf` answers `DataReq` and carries the request's sequence number.

use heapless::Vec;
use zappsi_core::{CommandType, Domain, PayloadReader, PayloadWriter, ZError, ZResult};

use crate::Command;

pub const DATA_REQ: u8 = 0x01;
pub const DATA_CONF: u8 = 0x02;

/// Largest ASDU carried in one frame
pub const MAX_ASDU_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReq {
    pub dst_addr: u16,
    pub dst_endpoint: u8,
    pub src_endpoint: u8,
    pub cluster_id: u16,
    pub radius: u8,
    pub asdu: Vec<u8, MAX_ASDU_LEN>,
}

impl Command for DataReq {
    const DOMAIN: Domain = Domain::APS;
    const COMMAND_ID: u8 = DATA_REQ;
    const TYPE: CommandType = CommandType::Areq;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u16(self.dst_addr)?
            .u8(self.dst_endpoint)?
            .u8(self.src_endpoint)?
            .u16(self.cluster_id)?
            .u8(self.radius)?
            .prefixed(&self.asdu)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        let dst_addr = r.u16()?;
        let dst_endpoint = r.u8()?;
        let src_endpoint = r.u8()?;
        let cluster_id = r.u16()?;
        let radius = r.u8()?;
        let asdu = Vec::from_slice(r.prefixed()?).map_err(|_| ZError::InvalidValue)?;
        Ok(Self {
            dst_addr,
            dst_endpoint,
            src_endpoint,
            cluster_id,
            radius,
            asdu,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataConf {
    pub status: u8,
    pub dst_addr: u16,
    pub dst_endpoint: u8,
}

impl Command for DataConf {
    const DOMAIN: Domain = Domain::APS;
    const COMMAND_ID: u8 = DATA_CONF;
    const TYPE: CommandType = CommandType::Areq;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()> {
        w.u8(self.status)?.u16(self.dst_addr)?.u8(self.dst_endpoint)?;
        Ok(())
    }

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self> {
        Ok(Self {
            status: r.u8()?,
            dst_addr: r.u16()?,
            dst_endpoint: r.u8()?,
        })
    }
}
