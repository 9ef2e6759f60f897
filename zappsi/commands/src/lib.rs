#![no_std]
#![forbid(unsafe_code)]

//! # ZAppSI Commands
//!
//! Payload codecs for a representative set of commands. Every command knows
//! its domain, command id and type, and converts between a typed value and a
//! frame payload. A request and its synchronous response share a command id;
//! the frame type tells them apart.

use zappsi_core::{
    CommandFrame, CommandType, Domain, PayloadReader, PayloadWriter, ZError, ZResult,
};

pub mod aps;
pub mod config;
pub mod nwk;
pub mod zdo;

/// A command with a fixed place in the routing tables
pub trait Command: Sized {
    const DOMAIN: Domain;
    const COMMAND_ID: u8;
    const TYPE: CommandType;

    fn write_payload(&self, w: &mut PayloadWriter<'_>) -> ZResult<()>;

    fn read_payload(r: &mut PayloadReader<'_>) -> ZResult<Self>;

    /// Rewrite `frame` as this command. The sequence number is kept.
    fn serialize_into(&self, frame: &mut CommandFrame) -> ZResult<()> {
        frame.reset(Self::TYPE, Self::DOMAIN, Self::COMMAND_ID);
        self.write_payload(&mut PayloadWriter::new(&mut frame.payload))
    }

    /// True if `frame` carries this command
    fn matches(frame: &CommandFrame) -> bool {
        frame.domain == Self::DOMAIN
            && frame.command_id == Self::COMMAND_ID
            && frame.command_type == Self::TYPE
    }

    /// Decode the payload; trailing bytes are an error
    fn deserialize(frame: &CommandFrame) -> ZResult<Self> {
        if !Self::matches(frame) {
            return Err(ZError::UnknownCommand {
                domain: frame.domain.raw(),
                command_id: frame.command_id,
            });
        }
        let mut r = PayloadReader::new(&frame.payload);
        let value = Self::read_payload(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

/// ZigBee status byte: success
pub const STATUS_SUCCESS: u8 = 0x00;

/// Human-readable name of a known command
pub fn describe(domain: Domain, command_id: u8) -> Option<&'static str> {
    match (domain, command_id) {
        (Domain::CONFIG, config::RESET) => Some("Reset"),
        (Domain::CONFIG, config::GET_VERSION) => Some("GetVersion"),
        (Domain::NWK, nwk::GET_NEXT_HOP) => Some("GetNextHop"),
        (Domain::NWK, nwk::PERMIT_JOINING) => Some("PermitJoining"),
        (Domain::APS, aps::DATA_REQ) => Some("DataReq"),
        (Domain::APS, aps::DATA_CONF) => Some("DataConf"),
        (Domain::ZDO, zdo::DEVICE_ANNOUNCE_IND) => Some("DeviceAnnounceInd"),
        _ => None,
    }
}
