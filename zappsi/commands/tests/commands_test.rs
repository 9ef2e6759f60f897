use zappsi_commands::aps::{DataConf, DataReq};
use zappsi_commands::nwk::{GetNextHopReq, GetNextHopRsp};
use zappsi_commands::zdo::DeviceAnnounceInd;
use zappsi_commands::Command;
use zappsi_core::{CommandFrame, CommandType, Domain, ZError};

#[test]
fn test_get_next_hop_short_address_is_little_endian() {
    let mut frame = CommandFrame::default();
    frame.sequence = 7;
    GetNextHopReq { short_addr: 0x1234 }
        .serialize_into(&mut frame)
        .unwrap();

    assert_eq!(frame.command_type, CommandType::Sreq);
    assert_eq!(frame.domain, Domain::NWK);
    assert_eq!(frame.sequence, 7);
    assert_eq!(&frame.payload[..], &[0x34, 0x12]);
    assert_eq!(
        GetNextHopReq::deserialize(&frame),
        Ok(GetNextHopReq { short_addr: 0x1234 })
    );
}

#[test]
fn test_response_rewrites_request_in_place() {
    let mut frame = CommandFrame::default();
    frame.sequence = 42;
    GetNextHopReq { short_addr: 0x1234 }
        .serialize_into(&mut frame)
        .unwrap();
    GetNextHopRsp { next_hop: 0x5678 }
        .serialize_into(&mut frame)
        .unwrap();

    assert_eq!(frame.command_type, CommandType::Srsp);
    assert_eq!(frame.sequence, 42);
    assert_eq!(&frame.payload[..], &[0x78, 0x56]);
    assert!(!GetNextHopReq::matches(&frame));
}

#[test]
fn test_data_req_carries_asdu() {
    let req = DataReq {
        dst_addr: 0xBEEF,
        dst_endpoint: 1,
        src_endpoint: 2,
        cluster_id: 0x0006,
        radius: 30,
        asdu: heapless::Vec::from_slice(&[0x01, 0x02, 0x03]).unwrap(),
    };
    let mut frame = CommandFrame::default();
    req.serialize_into(&mut frame).unwrap();

    assert_eq!(
        &frame.payload[..],
        &[0xEF, 0xBE, 0x01, 0x02, 0x06, 0x00, 30, 3, 0x01, 0x02, 0x03]
    );
    assert_eq!(DataReq::deserialize(&frame), Ok(req));
}

#[test]
fn test_device_announce_decodes_from_wire() {
    let ind = DeviceAnnounceInd {
        nwk_addr: 0x796F,
        ieee_addr: 0x00124B0001020304,
        capability: 0x8E,
    };
    let mut frame = CommandFrame::default();
    ind.serialize_into(&mut frame).unwrap();

    let decoded = CommandFrame::decode(&frame.to_bytes()).unwrap();
    assert_eq!(DeviceAnnounceInd::deserialize(&decoded), Ok(ind));
}

#[test]
fn test_deserialize_rejects_other_command() {
    let mut frame = CommandFrame::default();
    DataConf {
        status: 0,
        dst_addr: 1,
        dst_endpoint: 1,
    }
    .serialize_into(&mut frame)
    .unwrap();

    assert_eq!(
        DataReq::deserialize(&frame),
        Err(ZError::UnknownCommand {
            domain: Domain::APS.raw(),
            command_id: 0x02
        })
    );
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let mut frame = CommandFrame::default();
    GetNextHopRsp { next_hop: 1 }.serialize_into(&mut frame).unwrap();
    frame.payload.push(0xFF).unwrap();
    assert_eq!(GetNextHopRsp::deserialize(&frame), Err(ZError::InvalidValue));
}
