//! Wire-format tests for zappsi-core
//! These tests run on x86 host with std for testing, but verify no_std compatible code

use zappsi_core::{
    CommandFrame, CommandType, Domain, FrameAssembler, PayloadReader, PayloadWriter, ZError,
    MAX_PAYLOAD_LEN, SOF,
};

fn frame(command_type: CommandType, seq: u8, payload: &[u8]) -> CommandFrame {
    let mut frame = CommandFrame::new(command_type, Domain::APS, 0x21);
    frame.sequence = seq;
    frame.payload.extend_from_slice(payload).unwrap();
    frame
}

#[test]
fn test_back_to_back_frames() {
    let first = frame(CommandType::Areq, 1, &[1, 2, 3]);
    let second = frame(CommandType::Srsp, 2, &[]);

    let mut stream = Vec::new();
    stream.extend_from_slice(&first.to_bytes());
    stream.extend_from_slice(&second.to_bytes());

    let mut assembler = FrameAssembler::new();
    let mut out = Vec::new();
    for byte in stream {
        if let Some(frame) = assembler.push(byte).unwrap() {
            out.push(frame);
        }
    }

    assert_eq!(out, vec![first, second]);
}

#[test]
fn test_largest_payload() {
    let big = frame(CommandType::Areq, 9, &[0x5A; MAX_PAYLOAD_LEN]);
    let wire = big.to_bytes();
    assert_eq!(wire.len(), 3 + 4 + MAX_PAYLOAD_LEN);
    assert_eq!(CommandFrame::decode(&wire), Ok(big));
}

#[test]
fn test_oversized_length_resyncs() {
    let mut assembler = FrameAssembler::new();
    let too_long = (4 + MAX_PAYLOAD_LEN + 1) as u16;
    let [lo, hi] = too_long.to_le_bytes();

    assembler.push(SOF).unwrap();
    assembler.push(lo).unwrap();
    assert_eq!(assembler.push(hi), Err(ZError::InvalidLength(too_long)));

    let good = frame(CommandType::Sreq, 3, &[7]);
    let mut decoded = None;
    for &byte in good.to_bytes().iter() {
        decoded = assembler.push(byte).unwrap().or(decoded);
    }
    assert_eq!(decoded, Some(good));
}

#[test]
fn test_invalid_frame_control_is_reported() {
    let mut assembler = FrameAssembler::new();
    let bytes = [SOF, 0x04, 0x00, 0x03, 0x00, 0x02, 0x01];
    let mut last = Ok(None);
    for byte in bytes {
        last = assembler.push(byte);
    }
    assert_eq!(last, Err(ZError::InvalidFrameControl(0x03)));
}

#[test]
fn test_codec_roundtrip_ieee_address() {
    let mut payload = zappsi_core::Payload::new();
    PayloadWriter::new(&mut payload)
        .u64(0x0011_2233_4455_6677)
        .unwrap();
    assert_eq!(&payload[..], &[0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00]);
    assert_eq!(PayloadReader::new(&payload).u64(), Ok(0x0011_2233_4455_6677));
}
