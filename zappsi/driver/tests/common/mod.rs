//! Test application, command tables and simulated serial ports shared by
//! the engine tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use zappsi_commands::aps::{self, DataConf, DataReq};
use zappsi_commands::nwk::{self, GetNextHopReq, GetNextHopRsp, PermitJoiningReq};
use zappsi_commands::zdo::{self, DeviceAnnounceInd};
use zappsi_commands::{Command, STATUS_SUCCESS};
use zappsi_driver::{
    Application, CommandEntry, CommandFrame, CommandType, Domain, Engine, EngineConfig,
    FrameRouter, HandlerContext, ProcessingResult, Role, Scheduler, SerialPort, ZError, ZResult,
};

/// One SREQ block, two mutual blocks
pub type TestEngine<'s, P = ScriptedPort> = Engine<'s, P, TestApp, 1, 2>;

pub type Handle = usize;

/// Caller-owned request and reply records
#[derive(Debug, Default, Clone)]
pub struct Slot {
    pub short_addr: u16,
    pub next_hop: Option<u16>,
    pub duration: u8,
    pub dst_addr: u16,
    pub dst_endpoint: u8,
    pub conf_status: Option<u8>,
    pub reply_sequence: u8,
}

#[derive(Debug, Default)]
pub struct TestApp {
    pub slots: Vec<Slot>,
    pub released: Vec<Handle>,
    pub announced: Vec<DeviceAnnounceInd>,
    pub completions: Vec<Option<Handle>>,
    /// NP side: data requests waiting to be confirmed
    pub pending_confs: Vec<Handle>,
    /// NP side: next hop returned for every route query
    pub route: u16,
}

impl TestApp {
    pub fn add(&mut self, slot: Slot) -> Handle {
        self.slots.push(slot);
        self.slots.len() - 1
    }

    pub fn was_released(&self, handle: Handle) -> bool {
        self.released.contains(&handle)
    }
}

impl Application for TestApp {
    type Handle = Handle;

    fn release(&mut self, handle: Handle) {
        self.released.push(handle);
    }
}

// Serializers

pub fn ser_get_next_hop(
    app: &mut TestApp,
    handle: Handle,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    GetNextHopReq {
        short_addr: app.slots[handle].short_addr,
    }
    .serialize_into(frame)?;
    Ok(ProcessingResult::RELEASE)
}

pub fn ser_permit_joining(
    app: &mut TestApp,
    handle: Handle,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    PermitJoiningReq {
        duration: app.slots[handle].duration,
    }
    .serialize_into(frame)?;
    Ok(ProcessingResult::RELEASE)
}

/// Keeps the entity alive until `DataConf` arrives
pub fn ser_data_req(
    app: &mut TestApp,
    handle: Handle,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    let slot = &app.slots[handle];
    DataReq {
        dst_addr: slot.dst_addr,
        dst_endpoint: slot.dst_endpoint,
        src_endpoint: 1,
        cluster_id: 0x0006,
        radius: 30,
        asdu: heapless::Vec::from_slice(&[0x01, 0x00]).map_err(|_| ZError::PayloadOverflow)?,
    }
    .serialize_into(frame)?;
    Ok(ProcessingResult::RELEASE.keep_memory())
}

/// NP side: confirms a data request under the request's sequence number
pub fn ser_data_conf(
    app: &mut TestApp,
    handle: Handle,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    let slot = &app.slots[handle];
    DataConf {
        status: STATUS_SUCCESS,
        dst_addr: slot.dst_addr,
        dst_endpoint: slot.dst_endpoint,
    }
    .serialize_into(frame)?;
    frame.sequence = slot.reply_sequence;
    Ok(ProcessingResult::RELEASE)
}

pub fn ser_oversized(
    _app: &mut TestApp,
    _handle: Handle,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    frame.reset(CommandType::Areq, Domain::ZCL, 0x01);
    frame
        .payload
        .extend_from_slice(&[0u8; 200][..])
        .map_err(|_| ZError::PayloadOverflow)?;
    Ok(ProcessingResult::RELEASE)
}

// Host handlers

pub fn on_next_hop_rsp(
    app: &mut TestApp,
    ctx: &mut HandlerContext<TestApp>,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    let rsp = GetNextHopRsp::deserialize(frame)?;
    if let Some(handle) = ctx.entity() {
        app.slots[handle].next_hop = Some(rsp.next_hop);
    }
    Ok(ProcessingResult::RELEASE)
}

pub fn on_data_conf(
    app: &mut TestApp,
    ctx: &mut HandlerContext<TestApp>,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    let conf = DataConf::deserialize(frame)?;
    if let Some(handle) = ctx.entity() {
        app.slots[handle].conf_status = Some(conf.status);
    }
    ctx.complete_later(notify_conf);
    Ok(ProcessingResult::RELEASE)
}

pub fn notify_conf(app: &mut TestApp, entity: Option<Handle>) {
    app.completions.push(entity);
}

pub fn on_device_announce(
    app: &mut TestApp,
    _ctx: &mut HandlerContext<TestApp>,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    app.announced.push(DeviceAnnounceInd::deserialize(frame)?);
    Ok(ProcessingResult::RELEASE)
}

// Network processor handlers

pub fn np_get_next_hop(
    app: &mut TestApp,
    _ctx: &mut HandlerContext<TestApp>,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    GetNextHopReq::deserialize(frame)?;
    GetNextHopRsp {
        next_hop: app.route,
    }
    .serialize_into(frame)?;
    Ok(ProcessingResult::RELEASE.keep_frame())
}

pub fn np_forget_reply(
    _app: &mut TestApp,
    _ctx: &mut HandlerContext<TestApp>,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    GetNextHopReq::deserialize(frame)?;
    Ok(ProcessingResult::RELEASE)
}

pub fn np_data_req(
    app: &mut TestApp,
    _ctx: &mut HandlerContext<TestApp>,
    frame: &mut CommandFrame,
) -> ZResult<ProcessingResult> {
    let req = DataReq::deserialize(frame)?;
    let handle = app.add(Slot {
        dst_addr: req.dst_addr,
        dst_endpoint: req.dst_endpoint,
        reply_sequence: frame.sequence,
        ..Slot::default()
    });
    app.pending_confs.push(handle);
    Ok(ProcessingResult::RELEASE)
}

pub static HOST_NWK: [CommandEntry<TestApp>; 1] =
    [CommandEntry::new(nwk::GET_NEXT_HOP, on_next_hop_rsp)];

pub static HOST_APS: [CommandEntry<TestApp>; 1] =
    [CommandEntry::new(aps::DATA_CONF, on_data_conf).correlated()];

pub static HOST_ZDO: [CommandEntry<TestApp>; 1] =
    [CommandEntry::new(zdo::DEVICE_ANNOUNCE_IND, on_device_announce)];

pub static NP_NWK: [CommandEntry<TestApp>; 1] =
    [CommandEntry::new(nwk::GET_NEXT_HOP, np_get_next_hop)];

pub static NP_NWK_SILENT: [CommandEntry<TestApp>; 1] =
    [CommandEntry::new(nwk::GET_NEXT_HOP, np_forget_reply)];

pub static NP_APS: [CommandEntry<TestApp>; 1] = [CommandEntry::new(aps::DATA_REQ, np_data_req)];

pub fn host_router() -> FrameRouter<TestApp> {
    let mut router = FrameRouter::new();
    router.register(Domain::NWK, &HOST_NWK).unwrap();
    router.register(Domain::APS, &HOST_APS).unwrap();
    router.register(Domain::ZDO, &HOST_ZDO).unwrap();
    router
}

pub fn np_router() -> FrameRouter<TestApp> {
    FrameRouter::new()
        .with_domain(Domain::NWK, &NP_NWK)
        .and_then(|r| r.with_domain(Domain::APS, &NP_APS))
        .unwrap()
}

pub fn host_config() -> EngineConfig {
    EngineConfig::builder().name("host").role(Role::Host).build()
}

pub fn np_config() -> EngineConfig {
    EngineConfig::builder()
        .name("np")
        .role(Role::NetworkProcessor)
        .build()
}

pub fn host_engine(sched: &Scheduler, port: ScriptedPort) -> TestEngine<'_> {
    Engine::new(host_config(), sched, port, host_router(), TestApp::default())
}

// Frames a peer would send

pub fn next_hop_rsp(sequence: u8, next_hop: u16) -> CommandFrame {
    let mut frame = CommandFrame::default();
    frame.sequence = sequence;
    GetNextHopRsp { next_hop }.serialize_into(&mut frame).unwrap();
    frame
}

pub fn device_announce(sequence: u8, nwk_addr: u16) -> CommandFrame {
    let mut frame = CommandFrame::default();
    frame.sequence = sequence;
    DeviceAnnounceInd {
        nwk_addr,
        ieee_addr: 0x00124B00_0000_0000 | nwk_addr as u64,
        capability: 0x8E,
    }
    .serialize_into(&mut frame)
    .unwrap();
    frame
}

pub fn data_conf(sequence: u8, dst_addr: u16) -> CommandFrame {
    let mut frame = CommandFrame::default();
    frame.sequence = sequence;
    DataConf {
        status: STATUS_SUCCESS,
        dst_addr,
        dst_endpoint: 1,
    }
    .serialize_into(&mut frame)
    .unwrap();
    frame
}

pub fn next_hop_req(sequence: u8, short_addr: u16) -> CommandFrame {
    let mut frame = CommandFrame::default();
    frame.sequence = sequence;
    GetNextHopReq { short_addr }
        .serialize_into(&mut frame)
        .unwrap();
    frame
}

/// Builds the peer's answer to a frame the engine wrote
pub type Responder = fn(&CommandFrame) -> Vec<CommandFrame>;

/// Answers every route query with next hop 0x5678
pub fn answer_next_hop(frame: &CommandFrame) -> Vec<CommandFrame> {
    if GetNextHopReq::matches(frame) {
        vec![next_hop_rsp(frame.sequence, 0x5678)]
    } else {
        Vec::new()
    }
}

/// In-memory port whose peer is a script
#[derive(Default)]
pub struct ScriptedPort {
    pub rx: VecDeque<u8>,
    pub sent: Vec<CommandFrame>,
    pub busy: bool,
    pub responder: Option<Responder>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(responder: Responder) -> Self {
        Self {
            responder: Some(responder),
            ..Self::default()
        }
    }

    /// Queue a frame as if the peer had sent it
    pub fn inject(&mut self, frame: &CommandFrame) {
        self.rx.extend(frame.to_bytes().iter().copied());
    }
}

impl SerialPort for ScriptedPort {
    type Error = ();

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn write(&mut self, bytes: &[u8]) -> nb::Result<(), ()> {
        let frame = CommandFrame::decode(bytes).map_err(|_| nb::Error::Other(()))?;
        if let Some(responder) = self.responder {
            for reply in responder(&frame) {
                self.inject(&reply);
            }
        }
        self.sent.push(frame);
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, ()> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// One end of an in-memory full-duplex link
pub struct ChannelPort {
    tx: Sender<u8>,
    rx: Receiver<u8>,
}

impl ChannelPort {
    pub fn pair() -> (ChannelPort, ChannelPort) {
        let (a_tx, b_rx) = channel();
        let (b_tx, a_rx) = channel();
        (
            ChannelPort { tx: a_tx, rx: a_rx },
            ChannelPort { tx: b_tx, rx: b_rx },
        )
    }
}

impl SerialPort for ChannelPort {
    type Error = ();

    fn is_busy(&self) -> bool {
        false
    }

    fn write(&mut self, bytes: &[u8]) -> nb::Result<(), ()> {
        for &byte in bytes {
            self.tx.send(byte).map_err(|_| nb::Error::Other(()))?;
        }
        Ok(())
    }

    fn read(&mut self) -> nb::Result<u8, ()> {
        match self.rx.try_recv() {
            Ok(byte) => Ok(byte),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Err(nb::Error::WouldBlock),
        }
    }
}
