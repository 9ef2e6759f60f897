//! Driver state machine
//!
//! One [`Engine`] per end of the link. It owns the frame pools, the link and
//! every queue, and runs as a single cooperative task:
//!
//! - `inbound`: received frames waiting for service, one ack credit each
//! - `postponed`: AREQs that found the mutual pool empty, oldest first
//! - `completed`: deferred handler completions
//! - `bearing`: host-side AREQs waiting for a correlated reply

use core::fmt;

use heapless::{Deque, Vec};
use zappsi_core::{CommandFrame, CommandType, ProcessingResult, SequenceGenerator, ZError, ZResult};
use zappsi_mem::{FrameBuffer, MemoryManager, PoolKind, DEFAULT_MUTUAL_BLOCKS, DEFAULT_SREQ_BLOCKS};
use zappsi_sched::{Scheduler, Task, TaskId, TaskMask};

use crate::entity::{CompletedAreq, PostponedAreq};
use crate::{
    fatal, Application, BearingEntity, EngineConfig, FrameRouter, HandlerContext, Role, SerialLink,
    SerialPort, Serializer, COMPLETED_DEPTH, MAX_BEARING_ENTITIES, POSTPONED_DEPTH, RX_QUEUE_DEPTH,
};

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    /// Exactly one SREQ is outstanding
    Blocked,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DriverState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            DriverState::Idle => defmt::write!(fmt, "Idle"),
            DriverState::Blocked => defmt::write!(fmt, "Blocked"),
        }
    }
}

/// The command multiplexing engine
pub struct Engine<
    's,
    P: SerialPort,
    A: Application + 'static,
    const S: usize = DEFAULT_SREQ_BLOCKS,
    const M: usize = DEFAULT_MUTUAL_BLOCKS,
> {
    config: EngineConfig,
    sched: &'s Scheduler,
    link: SerialLink<P>,
    mem: MemoryManager<S, M>,
    router: FrameRouter<A>,
    app: A,
    state: DriverState,
    sequence: SequenceGenerator,
    inbound: Deque<CommandFrame, RX_QUEUE_DEPTH>,
    postponed: Deque<PostponedAreq<A>, POSTPONED_DEPTH>,
    completed: Deque<CompletedAreq<A>, COMPLETED_DEPTH>,
    bearing: Vec<BearingEntity<A::Handle>, MAX_BEARING_ENTITIES>,
}

impl<'s, P, A, const S: usize, const M: usize> Engine<'s, P, A, S, M>
where
    P: SerialPort,
    A: Application + 'static,
{
    pub fn new(
        config: EngineConfig,
        sched: &'s Scheduler,
        port: P,
        router: FrameRouter<A>,
        app: A,
    ) -> Self {
        log::debug!("{}: engine up as {}", config.name, config.role);
        Self {
            config,
            sched,
            link: SerialLink::new(port, config.rx_window),
            mem: MemoryManager::new(),
            router,
            app,
            state: DriverState::Idle,
            sequence: SequenceGenerator::new(),
            inbound: Deque::new(),
            postponed: Deque::new(),
            completed: Deque::new(),
            bearing: Vec::new(),
        }
    }

    /// Continue numbering frames from `first`
    pub fn with_sequence_start(mut self, first: u8) -> Self {
        self.sequence = SequenceGenerator::starting_at(first);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn link(&self) -> &SerialLink<P> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut SerialLink<P> {
        &mut self.link
    }

    pub fn memory(&self) -> &MemoryManager<S, M> {
        &self.mem
    }

    /// Take a frame block from the engine's pools
    pub fn allocate(&mut self, kind: PoolKind) -> Option<FrameBuffer> {
        self.mem.allocate(kind)
    }

    /// Return a frame block; postponed work may now proceed
    pub fn free(&mut self, buffer: FrameBuffer) {
        self.mem.free(buffer);
        self.schedule_if_work();
    }

    pub fn postponed_len(&self) -> usize {
        self.postponed.len()
    }

    pub fn is_postponed(&self, handle: A::Handle) -> bool {
        self.postponed.iter().any(|entry| entry.handle == handle)
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn bearing_len(&self) -> usize {
        self.bearing.len()
    }

    /// Received frames not yet serviced
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Sequence number the next outgoing frame gets
    pub fn next_sequence(&self) -> u8 {
        self.sequence.peek()
    }

    /// Post the engine task, e.g. from a receive interrupt
    pub fn notify(&self) {
        self.sched.post(self.config.task);
    }

    /// Issue an outgoing command.
    ///
    /// `serialize` writes `data_in` into a frame from the pool matching
    /// `command_type`. An AREQ that finds no block, or finds older AREQs
    /// still postponed, is queued and retried on a later tick without the
    /// caller hearing about it. An SREQ returns only after its SRSP has been
    /// handed to the matching handler with `data_out` as its entity.
    ///
    /// Returns `OutOfMemory` for an SREQ or SRSP when its pool is empty, and
    /// any error the serializer reports.
    pub fn process_command(
        &mut self,
        command_type: CommandType,
        data_in: A::Handle,
        serialize: Serializer<A>,
        data_out: Option<A::Handle>,
    ) -> ZResult<()> {
        if command_type == CommandType::Sreq && self.state == DriverState::Blocked {
            fatal(ZError::SreqInProgress);
        }

        if command_type == CommandType::Areq && !self.postponed.is_empty() {
            self.postpone(data_in, serialize);
            return Ok(());
        }

        let Some(buffer) = self.mem.allocate(PoolKind::for_command(command_type)) else {
            if command_type == CommandType::Areq {
                self.postpone(data_in, serialize);
                return Ok(());
            }
            log::warn!("{}: no frame block for {}", self.config.name, command_type);
            return Err(ZError::OutOfMemory);
        };

        self.dispatch(buffer, command_type, data_in, serialize, data_out)
    }

    /// One unit of engine work.
    ///
    /// Pumps the link, then services at most one of: an inbound frame, the
    /// oldest postponed AREQ, a deferred completion. Re-posts the task while
    /// work remains.
    pub fn tick(&mut self) {
        self.pump();

        match self.state {
            DriverState::Idle => {
                if self.can_receive() {
                    self.service_inbound();
                } else if self.can_retry() {
                    self.retry_postponed();
                } else if let Some(done) = self.completed.pop_front() {
                    self.complete(done);
                }
            }
            // The blocking call pumps the link and takes its SRSP itself.
            DriverState::Blocked => {}
        }

        self.schedule_if_work();
    }

    /// True if a tick would make progress
    pub fn has_work(&self) -> bool {
        self.link.is_busy() || self.can_receive() || self.can_retry() || !self.completed.is_empty()
    }

    fn can_receive(&self) -> bool {
        if self.link.credits() == 0 {
            return false;
        }
        match self.inbound.front() {
            // Serviced only to report the violation.
            Some(frame) if frame.command_type == CommandType::Srsp => true,
            Some(frame) => self
                .mem
                .is_available(PoolKind::for_command(frame.command_type)),
            None => false,
        }
    }

    fn can_retry(&self) -> bool {
        !self.postponed.is_empty() && self.mem.is_available(PoolKind::Mutual)
    }

    fn schedule_if_work(&self) {
        if self.has_work() {
            self.sched.post(self.config.task);
        }
    }

    fn pump(&mut self) {
        if let Err(err) = self.link.pump(&mut self.inbound) {
            fatal(err);
        }
    }

    /// Like [`Engine::pump`], but reads past the credit window to reach the SRSP
    fn pump_reply(&mut self) {
        let result = self
            .link
            .flush()
            .and_then(|()| self.link.ingest_reply(&mut self.inbound));
        if let Err(err) = result {
            fatal(err);
        }
    }

    fn yield_now(&self) {
        if let Some(hook) = self.config.yield_hook {
            hook();
        }
    }

    fn postpone(&mut self, handle: A::Handle, serializer: Serializer<A>) {
        if self
            .postponed
            .push_back(PostponedAreq { handle, serializer })
            .is_err()
        {
            fatal(ZError::QueueFull);
        }
        log::warn!(
            "{}: AREQ {:?} postponed ({} waiting)",
            self.config.name,
            handle,
            self.postponed.len()
        );
        self.schedule_if_work();
    }

    fn retry_postponed(&mut self) {
        let Some(buffer) = self.mem.allocate(PoolKind::Mutual) else {
            return;
        };
        let Some(entry) = self.postponed.pop_front() else {
            self.mem.free(buffer);
            return;
        };

        log::trace!("{}: retrying AREQ {:?}", self.config.name, entry.handle);
        if let Err(err) = self.dispatch(buffer, CommandType::Areq, entry.handle, entry.serializer, None) {
            fatal(err);
        }
    }

    /// Serialize into `buffer`, register the bearing entity and send
    fn dispatch(
        &mut self,
        mut buffer: FrameBuffer,
        command_type: CommandType,
        data_in: A::Handle,
        serialize: Serializer<A>,
        data_out: Option<A::Handle>,
    ) -> ZResult<()> {
        buffer.command_type = command_type;
        buffer.sequence = self.next_free_sequence();

        let result = match serialize(&mut self.app, data_in, buffer.frame_mut()) {
            Ok(result) => result,
            Err(err) => {
                self.mem.free(buffer);
                return Err(err);
            }
        };
        debug_assert_eq!(buffer.command_type, command_type, "serializer changed the command type");
        debug_assert!(
            !result.frame.is_retained(),
            "outgoing frames return to their pool once sent"
        );

        if self.config.role == Role::Host
            && command_type == CommandType::Areq
            && result.memory.is_retained()
        {
            self.register_bearing(data_in, buffer.sequence);
        }

        self.send_command(buffer, data_out);

        if !result.memory.is_retained() {
            self.app.release(data_in);
        }
        Ok(())
    }

    fn send_command(&mut self, buffer: FrameBuffer, data_out: Option<A::Handle>) {
        match buffer.command_type {
            CommandType::Sreq => self.transact(buffer, data_out),
            CommandType::Areq | CommandType::Srsp => {
                self.transmit(&buffer);
                self.mem.free(buffer);
            }
        }
    }

    /// Hand a frame to the link, waiting for queue space if needed
    fn transmit(&mut self, frame: &CommandFrame) {
        while self.link.is_queue_full() {
            self.pump();
            self.yield_now();
        }
        log::debug!("{}: tx {}", self.config.name, frame);
        if let Err(err) = self.link.send(frame) {
            fatal(err);
        }
    }

    /// Send an SREQ and wait for its SRSP.
    ///
    /// There is no timeout: a silent peer keeps the caller here.
    fn transact(&mut self, buffer: FrameBuffer, data_out: Option<A::Handle>) {
        if self.state == DriverState::Blocked {
            fatal(ZError::SreqInProgress);
        }
        self.state = DriverState::Blocked;
        let status = self.sched.lock(TaskMask::of(self.config.transport_task));
        log::debug!("{}: blocked on {}", self.config.name, buffer.frame());

        while self.link.is_busy() {
            self.pump();
            self.yield_now();
        }
        let sequence = buffer.sequence;
        self.transmit(&buffer);
        self.mem.free(buffer);

        let mut srsp = loop {
            self.pump_reply();
            if let Some(frame) = self.take_srsp() {
                break frame;
            }
            self.yield_now();
        };
        if srsp.sequence != sequence {
            fatal(ZError::UnexpectedSrsp {
                sequence: srsp.sequence,
            });
        }

        self.receive_command(data_out, &mut srsp);

        self.state = DriverState::Idle;
        self.sched.unlock(status);
        log::debug!("{}: unblocked", self.config.name);
        self.schedule_if_work();
    }

    /// Pull the SRSP out of `inbound`, leaving other frames in order
    fn take_srsp(&mut self) -> Option<CommandFrame> {
        let position = self
            .inbound
            .iter()
            .position(|frame| frame.command_type == CommandType::Srsp)?;
        debug_assert_eq!(
            self.inbound.len(),
            self.link.credits() as usize,
            "every queued frame holds one credit"
        );
        self.link.consume_credit();

        let len = self.inbound.len();
        for _ in 0..position {
            if let Some(frame) = self.inbound.pop_front() {
                let _ = self.inbound.push_back(frame);
            }
        }
        let srsp = self.inbound.pop_front();
        for _ in 0..len - 1 - position {
            if let Some(frame) = self.inbound.pop_front() {
                let _ = self.inbound.push_back(frame);
            }
        }

        log::trace!("{}: took SRSP, {} frames still queued", self.config.name, self.inbound.len());
        srsp
    }

    /// Move the oldest inbound frame into a pool block and dispatch it
    fn service_inbound(&mut self) {
        let Some(front) = self.inbound.front() else {
            return;
        };
        let command_type = front.command_type;
        if command_type == CommandType::Srsp {
            fatal(ZError::UnexpectedSrsp {
                sequence: front.sequence,
            });
        }

        let Some(mut buffer) = self.mem.allocate(PoolKind::for_command(command_type)) else {
            return;
        };
        if let Some(frame) = self.inbound.pop_front() {
            *buffer.frame_mut() = frame;
        }
        self.link.consume_credit();

        let result = self.receive_command(None, buffer.frame_mut());

        if command_type == CommandType::Sreq {
            // The reply was written over the request.
            if !result.frame.is_retained() || buffer.command_type != CommandType::Srsp {
                fatal(ZError::MissingReply {
                    domain: buffer.domain.raw(),
                    command_id: buffer.command_id,
                });
            }
            self.transmit(&buffer);
        } else {
            debug_assert!(
                !result.frame.is_retained(),
                "only an SREQ turnaround keeps its frame"
            );
        }
        self.mem.free(buffer);
    }

    /// Route `frame` to its handler and settle the entity it names
    fn receive_command(
        &mut self,
        entity: Option<A::Handle>,
        frame: &mut CommandFrame,
    ) -> ProcessingResult {
        let entry = self
            .router
            .find(frame.domain, frame.command_id)
            .unwrap_or_else(|err| fatal(err));

        let entity = if entry.correlated {
            Some(self.take_bearing(frame.sequence))
        } else {
            entity
        };

        log::debug!("{}: rx {} -> {:?}", self.config.name, frame, entity);
        let mut ctx = HandlerContext::new(entity, self.config.role);
        let result = (entry.handler)(&mut self.app, &mut ctx, frame).unwrap_or_else(|err| fatal(err));

        let release = !result.memory.is_retained();
        if let Some(callback) = ctx.take_deferred() {
            if self
                .completed
                .push_back(CompletedAreq {
                    entity,
                    callback,
                    release,
                })
                .is_err()
            {
                fatal(ZError::QueueFull);
            }
        } else if release {
            if let Some(handle) = entity {
                self.app.release(handle);
            }
        }
        result
    }

    fn complete(&mut self, done: CompletedAreq<A>) {
        log::trace!("{}: completing {:?}", self.config.name, done.entity);
        (done.callback)(&mut self.app, done.entity);
        if done.release {
            if let Some(handle) = done.entity {
                self.app.release(handle);
            }
        }
    }

    /// Next sequence number not held by an AREQ still awaiting its reply.
    ///
    /// Ends because the bearing table holds fewer than 256 entries.
    fn next_free_sequence(&mut self) -> u8 {
        loop {
            let sequence = self.sequence.next_sequence();
            if !self.bearing.iter().any(|b| b.sequence == sequence) {
                return sequence;
            }
            log::trace!("{}: #{} still awaits a reply, skipped", self.config.name, sequence);
        }
    }

    fn register_bearing(&mut self, handle: A::Handle, sequence: u8) {
        debug_assert!(
            self.bearing.iter().all(|b| b.sequence != sequence),
            "sequence numbers of outstanding AREQs are unique"
        );
        if self
            .bearing
            .push(BearingEntity { handle, sequence })
            .is_err()
        {
            fatal(ZError::QueueFull);
        }
        log::trace!("{}: {:?} awaits reply #{}", self.config.name, handle, sequence);
    }

    fn take_bearing(&mut self, sequence: u8) -> A::Handle {
        match self.bearing.iter().position(|b| b.sequence == sequence) {
            Some(index) => self.bearing.remove(index).handle,
            None => fatal(ZError::UnmatchedReply { sequence }),
        }
    }
}

impl<'s, P, A, const S: usize, const M: usize> Task for Engine<'s, P, A, S, M>
where
    P: SerialPort,
    A: Application + 'static,
{
    fn id(&self) -> TaskId {
        self.config.task
    }

    fn run(&mut self) {
        self.tick();
    }
}

impl<'s, P, A, const S: usize, const M: usize> fmt::Debug for Engine<'s, P, A, S, M>
where
    P: SerialPort,
    A: Application + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.config.name)
            .field("role", &self.config.role)
            .field("state", &self.state)
            .field("link", &self.link)
            .field("inbound", &self.inbound.len())
            .field("postponed", &self.postponed.len())
            .field("completed", &self.completed.len())
            .field("bearing", &self.bearing.len())
            .finish()
    }
}
