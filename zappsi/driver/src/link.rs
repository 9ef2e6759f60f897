//! Serial transport pump
//!
//! Wraps a byte-oriented [`SerialPort`] with frame reassembly, an outbound
//! frame queue and the ack-credit counter that bounds how many received
//! frames may wait for service.

use core::fmt;

use heapless::Deque;
use zappsi_core::{CommandFrame, CommandType, FrameAssembler, WireFrame, ZError, ZResult};

use crate::TX_QUEUE_DEPTH;

/// Byte-oriented serial port.
///
/// `write` takes a whole encoded frame; it returns `WouldBlock` when the
/// port cannot accept it yet. `read` yields one received byte or
/// `WouldBlock` when none is pending.
pub trait SerialPort {
    type Error: fmt::Debug;

    /// True while the transmitter is still sending a previous frame
    fn is_busy(&self) -> bool;

    fn write(&mut self, bytes: &[u8]) -> nb::Result<(), Self::Error>;

    fn read(&mut self) -> nb::Result<u8, Self::Error>;
}

/// Transport state for one end of the link
pub struct SerialLink<P: SerialPort> {
    port: P,
    assembler: FrameAssembler,
    outbound: Deque<WireFrame, TX_QUEUE_DEPTH>,
    credits: u8,
    window: u8,
}

impl<P: SerialPort> SerialLink<P> {
    pub fn new(port: P, window: u8) -> Self {
        Self {
            port,
            assembler: FrameAssembler::new(),
            outbound: Deque::new(),
            credits: 0,
            window,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Received frames not yet serviced
    pub fn credits(&self) -> u8 {
        self.credits
    }

    pub fn window(&self) -> u8 {
        self.window
    }

    /// Mark one received frame as serviced
    pub fn consume_credit(&mut self) {
        debug_assert!(self.credits > 0, "ack credit underflow");
        self.credits = self.credits.saturating_sub(1);
    }

    /// True while a frame is queued or the port is transmitting
    pub fn is_busy(&self) -> bool {
        !self.outbound.is_empty() || self.port.is_busy()
    }

    /// True when [`SerialLink::send`] would fail with `QueueFull`
    pub fn is_queue_full(&self) -> bool {
        self.outbound.is_full()
    }

    /// Number of encoded frames waiting for the port
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    /// Transmit now if the link is idle, otherwise queue a copy
    pub fn send(&mut self, frame: &CommandFrame) -> ZResult<()> {
        let wire = frame.to_bytes();
        if self.outbound.is_empty() && !self.port.is_busy() {
            match self.port.write(&wire) {
                Ok(()) => return Ok(()),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(err)) => {
                    log::error!("link: write failed: {:?}", err);
                    return Err(ZError::Transport);
                }
            }
        }

        self.outbound.push_back(wire).map_err(|_| ZError::QueueFull)?;
        log::trace!("link: queued {} ({} waiting)", frame, self.outbound.len());
        Ok(())
    }

    /// Hand queued frames to the port while it accepts them
    pub fn flush(&mut self) -> ZResult<()> {
        while !self.port.is_busy() {
            let Some(wire) = self.outbound.front() else {
                break;
            };
            match self.port.write(wire) {
                Ok(()) => {
                    self.outbound.pop_front();
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(err)) => {
                    log::error!("link: write failed: {:?}", err);
                    return Err(ZError::Transport);
                }
            }
        }
        Ok(())
    }

    /// Read bytes into `inbound` while credit remains.
    ///
    /// Every completed frame takes one credit. Returns the number of frames
    /// added.
    pub fn ingest<const N: usize>(
        &mut self,
        inbound: &mut Deque<CommandFrame, N>,
    ) -> ZResult<usize> {
        let mut added = 0;
        while self.credits < self.window && !inbound.is_full() {
            let Some(frame) = self.next_frame()? else {
                break;
            };
            // Checked for room above.
            let _ = inbound.push_back(frame);
            added += 1;
        }
        Ok(added)
    }

    /// Read past the credit window until an SRSP is queued.
    ///
    /// The peer owes a blocked caller its reply whatever the credit count,
    /// so frames ahead of the SRSP are buffered over the window. They still
    /// take one credit each. Returns true once an SRSP is in `inbound`, and
    /// `QueueFull` if `inbound` fills up without one.
    pub fn ingest_reply<const N: usize>(
        &mut self,
        inbound: &mut Deque<CommandFrame, N>,
    ) -> ZResult<bool> {
        if inbound.iter().any(|frame| frame.command_type == CommandType::Srsp) {
            return Ok(true);
        }
        while !inbound.is_full() {
            let Some(frame) = self.next_frame()? else {
                return Ok(false);
            };
            let reply = frame.command_type == CommandType::Srsp;
            let _ = inbound.push_back(frame);
            if reply {
                return Ok(true);
            }
        }
        log::error!("link: {} frames queued ahead of the SRSP", inbound.len());
        Err(ZError::QueueFull)
    }

    /// Next complete frame, or `None` once the port has no more bytes
    fn next_frame(&mut self) -> ZResult<Option<CommandFrame>> {
        loop {
            let byte = match self.port.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => return Ok(None),
                Err(nb::Error::Other(err)) => {
                    log::error!("link: read failed: {:?}", err);
                    return Err(ZError::Transport);
                }
            };

            if let Some(frame) = self.assembler.push(byte)? {
                log::debug!("link: rx {}", frame);
                self.credits = self.credits.saturating_add(1);
                return Ok(Some(frame));
            }
        }
    }

    /// Flush outbound frames, then ingest inbound ones
    pub fn pump<const N: usize>(&mut self, inbound: &mut Deque<CommandFrame, N>) -> ZResult<usize> {
        self.flush()?;
        self.ingest(inbound)
    }
}

impl<P: SerialPort> fmt::Debug for SerialLink<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialLink")
            .field("credits", &self.credits)
            .field("window", &self.window)
            .field("queued", &self.outbound.len())
            .field("in_frame", &self.assembler.in_frame())
            .finish()
    }
}
