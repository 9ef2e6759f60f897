#![no_std]
#![forbid(unsafe_code)]

//! # ZAppSI Driver
//!
//! The command multiplexing engine. It turns a byte-oriented serial link
//! into an RPC-like channel with three kinds of traffic:
//!
//! - **SREQ/SRSP**: a blocking request and its response. At most one SREQ is
//!   outstanding; the caller does not return until the SRSP is handled.
//! - **AREQ**: fire-and-forget requests, confirmations and indications. An
//!   AREQ that finds no free frame block is postponed and retried in order.
//! - **Correlated replies**: an AREQ answering an earlier AREQ, routed back
//!   to the caller's entity by sequence number.
//!
//! All work runs on one cooperative task. The engine owns its frame pools,
//! queues and link; nothing is global.

pub mod config;
pub mod engine;
pub mod entity;
pub mod link;
pub mod router;

pub use config::*;
pub use engine::*;
pub use entity::*;
pub use link::*;
pub use router::*;

pub use zappsi_core::{CommandFrame, CommandType, Domain, ProcessingResult, ZError, ZResult};
pub use zappsi_mem::{FrameBuffer, PoolKind, PoolStats};
pub use zappsi_sched::{Scheduler, Task, TaskId};

/// Received frames the engine can hold before servicing them
pub const RX_QUEUE_DEPTH: usize = 8;

/// Largest ack-credit window; one queue slot stays free for an SRSP
pub const MAX_RX_WINDOW: u8 = (RX_QUEUE_DEPTH - 1) as u8;

/// Encoded frames the link can hold while the port is busy
pub const TX_QUEUE_DEPTH: usize = 4;

/// AREQs that can wait for a mutual-pool block
pub const POSTPONED_DEPTH: usize = 8;

/// Completions that can wait for a tick
pub const COMPLETED_DEPTH: usize = 8;

/// Outstanding AREQs awaiting a correlated reply
pub const MAX_BEARING_ENTITIES: usize = 16;

const _: () = assert!(MAX_BEARING_ENTITIES < 256, "sequence numbers must outnumber bearing entities");

/// Halt on an unrecoverable condition.
///
/// The peer is trusted and version-matched, so a protocol violation means
/// the two sides disagree about the protocol and there is no safe way on.
/// The platform's panic handler is the system fault path.
#[cold]
#[track_caller]
pub fn fatal(err: ZError) -> ! {
    log::error!("zappsi: fatal: {}", err);
    panic!("zappsi: {}", err)
}
