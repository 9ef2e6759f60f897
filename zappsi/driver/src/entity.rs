//! Caller entities and the callback types that operate on them
//!
//! The engine never holds caller memory directly. It holds an
//! [`Application::Handle`] and hands it back through [`Application::release`]
//! once neither the engine nor a pending reply needs it.

use core::fmt;

use zappsi_core::{CommandFrame, ProcessingResult, ZResult};

use crate::Role;

/// The code on top of the engine that owns caller entities
pub trait Application {
    /// Names one caller-owned entity (request record, reply slot, ...)
    type Handle: Copy + Eq + fmt::Debug;

    /// The engine is done with `handle`
    fn release(&mut self, handle: Self::Handle);
}

/// Writes an outgoing command into `frame`.
///
/// The frame arrives with its type set and a fresh sequence number; the
/// serializer sets domain and command id, may overwrite the sequence number,
/// and writes the payload.
pub type Serializer<A> = fn(
    &mut A,
    <A as Application>::Handle,
    &mut CommandFrame,
) -> ZResult<ProcessingResult>;

/// Reads an incoming command. May rewrite `frame` in place as the reply.
pub type Handler<A> =
    fn(&mut A, &mut HandlerContext<A>, &mut CommandFrame) -> ZResult<ProcessingResult>;

/// Deferred completion run on a later engine tick
pub type Completion<A> = fn(&mut A, Option<<A as Application>::Handle>);

/// What a handler knows about the frame it is servicing
pub struct HandlerContext<A: Application> {
    entity: Option<A::Handle>,
    role: Role,
    deferred: Option<Completion<A>>,
}

impl<A: Application> HandlerContext<A> {
    pub(crate) fn new(entity: Option<A::Handle>, role: Role) -> Self {
        Self {
            entity,
            role,
            deferred: None,
        }
    }

    /// Caller entity the frame is routed to: the waiting SREQ's output slot,
    /// or the bearing entity of a correlated reply
    pub fn entity(&self) -> Option<A::Handle> {
        self.entity
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Run `callback` with this frame's entity on a later tick.
    ///
    /// The entity is released after the callback unless the handler
    /// retained it.
    pub fn complete_later(&mut self, callback: Completion<A>) {
        self.deferred = Some(callback);
    }

    pub(crate) fn take_deferred(&mut self) -> Option<Completion<A>> {
        self.deferred.take()
    }
}

/// Host-side record tying an outstanding AREQ to its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BearingEntity<H> {
    pub handle: H,
    pub sequence: u8,
}

/// AREQ waiting for a mutual-pool block
pub(crate) struct PostponedAreq<A: Application> {
    pub handle: A::Handle,
    pub serializer: Serializer<A>,
}

/// Completion waiting for its tick
pub(crate) struct CompletedAreq<A: Application> {
    pub entity: Option<A::Handle>,
    pub callback: Completion<A>,
    pub release: bool,
}
