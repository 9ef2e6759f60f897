//! Two-level command dispatch: domain table, then command id

use core::fmt;

use zappsi_core::{Domain, ZError, ZResult, MAX_DOMAINS};

use crate::{Application, Handler};

/// One routable command
pub struct CommandEntry<A: Application> {
    pub command_id: u8,
    pub handler: Handler<A>,
    /// The command answers an earlier AREQ and is routed to its bearing
    /// entity by sequence number
    pub correlated: bool,
}

impl<A: Application> CommandEntry<A> {
    pub const fn new(command_id: u8, handler: Handler<A>) -> Self {
        Self {
            command_id,
            handler,
            correlated: false,
        }
    }

    /// Mark the command as the reply to an earlier AREQ
    pub const fn correlated(mut self) -> Self {
        self.correlated = true;
        self
    }
}

// Derives would require `A: Clone`.
impl<A: Application> Clone for CommandEntry<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: Application> Copy for CommandEntry<A> {}

impl<A: Application> fmt::Debug for CommandEntry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("command_id", &self.command_id)
            .field("correlated", &self.correlated)
            .finish()
    }
}

/// Maps `(domain, command_id)` to a handler.
///
/// Each domain slot holds a static table of entries. A lookup that finds
/// nothing is an error; the router never drops a frame silently.
pub struct FrameRouter<A: Application + 'static> {
    domains: [Option<&'static [CommandEntry<A>]>; MAX_DOMAINS],
}

impl<A: Application + 'static> FrameRouter<A> {
    pub const fn new() -> Self {
        Self {
            domains: [None; MAX_DOMAINS],
        }
    }

    /// Install the command table for `domain`, replacing any previous one
    pub fn register(&mut self, domain: Domain, table: &'static [CommandEntry<A>]) -> ZResult<()> {
        let index = domain.index().ok_or(ZError::UnknownDomain(domain.raw()))?;
        self.domains[index] = Some(table);
        Ok(())
    }

    /// Builder form of [`FrameRouter::register`]
    pub fn with_domain(mut self, domain: Domain, table: &'static [CommandEntry<A>]) -> ZResult<Self> {
        self.register(domain, table)?;
        Ok(self)
    }

    pub fn find(&self, domain: Domain, command_id: u8) -> ZResult<CommandEntry<A>> {
        let table = domain
            .index()
            .and_then(|index| self.domains[index])
            .ok_or(ZError::UnknownDomain(domain.raw()))?;

        table
            .iter()
            .find(|entry| entry.command_id == command_id)
            .copied()
            .ok_or(ZError::UnknownCommand {
                domain: domain.raw(),
                command_id,
            })
    }

    pub fn has_domain(&self, domain: Domain) -> bool {
        domain
            .index()
            .map_or(false, |index| self.domains[index].is_some())
    }
}

impl<A: Application + 'static> Default for FrameRouter<A> {
    fn default() -> Self {
        Self::new()
    }
}
