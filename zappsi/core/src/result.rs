//! Buffer disposition after a (de)serialization call
//!
//! Every serializer and handler tells the engine what happens to the two
//! objects it touched: the caller entity and the frame buffer.

use core::fmt;

/// What the engine does with an object once a call returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    /// The engine hands the object back to its owner
    #[default]
    Release,
    /// The object stays alive; the engine must not free it
    Retain,
}

impl Disposition {
    pub const fn is_retained(self) -> bool {
        matches!(self, Disposition::Retain)
    }
}

/// Outcome of a serializer or handler call.
///
/// `memory` refers to the caller entity. A retained entity keeps living with
/// its owner, usually because a reply is still expected.
///
/// `frame` refers to the frame buffer. On the receive path a retained frame
/// carries a reply written over the request and is transmitted back before
/// it returns to its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessingResult {
    pub memory: Disposition,
    pub frame: Disposition,
}

impl ProcessingResult {
    /// Release both the entity and the frame
    pub const RELEASE: ProcessingResult = ProcessingResult {
        memory: Disposition::Release,
        frame: Disposition::Release,
    };

    pub const fn new(memory: Disposition, frame: Disposition) -> Self {
        Self { memory, frame }
    }

    /// Keep the caller entity alive
    pub const fn keep_memory(mut self) -> Self {
        self.memory = Disposition::Retain;
        self
    }

    /// Keep the frame buffer
    pub const fn keep_frame(mut self) -> Self {
        self.frame = Disposition::Retain;
        self
    }
}

impl fmt::Display for ProcessingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory={:?} frame={:?}",
            self.memory, self.frame
        )
    }
}
