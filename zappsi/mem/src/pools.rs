//! Frame pools and the memory manager

use core::ops::{Deref, DerefMut};

use heapless::Vec;
use zappsi_core::CommandFrame;

use crate::{PoolKind, PoolStats};

/// Default number of blocks in the SREQ pool
pub const DEFAULT_SREQ_BLOCKS: usize = 1;

/// Default number of blocks in the mutual pool
pub const DEFAULT_MUTUAL_BLOCKS: usize = 4;

/// A frame block checked out of a pool.
///
/// Not `Clone`: the only way to obtain one is [`FramePool::allocate`] and the
/// only way to give it back is [`FramePool::free`], which consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    kind: PoolKind,
    frame: CommandFrame,
}

impl FrameBuffer {
    /// Pool this block must be returned to
    pub const fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn frame(&self) -> &CommandFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut CommandFrame {
        &mut self.frame
    }
}

impl Deref for FrameBuffer {
    type Target = CommandFrame;

    fn deref(&self) -> &CommandFrame {
        &self.frame
    }
}

impl DerefMut for FrameBuffer {
    fn deref_mut(&mut self) -> &mut CommandFrame {
        &mut self.frame
    }
}

/// Fixed pool of `N` frame blocks
#[derive(Debug)]
pub struct FramePool<const N: usize> {
    kind: PoolKind,
    blocks: Vec<CommandFrame, N>,
    stats: PoolStats,
}

impl<const N: usize> FramePool<N> {
    /// Create a pool with all `N` blocks free
    pub fn new(kind: PoolKind) -> Self {
        let mut blocks = Vec::new();
        while blocks.push(CommandFrame::default()).is_ok() {}
        Self {
            kind,
            blocks,
            stats: PoolStats::new(N),
        }
    }

    pub const fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Take a cleared block, or `None` when the pool is exhausted
    pub fn allocate(&mut self) -> Option<FrameBuffer> {
        let mut frame = self.blocks.pop()?;
        frame.sequence = 0;
        frame.payload.clear();
        self.stats.on_alloc();
        log::trace!("{} pool: alloc ({} free)", self.kind, self.stats.free_blocks);
        Some(FrameBuffer {
            kind: self.kind,
            frame,
        })
    }

    /// Return a block to the pool
    pub fn free(&mut self, buffer: FrameBuffer) {
        debug_assert_eq!(buffer.kind, self.kind, "block returned to the wrong pool");
        // A block only exists after an allocate, so there is always room.
        if self.blocks.push(buffer.frame).is_ok() {
            self.stats.on_dealloc();
        }
        log::trace!("{} pool: free ({} free)", self.kind, self.stats.free_blocks);
    }

    /// Number of blocks ready to allocate
    pub fn available(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_available(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

/// The two frame pools used by one engine.
///
/// `S` blocks are reserved for synchronous requests; `M` blocks are shared by
/// AREQ and SRSP traffic.
#[derive(Debug)]
pub struct MemoryManager<const S: usize = DEFAULT_SREQ_BLOCKS, const M: usize = DEFAULT_MUTUAL_BLOCKS> {
    sreq: FramePool<S>,
    mutual: FramePool<M>,
}

impl<const S: usize, const M: usize> Default for MemoryManager<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const S: usize, const M: usize> MemoryManager<S, M> {
    pub fn new() -> Self {
        Self {
            sreq: FramePool::new(PoolKind::Sreq),
            mutual: FramePool::new(PoolKind::Mutual),
        }
    }

    /// Take a block from the requested pool
    pub fn allocate(&mut self, kind: PoolKind) -> Option<FrameBuffer> {
        match kind {
            PoolKind::Sreq => self.sreq.allocate(),
            PoolKind::Mutual => self.mutual.allocate(),
        }
    }

    /// Return a block to the pool it came from
    pub fn free(&mut self, buffer: FrameBuffer) {
        match buffer.kind() {
            PoolKind::Sreq => self.sreq.free(buffer),
            PoolKind::Mutual => self.mutual.free(buffer),
        }
    }

    /// True if `allocate(kind)` would succeed
    pub fn is_available(&self, kind: PoolKind) -> bool {
        match kind {
            PoolKind::Sreq => self.sreq.is_available(),
            PoolKind::Mutual => self.mutual.is_available(),
        }
    }

    pub fn available(&self, kind: PoolKind) -> usize {
        match kind {
            PoolKind::Sreq => self.sreq.available(),
            PoolKind::Mutual => self.mutual.available(),
        }
    }

    pub fn stats(&self, kind: PoolKind) -> PoolStats {
        match kind {
            PoolKind::Sreq => self.sreq.stats(),
            PoolKind::Mutual => self.mutual.stats(),
        }
    }
}
