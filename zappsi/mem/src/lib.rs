#![no_std]
#![forbid(unsafe_code)]

//! # ZAppSI Memory Management
//!
//! Fixed frame-buffer pools. Synchronous requests draw from a small
//! dedicated pool; asynchronous requests and synchronous responses share the
//! "mutual" pool. Blocks are owned values: a [`FrameBuffer`] is either inside
//! its pool or held by exactly one owner, and giving it back consumes it.

use core::fmt;

use zappsi_core::CommandType;

pub mod pools;

pub use pools::*;

/// Which pool a frame buffer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Reserved for the single outstanding synchronous request
    Sreq,
    /// Shared by AREQ and SRSP traffic
    Mutual,
}

impl PoolKind {
    /// Pool a frame of the given type is allocated from
    pub const fn for_command(command_type: CommandType) -> Self {
        match command_type {
            CommandType::Sreq => PoolKind::Sreq,
            CommandType::Areq | CommandType::Srsp => PoolKind::Mutual,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Sreq => write!(f, "sreq"),
            PoolKind::Mutual => write!(f, "mutual"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PoolKind {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            PoolKind::Sreq => defmt::write!(fmt, "sreq"),
            PoolKind::Mutual => defmt::write!(fmt, "mutual"),
        }
    }
}

/// Frame pool statistics for debugging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of blocks in the pool
    pub total_blocks: usize,
    /// Number of free blocks currently available
    pub free_blocks: usize,
    /// Number of blocks currently in use
    pub used_blocks: usize,
    /// Minimum number of free blocks ever reached
    pub min_free_blocks: usize,
}

impl PoolStats {
    /// Create new pool statistics
    pub const fn new(total_blocks: usize) -> Self {
        Self {
            total_blocks,
            free_blocks: total_blocks,
            used_blocks: 0,
            min_free_blocks: total_blocks,
        }
    }

    /// Update statistics after allocation
    pub fn on_alloc(&mut self) {
        self.used_blocks += 1;
        self.free_blocks -= 1;
        if self.free_blocks < self.min_free_blocks {
            self.min_free_blocks = self.free_blocks;
        }
    }

    /// Update statistics after deallocation
    pub fn on_dealloc(&mut self) {
        if self.used_blocks > 0 {
            self.used_blocks -= 1;
            self.free_blocks += 1;
        }
    }

    /// Check if every block is handed out
    pub const fn is_exhausted(&self) -> bool {
        self.free_blocks == 0
    }

    /// Check if every block is back in the pool
    pub const fn is_idle(&self) -> bool {
        self.used_blocks == 0
    }

    /// Get utilization as a percentage (0-100)
    pub fn utilization(&self) -> u8 {
        if self.total_blocks == 0 {
            0
        } else {
            ((self.used_blocks * 100) / self.total_blocks) as u8
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PoolStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "PoolStats{{ total: {}, free: {}, used: {}, min_free: {} }}",
            self.total_blocks,
            self.free_blocks,
            self.used_blocks,
            self.min_free_blocks
        );
    }
}
