#![no_std]
#![forbid(unsafe_code)]

//! # ZAppSI Cooperative Scheduler
//!
//! Run-to-completion task dispatch. A task is "posted" by setting its bit;
//! one scheduling pass runs every posted task once, highest id first. There
//! is no preemption, so a task body never observes another task mid-run.
//!
//! While a synchronous request is outstanding the scheduler is locked to a
//! subset of tasks (normally just the transport pump). Tasks outside the lock
//! stay posted and run after [`Scheduler::unlock`].

use core::cell::Cell;
use core::fmt;

use critical_section::Mutex;

/// Number of task slots
pub const MAX_TASKS: usize = 32;

/// Task identifier; also its priority (higher runs first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u8);

impl TaskId {
    /// Create a task id.
    ///
    /// Panics if `id` is not below [`MAX_TASKS`].
    pub const fn new(id: u8) -> Self {
        assert!((id as usize) < MAX_TASKS, "task id out of range");
        TaskId(id)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    const fn bit(self) -> u32 {
        1u32 << self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "task{}", self.0);
    }
}

/// Set of task ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskMask(u32);

impl TaskMask {
    pub const NONE: TaskMask = TaskMask(0);
    pub const ALL: TaskMask = TaskMask(u32::MAX);

    /// Mask holding a single task
    pub const fn of(id: TaskId) -> Self {
        TaskMask(id.bit())
    }

    pub const fn with(self, id: TaskId) -> Self {
        TaskMask(self.0 | id.bit())
    }

    pub const fn contains(self, id: TaskId) -> bool {
        self.0 & id.bit() != 0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Scheduler lock state returned by [`Scheduler::lock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedStatus {
    /// The scheduler was already locked to this mask
    Locked(TaskMask),
    Unlocked,
}

impl SchedStatus {
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

/// A unit of cooperative work
pub trait Task {
    fn id(&self) -> TaskId;

    /// Run once to completion
    fn run(&mut self);
}

/// Cooperative scheduler state.
///
/// Every method takes `&self`; state lives behind critical sections so
/// [`Scheduler::post`] may be called from interrupt context.
pub struct Scheduler {
    posted: Mutex<Cell<u32>>,
    allowed: Mutex<Cell<u32>>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            posted: Mutex::new(Cell::new(0)),
            allowed: Mutex::new(Cell::new(u32::MAX)),
        }
    }

    /// Mark a task as ready to run
    pub fn post(&self, id: TaskId) {
        critical_section::with(|cs| {
            let posted = self.posted.borrow(cs);
            posted.set(posted.get() | id.bit());
        });
    }

    pub fn is_posted(&self, id: TaskId) -> bool {
        critical_section::with(|cs| self.posted.borrow(cs).get() & id.bit() != 0)
    }

    /// True if some posted task is allowed to run
    pub fn has_pending(&self) -> bool {
        critical_section::with(|cs| {
            self.posted.borrow(cs).get() & self.allowed.borrow(cs).get() != 0
        })
    }

    /// Restrict dispatch to `mask`, returning the state to restore
    pub fn lock(&self, mask: TaskMask) -> SchedStatus {
        let prev = critical_section::with(|cs| {
            let allowed = self.allowed.borrow(cs);
            let prev = allowed.get();
            allowed.set(prev & mask.bits());
            prev
        });
        log::trace!("sched: lock {:#010x}", mask.bits());
        if prev == u32::MAX {
            SchedStatus::Unlocked
        } else {
            SchedStatus::Locked(TaskMask(prev))
        }
    }

    /// Undo a [`Scheduler::lock`]
    pub fn unlock(&self, prev: SchedStatus) {
        let restored = match prev {
            SchedStatus::Locked(mask) => mask.bits(),
            SchedStatus::Unlocked => u32::MAX,
        };
        critical_section::with(|cs| self.allowed.borrow(cs).set(restored));
        log::trace!("sched: unlock");
    }

    pub fn is_locked(&self) -> bool {
        critical_section::with(|cs| self.allowed.borrow(cs).get() != u32::MAX)
    }

    /// One scheduling pass.
    ///
    /// Runs every posted, allowed task in `tasks` once, highest id first, and
    /// returns how many ran. The posted bit is cleared before the task body
    /// runs, so a task may re-post itself.
    pub fn run_pending(&self, tasks: &mut [&mut dyn Task]) -> usize {
        let mut ran = 0;
        for raw in (0..MAX_TASKS as u8).rev() {
            let id = TaskId(raw);
            let runnable = critical_section::with(|cs| {
                let posted = self.posted.borrow(cs);
                let ready = posted.get() & self.allowed.borrow(cs).get() & id.bit() != 0;
                if ready {
                    posted.set(posted.get() & !id.bit());
                }
                ready
            });
            if !runnable {
                continue;
            }

            match tasks.iter_mut().find(|task| task.id() == id) {
                Some(task) => {
                    task.run();
                    ran += 1;
                }
                None => log::warn!("sched: {} posted but not registered", id),
            }
        }
        ran
    }

    /// Run passes until no posted task is allowed to run.
    ///
    /// Does not return while a task keeps re-posting itself.
    pub fn run_until_idle(&self, tasks: &mut [&mut dyn Task]) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_pending(tasks);
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (posted, allowed) = critical_section::with(|cs| {
            (self.posted.borrow(cs).get(), self.allowed.borrow(cs).get())
        });
        f.debug_struct("Scheduler")
            .field("posted", &format_args!("{posted:#010x}"))
            .field("allowed", &format_args!("{allowed:#010x}"))
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Scheduler {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Scheduler{{locked: {}}}", self.is_locked());
    }
}
