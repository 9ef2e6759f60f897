//! Engine configuration

use core::fmt;

use zappsi_sched::TaskId;

use crate::MAX_RX_WINDOW;

/// Which end of the serial link an engine runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Application processor issuing requests
    Host,
    /// Processor running the ZigBee stack and answering requests
    NetworkProcessor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::NetworkProcessor => write!(f, "np"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Role {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Role::Host => defmt::write!(fmt, "host"),
            Role::NetworkProcessor => defmt::write!(fmt, "np"),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Name used in log records
    pub name: &'static str,
    pub role: Role,
    /// Most inbound frames accepted before the peer must wait
    pub rx_window: u8,
    /// Called on every iteration of a busy-wait
    pub yield_hook: Option<fn()>,
    /// Task id the engine's tick runs under
    pub task: TaskId,
    /// Task left runnable while a synchronous request is outstanding
    pub transport_task: TaskId,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "zappsi",
            role: Role::Host,
            rx_window: 4,
            yield_hook: None,
            task: TaskId::new(1),
            transport_task: TaskId::new(2),
        }
    }
}

impl EngineConfig {
    /// Creates a new engine configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Sets the engine name.
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    /// Sets which end of the link this engine is.
    pub fn role(mut self, role: Role) -> Self {
        self.config.role = role;
        self
    }

    /// Sets the ack-credit window, clamped to `1..=MAX_RX_WINDOW`.
    pub fn rx_window(mut self, window: u8) -> Self {
        self.config.rx_window = window.clamp(1, MAX_RX_WINDOW);
        self
    }

    /// Sets the busy-wait yield callback.
    pub fn yield_hook(mut self, hook: fn()) -> Self {
        self.config.yield_hook = Some(hook);
        self
    }

    /// Sets the task id of the engine itself.
    pub fn task(mut self, task: TaskId) -> Self {
        self.config.task = task;
        self
    }

    /// Sets the task that keeps running during a blocking request.
    pub fn transport_task(mut self, task: TaskId) -> Self {
        self.config.transport_task = task;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
