//! Command domains

use core::fmt;

/// Number of domain slots in the router's first-level table
pub const MAX_DOMAINS: usize = 8;

/// Logical group of commands sharing one command-id namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Domain(pub u8);

impl Domain {
    /// Link configuration and reset
    pub const CONFIG: Domain = Domain(0);
    /// MAC layer
    pub const MAC: Domain = Domain(1);
    /// Network layer
    pub const NWK: Domain = Domain(2);
    /// Application support sublayer
    pub const APS: Domain = Domain(3);
    /// ZigBee device object
    pub const ZDO: Domain = Domain(4);
    /// ZigBee cluster library
    pub const ZCL: Domain = Domain(5);
    /// Hardware abstraction services
    pub const HAL: Domain = Domain(6);

    /// Create a domain from a raw id
    pub const fn new(id: u8) -> Self {
        Domain(id)
    }

    /// Get the raw domain id
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Index into a [`MAX_DOMAINS`] sized table, if the id fits
    pub const fn index(self) -> Option<usize> {
        if (self.0 as usize) < MAX_DOMAINS {
            Some(self.0 as usize)
        } else {
            None
        }
    }

    /// Short upper-case name for known domains
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("CONFIG"),
            1 => Some("MAC"),
            2 => Some("NWK"),
            3 => Some("APS"),
            4 => Some("ZDO"),
            5 => Some("ZCL"),
            6 => Some("HAL"),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Domain({})", self.0),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Domain {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Domain({})", self.0);
    }
}
