//! Construction-time configuration.
//!
//! Replaces the reference emulator's pattern of reaching a single global
//! drive instance through the host bridge (see the design notes in the
//! governing spec): every [`Drive`](crate::drive::Drive) is built from an
//! explicit [`DriveConfig`] and owns its own state, so two drives never
//! interact.

use crate::disc::Disc;
use crate::irq::IrqLine;

/// Knobs for [`Drive::new`](crate::drive::Drive::new).
pub struct DriveConfig {
    pub vendor: String,
    pub firmware_version: String,
    pub firmware_date: String,
    pub irq: Box<dyn IrqLine>,
    pub initial_disc: Option<Box<dyn Disc>>,
}

impl DriveConfig {
    pub fn new(irq: Box<dyn IrqLine>) -> Self {
        DriveConfig {
            vendor: "SE".to_string(),
            firmware_version: "Rev 6.43".to_string(),
            firmware_date: "990408".to_string(),
            irq,
            initial_disc: None,
        }
    }

    pub fn with_disc(mut self, disc: Box<dyn Disc>) -> Self {
        self.initial_disc = Some(disc);
        self
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }
}
