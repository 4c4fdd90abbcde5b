//! The drive aggregate and its MMIO register surface.
//!
//! [`Drive::read_register`]/[`Drive::write_register`] are the only entry
//! points a host bridge adapter calls; everything else (ATA dispatch in
//! [`crate::ata`], SPI dispatch and CD-read streaming in [`crate::spi`]) is
//! reached only from those two methods, keeping every externally observable
//! transition behind one synchronous call as the concurrency model demands.

use tracing::{debug, error, trace};

use crate::buffers::{DmaBuffer, PioBuffer};
use crate::bridge::DmaTarget;
use crate::config::DriveConfig;
use crate::disc::Disc;
use crate::error::GdromFault;
use crate::hardware_info::HardwareInfo;
use crate::irq::IrqLine;
use crate::registers::{DiscFormat, DriveStatus, Registers, SectorNumber, Status};
use crate::spi::CdReadProgress;
use crate::state::DriveState;

/// Register offsets within the drive's MMIO window, per the register
/// surface in the governing spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOffset {
    /// Read: alternate status (doesn't clear the interrupt line). Write:
    /// device control (unused; accepted and ignored).
    AltStatusDevControl,
    /// 16-bit PIO data register.
    Data,
    /// Read: error register. Write: features register.
    ErrorFeatures,
    /// Read-only interrupt-reason register.
    IntReason,
    /// Read-only sector-number register.
    SectorNumber,
    ByteCountLow,
    ByteCountHigh,
    /// Unused; reads as 0, writes are accepted and ignored.
    DriveSelect,
    /// Read: status register (clears the interrupt line). Write: command
    /// register (posts an `ATA_CMD` event).
    StatusCommand,
}

/// The GD-ROM drive controller.
pub struct Drive {
    pub(crate) regs: Registers,
    pub(crate) state: DriveState,
    pub(crate) disc: Option<Box<dyn Disc>>,
    pub(crate) hw_info: HardwareInfo,
    pub(crate) pio: PioBuffer,
    pub(crate) dma: DmaBuffer,
    pub(crate) cd_read: Option<CdReadProgress>,
    pub(crate) irq: Box<dyn IrqLine>,
}

impl Drive {
    pub fn new(config: DriveConfig) -> Self {
        let mut drive = Drive {
            regs: Registers::default(),
            state: DriveState::ReadAtaCmd,
            disc: None,
            hw_info: HardwareInfo::new(
                &config.vendor,
                &config.firmware_version,
                &config.firmware_date,
            ),
            pio: PioBuffer::new(),
            dma: DmaBuffer::new(),
            cd_read: None,
            irq: config.irq,
        };
        drive.bind_disc(config.initial_disc);
        drive
    }

    pub fn state(&self) -> DriveState {
        self.state
    }

    pub fn status(&self) -> Status {
        self.regs.status
    }

    /// Replace the bound disc (or remove it, with `None`), destroying the
    /// previous handle and performing the soft reset described in the
    /// governing spec: error cleared, DRDY=1/BSY=0, sector-number zeroed
    /// then set to PAUSE (media present) or NODISC (absent).
    ///
    /// Per the recorded open-question decision in DESIGN.md, only
    /// error/status/sector-number are touched here; features, interrupt
    /// reason, and byte-count are left exactly as they were.
    pub fn bind_disc(&mut self, disc: Option<Box<dyn Disc>>) {
        self.disc = disc;
        self.regs.error = Default::default();
        self.regs.status = Status::DRDY;
        self.regs.sector_number = SectorNumber::default();
        match &self.disc {
            Some(disc) => {
                self.regs.sector_number =
                    SectorNumber::new(DriveStatus::Pause, DiscFormat(disc.get_format()));
                debug!("disc bound, format={:#x}", disc.get_format());
            }
            None => {
                self.regs.sector_number = SectorNumber::new(DriveStatus::NoDisc, DiscFormat(0));
                debug!("disc removed");
            }
        }
    }

    pub(crate) fn raise_interrupt(&mut self) {
        trace!("raising interrupt");
        self.irq.raise();
    }

    /// Read a register. Reading status clears the interrupt line; every
    /// other read leaves it untouched.
    ///
    /// Every fault returned from this, [`Drive::write_register`], and
    /// [`Drive::dma_read`] is logged with `error!` right here, at the one
    /// place all of them funnel through, rather than at each internal fault
    /// site.
    pub fn read_register(&mut self, offset: RegisterOffset) -> Result<u32, GdromFault> {
        let result = self.read_register_checked(offset);
        if let Err(ref fault) = result {
            error!(?offset, %fault, "register read faulted");
        }
        result
    }

    fn read_register_checked(&mut self, offset: RegisterOffset) -> Result<u32, GdromFault> {
        use RegisterOffset::*;
        let value = match offset {
            AltStatusDevControl => self.regs.status.bits() as u32,
            Data => {
                let (lo, hi) = self.pio_read()?;
                u32::from(lo) | (u32::from(hi) << 8)
            }
            ErrorFeatures => self.regs.error.bits() as u32,
            IntReason => self.regs.int_reason.bits() as u32,
            SectorNumber => self.regs.sector_number.raw() as u32,
            ByteCountLow => self.regs.byte_count.lo() as u32,
            ByteCountHigh => self.regs.byte_count.hi() as u32,
            DriveSelect => 0,
            StatusCommand => {
                let v = self.regs.status.bits() as u32;
                self.irq.clear();
                v
            }
        };
        trace!(?offset, value, "register read");
        Ok(value)
    }

    /// Write a register. Writing sector-number or interrupt-reason is
    /// protocol-fatal; every other write is a valid event per §4.5. See
    /// [`Drive::read_register`] for the shared fault-logging contract.
    pub fn write_register(&mut self, offset: RegisterOffset, value: u32) -> Result<(), GdromFault> {
        let result = self.write_register_checked(offset, value);
        if let Err(ref fault) = result {
            error!(?offset, value, %fault, "register write faulted");
        }
        result
    }

    fn write_register_checked(&mut self, offset: RegisterOffset, value: u32) -> Result<(), GdromFault> {
        trace!(?offset, value, "register write");
        use RegisterOffset::*;
        match offset {
            AltStatusDevControl => Ok(()),
            Data => {
                let lo = (value & 0xFF) as u8;
                let hi = ((value >> 8) & 0xFF) as u8;
                self.pio_write(lo, hi)
            }
            ErrorFeatures => {
                self.regs.features = crate::registers::Features::from_bits_truncate(value as u8);
                Ok(())
            }
            IntReason => Err(GdromFault::ReadOnlyRegisterWrite {
                register: "intreason",
            }),
            SectorNumber => Err(GdromFault::ReadOnlyRegisterWrite {
                register: "sectnum",
            }),
            ByteCountLow => {
                self.regs.byte_count.set_lo(value as u8);
                Ok(())
            }
            ByteCountHigh => {
                self.regs.byte_count.set_hi(value as u8);
                Ok(())
            }
            DriveSelect => Ok(()),
            StatusCommand => self.ata_command(value as u8),
        }
    }

    /// Drive the active DMA transfer: the bridge calls this once it is
    /// ready to pull the staged DMA payload into guest memory. See
    /// [`Drive::read_register`] for the shared fault-logging contract.
    pub fn dma_read(&mut self, target: &mut dyn DmaTarget) -> Result<(), GdromFault> {
        let result = self.spi_dma_drain(target);
        if let Err(ref fault) = result {
            error!(%fault, "dma read faulted");
        }
        result
    }
}
