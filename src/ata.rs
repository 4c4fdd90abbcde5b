//! ATA (outer) command handling and the PIO register events that drive the
//! state machine between ATA and SPI phases.

use tracing::trace;

use crate::drive::Drive;
use crate::error::GdromFault;
use crate::registers::{ErrorFlags, IntReason, Status};
use crate::state::{DriveState, Event};

/// ATA command byte values this drive recognizes.
mod opcode {
    pub const NOP: u8 = 0x00;
    pub const SOFT_RESET: u8 = 0x08;
    pub const EXEC_DIAG: u8 = 0x90;
    pub const PACKET_CMD: u8 = 0xA0;
    pub const IDENTIFY_DEV: u8 = 0xA1;
    pub const SET_FEATURES: u8 = 0xEF;
}

impl Drive {
    /// Handle the `ATA_CMD` event: an ATA command byte was written to the
    /// command register. Legal from every state; discards any in-flight
    /// PIO/DMA payload and resets the preamble (BSY set, DRDY/error/CHECK
    /// cleared) before dispatching.
    pub(crate) fn ata_command(&mut self, cmd: u8) -> Result<(), GdromFault> {
        trace!(cmd = format!("{cmd:#04x}"), state = ?self.state, "ata command");
        self.cd_read = None;
        self.regs.error = ErrorFlags::empty();
        self.regs.status = Status::BSY;

        match cmd {
            opcode::NOP => {
                self.regs.error = ErrorFlags::ABRT;
                self.regs.status |= Status::CHECK;
                self.ata_complete();
                Ok(())
            }
            opcode::SOFT_RESET => {
                let disc = self.disc.take();
                self.bind_disc(disc);
                self.ata_complete();
                Ok(())
            }
            opcode::PACKET_CMD => {
                self.pio.arm_receive(crate::buffers::PACKET_LEN)?;
                self.regs.int_reason = IntReason::command_phase();
                self.regs.status = Status::DRQ;
                self.state = DriveState::ReadAtaData;
                Ok(())
            }
            opcode::SET_FEATURES => {
                self.ata_complete();
                Ok(())
            }
            opcode::EXEC_DIAG | opcode::IDENTIFY_DEV => {
                Err(GdromFault::UnsupportedCommand { opcode: cmd })
            }
            other => Err(GdromFault::UnsupportedCommand { opcode: other }),
        }
    }

    /// Completion path for non-data ATA commands: DRDY=1/BSY=0, interrupt
    /// raised, back to idle.
    pub(crate) fn ata_complete(&mut self) {
        self.regs.status = (self.regs.status & Status::CHECK) | Status::DRDY;
        self.regs.int_reason = IntReason::idle();
        self.state = DriveState::ReadAtaCmd;
        self.raise_interrupt();
    }

    /// Handle the `PIO_WRITE` event: the host wrote the data register.
    pub(crate) fn pio_write(&mut self, lo: u8, hi: u8) -> Result<(), GdromFault> {
        if !crate::state::is_legal_transition(self.state, Event::PioWrite) {
            return Err(GdromFault::IllegalTransition {
                state: self.state,
                event: Event::PioWrite,
            });
        }
        self.pio.push_word(lo, hi)?;
        if self.pio.is_receive_complete() {
            match self.state {
                DriveState::ReadAtaData => self.spi_command()?,
                DriveState::ReadSpiData => self.spi_data_received()?,
                _ => unreachable!("is_legal_transition guarantees one of these two states"),
            }
        }
        Ok(())
    }

    /// Handle the `PIO_READ` event: the host read the data register.
    pub(crate) fn pio_read(&mut self) -> Result<(u8, u8), GdromFault> {
        if !crate::state::is_legal_transition(self.state, Event::PioRead) {
            return Err(GdromFault::IllegalTransition {
                state: self.state,
                event: Event::PioRead,
            });
        }
        let word = self.pio.pop_word()?;
        if self.state == DriveState::WriteSpiData && self.pio.is_drained() {
            self.spi_pio_drained()?;
        }
        Ok(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriveConfig;
    use crate::testing::SharedIrqLine;

    fn new_drive() -> Drive {
        Drive::new(DriveConfig::new(Box::new(SharedIrqLine::new())))
    }

    #[test]
    fn packet_command_arms_read_ata_data_without_raising_interrupt() {
        let irq = SharedIrqLine::new();
        let mut drive = Drive::new(DriveConfig::new(Box::new(irq.clone())));
        drive.ata_command(opcode::PACKET_CMD).unwrap();
        assert_eq!(drive.state(), DriveState::ReadAtaData);
        assert!(drive.status().contains(Status::DRQ));
        assert!(!drive.status().contains(Status::BSY));
        assert!(!irq.is_raised());
    }

    #[test]
    fn nop_sets_abrt_and_check_then_completes() {
        let mut drive = new_drive();
        drive.ata_command(opcode::NOP).unwrap();
        assert_eq!(drive.state(), DriveState::ReadAtaCmd);
        assert!(drive.regs.error.contains(ErrorFlags::ABRT));
        assert!(drive.status().contains(Status::CHECK));
        assert!(drive.status().contains(Status::DRDY));
    }

    #[test]
    fn unsupported_commands_are_fatal() {
        let mut drive = new_drive();
        assert_eq!(
            drive.ata_command(opcode::IDENTIFY_DEV),
            Err(GdromFault::UnsupportedCommand {
                opcode: opcode::IDENTIFY_DEV
            })
        );
        assert_eq!(
            drive.ata_command(opcode::EXEC_DIAG),
            Err(GdromFault::UnsupportedCommand {
                opcode: opcode::EXEC_DIAG
            })
        );
    }

    #[test]
    fn pio_write_outside_a_receiving_state_is_illegal() {
        let mut drive = new_drive();
        assert_eq!(
            drive.pio_write(0, 0),
            Err(GdromFault::IllegalTransition {
                state: DriveState::ReadAtaCmd,
                event: Event::PioWrite,
            })
        );
    }
}
