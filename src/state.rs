//! The (state, event) transition table.
//!
//! Illegal transitions are not unrepresentable at the type level (the event
//! set is shared across all states), so [`Drive`](crate::drive::Drive)
//! checks the table explicitly and turns a missing entry into a fatal
//! [`GdromFault::IllegalTransition`](crate::error::GdromFault) rather than
//! silently doing nothing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    /// Idle, waiting for an ATA command.
    ReadAtaCmd,
    /// Receiving a 12-byte SPI packet from the host.
    ReadAtaData,
    /// Receiving an SPI host->device payload (e.g. SET_MODE bytes).
    ReadSpiData,
    /// Sending an SPI device->host payload via PIO.
    WriteSpiData,
    /// Sending a CD-read payload via DMA.
    WriteDmaData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The host wrote the command register.
    AtaCmd,
    /// The host wrote the data register.
    PioWrite,
    /// The 12-byte SPI packet has fully accumulated.
    SpiCmd,
    /// The host read the data register.
    PioRead,
    /// A host->device SPI payload has fully accumulated.
    SpiData,
}

/// Whether `(state, event)` has a handler per the transition table. An ATA
/// command is legal from every state (it resets the machine); every other
/// combination follows the table in the governing spec.
pub fn is_legal_transition(state: DriveState, event: Event) -> bool {
    use DriveState::*;
    use Event::*;
    match event {
        AtaCmd => true,
        PioWrite => matches!(state, ReadAtaData | ReadSpiData),
        SpiCmd => matches!(state, ReadAtaData),
        PioRead => matches!(state, WriteSpiData | WriteDmaData),
        SpiData => matches!(state, ReadSpiData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DriveState::*;
    use Event::*;

    #[test]
    fn ata_cmd_is_legal_from_every_state() {
        for state in [ReadAtaCmd, ReadAtaData, ReadSpiData, WriteSpiData, WriteDmaData] {
            assert!(is_legal_transition(state, AtaCmd));
        }
    }

    #[test]
    fn spi_cmd_only_legal_while_receiving_ata_data() {
        assert!(is_legal_transition(ReadAtaData, SpiCmd));
        assert!(!is_legal_transition(ReadAtaCmd, SpiCmd));
        assert!(!is_legal_transition(WriteSpiData, SpiCmd));
    }

    #[test]
    fn pio_read_only_legal_in_write_states() {
        assert!(is_legal_transition(WriteSpiData, PioRead));
        assert!(is_legal_transition(WriteDmaData, PioRead));
        assert!(!is_legal_transition(ReadAtaCmd, PioRead));
    }
}
