//! Protocol-fatal error taxonomy.
//!
//! These never originate from ordinary media conditions (see the
//! media-absent handling in [`crate::disc`]); they mark guest or emulator
//! bugs — an illegal (state, event) pair, a write to a read-only register, an
//! unsupported command, or a cursor overrun. The drive reports them through
//! `Result` rather than panicking; it is the caller's decision whether an
//! `Err` here means aborting the emulation session.

use thiserror::Error;

use crate::state::{DriveState, Event};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GdromFault {
    #[error("illegal transition: no handler for event {event:?} in state {state:?}")]
    IllegalTransition { state: DriveState, event: Event },

    #[error("write to read-only register {register}")]
    ReadOnlyRegisterWrite { register: &'static str },

    #[error("unsupported command 0x{opcode:02X}")]
    UnsupportedCommand { opcode: u8 },

    #[error("buffer cursor {cursor} exceeds limit {limit}")]
    BufferOverrun { cursor: usize, limit: usize },
}
