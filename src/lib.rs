//! Emulated GD-ROM drive controller: ATA outer protocol, SPI inner (packet)
//! protocol, and the PIO/DMA streaming path between them.
//!
//! [`Drive`] is the crate's sole entry point: construct one from a
//! [`DriveConfig`], then drive it through [`Drive::read_register`] /
//! [`Drive::write_register`] / [`Drive::dma_read`] from a host I/O bridge.

mod ata;
mod buffers;
mod bridge;
mod config;
mod disc;
mod drive;
mod error;
mod hardware_info;
mod irq;
mod registers;
mod spi;
mod state;

pub mod testing;

pub use bridge::DmaTarget;
pub use config::DriveConfig;
pub use disc::{Disc, DiscError, DiscMeta, Session, Track, TocArea, TocSummary};
pub use drive::{Drive, RegisterOffset};
pub use error::GdromFault;
pub use irq::IrqLine;
pub use registers::{ByteCount, DriveStatus, ErrorFlags, Features, IntReason, Status};
pub use spi::msf_to_fad;
pub use state::{DriveState, Event};
