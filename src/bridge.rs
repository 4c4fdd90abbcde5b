//! The host I/O bridge's DMA boundary.
//!
//! `copy_sectors` drives bulk transfer of the DMA staging buffer into guest
//! memory; the drive never touches guest address space directly, matching
//! the reference `memory::Bus` split between device-local buffers and guest
//! RAM.

use crate::error::GdromFault;

/// Destination for a bulk DMA write. A real bridge copies into guest
/// physical memory at some base address it alone knows about; this crate
/// only needs the ability to hand it bytes.
pub trait DmaTarget {
    fn write_guest(&mut self, bytes: &[u8]) -> Result<(), GdromFault>;
}
