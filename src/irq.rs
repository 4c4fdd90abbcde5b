//! The host I/O bridge's interrupt-line boundary.
//!
//! Mirrors the reference device stack's `IrqLine` trait: device crates
//! accept `Box<dyn IrqLine>` so the same controller code runs unmodified
//! whether the line is wired to a platform IRQ controller or, in tests, a
//! plain counter.

/// One interrupt line as seen by a device. `raise` and `clear` are the only
/// operations the drive ever needs.
pub trait IrqLine {
    fn raise(&mut self);
    fn clear(&mut self);
}
