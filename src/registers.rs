//! Typed views over the drive's register file.
//!
//! Real hardware packs these as raw 8/16-bit port values; we re-express each
//! one as a strongly-typed wrapper with accessor/mutator methods instead of
//! relying on a bitfield union, per the transformation notes on this crate.

use bitflags::bitflags;

bitflags! {
    /// Status register (and its alternate-status mirror).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        /// Busy: the drive is processing a command, no register access besides
        /// status/alt-status is meaningful.
        const BSY   = 0x80;
        /// Device ready.
        const DRDY  = 0x40;
        /// Data request: a PIO word is waiting to be transferred.
        const DRQ   = 0x08;
        /// Error pending; the error register holds detail.
        const CHECK = 0x01;
    }
}

impl Status {
    /// (BSY, DRQ) must never both be set; this holds for every status value
    /// the drive itself ever produces, but is checked at the call sites that
    /// assemble a `Status` from scratch rather than here, so a caller
    /// deliberately testing bitflag composition still gets a useful
    /// `Debug` value for diagnostics.
    pub fn is_consistent(self) -> bool {
        !(self.contains(Status::BSY) && self.contains(Status::DRQ))
    }
}

bitflags! {
    /// Error register. Only ABRT is modeled; sense fields are unimplemented
    /// per the open questions in the governing spec.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ErrorFlags: u8 {
        const ABRT = 0x04;
    }
}

bitflags! {
    /// Features register. Only the DMA-select bit is meaningful to this drive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Features: u8 {
        const DMA = 0x01;
    }
}

bitflags! {
    /// Interrupt-reason register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IntReason: u8 {
        /// Content: 1 = command/status, 0 = data.
        const COD = 0x01;
        /// I/O direction: 1 = device to host, 0 = host to device.
        const IO  = 0x02;
    }
}

impl IntReason {
    /// The idle/completion value: CoD=1, IO=1.
    pub fn idle() -> Self {
        IntReason::COD | IntReason::IO
    }

    /// The value while receiving a host->device payload (packet or SET_MODE
    /// data): CoD=1, IO=0.
    pub fn command_phase() -> Self {
        IntReason::COD
    }

    /// The value while streaming a device->host payload: CoD=0, IO=1.
    pub fn data_phase() -> Self {
        IntReason::IO
    }
}

/// Drive status nibble carried in the low nibble of the sector-number
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveStatus {
    Busy,
    Pause,
    Standby,
    Play,
    Seek,
    Scan,
    Open,
    #[default]
    NoDisc,
}

impl DriveStatus {
    /// The nibble value as carried on the wire (status replies embed this
    /// same byte, not just the sector-number register).
    pub fn code(self) -> u8 {
        self.nibble()
    }

    fn nibble(self) -> u8 {
        match self {
            DriveStatus::Busy => 0x0,
            DriveStatus::Pause => 0x1,
            DriveStatus::Standby => 0x2,
            DriveStatus::Play => 0x3,
            DriveStatus::Seek => 0x4,
            DriveStatus::Scan => 0x5,
            DriveStatus::Open => 0x6,
            DriveStatus::NoDisc => 0x7,
        }
    }

    fn from_nibble(v: u8) -> Self {
        match v & 0x0F {
            0x1 => DriveStatus::Pause,
            0x2 => DriveStatus::Standby,
            0x3 => DriveStatus::Play,
            0x4 => DriveStatus::Seek,
            0x5 => DriveStatus::Scan,
            0x6 => DriveStatus::Open,
            0x7 => DriveStatus::NoDisc,
            _ => DriveStatus::Busy,
        }
    }
}

/// Disc format nibble carried in the high nibble of the sector-number
/// register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscFormat(pub u8);

/// Sector-number register: {status nibble, format nibble}. Read-only from
/// the host's perspective; writes are a protocol-fatal error (see
/// [`crate::error::GdromFault::ReadOnlyRegisterWrite`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorNumber(u8);

impl SectorNumber {
    pub fn new(status: DriveStatus, format: DiscFormat) -> Self {
        SectorNumber((format.0 << 4) | status.nibble())
    }

    pub fn status(self) -> DriveStatus {
        DriveStatus::from_nibble(self.0)
    }

    pub fn format(self) -> DiscFormat {
        DiscFormat(self.0 >> 4)
    }

    pub fn set_status(&mut self, status: DriveStatus) {
        self.0 = (self.0 & 0xF0) | status.nibble();
    }

    pub fn raw(self) -> u8 {
        self.0
    }
}

/// Byte-count register, accessed through the host as two separate 8-bit
/// register addresses (lo, hi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteCount(u16);

impl ByteCount {
    pub fn new(value: u16) -> Self {
        ByteCount(value)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn lo(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn hi(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn set_lo(&mut self, v: u8) {
        self.0 = (self.0 & 0xFF00) | v as u16;
    }

    pub fn set_hi(&mut self, v: u8) {
        self.0 = (self.0 & 0x00FF) | ((v as u16) << 8);
    }
}

/// The drive's register file.
#[derive(Debug, Clone, Default)]
pub struct Registers {
    pub error: ErrorFlags,
    pub features: Features,
    pub int_reason: IntReason,
    pub sector_number: SectorNumber,
    pub byte_count: ByteCount,
    pub status: Status,
}
