//! Test doubles for the host bridge collaborators.
//!
//! Not a production image decoder or interrupt controller — just enough to
//! drive the drive's state machine from both this crate's own tests and any
//! downstream integration test, the same way the reference storage crate
//! ships `MemBackend`/`RawDisk` for its own test suite.

use std::cell::Cell;
use std::rc::Rc;

use crate::bridge::DmaTarget;
use crate::disc::{Disc, DiscError, DiscMeta, Session, Track, TocArea, TocSummary};
use crate::error::GdromFault;
use crate::irq::IrqLine;

/// An interrupt line whose raised/cleared state is observable from the test
/// that constructed it, via a shared handle.
#[derive(Clone, Default)]
pub struct SharedIrqLine {
    raised: Rc<Cell<bool>>,
}

impl SharedIrqLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_raised(&self) -> bool {
        self.raised.get()
    }
}

impl IrqLine for SharedIrqLine {
    fn raise(&mut self) {
        self.raised.set(true);
    }

    fn clear(&mut self) {
        self.raised.set(false);
    }
}

/// A `DmaTarget` that just appends whatever it's given, for inspection.
#[derive(Debug, Default, Clone)]
pub struct VecDmaTarget {
    pub received: Vec<u8>,
}

impl VecDmaTarget {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DmaTarget for VecDmaTarget {
    fn write_guest(&mut self, bytes: &[u8]) -> Result<(), GdromFault> {
        self.received.extend_from_slice(bytes);
        Ok(())
    }
}

/// A minimal in-memory disc: one data track of fixed-size sectors filled
/// with a deterministic pattern, enough to exercise TOC/session/read paths.
pub struct StubDisc {
    sector_size: usize,
    max_sector_size: usize,
    sector_count: u32,
    leadin_fad: u32,
    format: u8,
}

impl StubDisc {
    /// A single-track disc starting at FAD 150 (standard 2-second pregap),
    /// with `sector_count` sectors of 2048 bytes each, format = CD-ROM mode
    /// 1 (GD-ROM high-density nibble 0x8).
    pub fn single_track() -> Self {
        StubDisc {
            sector_size: 2048,
            max_sector_size: 2352,
            sector_count: 64,
            leadin_fad: 150,
            format: 0x8,
        }
    }

    pub fn with_sector_count(mut self, count: u32) -> Self {
        self.sector_count = count;
        self
    }

    pub fn with_leadin_fad(mut self, fad: u32) -> Self {
        self.leadin_fad = fad;
        self
    }

    /// Override both the per-sector payload size and the buffer-sizing
    /// `max_sector_size`, for tests that need sectors of a specific size
    /// (e.g. exercising the CD-read batch budget at an exact boundary).
    pub fn with_sector_size(mut self, size: usize) -> Self {
        self.sector_size = size;
        self.max_sector_size = size;
        self
    }
}

impl Disc for StubDisc {
    fn max_sector_size(&self) -> usize {
        self.max_sector_size
    }

    fn read_sector(&self, fad: u32, _fmt: u8, _mask: u8, out: &mut [u8]) -> usize {
        if fad < self.leadin_fad || fad >= self.leadin_fad + self.sector_count {
            return 0;
        }
        let n = self.sector_size.min(out.len());
        for (i, b) in out[..n].iter_mut().enumerate() {
            *b = ((fad as usize + i) & 0xFF) as u8;
        }
        n
    }

    fn get_toc(&self, _area: TocArea) -> TocSummary {
        TocSummary {
            first_track: 1,
            last_track: 1,
            leadin_fad: self.leadin_fad,
            leadout_fad: self.leadin_fad + self.sector_count,
        }
    }

    fn num_sessions(&self) -> u32 {
        1
    }

    fn get_session(&self, index: u32) -> Result<Session, DiscError> {
        if index > 1 {
            return Err(DiscError::SessionOutOfRange { index, count: 1 });
        }
        Ok(Session {
            first_track: self.get_track(1)?,
            leadout_fad: self.leadin_fad + self.sector_count,
        })
    }

    fn get_track(&self, index: u32) -> Result<Track, DiscError> {
        if index != 1 {
            return Err(DiscError::TrackOutOfRange { index, last: 1 });
        }
        Ok(Track {
            num: 1,
            adr: 0x1,
            ctrl: 0x4,
            fad: self.leadin_fad,
        })
    }

    fn get_format(&self) -> u8 {
        self.format
    }

    fn get_meta(&self) -> DiscMeta {
        DiscMeta {
            name: "STUB".to_string(),
            version: "1".to_string(),
            id: "STUBDISC".to_string(),
        }
    }
}
