//! SPI (packet) command handling and the CD-read streaming loop.
//!
//! Reached only from [`crate::ata::Drive::pio_write`] once a full 12-byte
//! packet has accumulated, and from [`crate::drive::Drive::dma_read`] while
//! draining a DMA-mode CD read.

use tracing::{debug, trace, warn};

use crate::bridge::DmaTarget;
use crate::buffers::BUFFER_CAPACITY;
use crate::disc::TocArea;
use crate::drive::Drive;
use crate::error::GdromFault;
use crate::registers::{ByteCount, DriveStatus, IntReason, Status};
use crate::state::DriveState;

mod opcode {
    pub const TEST_UNIT: u8 = 0x00;
    pub const REQ_STAT: u8 = 0x10;
    pub const REQ_MODE: u8 = 0x11;
    pub const SET_MODE: u8 = 0x12;
    pub const REQ_ERROR: u8 = 0x13;
    pub const GET_TOC: u8 = 0x14;
    pub const REQ_SES: u8 = 0x15;
    pub const CD_OPEN: u8 = 0x16;
    pub const CD_PLAY: u8 = 0x20;
    pub const CD_SEEK: u8 = 0x21;
    pub const CD_SCAN: u8 = 0x22;
    pub const CD_READ: u8 = 0x30;
    pub const CD_READ2: u8 = 0x31;
    pub const GET_SCD: u8 = 0x40;
    pub const CHK_SECU: u8 = 0x70;
    pub const REQ_SECU: u8 = 0x71;
}

/// Number of 4-byte entry slots in a GET_TOC reply: 99 per-track slots plus
/// first/last/leadout.
const TOC_MAX_TRACKS: usize = 99;
const TOC_REPLY_LEN: usize = (TOC_MAX_TRACKS + 3) * 4;

const SECURITY_REPLY_LEN: usize = 126;

/// The byte-count register is 16-bit; a CD-read batch must never produce
/// more bytes than this, or `ByteCount::new(len as u16)` would wrap.
const MAX_BYTE_COUNT: usize = 0xFFFF;

/// Decode an MSF (minute, second, frame) address into a linear FAD.
pub fn msf_to_fad(m: u32, s: u32, f: u32) -> u32 {
    m * 60 * 75 + s * 75 + f
}

fn be24(value: u32) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

fn field_offset(pkt: &[u8]) -> usize {
    pkt[2] as usize
}

fn field_size(pkt: &[u8]) -> usize {
    ((pkt[3] as usize) << 8) | pkt[4] as usize
}

fn field_fad24(pkt: &[u8], at: usize) -> u32 {
    (pkt[at] as u32) << 16 | (pkt[at + 1] as u32) << 8 | pkt[at + 2] as u32
}

/// In-flight CD_READ state, advanced one batch at a time as PIO/DMA buffers
/// drain.
#[derive(Debug, Clone, Copy)]
pub struct CdReadProgress {
    pub dma: bool,
    pub fmt: u8,
    pub mask: u8,
    pub fad: u32,
    pub remaining: u32,
}

impl Drive {
    /// Dispatch the freshly-received 12-byte packet per the SPI command
    /// table. Preamble: DRQ=0, BSY=1.
    pub(crate) fn spi_command(&mut self) -> Result<(), GdromFault> {
        self.regs.status = Status::BSY;
        let pkt: [u8; 12] = self.pio.bytes().try_into().expect("packet is always 12 bytes");
        let op = pkt[0];
        trace!(op = format!("{op:#04x}"), "spi command");

        match op {
            opcode::TEST_UNIT | opcode::CHK_SECU => {
                self.spi_end();
                Ok(())
            }
            opcode::REQ_STAT => {
                let offset = field_offset(&pkt);
                let size = field_size(&pkt);
                let reply = self.build_req_stat_reply();
                self.begin_write_spi_data(&slice_clamped(&reply, offset, size))
            }
            opcode::REQ_MODE => {
                let offset = field_offset(&pkt);
                let size = field_size(&pkt);
                let reply = self.hw_info.slice(offset, size).to_vec();
                self.begin_write_spi_data(&reply)
            }
            opcode::SET_MODE => {
                let offset = field_offset(&pkt);
                let size = field_size(&pkt);
                self.pio.arm_receive(size)?;
                self.pio.set_dest_offset(offset);
                self.regs.int_reason = IntReason::empty();
                self.regs.status = Status::DRQ;
                self.state = DriveState::ReadSpiData;
                Ok(())
            }
            opcode::REQ_ERROR => {
                let mut reply = [0u8; 10];
                reply[0] = 0xF0;
                self.begin_write_spi_data(&reply)
            }
            opcode::GET_TOC => {
                let area = if pkt[1] & 0x01 != 0 {
                    TocArea::HighDensity
                } else {
                    TocArea::SingleDensity
                };
                let size = field_size(&pkt);
                let reply = self.build_toc_reply(area)?;
                self.begin_write_spi_data(&slice_clamped(&reply, 0, size))
            }
            opcode::REQ_SES => {
                let session_num = pkt[1];
                let reply = self.build_req_ses_reply(session_num)?;
                self.begin_write_spi_data(&reply)
            }
            opcode::GET_SCD => {
                let format = pkt[1] & 0x01;
                let mut reply = [0u8; 4];
                reply[1] = 0x00; // NOSTATUS
                if format == 0 {
                    reply[2] = 0x00;
                    reply[3] = 0x64;
                } else {
                    reply[2] = 0x00;
                    reply[3] = 0x0E;
                }
                self.begin_write_spi_data(&reply)
            }
            opcode::CD_READ => {
                let fmt = (pkt[1] >> 4) & 0x0F;
                let mask = pkt[1] & 0x0F;
                let fad = field_fad24(&pkt, 3);
                let count = field_fad24(&pkt, 8);
                let dma = self.regs.features.contains(crate::registers::Features::DMA);
                debug!(fad, count, dma, "cd read armed");
                self.cd_read = Some(CdReadProgress {
                    dma,
                    fmt,
                    mask,
                    fad,
                    remaining: count,
                });
                self.cd_read_iteration()
            }
            opcode::REQ_SECU => self.begin_write_spi_data(&[0u8; SECURITY_REPLY_LEN]),
            opcode::CD_PLAY | opcode::CD_SCAN => {
                self.regs
                    .sector_number
                    .set_status(DriveStatus::Pause);
                self.spi_end();
                Ok(())
            }
            opcode::CD_SEEK => {
                let status = match pkt[1] & 0x0F {
                    3 => DriveStatus::Standby,
                    _ => DriveStatus::Pause,
                };
                self.regs.sector_number.set_status(status);
                self.spi_end();
                Ok(())
            }
            opcode::CD_READ2 | opcode::CD_OPEN => Err(GdromFault::UnsupportedCommand { opcode: op }),
            other => Err(GdromFault::UnsupportedCommand { opcode: other }),
        }
    }

    /// Completion of a SET_MODE host->device payload.
    pub(crate) fn spi_data_received(&mut self) -> Result<(), GdromFault> {
        let offset = self.pio.dest_offset();
        let bytes = self.pio.bytes().to_vec();
        self.hw_info.write_at(offset, &bytes);
        self.spi_end();
        Ok(())
    }

    /// Called when the PIO cursor drains during `WRITE_SPI_DATA`: either
    /// this was a CD-read batch (continue streaming) or an ordinary reply
    /// (just complete).
    pub(crate) fn spi_pio_drained(&mut self) -> Result<(), GdromFault> {
        match &self.cd_read {
            Some(progress) if progress.remaining > 0 => self.cd_read_iteration(),
            Some(_) => {
                self.cd_read = None;
                self.spi_end();
                Ok(())
            }
            None => {
                self.spi_end();
                Ok(())
            }
        }
    }

    /// Drive the active DMA transfer one drain at a time.
    pub(crate) fn spi_dma_drain(&mut self, target: &mut dyn DmaTarget) -> Result<(), GdromFault> {
        let pending = self.dma.remaining().to_vec();
        target.write_guest(&pending)?;
        let drained = self.dma.advance(pending.len())?;
        if drained {
            match &self.cd_read {
                Some(progress) if progress.remaining > 0 => self.cd_read_iteration()?,
                Some(_) => {
                    self.cd_read = None;
                    self.spi_end();
                }
                None => {}
            }
        }
        Ok(())
    }

    /// One batch of the CD-read loop: fill either the DMA or PIO buffer
    /// with up to a buffer's worth of sectors and arm the appropriate
    /// transfer mode.
    fn cd_read_iteration(&mut self) -> Result<(), GdromFault> {
        let progress = self.cd_read.expect("cd_read_iteration called with no CD read armed");
        let sector_size = self
            .disc
            .as_deref()
            .map(|d| d.max_sector_size())
            .unwrap_or(2352)
            .max(1);
        let budget = (BUFFER_CAPACITY.min(MAX_BYTE_COUNT) / sector_size).max(1) as u32;
        let batch = progress.remaining.min(budget);
        let data = self.read_sectors(progress.fad, progress.fmt, progress.mask, batch);
        debug_assert!(data.len() <= MAX_BYTE_COUNT, "cd read batch exceeds byte_count range");

        let progress = self.cd_read.as_mut().expect("checked above");
        progress.fad += batch;
        progress.remaining -= batch;

        if progress.dma {
            self.dma.fill(&data)?;
            self.state = DriveState::WriteDmaData;
        } else {
            self.regs.byte_count = ByteCount::new(data.len().min(MAX_BYTE_COUNT) as u16);
            self.pio.arm_send(&data)?;
            self.regs.int_reason = IntReason::data_phase();
            self.regs.status = Status::DRQ;
            self.state = DriveState::WriteSpiData;
            self.raise_interrupt();
        }
        Ok(())
    }

    /// Read `count` sectors starting at `fad`, concatenating each sector's
    /// bytes. Returns an empty vector (with a logged warning) if no disc is
    /// bound.
    fn read_sectors(&self, fad: u32, fmt: u8, mask: u8, count: u32) -> Vec<u8> {
        let Some(disc) = self.disc.as_deref() else {
            warn!("cd read with no disc bound");
            return Vec::new();
        };
        let sector_size = disc.max_sector_size();
        let mut out = Vec::with_capacity(sector_size * count as usize);
        let mut scratch = vec![0u8; sector_size];
        for i in 0..count {
            let n = disc.read_sector(fad + i, fmt, mask, &mut scratch);
            out.extend_from_slice(&scratch[..n]);
        }
        out
    }

    /// Arm a device->host SPI reply: copy `payload` into the PIO buffer and
    /// transition to `WRITE_SPI_DATA`.
    fn begin_write_spi_data(&mut self, payload: &[u8]) -> Result<(), GdromFault> {
        self.pio.arm_send(payload)?;
        self.regs.byte_count = ByteCount::new(payload.len() as u16);
        self.regs.int_reason = IntReason::data_phase();
        self.regs.status = Status::DRQ;
        self.state = DriveState::WriteSpiData;
        self.raise_interrupt();
        Ok(())
    }

    /// Completion of an SPI phase: CoD=1, IO=1, DRDY=1, BSY=0, DRQ=0; raise
    /// interrupt; back to idle.
    fn spi_end(&mut self) {
        self.regs.int_reason = IntReason::idle();
        self.regs.status = Status::DRDY;
        self.state = DriveState::ReadAtaCmd;
        self.raise_interrupt();
    }

    fn build_req_stat_reply(&self) -> [u8; 10] {
        let mut reply = [0u8; 10];
        reply[0] = self.regs.sector_number.status().code();
        reply[1] = 0; // repeat
        reply[2] = self.regs.sector_number.format().0;
        reply[3] = 0x4; // control
        reply[4] = 0; // address
        reply[5] = 2; // scd_track
        reply[6] = 0; // scd_index
        let fad = be24(0);
        reply[7..10].copy_from_slice(&fad);
        reply
    }

    fn build_toc_reply(&self, area: TocArea) -> Result<Vec<u8>, GdromFault> {
        let Some(disc) = self.disc.as_deref() else {
            return Ok(vec![0xFFu8; TOC_REPLY_LEN]);
        };
        let summary = disc.get_toc(area);
        let mut reply = vec![0xFFu8; TOC_REPLY_LEN];

        for track_num in summary.first_track..=summary.last_track {
            if let Ok(track) = disc.get_track(track_num) {
                let slot = (track_num as usize - 1) * 4;
                reply[slot] = (track.ctrl << 4) | (track.adr & 0x0F);
                reply[slot + 1..slot + 4].copy_from_slice(&be24(track.fad));
            }
        }

        let first_slot = TOC_MAX_TRACKS * 4;
        let last_slot = first_slot + 4;
        let leadout_slot = last_slot + 4;

        if let Ok(first) = disc.get_track(summary.first_track) {
            reply[first_slot] = (first.ctrl << 4) | (first.adr & 0x0F);
            reply[first_slot + 1..first_slot + 4].copy_from_slice(&be24(first.num));
        }
        if let Ok(last) = disc.get_track(summary.last_track) {
            reply[last_slot] = (last.ctrl << 4) | (last.adr & 0x0F);
            reply[last_slot + 1..last_slot + 4].copy_from_slice(&be24(last.num));
        }
        reply[leadout_slot + 1..leadout_slot + 4].copy_from_slice(&be24(summary.leadout_fad));

        Ok(reply)
    }

    fn build_req_ses_reply(&self, session_num: u8) -> Result<[u8; 5], GdromFault> {
        let Some(disc) = self.disc.as_deref() else {
            return Ok([DriveStatus::NoDisc.code(), 0, 0, 0, 0]);
        };
        let status = self.regs.sector_number.status().code();
        let (track, fad) = if session_num == 0 {
            let last = disc.get_session(disc.num_sessions()).map_err(|_| {
                GdromFault::UnsupportedCommand {
                    opcode: opcode::REQ_SES,
                }
            })?;
            (disc.num_sessions() as u8, last.leadout_fad)
        } else {
            let session = disc.get_session(session_num as u32).map_err(|_| {
                GdromFault::UnsupportedCommand {
                    opcode: opcode::REQ_SES,
                }
            })?;
            (session.first_track.num as u8, session.first_track.fad)
        };
        let fad_bytes = be24(fad);
        Ok([status, track, fad_bytes[0], fad_bytes[1], fad_bytes[2]])
    }
}

fn slice_clamped(data: &[u8], offset: usize, size: usize) -> Vec<u8> {
    let start = offset.min(data.len());
    let end = (offset + size).min(data.len());
    data[start..end].to_vec()
}
