//! ROI and IPCM regions.
//!
//! Clients describe regions in pixels; the firmware addresses them in units of
//! the codec's macroblock (or coding tree unit) grid. Conversion always
//! produces a grid rectangle covering the whole pixel rectangle.
use std::fmt;

use enumn::N;
use log::{debug, warn};
use nix::errno::Errno;
use thiserror::Error;

use crate::catalog::CodecFamily;
use crate::Rect;

/// Number of region slots the firmware provides per kind.
pub const REGION_SLOTS: usize = 16;

const BLOB_ENTRY_SIZE: usize = 7 * 4;
/// Byte size of the region blob: a count followed by all the slots.
pub const REGION_BLOB_SIZE: usize = 4 + REGION_SLOTS * BLOB_ENTRY_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, N)]
#[repr(u32)]
pub enum RegionKind {
    /// Quantizer hint.
    Roi = 0,
    /// Lossless, unfiltered area.
    Ipcm = 1,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How the `qp` of a region is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, N)]
#[repr(u32)]
pub enum QpMode {
    /// Offset from the frame quantizer.
    #[default]
    Delta = 0,
    Absolute = 1,
}

/// A region as given by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Region {
    pub rect: Rect,
    pub enable: bool,
    pub qp: i32,
    pub mode: QpMode,
}

/// Rectangle in grid units, with exclusive right and bottom edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GridRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Grid unit in pixels for `codec`.
pub fn grid_unit(codec: CodecFamily) -> u32 {
    match codec {
        CodecFamily::Hevc => 64,
        _ => 16,
    }
}

fn floor_div(v: i64, unit: i64) -> u32 {
    (v.max(0) / unit).min(u32::MAX as i64) as u32
}

fn ceil_div(v: i64, unit: i64) -> u32 {
    ((v.max(0) + unit - 1) / unit).min(u32::MAX as i64) as u32
}

/// Converts `rect` into the grid of `codec`.
///
/// # Examples
///
/// ```
/// # use vcfmt::catalog::CodecFamily;
/// # use vcfmt::region::{to_grid, GridRect};
/// # use vcfmt::Rect;
/// let grid = to_grid(&Rect::new(17, 0, 16, 33), CodecFamily::H264);
/// assert_eq!(grid, GridRect { left: 1, top: 0, right: 3, bottom: 3 });
/// ```
pub fn to_grid(rect: &Rect, codec: CodecFamily) -> GridRect {
    let unit = grid_unit(codec) as i64;
    GridRect {
        left: floor_div(rect.left as i64, unit),
        top: floor_div(rect.top as i64, unit),
        right: ceil_div(rect.right(), unit),
        bottom: ceil_div(rect.bottom(), unit),
    }
}

impl GridRect {
    /// Pixel rectangle covered by this grid rectangle.
    pub fn to_pixels(&self, codec: CodecFamily) -> Rect {
        let unit = grid_unit(codec) as i64;
        let left = self.left as i64 * unit;
        let top = self.top as i64 * unit;
        Rect {
            left: left.min(i32::MAX as i64) as i32,
            top: top.min(i32::MAX as i64) as i32,
            width: (self.right.saturating_sub(self.left) as i64 * unit).min(u32::MAX as i64) as u32,
            height: (self.bottom.saturating_sub(self.top) as i64 * unit).min(u32::MAX as i64)
                as u32,
        }
    }
}

/// One firmware region slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RegionSlot {
    pub grid: GridRect,
    pub enable: bool,
    pub qp: i32,
    pub mode: QpMode,
}

/// The region slots of one kind, as sent to the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RegionSlots {
    /// Number of slots in use.
    pub count: u32,
    pub slots: [RegionSlot; REGION_SLOTS],
}

impl RegionSlots {
    pub fn enabled(&self) -> impl Iterator<Item = &RegionSlot> {
        self.slots.iter().filter(|s| s.enable)
    }
}

/// Builds the slots for `regions`, keeping at most `max_count` of them.
///
/// Every slot past the kept regions is disabled, so nothing from a previous
/// list survives.
pub fn apply_region_list(regions: &[Region], max_count: u32, codec: CodecFamily) -> RegionSlots {
    let max = (max_count as usize).min(REGION_SLOTS);
    if regions.len() > max {
        warn!(
            "Truncating region list from {} to {} entries",
            regions.len(),
            max
        );
    }

    let mut slots = RegionSlots::default();
    let kept = &regions[..regions.len().min(max)];
    for (slot, region) in slots.slots.iter_mut().zip(kept) {
        if region.enable {
            *slot = RegionSlot {
                grid: to_grid(&region.rect, codec),
                enable: true,
                qp: region.qp,
                mode: region.mode,
            };
        }
    }
    slots.count = kept.len() as u32;

    debug!(
        "Applied {} regions ({} enabled)",
        slots.count,
        slots.enabled().count()
    );

    slots
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("region blob has {actual} bytes, expected {expected}")]
    InvalidSize { expected: usize, actual: usize },
    #[error("invalid quantizer mode {0}")]
    InvalidMode(u32),
}

impl From<RegionError> for Errno {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::InvalidSize { .. } => Errno::EINVAL,
            RegionError::InvalidMode(_) => Errno::EINVAL,
        }
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

/// Decodes the fixed-size region blob passed by the driver glue.
///
/// Only the first `count` entries are returned; a count larger than the
/// number of slots is capped.
pub fn parse_region_blob(blob: &[u8]) -> Result<Vec<Region>, RegionError> {
    if blob.len() != REGION_BLOB_SIZE {
        return Err(RegionError::InvalidSize {
            expected: REGION_BLOB_SIZE,
            actual: blob.len(),
        });
    }

    let count = (read_u32(blob, 0) as usize).min(REGION_SLOTS);
    (0..count)
        .map(|i| {
            let base = 4 + i * BLOB_ENTRY_SIZE;
            let field = |n: usize| read_u32(blob, base + n * 4);
            let mode = QpMode::n(field(6)).ok_or(RegionError::InvalidMode(field(6)))?;
            Ok(Region {
                rect: Rect {
                    left: field(0) as i32,
                    top: field(1) as i32,
                    width: field(2),
                    height: field(3),
                },
                enable: field(4) != 0,
                qp: field(5) as i32,
                mode,
            })
        })
        .collect()
}
