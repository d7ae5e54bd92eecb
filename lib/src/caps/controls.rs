//! Ranges of the numeric encoder tunables.
//!
//! The ranges are not fixed: they derive from the capability records of the
//! encoders present on the hardware instance, and are recomputed every time a
//! new snapshot is installed.
use std::collections::BTreeMap;
use std::fmt;

use enumn::N;

use super::HardwareCapability;
use crate::catalog::CodecFamily;

/// Identifier of a numeric tunable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, N)]
#[repr(u32)]
pub enum ControlId {
    Bitrate = 0,
    BitratePeak = 1,
    GopSize = 2,
    BFrames = 3,
    MinQp = 4,
    MaxQp = 5,
    IFrameQp = 6,
    PFrameQp = 7,
    BFrameQp = 8,
    RefFrames = 9,
    RoiRegions = 10,
    IpcmRegions = 11,
    JpegQuality = 12,
}

impl ControlId {
    pub const COUNT: usize = 13;

    pub fn iter() -> impl Iterator<Item = ControlId> {
        (0..Self::COUNT as u32).filter_map(ControlId::n)
    }

    /// Default published before any hardware information is known.
    fn baseline_default(self) -> i64 {
        match self {
            ControlId::Bitrate => 4_000_000,
            ControlId::BitratePeak => 8_000_000,
            ControlId::GopSize => 30,
            ControlId::BFrames => 0,
            ControlId::MinQp => 0,
            ControlId::MaxQp => 51,
            ControlId::IFrameQp => 26,
            ControlId::PFrameQp => 28,
            ControlId::BFrameQp => 30,
            ControlId::RefFrames => 1,
            ControlId::RoiRegions => 0,
            ControlId::IpcmRegions => 0,
            ControlId::JpegQuality => 90,
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// `{min, max, step, default}` of a tunable.
///
/// A control that no present codec backs is inactive and collapses to
/// `{0, 0, 1, 0}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlRange {
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub default: i64,
    pub active: bool,
}

impl ControlRange {
    const INACTIVE: ControlRange = ControlRange {
        min: 0,
        max: 0,
        step: 1,
        default: 0,
        active: false,
    };

    /// Clamps `value` into the range.
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Published ranges of all the tunables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlTable {
    ranges: [ControlRange; ControlId::COUNT],
}

impl Default for ControlTable {
    fn default() -> Self {
        ControlTable {
            ranges: [ControlRange::INACTIVE; ControlId::COUNT],
        }
    }
}

/// Folds `f` over the video (non-image) encoders.
fn fold_video<F>(encoders: &BTreeMap<CodecFamily, HardwareCapability>, f: F) -> Option<(i64, i64)>
where
    F: Fn(&HardwareCapability) -> (i64, i64),
{
    encoders
        .iter()
        .filter(|(codec, _)| !codec.is_image())
        .map(|(_, caps)| f(caps))
        .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
}

impl ControlTable {
    pub fn get(&self, id: ControlId) -> &ControlRange {
        &self.ranges[id as usize]
    }

    /// Recomputes the ranges from the `encoders` records. Defaults published
    /// by `previous` are kept when they fit in the new range and clamped
    /// otherwise.
    pub fn derive(
        encoders: &BTreeMap<CodecFamily, HardwareCapability>,
        previous: &ControlTable,
    ) -> Self {
        let mut table = ControlTable::default();

        for id in ControlId::iter() {
            let bounds = match id {
                ControlId::Bitrate | ControlId::BitratePeak => {
                    fold_video(encoders, |c| (1, c.max_bitrate as i64))
                }
                ControlId::GopSize => fold_video(encoders, |c| (0, c.max_gop_size as i64)),
                ControlId::BFrames => fold_video(encoders, |c| (0, c.max_b_frames as i64)),
                ControlId::MinQp
                | ControlId::MaxQp
                | ControlId::IFrameQp
                | ControlId::PFrameQp
                | ControlId::BFrameQp => {
                    fold_video(encoders, |c| (c.min_qp as i64, c.max_qp as i64))
                }
                ControlId::RefFrames => fold_video(encoders, |c| (1, c.max_ref_frames as i64)),
                ControlId::RoiRegions => fold_video(encoders, |c| (0, c.max_roi_regions as i64)),
                ControlId::IpcmRegions => {
                    fold_video(encoders, |c| (0, c.max_ipcm_regions as i64))
                }
                ControlId::JpegQuality => encoders.get(&CodecFamily::Jpeg).map(|_| (1, 100)),
            };

            let range = match bounds {
                Some((min, max)) if min <= max => {
                    let prev = previous.get(id);
                    let wanted = if prev.active {
                        prev.default
                    } else {
                        id.baseline_default()
                    };
                    ControlRange {
                        min,
                        max,
                        step: 1,
                        default: wanted.clamp(min, max),
                        active: true,
                    }
                }
                _ => ControlRange::INACTIVE,
            };
            table.ranges[id as usize] = range;
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoders(max_bitrate: u32, max_qp: u32) -> BTreeMap<CodecFamily, HardwareCapability> {
        let mut encoders = BTreeMap::new();
        encoders.insert(
            CodecFamily::H264,
            HardwareCapability {
                max_bitrate,
                max_qp,
                ..Default::default()
            },
        );
        encoders
    }

    #[test]
    fn test_control_id_iter() {
        assert_eq!(ControlId::iter().count(), ControlId::COUNT);
        assert_eq!(ControlId::n(12), Some(ControlId::JpegQuality));
        assert_eq!(ControlId::n(13), None);
    }

    #[test]
    fn test_no_encoder_collapses() {
        let table = ControlTable::derive(&BTreeMap::new(), &ControlTable::default());
        for id in ControlId::iter() {
            assert_eq!(*table.get(id), ControlRange::INACTIVE);
        }
    }

    #[test]
    fn test_baseline_defaults() {
        let table = ControlTable::derive(&encoders(20_000_000, 51), &ControlTable::default());
        let bitrate = table.get(ControlId::Bitrate);
        assert_eq!((bitrate.min, bitrate.max, bitrate.default), (1, 20_000_000, 4_000_000));
        assert_eq!(table.get(ControlId::IFrameQp).default, 26);
        // No JPEG encoder present.
        assert!(!table.get(ControlId::JpegQuality).active);
    }

    #[test]
    fn test_defaults_clamped_on_reinstall() {
        let first = ControlTable::derive(&encoders(20_000_000, 51), &ControlTable::default());
        // A smaller ceiling clamps the published defaults.
        let second = ControlTable::derive(&encoders(2_000_000, 24), &first);
        assert_eq!(second.get(ControlId::Bitrate).default, 2_000_000);
        assert_eq!(second.get(ControlId::IFrameQp).default, 24);
        assert_eq!(second.get(ControlId::MinQp).default, 0);
        // Defaults that still fit are kept.
        assert_eq!(second.get(ControlId::GopSize).default, 30);
        // Growing again does not restore the baseline.
        let third = ControlTable::derive(&encoders(20_000_000, 51), &second);
        assert_eq!(third.get(ControlId::Bitrate).default, 2_000_000);
    }
}
