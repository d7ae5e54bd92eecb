//! Catalog of the pixel and bitstream formats known to the driver.
//!
//! Each [`PixelFormatDescriptor`] maps an external Fourcc to the internal
//! format code used by the firmware and carries everything the geometry code
//! needs to lay out buffers of that format. The catalog itself is immutable;
//! which of its entries are usable on a given hardware instance is tracked by
//! [`EnabledFormats`], which is only ever written by the capability registry
//! (see [`crate::caps`]).
pub mod formats;

use std::fmt;

use bitflags::bitflags;
use enumn::N;
use nix::errno::Errno;
use thiserror::Error;

use crate::{FormatKind, PixelFormat, QueueDirection, SessionRole};

pub use formats::*;

bitflags! {
    /// Capability flags of a catalog entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FormatFlags: u32 {
        const COMPRESSED = 0x1;
        /// The bitstream may change resolution mid-stream.
        const DYNAMIC_RESOLUTION = 0x2;
        /// Still-image codec.
        const IMAGE_ONLY = 0x4;
        /// Block-compressed layout with a header and a payload region.
        const TILED = 0x8;
    }
}

bitflags! {
    /// Session roles a catalog entry is offered to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Roles: u32 {
        const ENCODER = 0x1;
        const DECODER = 0x2;
    }
}

impl From<SessionRole> for Roles {
    fn from(role: SessionRole) -> Self {
        match role {
            SessionRole::Encoder => Roles::ENCODER,
            SessionRole::Decoder => Roles::DECODER,
        }
    }
}

/// Internal codes of the raw formats, as understood by the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum RawFormat {
    Nv12 = 0,
    Nv21 = 1,
    Nv12M = 2,
    Nv21M = 3,
    Yuv420 = 4,
    Yvu420 = 5,
    Yuv420M = 6,
    Yvu420M = 7,
    Nv16 = 8,
    Nv61 = 9,
    Yuv422M = 10,
    Yuv444M = 11,
    Yuyv = 12,
    Uyvy = 13,
    Grey = 14,
    Rgb565 = 15,
    Xrgb32 = 16,
    Argb32 = 17,
    P010 = 18,
    P010M = 19,
    Afbc8 = 20,
    Afbc10 = 21,
}

/// Internal codes of the codec families, as understood by the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, N)]
#[repr(u32)]
pub enum CodecFamily {
    H264 = 0,
    Hevc = 1,
    Vp8 = 2,
    Vp9 = 3,
    Av1 = 4,
    Mpeg4 = 5,
    H263 = 6,
    Mpeg2 = 7,
    Jpeg = 8,
}

impl CodecFamily {
    pub const ALL: [CodecFamily; 9] = [
        CodecFamily::H264,
        CodecFamily::Hevc,
        CodecFamily::Vp8,
        CodecFamily::Vp9,
        CodecFamily::Av1,
        CodecFamily::Mpeg4,
        CodecFamily::H263,
        CodecFamily::Mpeg2,
        CodecFamily::Jpeg,
    ];

    /// Whether this is a still-image codec, which uses the image alignment
    /// rules instead of the video ones.
    pub fn is_image(self) -> bool {
        matches!(self, CodecFamily::Jpeg)
    }
}

impl fmt::Display for CodecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Internal format code of a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InternalFormat {
    Raw(RawFormat),
    Coded(CodecFamily),
}

/// Layout of one component plane, relative to the luma plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentPlane {
    /// Bytes of this component per luma stride unit, before subsampling.
    /// Interleaved chroma planes carry two samples and thus a weight of 2.
    pub weight: u8,
    /// Horizontal subsampling divisor.
    pub h_div: u8,
    /// Vertical subsampling divisor.
    pub v_div: u8,
}

/// Static description of a format.
#[derive(Debug, PartialEq, Eq)]
pub struct PixelFormatDescriptor {
    /// External identifier.
    pub pixelformat: PixelFormat,
    pub description: &'static str,
    pub internal: InternalFormat,
    pub roles: Roles,
    pub flags: FormatFlags,
    /// Number of separate memory regions a buffer of this format uses.
    pub mem_planes: u8,
    /// Component planes; empty for bitstream formats.
    pub components: &'static [ComponentPlane],
    /// Bytes per luma sample.
    pub bytes_per_sample: u8,
    /// Bits per component sample; zero for bitstream formats.
    pub bit_depth: u8,
    /// Divisor applied to the codec stride alignment for this format.
    pub align_div: u8,
}

impl PixelFormatDescriptor {
    pub fn kind(&self) -> FormatKind {
        match self.internal {
            InternalFormat::Raw(_) => FormatKind::Raw,
            InternalFormat::Coded(_) => FormatKind::Coded,
        }
    }

    pub fn is_raw(&self) -> bool {
        self.kind() == FormatKind::Raw
    }

    pub fn raw_format(&self) -> Option<RawFormat> {
        match self.internal {
            InternalFormat::Raw(raw) => Some(raw),
            InternalFormat::Coded(_) => None,
        }
    }

    pub fn codec(&self) -> Option<CodecFamily> {
        match self.internal {
            InternalFormat::Raw(_) => None,
            InternalFormat::Coded(codec) => Some(codec),
        }
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn is_tiled(&self) -> bool {
        self.flags.contains(FormatFlags::TILED)
    }

    /// Whether samples are stored on 16 bits with 10 significant bits.
    pub fn is_10bit_packed(&self) -> bool {
        self.is_raw() && self.bit_depth == 10
    }

    /// Whether each component plane lives in its own memory plane.
    pub fn is_multi_mem_plane(&self) -> bool {
        self.mem_planes > 1
    }
}

impl fmt::Display for PixelFormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} {}",
            self.pixelformat,
            self.description,
            if self.flags.is_empty() {
                "".into()
            } else {
                format!("({:?})", self.flags)
            }
        )
    }
}

/// Returns all the catalog entries, enabled or not.
pub fn all() -> &'static [PixelFormatDescriptor] {
    FORMATS
}

/// Per-role enablement bit of every catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EnabledFormats {
    encoder: u64,
    decoder: u64,
}

impl EnabledFormats {
    /// Every entry disabled.
    pub fn none() -> Self {
        Default::default()
    }

    fn mask(&self, role: SessionRole) -> u64 {
        match role {
            SessionRole::Encoder => self.encoder,
            SessionRole::Decoder => self.decoder,
        }
    }

    pub(crate) fn set(&mut self, role: SessionRole, index: usize, enabled: bool) {
        let mask = match role {
            SessionRole::Encoder => &mut self.encoder,
            SessionRole::Decoder => &mut self.decoder,
        };
        if enabled {
            *mask |= 1u64 << index;
        } else {
            *mask &= !(1u64 << index);
        }
    }

    /// Whether the catalog entry at `index` is enabled for `role`.
    pub fn is_enabled(&self, role: SessionRole, index: usize) -> bool {
        index < FORMATS.len() && self.mask(role) & (1u64 << index) != 0
    }

    /// Number of enabled entries for `role`.
    pub fn count(&self, role: SessionRole) -> u32 {
        self.mask(role).count_ones()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("format {0} is not known for this queue")]
    NotFound(PixelFormat),
    #[error("format {0} is not supported by this hardware")]
    Disabled(PixelFormat),
    #[error("no format at index {0}")]
    EndOfSequence(u32),
}

impl From<CatalogError> for Errno {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => Errno::EINVAL,
            CatalogError::Disabled(_) => Errno::EINVAL,
            CatalogError::EndOfSequence(_) => Errno::EINVAL,
        }
    }
}

fn position(
    role: SessionRole,
    direction: QueueDirection,
    pixelformat: PixelFormat,
) -> Option<usize> {
    let kind = role.kind_for(direction);
    FORMATS.iter().position(|desc| {
        desc.pixelformat == pixelformat
            && desc.kind() == kind
            && desc.roles.contains(Roles::from(role))
    })
}

/// Looks up `pixelformat` among the entries offered on the `direction` queue
/// of a `role` session, regardless of whether the hardware supports it.
pub fn lookup(
    role: SessionRole,
    direction: QueueDirection,
    pixelformat: PixelFormat,
) -> Result<&'static PixelFormatDescriptor, CatalogError> {
    position(role, direction, pixelformat)
        .map(|i| &FORMATS[i])
        .ok_or(CatalogError::NotFound(pixelformat))
}

/// Same as [`lookup`], but also fails if the entry is disabled in `enabled`.
pub fn lookup_enabled(
    enabled: &EnabledFormats,
    role: SessionRole,
    direction: QueueDirection,
    pixelformat: PixelFormat,
) -> Result<&'static PixelFormatDescriptor, CatalogError> {
    let index = position(role, direction, pixelformat).ok_or(CatalogError::NotFound(pixelformat))?;
    if enabled.is_enabled(role, index) {
        Ok(&FORMATS[index])
    } else {
        Err(CatalogError::Disabled(pixelformat))
    }
}

/// Returns the `index`-th enabled format of `kind` offered to `role`, in table
/// order.
pub fn enumerate(
    enabled: &EnabledFormats,
    role: SessionRole,
    kind: FormatKind,
    index: u32,
) -> Result<&'static PixelFormatDescriptor, CatalogError> {
    FORMATS
        .iter()
        .enumerate()
        .filter(|(i, desc)| {
            desc.kind() == kind
                && desc.roles.contains(Roles::from(role))
                && enabled.is_enabled(role, *i)
        })
        .map(|(_, desc)| desc)
        .nth(index as usize)
        .ok_or(CatalogError::EndOfSequence(index))
}

/// `VIDIOC_ENUM_FMT`-like enumeration of the formats of the `direction` queue.
pub fn enum_fmt(
    enabled: &EnabledFormats,
    role: SessionRole,
    direction: QueueDirection,
    index: u32,
) -> Result<&'static PixelFormatDescriptor, CatalogError> {
    enumerate(enabled, role, role.kind_for(direction), index)
}

/// Iterator over the enabled formats of a queue. It borrows the enablement
/// set so it stays consistent for its whole lifetime, and can be restarted by
/// creating a new one.
pub struct FormatIterator<'a> {
    enabled: &'a EnabledFormats,
    role: SessionRole,
    kind: FormatKind,
    index: u32,
}

impl<'a> FormatIterator<'a> {
    pub fn new(enabled: &'a EnabledFormats, role: SessionRole, direction: QueueDirection) -> Self {
        FormatIterator {
            enabled,
            role,
            kind: role.kind_for(direction),
            index: 0,
        }
    }
}

impl<'a> Iterator for FormatIterator<'a> {
    type Item = &'static PixelFormatDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        match enumerate(self.enabled, self.role, self.kind, self.index) {
            Ok(desc) => {
                self.index += 1;
                Some(desc)
            }
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_enabled() -> EnabledFormats {
        let mut enabled = EnabledFormats::none();
        for i in 0..FORMATS.len() {
            enabled.set(SessionRole::Encoder, i, true);
            enabled.set(SessionRole::Decoder, i, true);
        }
        enabled
    }

    #[test]
    fn test_table_consistency() {
        for desc in FORMATS {
            match desc.internal {
                InternalFormat::Coded(_) => {
                    assert!(desc.flags.contains(FormatFlags::COMPRESSED), "{}", desc);
                    assert_eq!(desc.mem_planes, 1);
                    assert!(desc.components.is_empty());
                }
                InternalFormat::Raw(_) => {
                    assert!(!desc.flags.contains(FormatFlags::COMPRESSED), "{}", desc);
                    // Either every component shares one memory plane, or each
                    // one has its own.
                    assert!(
                        desc.mem_planes == 1 || desc.mem_planes as usize == desc.num_components(),
                        "{}",
                        desc
                    );
                    assert!(desc.bit_depth == 8 || desc.bit_depth == 10);
                    for c in desc.components {
                        assert!(c.h_div.is_power_of_two() && c.v_div.is_power_of_two());
                    }
                }
            }
        }
    }

    #[test]
    fn test_lookup_direction_aware() {
        let nv12 = lookup(SessionRole::Encoder, QueueDirection::Output, NV12).unwrap();
        assert_eq!(nv12.internal, InternalFormat::Raw(RawFormat::Nv12));
        assert_eq!(
            lookup(SessionRole::Encoder, QueueDirection::Capture, NV12),
            Err(CatalogError::NotFound(NV12))
        );
        let h264 = lookup(SessionRole::Decoder, QueueDirection::Output, H264).unwrap();
        assert_eq!(h264.codec(), Some(CodecFamily::H264));
        // RGB input is only offered to encoders.
        assert!(lookup(SessionRole::Decoder, QueueDirection::Capture, ARGB32).is_err());
        // AV1 is decode-only.
        assert!(lookup(SessionRole::Encoder, QueueDirection::Capture, AV1).is_err());
    }

    #[test]
    fn test_lookup_enabled() {
        let mut enabled = EnabledFormats::none();
        assert_eq!(
            lookup_enabled(&enabled, SessionRole::Encoder, QueueDirection::Output, NV12),
            Err(CatalogError::Disabled(NV12))
        );
        enabled.set(SessionRole::Encoder, 0, true);
        assert!(
            lookup_enabled(&enabled, SessionRole::Encoder, QueueDirection::Output, NV12).is_ok()
        );
        assert!(
            lookup_enabled(&enabled, SessionRole::Decoder, QueueDirection::Capture, NV12).is_err()
        );
    }

    #[test]
    fn test_enumerate_skips_disabled() {
        let mut enabled = all_enabled();
        let first = enumerate(&enabled, SessionRole::Encoder, FormatKind::Raw, 0).unwrap();
        assert_eq!(first.pixelformat, NV12);
        let second = enumerate(&enabled, SessionRole::Encoder, FormatKind::Raw, 1).unwrap();
        assert_eq!(second.pixelformat, NV21);

        enabled.set(SessionRole::Encoder, 1, false);
        let second = enumerate(&enabled, SessionRole::Encoder, FormatKind::Raw, 1).unwrap();
        assert_eq!(second.pixelformat, NV12M);
    }

    #[test]
    fn test_format_iterator() {
        let enabled = all_enabled();
        let coded: Vec<_> = FormatIterator::new(&enabled, SessionRole::Encoder, QueueDirection::Capture)
            .map(|d| d.pixelformat)
            .collect();
        assert_eq!(coded, vec![H264, HEVC, VP8, VP9, MPEG4, JPEG]);

        // The sequence is finite and restartable.
        let count = FormatIterator::new(&enabled, SessionRole::Decoder, QueueDirection::Output).count();
        assert_eq!(count, 9);
        assert_eq!(
            enum_fmt(&enabled, SessionRole::Decoder, QueueDirection::Output, 9),
            Err(CatalogError::EndOfSequence(9))
        );
        assert_eq!(
            FormatIterator::new(&enabled, SessionRole::Decoder, QueueDirection::Output).count(),
            count
        );
    }

    #[test]
    fn test_fmtdesc_display() {
        assert_eq!(
            lookup(SessionRole::Encoder, QueueDirection::Output, NV12)
                .unwrap()
                .to_string(),
            "NV12: Y/CbCr 4:2:0 "
        );
        assert_eq!(
            lookup(SessionRole::Encoder, QueueDirection::Capture, JPEG)
                .unwrap()
                .to_string(),
            "JPEG: JFIF JPEG (FormatFlags(COMPRESSED | IMAGE_ONLY))"
        );
    }
}
