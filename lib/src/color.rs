//! Conversion between V4L2 colorimetry and the compact VUI-style codes the
//! firmware writes into coded bitstreams, and between encoder quality and
//! quantizer.
use crate::{Colorimetry, Colorspace, Quantization, XferFunc, YCbCrEncoding};

/// Code meaning "unspecified" in all three tables.
pub const UNSPECIFIED: u8 = 0;

const PRIMARIES: [Colorspace; 8] = [
    Colorspace::Default,
    Colorspace::Rec709,
    Colorspace::SystemM470,
    Colorspace::SystemBG470,
    Colorspace::Smpte170M,
    Colorspace::Smpte240M,
    Colorspace::Bt2020,
    Colorspace::DciP3,
];

const TRANSFER: [XferFunc; 7] = [
    XferFunc::Default,
    XferFunc::F709,
    XferFunc::Smpte240M,
    XferFunc::Srgb,
    XferFunc::None,
    XferFunc::Smpte2084,
    XferFunc::DciP3,
];

const MATRIX: [YCbCrEncoding; 6] = [
    YCbCrEncoding::Default,
    YCbCrEncoding::E709,
    YCbCrEncoding::E601,
    YCbCrEncoding::Smpte240M,
    YCbCrEncoding::Bt2020,
    YCbCrEncoding::Bt2020ConstLum,
];

fn position<T: PartialEq>(table: &[T], value: &T) -> u8 {
    table
        .iter()
        .position(|v| v == value)
        .map(|i| i as u8)
        .unwrap_or(UNSPECIFIED)
}

fn entry<T: Copy + Default>(table: &[T], index: u8) -> T {
    table.get(index as usize).copied().unwrap_or_default()
}

pub fn primaries_to_internal(colorspace: Colorspace) -> u8 {
    position(&PRIMARIES, &colorspace)
}

pub fn primaries_to_external(index: u8) -> Colorspace {
    entry(&PRIMARIES, index)
}

/// opRGB shares the sRGB transfer curve code.
pub fn transfer_to_internal(xfer: XferFunc) -> u8 {
    match xfer {
        XferFunc::OpRgb => position(&TRANSFER, &XferFunc::Srgb),
        xfer => position(&TRANSFER, &xfer),
    }
}

pub fn transfer_to_external(index: u8) -> XferFunc {
    entry(&TRANSFER, index)
}

pub fn matrix_to_internal(enc: YCbCrEncoding) -> u8 {
    position(&MATRIX, &enc)
}

pub fn matrix_to_external(index: u8) -> YCbCrEncoding {
    entry(&MATRIX, index)
}

/// Compact colorimetry as consumed by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VuiColor {
    pub primaries: u8,
    pub transfer: u8,
    pub matrix: u8,
    pub full_range: bool,
}

impl From<&Colorimetry> for VuiColor {
    fn from(c: &Colorimetry) -> Self {
        VuiColor {
            primaries: primaries_to_internal(c.colorspace),
            transfer: transfer_to_internal(c.xfer_func),
            matrix: matrix_to_internal(c.ycbcr_enc),
            full_range: c.quantization == Quantization::FullRange,
        }
    }
}

impl From<&VuiColor> for Colorimetry {
    fn from(v: &VuiColor) -> Self {
        Colorimetry {
            colorspace: primaries_to_external(v.primaries),
            xfer_func: transfer_to_external(v.transfer),
            ycbcr_enc: matrix_to_external(v.matrix),
            quantization: if v.full_range {
                Quantization::FullRange
            } else {
                Quantization::LimRange
            },
        }
    }
}

/// Largest quantizer accepted by the encoders.
pub const MAX_QP: i32 = 51;
/// Largest quality value.
pub const MAX_QUALITY: i32 = 100;

/// Converts an encoder quantizer into a 0..=100 quality.
///
/// # Examples
///
/// ```
/// # use vcfmt::color::quantizer_to_quality;
/// assert_eq!(quantizer_to_quality(0), 100);
/// assert_eq!(quantizer_to_quality(1), 100);
/// assert_eq!(quantizer_to_quality(26), 50);
/// assert_eq!(quantizer_to_quality(52), 0);
/// ```
pub fn quantizer_to_quality(qp: i32) -> i32 {
    if qp <= 0 {
        MAX_QUALITY
    } else if qp > MAX_QP {
        0
    } else {
        (MAX_QP - qp) * 2
    }
}

/// Converts a 0..=100 quality into an encoder quantizer. This is the inverse
/// of [`quantizer_to_quality`] for quantizers in `1..=51`.
pub fn quality_to_quantizer(quality: i32) -> i32 {
    if quality >= MAX_QUALITY {
        1
    } else if quality <= 0 {
        MAX_QP
    } else {
        MAX_QP - quality / 2
    }
}
