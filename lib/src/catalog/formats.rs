//! Static table of the formats known to the driver.
//!
//! Entries are listed in enumeration order: the order below is the order in
//! which `enum_fmt` reports them to clients.
use super::{
    CodecFamily, ComponentPlane, FormatFlags, InternalFormat, PixelFormatDescriptor, RawFormat,
    Roles,
};
use crate::PixelFormat;

pub const NV12: PixelFormat = PixelFormat::from_fourcc(b"NV12");
pub const NV21: PixelFormat = PixelFormat::from_fourcc(b"NV21");
pub const NV12M: PixelFormat = PixelFormat::from_fourcc(b"NM12");
pub const NV21M: PixelFormat = PixelFormat::from_fourcc(b"NM21");
pub const YUV420: PixelFormat = PixelFormat::from_fourcc(b"YU12");
pub const YVU420: PixelFormat = PixelFormat::from_fourcc(b"YV12");
pub const YUV420M: PixelFormat = PixelFormat::from_fourcc(b"YM12");
pub const YVU420M: PixelFormat = PixelFormat::from_fourcc(b"YM21");
pub const NV16: PixelFormat = PixelFormat::from_fourcc(b"NV16");
pub const NV61: PixelFormat = PixelFormat::from_fourcc(b"NV61");
pub const YUV422M: PixelFormat = PixelFormat::from_fourcc(b"YM16");
pub const YUV444M: PixelFormat = PixelFormat::from_fourcc(b"YM24");
pub const YUYV: PixelFormat = PixelFormat::from_fourcc(b"YUYV");
pub const UYVY: PixelFormat = PixelFormat::from_fourcc(b"UYVY");
pub const GREY: PixelFormat = PixelFormat::from_fourcc(b"GREY");
pub const RGB565: PixelFormat = PixelFormat::from_fourcc(b"RGBP");
pub const XRGB32: PixelFormat = PixelFormat::from_fourcc(b"BX24");
pub const ARGB32: PixelFormat = PixelFormat::from_fourcc(b"BA24");
pub const P010: PixelFormat = PixelFormat::from_fourcc(b"P010");
pub const P010M: PixelFormat = PixelFormat::from_fourcc(b"PM10");
/// Vendor block-compressed 8-bit 4:2:0.
pub const AFBC_8: PixelFormat = PixelFormat::from_fourcc(b"AFB8");
/// Vendor block-compressed 10-bit packed 4:2:0.
pub const AFBC_10: PixelFormat = PixelFormat::from_fourcc(b"AFBA");

pub const H264: PixelFormat = PixelFormat::from_fourcc(b"H264");
pub const HEVC: PixelFormat = PixelFormat::from_fourcc(b"HEVC");
pub const VP8: PixelFormat = PixelFormat::from_fourcc(b"VP80");
pub const VP9: PixelFormat = PixelFormat::from_fourcc(b"VP90");
pub const AV1: PixelFormat = PixelFormat::from_fourcc(b"AV01");
pub const MPEG4: PixelFormat = PixelFormat::from_fourcc(b"MPG4");
pub const H263: PixelFormat = PixelFormat::from_fourcc(b"H263");
pub const MPEG2: PixelFormat = PixelFormat::from_fourcc(b"MPG2");
pub const JPEG: PixelFormat = PixelFormat::from_fourcc(b"JPEG");

const fn comp(weight: u8, h_div: u8, v_div: u8) -> ComponentPlane {
    ComponentPlane {
        weight,
        h_div,
        v_div,
    }
}

const LUMA: ComponentPlane = comp(1, 1, 1);
const YUV420_SP: &[ComponentPlane] = &[LUMA, comp(2, 2, 2)];
const YUV420_P: &[ComponentPlane] = &[LUMA, comp(1, 2, 2), comp(1, 2, 2)];
const YUV422_SP: &[ComponentPlane] = &[LUMA, comp(2, 2, 1)];
const YUV422_P: &[ComponentPlane] = &[LUMA, comp(1, 2, 1), comp(1, 2, 1)];
const YUV444_P: &[ComponentPlane] = &[LUMA, LUMA, LUMA];
const PACKED: &[ComponentPlane] = &[LUMA];
const BITSTREAM: &[ComponentPlane] = &[];

const BOTH: Roles = Roles::ENCODER.union(Roles::DECODER);

const fn raw(
    fourcc: PixelFormat,
    description: &'static str,
    format: RawFormat,
    roles: Roles,
    mem_planes: u8,
    components: &'static [ComponentPlane],
    bytes_per_sample: u8,
    bit_depth: u8,
) -> PixelFormatDescriptor {
    // Components with their own memory plane must share the hardware stride
    // granularity, which halves the luma alignment when chroma is subsampled.
    let align_div = if mem_planes == 3 { 2 } else { 1 };
    PixelFormatDescriptor {
        pixelformat: fourcc,
        description,
        internal: InternalFormat::Raw(format),
        roles,
        flags: FormatFlags::empty(),
        mem_planes,
        components,
        bytes_per_sample,
        bit_depth,
        align_div,
    }
}

const fn tiled(
    fourcc: PixelFormat,
    description: &'static str,
    format: RawFormat,
    bytes_per_sample: u8,
    bit_depth: u8,
) -> PixelFormatDescriptor {
    PixelFormatDescriptor {
        pixelformat: fourcc,
        description,
        internal: InternalFormat::Raw(format),
        roles: BOTH,
        flags: FormatFlags::TILED,
        mem_planes: 1,
        components: YUV420_SP,
        bytes_per_sample,
        bit_depth,
        align_div: 1,
    }
}

const fn coded(
    fourcc: PixelFormat,
    description: &'static str,
    codec: CodecFamily,
    roles: Roles,
) -> PixelFormatDescriptor {
    let flags = match codec {
        CodecFamily::Jpeg => FormatFlags::COMPRESSED.union(FormatFlags::IMAGE_ONLY),
        _ => FormatFlags::COMPRESSED.union(FormatFlags::DYNAMIC_RESOLUTION),
    };
    PixelFormatDescriptor {
        pixelformat: fourcc,
        description,
        internal: InternalFormat::Coded(codec),
        roles,
        flags,
        mem_planes: 1,
        components: BITSTREAM,
        bytes_per_sample: 1,
        bit_depth: 0,
        align_div: 1,
    }
}

#[rustfmt::skip]
pub(crate) static FORMATS: &[PixelFormatDescriptor] = &[
    raw(NV12, "Y/CbCr 4:2:0", RawFormat::Nv12, BOTH, 1, YUV420_SP, 1, 8),
    raw(NV21, "Y/CrCb 4:2:0", RawFormat::Nv21, BOTH, 1, YUV420_SP, 1, 8),
    raw(NV12M, "Y/CbCr 4:2:0 (N-C)", RawFormat::Nv12M, BOTH, 2, YUV420_SP, 1, 8),
    raw(NV21M, "Y/CrCb 4:2:0 (N-C)", RawFormat::Nv21M, BOTH, 2, YUV420_SP, 1, 8),
    raw(YUV420, "Planar YUV 4:2:0", RawFormat::Yuv420, BOTH, 1, YUV420_P, 1, 8),
    raw(YVU420, "Planar YVU 4:2:0", RawFormat::Yvu420, BOTH, 1, YUV420_P, 1, 8),
    raw(YUV420M, "Planar YUV 4:2:0 (N-C)", RawFormat::Yuv420M, BOTH, 3, YUV420_P, 1, 8),
    raw(YVU420M, "Planar YVU 4:2:0 (N-C)", RawFormat::Yvu420M, BOTH, 3, YUV420_P, 1, 8),
    raw(NV16, "Y/CbCr 4:2:2", RawFormat::Nv16, BOTH, 1, YUV422_SP, 1, 8),
    raw(NV61, "Y/CrCb 4:2:2", RawFormat::Nv61, BOTH, 1, YUV422_SP, 1, 8),
    raw(YUV422M, "Planar YUV 4:2:2 (N-C)", RawFormat::Yuv422M, BOTH, 3, YUV422_P, 1, 8),
    raw(YUV444M, "Planar YUV 4:4:4 (N-C)", RawFormat::Yuv444M, BOTH, 3, YUV444_P, 1, 8),
    raw(YUYV, "YUYV 4:2:2", RawFormat::Yuyv, Roles::ENCODER, 1, PACKED, 2, 8),
    raw(UYVY, "UYVY 4:2:2", RawFormat::Uyvy, Roles::ENCODER, 1, PACKED, 2, 8),
    raw(GREY, "8-bit Greyscale", RawFormat::Grey, BOTH, 1, PACKED, 1, 8),
    raw(RGB565, "16-bit RGB 5-6-5", RawFormat::Rgb565, Roles::ENCODER, 1, PACKED, 2, 8),
    raw(XRGB32, "32-bit BGRX 8-8-8-8", RawFormat::Xrgb32, Roles::ENCODER, 1, PACKED, 4, 8),
    raw(ARGB32, "32-bit BGRA 8-8-8-8", RawFormat::Argb32, Roles::ENCODER, 1, PACKED, 4, 8),
    raw(P010, "10-bit Y/CbCr 4:2:0", RawFormat::P010, BOTH, 1, YUV420_SP, 2, 10),
    raw(P010M, "10-bit Y/CbCr 4:2:0 (N-C)", RawFormat::P010M, BOTH, 2, YUV420_SP, 2, 10),
    tiled(AFBC_8, "Block compressed Y/CbCr 4:2:0", RawFormat::Afbc8, 1, 8),
    tiled(AFBC_10, "Block compressed 10-bit Y/CbCr 4:2:0", RawFormat::Afbc10, 2, 10),
    coded(H264, "H.264", CodecFamily::H264, BOTH),
    coded(HEVC, "HEVC", CodecFamily::Hevc, BOTH),
    coded(VP8, "VP8", CodecFamily::Vp8, BOTH),
    coded(VP9, "VP9", CodecFamily::Vp9, BOTH),
    coded(AV1, "AV1", CodecFamily::Av1, Roles::DECODER),
    coded(MPEG4, "MPEG-4 Part 2 ES", CodecFamily::Mpeg4, BOTH),
    coded(H263, "H.263", CodecFamily::H263, Roles::DECODER),
    coded(MPEG2, "MPEG-2 ES", CodecFamily::Mpeg2, Roles::DECODER),
    coded(JPEG, "JFIF JPEG", CodecFamily::Jpeg, BOTH),
];

// Enablement is tracked in a 64-bit mask per role.
const _: () = assert!(FORMATS.len() <= 64);
