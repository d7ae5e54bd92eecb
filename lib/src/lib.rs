//! Format and buffer geometry negotiation for hardware video encoders and
//! decoders.
//!
//! This library sits between the ioctl dispatch layer of a codec driver and the
//! firmware that consumes the resolved configuration. It is organized in a few
//! layers:
//!
//! * The `catalog` module lists every pixel and bitstream format the driver
//!   knows about, along with the memory layout information needed to size
//!   buffers for it.
//! * The `caps` module holds the hardware capability snapshot reported at
//!   bring-up, and derives from it which catalog entries are usable and the
//!   ranges of the tunable encoder parameters.
//! * The `geometry` module computes per-plane strides and sizes for raw,
//!   coded, multi-planar and block-compressed layouts. It is a pure function
//!   of its inputs.
//! * The `color` and `region` modules are small converters for colorimetry
//!   metadata and region-of-interest coordinates.
//! * The `session` module ties everything together: it resolves `S_FMT`-like
//!   requests against the catalog and the capabilities, keeps the per-session
//!   configuration and reports which parameters changed so the firmware
//!   command layer knows what to resend.
//!
//! None of these operations allocate hardware memory or perform I/O; they only
//! compute the numbers the buffer allocation layer needs.
pub mod caps;
pub mod catalog;
pub mod color;
pub mod config;
pub mod geometry;
pub mod region;
pub mod session;

use std::fmt;
use std::fmt::{Debug, Display};

use enumn::N;
use nix::errno::Errno;

/// Possible directions for a session queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueDirection {
    /// Buffers submitted by the client to the device.
    Output,
    /// Buffers produced by the device and returned to the client.
    Capture,
}

impl Display for QueueDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

/// Whether a format carries raw pixels or a compressed bitstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatKind {
    Raw,
    Coded,
}

/// Role of a codec session. The role decides which kind of format each queue
/// direction accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, N)]
#[repr(u32)]
pub enum SessionRole {
    Encoder = 0,
    Decoder = 1,
}

impl SessionRole {
    /// Returns the kind of format carried by the queue of `direction` for this
    /// role.
    ///
    /// # Examples
    ///
    /// ```
    /// # use vcfmt::{FormatKind, QueueDirection, SessionRole};
    /// assert_eq!(SessionRole::Encoder.kind_for(QueueDirection::Output), FormatKind::Raw);
    /// assert_eq!(SessionRole::Decoder.kind_for(QueueDirection::Output), FormatKind::Coded);
    /// ```
    pub fn kind_for(self, direction: QueueDirection) -> FormatKind {
        match (self, direction) {
            (SessionRole::Encoder, QueueDirection::Output)
            | (SessionRole::Decoder, QueueDirection::Capture) => FormatKind::Raw,
            (SessionRole::Encoder, QueueDirection::Capture)
            | (SessionRole::Decoder, QueueDirection::Output) => FormatKind::Coded,
        }
    }

    /// Returns the queue direction that carries formats of `kind`.
    pub fn direction_of(self, kind: FormatKind) -> QueueDirection {
        match (self, kind) {
            (SessionRole::Encoder, FormatKind::Raw) | (SessionRole::Decoder, FormatKind::Coded) => {
                QueueDirection::Output
            }
            (SessionRole::Encoder, FormatKind::Coded) | (SessionRole::Decoder, FormatKind::Raw) => {
                QueueDirection::Capture
            }
        }
    }
}

impl Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

/// A Fourcc pixel format, used as the external identifier of formats. It can
/// be converted back and forth from a 32-bit integer, or a 4-bytes string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PixelFormat(u32);

impl PixelFormat {
    pub const fn from_u32(v: u32) -> Self {
        Self(v)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub const fn from_fourcc(n: &[u8; 4]) -> Self {
        Self(n[0] as u32 | (n[1] as u32) << 8 | (n[2] as u32) << 16 | (n[3] as u32) << 24)
    }

    pub const fn to_fourcc(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

/// Converts a Fourcc in 32-bit integer format into the matching pixel format.
///
/// # Examples
///
/// ```
/// # use vcfmt::PixelFormat;
/// // Fourcc representation of NV12.
/// let nv12 = u32::from_le(0x3231564e);
/// let f = PixelFormat::from(nv12);
/// assert_eq!(u32::from(f), nv12);
/// ```
impl From<u32> for PixelFormat {
    fn from(i: u32) -> Self {
        Self::from_u32(i)
    }
}

impl From<PixelFormat> for u32 {
    fn from(format: PixelFormat) -> Self {
        format.to_u32()
    }
}

/// Simple way to convert a string litteral (e.g. b"NV12") into a pixel
/// format.
///
/// # Examples
///
/// ```
/// # use vcfmt::PixelFormat;
/// let nv12 = b"NV12";
/// let f = PixelFormat::from(nv12);
/// assert_eq!(&<[u8; 4]>::from(f), nv12);
/// ```
impl From<&[u8; 4]> for PixelFormat {
    fn from(n: &[u8; 4]) -> Self {
        Self::from_fourcc(n)
    }
}

impl From<PixelFormat> for [u8; 4] {
    fn from(format: PixelFormat) -> Self {
        format.to_fourcc()
    }
}

/// Produces a debug string for this PixelFormat, including its hexadecimal
/// and string representation.
///
/// # Examples
///
/// ```
/// # use vcfmt::PixelFormat;
/// let f = PixelFormat::from(b"NV12");
/// assert_eq!(format!("{:?}", f), "0x3231564e (NV12)");
/// ```
impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_fmt(format_args!("0x{:08x} ({})", self.0, self))
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fourcc = self
            .0
            .to_le_bytes()
            .iter()
            .map(|&x| x as char)
            .collect::<String>();
        f.write_str(fourcc.as_str())
    }
}

/// Description of a single plane in a format.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct PlaneLayout {
    /// Useful size of the plane ; the backing memory must be at least that large.
    pub sizeimage: u32,
    /// Bytes per line of data. Zero for bitstream formats.
    pub bytesperline: u32,
}

/// Unified representation of a format, used both for requests and for the
/// resolved result.
///
/// In a request, `plane_fmt` may be left empty or carry the client's preferred
/// strides and sizes. In a resolved format it holds exactly one entry per
/// memory plane of `pixelformat`.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Format {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Format each pixel is encoded in.
    pub pixelformat: PixelFormat,
    /// Individual layout of each plane in this format.
    pub plane_fmt: Vec<PlaneLayout>,
    /// Colorimetry attached to the frames.
    pub colorimetry: Colorimetry,
}

/// Quickly build a usable `Format` from a pixel format and resolution.
///
/// # Examples
///
/// ```
/// # use vcfmt::Format;
/// let f = Format::from((b"NV12", (640, 480)));
/// assert_eq!(f.width, 640);
/// assert_eq!(f.height, 480);
/// assert_eq!(f.pixelformat.to_string(), "NV12");
/// assert_eq!(f.plane_fmt.len(), 0);
/// ```
impl<T: Into<PixelFormat>> From<(T, (usize, usize))> for Format {
    fn from((pixel_format, (width, height)): (T, (usize, usize))) -> Self {
        Format {
            width: width as u32,
            height: height as u32,
            pixelformat: pixel_format.into(),
            ..Default::default()
        }
    }
}

/// A pixel-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Rect {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }
}

impl Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}), {}x{}",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Equivalent of `enum v4l2_colorspace`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, N)]
pub enum Colorspace {
    #[default]
    Default = 0,
    Smpte170M = 1,
    Smpte240M = 2,
    Rec709 = 3,
    Bt878 = 4,
    SystemM470 = 5,
    SystemBG470 = 6,
    Jpeg = 7,
    Srgb = 8,
    OpRgb = 9,
    Bt2020 = 10,
    Raw = 11,
    DciP3 = 12,
}

/// Equivalent of `enum v4l2_xfer_func`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, N)]
pub enum XferFunc {
    #[default]
    Default = 0,
    F709 = 1,
    Srgb = 2,
    OpRgb = 3,
    Smpte240M = 4,
    None = 5,
    DciP3 = 6,
    Smpte2084 = 7,
}

/// Equivalent of `enum v4l2_ycbcr_encoding`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, N)]
pub enum YCbCrEncoding {
    #[default]
    Default = 0,
    E601 = 1,
    E709 = 2,
    Xv601 = 3,
    Xv709 = 4,
    Sycc = 5,
    Bt2020 = 6,
    Bt2020ConstLum = 7,
    Smpte240M = 8,
}

/// Equivalent of `enum v4l2_quantization`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, N)]
pub enum Quantization {
    #[default]
    Default = 0,
    FullRange = 1,
    LimRange = 2,
}

/// The four colorimetry fields carried by a V4L2 pixel format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Colorimetry {
    pub colorspace: Colorspace,
    pub xfer_func: XferFunc,
    pub ycbcr_enc: YCbCrEncoding,
    pub quantization: Quantization,
}

/// Extension trait for allowing easy conversion of errors into their errno code.
pub trait IntoErrno {
    fn into_errno(self) -> i32;
}

impl<T> IntoErrno for T
where
    T: Into<Errno>,
{
    fn into_errno(self) -> i32 {
        self.into() as i32
    }
}

/// Round `value` up to the next multiple of `align`. `align` of zero leaves the
/// value untouched.
pub(crate) const fn align_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

/// Round `value` down to the previous multiple of `align`.
pub(crate) const fn align_down(value: u64, align: u64) -> u64 {
    if align == 0 {
        value
    } else {
        value / align * align
    }
}
