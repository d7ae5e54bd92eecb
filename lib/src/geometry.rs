//! Buffer geometry computation.
//!
//! Given a format and dimensions, computes the stride and size of every memory
//! plane of a buffer. Everything in this module is a pure function of its
//! inputs: the caller decides which dimensions to use (after clamping them
//! against the hardware capabilities) and what to do with the result.
mod tiled;

pub use tiled::*;

use log::{debug, warn};
use nix::errno::Errno;
use thiserror::Error;

use crate::catalog::{self, CodecFamily, ComponentPlane, InternalFormat, PixelFormatDescriptor};
use crate::config::{EngineConfig, PAGE_SIZE};
use crate::{align_up, PixelFormat, PlaneLayout};

/// Stride alignment of the video codecs, in bytes.
pub const VIDEO_STRIDE_ALIGN: u32 = 64;
/// Stride alignment of the image codecs, in bytes.
pub const IMAGE_STRIDE_ALIGN: u32 = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("unknown format {0}")]
    InvalidFormat(PixelFormat),
    #[error("invalid dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),
}

impl From<GeometryError> for Errno {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::InvalidFormat(_) => Errno::EINVAL,
            GeometryError::InvalidDimensions(_, _) => Errno::EINVAL,
        }
    }
}

/// Input of a geometry computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeometryRequest {
    pub pixelformat: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Stride of the first plane wished by the client, or 0 to derive it.
    pub stride: u32,
    /// Granularity the frame height is rounded up to.
    pub height_align: u32,
    /// Codec whose alignment rules apply. Raw formats use the codec of the
    /// other queue; `None` means the video rules.
    pub codec: Option<CodecFamily>,
    pub tile_mode: TileMode,
    /// Lower bound for the size of a bitstream buffer, typically the size
    /// previously computed for the same queue.
    pub min_size: u32,
}

impl GeometryRequest {
    pub fn new(pixelformat: PixelFormat, width: u32, height: u32) -> Self {
        GeometryRequest {
            pixelformat,
            width,
            height,
            stride: 0,
            height_align: 1,
            codec: None,
            tile_mode: TileMode::default(),
            min_size: 0,
        }
    }

    pub fn stride(self, stride: u32) -> Self {
        GeometryRequest { stride, ..self }
    }

    pub fn height_align(self, height_align: u32) -> Self {
        GeometryRequest {
            height_align,
            ..self
        }
    }

    pub fn codec(self, codec: Option<CodecFamily>) -> Self {
        GeometryRequest { codec, ..self }
    }

    pub fn tile_mode(self, tile_mode: TileMode) -> Self {
        GeometryRequest { tile_mode, ..self }
    }

    pub fn min_size(self, min_size: u32) -> Self {
        GeometryRequest { min_size, ..self }
    }
}

/// Result of a geometry computation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Geometry {
    /// One entry per memory plane.
    pub planes: Vec<PlaneLayout>,
    /// Set if at least one plane was saturated at the size limit.
    pub overflow: bool,
}

impl Geometry {
    pub fn total_size(&self) -> u64 {
        self.planes.iter().map(|p| p.sizeimage as u64).sum()
    }
}

/// Stride alignment for `desc` when used with `codec`.
pub fn stride_alignment(desc: &PixelFormatDescriptor, codec: Option<CodecFamily>) -> u32 {
    let base = match codec {
        Some(codec) if codec.is_image() => IMAGE_STRIDE_ALIGN,
        _ => VIDEO_STRIDE_ALIGN,
    };
    (base / desc.align_div.max(1) as u32).max(1)
}

/// `(shift, tail)` pair turning a luma stride into a chroma stride by
/// `(luma + tail) >> shift`, for a horizontal subsampling divisor.
fn chroma_shifter(h_div: u8) -> (u32, u64) {
    match h_div {
        2 => (1, 1),
        4 => (2, 3),
        _ => (0, 0),
    }
}

fn component_stride(luma: u64, comp: &ComponentPlane) -> u64 {
    let (shift, tail) = chroma_shifter(comp.h_div);
    ((luma + tail) >> shift) * comp.weight as u64
}

/// Makes the chroma stride derived from `luma` a multiple of `chroma_align`,
/// inflating the luma stride as needed. Returns the luma and chroma strides.
///
/// # Examples
///
/// ```
/// # use vcfmt::geometry::correct_chroma_stride;
/// assert_eq!(correct_chroma_stride(66, 32, 2), (128, 64));
/// assert_eq!(correct_chroma_stride(128, 32, 2), (128, 64));
/// ```
pub fn correct_chroma_stride(luma: u64, chroma_align: u64, h_div: u8) -> (u64, u64) {
    let comp = ComponentPlane {
        weight: 1,
        h_div,
        v_div: 1,
    };
    let chroma = component_stride(luma, &comp);
    if chroma_align == 0 || chroma % chroma_align == 0 {
        return (luma, chroma);
    }

    let (shift, _) = chroma_shifter(h_div);
    let luma = align_up(luma, chroma_align << shift);
    (luma, component_stride(luma, &comp))
}

fn saturate(size: u64, config: &EngineConfig, overflow: &mut bool) -> u32 {
    let max = config.get_max_plane_size() as u64;
    if size > max {
        *overflow = true;
        max as u32
    } else {
        size as u32
    }
}

fn coded_layout(req: &GeometryRequest, config: &EngineConfig) -> Geometry {
    let mut overflow = false;
    let frame = (req.width as u64 * req.height as u64).max(config.get_min_coded_size() as u64);
    let size = align_up(
        frame + config.get_coded_header_reserve() as u64,
        PAGE_SIZE,
    )
    .max(req.min_size as u64);

    Geometry {
        planes: vec![PlaneLayout {
            sizeimage: saturate(size, config, &mut overflow),
            bytesperline: 0,
        }],
        overflow,
    }
}

fn tiled_layout(
    desc: &PixelFormatDescriptor,
    req: &GeometryRequest,
    config: &EngineConfig,
) -> Geometry {
    let mut overflow = false;
    let layout = TiledLayout::new(req.width, req.height, desc.is_10bit_packed(), req.tile_mode);

    Geometry {
        planes: vec![PlaneLayout {
            sizeimage: saturate(layout.total_size(), config, &mut overflow),
            bytesperline: 0,
        }],
        overflow,
    }
}

fn raw_layout(
    desc: &PixelFormatDescriptor,
    req: &GeometryRequest,
    config: &EngineConfig,
) -> Geometry {
    let align = stride_alignment(desc, req.codec) as u64;
    let min_stride = req.width as u64 * desc.bytes_per_sample as u64;
    let mut luma = align_up(min_stride.max(req.stride as u64), align);

    // Each component with its own memory plane must have an aligned stride.
    if desc.is_multi_mem_plane() {
        for comp in desc.components.iter().skip(1) {
            if component_stride(luma, comp) % align != 0 {
                let (corrected, chroma) = correct_chroma_stride(luma, align, comp.h_div);
                debug!(
                    "Inflating {} luma stride from {} to {} (chroma stride {})",
                    desc.pixelformat, luma, corrected, chroma
                );
                luma = corrected;
            }
        }
    }

    let height = align_up(req.height as u64, req.height_align.max(1) as u64);
    let components = desc.components.iter().map(|comp| {
        let stride = component_stride(luma, comp);
        let rows = height.div_ceil(comp.v_div as u64);
        (stride, stride * rows)
    });

    let mut overflow = false;
    let planes = if desc.is_multi_mem_plane() {
        components
            .map(|(stride, size)| PlaneLayout {
                sizeimage: saturate(size, config, &mut overflow),
                bytesperline: stride as u32,
            })
            .collect()
    } else {
        let size: u64 = components.map(|(_, size)| size).sum();
        vec![PlaneLayout {
            sizeimage: saturate(size, config, &mut overflow),
            bytesperline: luma.min(u32::MAX as u64) as u32,
        }]
    };

    Geometry { planes, overflow }
}

/// Looks up the descriptor of `pixelformat`, whatever the role using it.
pub fn descriptor(pixelformat: PixelFormat) -> Result<&'static PixelFormatDescriptor, GeometryError> {
    catalog::all()
        .iter()
        .find(|d| d.pixelformat == pixelformat)
        .ok_or(GeometryError::InvalidFormat(pixelformat))
}

/// Computes the plane layout for `req`.
///
/// Plane sizes above the configured limit are saturated and flagged in
/// [`Geometry::overflow`] rather than rejected.
///
/// # Examples
///
/// ```
/// # use vcfmt::catalog::NV12;
/// # use vcfmt::config::EngineConfig;
/// # use vcfmt::geometry::{compute, GeometryRequest};
/// let geometry = compute(&GeometryRequest::new(NV12, 1920, 1088), &EngineConfig::new()).unwrap();
/// assert_eq!(geometry.planes.len(), 1);
/// assert_eq!(geometry.planes[0].bytesperline, 1920);
/// assert_eq!(geometry.planes[0].sizeimage, 1920 * 1088 * 3 / 2);
/// ```
pub fn compute(req: &GeometryRequest, config: &EngineConfig) -> Result<Geometry, GeometryError> {
    let desc = descriptor(req.pixelformat)?;
    if req.width == 0 || req.height == 0 {
        return Err(GeometryError::InvalidDimensions(req.width, req.height));
    }

    let geometry = match desc.internal {
        InternalFormat::Coded(_) => coded_layout(req, config),
        InternalFormat::Raw(_) if desc.is_tiled() => tiled_layout(desc, req, config),
        InternalFormat::Raw(_) => raw_layout(desc, req, config),
    };

    if geometry.overflow {
        warn!(
            "{} {}x{}: plane size saturated at {} bytes",
            desc.pixelformat,
            req.width,
            req.height,
            config.get_max_plane_size()
        );
    }

    Ok(geometry)
}

/// Pixel layout of the auxiliary scaled output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScaleFormat {
    /// Semi-planar, interleaved chroma.
    #[default]
    Interleaved,
    /// Fully planar.
    Planar,
}

impl ScaleFormat {
    pub fn pixelformat(self) -> PixelFormat {
        match self {
            ScaleFormat::Interleaved => catalog::NV12,
            ScaleFormat::Planar => catalog::YUV420,
        }
    }
}

/// Target of the auxiliary scaled output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaleConfig {
    pub width: u32,
    pub height: u32,
    pub format: ScaleFormat,
}

/// Computes the layout of the scaled output. It does not depend on the
/// layout of the main channel.
pub fn scaled_geometry(
    scale: &ScaleConfig,
    codec: Option<CodecFamily>,
    height_align: u32,
    config: &EngineConfig,
) -> Result<Geometry, GeometryError> {
    compute(
        &GeometryRequest::new(scale.format.pixelformat(), scale.width, scale.height)
            .codec(codec)
            .height_align(height_align),
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::*;

    fn plane(bytesperline: u32, sizeimage: u32) -> PlaneLayout {
        PlaneLayout {
            sizeimage,
            bytesperline,
        }
    }

    fn layout(req: GeometryRequest) -> Vec<PlaneLayout> {
        compute(&req, &EngineConfig::new()).unwrap().planes
    }

    #[test]
    fn test_unknown_format() {
        let config = EngineConfig::new();
        let bogus = PixelFormat::from(b"XXXX");
        assert_eq!(
            compute(&GeometryRequest::new(bogus, 64, 64), &config),
            Err(GeometryError::InvalidFormat(bogus))
        );
        assert_eq!(
            compute(&GeometryRequest::new(NV12, 0, 64), &config),
            Err(GeometryError::InvalidDimensions(0, 64))
        );
    }

    #[test]
    fn test_single_plane_layouts() {
        assert_eq!(
            layout(GeometryRequest::new(NV12, 1280, 720)),
            vec![plane(1280, 1382400)]
        );
        // Width not on the stride alignment.
        assert_eq!(
            layout(GeometryRequest::new(NV12, 1000, 100)),
            vec![plane(1024, 1024 * 150)]
        );
        // I420: two quarter-size chroma planes.
        assert_eq!(
            layout(GeometryRequest::new(YUV420, 640, 480)),
            vec![plane(640, 640 * 480 + 2 * 320 * 240)]
        );
        assert_eq!(
            layout(GeometryRequest::new(NV16, 640, 480)),
            vec![plane(640, 640 * 480 * 2)]
        );
        assert_eq!(
            layout(GeometryRequest::new(YUYV, 640, 480)),
            vec![plane(1280, 1280 * 480)]
        );
        assert_eq!(
            layout(GeometryRequest::new(ARGB32, 100, 10)),
            vec![plane(448, 4480)]
        );
        assert_eq!(
            layout(GeometryRequest::new(P010, 1920, 1080)),
            vec![plane(3840, 3840 * 1620)]
        );
    }

    #[test]
    fn test_height_alignment() {
        assert_eq!(
            layout(GeometryRequest::new(NV12, 1920, 1080).height_align(16)),
            vec![plane(1920, 1920 * 1088 * 3 / 2)]
        );
        // Odd heights round chroma rows up.
        assert_eq!(
            layout(GeometryRequest::new(NV12, 64, 3)),
            vec![plane(64, 64 * 3 + 64 * 2)]
        );
    }

    #[test]
    fn test_client_stride() {
        assert_eq!(
            layout(GeometryRequest::new(NV12, 640, 480).stride(700)),
            vec![plane(704, 704 * 720)]
        );
        // Too small strides are ignored.
        assert_eq!(
            layout(GeometryRequest::new(NV12, 640, 480).stride(100)),
            vec![plane(640, 640 * 720)]
        );
    }

    #[test]
    fn test_multi_plane_layouts() {
        assert_eq!(
            layout(GeometryRequest::new(NV12M, 1920, 1080)),
            vec![plane(1920, 1920 * 1080), plane(1920, 1920 * 540)]
        );
        assert_eq!(
            layout(GeometryRequest::new(P010M, 1280, 720)),
            vec![plane(2560, 2560 * 720), plane(2560, 2560 * 360)]
        );
        assert_eq!(
            layout(GeometryRequest::new(YUV444M, 64, 64)),
            vec![plane(64, 4096); 3]
        );
        assert_eq!(
            layout(GeometryRequest::new(YUV422M, 128, 16)),
            vec![plane(128, 2048), plane(64, 1024), plane(64, 1024)]
        );
    }

    #[test]
    fn test_interleaved_chroma_not_inflated() {
        // 1088 is 64-aligned, and so is the interleaved chroma stride.
        assert_eq!(
            layout(GeometryRequest::new(NV12M, 1088, 16)),
            vec![plane(1088, 1088 * 16), plane(1088, 1088 * 8)]
        );
    }

    #[test]
    fn test_chroma_stride_correction() {
        assert_eq!(correct_chroma_stride(66, 32, 2), (128, 64));
        assert_eq!(correct_chroma_stride(96, 32, 2), (128, 64));
        assert_eq!(correct_chroma_stride(64, 32, 1), (64, 64));
        assert_eq!(correct_chroma_stride(100, 16, 4), (128, 32));

        // 3-plane 4:2:0 uses half the video alignment, so a 32-byte aligned
        // luma stride gets inflated until the chroma stride is aligned too.
        assert_eq!(
            layout(GeometryRequest::new(YUV420M, 96, 32)),
            vec![plane(128, 128 * 32), plane(64, 64 * 16), plane(64, 64 * 16)]
        );
        let planes = layout(GeometryRequest::new(YVU420M, 1920, 1080));
        assert_eq!(planes[0], plane(1920, 1920 * 1080));
        assert_eq!(planes[1], plane(960, 960 * 540));
        for p in &planes {
            assert_eq!(p.bytesperline % 32, 0);
        }
    }

    #[test]
    fn test_image_alignment() {
        assert_eq!(
            layout(GeometryRequest::new(NV12, 200, 16).codec(Some(CodecFamily::Jpeg))),
            vec![plane(208, 208 * 24)]
        );
        assert_eq!(
            layout(GeometryRequest::new(NV12, 200, 16).codec(Some(CodecFamily::H264))),
            vec![plane(256, 256 * 24)]
        );
    }

    #[test]
    fn test_coded_layout() {
        // Small frames get the minimum buffer.
        assert_eq!(
            layout(GeometryRequest::new(H264, 320, 240)),
            vec![plane(0, 1114112)]
        );
        assert_eq!(
            layout(GeometryRequest::new(HEVC, 1920, 1080)),
            vec![plane(0, 2142208)]
        );
        // Never shrinks below the previous size.
        assert_eq!(
            layout(GeometryRequest::new(HEVC, 1920, 1080).min_size(4 << 20)),
            vec![plane(0, 4 << 20)]
        );
    }

    #[test]
    fn test_tiled_layout() {
        assert_eq!(
            layout(GeometryRequest::new(AFBC_10, 3840, 2160)),
            vec![plane(0, 17108992)]
        );
        assert_eq!(
            layout(GeometryRequest::new(AFBC_8, 1920, 1080).tile_mode(TileMode::Blocks32x8)),
            vec![plane(0, 131072 + 3110400)]
        );
    }

    #[test]
    fn test_saturation() {
        let config = EngineConfig::new().max_plane_size(1 << 20);
        let geometry = compute(&GeometryRequest::new(NV12M, 1920, 1080), &config).unwrap();
        assert!(geometry.overflow);
        assert_eq!(geometry.planes[0].sizeimage, 1 << 20);
        assert_eq!(geometry.planes[0].bytesperline, 1920);
        // Only the planes above the limit are affected.
        assert_eq!(geometry.planes[1].sizeimage, 1920 * 540);

        let geometry = compute(&GeometryRequest::new(NV12M, 640, 480), &config).unwrap();
        assert!(!geometry.overflow);
    }

    #[test]
    fn test_monotonic_in_area() {
        let config = EngineConfig::new();
        for pixelformat in [NV12, NV12M, YUV420M, P010, AFBC_8, H264, YUYV] {
            let mut previous = 0;
            for (w, h) in [(64, 64), (176, 144), (640, 480), (1280, 720), (1920, 1080), (3840, 2160)] {
                let size = compute(&GeometryRequest::new(pixelformat, w, h), &config)
                    .unwrap()
                    .total_size();
                assert!(size >= previous, "{} {}x{}", pixelformat, w, h);
                previous = size;
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let config = EngineConfig::new();
        for pixelformat in [NV12, YUV420M, P010M, YUYV, H264] {
            let first = compute(&GeometryRequest::new(pixelformat, 1000, 562), &config).unwrap();
            let again = compute(
                &GeometryRequest::new(pixelformat, 1000, 562)
                    .stride(first.planes[0].bytesperline)
                    .min_size(first.planes[0].sizeimage),
                &config,
            )
            .unwrap();
            assert_eq!(first, again, "{}", pixelformat);
        }
    }

    #[test]
    fn test_scaled_geometry() {
        let config = EngineConfig::new();
        let scale = ScaleConfig {
            width: 640,
            height: 360,
            format: ScaleFormat::Planar,
        };
        let geometry = scaled_geometry(&scale, Some(CodecFamily::Hevc), 16, &config).unwrap();
        assert_eq!(geometry.planes, vec![plane(640, 640 * 368 * 3 / 2)]);

        let scale = ScaleConfig {
            format: ScaleFormat::Interleaved,
            ..scale
        };
        let geometry = scaled_geometry(&scale, None, 1, &config).unwrap();
        assert_eq!(geometry.planes, vec![plane(640, 640 * 540)]);
    }
}
