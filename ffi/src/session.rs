//! Session bindings.
//!
//! Queue directions are passed as `VCFMT_DIR_OUTPUT` or `VCFMT_DIR_CAPTURE`,
//! and session roles as `VCFMT_ROLE_ENCODER` or `VCFMT_ROLE_DECODER`.
#![allow(non_camel_case_types)]

use std::os::raw::c_int;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use log::{debug, error, warn};
use vcfmt::caps::ClampPolicy;
use vcfmt::config::EngineConfig;
use vcfmt::geometry::TileMode;
use vcfmt::region::RegionKind;
use vcfmt::session::{ResolveError, ResolvedFormat, SelectionFlags, Session};
use vcfmt::{Colorimetry, Colorspace, Format, PlaneLayout, Quantization, QueueDirection, Rect};
use vcfmt::{SessionRole, XferFunc, YCbCrEncoding};

use crate::registry::vcfmt_registry;
use crate::{neg_errno, EINVAL};

pub const VCFMT_MAX_PLANES: usize = 3;

pub const VCFMT_DIR_OUTPUT: u32 = 0;
pub const VCFMT_DIR_CAPTURE: u32 = 1;

pub const VCFMT_ROLE_ENCODER: u32 = SessionRole::Encoder as u32;
pub const VCFMT_ROLE_DECODER: u32 = SessionRole::Decoder as u32;

/// Round requested dimensions down instead of up.
pub const VCFMT_FMT_FLAG_LE: u32 = 0x1;

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct vcfmt_plane {
    pub sizeimage: u32,
    pub bytesperline: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct vcfmt_rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Format of a queue.
///
/// Only the fields up to `quantization` are read from requests. The whole
/// structure is filled on return.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct vcfmt_format {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub num_planes: u32,
    pub planes: [vcfmt_plane; VCFMT_MAX_PLANES],
    pub colorspace: u32,
    pub xfer_func: u32,
    pub ycbcr_enc: u32,
    pub quantization: u32,
    /// Visible area of the frames.
    pub crop: vcfmt_rect,
    /// Bits per sample, zero on bitstream queues.
    pub bit_depth: u32,
    /// Set if a plane has been saturated at the size limit.
    pub overflow: bool,
}

/// Engine tunables given to [`vcfmt_session_new`].
#[repr(C)]
pub struct vcfmt_config {
    pub max_plane_size: u32,
    pub capped_buffer_count: u32,
    pub min_buffers: u32,
    pub max_buffers: u32,
    pub default_width: u32,
    pub default_height: u32,
    pub legacy_crop_top_check: bool,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct vcfmt_frmsize {
    pub min_width: u32,
    pub max_width: u32,
    pub step_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub step_height: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct vcfmt_buffer_config {
    pub count: u32,
    pub num_planes: u32,
    pub plane_sizes: [u32; VCFMT_MAX_PLANES],
    /// Planes of the scaled output, zero when the scaler is disabled.
    pub num_aux_planes: u32,
    pub aux_plane_sizes: [u32; VCFMT_MAX_PLANES],
}

/// Opaque handle to a session.
pub struct vcfmt_session {
    session: Session,
}

impl From<&vcfmt_config> for EngineConfig {
    fn from(config: &vcfmt_config) -> Self {
        EngineConfig::new()
            .max_plane_size(config.max_plane_size)
            .capped_buffer_count(config.capped_buffer_count)
            .buffer_count_range(config.min_buffers, config.max_buffers)
            .default_resolution(config.default_width, config.default_height)
            .legacy_crop_top_check(config.legacy_crop_top_check)
    }
}

impl From<vcfmt_rect> for Rect {
    fn from(rect: vcfmt_rect) -> Self {
        Rect::new(rect.left, rect.top, rect.width, rect.height)
    }
}

impl From<Rect> for vcfmt_rect {
    fn from(rect: Rect) -> Self {
        vcfmt_rect {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

fn direction(direction: u32) -> anyhow::Result<QueueDirection> {
    match direction {
        VCFMT_DIR_OUTPUT => Ok(QueueDirection::Output),
        VCFMT_DIR_CAPTURE => Ok(QueueDirection::Capture),
        _ => Err(anyhow!("invalid queue direction {}", direction)),
    }
}

fn format_from_c(fmt: &vcfmt_format) -> anyhow::Result<Format> {
    let num_planes = fmt.num_planes as usize;
    if num_planes > VCFMT_MAX_PLANES {
        return Err(anyhow!("{} planes requested", num_planes));
    }

    Ok(Format {
        width: fmt.width,
        height: fmt.height,
        pixelformat: fmt.pixelformat.into(),
        plane_fmt: fmt.planes[..num_planes]
            .iter()
            .map(|p| PlaneLayout {
                sizeimage: p.sizeimage,
                bytesperline: p.bytesperline,
            })
            .collect(),
        colorimetry: Colorimetry {
            colorspace: Colorspace::n(fmt.colorspace)
                .with_context(|| format!("invalid colorspace {}", fmt.colorspace))?,
            xfer_func: XferFunc::n(fmt.xfer_func)
                .with_context(|| format!("invalid transfer function {}", fmt.xfer_func))?,
            ycbcr_enc: YCbCrEncoding::n(fmt.ycbcr_enc)
                .with_context(|| format!("invalid YCbCr encoding {}", fmt.ycbcr_enc))?,
            quantization: Quantization::n(fmt.quantization)
                .with_context(|| format!("invalid quantization {}", fmt.quantization))?,
        },
    })
}

fn format_to_c(resolved: &ResolvedFormat) -> vcfmt_format {
    let format = &resolved.format;
    let mut planes = [vcfmt_plane::default(); VCFMT_MAX_PLANES];
    for (dst, src) in planes.iter_mut().zip(format.plane_fmt.iter()) {
        *dst = vcfmt_plane {
            sizeimage: src.sizeimage,
            bytesperline: src.bytesperline,
        };
    }

    vcfmt_format {
        width: format.width,
        height: format.height,
        pixelformat: format.pixelformat.into(),
        num_planes: format.plane_fmt.len().min(VCFMT_MAX_PLANES) as u32,
        planes,
        colorspace: format.colorimetry.colorspace as u32,
        xfer_func: format.colorimetry.xfer_func as u32,
        ycbcr_enc: format.colorimetry.ycbcr_enc as u32,
        quantization: format.colorimetry.quantization as u32,
        crop: resolved.crop.into(),
        bit_depth: resolved.bit_depth as u32,
        overflow: resolved.overflow,
    }
}

/// Logs an argument error and turns it into `-EINVAL`.
fn invalid_argument<T>(func: &str, result: anyhow::Result<T>) -> Result<T, c_int> {
    result.map_err(|e| {
        error!("{}: {:#}", func, e);
        EINVAL
    })
}

/// Logs a negotiation error and turns it into a negative errno.
fn failed(func: &str, err: ResolveError) -> c_int {
    error!("{}: {}", func, err);
    neg_errno(err)
}

fn vcfmt_session_new_safe(
    registry: &vcfmt_registry,
    role: u32,
    config: Option<&vcfmt_config>,
) -> anyhow::Result<vcfmt_session> {
    let role = SessionRole::n(role).with_context(|| format!("invalid session role {}", role))?;
    let config = config.map(EngineConfig::from).unwrap_or_default();
    let session = Session::open(Arc::clone(&registry.registry), role, config)?;

    Ok(vcfmt_session { session })
}

/// Create a new session of `role` using the capabilities of `registry`.
///
/// `config` may be NULL, in which case the default tunables are used.
///
/// Returns NULL if no format is usable with the current capabilities. The
/// returned pointer must be released with [`vcfmt_session_destroy`].
///
/// # Safety
///
/// `registry` must be a valid pointer returned by
/// [`crate::registry::vcfmt_registry_new`]. `config` must be NULL or point to
/// a valid `vcfmt_config`.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_new(
    registry: *const vcfmt_registry,
    role: u32,
    config: *const vcfmt_config,
) -> *mut vcfmt_session {
    let registry = match registry.as_ref() {
        Some(registry) => registry,
        None => {
            error!("vcfmt_session_new: NULL registry");
            return std::ptr::null_mut();
        }
    };

    match vcfmt_session_new_safe(registry, role, config.as_ref()) {
        Ok(session) => Box::into_raw(Box::new(session)),
        Err(e) => {
            error!("Cannot create session: {:#}", e);
            std::ptr::null_mut()
        }
    }
}

/// Release `session`.
///
/// # Safety
///
/// `session` must be null or a pointer returned by [`vcfmt_session_new`] that
/// has not been destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_destroy(session: *mut vcfmt_session) {
    if session.is_null() {
        warn!("Called vcfmt_session_destroy with a NULL session");
        return;
    }

    drop(Box::from_raw(session));
}

fn vcfmt_session_s_fmt_safe(
    session: &mut vcfmt_session,
    dir: u32,
    fmt: &mut vcfmt_format,
    flags: u32,
) -> Result<u32, c_int> {
    const FUNC: &str = "vcfmt_session_s_fmt";
    let direction = invalid_argument(FUNC, direction(dir))?;
    let requested = invalid_argument(FUNC, format_from_c(fmt))?;
    let policy = if flags & VCFMT_FMT_FLAG_LE != 0 {
        ClampPolicy::Le
    } else {
        ClampPolicy::Ge
    };

    let (resolved, changed) = session
        .session
        .set_format_with(direction, &requested, policy)
        .map_err(|e| failed(FUNC, e))?;
    *fmt = format_to_c(&resolved);

    Ok(changed.bits())
}

/// Set the format of the `dir` queue to `fmt`, and update `fmt` with the
/// format actually applied.
///
/// `flags` is a combination of `VCFMT_FMT_FLAG_*`. If `changed` is not NULL,
/// it receives the `ChangedParams` bits of the parameters that were modified.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`],
/// `fmt` must point to a valid `vcfmt_format`, and `changed` must be NULL or
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_s_fmt(
    session: *mut vcfmt_session,
    dir: u32,
    fmt: *mut vcfmt_format,
    flags: u32,
    changed: *mut u32,
) -> c_int {
    let (session, fmt) = match (session.as_mut(), fmt.as_mut()) {
        (Some(session), Some(fmt)) => (session, fmt),
        _ => {
            error!("vcfmt_session_s_fmt: NULL argument");
            return EINVAL;
        }
    };

    match vcfmt_session_s_fmt_safe(session, dir, fmt, flags) {
        Ok(bits) => {
            if let Some(changed) = changed.as_mut() {
                *changed = bits;
            }
            0
        }
        Err(errno) => errno,
    }
}

/// Resolve `fmt` for the `dir` queue without applying it. `fmt` is updated
/// with the result.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`] and
/// `fmt` must point to a valid `vcfmt_format`.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_try_fmt(
    session: *const vcfmt_session,
    dir: u32,
    fmt: *mut vcfmt_format,
) -> c_int {
    const FUNC: &str = "vcfmt_session_try_fmt";
    let (session, fmt) = match (session.as_ref(), fmt.as_mut()) {
        (Some(session), Some(fmt)) => (session, fmt),
        _ => {
            error!("{}: NULL argument", FUNC);
            return EINVAL;
        }
    };

    let result = invalid_argument(FUNC, direction(dir).and_then(|d| Ok((d, format_from_c(fmt)?))))
        .and_then(|(direction, requested)| {
            session
                .session
                .try_format(direction, &requested)
                .map_err(|e| failed(FUNC, e))
        });

    match result {
        Ok(resolved) => {
            *fmt = format_to_c(&resolved);
            0
        }
        Err(errno) => errno,
    }
}

/// Write the current format of the `dir` queue into `fmt`.
///
/// Fails with `-EINVAL` if the stored format is not usable anymore with the
/// currently installed capabilities.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`] and
/// `fmt` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_g_fmt(
    session: *const vcfmt_session,
    dir: u32,
    fmt: *mut vcfmt_format,
) -> c_int {
    const FUNC: &str = "vcfmt_session_g_fmt";
    let (session, fmt) = match (session.as_ref(), fmt.as_mut()) {
        (Some(session), Some(fmt)) => (session, fmt),
        _ => {
            error!("{}: NULL argument", FUNC);
            return EINVAL;
        }
    };

    let result = invalid_argument(FUNC, direction(dir)).and_then(|direction| {
        session
            .session
            .get_format(direction)
            .map_err(|e| failed(FUNC, e))
    });

    match result {
        Ok(resolved) => {
            *fmt = format_to_c(&resolved);
            0
        }
        Err(errno) => errno,
    }
}

/// Write the pixel format at position `index` of the formats usable on the
/// `dir` queue into `pixelformat`. Returns `-EINVAL` past the last format.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`] and
/// `pixelformat` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_enum_fmt(
    session: *const vcfmt_session,
    dir: u32,
    index: u32,
    pixelformat: *mut u32,
) -> c_int {
    const FUNC: &str = "vcfmt_session_enum_fmt";
    let (session, pixelformat) = match (session.as_ref(), pixelformat.as_mut()) {
        (Some(session), Some(pixelformat)) => (session, pixelformat),
        _ => {
            error!("{}: NULL argument", FUNC);
            return EINVAL;
        }
    };
    let direction = match invalid_argument(FUNC, direction(dir)) {
        Ok(direction) => direction,
        Err(errno) => return errno,
    };

    match session.session.enum_fmt(direction, index) {
        Ok(desc) => {
            *pixelformat = desc.pixelformat.into();
            0
        }
        // The normal end of an enumeration.
        Err(e @ ResolveError::EndOfSequence(_)) => {
            debug!("{}: {}", FUNC, e);
            neg_errno(e)
        }
        Err(e) => failed(FUNC, e),
    }
}

/// Write the frame size range of `pixelformat` into `frmsize`.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`] and
/// `frmsize` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_enum_framesizes(
    session: *const vcfmt_session,
    pixelformat: u32,
    frmsize: *mut vcfmt_frmsize,
) -> c_int {
    const FUNC: &str = "vcfmt_session_enum_framesizes";
    let (session, frmsize) = match (session.as_ref(), frmsize.as_mut()) {
        (Some(session), Some(frmsize)) => (session, frmsize),
        _ => {
            error!("{}: NULL argument", FUNC);
            return EINVAL;
        }
    };

    match session.session.query_frame_size_range(pixelformat.into()) {
        Ok(range) => {
            *frmsize = vcfmt_frmsize {
                min_width: range.min_width,
                max_width: range.max_width,
                step_width: range.step_width,
                min_height: range.min_height,
                max_height: range.max_height,
                step_height: range.step_height,
            };
            0
        }
        Err(e) => failed(FUNC, e),
    }
}

/// Compute the number and sizes of the buffers to allocate for the `dir`
/// queue, starting from `count` requested buffers.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`] and
/// `config` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_buffer_config(
    session: *const vcfmt_session,
    dir: u32,
    count: u32,
    config: *mut vcfmt_buffer_config,
) -> c_int {
    const FUNC: &str = "vcfmt_session_buffer_config";
    let (session, config) = match (session.as_ref(), config.as_mut()) {
        (Some(session), Some(config)) => (session, config),
        _ => {
            error!("{}: NULL argument", FUNC);
            return EINVAL;
        }
    };

    let result = invalid_argument(FUNC, direction(dir)).and_then(|direction| {
        session
            .session
            .buffer_config(direction, count)
            .map_err(|e| failed(FUNC, e))
    });

    match result {
        Ok(buffers) => {
            let mut out = vcfmt_buffer_config {
                count: buffers.count,
                num_planes: buffers.plane_sizes.len().min(VCFMT_MAX_PLANES) as u32,
                num_aux_planes: buffers.aux_plane_sizes.len().min(VCFMT_MAX_PLANES) as u32,
                ..Default::default()
            };
            for (dst, src) in out.plane_sizes.iter_mut().zip(buffers.plane_sizes) {
                *dst = src;
            }
            for (dst, src) in out.aux_plane_sizes.iter_mut().zip(buffers.aux_plane_sizes) {
                *dst = src;
            }
            *config = out;
            0
        }
        Err(errno) => errno,
    }
}

/// Set the crop rectangle of the raw queue `dir`. `rect` is updated with the
/// rectangle actually applied.
///
/// `flags` takes the `V4L2_SEL_FLAG_GE` and `V4L2_SEL_FLAG_LE` values.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`],
/// `rect` must point to a valid `vcfmt_rect`, and `changed` must be NULL or
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_s_selection(
    session: *mut vcfmt_session,
    dir: u32,
    rect: *mut vcfmt_rect,
    flags: u32,
    changed: *mut u32,
) -> c_int {
    const FUNC: &str = "vcfmt_session_s_selection";
    let (session, rect) = match (session.as_mut(), rect.as_mut()) {
        (Some(session), Some(rect)) => (session, rect),
        _ => {
            error!("{}: NULL argument", FUNC);
            return EINVAL;
        }
    };
    let direction = match invalid_argument(FUNC, direction(dir)) {
        Ok(direction) => direction,
        Err(errno) => return errno,
    };

    let flags = SelectionFlags::from_bits_truncate(flags);
    match session
        .session
        .set_selection(direction, &Rect::from(*rect), flags)
    {
        Ok((crop, bits)) => {
            *rect = crop.into();
            if let Some(changed) = changed.as_mut() {
                *changed = bits.bits();
            }
            0
        }
        Err(e) => failed(FUNC, e),
    }
}

/// Select the block shape of block-compressed formats. Returns the
/// `ChangedParams` bits of the modified parameters, or a negative errno if
/// `mode` is unknown or the raw queue cannot be laid out with it.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`].
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_s_tile_mode(
    session: *mut vcfmt_session,
    mode: u32,
) -> c_int {
    const FUNC: &str = "vcfmt_session_s_tile_mode";
    let session = match session.as_mut() {
        Some(session) => session,
        None => {
            error!("{}: NULL session", FUNC);
            return EINVAL;
        }
    };

    let mode = match TileMode::n(mode) {
        Some(mode) => mode,
        None => {
            error!("{}: invalid tile mode {}", FUNC, mode);
            return EINVAL;
        }
    };

    match session.session.set_tile_mode(mode) {
        Ok(changed) => changed.bits() as c_int,
        Err(e) => failed(FUNC, e),
    }
}

/// Replace the regions of `kind` (0 for ROI, 1 for IPCM) with the content of
/// the `size` bytes of `blob`.
///
/// # Safety
///
/// `session` must be a valid pointer returned by [`vcfmt_session_new`],
/// `blob` must be valid for reading `size` bytes, and `changed` must be NULL
/// or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_session_s_regions(
    session: *mut vcfmt_session,
    kind: u32,
    blob: *const u8,
    size: usize,
    changed: *mut u32,
) -> c_int {
    const FUNC: &str = "vcfmt_session_s_regions";
    let session = match session.as_mut() {
        Some(session) if !blob.is_null() => session,
        _ => {
            error!("{}: NULL argument", FUNC);
            return EINVAL;
        }
    };
    let kind = match invalid_argument(
        FUNC,
        RegionKind::n(kind).with_context(|| format!("invalid region kind {}", kind)),
    ) {
        Ok(kind) => kind,
        Err(errno) => return errno,
    };

    let blob = std::slice::from_raw_parts(blob, size);
    match session.session.apply_region_blob(kind, blob) {
        Ok(bits) => {
            if let Some(changed) = changed.as_mut() {
                *changed = bits.bits();
            }
            0
        }
        Err(e) => failed(FUNC, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::*;
    use vcfmt::catalog::formats::*;
    use vcfmt::catalog::CodecFamily;
    use vcfmt::region::REGION_BLOB_SIZE;
    use vcfmt::session::ChangedParams;

    fn h264_record() -> vcfmt_codec_caps {
        vcfmt_codec_caps {
            codec: CodecFamily::H264 as u32,
            min_width: 64,
            max_width: 4096,
            min_height: 64,
            max_height: 2304,
            width_align: 16,
            height_align: 16,
            bit_depths: VCFMT_DEPTH_8,
            profiles: 0x7,
            levels: 0xffff,
            max_tier: 0,
            max_ref_frames: 4,
            max_roi_regions: 8,
            max_ipcm_regions: 4,
            features: VCFMT_FEATURE_LOOP_FILTER,
            max_bitrate: 100_000_000,
            min_qp: 0,
            max_qp: 51,
            max_gop_size: 1024,
            max_b_frames: 2,
        }
    }

    /// Returns an encoder session on H.264-only hardware.
    unsafe fn encoder() -> (*mut vcfmt_registry, *mut vcfmt_session) {
        let records = [h264_record()];
        let info = vcfmt_hw_info {
            encoders: records.as_ptr(),
            num_encoders: 1,
            decoders: records.as_ptr(),
            num_decoders: 1,
            scaler: false,
        };
        let registry = vcfmt_registry_new();
        assert_eq!(vcfmt_registry_install(registry, &info), 0);
        let session = vcfmt_session_new(registry, VCFMT_ROLE_ENCODER, std::ptr::null());
        assert!(!session.is_null());
        (registry, session)
    }

    #[test]
    fn test_new_without_capabilities() {
        unsafe {
            let registry = vcfmt_registry_new();
            let session = vcfmt_session_new(registry, VCFMT_ROLE_DECODER, std::ptr::null());
            assert!(session.is_null());
            assert!(vcfmt_session_new(registry, 7, std::ptr::null()).is_null());
            vcfmt_registry_destroy(registry);
        }
    }

    #[test]
    fn test_s_fmt_g_fmt() {
        unsafe {
            let (registry, session) = encoder();
            // The session keeps the capabilities alive.
            vcfmt_registry_destroy(registry);

            let mut fmt = vcfmt_format {
                width: 1280,
                height: 720,
                pixelformat: NV12M.into(),
                ..Default::default()
            };
            let mut changed = 0;
            assert_eq!(
                vcfmt_session_s_fmt(session, VCFMT_DIR_OUTPUT, &mut fmt, 0, &mut changed),
                0
            );
            assert_eq!(fmt.num_planes, 2);
            assert_eq!(fmt.planes[0].bytesperline, 1280);
            assert_eq!(fmt.planes[0].sizeimage, 1280 * 720);
            assert_eq!(fmt.bit_depth, 8);
            assert!(ChangedParams::from_bits_truncate(changed).contains(ChangedParams::FORMAT));

            let mut current = vcfmt_format::default();
            assert_eq!(vcfmt_session_g_fmt(session, VCFMT_DIR_OUTPUT, &mut current), 0);
            assert_eq!(current.pixelformat, u32::from(NV12M));
            assert_eq!((current.crop.width, current.crop.height), (1280, 720));

            vcfmt_session_destroy(session);
        }
    }

    #[test]
    fn test_s_fmt_errors() {
        unsafe {
            let (registry, session) = encoder();

            let mut fmt = vcfmt_format {
                width: 640,
                height: 480,
                pixelformat: HEVC.into(),
                ..Default::default()
            };
            assert_eq!(
                vcfmt_session_s_fmt(session, VCFMT_DIR_CAPTURE, &mut fmt, 0, std::ptr::null_mut()),
                EINVAL
            );
            fmt.pixelformat = NV12.into();
            fmt.colorspace = 99;
            assert_eq!(
                vcfmt_session_s_fmt(session, VCFMT_DIR_OUTPUT, &mut fmt, 0, std::ptr::null_mut()),
                EINVAL
            );
            assert_eq!(vcfmt_session_try_fmt(session, 5, &mut fmt), EINVAL);
            assert_eq!(
                vcfmt_session_g_fmt(session, VCFMT_DIR_OUTPUT, std::ptr::null_mut()),
                EINVAL
            );

            vcfmt_session_destroy(session);
            vcfmt_registry_destroy(registry);
        }
    }

    #[test]
    fn test_enumeration() {
        unsafe {
            let (registry, session) = encoder();

            let mut pixelformat = 0;
            assert_eq!(
                vcfmt_session_enum_fmt(session, VCFMT_DIR_CAPTURE, 0, &mut pixelformat),
                0
            );
            assert_eq!(pixelformat, u32::from(H264));
            assert_eq!(
                vcfmt_session_enum_fmt(session, VCFMT_DIR_CAPTURE, 1, &mut pixelformat),
                EINVAL
            );

            let mut frmsize = vcfmt_frmsize::default();
            assert_eq!(
                vcfmt_session_enum_framesizes(session, H264.into(), &mut frmsize),
                0
            );
            assert_eq!((frmsize.max_width, frmsize.step_height), (4096, 16));

            vcfmt_session_destroy(session);
            vcfmt_registry_destroy(registry);
        }
    }

    #[test]
    fn test_buffer_config() {
        unsafe {
            let (registry, session) = encoder();

            let mut config = vcfmt_buffer_config::default();
            assert_eq!(
                vcfmt_session_buffer_config(session, VCFMT_DIR_OUTPUT, 64, &mut config),
                0
            );
            assert_eq!(config.count, 32);
            assert_eq!(config.num_planes, 1);
            assert_eq!(config.plane_sizes[0], 1920 * 1088 * 3 / 2);
            assert_eq!(config.num_aux_planes, 0);

            vcfmt_session_destroy(session);
            vcfmt_registry_destroy(registry);
        }
    }

    #[test]
    fn test_selection_and_regions() {
        unsafe {
            let (registry, session) = encoder();

            let mut rect = vcfmt_rect {
                left: 3,
                top: 5,
                width: 101,
                height: 51,
            };
            let mut changed = 0;
            assert_eq!(
                vcfmt_session_s_selection(session, VCFMT_DIR_OUTPUT, &mut rect, 0x2, &mut changed),
                0
            );
            assert_eq!((rect.left, rect.top, rect.width, rect.height), (4, 6, 100, 50));
            assert_eq!(changed, ChangedParams::CROP.bits());

            let blob = [0u8; REGION_BLOB_SIZE];
            assert_eq!(
                vcfmt_session_s_regions(session, 0, blob.as_ptr(), blob.len(), &mut changed),
                0
            );
            assert_eq!(
                vcfmt_session_s_regions(session, 0, blob.as_ptr(), 10, std::ptr::null_mut()),
                EINVAL
            );
            assert_eq!(
                vcfmt_session_s_regions(session, 9, blob.as_ptr(), blob.len(), std::ptr::null_mut()),
                EINVAL
            );

            assert_eq!(vcfmt_session_s_tile_mode(session, 5), EINVAL);
            assert_eq!(
                vcfmt_session_s_tile_mode(session, 1),
                ChangedParams::TILE_MODE.bits() as c_int
            );

            vcfmt_session_destroy(session);
            vcfmt_registry_destroy(registry);
        }
    }
}
