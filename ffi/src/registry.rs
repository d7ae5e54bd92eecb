//! Capability registry bindings.
#![allow(non_camel_case_types)]

use std::os::raw::c_int;
use std::sync::Arc;

use anyhow::anyhow;
use log::{error, warn};
use vcfmt::caps::{BitDepths, CodecFeatures, HardwareCapability, HardwareInfo, Registry};
use vcfmt::catalog::CodecFamily;

use crate::EINVAL;

/// C mirror of [`HardwareCapability`], for the codec identified by `codec`.
#[repr(C)]
pub struct vcfmt_codec_caps {
    /// Internal codec code, as listed by [`CodecFamily`].
    pub codec: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub width_align: u32,
    pub height_align: u32,
    /// Bitmask of `VCFMT_DEPTH_*`.
    pub bit_depths: u32,
    pub profiles: u32,
    pub levels: u32,
    pub max_tier: u32,
    pub max_ref_frames: u32,
    pub max_roi_regions: u32,
    pub max_ipcm_regions: u32,
    /// Bitmask of `VCFMT_FEATURE_*`.
    pub features: u32,
    pub max_bitrate: u32,
    pub min_qp: u32,
    pub max_qp: u32,
    pub max_gop_size: u32,
    pub max_b_frames: u32,
}

/// Capability report of the firmware.
#[repr(C)]
pub struct vcfmt_hw_info {
    pub encoders: *const vcfmt_codec_caps,
    pub num_encoders: usize,
    pub decoders: *const vcfmt_codec_caps,
    pub num_decoders: usize,
    pub scaler: bool,
}

pub const VCFMT_DEPTH_8: u32 = BitDepths::DEPTH_8.bits();
pub const VCFMT_DEPTH_10: u32 = BitDepths::DEPTH_10.bits();
pub const VCFMT_FEATURE_LOOP_FILTER: u32 = CodecFeatures::LOOP_FILTER.bits();
pub const VCFMT_FEATURE_TILING: u32 = CodecFeatures::TILING.bits();
pub const VCFMT_FEATURE_ROTATION: u32 = CodecFeatures::ROTATION.bits();

/// Opaque handle to a capability registry.
pub struct vcfmt_registry {
    pub(crate) registry: Arc<Registry>,
}

impl From<&vcfmt_codec_caps> for HardwareCapability {
    fn from(caps: &vcfmt_codec_caps) -> Self {
        HardwareCapability {
            min_width: caps.min_width,
            max_width: caps.max_width,
            min_height: caps.min_height,
            max_height: caps.max_height,
            width_align: caps.width_align,
            height_align: caps.height_align,
            bit_depths: BitDepths::from_bits_truncate(caps.bit_depths),
            profiles: caps.profiles,
            levels: caps.levels,
            max_tier: caps.max_tier,
            max_ref_frames: caps.max_ref_frames,
            max_roi_regions: caps.max_roi_regions,
            max_ipcm_regions: caps.max_ipcm_regions,
            features: CodecFeatures::from_bits_truncate(caps.features),
            max_bitrate: caps.max_bitrate,
            min_qp: caps.min_qp,
            max_qp: caps.max_qp,
            max_gop_size: caps.max_gop_size,
            max_b_frames: caps.max_b_frames,
        }
    }
}

/// Turns a C array of records into `(codec, capability)` pairs. Records with
/// an unknown codec code are skipped.
///
/// # Safety
///
/// `records` must be valid for reading `len` elements, or `len` must be zero.
unsafe fn codec_records(
    records: *const vcfmt_codec_caps,
    len: usize,
) -> anyhow::Result<Vec<(CodecFamily, HardwareCapability)>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if records.is_null() {
        return Err(anyhow!("null capability array of {} records", len));
    }

    let records = std::slice::from_raw_parts(records, len);
    Ok(records
        .iter()
        .filter_map(|caps| match CodecFamily::n(caps.codec) {
            Some(codec) => Some((codec, HardwareCapability::from(caps))),
            None => {
                warn!("Ignoring capabilities of unknown codec {}", caps.codec);
                None
            }
        })
        .collect())
}

unsafe fn hw_info_from_c(info: &vcfmt_hw_info) -> anyhow::Result<HardwareInfo> {
    let mut hw_info = HardwareInfo::new();
    for (codec, caps) in codec_records(info.encoders, info.num_encoders)? {
        hw_info = hw_info.with_encoder(codec, caps);
    }
    for (codec, caps) in codec_records(info.decoders, info.num_decoders)? {
        hw_info = hw_info.with_decoder(codec, caps);
    }
    if info.scaler {
        hw_info = hw_info.with_scaler();
    }
    Ok(hw_info)
}

/// Create a new registry with every format disabled.
///
/// The returned pointer must be released with [`vcfmt_registry_destroy`].
#[no_mangle]
pub extern "C" fn vcfmt_registry_new() -> *mut vcfmt_registry {
    Box::into_raw(Box::new(vcfmt_registry {
        registry: Arc::new(Registry::new()),
    }))
}

/// Install the capabilities reported by the firmware into `registry`.
///
/// Sessions pick up the new capabilities at their next operation.
///
/// # Safety
///
/// `registry` must be a pointer returned by [`vcfmt_registry_new`], and `info`
/// must point to a valid `vcfmt_hw_info` whose arrays hold the number of
/// records it announces.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_registry_install(
    registry: *const vcfmt_registry,
    info: *const vcfmt_hw_info,
) -> c_int {
    let (registry, info) = match (registry.as_ref(), info.as_ref()) {
        (Some(registry), Some(info)) => (registry, info),
        _ => {
            error!("vcfmt_registry_install: null argument");
            return EINVAL;
        }
    };

    match hw_info_from_c(info) {
        Ok(hw_info) => {
            registry.registry.install(hw_info);
            0
        }
        Err(e) => {
            error!("Cannot install capabilities: {:#}", e);
            EINVAL
        }
    }
}

/// Release `registry`. Sessions created from it remain valid.
///
/// # Safety
///
/// `registry` must be null or a pointer returned by [`vcfmt_registry_new`]
/// that has not been destroyed yet.
#[no_mangle]
pub unsafe extern "C" fn vcfmt_registry_destroy(registry: *mut vcfmt_registry) {
    if registry.is_null() {
        warn!("Called vcfmt_registry_destroy with a NULL registry");
        return;
    }

    drop(Box::from_raw(registry));
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcfmt::catalog::formats::*;
    use vcfmt::SessionRole;

    fn h264_record() -> vcfmt_codec_caps {
        vcfmt_codec_caps {
            codec: CodecFamily::H264 as u32,
            min_width: 64,
            max_width: 4096,
            min_height: 64,
            max_height: 2304,
            width_align: 16,
            height_align: 16,
            bit_depths: VCFMT_DEPTH_8 | 0x100,
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

    #[test]
    fn test_install() {
        let records = [h264_record(), vcfmt_codec_caps { codec: 77, ..h264_record() }];
        let info = vcfmt_hw_info {
            encoders: records.as_ptr(),
            num_encoders: records.len(),
            decoders: std::ptr::null(),
            num_decoders: 0,
            scaler: false,
        };

        let registry = vcfmt_registry_new();
        unsafe {
            assert_eq!(vcfmt_registry_install(registry, &info), 0);
            let snapshot = (*registry).registry.snapshot();
            assert_eq!(snapshot.info().encoders.len(), 1);
            // Unknown bits are dropped.
            assert_eq!(
                snapshot.codec_caps(SessionRole::Encoder, CodecFamily::H264),
                Some(&HardwareCapability::default())
            );
            assert!(snapshot
                .frame_size_range(SessionRole::Encoder, H264, None)
                .is_some());
            vcfmt_registry_destroy(registry);
        }
    }

    #[test]
    fn test_install_null_array() {
        let info = vcfmt_hw_info {
            encoders: std::ptr::null(),
            num_encoders: 2,
            decoders: std::ptr::null(),
            num_decoders: 0,
            scaler: true,
        };

        let registry = vcfmt_registry_new();
        unsafe {
            assert_eq!(vcfmt_registry_install(registry, &info), EINVAL);
            assert_eq!(vcfmt_registry_install(registry, std::ptr::null()), EINVAL);
            assert!(!(*registry).registry.snapshot().info().scaler);
            vcfmt_registry_destroy(registry);
        }
    }
}
