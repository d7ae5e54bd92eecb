//! Hardware capability registry.
//!
//! The capabilities of a hardware instance are reported once by the firmware
//! at bring-up, as a [`HardwareInfo`]. Installing it into a [`Registry`]
//! produces an immutable [`CapabilitySnapshot`], which also carries the
//! derived catalog enablement and tunable ranges. Sessions take a reference to
//! the current snapshot for each operation; installing a new snapshot swaps
//! the handle atomically and never mutates a snapshot someone else is reading.
pub mod controls;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use bitflags::bitflags;
use log::{debug, warn};

use crate::catalog::{self, CodecFamily, EnabledFormats, InternalFormat, RawFormat, Roles};
use crate::{align_down, align_up, PixelFormat, SessionRole};

pub use controls::*;

bitflags! {
    /// Supported component bit depths.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BitDepths: u32 {
        const DEPTH_8 = 0x1;
        const DEPTH_10 = 0x2;
    }
}

impl BitDepths {
    /// Returns the flag matching `depth` bits per sample, if there is one.
    pub fn from_depth(depth: u8) -> Option<Self> {
        match depth {
            8 => Some(BitDepths::DEPTH_8),
            10 => Some(BitDepths::DEPTH_10),
            _ => None,
        }
    }

    pub fn supports(self, depth: u8) -> bool {
        BitDepths::from_depth(depth)
            .map(|d| self.contains(d))
            .unwrap_or(false)
    }
}

bitflags! {
    /// Optional codec features.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CodecFeatures: u32 {
        const LOOP_FILTER = 0x1;
        /// Block-compressed (tiled) frame layouts.
        const TILING = 0x2;
        const ROTATION = 0x4;
    }
}

/// Capabilities of one codec family in one role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HardwareCapability {
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Width granularity of frames.
    pub width_align: u32,
    /// Height granularity of frames.
    pub height_align: u32,
    pub bit_depths: BitDepths,
    /// Bitmap of supported profiles, indexed by the codec's profile number.
    pub profiles: u32,
    /// Bitmap of supported levels, indexed by the codec's level number.
    pub levels: u32,
    pub max_tier: u32,
    pub max_ref_frames: u32,
    pub max_roi_regions: u32,
    pub max_ipcm_regions: u32,
    pub features: CodecFeatures,
    pub max_bitrate: u32,
    pub min_qp: u32,
    pub max_qp: u32,
    pub max_gop_size: u32,
    pub max_b_frames: u32,
}

impl Default for HardwareCapability {
    fn default() -> Self {
        HardwareCapability {
            min_width: 64,
            max_width: 4096,
            min_height: 64,
            max_height: 2304,
            width_align: 16,
            height_align: 16,
            bit_depths: BitDepths::DEPTH_8,
            profiles: 0x7,
            levels: 0xffff,
            max_tier: 0,
            max_ref_frames: 4,
            max_roi_regions: 8,
            max_ipcm_regions: 4,
            features: CodecFeatures::LOOP_FILTER,
            max_bitrate: 100_000_000,
            min_qp: 0,
            max_qp: 51,
            max_gop_size: 1024,
            max_b_frames: 2,
        }
    }
}

impl HardwareCapability {
    /// Frame size range of the record. A maximum below the minimum is raised
    /// to the minimum.
    pub fn frame_size_range(&self) -> FrameSizeRange {
        FrameSizeRange {
            min_width: self.min_width,
            max_width: self.max_width.max(self.min_width),
            step_width: self.width_align.max(1),
            min_height: self.min_height,
            max_height: self.max_height.max(self.min_height),
            step_height: self.height_align.max(1),
        }
    }

    fn has_inverted_bounds(&self) -> bool {
        self.min_width > self.max_width || self.min_height > self.max_height
    }

    pub fn max_regions(&self, kind: crate::region::RegionKind) -> u32 {
        match kind {
            crate::region::RegionKind::Roi => self.max_roi_regions,
            crate::region::RegionKind::Ipcm => self.max_ipcm_regions,
        }
    }
}

/// Capability information reported by the firmware.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HardwareInfo {
    pub encoders: BTreeMap<CodecFamily, HardwareCapability>,
    pub decoders: BTreeMap<CodecFamily, HardwareCapability>,
    /// Whether the post-processing scaler producing the auxiliary output is
    /// present.
    pub scaler: bool,
}

impl HardwareInfo {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_encoder(mut self, codec: CodecFamily, caps: HardwareCapability) -> Self {
        self.encoders.insert(codec, caps);
        self
    }

    pub fn with_decoder(mut self, codec: CodecFamily, caps: HardwareCapability) -> Self {
        self.decoders.insert(codec, caps);
        self
    }

    pub fn with_scaler(self) -> Self {
        HardwareInfo {
            scaler: true,
            ..self
        }
    }

    pub fn codecs(&self, role: SessionRole) -> &BTreeMap<CodecFamily, HardwareCapability> {
        match role {
            SessionRole::Encoder => &self.encoders,
            SessionRole::Decoder => &self.decoders,
        }
    }
}

/// How to round a dimension that is not on the stepwise grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ClampPolicy {
    /// Round toward smaller values: the result must not exceed the request.
    Le,
    /// Round toward larger values.
    #[default]
    Ge,
}

/// Stepwise frame size range, as reported by `VIDIOC_ENUM_FRAMESIZES`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSizeRange {
    pub min_width: u32,
    pub max_width: u32,
    pub step_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub step_height: u32,
}

/// Clamps `value` into `[min, max]` and moves it on the `min + n * step`
/// grid.
fn clamp_stepwise(value: u32, min: u32, max: u32, step: u32, policy: ClampPolicy) -> u32 {
    let max = max.max(min);
    let value = value.clamp(min, max) as u64;
    let (min, max, step) = (min as u64, max as u64, step.max(1) as u64);
    let offset = value - min;
    let on_grid = match policy {
        ClampPolicy::Ge => {
            let up = min + align_up(offset, step);
            if up > max {
                min + align_down(max - min, step)
            } else {
                up
            }
        }
        ClampPolicy::Le => min + align_down(offset, step),
    };
    on_grid as u32
}

impl FrameSizeRange {
    /// Clamps `(width, height)` into the range according to `policy`.
    pub fn clamp(&self, width: u32, height: u32, policy: ClampPolicy) -> (u32, u32) {
        (
            clamp_stepwise(
                width,
                self.min_width,
                self.max_width,
                self.step_width,
                policy,
            ),
            clamp_stepwise(
                height,
                self.min_height,
                self.max_height,
                self.step_height,
                policy,
            ),
        )
    }

    /// Whether `(width, height)` lies in the range and on its grid.
    pub fn contains(&self, width: u32, height: u32) -> bool {
        let on_grid = |v: u32, min: u32, max: u32, step: u32| {
            v >= min && v <= max && (v - min) % step.max(1) == 0
        };
        on_grid(width, self.min_width, self.max_width, self.step_width)
            && on_grid(height, self.min_height, self.max_height, self.step_height)
    }

    /// Smallest range covering both `self` and `other`.
    fn envelope(self, other: FrameSizeRange) -> FrameSizeRange {
        FrameSizeRange {
            min_width: self.min_width.min(other.min_width),
            max_width: self.max_width.max(other.max_width),
            step_width: self.step_width.max(other.step_width),
            min_height: self.min_height.min(other.min_height),
            max_height: self.max_height.max(other.max_height),
            step_height: self.step_height.max(other.step_height),
        }
    }
}

/// Immutable view of the capabilities of a hardware instance.
#[derive(Debug, Default)]
pub struct CapabilitySnapshot {
    info: HardwareInfo,
    enabled: EnabledFormats,
    controls: ControlTable,
}

impl CapabilitySnapshot {
    /// Builds a snapshot from `info`, carrying over the tunable defaults
    /// published by `previous`.
    pub fn new(info: HardwareInfo, previous: &CapabilitySnapshot) -> Self {
        let mut enabled = EnabledFormats::none();

        for (index, desc) in catalog::all().iter().enumerate() {
            for role in [SessionRole::Encoder, SessionRole::Decoder] {
                let codecs = info.codecs(role);
                let supported = desc.roles.contains(Roles::from(role))
                    && match desc.internal {
                        InternalFormat::Coded(codec) => codecs.contains_key(&codec),
                        InternalFormat::Raw(_) => codecs.values().any(|caps| {
                            caps.bit_depths.supports(desc.bit_depth)
                                && (!desc.is_tiled()
                                    || caps.features.contains(CodecFeatures::TILING))
                        }),
                    };
                enabled.set(role, index, supported);
            }
        }

        for role in [SessionRole::Encoder, SessionRole::Decoder] {
            for (codec, caps) in info.codecs(role) {
                // Records for codecs a role cannot use are of no interest.
                if !catalog::all()
                    .iter()
                    .any(|d| d.codec() == Some(*codec) && d.roles.contains(Roles::from(role)))
                {
                    debug!("Ignoring {} capabilities for {}", role, codec);
                }
                if caps.has_inverted_bounds() {
                    warn!(
                        "{} {}: minimum frame size {}x{} above maximum {}x{}, using the minimum",
                        role, codec, caps.min_width, caps.min_height, caps.max_width, caps.max_height
                    );
                }
            }
        }

        let controls = ControlTable::derive(&info.encoders, &previous.controls);

        debug!(
            "Installed capabilities: {} encoder formats, {} decoder formats enabled",
            enabled.count(SessionRole::Encoder),
            enabled.count(SessionRole::Decoder)
        );

        CapabilitySnapshot {
            info,
            enabled,
            controls,
        }
    }

    pub fn info(&self) -> &HardwareInfo {
        &self.info
    }

    pub fn enabled(&self) -> &EnabledFormats {
        &self.enabled
    }

    /// Capabilities of `codec` in `role`, if present.
    pub fn codec_caps(&self, role: SessionRole, codec: CodecFamily) -> Option<&HardwareCapability> {
        self.info.codecs(role).get(&codec)
    }

    /// Whether the raw format `raw` can be used by a `role` session.
    pub fn is_raw_format_supported(&self, role: SessionRole, raw: RawFormat) -> bool {
        catalog::all()
            .iter()
            .enumerate()
            .any(|(i, d)| d.raw_format() == Some(raw) && self.enabled.is_enabled(role, i))
    }

    /// Whether the codec `codec` can be used by a `role` session.
    pub fn is_coded_format_supported(&self, role: SessionRole, codec: CodecFamily) -> bool {
        catalog::all()
            .iter()
            .enumerate()
            .any(|(i, d)| d.codec() == Some(codec) && self.enabled.is_enabled(role, i))
    }

    pub fn control_range(&self, id: ControlId) -> &ControlRange {
        self.controls.get(id)
    }

    pub fn controls(&self) -> &ControlTable {
        &self.controls
    }

    /// Envelope of the frame size ranges of every codec of `role`.
    fn envelope(&self, role: SessionRole) -> Option<FrameSizeRange> {
        self.info
            .codecs(role)
            .values()
            .map(HardwareCapability::frame_size_range)
            .reduce(FrameSizeRange::envelope)
    }

    /// Frame size range applying to `pixelformat` in a `role` session.
    ///
    /// For a codec, this is the range of its capability record. For a raw
    /// format, this is the range of `paired` (the codec on the other queue) if
    /// known, or the envelope of every codec of the role otherwise.
    pub fn frame_size_range(
        &self,
        role: SessionRole,
        pixelformat: PixelFormat,
        paired: Option<CodecFamily>,
    ) -> Option<FrameSizeRange> {
        let desc = catalog::all()
            .iter()
            .find(|d| d.pixelformat == pixelformat && d.roles.contains(Roles::from(role)))?;

        match desc.internal {
            InternalFormat::Coded(codec) => {
                self.codec_caps(role, codec).map(|c| c.frame_size_range())
            }
            InternalFormat::Raw(_) => match paired.and_then(|c| self.codec_caps(role, c)) {
                Some(caps) => Some(caps.frame_size_range()),
                None => self.envelope(role),
            },
        }
    }
}

/// Process-wide holder of the current capability snapshot.
#[derive(Debug, Default)]
pub struct Registry {
    current: RwLock<Arc<CapabilitySnapshot>>,
}

impl Registry {
    /// Creates a registry with no capabilities: every catalog entry is
    /// disabled until [`Registry::install`] is called.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_info(info: HardwareInfo) -> Self {
        let registry = Registry::new();
        registry.install(info);
        registry
    }

    /// Replaces the current snapshot with one built from `info`.
    ///
    /// Sessions that already hold the previous snapshot keep using it until
    /// their next operation.
    pub fn install(&self, info: HardwareInfo) {
        let previous = self.snapshot();
        let snapshot = Arc::new(CapabilitySnapshot::new(info, &previous));
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = snapshot;
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<CapabilitySnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::formats::*;

    fn h264_only() -> HardwareInfo {
        HardwareInfo::new()
            .with_encoder(CodecFamily::H264, Default::default())
            .with_decoder(CodecFamily::H264, Default::default())
    }

    #[test]
    fn test_empty_registry_disables_everything() {
        let registry = Registry::new();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.enabled().count(SessionRole::Encoder), 0);
        assert_eq!(snapshot.enabled().count(SessionRole::Decoder), 0);
        assert!(!snapshot.is_raw_format_supported(SessionRole::Encoder, RawFormat::Nv12));
    }

    #[test]
    fn test_install_enables_supported_entries() {
        let registry = Registry::with_info(h264_only());
        let snapshot = registry.snapshot();

        assert!(snapshot.is_coded_format_supported(SessionRole::Encoder, CodecFamily::H264));
        assert!(!snapshot.is_coded_format_supported(SessionRole::Encoder, CodecFamily::Hevc));
        assert!(snapshot.is_raw_format_supported(SessionRole::Encoder, RawFormat::Nv12));
        // 8-bit only hardware without tiling.
        assert!(!snapshot.is_raw_format_supported(SessionRole::Encoder, RawFormat::P010));
        assert!(!snapshot.is_raw_format_supported(SessionRole::Encoder, RawFormat::Afbc8));
        // Decoders never output RGB, whatever the hardware supports.
        assert!(!snapshot.is_raw_format_supported(SessionRole::Decoder, RawFormat::Argb32));
    }

    #[test]
    fn test_install_replaces_snapshot() {
        let registry = Registry::with_info(h264_only());
        let old = registry.snapshot();

        let hevc = HardwareCapability {
            bit_depths: BitDepths::DEPTH_8 | BitDepths::DEPTH_10,
            features: CodecFeatures::LOOP_FILTER | CodecFeatures::TILING,
            ..Default::default()
        };
        registry.install(HardwareInfo::new().with_decoder(CodecFamily::Hevc, hevc));
        let new = registry.snapshot();

        // The old snapshot is unaffected.
        assert!(old.is_coded_format_supported(SessionRole::Decoder, CodecFamily::H264));
        assert!(!new.is_coded_format_supported(SessionRole::Decoder, CodecFamily::H264));
        assert!(new.is_coded_format_supported(SessionRole::Decoder, CodecFamily::Hevc));
        assert!(new.is_raw_format_supported(SessionRole::Decoder, RawFormat::P010));
        assert!(new.is_raw_format_supported(SessionRole::Decoder, RawFormat::Afbc10));
        assert_eq!(new.enabled().count(SessionRole::Encoder), 0);
        // No encoder left: tunables collapse.
        assert!(!new.control_range(ControlId::Bitrate).active);
    }

    #[test]
    fn test_clamp_stepwise() {
        let range = HardwareCapability::default().frame_size_range();
        assert_eq!(range.clamp(1920, 1080, ClampPolicy::Ge), (1920, 1088));
        assert_eq!(range.clamp(1920, 1080, ClampPolicy::Le), (1920, 1072));
        assert_eq!(range.clamp(1, 1, ClampPolicy::Ge), (64, 64));
        assert_eq!(range.clamp(10000, 10000, ClampPolicy::Ge), (4096, 2304));
        assert!(range.contains(1920, 1088));
        assert!(!range.contains(1920, 1080));

        // Enlarging past the maximum falls back on the last grid point.
        let odd = FrameSizeRange {
            min_width: 2,
            max_width: 100,
            step_width: 16,
            min_height: 2,
            max_height: 100,
            step_height: 16,
        };
        assert_eq!(odd.clamp(99, 99, ClampPolicy::Ge), (98, 98));
        assert!(odd.contains(98, 98));
    }

    #[test]
    fn test_inverted_bounds() {
        let inverted = HardwareCapability {
            min_width: 128,
            max_width: 64,
            max_height: 0,
            ..Default::default()
        };
        let range = inverted.frame_size_range();
        assert_eq!((range.min_width, range.max_width), (128, 128));
        assert_eq!((range.min_height, range.max_height), (64, 64));
        assert_eq!(range.clamp(1920, 1080, ClampPolicy::Ge), (128, 64));
        assert_eq!(range.clamp(1, 1, ClampPolicy::Le), (128, 64));

        // Raw fields are not trusted either.
        let raw = FrameSizeRange {
            min_width: 128,
            max_width: 64,
            step_width: 16,
            min_height: 64,
            max_height: 64,
            step_height: 16,
        };
        assert_eq!(raw.clamp(1920, 1080, ClampPolicy::Ge), (128, 64));

        let snapshot =
            Registry::with_info(HardwareInfo::new().with_encoder(CodecFamily::H264, inverted))
                .snapshot();
        assert!(snapshot.is_coded_format_supported(SessionRole::Encoder, CodecFamily::H264));
    }

    #[test]
    fn test_frame_size_range() {
        let jpeg = HardwareCapability {
            min_width: 8,
            max_width: 16384,
            min_height: 8,
            max_height: 16384,
            width_align: 8,
            height_align: 8,
            ..Default::default()
        };
        let info = h264_only().with_encoder(CodecFamily::Jpeg, jpeg.clone());
        let snapshot = Registry::with_info(info).snapshot();

        assert_eq!(
            snapshot.frame_size_range(SessionRole::Encoder, JPEG, None),
            Some(jpeg.frame_size_range())
        );
        assert_eq!(
            snapshot.frame_size_range(SessionRole::Encoder, NV12, Some(CodecFamily::H264)),
            Some(HardwareCapability::default().frame_size_range())
        );
        let envelope = snapshot
            .frame_size_range(SessionRole::Encoder, NV12, None)
            .unwrap();
        assert_eq!(
            (envelope.min_width, envelope.max_width, envelope.step_width),
            (8, 16384, 16)
        );
        assert_eq!(snapshot.frame_size_range(SessionRole::Encoder, HEVC, None), None);
    }
}
