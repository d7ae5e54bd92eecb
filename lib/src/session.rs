//! Per-session format negotiation.
//!
//! A [`Session`] holds the configuration of both queues of one encoder or
//! decoder instance. Every mutating operation first computes a complete
//! candidate configuration from the request and the current capability
//! snapshot, and only replaces the stored one once nothing can fail anymore.
//! The returned [`ChangedParams`] tell the firmware command layer which parts
//! of the configuration need to be sent again.
//!
//! Sessions are not synchronized: callers serialize the operations on a given
//! session, typically by holding the session behind a mutex.
pub mod selection;

use std::sync::Arc;

use bitflags::bitflags;
use log::{debug, error, warn};
use nix::errno::Errno;
use thiserror::Error;

use crate::caps::{CapabilitySnapshot, ClampPolicy, CodecFeatures, ControlId, ControlRange};
use crate::caps::{FrameSizeRange, Registry};
use crate::catalog::{self, CatalogError, CodecFamily, FormatIterator, PixelFormatDescriptor};
use crate::color::VuiColor;
use crate::config::EngineConfig;
use crate::geometry::{self, Geometry, GeometryError, GeometryRequest, ScaleConfig, TileMode};
use crate::region::{self, Region, RegionError, RegionKind, RegionSlots};
use crate::{Colorimetry, Format, FormatKind, PixelFormat, PlaneLayout, QueueDirection, Rect};
use crate::SessionRole;

pub use selection::*;

bitflags! {
    /// Groups of parameters modified by an operation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ChangedParams: u32 {
        const FORMAT = 0x001;
        const RESOLUTION = 0x002;
        const PLANES = 0x004;
        const CROP = 0x008;
        const COLORIMETRY = 0x010;
        const BIT_DEPTH = 0x020;
        const SCALER = 0x040;
        const TILE_MODE = 0x080;
        const ROI = 0x100;
        const IPCM = 0x200;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("format {0} is not supported")]
    InvalidFormat(PixelFormat),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("configuration blob has {actual} bytes, expected {expected}")]
    InvalidSize { expected: usize, actual: usize },
    #[error("no format at index {0}")]
    EndOfSequence(u32),
    #[error("no usable format for the {0} queue")]
    NoFormat(QueueDirection),
    #[error("invalid selection: {0}")]
    Selection(#[from] SelectionError),
}

impl From<CatalogError> for ResolveError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(pixelformat) | CatalogError::Disabled(pixelformat) => {
                ResolveError::InvalidFormat(pixelformat)
            }
            CatalogError::EndOfSequence(index) => ResolveError::EndOfSequence(index),
        }
    }
}

impl From<GeometryError> for ResolveError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::InvalidFormat(pixelformat) => ResolveError::InvalidFormat(pixelformat),
            GeometryError::InvalidDimensions(_, _) => {
                ResolveError::InvalidArgument("empty frame dimensions")
            }
        }
    }
}

impl From<RegionError> for ResolveError {
    fn from(err: RegionError) -> Self {
        match err {
            RegionError::InvalidSize { expected, actual } => {
                ResolveError::InvalidSize { expected, actual }
            }
            RegionError::InvalidMode(_) => {
                ResolveError::InvalidArgument("unknown region quantizer mode")
            }
        }
    }
}

impl From<ResolveError> for Errno {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidFormat(_) => Errno::EINVAL,
            ResolveError::InvalidArgument(_) => Errno::EINVAL,
            ResolveError::InvalidSize { .. } => Errno::EINVAL,
            ResolveError::EndOfSequence(_) => Errno::EINVAL,
            ResolveError::NoFormat(_) => Errno::ENODEV,
            ResolveError::Selection(e) => e.into(),
        }
    }
}

/// Configuration of one queue of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaConfig {
    pub direction: QueueDirection,
    pub desc: &'static PixelFormatDescriptor,
    pub width: u32,
    pub height: u32,
    /// Bits per sample of the frames; zero on bitstream queues.
    pub bit_depth: u8,
    /// One entry per memory plane of `desc`.
    pub planes: Vec<PlaneLayout>,
    /// Whether a plane has been saturated at the size limit.
    pub overflow: bool,
    pub crop: Rect,
    pub colorimetry: Colorimetry,
}

impl MediaConfig {
    pub fn to_format(&self) -> Format {
        Format {
            width: self.width,
            height: self.height,
            pixelformat: self.desc.pixelformat,
            plane_fmt: self.planes.clone(),
            colorimetry: self.colorimetry,
        }
    }

    fn changes(&self, new: &MediaConfig) -> ChangedParams {
        let mut changed = ChangedParams::empty();
        changed.set(
            ChangedParams::FORMAT,
            self.desc.pixelformat != new.desc.pixelformat,
        );
        changed.set(
            ChangedParams::RESOLUTION,
            (self.width, self.height) != (new.width, new.height),
        );
        changed.set(ChangedParams::PLANES, self.planes != new.planes);
        changed.set(ChangedParams::CROP, self.crop != new.crop);
        changed.set(
            ChangedParams::COLORIMETRY,
            self.colorimetry != new.colorimetry,
        );
        changed.set(ChangedParams::BIT_DEPTH, self.bit_depth != new.bit_depth);
        changed
    }
}

/// Format of a queue, as reported to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFormat {
    pub format: Format,
    pub crop: Rect,
    pub bit_depth: u8,
    pub overflow: bool,
    /// Layout of the scaled output, on the raw queue when the scaler is
    /// enabled.
    pub aux: Option<Geometry>,
}

/// Buffer allocation parameters of a queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferConfig {
    pub count: u32,
    pub plane_sizes: Vec<u32>,
    pub aux_plane_sizes: Vec<u32>,
}

/// Everything a resolution depends on besides the request itself.
struct Resolver<'a> {
    caps: &'a CapabilitySnapshot,
    role: SessionRole,
    config: &'a EngineConfig,
    tile_mode: TileMode,
    /// Codec selected on the bitstream queue.
    paired: Option<CodecFamily>,
}

impl<'a> Resolver<'a> {
    /// Checks that the destination codec of an encoder can consume `desc`.
    fn check_encoder_input(
        &self,
        desc: &PixelFormatDescriptor,
        codec: Option<CodecFamily>,
    ) -> Result<(), ResolveError> {
        let caps = codec
            .and_then(|codec| self.caps.codec_caps(SessionRole::Encoder, codec))
            .ok_or(ResolveError::InvalidArgument(
                "no capabilities for the destination codec",
            ))?;
        if !caps.bit_depths.supports(desc.bit_depth) {
            return Err(ResolveError::InvalidArgument(
                "bit depth not supported by the destination codec",
            ));
        }
        if desc.is_tiled() && !caps.features.contains(CodecFeatures::TILING) {
            return Err(ResolveError::InvalidArgument(
                "block-compressed input not supported by the destination codec",
            ));
        }
        Ok(())
    }

    /// Computes the configuration of the `direction` queue for `requested`.
    ///
    /// `current` is the configuration being replaced, if any.
    fn resolve(
        &self,
        direction: QueueDirection,
        requested: &Format,
        current: Option<&MediaConfig>,
        policy: ClampPolicy,
    ) -> Result<MediaConfig, ResolveError> {
        let desc =
            catalog::lookup_enabled(self.caps.enabled(), self.role, direction, requested.pixelformat)?;
        let codec = desc.codec().or(self.paired);
        let range = self
            .caps
            .frame_size_range(self.role, desc.pixelformat, codec)
            .ok_or(ResolveError::InvalidFormat(desc.pixelformat))?;
        let (width, height) = range.clamp(requested.width, requested.height, policy);

        if desc.is_raw() && self.role == SessionRole::Encoder {
            self.check_encoder_input(desc, codec)?;
        }
        let bit_depth = if desc.is_raw() { desc.bit_depth } else { 0 };

        // Bitstream buffers never shrink.
        let min_size = match desc.kind() {
            FormatKind::Raw => 0,
            FormatKind::Coded => {
                let previous = current
                    .filter(|c| c.desc.kind() == FormatKind::Coded)
                    .and_then(|c| c.planes.first())
                    .map(|p| p.sizeimage)
                    .unwrap_or(0);
                let wanted = requested.plane_fmt.first().map(|p| p.sizeimage).unwrap_or(0);
                previous.max(wanted)
            }
        };

        let geometry = geometry::compute(
            &GeometryRequest::new(desc.pixelformat, width, height)
                .stride(requested.plane_fmt.first().map(|p| p.bytesperline).unwrap_or(0))
                .height_align(range.step_height)
                .codec(codec)
                .tile_mode(self.tile_mode)
                .min_size(min_size),
            self.config,
        )?;

        let visible_width = requested
            .width
            .max(range.min_width)
            .min(range.max_width)
            .min(width);
        let visible_height = requested
            .height
            .max(range.min_height)
            .min(range.max_height)
            .min(height);

        debug!(
            "{} {}: {} {}x{} resolved to {}x{} in {} planes",
            self.role,
            direction,
            desc.pixelformat,
            requested.width,
            requested.height,
            width,
            height,
            geometry.planes.len()
        );

        Ok(MediaConfig {
            direction,
            desc,
            width,
            height,
            bit_depth,
            planes: geometry.planes,
            overflow: geometry.overflow,
            crop: Rect::new(0, 0, visible_width, visible_height),
            colorimetry: requested.colorimetry,
        })
    }
}

/// Fits `crop` inside a `width`x`height` frame.
fn clip_crop(crop: &Rect, width: u32, height: u32) -> Rect {
    let left = crop.left.clamp(0, width as i32);
    let top = crop.top.clamp(0, height as i32);
    let right = crop.right().clamp(left as i64, width as i64);
    let bottom = crop.bottom().clamp(top as i64, height as i64);
    Rect::new(
        left,
        top,
        (right - left as i64) as u32,
        (bottom - top as i64) as u32,
    )
}

/// Format negotiation state of one encoder or decoder instance.
pub struct Session {
    registry: Arc<Registry>,
    role: SessionRole,
    config: EngineConfig,
    output: MediaConfig,
    capture: MediaConfig,
    tile_mode: TileMode,
    scaler: Option<ScaleConfig>,
    roi: RegionSlots,
    ipcm: RegionSlots,
}

impl Session {
    /// Opens a session. Both queues start with their first usable format at
    /// the configured default resolution.
    pub fn open(
        registry: Arc<Registry>,
        role: SessionRole,
        config: EngineConfig,
    ) -> Result<Self, ResolveError> {
        let caps = registry.snapshot();
        let (width, height) = config.get_default_resolution();
        let default_format = |pixelformat: PixelFormat| {
            Format::from((pixelformat, (width as usize, height as usize)))
        };

        let coded_dir = role.direction_of(FormatKind::Coded);
        let raw_dir = role.direction_of(FormatKind::Raw);

        let mut resolver = Resolver {
            caps: &caps,
            role,
            config: &config,
            tile_mode: TileMode::default(),
            paired: None,
        };

        let coded = FormatIterator::new(caps.enabled(), role, coded_dir)
            .find_map(|desc| {
                resolver
                    .resolve(coded_dir, &default_format(desc.pixelformat), None, ClampPolicy::Ge)
                    .ok()
            })
            .ok_or(ResolveError::NoFormat(coded_dir))?;
        resolver.paired = coded.desc.codec();
        let raw = FormatIterator::new(caps.enabled(), role, raw_dir)
            .find_map(|desc| {
                resolver
                    .resolve(raw_dir, &default_format(desc.pixelformat), None, ClampPolicy::Ge)
                    .ok()
            })
            .ok_or(ResolveError::NoFormat(raw_dir))?;

        debug!(
            "Opened {} session: {} {}, {} {}",
            role, raw_dir, raw.desc.pixelformat, coded_dir, coded.desc.pixelformat
        );

        let (output, capture) = match raw_dir {
            QueueDirection::Output => (raw, coded),
            QueueDirection::Capture => (coded, raw),
        };

        Ok(Session {
            registry,
            role,
            config,
            output,
            capture,
            tile_mode: TileMode::default(),
            scaler: None,
            roi: Default::default(),
            ipcm: Default::default(),
        })
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stored configuration of the `direction` queue.
    pub fn media(&self, direction: QueueDirection) -> &MediaConfig {
        match direction {
            QueueDirection::Output => &self.output,
            QueueDirection::Capture => &self.capture,
        }
    }

    fn media_mut(&mut self, direction: QueueDirection) -> &mut MediaConfig {
        match direction {
            QueueDirection::Output => &mut self.output,
            QueueDirection::Capture => &mut self.capture,
        }
    }

    fn raw_direction(&self) -> QueueDirection {
        self.role.direction_of(FormatKind::Raw)
    }

    /// Codec currently selected on the bitstream queue.
    pub fn codec(&self) -> Option<CodecFamily> {
        self.media(self.role.direction_of(FormatKind::Coded))
            .desc
            .codec()
    }

    fn resolver<'a>(&'a self, caps: &'a CapabilitySnapshot) -> Resolver<'a> {
        Resolver {
            caps,
            role: self.role,
            config: &self.config,
            tile_mode: self.tile_mode,
            paired: self.codec(),
        }
    }

    fn aux_geometry(&self, caps: &CapabilitySnapshot, media: &MediaConfig) -> Option<Geometry> {
        if media.direction != self.raw_direction() {
            return None;
        }
        let scale = self.scaler.as_ref()?;
        let step = caps
            .frame_size_range(self.role, media.desc.pixelformat, self.codec())
            .map(|r| r.step_height)
            .unwrap_or(1);
        match geometry::scaled_geometry(scale, self.codec(), step, &self.config) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                warn!("Cannot compute the scaled output layout: {}", e);
                None
            }
        }
    }

    /// Fits `scale` inside the frames of `raw`, on the grid of the codec
    /// range.
    fn fit_scaler(
        &self,
        caps: &CapabilitySnapshot,
        raw: &MediaConfig,
        codec: Option<CodecFamily>,
        scale: ScaleConfig,
    ) -> Result<ScaleConfig, ResolveError> {
        let range = caps
            .frame_size_range(self.role, raw.desc.pixelformat, codec)
            .ok_or(ResolveError::InvalidFormat(raw.desc.pixelformat))?;
        let (width, height) = range.clamp(
            scale.width.min(raw.width),
            scale.height.min(raw.height),
            ClampPolicy::Le,
        );
        Ok(ScaleConfig {
            width,
            height,
            format: scale.format,
        })
    }

    fn project(&self, caps: &CapabilitySnapshot, media: &MediaConfig) -> ResolvedFormat {
        ResolvedFormat {
            format: media.to_format(),
            crop: media.crop,
            bit_depth: media.bit_depth,
            overflow: media.overflow,
            aux: self.aux_geometry(caps, media),
        }
    }

    /// `VIDIOC_S_FMT` with the default (enlarging) clamp policy.
    pub fn set_format(
        &mut self,
        direction: QueueDirection,
        requested: &Format,
    ) -> Result<(ResolvedFormat, ChangedParams), ResolveError> {
        self.set_format_with(direction, requested, ClampPolicy::Ge)
    }

    /// `VIDIOC_S_FMT`, clamping the dimensions according to `policy`.
    ///
    /// Selecting a codec also lays out the raw queue again for that codec,
    /// and fails if its current format cannot be used with it. A smaller raw
    /// frame shrinks the scaled output along with it.
    ///
    /// On error the session is left untouched.
    pub fn set_format_with(
        &mut self,
        direction: QueueDirection,
        requested: &Format,
        policy: ClampPolicy,
    ) -> Result<(ResolvedFormat, ChangedParams), ResolveError> {
        let caps = self.registry.snapshot();
        let candidate =
            self.resolver(&caps)
                .resolve(direction, requested, Some(self.media(direction)), policy)?;

        let raw_dir = self.raw_direction();
        let (raw, coded) = if direction == raw_dir {
            (candidate, None)
        } else {
            let stored = self.media(raw_dir);
            let resolver = Resolver {
                paired: candidate.desc.codec(),
                ..self.resolver(&caps)
            };
            let mut raw =
                resolver.resolve(raw_dir, &stored.to_format(), Some(stored), ClampPolicy::Ge)?;
            raw.crop = clip_crop(&stored.crop, raw.width, raw.height);
            (raw, Some(candidate))
        };

        let codec = match &coded {
            Some(coded) => coded.desc.codec(),
            None => self.codec(),
        };
        let scaler = match self.scaler {
            Some(scale) => Some(self.fit_scaler(&caps, &raw, codec, scale)?),
            None => None,
        };

        let mut changed = self.media(raw_dir).changes(&raw);
        if let Some(coded) = &coded {
            changed |= self.media(direction).changes(coded);
        }
        changed.set(ChangedParams::SCALER, scaler != self.scaler);

        *self.media_mut(raw_dir) = raw;
        if let Some(coded) = coded {
            *self.media_mut(direction) = coded;
        }
        self.scaler = scaler;

        Ok((self.project(&caps, self.media(direction)), changed))
    }

    /// `VIDIOC_TRY_FMT`: resolves `requested` without applying it.
    pub fn try_format(
        &self,
        direction: QueueDirection,
        requested: &Format,
    ) -> Result<ResolvedFormat, ResolveError> {
        let caps = self.registry.snapshot();
        let candidate =
            self.resolver(&caps)
                .resolve(direction, requested, Some(self.media(direction)), ClampPolicy::Ge)?;
        Ok(self.project(&caps, &candidate))
    }

    /// `VIDIOC_G_FMT`. The stored format is validated again against the
    /// current capabilities, which may have changed since it was set.
    pub fn get_format(&self, direction: QueueDirection) -> Result<ResolvedFormat, ResolveError> {
        let caps = self.registry.snapshot();
        let stored = self.media(direction);
        let mut current = self.resolver(&caps).resolve(
            direction,
            &stored.to_format(),
            Some(stored),
            ClampPolicy::Ge,
        )?;
        current.crop = clip_crop(&stored.crop, current.width, current.height);
        Ok(self.project(&caps, &current))
    }

    /// `VIDIOC_ENUM_FMT`.
    pub fn enum_fmt(
        &self,
        direction: QueueDirection,
        index: u32,
    ) -> Result<&'static PixelFormatDescriptor, ResolveError> {
        let caps = self.registry.snapshot();
        Ok(catalog::enum_fmt(caps.enabled(), self.role, direction, index)?)
    }

    /// All the formats currently usable on the `direction` queue.
    pub fn formats(&self, direction: QueueDirection) -> Vec<&'static PixelFormatDescriptor> {
        let caps = self.registry.snapshot();
        FormatIterator::new(caps.enabled(), self.role, direction).collect()
    }

    /// `VIDIOC_ENUM_FRAMESIZES`.
    pub fn query_frame_size_range(
        &self,
        pixelformat: PixelFormat,
    ) -> Result<FrameSizeRange, ResolveError> {
        let caps = self.registry.snapshot();
        let desc = [QueueDirection::Output, QueueDirection::Capture]
            .iter()
            .find_map(|&direction| {
                catalog::lookup_enabled(caps.enabled(), self.role, direction, pixelformat).ok()
            })
            .ok_or(ResolveError::InvalidFormat(pixelformat))?;
        caps.frame_size_range(self.role, desc.pixelformat, desc.codec().or(self.codec()))
            .ok_or(ResolveError::InvalidFormat(pixelformat))
    }

    /// Range of an encoder tunable on the current hardware.
    pub fn control_range(&self, id: ControlId) -> ControlRange {
        *self.registry.snapshot().control_range(id)
    }

    /// Number and sizes of the buffers to allocate for `direction`.
    ///
    /// `count` is clamped to the configured range, and to the capped buffer
    /// count if a plane has been saturated.
    pub fn buffer_config(
        &self,
        direction: QueueDirection,
        count: u32,
    ) -> Result<BufferConfig, ResolveError> {
        let resolved = self.get_format(direction)?;
        let (min, max) = self.config.get_buffer_count_range();
        let mut count = count.clamp(min, max);

        let aux_overflow = resolved.aux.as_ref().map(|a| a.overflow).unwrap_or(false);
        if resolved.overflow || aux_overflow {
            let capped = count.min(self.config.get_capped_buffer_count()).max(1);
            if capped != count {
                warn!(
                    "{} {}: plane size saturated, limiting to {} buffers",
                    self.role, direction, capped
                );
            }
            count = capped;
        }

        Ok(BufferConfig {
            count,
            plane_sizes: resolved
                .format
                .plane_fmt
                .iter()
                .map(|p| p.sizeimage)
                .collect(),
            aux_plane_sizes: resolved
                .aux
                .map(|a| a.planes.iter().map(|p| p.sizeimage).collect())
                .unwrap_or_default(),
        })
    }

    /// `VIDIOC_S_SELECTION` on the crop rectangle of the raw queue.
    pub fn set_selection(
        &mut self,
        direction: QueueDirection,
        rect: &Rect,
        flags: SelectionFlags,
    ) -> Result<(Rect, ChangedParams), ResolveError> {
        if self.role.kind_for(direction) != FormatKind::Raw {
            return Err(ResolveError::InvalidArgument(
                "crop is only supported on the raw queue",
            ));
        }

        let media = self.media(direction);
        let crop = adjust_crop(
            rect,
            media.width,
            media.height,
            flags,
            self.config.get_legacy_crop_top_check(),
        )?;
        let mut changed = ChangedParams::empty();
        changed.set(ChangedParams::CROP, crop != media.crop);

        self.media_mut(direction).crop = crop;
        Ok((crop, changed))
    }

    /// Enables, reconfigures or disables the scaled output.
    ///
    /// The target size is clamped to the codec range and never exceeds the
    /// size of the main frames.
    pub fn set_scaler(
        &mut self,
        scale: Option<ScaleConfig>,
    ) -> Result<(Option<ScaleConfig>, ChangedParams), ResolveError> {
        let scaler = match scale {
            None => None,
            Some(scale) => {
                let caps = self.registry.snapshot();
                if !caps.info().scaler {
                    return Err(ResolveError::InvalidArgument("no scaler on this hardware"));
                }
                let raw = self.media(self.raw_direction());
                Some(self.fit_scaler(&caps, raw, self.codec(), scale)?)
            }
        };

        let mut changed = ChangedParams::empty();
        changed.set(ChangedParams::SCALER, scaler != self.scaler);
        self.scaler = scaler;
        Ok((scaler, changed))
    }

    pub fn scaler(&self) -> Option<ScaleConfig> {
        self.scaler
    }

    /// Selects the block shape of block-compressed raw formats, and lays out
    /// the raw queue again with it.
    ///
    /// On error the session is left untouched.
    pub fn set_tile_mode(&mut self, mode: TileMode) -> Result<ChangedParams, ResolveError> {
        if mode == self.tile_mode {
            return Ok(ChangedParams::empty());
        }

        let caps = self.registry.snapshot();
        let direction = self.raw_direction();
        let stored = self.media(direction);
        let resolver = Resolver {
            tile_mode: mode,
            ..self.resolver(&caps)
        };
        let mut updated =
            resolver.resolve(direction, &stored.to_format(), Some(stored), ClampPolicy::Ge)?;
        updated.crop = stored.crop;
        let changed = ChangedParams::TILE_MODE | stored.changes(&updated);

        *self.media_mut(direction) = updated;
        self.tile_mode = mode;

        Ok(changed)
    }

    pub fn tile_mode(&self) -> TileMode {
        self.tile_mode
    }

    /// Replaces the regions of `kind`. Regions beyond what the encoder
    /// supports are dropped.
    pub fn apply_region_list(
        &mut self,
        kind: RegionKind,
        regions: &[Region],
    ) -> Result<ChangedParams, ResolveError> {
        if self.role != SessionRole::Encoder {
            return Err(ResolveError::InvalidArgument(
                "regions are only supported by encoders",
            ));
        }
        let codec = self
            .codec()
            .ok_or(ResolveError::InvalidArgument("no codec selected"))?;
        let max_count = self
            .registry
            .snapshot()
            .codec_caps(SessionRole::Encoder, codec)
            .map(|c| c.max_regions(kind))
            .unwrap_or(0);

        let slots = region::apply_region_list(regions, max_count, codec);
        let (target, flag) = match kind {
            RegionKind::Roi => (&mut self.roi, ChangedParams::ROI),
            RegionKind::Ipcm => (&mut self.ipcm, ChangedParams::IPCM),
        };
        let changed = if *target != slots {
            flag
        } else {
            ChangedParams::empty()
        };
        *target = slots;

        Ok(changed)
    }

    /// Same as [`Session::apply_region_list`], from the fixed-size blob
    /// passed by the driver. A blob of the wrong size leaves the regions
    /// untouched.
    pub fn apply_region_blob(
        &mut self,
        kind: RegionKind,
        blob: &[u8],
    ) -> Result<ChangedParams, ResolveError> {
        let regions = region::parse_region_blob(blob).map_err(|e| {
            error!("Rejecting {} region blob: {}", kind, e);
            ResolveError::from(e)
        })?;
        self.apply_region_list(kind, &regions)
    }

    pub fn regions(&self, kind: RegionKind) -> &RegionSlots {
        match kind {
            RegionKind::Roi => &self.roi,
            RegionKind::Ipcm => &self.ipcm,
        }
    }

    /// Colorimetry of the `direction` queue in the form written to
    /// bitstreams.
    pub fn vui_color(&self, direction: QueueDirection) -> VuiColor {
        VuiColor::from(&self.media(direction).colorimetry)
    }
}
