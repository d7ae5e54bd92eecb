//! Engine-wide tunables, given to sessions when they are opened.

/// Size of a memory page, used to align coded buffers.
pub const PAGE_SIZE: u64 = 4096;

/// Configuration of the negotiation engine.
///
/// ```
/// # use vcfmt::config::EngineConfig;
/// let config = EngineConfig::new()
///     .max_plane_size(64 << 20)
///     .default_resolution(1280, 720);
/// assert_eq!(config.get_max_plane_size(), 64 << 20);
/// assert_eq!(config.get_capped_buffer_count(), 4);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    max_plane_size: u32,
    capped_buffer_count: u32,
    min_buffers: u32,
    max_buffers: u32,
    default_width: u32,
    default_height: u32,
    coded_header_reserve: u32,
    min_coded_size: u32,
    legacy_crop_top_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_plane_size: 128 << 20,
            capped_buffer_count: 4,
            min_buffers: 1,
            max_buffers: 32,
            default_width: 1920,
            default_height: 1080,
            coded_header_reserve: 64 << 10,
            min_coded_size: 1 << 20,
            legacy_crop_top_check: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// Hard limit on the size of a single plane. Larger planes are saturated.
    pub fn max_plane_size(self, size: u32) -> Self {
        EngineConfig {
            max_plane_size: size,
            ..self
        }
    }

    /// Number of buffers allowed once a plane has hit the size limit.
    pub fn capped_buffer_count(self, count: u32) -> Self {
        EngineConfig {
            capped_buffer_count: count,
            ..self
        }
    }

    pub fn buffer_count_range(self, min: u32, max: u32) -> Self {
        EngineConfig {
            min_buffers: min.max(1),
            max_buffers: max.max(min.max(1)),
            ..self
        }
    }

    /// Resolution both queues start with when a session is opened.
    pub fn default_resolution(self, width: u32, height: u32) -> Self {
        EngineConfig {
            default_width: width,
            default_height: height,
            ..self
        }
    }

    pub fn coded_header_reserve(self, size: u32) -> Self {
        EngineConfig {
            coded_header_reserve: size,
            ..self
        }
    }

    /// Smallest bitstream buffer handed out, before the header reserve.
    pub fn min_coded_size(self, size: u32) -> Self {
        EngineConfig {
            min_coded_size: size,
            ..self
        }
    }

    /// Test bit 1 instead of bit 0 of the crop top edge when enlarging a crop
    /// rectangle, as older firmware interfaces did.
    pub fn legacy_crop_top_check(self, enable: bool) -> Self {
        EngineConfig {
            legacy_crop_top_check: enable,
            ..self
        }
    }

    pub fn get_max_plane_size(&self) -> u32 {
        self.max_plane_size
    }

    pub fn get_capped_buffer_count(&self) -> u32 {
        self.capped_buffer_count
    }

    pub fn get_buffer_count_range(&self) -> (u32, u32) {
        (self.min_buffers, self.max_buffers)
    }

    pub fn get_default_resolution(&self) -> (u32, u32) {
        (self.default_width, self.default_height)
    }

    pub fn get_coded_header_reserve(&self) -> u32 {
        self.coded_header_reserve
    }

    pub fn get_min_coded_size(&self) -> u32 {
        self.min_coded_size
    }

    pub fn get_legacy_crop_top_check(&self) -> bool {
        self.legacy_crop_top_check
    }
}
