//! Block-compressed layouts.
//!
//! A block-compressed frame is stored as a header region, with a fixed-size
//! entry per block describing its compression state, followed by a payload
//! region sized for the worst case of every block being uncompressed.
use enumn::N;

use crate::align_up;

/// Bytes of header per block.
const HEADER_BYTES_PER_BLOCK: u64 = 16;
const HEADER_ALIGN: u64 = 4096;
const PAYLOAD_ALIGN: u64 = 128;
/// Worst-case payload of a 256-pixel 4:2:0 block, 8 bits per sample.
const PAYLOAD_BYTES_PER_BLOCK: u64 = 384;
/// Same for samples packed on 10 bits.
const PAYLOAD_BYTES_PER_BLOCK_10BIT: u64 = 512;

/// Shape of the blocks of a block-compressed layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, N)]
#[repr(u32)]
pub enum TileMode {
    #[default]
    Blocks16x16 = 0,
    Blocks32x8 = 1,
}

impl TileMode {
    /// Width and height of a block, in pixels.
    pub fn block_size(self) -> (u32, u32) {
        match self {
            TileMode::Blocks16x16 => (16, 16),
            TileMode::Blocks32x8 => (32, 8),
        }
    }
}

/// Layout of a block-compressed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiledLayout {
    pub blocks_wide: u64,
    pub blocks_high: u64,
    pub header_size: u64,
    pub payload_size: u64,
}

impl TiledLayout {
    pub fn new(width: u32, height: u32, ten_bit: bool, mode: TileMode) -> Self {
        let (block_w, block_h) = mode.block_size();
        let blocks_wide = align_up(width as u64, block_w as u64) / block_w as u64;
        let blocks_high = align_up(height as u64, block_h as u64) / block_h as u64;
        let blocks = blocks_wide * blocks_high;

        let per_block = if ten_bit {
            PAYLOAD_BYTES_PER_BLOCK_10BIT
        } else {
            PAYLOAD_BYTES_PER_BLOCK
        };

        TiledLayout {
            blocks_wide,
            blocks_high,
            header_size: align_up(blocks * HEADER_BYTES_PER_BLOCK, HEADER_ALIGN),
            payload_size: align_up(blocks * per_block, PAYLOAD_ALIGN),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.header_size + self.payload_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uhd_10bit() {
        let layout = TiledLayout::new(3840, 2160, true, TileMode::Blocks16x16);
        assert_eq!((layout.blocks_wide, layout.blocks_high), (240, 135));
        assert_eq!(layout.header_size, 520192);
        assert_eq!(layout.payload_size, 16588800);
        assert_eq!(layout.total_size(), 17108992);
    }

    #[test]
    fn test_block_shapes() {
        let layout = TiledLayout::new(1920, 1080, false, TileMode::Blocks16x16);
        assert_eq!((layout.blocks_wide, layout.blocks_high), (120, 68));
        assert_eq!(layout.header_size, 131072);
        assert_eq!(layout.payload_size, 3133440);

        let layout = TiledLayout::new(1920, 1080, false, TileMode::Blocks32x8);
        assert_eq!((layout.blocks_wide, layout.blocks_high), (60, 135));
        assert_eq!(layout.header_size, 131072);
        assert_eq!(layout.payload_size, 3110400);
    }

    #[test]
    fn test_partial_blocks() {
        let layout = TiledLayout::new(17, 1, false, TileMode::Blocks16x16);
        assert_eq!((layout.blocks_wide, layout.blocks_high), (2, 1));
        assert_eq!(layout.total_size(), 4096 + 768);
    }
}
