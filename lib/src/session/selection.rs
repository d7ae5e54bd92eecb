//! Crop rectangle adjustment.
use bitflags::bitflags;
use nix::errno::Errno;
use thiserror::Error;

use crate::{align_down, align_up, Rect};

bitflags! {
    /// Same values as `V4L2_SEL_FLAG_*`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SelectionFlags: u32 {
        /// The result may be larger than the request.
        const GE = 0x1;
        /// The result may not be larger than the request.
        const LE = 0x2;
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("crop rectangle {0} leaves no visible area")]
    Empty(Rect),
    #[error("crop rectangle {0} cannot be used as is")]
    OutOfRange(Rect),
}

impl From<SelectionError> for Errno {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::Empty(_) => Errno::EINVAL,
            SelectionError::OutOfRange(_) => Errno::ERANGE,
        }
    }
}

fn to_rect(left: i64, top: i64, right: i64, bottom: i64) -> Rect {
    Rect::new(
        left as i32,
        top as i32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
}

/// Fits `rect` inside a `width`x`height` frame with its edges on even pixels.
///
/// With `LE` the rectangle shrinks to the closest even edges, otherwise it
/// grows. Both flags together require the rectangle to already fit.
/// `legacy_top_check` tests bit 1 of the top edge instead of bit 0 when
/// growing, which is what older firmware interfaces expect.
pub fn adjust_crop(
    rect: &Rect,
    width: u32,
    height: u32,
    flags: SelectionFlags,
    legacy_top_check: bool,
) -> Result<Rect, SelectionError> {
    let (frame_w, frame_h) = (width as i64, height as i64);
    let left = (rect.left as i64).clamp(0, frame_w);
    let top = (rect.top as i64).clamp(0, frame_h);
    let right = rect.right().clamp(left, frame_w);
    let bottom = rect.bottom().clamp(top, frame_h);

    let adjusted = if flags.contains(SelectionFlags::LE | SelectionFlags::GE) {
        let fitted = to_rect(left, top, right, bottom);
        if fitted != *rect || [left, top, right, bottom].iter().any(|v| v & 1 != 0) {
            return Err(SelectionError::OutOfRange(*rect));
        }
        fitted
    } else if flags.contains(SelectionFlags::LE) {
        let left = align_up(left as u64, 2) as i64;
        let top = align_up(top as u64, 2) as i64;
        let right = align_down(right as u64, 2) as i64;
        let bottom = align_down(bottom as u64, 2) as i64;
        if right <= left || bottom <= top {
            return Err(SelectionError::Empty(*rect));
        }
        to_rect(left, top, right, bottom)
    } else {
        let top_mask = if legacy_top_check { 2 } else { 1 };
        let left = left & !1;
        let top = if top & top_mask != 0 { top - 1 } else { top };
        let right = (align_up(right as u64, 2) as i64).min(frame_w);
        let bottom = (align_up(bottom as u64, 2) as i64).min(frame_h);
        to_rect(left, top, right, bottom)
    };

    if adjusted.width == 0 || adjusted.height == 0 {
        return Err(SelectionError::Empty(*rect));
    }

    Ok(adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enlarge() {
        let crop = adjust_crop(&Rect::new(3, 5, 101, 51), 1920, 1088, SelectionFlags::GE, false);
        assert_eq!(crop, Ok(Rect::new(2, 4, 102, 52)));
        // No flag enlarges too.
        let crop = adjust_crop(&Rect::new(3, 5, 101, 51), 1920, 1088, SelectionFlags::empty(), false);
        assert_eq!(crop, Ok(Rect::new(2, 4, 102, 52)));
    }

    #[test]
    fn test_shrink() {
        let crop = adjust_crop(&Rect::new(3, 5, 101, 51), 1920, 1088, SelectionFlags::LE, false);
        assert_eq!(crop, Ok(Rect::new(4, 6, 100, 50)));
        assert_eq!(
            adjust_crop(&Rect::new(3, 3, 1, 1), 1920, 1088, SelectionFlags::LE, false),
            Err(SelectionError::Empty(Rect::new(3, 3, 1, 1)))
        );
    }

    #[test]
    fn test_clamped_to_frame() {
        let crop = adjust_crop(&Rect::new(-10, -10, 4000, 4000), 1920, 1088, SelectionFlags::GE, false);
        assert_eq!(crop, Ok(Rect::new(0, 0, 1920, 1088)));
        assert!(adjust_crop(&Rect::new(2000, 0, 16, 16), 1920, 1088, SelectionFlags::GE, false).is_err());
    }

    #[test]
    fn test_exact_match() {
        let flags = SelectionFlags::LE | SelectionFlags::GE;
        let rect = Rect::new(0, 0, 1280, 720);
        assert_eq!(adjust_crop(&rect, 1920, 1088, flags, false), Ok(rect));
        let rect = Rect::new(1, 0, 1280, 720);
        assert_eq!(
            adjust_crop(&rect, 1920, 1088, flags, false),
            Err(SelectionError::OutOfRange(rect))
        );
        assert_eq!(Errno::from(SelectionError::OutOfRange(rect)), Errno::ERANGE);
    }

    #[test]
    fn test_legacy_top_check() {
        // Bit 1 set, bit 0 clear: only the legacy test moves the top edge.
        let rect = Rect::new(0, 2, 64, 64);
        assert_eq!(
            adjust_crop(&rect, 1920, 1088, SelectionFlags::GE, false),
            Ok(Rect::new(0, 2, 64, 64))
        );
        assert_eq!(
            adjust_crop(&rect, 1920, 1088, SelectionFlags::GE, true),
            Ok(Rect::new(0, 1, 64, 65))
        );
        // Odd top edge: only the default test moves it.
        let rect = Rect::new(0, 1, 64, 63);
        assert_eq!(
            adjust_crop(&rect, 1920, 1088, SelectionFlags::GE, false),
            Ok(Rect::new(0, 0, 64, 64))
        );
        assert_eq!(
            adjust_crop(&rect, 1920, 1088, SelectionFlags::GE, true),
            Ok(Rect::new(0, 1, 64, 63))
        );
    }
}
