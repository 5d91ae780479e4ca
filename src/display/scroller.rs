/*
 *  display/scroller.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Marquee offset arithmetic
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::BTreeMap;

use crate::constants::SUBPIXELS;
use crate::display::plan::ZoneId;

/// Current offset of every scrolling zone of the active template
pub type ScrollOffsets = BTreeMap<ZoneId, ScrollOffset>;

/// Horizontal displacement of a marquee, in 1/256 pixel steps.
///
/// Text is drawn at `canvas_width - offset`, so offset 0 has the text just
/// off the right edge and `text_width + canvas_width` has it just gone past
/// the left edge, at which point it wraps back to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScrollOffset(u32);

impl ScrollOffset {
    pub const ZERO: ScrollOffset = ScrollOffset(0);

    pub fn from_pixels(px: u32) -> Self {
        Self(px.saturating_mul(SUBPIXELS))
    }

    /// Whole pixels, remainder discarded
    #[inline]
    pub fn pixels(self) -> u32 {
        self.0 / SUBPIXELS
    }

    #[inline]
    pub fn subpixels(self) -> u32 {
        self.0
    }
}

/// Sub-pixels advanced per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSpeed(u32);

impl ScrollSpeed {
    pub fn from_subpixels_per_frame(sub: u32) -> Self {
        Self(sub.max(1))
    }

    /// Whole pixels per frame
    pub fn from_pixels_per_frame(px: u32) -> Self {
        Self::from_subpixels_per_frame(px.saturating_mul(SUBPIXELS))
    }

    /// Convert a wall-clock speed to a per-frame step at `fps`.
    /// Rounds to the nearest sub-pixel; never zero.
    pub fn from_pixels_per_second(pps: u32, fps: u32) -> Self {
        let fps = u64::from(fps.max(1));
        let sub = (u64::from(pps) * u64::from(SUBPIXELS) + fps / 2) / fps;
        Self::from_subpixels_per_frame(sub.min(u64::from(u32::MAX)) as u32)
    }

    pub fn subpixels_per_frame(self) -> u32 {
        self.0
    }
}

/// Move `prev` on by `delta_frames` ticks at `speed`, wrapping once the text
/// has fully left the canvas.
///
/// Pure: the remainder stays in the sub-pixel part of the offset, so a long
/// run lands exactly where `delta_frames` single steps would.
pub fn advance(
    prev: ScrollOffset,
    delta_frames: u32,
    text_width: u32,
    canvas_width: u32,
    speed: ScrollSpeed,
) -> ScrollOffset {
    let cycle = (u64::from(text_width) + u64::from(canvas_width)) * u64::from(SUBPIXELS);
    if cycle == 0 {
        return ScrollOffset::ZERO;
    }
    let step = u64::from(delta_frames) * u64::from(speed.0);
    let next = (u64::from(prev.0) + step) % cycle;
    // cycle fits in u32 for any realistic canvas; saturate rather than wrap if not
    ScrollOffset(next.min(u64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_conversion() {
        assert_eq!(ScrollSpeed::from_pixels_per_second(40, 20).subpixels_per_frame(), 512);
        // 40 px/s at 30 fps is 1.333.. px/frame
        assert_eq!(ScrollSpeed::from_pixels_per_second(40, 30).subpixels_per_frame(), 341);
        assert_eq!(ScrollSpeed::from_pixels_per_second(0, 30).subpixels_per_frame(), 1);
        assert_eq!(ScrollSpeed::from_pixels_per_frame(2).subpixels_per_frame(), 512);
    }

    #[test]
    fn test_advance_moves_forward() {
        let speed = ScrollSpeed::from_pixels_per_frame(2);
        let mut off = ScrollOffset::ZERO;
        for tick in 1..=10 {
            let next = advance(off, 1, 100, 128, speed);
            assert!(next > off, "tick {tick}");
            off = next;
        }
        assert_eq!(off.pixels(), 20);
    }

    #[test]
    fn test_advance_wraps_at_text_plus_canvas() {
        let speed = ScrollSpeed::from_pixels_per_frame(1);
        let off = advance(ScrollOffset::from_pixels(227), 1, 100, 128, speed);
        assert_eq!(off, ScrollOffset::ZERO);
        let off = advance(ScrollOffset::from_pixels(227), 3, 100, 128, speed);
        assert_eq!(off.pixels(), 2);
    }

    #[test]
    fn test_offset_stays_in_range() {
        let speed = ScrollSpeed::from_pixels_per_second(37, 30);
        let mut off = ScrollOffset::ZERO;
        for _ in 0..10_000 {
            off = advance(off, 1, 50, 128, speed);
            assert!(off.pixels() < 178);
        }
    }

    #[test]
    fn test_batched_delta_matches_single_steps() {
        let speed = ScrollSpeed::from_pixels_per_second(40, 30);
        let mut stepped = ScrollOffset::ZERO;
        for _ in 0..997 {
            stepped = advance(stepped, 1, 311, 128, speed);
        }
        let batched = advance(ScrollOffset::ZERO, 997, 311, 128, speed);
        assert_eq!(stepped, batched);
    }

    #[test]
    fn test_zero_cycle_is_zero() {
        let speed = ScrollSpeed::from_pixels_per_frame(1);
        assert_eq!(advance(ScrollOffset::from_pixels(3), 5, 0, 0, speed), ScrollOffset::ZERO);
    }
}
