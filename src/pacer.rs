/*
 *  pacer.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Frame pacing for the render loop
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
use std::time::{Duration, Instant};

/// Converts wall-clock time between ticks into whole frames.
///
/// The render interval skips missed ticks, so after a slow frame the next
/// tick reports 2+ frames and the marquee keeps its real speed.
#[derive(Debug, Clone)]
pub struct Pacer {
    last: Option<Instant>,
    frame: Duration,
    max_catch_up: u32,
}

impl Pacer {
    pub fn new(target_fps: u32) -> Self {
        let fps = target_fps.max(1);
        Self {
            last: None,
            frame: Duration::from_micros(1_000_000 / u64::from(fps)),
            // never jump more than a second of animation (suspend, debugger)
            max_catch_up: fps,
        }
    }

    #[inline]
    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Frames elapsed since the previous call, rounded, at least 1.
    pub fn frames_since_last(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last.replace(now) else { return 1 };
        let elapsed = now.saturating_duration_since(last).as_micros();
        let frame = self.frame.as_micros().max(1);
        let frames = (elapsed + frame / 2) / frame;
        (frames.min(u128::from(self.max_catch_up)) as u32).max(1)
    }
}
