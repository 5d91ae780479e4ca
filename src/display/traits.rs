/*
 *  display/traits.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pixel sink abstraction over the panel hardware
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

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use crate::display::error::SinkError;

/// Panel geometry and feature flags
#[derive(Debug, Clone)]
pub struct SinkCapabilities {
    /// Logical canvas width in pixels (all chained panels)
    pub width: u32,

    /// Logical canvas height in pixels
    pub height: u32,

    /// Maximum recommended frame rate
    pub max_fps: u32,

    /// Whether brightness can be changed after init
    pub supports_brightness: bool,
}

impl SinkCapabilities {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Anything the render loop can push finished frames to.
///
/// Drawing goes into a back buffer through `DrawTarget`; nothing is visible
/// until `swap_buffers` returns. Implementations are not required to be
/// `Send`: the loop owns its sink for its whole life.
pub trait PixelSink: DrawTarget<Color = Rgb888> {
    /// Returns the capabilities of this sink
    fn capabilities(&self) -> &SinkCapabilities;

    /// Bring the panel up. Called once before the first frame.
    fn init(&mut self) -> Result<(), SinkError>;

    /// Set brightness as a percentage (1-100)
    fn set_brightness(&mut self, percent: u8) -> Result<(), SinkError>;

    /// Present the back buffer. Synchronous; on return the frame is shown.
    fn swap_buffers(&mut self) -> Result<(), SinkError>;

    /// Turn every pixel off on the panel itself (not just the back buffer)
    fn blank(&mut self) -> Result<(), SinkError>;
}
