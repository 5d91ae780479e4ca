/*
 *  display/mod.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem: layout, animation, painting and panel output
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod color;

// Pixel sinks
pub mod drivers;

// Text
pub mod font;

// Layout and animation
pub mod plan;
pub mod renderer;
pub mod scroller;
pub mod paint;

// Runtime
pub mod state;
pub mod mailbox;
pub mod render_loop;

// Re-exports for convenience
pub use traits::{PixelSink, SinkCapabilities};
pub use error::{FontError, RenderGlyphMissing, SinkError};
pub use color::{Color, ColorParseError};
pub use font::{BlockFont, FontBook, FontLibrary, GlyphBitmap, Typeface, with_face};
pub use plan::{DrawOp, DrawPlan, ScrollZone, ZoneId};
pub use renderer::{render, scroll_zones};
pub use scroller::{ScrollOffset, ScrollOffsets, ScrollSpeed, advance};
pub use paint::paint;
pub use state::{ActiveTemplate, DisplayState};
pub use mailbox::{DisplayCommand, SwitchSlot};
pub use render_loop::{RenderLoop, RenderLoopConfig};
pub use drivers::memory::MemoryDriver;
