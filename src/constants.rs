/*
 *  constants.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
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

use std::time::Duration;

// template defaults
pub const DEFAULT_TEXT_SIZE: u32 = 16;
pub const DEFAULT_DESTINATION_SIZE: u32 = 20;
pub const DEFAULT_DESTINATION_SIZE_NO_ANNOTATION: u32 = 24;
pub const DEFAULT_ANNOTATION_SIZE: u32 = 12;
pub const DEFAULT_TYPE_BOX_WIDTH: u32 = 40;
pub const DEFAULT_TYPE_BOX_LABELS: [&str; 2] = ["特急", "LTD.EXP"];
pub const DEFAULT_TYPE_BOX_BACKGROUND: &str = "#FF0000";
pub const MAX_TEXT_SIZE: u32 = 64;
pub const MAX_TYPE_BOX_WIDTH: u32 = 127;

// destination layout anchors
pub const TYPE_LABEL_X: i32 = 4;
pub const TYPE_LABEL_Y: i32 = 3;
pub const TYPE_LABEL_SPACING: i32 = 15;
pub const TYPE_LABEL_SPACING_COMPACT: i32 = 13;
pub const DESTINATION_GAP: i32 = 4;
pub const DESTINATION_Y_NO_ANNOTATION: i32 = 4;
pub const ANNOTATION_BASELINE_FROM_BOTTOM: i32 = 13;
/// Annotations this short sit still instead of scrolling
pub const STATIC_ANNOTATION_MAX_CHARS: usize = 7;

// panel
pub const PANEL_ROWS: u32 = 32;
pub const PANEL_COLS: u32 = 64;
pub const PANEL_CHAIN: u32 = 2;
pub const PANEL_BRIGHTNESS: u8 = 80;

// animation
pub const DEFAULT_FPS: u32 = 20;
pub const DEFAULT_SCROLL_SPEED_PPS: u32 = 40;
/// Scroll offsets carry this many sub-pixel steps per pixel
pub const SUBPIXELS: u32 = 256;

// keypad
pub const ENTRY_TIMEOUT: Duration = Duration::from_secs(10);
pub const BLANK_PRESS_COUNT: usize = 3;
pub const BLANK_PRESS_WINDOW: Duration = Duration::from_millis(300);

// fonts
pub const MISSING_GLYPH_ADVANCE: f32 = 0.6;
pub const GLYPH_CACHE_CAPACITY: u64 = 256;
/// Named faces held by a `FontLibrary`
pub const FONT_LIBRARY_CAPACITY: u64 = 16;
