/*
 *  display/plan.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Per-frame draw plan produced by the renderer
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

use std::fmt;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::display::color::Color;

/// Identifies a scrolling region within a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ZoneId {
    /// Note line under a destination
    Annotation,
    /// Full-width scrolling text
    Marquee,
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneId::Annotation => write!(f, "annotation"),
            ZoneId::Marquee => write!(f, "marquee"),
        }
    }
}

/// A scrolling zone and the pixel width of the text it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollZone {
    pub id: ZoneId,
    pub text_width: u32,
}

/// One primitive. Ops are painted in plan order; later ops sit on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    FillRect {
        rect: Rectangle,
        color: Color,
    },
    GlyphRun {
        text: String,
        /// Top-left of the line box
        origin: Point,
        size: u32,
        color: Color,
        /// Named face, see `font::with_face`
        font: Option<String>,
        /// Pixels outside this rectangle are dropped
        clip: Option<Rectangle>,
    },
}

impl DrawOp {
    pub fn is_text(&self) -> bool {
        matches!(self, DrawOp::GlyphRun { .. })
    }
}

/// Everything needed to produce one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPlan {
    pub size: Size,
    pub background: Color,
    pub ops: Vec<DrawOp>,
}

impl DrawPlan {
    pub fn blank(size: Size) -> Self {
        Self { size, background: Color::BLACK, ops: Vec::new() }
    }

    pub fn glyph_runs(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(|op| op.is_text())
    }
}
