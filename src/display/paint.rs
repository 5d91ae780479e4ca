/*
 *  display/paint.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Executes a draw plan against any embedded-graphics target
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

use embedded_graphics::draw_target::DrawTargetExt;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use crate::display::font::{Typeface, with_face};
use crate::display::plan::{DrawOp, DrawPlan};

/// Clear `target` to the plan background and draw every op in order.
pub fn paint<D>(plan: &DrawPlan, target: &mut D, typeface: &dyn Typeface) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    target.clear(plan.background.to_rgb888())?;
    let bounds = target.bounding_box();

    for op in &plan.ops {
        match op {
            DrawOp::FillRect { rect, color } => {
                target.fill_solid(rect, color.to_rgb888())?;
            }
            DrawOp::GlyphRun { text, origin, size, color, font, clip } => {
                let run = with_face(typeface, font.as_deref(), |face| face.rasterize(text, *size));
                // marquee text spends most of its life partly or wholly off canvas
                let right = origin.x + run.width() as i32;
                if right <= bounds.top_left.x || origin.x >= bounds.top_left.x + bounds.size.width as i32 {
                    continue;
                }
                let c = color.to_rgb888();
                let pixels = run.lit_pixels().map(|p| Pixel(p + *origin, c));
                match clip {
                    Some(area) => target.clipped(area).draw_iter(pixels)?,
                    None => target.draw_iter(pixels)?,
                }
            }
        }
    }
    Ok(())
}
