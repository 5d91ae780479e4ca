/*
 *  display/renderer.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Template layout: template + scroll offsets -> draw plan
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

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::constants::*;
use crate::display::font::{Typeface, with_face};
use crate::display::plan::{DrawOp, DrawPlan, ScrollZone, ZoneId};
use crate::display::scroller::{ScrollOffset, ScrollOffsets};
use crate::templates::{DestinationTemplate, StyledText, TemplateSpec, TypeBox};

/// Lay out one frame of `template`.
///
/// Pure and deterministic: same template, offsets, typeface and canvas give
/// the same plan. Fills come before text. Zones missing from `offsets` are
/// drawn at offset 0.
pub fn render(
    template: &TemplateSpec,
    offsets: &ScrollOffsets,
    typeface: &dyn Typeface,
    canvas: Size,
) -> DrawPlan {
    let mut plan = DrawPlan::blank(canvas);
    match template {
        TemplateSpec::StaticText(t) => {
            plan.ops.push(centred(&t.text, typeface, canvas));
        }
        TemplateSpec::ScrollText(t) => {
            let off = offset_of(offsets, ZoneId::Marquee);
            let y = centre_y(&t.text, typeface, canvas);
            plan.ops.push(run(&t.text, Point::new(canvas.width as i32 - off, y), None));
        }
        TemplateSpec::Destination(d) => layout_destination(&mut plan, d, offsets, canvas),
    }
    plan
}

/// Zones of `template` that animate, with the text width driving each wrap.
pub fn scroll_zones(template: &TemplateSpec, typeface: &dyn Typeface) -> Vec<ScrollZone> {
    match template {
        TemplateSpec::StaticText(_) => Vec::new(),
        TemplateSpec::ScrollText(t) => vec![ScrollZone {
            id: ZoneId::Marquee,
            text_width: width_of(&t.text, typeface),
        }],
        TemplateSpec::Destination(d) => match &d.annotation {
            Some(note) if scrolls(note) => vec![ScrollZone {
                id: ZoneId::Annotation,
                text_width: width_of(note, typeface),
            }],
            _ => Vec::new(),
        },
    }
}

/// Notes longer than the static limit scroll, shorter ones sit still
fn scrolls(note: &StyledText) -> bool {
    note.char_count() > STATIC_ANNOTATION_MAX_CHARS
}

fn layout_destination(
    plan: &mut DrawPlan,
    d: &DestinationTemplate,
    offsets: &ScrollOffsets,
    canvas: Size,
) {
    let box_w = d.type_box.width.min(canvas.width);
    let type_area = Rectangle::new(Point::zero(), Size::new(box_w, canvas.height));
    let text_left = box_w as i32 + DESTINATION_GAP;

    plan.ops.push(DrawOp::FillRect { rect: type_area, color: d.background });

    match &d.annotation {
        Some(note) => {
            type_labels(plan, &d.type_box, type_area, TYPE_LABEL_SPACING, |chars, _| match chars {
                0..=3 => 14,
                4 => 10,
                _ => 7,
            });
            plan.ops.push(run(&d.destination, Point::new(text_left, 0), None));

            let y = canvas.height as i32 - ANNOTATION_BASELINE_FROM_BOTTOM;
            if scrolls(note) {
                let off = offset_of(offsets, ZoneId::Annotation);
                let clip = Rectangle::new(
                    Point::new(box_w as i32, 0),
                    Size::new(canvas.width - box_w, canvas.height),
                );
                plan.ops.push(run(note, Point::new(canvas.width as i32 - off, y), Some(clip)));
            } else {
                plan.ops.push(run(note, Point::new(text_left, y), None));
            }
        }
        None => {
            type_labels(plan, &d.type_box, type_area, TYPE_LABEL_SPACING_COMPACT, |_, n| {
                if n > 1 { 10 } else { 12 }
            });
            plan.ops.push(run(&d.destination, Point::new(text_left, DESTINATION_Y_NO_ANNOTATION), None));
        }
    }
}

/// Stack the service labels down the type box. `size_for(chars, labels)`
/// picks each label's size.
fn type_labels(
    plan: &mut DrawPlan,
    type_box: &TypeBox,
    area: Rectangle,
    spacing: i32,
    size_for: impl Fn(usize, usize) -> u32,
) {
    let count = type_box.labels.len();
    for (i, label) in type_box.labels.iter().enumerate() {
        if label.is_empty() {
            continue;
        }
        plan.ops.push(DrawOp::GlyphRun {
            text: label.clone(),
            origin: Point::new(TYPE_LABEL_X, TYPE_LABEL_Y + spacing * i as i32),
            size: size_for(label.chars().count(), count),
            color: type_box.color,
            font: type_box.font.clone(),
            clip: Some(area),
        });
    }
}

fn width_of(text: &StyledText, typeface: &dyn Typeface) -> u32 {
    with_face(typeface, text.font.as_deref(), |face| face.text_width(&text.content, text.size))
}

fn centred(text: &StyledText, typeface: &dyn Typeface, canvas: Size) -> DrawOp {
    let w = width_of(text, typeface) as i32;
    let x = (canvas.width as i32 - w) / 2;
    run(text, Point::new(x, centre_y(text, typeface, canvas)), None)
}

fn centre_y(text: &StyledText, typeface: &dyn Typeface, canvas: Size) -> i32 {
    let line = with_face(typeface, text.font.as_deref(), |face| face.line_height(text.size));
    (canvas.height as i32 - line as i32) / 2
}

fn run(text: &StyledText, origin: Point, clip: Option<Rectangle>) -> DrawOp {
    DrawOp::GlyphRun {
        text: text.content.clone(),
        origin,
        size: text.size,
        color: text.color,
        font: text.font.clone(),
        clip,
    }
}

fn offset_of(offsets: &ScrollOffsets, zone: ZoneId) -> i32 {
    offsets.get(&zone).copied().unwrap_or(ScrollOffset::ZERO).pixels() as i32
}
