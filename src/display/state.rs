/*
 *  display/state.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  What the sign is showing right now
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

use std::sync::Arc;

use embedded_graphics::prelude::Size;
use log::info;

use crate::display::font::Typeface;
use crate::display::mailbox::DisplayCommand;
use crate::display::plan::{DrawPlan, ScrollZone, ZoneId};
use crate::display::renderer;
use crate::display::scroller::{self, ScrollOffset, ScrollOffsets, ScrollSpeed};
use crate::templates::{Code, TemplateSpec};

/// The template on the panel and the zones it animates
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTemplate {
    pub code: Code,
    pub template: Arc<TemplateSpec>,
    pub zones: Vec<ScrollZone>,
}

/// Owned by the render loop alone. Nothing else mutates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    active: Option<ActiveTemplate>,
    offsets: ScrollOffsets,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `template`. The old state is dropped whole; every zone starts at 0.
    pub fn activate(&mut self, code: Code, template: Arc<TemplateSpec>, typeface: &dyn Typeface) {
        let zones = renderer::scroll_zones(&template, typeface);
        let offsets = zones.iter().map(|z| (z.id, ScrollOffset::ZERO)).collect();
        info!("showing {} ({}): {}", code, template.kind(), template.summary());
        *self = DisplayState {
            active: Some(ActiveTemplate { code, template, zones }),
            offsets,
        };
    }

    /// Show nothing
    pub fn blank(&mut self) {
        if let Some(prev) = &self.active {
            info!("blanking sign (was {})", prev.code);
        }
        *self = DisplayState::default();
    }

    pub fn apply(&mut self, command: DisplayCommand, typeface: &dyn Typeface) {
        match command {
            DisplayCommand::Show { code, template } => self.activate(code, template, typeface),
            DisplayCommand::Blank => self.blank(),
        }
    }

    pub fn active(&self) -> Option<&ActiveTemplate> {
        self.active.as_ref()
    }

    pub fn active_code(&self) -> Option<Code> {
        self.active.as_ref().map(|a| a.code)
    }

    pub fn offset(&self, zone: ZoneId) -> Option<ScrollOffset> {
        self.offsets.get(&zone).copied()
    }

    pub fn offsets(&self) -> &ScrollOffsets {
        &self.offsets
    }

    /// Advance every scrolling zone by `delta_frames`
    pub fn tick(&mut self, delta_frames: u32, canvas_width: u32, speed: ScrollSpeed) {
        let Some(active) = &self.active else { return };
        for zone in &active.zones {
            let prev = self.offsets.get(&zone.id).copied().unwrap_or_default();
            let next = scroller::advance(prev, delta_frames, zone.text_width, canvas_width, speed);
            self.offsets.insert(zone.id, next);
        }
    }

    /// Draw plan for the current frame
    pub fn plan(&self, typeface: &dyn Typeface, canvas: Size) -> DrawPlan {
        match &self.active {
            Some(active) => renderer::render(&active.template, &self.offsets, typeface, canvas),
            None => DrawPlan::blank(canvas),
        }
    }
}
