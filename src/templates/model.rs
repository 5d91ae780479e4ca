/*
 *  templates/model.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Validated, render-ready template descriptors
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
use std::fmt;
use std::sync::Arc;

use crate::display::color::Color;

/// Two ASCII digits, `00` through `99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Code([u8; 2]);

impl Code {
    /// Build from two digit values (0-9). Returns None if either is out of range.
    pub fn from_digits(first: u8, second: u8) -> Option<Self> {
        if first > 9 || second > 9 {
            return None;
        }
        Some(Self([b'0' + first, b'0' + second]))
    }

    /// Parse a configuration key; exactly two ASCII digits.
    pub fn parse(s: &str) -> Option<Self> {
        match s.as_bytes() {
            [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => Some(Self([*a, *b])),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        // both bytes are ascii digits
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run of text with its colour and pixel size resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledText {
    pub content: String,
    pub color: Color,
    pub size: u32,
    /// Font file name from the template; None draws with the default face
    pub font: Option<String>,
}

impl StyledText {
    pub fn new(content: impl Into<String>, color: Color, size: u32) -> Self {
        Self { content: content.into(), color, size, font: None }
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Service-type labels stacked in the left box of a destination sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeBox {
    pub labels: Vec<String>,
    pub color: Color,
    pub width: u32,
    pub font: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTemplate {
    pub destination: StyledText,
    /// Fill behind the type box
    pub background: Color,
    /// Scrolling note under the destination (stops, car info...)
    pub annotation: Option<StyledText>,
    pub type_box: TypeBox,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    pub text: StyledText,
}

/// One display definition, resolved from its `type` tag at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSpec {
    /// `dest`
    Destination(DestinationTemplate),
    /// `textNsc`: centred, still
    StaticText(TextTemplate),
    /// `textScr`: marquee
    ScrollText(TextTemplate),
}

impl TemplateSpec {
    /// The tag used in the template file
    pub fn kind(&self) -> &'static str {
        match self {
            TemplateSpec::Destination(_) => "dest",
            TemplateSpec::StaticText(_) => "textNsc",
            TemplateSpec::ScrollText(_) => "textScr",
        }
    }

    /// Short human label for logs
    pub fn summary(&self) -> &str {
        match self {
            TemplateSpec::Destination(d) => &d.destination.content,
            TemplateSpec::StaticText(t) | TemplateSpec::ScrollText(t) => &t.text.content,
        }
    }
}

/// Immutable code → template mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateConfig {
    entries: BTreeMap<Code, Arc<TemplateSpec>>,
}

impl TemplateConfig {
    pub fn new(entries: BTreeMap<Code, Arc<TemplateSpec>>) -> Self {
        Self { entries }
    }

    pub fn get(&self, code: Code) -> Option<&Arc<TemplateSpec>> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = Code> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Code, &Arc<TemplateSpec>)> {
        self.entries.iter().map(|(c, t)| (*c, t))
    }
}

impl FromIterator<(Code, TemplateSpec)> for TemplateConfig {
    fn from_iter<I: IntoIterator<Item = (Code, TemplateSpec)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(c, t)| (c, Arc::new(t))).collect())
    }
}
