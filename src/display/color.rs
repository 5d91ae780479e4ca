/*
 *  display/color.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  RGB colour values parsed from template hex strings
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
use std::str::FromStr;

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

/// 24-bit colour as written in templates (`#rgb` or `#rrggbb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Why a colour string was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// No leading `#`
    MissingHash,
    /// Digit count other than 3 or 6
    BadLength(usize),
    /// Non-hex character
    BadDigit(char),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorParseError::MissingHash => write!(f, "colour must start with '#'"),
            ColorParseError::BadLength(n) => {
                write!(f, "colour must have 3 or 6 hex digits, found {}", n)
            }
            ColorParseError::BadDigit(c) => write!(f, "'{}' is not a hex digit", c),
        }
    }
}

impl std::error::Error for ColorParseError {}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` / `#rrggbb`, case-insensitive.
    pub fn parse(s: &str) -> Result<Self, ColorParseError> {
        let hex = s.strip_prefix('#').ok_or(ColorParseError::MissingHash)?;

        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ColorParseError::BadDigit(bad));
        }

        // all ascii from here, byte indexing is safe
        let digits = hex.as_bytes();
        match digits.len() {
            3 => Ok(Self::rgb(
                nibble(digits[0]) * 17,
                nibble(digits[1]) * 17,
                nibble(digits[2]) * 17,
            )),
            6 => Ok(Self::rgb(
                nibble(digits[0]) << 4 | nibble(digits[1]),
                nibble(digits[2]) << 4 | nibble(digits[3]),
                nibble(digits[4]) << 4 | nibble(digits[5]),
            )),
            n => Err(ColorParseError::BadLength(n)),
        }
    }

    #[inline]
    pub fn to_rgb888(self) -> Rgb888 {
        Rgb888::new(self.r, self.g, self.b)
    }
}

#[inline]
fn nibble(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Color> for Rgb888 {
    fn from(c: Color) -> Self {
        c.to_rgb888()
    }
}

impl From<Rgb888> for Color {
    fn from(c: Rgb888) -> Self {
        Color::rgb(c.r(), c.g(), c.b())
    }
}
