/*
 *  display/error.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the pixel sink and glyph pipeline
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
use std::error::Error;
use std::path::PathBuf;

/// Failure reported by a pixel sink
#[derive(Debug)]
pub enum SinkError {
    /// Panel could not be brought up
    InitializationFailed(String),

    /// Buffer swap did not complete
    SwapFailed(String),

    /// Drawing into the back buffer failed
    DrawingError(String),

    /// Invalid panel configuration
    InvalidConfiguration(String),

    /// Operation not offered by this sink
    UnsupportedOperation,

    /// I/O error (snapshot files)
    IoError(std::io::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::InitializationFailed(msg) => write!(f, "Sink initialization failed: {}", msg),
            SinkError::SwapFailed(msg) => write!(f, "Buffer swap failed: {}", msg),
            SinkError::DrawingError(msg) => write!(f, "Drawing error: {}", msg),
            SinkError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            SinkError::UnsupportedOperation => write!(f, "Operation not supported by this sink"),
            SinkError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for SinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SinkError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::IoError(err)
    }
}

/// Font file could not be used
#[derive(Debug)]
pub enum FontError {
    /// File missing or unreadable
    Io { path: PathBuf, source: std::io::Error },

    /// Bytes are not a usable TrueType/OpenType face
    Parse { path: PathBuf, reason: String },
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontError::Io { path, source } => {
                write!(f, "cannot read font {}: {}", path.display(), source)
            }
            FontError::Parse { path, reason } => {
                write!(f, "cannot parse font {}: {}", path.display(), reason)
            }
        }
    }
}

impl Error for FontError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FontError::Io { source, .. } => Some(source),
            FontError::Parse { .. } => None,
        }
    }
}

/// A character the loaded face has no outline for.
///
/// Non-fatal: the glyph is drawn as a hollow box and this is only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderGlyphMissing {
    pub ch: char,
}

impl fmt::Display for RenderGlyphMissing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no glyph for {:?} (U+{:04X}), drawing fallback box", self.ch, self.ch as u32)
    }
}

impl Error for RenderGlyphMissing {}
