/*
 *  display/font.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Text measurement and 1-bit glyph rasterising
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
use std::path::{Path, PathBuf};
use std::sync::Arc;

use embedded_graphics::prelude::Point;
use log::{debug, warn};
use mini_moka::sync::Cache;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::constants::{FONT_LIBRARY_CAPACITY, GLYPH_CACHE_CAPACITY, MISSING_GLYPH_ADVANCE};
use crate::display::error::{FontError, RenderGlyphMissing};

/// Coverage at or above this (of 255) lights an LED
const COVERAGE_THRESHOLD: u8 = 128;

/// A rendered line of text as an on/off mask.
///
/// `width` is the advance width of the run, `height` the line height; both
/// are the numbers layout uses.
#[derive(Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl GlyphBitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, bits: vec![false; (width * height) as usize] }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    pub fn is_lit(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.bits[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            self.bits[(y as u32 * self.width + x as u32) as usize] = true;
        }
    }

    /// Lit pixel coordinates relative to the top-left of the run
    pub fn lit_pixels(&self) -> impl Iterator<Item = Point> + '_ {
        let w = self.width.max(1) as usize;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(move |(i, _)| Point::new((i % w) as i32, (i / w) as i32))
    }

    pub fn lit_count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Hollow rectangle, the fallback for characters the face lacks
    fn frame(&mut self, x0: i32, y0: i32, w: i32, h: i32) {
        if w <= 0 || h <= 0 {
            return;
        }
        for x in x0..x0 + w {
            self.set(x, y0);
            self.set(x, y0 + h - 1);
        }
        for y in y0..y0 + h {
            self.set(x0, y);
            self.set(x0 + w - 1, y);
        }
    }
}

impl fmt::Debug for GlyphBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlyphBitmap({}x{}, {} lit)", self.width, self.height, self.lit_count())
    }
}

/// Measures and rasterises text at a pixel size.
///
/// Shared between the render loop and layout code, hence `Send + Sync`.
pub trait Typeface: Send + Sync {
    /// Advance width of `text` in whole pixels
    fn text_width(&self, text: &str, size: u32) -> u32;

    /// Height of one line box at `size`
    fn line_height(&self, size: u32) -> u32;

    /// Run of `text` as a mask `text_width` by `line_height` pixels
    fn rasterize(&self, text: &str, size: u32) -> Arc<GlyphBitmap>;

    /// Face kept under the file name `font`. None means draw with `self`.
    fn named(&self, _font: &str) -> Option<Arc<dyn Typeface>> {
        None
    }
}

/// Run `f` with the face a text asks for by name, else with `typeface`.
pub fn with_face<R>(
    typeface: &dyn Typeface,
    font: Option<&str>,
    f: impl FnOnce(&dyn Typeface) -> R,
) -> R {
    match font.and_then(|name| typeface.named(name)) {
        Some(face) => f(face.as_ref()),
        None => f(typeface),
    }
}

/// The default face plus faces that templates name, loaded from `dir`
/// on first use.
///
/// A named font that cannot be loaded is logged once and drawn with the
/// default face from then on.
pub struct FontLibrary {
    dir: PathBuf,
    default: Arc<dyn Typeface>,
    named: Cache<String, Arc<dyn Typeface>>,
}

impl fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontLibrary")
            .field("dir", &self.dir)
            .field("named", &self.named.entry_count())
            .finish_non_exhaustive()
    }
}

impl FontLibrary {
    pub fn new(dir: impl Into<PathBuf>, default: Arc<dyn Typeface>) -> Self {
        Self { dir: dir.into(), default, named: Cache::new(FONT_LIBRARY_CAPACITY) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Typeface for FontLibrary {
    fn text_width(&self, text: &str, size: u32) -> u32 {
        self.default.text_width(text, size)
    }

    fn line_height(&self, size: u32) -> u32 {
        self.default.line_height(size)
    }

    fn rasterize(&self, text: &str, size: u32) -> Arc<GlyphBitmap> {
        self.default.rasterize(text, size)
    }

    fn named(&self, font: &str) -> Option<Arc<dyn Typeface>> {
        if let Some(face) = self.named.get(&font.to_string()) {
            return Some(face);
        }
        let face: Arc<dyn Typeface> = match FontBook::open(self.dir.join(font)) {
            Ok(book) => {
                debug!("loaded font {}", book.path().display());
                Arc::new(book)
            }
            Err(e) => {
                warn!("{}; using the default face", e);
                Arc::clone(&self.default)
            }
        };
        self.named.insert(font.to_string(), Arc::clone(&face));
        Some(face)
    }
}

/// TrueType/OpenType face loaded from disk
pub struct FontBook {
    path: PathBuf,
    data: Vec<u8>,
    runs: Cache<(String, u32), Arc<GlyphBitmap>>,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Scaled vertical metrics for one size
struct Metrics {
    scale: f32,
    ascent: f32,
    line_height: u32,
}

impl FontBook {
    /// Read and check a font file. Missing or corrupt files are fatal for the caller.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|source| FontError::Io { path: path.clone(), source })?;
        Self::from_bytes(path, data)
    }

    pub fn from_bytes(path: PathBuf, data: Vec<u8>) -> Result<Self, FontError> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| FontError::Parse { path: path.clone(), reason: e.to_string() })?;
        debug!(
            "font {}: {} glyphs, {} units/em",
            path.display(),
            face.number_of_glyphs(),
            face.units_per_em()
        );
        Ok(Self { path, data, runs: Cache::new(GLYPH_CACHE_CAPACITY) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        // checked once in from_bytes
        ttf_parser::Face::parse(&self.data, 0).ok()
    }

    fn metrics(face: &ttf_parser::Face<'_>, size: u32) -> Metrics {
        let scale = size as f32 / f32::from(face.units_per_em().max(1));
        let ascent = f32::from(face.ascender()) * scale;
        let descent = f32::from(face.descender()) * scale;
        let line_height = (ascent - descent).ceil().max(1.0) as u32;
        Metrics { scale, ascent, line_height }
    }

    fn advance(face: &ttf_parser::Face<'_>, ch: char, size: u32, scale: f32) -> f32 {
        match face.glyph_index(ch) {
            Some(gid) => f32::from(face.glyph_hor_advance(gid).unwrap_or(0)) * scale,
            None => size as f32 * MISSING_GLYPH_ADVANCE,
        }
    }

    fn render_run(&self, text: &str, size: u32) -> GlyphBitmap {
        let Some(face) = self.face() else {
            return GlyphBitmap::new(0, size);
        };
        let m = Self::metrics(&face, size);
        let width: f32 = text.chars().map(|ch| Self::advance(&face, ch, size, m.scale)).sum();
        let width = width.ceil() as u32;
        let mut out = GlyphBitmap::new(width, m.line_height);

        let Some(mut pixmap) = Pixmap::new(width.max(1), m.line_height) else {
            return out;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 255);
        paint.anti_alias = true;

        let mut pen = 0.0f32;
        let mut boxes = Vec::new();
        for ch in text.chars() {
            match face.glyph_index(ch) {
                Some(gid) => {
                    let mut outline = OutlinePen {
                        builder: PathBuilder::new(),
                        dx: pen,
                        baseline: m.ascent,
                        scale: m.scale,
                    };
                    // glyphs without contours (space) yield no path
                    if face.outline_glyph(gid, &mut outline).is_some() {
                        if let Some(path) = outline.builder.finish() {
                            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                        }
                    }
                    pen += f32::from(face.glyph_hor_advance(gid).unwrap_or(0)) * m.scale;
                }
                None => {
                    if !ch.is_whitespace() {
                        warn!("{}", RenderGlyphMissing { ch });
                        boxes.push(pen);
                    }
                    pen += size as f32 * MISSING_GLYPH_ADVANCE;
                }
            }
        }

        for (i, px) in pixmap.pixels().iter().enumerate() {
            if px.alpha() >= COVERAGE_THRESHOLD {
                let w = pixmap.width() as usize;
                out.set((i % w) as i32, (i / w) as i32);
            }
        }

        let box_w = (size as f32 * MISSING_GLYPH_ADVANCE).floor() as i32 - 1;
        let box_h = (m.ascent * 0.8).round() as i32;
        let top = (m.ascent - box_h as f32).round() as i32;
        for x in boxes {
            out.frame(x.round() as i32 + 1, top, box_w, box_h);
        }
        out
    }
}

impl Typeface for FontBook {
    fn text_width(&self, text: &str, size: u32) -> u32 {
        self.rasterize(text, size).width()
    }

    fn line_height(&self, size: u32) -> u32 {
        self.face().map(|f| Self::metrics(&f, size).line_height).unwrap_or(size)
    }

    fn rasterize(&self, text: &str, size: u32) -> Arc<GlyphBitmap> {
        let key = (text.to_string(), size);
        if let Some(hit) = self.runs.get(&key) {
            return hit;
        }
        let run = Arc::new(self.render_run(text, size));
        self.runs.insert(key, run.clone());
        run
    }
}

/// Forwards font-unit outline segments into a pixel-space path
struct OutlinePen {
    builder: PathBuilder,
    dx: f32,
    baseline: f32,
    scale: f32,
}

impl OutlinePen {
    #[inline]
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.dx + x * self.scale, self.baseline - y * self.scale)
    }
}

impl ttf_parser::OutlineBuilder for OutlinePen {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Fixed-cell typeface with no font file.
///
/// ASCII is `ceil(0.6 * size)` wide, everything else a full `size` square;
/// each cell draws as a solid block inset by one pixel. Stands in for a real
/// face wherever exact pixel positions are asserted.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFont;

impl BlockFont {
    fn cell(ch: char, size: u32) -> u32 {
        if ch.is_ascii() { (size * 3).div_ceil(5) } else { size }
    }
}

impl Typeface for BlockFont {
    fn text_width(&self, text: &str, size: u32) -> u32 {
        text.chars().map(|c| Self::cell(c, size)).sum()
    }

    fn line_height(&self, size: u32) -> u32 {
        size
    }

    fn rasterize(&self, text: &str, size: u32) -> Arc<GlyphBitmap> {
        let mut out = GlyphBitmap::new(self.text_width(text, size), size);
        let mut x0 = 0i32;
        for ch in text.chars() {
            let cell = Self::cell(ch, size) as i32;
            if !ch.is_whitespace() {
                for y in 1..size as i32 - 1 {
                    for x in x0 + 1..x0 + cell - 1 {
                        out.set(x, y);
                    }
                }
            }
            x0 += cell;
        }
        Arc::new(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_font_metrics() {
        let f = BlockFont;
        assert_eq!(f.text_width("AB", 10), 12);
        assert_eq!(f.text_width("回送", 15), 30);
        assert_eq!(f.line_height(15), 15);
    }

    #[test]
    fn test_block_font_raster_insets_cells() {
        let run = BlockFont.rasterize("回 ", 8);
        assert_eq!((run.width(), run.height()), (13, 8));
        assert!(!run.is_lit(0, 0));
        assert!(run.is_lit(1, 1));
        assert!(run.is_lit(6, 6));
        assert!(!run.is_lit(7, 6));
        // space cell stays dark
        assert!(!run.is_lit(10, 4));
        assert_eq!(run.lit_count(), 36);
    }

    #[test]
    fn test_fallback_frame() {
        let mut bmp = GlyphBitmap::new(6, 6);
        bmp.frame(1, 1, 4, 4);
        assert_eq!(bmp.lit_count(), 12);
        assert!(bmp.is_lit(1, 1) && bmp.is_lit(4, 4));
        assert!(!bmp.is_lit(2, 2));
    }

    fn fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf")
    }

    #[test]
    fn test_outline_glyphs_light_pixels() {
        let book = FontBook::open(fixture()).unwrap();
        let run = book.rasterize("A", 16);
        assert!(run.width() > 0);
        assert_eq!(run.width(), book.text_width("A", 16));
        assert_eq!(run.height(), book.line_height(16));
        assert!(run.lit_count() > 0);
        // cached
        assert!(Arc::ptr_eq(&run, &book.rasterize("A", 16)));
    }

    #[test]
    fn test_missing_glyphs_draw_boxes() {
        let book = FontBook::open(fixture()).unwrap();
        let run = book.rasterize("回送", 16);
        // two fallback advances of 0.6 * 16
        assert_eq!(run.width(), (2.0f32 * 0.6 * 16.0).ceil() as u32);
        assert_eq!(run.width(), 20);
        assert!(run.lit_count() > 0);
        // each box starts one pixel in from its cell
        let first_column: usize = (0..run.height()).filter(|&y| run.is_lit(1, y)).count();
        assert!(first_column > 0);
        assert_eq!((0..run.height()).filter(|&y| run.is_lit(0, y)).count(), 0);
    }

    #[test]
    fn test_library_resolves_named_fonts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::copy(fixture(), dir.path().join("mono.ttf")).unwrap();
        let lib = FontLibrary::new(dir.path(), Arc::new(BlockFont));

        // no name: the default face
        assert_eq!(with_face(&lib, None, |f| f.text_width("AB", 10)), 12);

        let mono = FontBook::open(fixture()).unwrap();
        let named = with_face(&lib, Some("mono.ttf"), |f| f.text_width("AB", 10));
        assert_eq!(named, mono.text_width("AB", 10));
        assert_eq!(with_face(&lib, Some("mono.ttf"), |f| f.line_height(10)), mono.line_height(10));

        // unknown files fall back, and stay cached
        assert_eq!(with_face(&lib, Some("absent.ttf"), |f| f.text_width("AB", 10)), 12);
        assert!(lib.named("absent.ttf").is_some());
    }

    #[test]
    fn test_plain_faces_ignore_names() {
        assert!(BlockFont.named("ipag.ttf").is_none());
        assert_eq!(with_face(&BlockFont, Some("ipag.ttf"), |f| f.line_height(12)), 12);
    }

    #[test]
    fn test_missing_font_file_is_error() {
        let err = FontBook::open("/nonexistent/fonts/ipag.ttf").unwrap_err();
        assert!(matches!(err, FontError::Io { .. }));
    }

    #[test]
    fn test_garbage_font_is_error() {
        let err = FontBook::from_bytes("junk.ttf".into(), b"not a font".to_vec()).unwrap_err();
        assert!(matches!(err, FontError::Parse { .. }));
    }
}
