/*
 *  display/drivers/memory.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory pixel sink for headless runs and tests
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

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::display::error::SinkError;
use crate::display::traits::{PixelSink, SinkCapabilities};
use crate::vframebuf::VarFrameBuf;

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Double-buffered panel that lives in RAM.
///
/// Useful for:
/// - headless runs (`--headless`, optionally with `--snapshot`)
/// - unit and integration tests
/// - development away from the Pi
///
/// Drawing lands in the back buffer; `swap_buffers` copies it to the front
/// buffer, which is what `pixel`/`save_ppm` read.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    back: VarFrameBuf<Rgb888>,
    front: VarFrameBuf<Rgb888>,

    /// Frame that was showing when the panel was last blanked
    retired: Option<VarFrameBuf<Rgb888>>,

    /// Sink capabilities
    capabilities: SinkCapabilities,

    /// Shared state for inspection
    state: Arc<Mutex<MemoryDriverState>>,
}

/// Counters and failure switches (shared so tests can hold a handle while
/// the render loop owns the driver)
#[derive(Debug, Default)]
pub struct MemoryDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Completed swaps
    pub swap_count: usize,

    /// Number of times blank() was called
    pub blank_count: usize,

    /// Last brightness value set
    pub last_brightness: Option<u8>,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Simulate failures (for error testing)
    pub simulate_swap_failure: bool,
    pub simulate_init_failure: bool,
}

impl MemoryDriver {
    pub fn new(width: u32, height: u32) -> Self {
        let capabilities = SinkCapabilities {
            width,
            height,
            max_fps: 120,
            supports_brightness: true,
        };
        Self {
            back: VarFrameBuf::new(width, height, Rgb888::BLACK),
            front: VarFrameBuf::new(width, height, Rgb888::BLACK),
            retired: None,
            capabilities,
            state: Arc::new(Mutex::new(MemoryDriverState::default())),
        }
    }

    /// Handle to the counters; stays valid after the driver is moved
    pub fn state(&self) -> Arc<Mutex<MemoryDriverState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryDriverState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Last presented frame
    pub fn front(&self) -> &VarFrameBuf<Rgb888> {
        &self.front
    }

    /// Colour of a presented pixel
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb888> {
        self.front.pixel(x, y)
    }

    /// Presented pixels that are not black
    pub fn count_lit_pixels(&self) -> usize {
        self.front.as_slice().iter().filter(|&&p| p != Rgb888::BLACK).count()
    }

    /// Last content frame: the front buffer, or what it held before a blank
    pub fn last_frame(&self) -> &VarFrameBuf<Rgb888> {
        self.retired.as_ref().unwrap_or(&self.front)
    }

    /// Write `last_frame` as binary PPM (P6)
    pub fn save_ppm(&self, path: impl AsRef<Path>) -> Result<(), SinkError> {
        let frame = self.last_frame();
        let mut out = Vec::with_capacity(frame.as_slice().len() * 3 + 32);
        write!(out, "P6\n{} {}\n255\n", self.capabilities.width, self.capabilities.height)?;
        for px in frame.as_slice() {
            out.extend_from_slice(&[px.r(), px.g(), px.b()]);
        }
        std::fs::write(path, out)?;
        Ok(())
    }
}

impl PixelSink for MemoryDriver {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), SinkError> {
        let mut state = self.lock();

        if state.simulate_init_failure {
            return Err(SinkError::InitializationFailed("Simulated init failure".to_string()));
        }

        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn set_brightness(&mut self, percent: u8) -> Result<(), SinkError> {
        if !(1..=100).contains(&percent) {
            return Err(SinkError::InvalidConfiguration(format!(
                "brightness {} outside 1..=100",
                percent
            )));
        }
        self.lock().last_brightness = Some(percent);
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), SinkError> {
        {
            let mut state = self.lock();
            if state.simulate_swap_failure {
                return Err(SinkError::SwapFailed("Simulated swap failure".to_string()));
            }
            state.swap_count += 1;
        }
        self.retired = None;
        self.front.clone_from(&self.back);
        Ok(())
    }

    fn blank(&mut self) -> Result<(), SinkError> {
        self.lock().blank_count += 1;
        if self.retired.is_none() {
            self.retired = Some(self.front.clone());
        }
        self.back.clear_color(Rgb888::BLACK);
        self.front.clear_color(Rgb888::BLACK);
        Ok(())
    }
}

impl DrawTarget for MemoryDriver {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.back.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.back.clear(color)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.back.fill_solid(area, color)
    }
}

impl OriginDimensions for MemoryDriver {
    fn size(&self) -> Size {
        self.capabilities.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn test_memory_driver_creation() {
        let driver = MemoryDriver::new(128, 32);
        assert_eq!(driver.capabilities().width, 128);
        assert_eq!(driver.capabilities().height, 32);
        assert_eq!(driver.count_lit_pixels(), 0);
    }

    #[test]
    fn test_memory_driver_init() {
        let mut driver = MemoryDriver::new(128, 32);

        let state = driver.state();
        assert_eq!(state.lock().unwrap().init_count, 0);
        assert!(!state.lock().unwrap().is_initialized);

        driver.init().unwrap();

        assert_eq!(state.lock().unwrap().init_count, 1);
        assert!(state.lock().unwrap().is_initialized);
    }

    #[test]
    fn test_drawing_invisible_until_swap() {
        let mut driver = MemoryDriver::new(128, 32);

        Line::new(Point::new(0, 0), Point::new(10, 10))
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::RED, 1))
            .draw(&mut driver)
            .unwrap();

        assert_eq!(driver.count_lit_pixels(), 0);
        driver.swap_buffers().unwrap();
        assert!(driver.count_lit_pixels() > 0);
        assert_eq!(driver.pixel(0, 0), Some(Rgb888::RED));
        assert_eq!(driver.state().lock().unwrap().swap_count, 1);
    }

    #[test]
    fn test_simulated_swap_failure_keeps_front() {
        let mut driver = MemoryDriver::new(16, 8);
        driver.state().lock().unwrap().simulate_swap_failure = true;
        driver.fill_solid(&Rectangle::new(Point::zero(), Size::new(4, 4)), Rgb888::WHITE).unwrap();

        assert!(matches!(driver.swap_buffers(), Err(SinkError::SwapFailed(_))));
        assert_eq!(driver.count_lit_pixels(), 0);
    }

    #[test]
    fn test_blank_clears_both_buffers() {
        let mut driver = MemoryDriver::new(16, 8);
        DrawTarget::clear(&mut driver, Rgb888::WHITE).unwrap();
        driver.swap_buffers().unwrap();
        assert_eq!(driver.count_lit_pixels(), 128);

        driver.blank().unwrap();
        assert_eq!(driver.count_lit_pixels(), 0);
        // the blanked-out frame is still available for snapshots
        assert_eq!(driver.last_frame().pixel(0, 0), Some(Rgb888::WHITE));
        driver.swap_buffers().unwrap();
        assert_eq!(driver.count_lit_pixels(), 0);
        assert_eq!(driver.state().lock().unwrap().blank_count, 1);
        assert_eq!(driver.last_frame().pixel(0, 0), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_brightness_range() {
        let mut driver = MemoryDriver::new(16, 8);
        driver.set_brightness(80).unwrap();
        assert_eq!(driver.state().lock().unwrap().last_brightness, Some(80));
        assert!(driver.set_brightness(0).is_err());
        assert!(driver.set_brightness(101).is_err());
    }

    #[test]
    fn test_save_ppm() {
        let mut driver = MemoryDriver::new(4, 2);
        DrawTarget::clear(&mut driver, Rgb888::new(1, 2, 3)).unwrap();
        driver.swap_buffers().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ppm");
        driver.save_ppm(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let header = b"P6\n4 2\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(bytes.len(), header.len() + 4 * 2 * 3);
        assert_eq!(&bytes[header.len()..header.len() + 3], &[1, 2, 3]);
    }
}
