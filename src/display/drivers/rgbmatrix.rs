/*
 *  display/drivers/rgbmatrix.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  HUB75 panel chain via rpi-rgb-led-matrix
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
use log::info;
use rpi_led_matrix::{LedCanvas, LedColor, LedMatrix, LedMatrixOptions, LedRuntimeOptions};

use crate::config::MatrixConfig;
use crate::display::error::SinkError;
use crate::display::traits::{PixelSink, SinkCapabilities};

/// Chained RGB panels driven from the Pi GPIO.
///
/// The library double-buffers: we draw into an offscreen canvas and hand it
/// back on `swap`, getting the previous front canvas in return. Holds raw
/// library handles, so it is neither `Send` nor `Sync`.
pub struct RgbMatrixDriver {
    matrix: LedMatrix,
    canvas: Option<LedCanvas>,
    capabilities: SinkCapabilities,
}

impl RgbMatrixDriver {
    pub fn new(cfg: &MatrixConfig) -> Result<Self, SinkError> {
        let mut options = LedMatrixOptions::new();
        options.set_rows(cfg.rows());
        options.set_cols(cfg.cols());
        options.set_chain_length(cfg.chain_length());
        options.set_parallel(cfg.parallel());
        options.set_hardware_mapping(cfg.hardware_mapping());
        options.set_led_rgb_sequence(cfg.led_rgb_sequence());
        options.set_multiplexing(cfg.multiplexing());
        options.set_row_addr_type(cfg.row_address_type());
        if !cfg.panel_type().is_empty() {
            options.set_panel_type(cfg.panel_type());
        }
        options
            .set_brightness(cfg.brightness())
            .map_err(|e| SinkError::InvalidConfiguration(e.to_string()))?;

        let mut runtime = LedRuntimeOptions::new();
        runtime.set_gpio_slowdown(cfg.gpio_slowdown());

        let matrix = LedMatrix::new(Some(options), Some(runtime))
            .map_err(|e| SinkError::InitializationFailed(e.to_string()))?;
        let canvas = matrix.offscreen_canvas();
        let (w, h) = canvas.canvas_size();
        info!(
            "rgb matrix up: {}x{} ({} x {}x{} panels, mapping {})",
            w,
            h,
            cfg.chain_length() * cfg.parallel(),
            cfg.cols(),
            cfg.rows(),
            cfg.hardware_mapping()
        );

        Ok(Self {
            matrix,
            canvas: Some(canvas),
            capabilities: SinkCapabilities {
                width: w.max(0) as u32,
                height: h.max(0) as u32,
                max_fps: 120,
                supports_brightness: false,
            },
        })
    }

    fn canvas(&mut self) -> Result<&mut LedCanvas, SinkError> {
        self.canvas
            .as_mut()
            .ok_or_else(|| SinkError::DrawingError("offscreen canvas lost in swap".to_string()))
    }
}

impl PixelSink for RgbMatrixDriver {
    fn capabilities(&self) -> &SinkCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), SinkError> {
        // the library brings the panel up in LedMatrix::new
        self.canvas()?.clear();
        Ok(())
    }

    fn set_brightness(&mut self, _percent: u8) -> Result<(), SinkError> {
        // fixed at construction via LedMatrixOptions
        Err(SinkError::UnsupportedOperation)
    }

    fn swap_buffers(&mut self) -> Result<(), SinkError> {
        let back = self
            .canvas
            .take()
            .ok_or_else(|| SinkError::SwapFailed("no offscreen canvas".to_string()))?;
        self.canvas = Some(self.matrix.swap(back));
        Ok(())
    }

    fn blank(&mut self) -> Result<(), SinkError> {
        self.canvas()?.clear();
        self.swap_buffers()?;
        self.canvas()?.clear();
        Ok(())
    }
}

impl DrawTarget for RgbMatrixDriver {
    type Color = Rgb888;
    type Error = SinkError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.capabilities.width as i32, self.capabilities.height as i32);
        let canvas = self.canvas()?;
        for Pixel(p, c) in pixels {
            if p.x >= 0 && p.y >= 0 && p.x < w && p.y < h {
                canvas.set(p.x, p.y, &LedColor { red: c.r(), green: c.g(), blue: c.b() });
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let canvas = self.canvas()?;
        if color == Rgb888::BLACK {
            canvas.clear();
        } else {
            canvas.fill(&LedColor { red: color.r(), green: color.g(), blue: color.b() });
        }
        Ok(())
    }
}

impl OriginDimensions for RgbMatrixDriver {
    fn size(&self) -> Size {
        self.capabilities.size()
    }
}
