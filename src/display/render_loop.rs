/*
 *  display/render_loop.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed-rate frame scheduler driving the pixel sink
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

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use embedded_graphics::prelude::Size;
use log::{debug, error, info, warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_FPS, DEFAULT_SCROLL_SPEED_PPS};
use crate::display::error::SinkError;
use crate::display::font::Typeface;
use crate::display::mailbox::{DisplayCommand, SwitchSlot};
use crate::display::paint::paint;
use crate::display::scroller::ScrollSpeed;
use crate::display::state::DisplayState;
use crate::display::traits::{PixelSink, SinkCapabilities};
use crate::pacer::Pacer;

/// Frame rate and marquee speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLoopConfig {
    pub fps: u32,
    pub scroll_speed: ScrollSpeed,
}

impl RenderLoopConfig {
    pub fn new(fps: u32, scroll_speed_pps: u32) -> Self {
        let fps = fps.max(1);
        Self { fps, scroll_speed: ScrollSpeed::from_pixels_per_second(scroll_speed_pps, fps) }
    }

    /// As `new`, with the frame rate held to what `caps` can present.
    /// Marquee speed in pixels per second is kept.
    pub fn for_sink(fps: u32, scroll_speed_pps: u32, caps: &SinkCapabilities) -> Self {
        let max = caps.max_fps.max(1);
        if fps > max {
            warn!("{} fps is above the sink limit, running at {}", fps, max);
        }
        Self::new(fps.min(max), scroll_speed_pps)
    }
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FPS, DEFAULT_SCROLL_SPEED_PPS)
    }
}

/// Owns the sink and the display state; the only writer of either.
pub struct RenderLoop<S: PixelSink> {
    sink: S,
    typeface: Arc<dyn Typeface>,
    slot: Arc<SwitchSlot<DisplayCommand>>,
    state: DisplayState,
    config: RenderLoopConfig,
    pacer: Pacer,
    canvas: Size,
    frames: u64,
}

impl<S> RenderLoop<S>
where
    S: PixelSink,
    S::Error: Debug,
{
    pub fn new(
        sink: S,
        typeface: Arc<dyn Typeface>,
        slot: Arc<SwitchSlot<DisplayCommand>>,
        config: RenderLoopConfig,
    ) -> Self {
        let canvas = sink.capabilities().size();
        Self {
            sink,
            typeface,
            slot,
            state: DisplayState::new(),
            pacer: Pacer::new(config.fps),
            config,
            canvas,
            frames: 0,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One frame: take any pending switch, animate, lay out, paint, present.
    ///
    /// A paint failure drops just this frame. A swap failure is returned;
    /// the display state is left as it was before the swap.
    pub fn tick(&mut self, delta_frames: u32) -> Result<(), SinkError> {
        if let Some(command) = self.slot.take() {
            self.state.apply(command, self.typeface.as_ref());
        }
        self.state.tick(delta_frames, self.canvas.width, self.config.scroll_speed);

        let plan = self.state.plan(self.typeface.as_ref(), self.canvas);
        if let Err(e) = paint(&plan, &mut self.sink, self.typeface.as_ref()) {
            warn!("frame {} dropped, paint failed: {:?}", self.frames, e);
            return Ok(());
        }
        self.sink.swap_buffers()?;
        self.frames += 1;
        Ok(())
    }

    /// Run until `shutdown` fires or the sink fails.
    ///
    /// Cancellation is checked between frames, so the frame in progress
    /// always completes. The panel is blanked on a clean exit.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SinkError> {
        let mut interval = tokio::time::interval(self.pacer.frame());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            "render loop: {}x{} @ {} fps, scroll {} sub-px/frame",
            self.canvas.width,
            self.canvas.height,
            self.config.fps,
            self.config.scroll_speed.subpixels_per_frame()
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let delta = self.pacer.frames_since_last(Instant::now());
                    if delta > 1 {
                        debug!("render loop behind, advancing {} frames", delta);
                    }
                    if let Err(e) = self.tick(delta) {
                        error!("pixel sink failed, stopping render loop: {}", e);
                        return Err(e);
                    }
                }
            }
        }

        info!("render loop stopped after {} frames", self.frames);
        self.sink.blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::display::color::Color;
    use crate::display::drivers::memory::MemoryDriver;
    use crate::display::font::BlockFont;
    use crate::display::plan::ZoneId;
    use crate::templates::{Code, StyledText, TemplateSpec, TextTemplate};

    fn show(code: &str, text: &str, scroll: bool) -> DisplayCommand {
        let text = TextTemplate { text: StyledText::new(text, Color::WHITE, 16) };
        let template = if scroll {
            TemplateSpec::ScrollText(text)
        } else {
            TemplateSpec::StaticText(text)
        };
        DisplayCommand::Show { code: Code::parse(code).unwrap(), template: Arc::new(template) }
    }

    fn rig() -> (RenderLoop<MemoryDriver>, Arc<SwitchSlot<DisplayCommand>>) {
        let slot = Arc::new(SwitchSlot::new());
        let lp = RenderLoop::new(
            MemoryDriver::new(128, 32),
            Arc::new(BlockFont),
            Arc::clone(&slot),
            RenderLoopConfig { fps: 50, scroll_speed: ScrollSpeed::from_pixels_per_frame(1) },
        );
        (lp, slot)
    }

    #[test]
    fn test_config_capped_to_sink() {
        let caps = SinkCapabilities { width: 128, height: 32, max_fps: 30, supports_brightness: false };
        let cfg = RenderLoopConfig::for_sink(60, 60, &caps);
        assert_eq!(cfg, RenderLoopConfig::new(30, 60));
        assert_eq!(cfg.scroll_speed, ScrollSpeed::from_pixels_per_frame(2));
        assert_eq!(RenderLoopConfig::for_sink(20, 40, &caps), RenderLoopConfig::new(20, 40));
    }

    #[test]
    fn test_tick_applies_pending_switch() {
        let (mut lp, slot) = rig();
        lp.tick(1).unwrap();
        assert!(lp.state().active().is_none());
        assert_eq!(lp.sink().count_lit_pixels(), 0);

        slot.post(show("01", "回送", false));
        lp.tick(1).unwrap();
        assert_eq!(lp.state().active_code(), Code::parse("01"));
        assert!(lp.sink().count_lit_pixels() > 0);
        assert_eq!(lp.frames(), 2);
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_latest_switch_wins() {
        let (mut lp, slot) = rig();
        slot.post(show("01", "a", false));
        slot.post(show("02", "b", false));
        lp.tick(1).unwrap();
        assert_eq!(lp.state().active_code(), Code::parse("02"));
    }

    #[test]
    fn test_marquee_advances_and_resets_on_switch() {
        let (mut lp, slot) = rig();
        slot.post(show("05", "試運転", true));
        lp.tick(1).unwrap();
        lp.tick(1).unwrap();
        lp.tick(3).unwrap();
        assert_eq!(lp.state().offset(ZoneId::Marquee).unwrap().pixels(), 5);

        slot.post(show("05", "試運転", true));
        lp.tick(1).unwrap();
        // reset to zero on activation, then this tick's step
        assert_eq!(lp.state().offset(ZoneId::Marquee).unwrap().pixels(), 1);
    }

    #[test]
    fn test_swap_failure_is_fatal_but_state_intact() {
        let (mut lp, slot) = rig();
        slot.post(show("03", "x", false));
        lp.tick(1).unwrap();
        lp.sink().state().lock().unwrap().simulate_swap_failure = true;

        assert!(matches!(lp.tick(1), Err(SinkError::SwapFailed(_))));
        assert_eq!(lp.state().active_code(), Code::parse("03"));
        assert_eq!(lp.frames(), 1);
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let (mut lp, slot) = rig();
        let counters = lp.sink().state();
        slot.post(show("01", "回送", false));

        let token = CancellationToken::new();
        let stopper = {
            let token = token.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                token.cancel();
            }
        };
        let (result, ()) = tokio::join!(lp.run(token), stopper);
        result.unwrap();

        let counters = counters.lock().unwrap();
        assert!(counters.swap_count >= 2, "swaps: {}", counters.swap_count);
        assert_eq!(counters.blank_count, 1);
        assert_eq!(lp.state().active_code(), Code::parse("01"));
    }

    #[tokio::test]
    async fn test_run_stops_on_sink_failure() {
        let (mut lp, _slot) = rig();
        lp.sink().state().lock().unwrap().simulate_swap_failure = true;
        let result = lp.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(SinkError::SwapFailed(_))));
    }
}
