/*
 *  tests/engine.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Keypad to panel, end to end, on the in-memory sink
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
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use p4mgr::display::{
    BlockFont, Color, DisplayCommand, DisplayState, DrawOp, MemoryDriver, RenderLoop,
    RenderLoopConfig, ScrollOffset, ScrollOffsets, ScrollSpeed, SwitchSlot, ZoneId, render,
};
use p4mgr::input::{DispatchEvent, Dispatcher, Key, KeySource, KeypadListener};
use p4mgr::templates::{self, Code, TemplateConfig, TemplateStore};
use tokio_util::sync::CancellationToken;

const CANVAS: Size = Size::new(128, 32);

const SIGN: &str = r##"{
    "01": {"type": "textNsc", "txt": {"text": "この車は回送です", "color": "#000", "size": 15}},
    "02": {"type": "textScr", "txt": {"text": "試運転", "color": "#00FF00"}},
    "12": {"type": "textNsc", "txt": {"text": "臨時", "color": "#FFFF00"}},
    "30": {
        "type": "dest",
        "destination": {"text": "新宿"},
        "scroll": {"text": "途中駅では各駅に停車します"}
    }
}"##;

fn sign() -> TemplateConfig {
    templates::parse(SIGN).unwrap()
}

fn code(s: &str) -> Code {
    Code::parse(s).unwrap()
}

fn rig() -> (RenderLoop<MemoryDriver>, Arc<SwitchSlot<DisplayCommand>>) {
    let slot = Arc::new(SwitchSlot::new());
    let lp = RenderLoop::new(
        MemoryDriver::new(CANVAS.width, CANVAS.height),
        Arc::new(BlockFont),
        Arc::clone(&slot),
        RenderLoopConfig { fps: 20, scroll_speed: ScrollSpeed::from_pixels_per_frame(2) },
    );
    (lp, slot)
}

/// Feed keys a second apart and post every switch, like the listener does
fn press(d: &mut Dispatcher, slot: &SwitchSlot<DisplayCommand>, cfg: &TemplateConfig, keys: &[Key]) {
    let t0 = Instant::now();
    for (i, key) in keys.iter().enumerate() {
        match d.handle(*key, t0 + Duration::from_secs(i as u64), cfg) {
            Some(DispatchEvent::Switch { code, template }) => {
                slot.post(DisplayCommand::Show { code, template });
            }
            Some(DispatchEvent::Blank) => {
                slot.post(DisplayCommand::Blank);
            }
            _ => {}
        }
    }
}

#[test]
fn test_code_entry_switches_exactly_once() {
    let cfg = sign();
    let (mut lp, slot) = rig();
    let mut d = Dispatcher::default();

    press(&mut d, &slot, &cfg, &[Key::Digit(0), Key::Digit(1), Key::Enter]);
    lp.tick(1).unwrap();
    assert_eq!(lp.state().active_code(), Some(code("01")));

    // nothing further pending: the next tick keeps the same template
    lp.tick(1).unwrap();
    assert_eq!(lp.state().active_code(), Some(code("01")));
    assert_eq!(lp.frames(), 2);
}

#[test]
fn test_overflow_uses_last_two_digits() {
    let cfg = sign();
    let (mut lp, slot) = rig();
    let mut d = Dispatcher::default();

    press(&mut d, &slot, &cfg, &[Key::Digit(0), Key::Digit(1), Key::Digit(2), Key::Enter]);
    lp.tick(1).unwrap();
    assert_eq!(lp.state().active_code(), Some(code("12")));
    assert_eq!(lp.sink().pixel(60, 16), Some(Rgb888::new(255, 255, 0)));
}

#[test]
fn test_unknown_code_leaves_display_unchanged() {
    let cfg = sign();
    let (mut lp, slot) = rig();
    let mut d = Dispatcher::default();

    press(&mut d, &slot, &cfg, &[Key::Digit(0), Key::Digit(2), Key::Enter]);
    for _ in 0..3 {
        lp.tick(1).unwrap();
    }
    let before = lp.state().clone();

    press(&mut d, &slot, &cfg, &[Key::Digit(9), Key::Digit(9), Key::Enter]);
    assert!(!slot.is_pending());
    let mut expected = before.clone();
    expected.tick(1, CANVAS.width, ScrollSpeed::from_pixels_per_frame(2));
    lp.tick(1).unwrap();
    assert_eq!(lp.state(), &expected);
}

#[test]
fn test_reselecting_restarts_marquee() {
    let cfg = sign();
    let (mut lp, slot) = rig();
    let mut d = Dispatcher::default();

    press(&mut d, &slot, &cfg, &[Key::Digit(0), Key::Digit(2), Key::Enter]);
    for _ in 0..10 {
        lp.tick(1).unwrap();
    }
    assert_eq!(lp.state().offset(ZoneId::Marquee).map(|o| o.pixels()), Some(20));

    press(&mut d, &slot, &cfg, &[Key::Digit(0), Key::Digit(2), Key::Enter]);
    lp.tick(1).unwrap();
    assert_eq!(lp.state().offset(ZoneId::Marquee).map(|o| o.pixels()), Some(2));
}

#[test]
fn test_triple_clear_blanks_panel() {
    let cfg = sign();
    let (mut lp, slot) = rig();
    let mut d = Dispatcher::default();

    press(&mut d, &slot, &cfg, &[Key::Digit(1), Key::Digit(2), Key::Enter]);
    lp.tick(1).unwrap();
    assert!(lp.sink().count_lit_pixels() > 0);

    let t0 = Instant::now() + Duration::from_secs(60);
    for i in 0..3 {
        if let Some(DispatchEvent::Blank) = d.handle(Key::Clear, t0 + Duration::from_millis(50 * i), &cfg) {
            slot.post(DisplayCommand::Blank);
        }
    }
    lp.tick(1).unwrap();
    assert!(lp.state().active().is_none());
    assert_eq!(lp.sink().count_lit_pixels(), 0);
}

#[test]
fn test_render_is_deterministic() {
    let cfg = sign();
    let template = cfg.get(code("30")).unwrap();
    let mut offsets = ScrollOffsets::new();
    offsets.insert(ZoneId::Annotation, ScrollOffset::from_pixels(37));

    let a = render(template, &offsets, &BlockFont, CANVAS);
    let b = render(template, &offsets, &BlockFont, CANVAS);
    assert_eq!(a, b);
}

#[test]
fn test_static_text_centred() {
    let cfg = sign();
    let plan = render(cfg.get(code("01")).unwrap(), &ScrollOffsets::new(), &BlockFont, CANVAS);

    assert_eq!(plan.background, Color::BLACK);
    let runs: Vec<&DrawOp> = plan.glyph_runs().collect();
    assert_eq!(runs.len(), 1);
    match runs[0] {
        DrawOp::GlyphRun { text, origin, size, color, font, clip } => {
            assert_eq!(text, "この車は回送です");
            // 8 full-width cells of 15px: (128 - 120) / 2, (32 - 15) / 2
            assert_eq!(*origin, Point::new(4, 8));
            assert_eq!(*size, 15);
            assert_eq!(*color, Color::BLACK);
            assert!(font.is_none());
            assert!(clip.is_none());
        }
        other => panic!("expected glyph run, got {other:?}"),
    }
}

#[test]
fn test_state_from_switch_matches_render() {
    let cfg = sign();
    let mut state = DisplayState::new();
    let template = Arc::clone(cfg.get(code("30")).unwrap());
    state.activate(code("30"), Arc::clone(&template), &BlockFont);
    assert_eq!(state.offset(ZoneId::Annotation), Some(ScrollOffset::ZERO));
    assert_eq!(state.plan(&BlockFont, CANVAS), render(&template, state.offsets(), &BlockFont, CANVAS));
}

#[tokio::test]
async fn test_listener_and_render_loop_together() {
    let store = Arc::new(TemplateStore::with_config("sign.json", sign()));
    let (mut lp, slot) = rig();
    let shutdown = CancellationToken::new();

    let listener = KeypadListener::new(
        KeySource::scripted([Key::Digit(0), Key::Digit(2), Key::Enter]),
        Arc::clone(&store),
        Arc::clone(&slot),
        Dispatcher::default(),
    );
    listener.run(shutdown.clone()).await.unwrap();

    let stopper = {
        let shutdown = shutdown.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            shutdown.cancel();
        }
    };
    let (result, ()) = tokio::join!(lp.run(shutdown.clone()), stopper);
    result.unwrap();

    assert_eq!(lp.state().active_code(), Some(code("02")));
    assert!(lp.state().offset(ZoneId::Marquee).unwrap().pixels() > 0);
    // blanked on the way out, the last frame kept for snapshots
    assert_eq!(lp.sink().count_lit_pixels(), 0);
    assert!(lp.sink().last_frame().as_slice().iter().any(|p| *p != Rgb888::BLACK));
}
