/*
 *  config.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Application settings: defaults <- YAML <- command line
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use embedded_graphics::prelude::Size;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::constants::{
    DEFAULT_FPS, DEFAULT_SCROLL_SPEED_PPS, ENTRY_TIMEOUT, PANEL_BRIGHTNESS, PANEL_CHAIN,
    PANEL_COLS, PANEL_ROWS,
};

/// Error type for settings loading/validation.
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level settings. Every field is optional so files and flags layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    pub log_level: Option<String>,
    /// template file (JSON)
    pub templates: Option<PathBuf>,
    /// TrueType/OpenType face
    pub font: Option<PathBuf>,
    /// in-memory sink and console keypad
    pub headless: Option<bool>,
    pub render: Option<RenderConfig>,
    pub input: Option<InputConfig>,
    pub matrix: Option<MatrixConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RenderConfig {
    pub fps: Option<u32>,
    pub scroll_speed_pps: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InputConfig {
    /// /dev/input/eventN; auto-detected when absent
    pub device: Option<PathBuf>,
    pub grab: Option<bool>,
    /// 0 disables the timeout
    pub entry_timeout_secs: Option<u64>,
    pub reload_on_confirm: Option<bool>,
}

/// rpi-rgb-led-matrix panel wiring
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MatrixConfig {
    pub rows: Option<u32>,
    pub cols: Option<u32>,
    pub chain_length: Option<u32>,
    pub parallel: Option<u32>,
    pub brightness: Option<u8>,
    pub hardware_mapping: Option<String>,
    pub gpio_slowdown: Option<u32>,
    pub led_rgb_sequence: Option<String>,
    pub multiplexing: Option<u32>,
    pub row_address_type: Option<u32>,
    pub panel_type: Option<String>,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn templates(&self) -> &Path {
        self.templates.as_deref().unwrap_or(Path::new("config.json"))
    }

    pub fn font(&self) -> &Path {
        self.font.as_deref().unwrap_or(Path::new("fonts/ipag.ttf"))
    }

    pub fn headless(&self) -> bool {
        self.headless.unwrap_or(false)
    }

    pub fn fps(&self) -> u32 {
        self.render.as_ref().and_then(|r| r.fps).unwrap_or(DEFAULT_FPS)
    }

    pub fn scroll_speed_pps(&self) -> u32 {
        self.render
            .as_ref()
            .and_then(|r| r.scroll_speed_pps)
            .unwrap_or(DEFAULT_SCROLL_SPEED_PPS)
    }

    pub fn input_device(&self) -> Option<&Path> {
        self.input.as_ref().and_then(|i| i.device.as_deref())
    }

    pub fn grab_input(&self) -> bool {
        self.input.as_ref().and_then(|i| i.grab).unwrap_or(true)
    }

    pub fn entry_timeout(&self) -> Option<Duration> {
        match self.input.as_ref().and_then(|i| i.entry_timeout_secs) {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(ENTRY_TIMEOUT),
        }
    }

    pub fn reload_on_confirm(&self) -> bool {
        self.input.as_ref().and_then(|i| i.reload_on_confirm).unwrap_or(false)
    }

    /// Panel settings with defaults filled in
    pub fn matrix(&self) -> MatrixConfig {
        self.matrix.clone().unwrap_or_default()
    }

    /// Full drawable area of the chained/parallel panels
    pub fn canvas_size(&self) -> Size {
        let m = self.matrix();
        Size::new(m.cols() * m.chain_length(), m.rows() * m.parallel())
    }
}

impl MatrixConfig {
    pub fn rows(&self) -> u32 {
        self.rows.unwrap_or(PANEL_ROWS)
    }

    pub fn cols(&self) -> u32 {
        self.cols.unwrap_or(PANEL_COLS)
    }

    pub fn chain_length(&self) -> u32 {
        self.chain_length.unwrap_or(PANEL_CHAIN)
    }

    pub fn parallel(&self) -> u32 {
        self.parallel.unwrap_or(1)
    }

    pub fn brightness(&self) -> u8 {
        self.brightness.unwrap_or(PANEL_BRIGHTNESS)
    }

    pub fn hardware_mapping(&self) -> &str {
        self.hardware_mapping.as_deref().unwrap_or("adafruit-hat")
    }

    pub fn gpio_slowdown(&self) -> u32 {
        self.gpio_slowdown.unwrap_or(4)
    }

    pub fn led_rgb_sequence(&self) -> &str {
        self.led_rgb_sequence.as_deref().unwrap_or("RGB")
    }

    pub fn multiplexing(&self) -> u32 {
        self.multiplexing.unwrap_or(0)
    }

    pub fn row_address_type(&self) -> u32 {
        self.row_address_type.unwrap_or(0)
    }

    pub fn panel_type(&self) -> &str {
        self.panel_type.as_deref().unwrap_or("")
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "p4mgr", version, about = "LED destination sign manager")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Template file (JSON)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub templates: Option<PathBuf>,
    /// TrueType/OpenType font
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub font: Option<PathBuf>,
    #[arg(long)]
    pub fps: Option<u32>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Debug logging
    #[arg(short = 'v', long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Render into memory and read codes from stdin
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,
    /// Write the last frame as PPM on exit (headless)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,
    /// Validate the template file and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub check: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Read YAML (explicit path or search), merge, apply `cli`, validate.
pub fn load(cli: &Cli) -> Result<AppConfig, AppConfigError> {
    // 1) defaults (accessors)
    let mut cfg = AppConfig::default();

    // 2) YAML file
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(AppConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of the effective settings
pub fn dump(cfg: &AppConfig) -> Result<String, AppConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/p4mgr/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/p4mgr.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["p4mgr.yaml", "config/p4mgr.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<AppConfig, AppConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<AppConfig, AppConfigError> {
    let cfg: AppConfig = serde_yaml::from_str(s)?;
    Ok(cfg)
}

macro_rules! take_some {
    ($dst:expr, $src:expr, $($field:ident),+) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field; } )+
    };
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut AppConfig, src: AppConfig) {
    take_some!(dst, src, log_level, templates, font, headless);
    match (&mut dst.render, src.render) {
        (None, Some(s)) => dst.render = Some(s),
        (Some(d), Some(s)) => { take_some!(d, s, fps, scroll_speed_pps); }
        _ => {}
    }
    match (&mut dst.input, src.input) {
        (None, Some(s)) => dst.input = Some(s),
        (Some(d), Some(s)) => {
            take_some!(d, s, device, grab, entry_timeout_secs, reload_on_confirm);
        }
        _ => {}
    }
    match (&mut dst.matrix, src.matrix) {
        (None, Some(s)) => dst.matrix = Some(s),
        (Some(d), Some(s)) => {
            take_some!(
                d, s, rows, cols, chain_length, parallel, brightness, hardware_mapping,
                gpio_slowdown, led_rgb_sequence, multiplexing, row_address_type, panel_type
            );
        }
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, cli: &Cli) {
    if cli.log_level.is_some()  { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                { cfg.log_level = Some("debug".into()); }
    if cli.templates.is_some()  { cfg.templates = cli.templates.clone(); }
    if cli.font.is_some()       { cfg.font = cli.font.clone(); }
    if cli.headless             { cfg.headless = Some(true); }
    if cli.fps.is_some() {
        cfg.render.get_or_insert_with(RenderConfig::default).fps = cli.fps;
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(
    name: &str,
    value: T,
    range: std::ops::RangeInclusive<T>,
) -> Result<(), AppConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(AppConfigError::Validation(format!(
            "{name} must be {}..={}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

/// Ranges the panel and timing code rely on
fn validate(cfg: &AppConfig) -> Result<(), AppConfigError> {
    check_range("render.fps", cfg.fps(), 1..=120)?;
    if cfg.scroll_speed_pps() == 0 {
        return Err(AppConfigError::Validation("render.scroll_speed_pps must be > 0".into()));
    }
    let m = cfg.matrix();
    check_range("matrix.rows", m.rows(), 8..=64)?;
    check_range("matrix.cols", m.cols(), 8..=128)?;
    check_range("matrix.chain_length", m.chain_length(), 1..=8)?;
    check_range("matrix.parallel", m.parallel(), 1..=3)?;
    check_range("matrix.brightness", m.brightness(), 1..=100)?;
    Ok(())
}
