/*
 *  input/dispatcher.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Keypad entry state machine: digits -> code -> display switch
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

use arrayvec::ArrayVec;
use log::debug;
use thiserror::Error;

use crate::constants::{BLANK_PRESS_COUNT, BLANK_PRESS_WINDOW, ENTRY_TIMEOUT};
use crate::input::Key;
use crate::templates::{Code, TemplateConfig, TemplateSpec};

/// Confirmed code has no template. Shown to the operator, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no template for code {code}")]
pub struct UnknownCodeError {
    pub code: Code,
}

/// Outcome of a key that changes what the sign should show
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Switch { code: Code, template: Arc<TemplateSpec> },
    UnknownCode(UnknownCodeError),
    /// Rapid Enter/Clear burst: turn the sign off
    Blank,
}

/// Where digit entry stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Idle,
    AwaitingSecondDigit { first: u8 },
    /// Two digits in; Enter resolves them
    Staged { code: Code },
}

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Pending digits older than this are dropped (None = never)
    pub entry_timeout: Option<Duration>,

    /// Repeats of the same Enter or Clear key that blank the sign...
    pub blank_presses: usize,

    /// ...each landing within this long of the press before it
    pub blank_window: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            entry_timeout: Some(ENTRY_TIMEOUT),
            blank_presses: BLANK_PRESS_COUNT,
            blank_window: BLANK_PRESS_WINDOW,
        }
    }
}

/// Turns keys into dispatch events. Never touches display state itself.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatcherConfig,
    buffer: ArrayVec<u8, 2>,
    last_input: Option<Instant>,
    last_key: Option<Key>,
    repeats: usize,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            buffer: ArrayVec::new(),
            last_input: None,
            last_key: None,
            repeats: 0,
        }
    }

    pub fn state(&self) -> EntryState {
        match self.buffer.as_slice() {
            [] => EntryState::Idle,
            [first] => EntryState::AwaitingSecondDigit { first: *first },
            [a, b] => Code::from_digits(*a, *b)
                .map(|code| EntryState::Staged { code })
                .unwrap_or(EntryState::Idle),
            _ => EntryState::Idle,
        }
    }

    /// Pending digits, oldest first
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Feed one key pressed at `now`, resolving against `templates` on Enter.
    pub fn handle(
        &mut self,
        key: Key,
        now: Instant,
        templates: &TemplateConfig,
    ) -> Option<DispatchEvent> {
        self.expire(now);
        self.count_repeat(key, now);
        self.last_input = Some(now);

        match key {
            Key::Digit(d) if d <= 9 => {
                if self.buffer.is_full() {
                    // overflow: keep the newest two
                    self.buffer.remove(0);
                }
                self.buffer.push(d);
                debug!("keypad digit {} -> {:?}", d, self.state());
                None
            }
            Key::Digit(_) => None,
            Key::Clear => {
                if self.burst() {
                    return Some(DispatchEvent::Blank);
                }
                debug!("keypad clear");
                self.buffer.clear();
                None
            }
            Key::Enter => {
                if self.burst() {
                    return Some(DispatchEvent::Blank);
                }
                let code = match self.buffer.as_slice() {
                    [] => return None,
                    // single digit confirms as 0d
                    [d] => Code::from_digits(0, *d),
                    [a, b] => Code::from_digits(*a, *b),
                    _ => None,
                };
                self.buffer.clear();
                let code = code?;
                Some(match templates.get(code) {
                    Some(template) => DispatchEvent::Switch { code, template: Arc::clone(template) },
                    None => DispatchEvent::UnknownCode(UnknownCodeError { code }),
                })
            }
        }
    }

    /// Drop digits that have sat too long
    fn expire(&mut self, now: Instant) {
        let (Some(timeout), Some(last)) = (self.config.entry_timeout, self.last_input) else {
            return;
        };
        if !self.buffer.is_empty() && now.saturating_duration_since(last) >= timeout {
            debug!("keypad entry timed out, discarding {:?}", self.buffer.as_slice());
            self.buffer.clear();
        }
    }

    /// Count back-to-back presses of the same key; a different key or a
    /// slow press starts a new run.
    fn count_repeat(&mut self, key: Key, now: Instant) {
        let quick = self
            .last_input
            .is_some_and(|last| now.saturating_duration_since(last) < self.config.blank_window);
        self.repeats = if quick && self.last_key == Some(key) { self.repeats + 1 } else { 1 };
        self.last_key = Some(key);
    }

    /// True once an Enter/Clear run is long enough to blank the sign.
    fn burst(&mut self) -> bool {
        if self.config.blank_presses > 0 && self.repeats >= self.config.blank_presses {
            self.repeats = 0;
            self.buffer.clear();
            return true;
        }
        false
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}
