/*
 *  input/mod.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Keypad input: key sources, code entry and the listener task
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

pub mod console;
pub mod dispatcher;
pub mod evdev;
pub mod listener;
pub mod source;

pub use dispatcher::{DispatchEvent, Dispatcher, DispatcherConfig, EntryState, UnknownCodeError};
pub use listener::KeypadListener;
pub use source::KeySource;

/// A key the sign reacts to. Everything else on the keyboard is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// 0-9
    Digit(u8),
    /// Confirm the entered code
    Enter,
    /// Discard entered digits
    Clear,
}
