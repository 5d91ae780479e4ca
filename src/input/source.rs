/*
 *  input/source.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Where key presses come from
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

use std::collections::VecDeque;
use std::io;

use tokio::sync::mpsc;

use crate::input::Key;
use crate::input::evdev::EvdevKeypad;

pub enum KeySource {
    Evdev(EvdevKeypad),
    /// Lines typed on stdin, see `console::stdin_keys`
    Console(mpsc::Receiver<Key>),
    /// Fixed key list for tests
    Scripted(VecDeque<Key>),
}

impl KeySource {
    pub fn scripted(keys: impl IntoIterator<Item = Key>) -> Self {
        Self::Scripted(keys.into_iter().collect())
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Evdev(pad) => format!("evdev {}", pad.path().display()),
            Self::Console(_) => "console".to_string(),
            Self::Scripted(keys) => format!("scripted ({} keys)", keys.len()),
        }
    }

    /// Next key, None when the source is exhausted.
    pub async fn next_key(&mut self) -> io::Result<Option<Key>> {
        match self {
            Self::Evdev(pad) => pad.next_key().await,
            Self::Console(rx) => Ok(rx.recv().await),
            Self::Scripted(keys) => Ok(keys.pop_front()),
        }
    }
}
