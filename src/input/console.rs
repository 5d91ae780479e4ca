/*
 *  input/console.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Line-oriented keypad stand-in for headless runs
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

use std::io::BufRead;
use std::thread;

use log::debug;
use tokio::sync::mpsc;

use crate::input::Key;

/// Keys typed on a line: digits, `c` for clear, and the newline is Enter.
pub fn parse_line(line: &str) -> Vec<Key> {
    let mut keys: Vec<Key> = line
        .trim()
        .chars()
        .filter_map(|ch| match ch {
            '0'..='9' => ch.to_digit(10).map(|d| Key::Digit(d as u8)),
            'c' | 'C' => Some(Key::Clear),
            _ => None,
        })
        .collect();
    keys.push(Key::Enter);
    keys
}

/// Forward keys from `reader` until it ends or the receiver is dropped.
pub fn pump(reader: impl BufRead, tx: &mpsc::Sender<Key>) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        for key in parse_line(&line) {
            if tx.blocking_send(key).is_err() {
                return;
            }
        }
    }
    debug!("console input closed");
}

/// Read codes from stdin, e.g. `01<return>`.
///
/// Stdin reads block, so they run on a plain thread that the runtime
/// never waits for at shutdown.
pub fn stdin_keys() -> mpsc::Receiver<Key> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || pump(std::io::stdin().lock(), &tx));
    rx
}
