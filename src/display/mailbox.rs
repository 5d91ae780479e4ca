/*
 *  display/mailbox.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Single-slot handoff from the keypad task to the render loop
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

use std::sync::{Arc, Mutex, MutexGuard};

use crate::templates::{Code, TemplateSpec};

/// Requested change to what the sign shows
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    Show { code: Code, template: Arc<TemplateSpec> },
    Blank,
}

/// Latest-wins mailbox holding at most one value.
///
/// The writer never waits on the reader: `post` replaces whatever is pending.
/// The render loop drains it once per tick with `take`.
#[derive(Debug)]
pub struct SwitchSlot<T> {
    pending: Mutex<Option<T>>,
}

impl<T> Default for SwitchSlot<T> {
    fn default() -> Self {
        Self { pending: Mutex::new(None) }
    }
}

impl<T> SwitchSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning the unconsumed value it displaced, if any
    pub fn post(&self, value: T) -> Option<T> {
        self.lock().replace(value)
    }

    /// Remove and return the pending value
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // a panicked writer leaves at worst a stale Option; keep going
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_latest_wins() {
        let slot = SwitchSlot::new();
        assert_eq!(slot.post(1), None);
        assert_eq!(slot.post(2), Some(1));
        assert!(slot.is_pending());
        assert_eq!(slot.take(), Some(2));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_cross_thread_handoff() {
        let slot = Arc::new(SwitchSlot::new());
        let writer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                for i in 0..100 {
                    slot.post(i);
                }
            })
        };
        writer.join().unwrap();
        assert_eq!(slot.take(), Some(99));
    }

    #[test]
    fn test_survives_poison() {
        let slot = Arc::new(SwitchSlot::new());
        slot.post(7);
        let s = Arc::clone(&slot);
        let _ = thread::spawn(move || {
            let _guard = s.pending.lock().unwrap();
            panic!("writer died");
        })
        .join();
        assert_eq!(slot.take(), Some(7));
    }
}
