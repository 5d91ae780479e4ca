/*
 *  input/listener.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Keypad task: reads keys, runs the dispatcher, posts display switches
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

use std::io;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::display::mailbox::{DisplayCommand, SwitchSlot};
use crate::input::Key;
use crate::input::dispatcher::{DispatchEvent, Dispatcher};
use crate::input::source::KeySource;
use crate::templates::TemplateStore;

pub struct KeypadListener {
    source: KeySource,
    store: Arc<TemplateStore>,
    slot: Arc<SwitchSlot<DisplayCommand>>,
    dispatcher: Dispatcher,
    reload_on_confirm: bool,
}

impl KeypadListener {
    pub fn new(
        source: KeySource,
        store: Arc<TemplateStore>,
        slot: Arc<SwitchSlot<DisplayCommand>>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self { source, store, slot, dispatcher, reload_on_confirm: false }
    }

    /// Re-read the template file before every Enter
    pub fn reload_on_confirm(mut self, enabled: bool) -> Self {
        self.reload_on_confirm = enabled;
        self
    }

    /// Read keys until the source ends or `shutdown` fires.
    pub async fn run(mut self, shutdown: CancellationToken) -> io::Result<()> {
        info!("keypad listener on {}", self.source.describe());
        loop {
            let key = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                key = self.source.next_key() => key?,
            };
            let Some(key) = key else {
                info!("keypad source closed");
                break;
            };
            self.on_key(key).await;
        }
        Ok(())
    }

    async fn on_key(&mut self, key: Key) {
        if key == Key::Enter && self.reload_on_confirm && !self.dispatcher.pending().is_empty() {
            // failure is logged by the store; the previous set stays live
            let _ = self.store.reload().await;
        }

        let templates = self.store.snapshot();
        match self.dispatcher.handle(key, Instant::now(), &templates) {
            Some(DispatchEvent::Switch { code, template }) => {
                info!("keypad: switching to {} ({})", code, template.summary());
                if let Some(old) = self.slot.post(DisplayCommand::Show { code, template }) {
                    debug!("replaced unconsumed {:?}", old);
                }
            }
            Some(DispatchEvent::UnknownCode(e)) => warn!("keypad: {}", e),
            Some(DispatchEvent::Blank) => {
                info!("keypad: blanking sign");
                self.slot.post(DisplayCommand::Blank);
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{Code, TemplateConfig, loader};

    const TEMPLATES: &str = r#"{
        "01": {"type": "textNsc", "txt": {"text": "回送"}},
        "02": {"type": "textScr", "txt": {"text": "試運転"}}
    }"#;

    fn store() -> Arc<TemplateStore> {
        let config: TemplateConfig = loader::parse(TEMPLATES).unwrap();
        Arc::new(TemplateStore::with_config("templates.json", config))
    }

    async fn run_keys(keys: Vec<Key>) -> Arc<SwitchSlot<DisplayCommand>> {
        let slot = Arc::new(SwitchSlot::new());
        let listener = KeypadListener::new(
            KeySource::scripted(keys),
            store(),
            Arc::clone(&slot),
            Dispatcher::default(),
        );
        listener.run(CancellationToken::new()).await.unwrap();
        slot
    }

    #[tokio::test]
    async fn test_code_posts_show() {
        let slot = run_keys(vec![Key::Digit(0), Key::Digit(2), Key::Enter]).await;
        match slot.take() {
            Some(DisplayCommand::Show { code, .. }) => assert_eq!(Some(code), Code::parse("02")),
            other => panic!("expected show, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_code_posts_nothing() {
        let slot = run_keys(vec![Key::Digit(9), Key::Digit(9), Key::Enter]).await;
        assert!(!slot.is_pending());
    }

    #[tokio::test]
    async fn test_enter_burst_posts_blank() {
        let slot = run_keys(vec![Key::Enter, Key::Enter, Key::Enter]).await;
        assert_eq!(slot.take(), Some(DisplayCommand::Blank));
    }

    #[tokio::test]
    async fn test_reload_on_confirm_picks_up_new_codes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"01": {"type": "textNsc", "txt": {"text": "回送"}}}"#)
            .unwrap();
        let store = Arc::new(TemplateStore::open(file.path()).unwrap());
        std::fs::write(
            file.path(),
            r#"{"07": {"type": "textNsc", "txt": {"text": "臨時"}}}"#,
        )
        .unwrap();

        let slot = Arc::new(SwitchSlot::new());
        KeypadListener::new(
            KeySource::scripted([Key::Digit(0), Key::Digit(7), Key::Enter]),
            Arc::clone(&store),
            Arc::clone(&slot),
            Dispatcher::default(),
        )
        .reload_on_confirm(true)
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert!(matches!(slot.take(), Some(DisplayCommand::Show { .. })));
        assert!(store.snapshot().get(Code::parse("07").unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_cancel_stops_listener() {
        let token = CancellationToken::new();
        token.cancel();
        let listener = KeypadListener::new(
            KeySource::scripted([Key::Digit(0), Key::Digit(1), Key::Enter]),
            store(),
            Arc::new(SwitchSlot::new()),
            Dispatcher::default(),
        );
        // cancellation wins the biased select before any key is read
        listener.run(token).await.unwrap();
    }
}
