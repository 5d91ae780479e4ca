/*
 *  templates/store.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Shared, hot-swappable template snapshot
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

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use crate::templates::loader::{self, ConfigError};
use crate::templates::model::TemplateConfig;

/// Owns the current `TemplateConfig` and swaps it on reload.
///
/// Readers take an `Arc` snapshot; a reload never mutates a snapshot already
/// handed out, so a frame or lookup in flight keeps the mapping it started with.
#[derive(Debug)]
pub struct TemplateStore {
    path: PathBuf,
    tx: watch::Sender<Arc<TemplateConfig>>,
}

impl TemplateStore {
    /// Load `path` once; failure is returned to the caller (startup-fatal).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = loader::load(&path)?;
        info!("loaded {} templates from {}", config.len(), path.display());
        Ok(Self::with_config(path, config))
    }

    /// Wrap an already validated mapping (tests, `--check`)
    pub fn with_config(path: impl Into<PathBuf>, config: TemplateConfig) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(config));
        Self { path: path.into(), tx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current mapping
    pub fn snapshot(&self) -> Arc<TemplateConfig> {
        self.tx.borrow().clone()
    }

    /// Change notifications for anything that caches derived state
    pub fn subscribe(&self) -> watch::Receiver<Arc<TemplateConfig>> {
        self.tx.subscribe()
    }

    /// Re-read the file and publish it. On error the previous mapping stays
    /// live and the failure is logged here, whatever its cause.
    pub async fn reload(&self) -> Result<usize, ConfigError> {
        match self.read().await {
            Ok(config) => {
                let count = config.len();
                self.tx.send_replace(Arc::new(config));
                info!("reloaded {} templates from {}", count, self.path.display());
                Ok(count)
            }
            Err(e) => {
                warn!("template reload failed, keeping previous set: {}", e);
                for entry in e.entries() {
                    warn!("  {}", entry);
                }
                Err(e)
            }
        }
    }

    async fn read(&self) -> Result<TemplateConfig, ConfigError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigError::Io { path: self.path.clone(), source })?;
        loader::parse(&text)
    }
}
