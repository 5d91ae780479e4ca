/*
 *  main.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
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
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use p4mgr::config::{self, AppConfig, Cli};
use p4mgr::display::{
    DisplayCommand, FontBook, FontLibrary, MemoryDriver, PixelSink, RenderLoop, RenderLoopConfig,
    SwitchSlot, Typeface,
};
use p4mgr::input::console::stdin_keys;
use p4mgr::input::evdev::{EvdevKeypad, detect_keypad};
use p4mgr::input::{Dispatcher, DispatcherConfig, KeySource, KeypadListener};
use p4mgr::templates::TemplateStore;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// SIGINT/SIGTERM cancel `shutdown`; SIGHUP reloads the templates.
async fn signal_handler(store: Arc<TemplateStore>, shutdown: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received. Initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received. Initiating graceful shutdown.");
                break;
            }
            _ = sighup.recv() => {
                info!("SIGHUP received. Reloading {}", store.path().display());
                // on failure the store keeps the previous set and logs why
                let _ = store.reload().await;
            }
            _ = shutdown.cancelled() => return Ok(()),
        }
    }
    shutdown.cancel();
    Ok(())
}

/// Default face plus the directory templates name other fonts from
fn load_typeface(cfg: &AppConfig) -> Result<Arc<dyn Typeface>> {
    let book = FontBook::open(cfg.font()).context("loading font")?;
    let dir = cfg
        .font()
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    info!("font {}, named fonts from {}", cfg.font().display(), dir.display());
    Ok(Arc::new(FontLibrary::new(dir, Arc::new(book))))
}

async fn key_source(cfg: &AppConfig) -> Result<KeySource> {
    let device = match cfg.input_device() {
        Some(path) => Some(path.to_path_buf()),
        None if cfg.headless() => None,
        None => detect_keypad(),
    };
    match device {
        Some(path) => {
            let pad = EvdevKeypad::open(&path, cfg.grab_input())
                .await
                .with_context(|| format!("opening keypad {}", path.display()))?;
            Ok(KeySource::Evdev(pad))
        }
        None if cfg.headless() => Ok(KeySource::Console(stdin_keys())),
        None => bail!("no keypad found; set input.device or run --headless"),
    }
}

/// Bring the sink up and run frames until shutdown. Hands the sink back.
async fn drive<S>(
    mut sink: S,
    cfg: &AppConfig,
    typeface: Arc<dyn Typeface>,
    slot: Arc<SwitchSlot<DisplayCommand>>,
    shutdown: CancellationToken,
) -> Result<S>
where
    S: PixelSink,
    S::Error: Debug,
{
    sink.init().context("initialising pixel sink")?;
    if sink.capabilities().supports_brightness {
        sink.set_brightness(cfg.matrix().brightness())?;
    }
    let config = RenderLoopConfig::for_sink(cfg.fps(), cfg.scroll_speed_pps(), sink.capabilities());
    let mut render = RenderLoop::new(sink, typeface, slot, config);
    render.run(shutdown).await.context("render loop")?;
    Ok(render.into_sink())
}

#[cfg(feature = "hardware")]
async fn drive_panel(
    cfg: &AppConfig,
    typeface: Arc<dyn Typeface>,
    slot: Arc<SwitchSlot<DisplayCommand>>,
    shutdown: CancellationToken,
) -> Result<()> {
    use p4mgr::display::drivers::rgbmatrix::RgbMatrixDriver;
    let sink = RgbMatrixDriver::new(&cfg.matrix()).context("opening LED matrix")?;
    drive(sink, cfg, typeface, slot, shutdown).await?;
    Ok(())
}

#[cfg(not(feature = "hardware"))]
async fn drive_panel(
    _cfg: &AppConfig,
    _typeface: Arc<dyn Typeface>,
    _slot: Arc<SwitchSlot<DisplayCommand>>,
    _shutdown: CancellationToken,
) -> Result<()> {
    bail!("built without the `hardware` feature; use --headless")
}

async fn drive_memory(
    cfg: &AppConfig,
    snapshot: Option<&Path>,
    typeface: Arc<dyn Typeface>,
    slot: Arc<SwitchSlot<DisplayCommand>>,
    shutdown: CancellationToken,
) -> Result<()> {
    let size = cfg.canvas_size();
    let sink = MemoryDriver::new(size.width, size.height);
    let sink = drive(sink, cfg, typeface, slot, shutdown).await?;
    if let Some(path) = snapshot {
        sink.save_ppm(path).with_context(|| format!("writing {}", path.display()))?;
        info!("last frame written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading settings")?;
    if cli.dump_config {
        println!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} destination sign manager", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let store = match TemplateStore::open(cfg.templates()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("{}: {}", cfg.templates().display(), e);
            for entry in e.entries() {
                error!("  {}", entry);
            }
            return Err(e).context("loading templates");
        }
    };
    if cli.check {
        for (code, template) in store.snapshot().iter() {
            info!("  {} {:<8} {}", code, template.kind(), template.summary());
        }
        info!("{}: {} templates OK", cfg.templates().display(), store.snapshot().len());
        return Ok(());
    }

    let typeface = load_typeface(&cfg)?;
    let slot = Arc::new(SwitchSlot::new());
    let shutdown = CancellationToken::new();

    tokio::spawn({
        let store = Arc::clone(&store);
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = signal_handler(store, shutdown.clone()).await {
                error!("signal handler failed: {}", e);
                shutdown.cancel();
            }
        }
    });

    let dispatcher = Dispatcher::new(DispatcherConfig {
        entry_timeout: cfg.entry_timeout(),
        ..Default::default()
    });
    let source = key_source(&cfg).await?;
    let listener = KeypadListener::new(source, Arc::clone(&store), Arc::clone(&slot), dispatcher)
        .reload_on_confirm(cfg.reload_on_confirm());
    let input = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = listener.run(shutdown).await {
                error!("keypad listener stopped: {}", e);
            }
        }
    });

    let result = if cfg.headless() {
        drive_memory(&cfg, cli.snapshot.as_deref(), typeface, slot, shutdown.clone()).await
    } else {
        drive_panel(&cfg, typeface, slot, shutdown.clone()).await
    };

    shutdown.cancel();
    let _ = input.await;
    info!("{} stopped", env!("CARGO_PKG_NAME"));
    result
}
