//! # proxyflow
//!
//! proxyflow is a Terminal User Interface (TUI) and CLI for managing HTTP proxy
//! profiles. It switches the system proxy between saved profiles and checks
//! connectivity through the active one.
//!
//! ## Modules
//! - [`app`]: Core application state and logic.
//! - [`cli`]: Command-line argument parsing and handlers.
//! - [`config`]: Config directory resolution and `config.toml` loading.
//! - [`core`]: Profile manager, background worker and message protocol.
//! - [`event`]: Event loop handling.
//! - [`logger`]: In-memory activity log.
//! - [`platform`]: System proxy backends.
//! - [`state`]: Domain and UI state types.
//! - [`ui`]: TUI rendering and widget definitions.

mod app;
mod cli;
mod config;
mod constants;
mod core;
mod event;
mod logger;
mod platform;
mod state;
mod theme;
mod ui;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use app::App;
use clap::Parser;
use cli::args::Args;
use color_eyre::Result;
use event::{Event, EventHandler};

use crate::core::applier::ProxyApplier;
use crate::core::manager::{ManagerSettings, ProfileManager};
use crate::core::prober::HttpProber;
use crate::core::store::{FileStorage, StateStore};
use crate::core::{worker, WorkerHandle};

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse arguments
    let args = Args::parse();

    let config_dir = config::resolve_config_dir(args.config_dir.as_ref())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to resolve config directory: {e}"))?;

    let app_config = match config::load_config(&config_dir) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Fix the file or remove it to use defaults:");
            eprintln!("  nano {}/{}", config_dir.display(), constants::CONFIG_FILE_NAME);
            eprintln!("  rm {}/{}", config_dir.display(), constants::CONFIG_FILE_NAME);
            std::process::exit(1);
        }
    };

    if let Err(e) = logger::init(
        Some(&config_dir),
        &app_config.log_level,
        app_config.max_log_entries,
    ) {
        eprintln!("Warning: logger unavailable: {e}");
    }
    log::info!(
        "[app] {} v{} starting (config: {})",
        constants::APP_NAME,
        constants::APP_VERSION,
        config_dir.display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let _guard = runtime.enter();

    // Assemble the worker
    let store = StateStore::new(Arc::new(FileStorage::in_dir(&config_dir)));
    let applier = ProxyApplier::new(platform::select(&app_config, &config_dir));
    log::info!("[proxy] Using backend: {}", applier.backend_name());
    let prober = Arc::new(HttpProber::new(app_config.probe_url.clone()));
    let (reports_tx, reports_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut manager = ProfileManager::new(
        store,
        applier,
        prober,
        ManagerSettings::from(&app_config),
        reports_tx,
    );

    // Only sessions that stay up re-apply the saved proxy on startup
    let long_running = args
        .command
        .as_ref()
        .map_or(true, cli::args::Commands::is_long_running);
    if long_running {
        runtime.block_on(manager.restore());
    }

    let health_interval = Duration::from_secs(app_config.health_interval_secs.max(1));
    let (handle, _worker) = worker::spawn(manager, reports_rx, health_interval);

    // Handle CLI commands
    if let Some(command) = &args.command {
        return runtime.block_on(cli::commands::handle_command(command, &handle, &app_config));
    }

    // Run the TUI application
    let terminal = ratatui::init();
    let result = run_tui(terminal, handle, &runtime, app_config.tick_rate);
    ratatui::restore();

    result
}

/// Runs the main TUI event loop.
fn run_tui(
    mut terminal: ratatui::DefaultTerminal,
    worker: WorkerHandle,
    runtime: &tokio::runtime::Runtime,
    tick_rate: u64,
) -> Result<()> {
    let mut app = App::new(worker, runtime.handle().clone());
    let events = EventHandler::new(tick_rate);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        match events.next()? {
            Event::Key(key_event) => app.handle_key(key_event),
            Event::Tick => app.on_tick(),
            Event::Resize(width, height) => app.on_resize(width, height),
        }
        app.process_external();
    }

    log::info!("[app] Shutting down");
    Ok(())
}
