//! BingWallpaper - daily desktop wallpaper
//!
//! This process manages:
//! - The wallpaper scheduler (background thread, one change per interval)
//! - The main window (iced) listing the archive's recent images
//! - System tray icon with context menu (Windows and macOS)
//! - The tray dispatcher thread that turns menu clicks into actions

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod gui;
mod instance;
mod tray_icon;

use anyhow::{Context, Result};
use bing_wallpaper_core::{
    config, feed, tray, BingFeed, Coordinator, DesktopApplier, LifecycleGate, ScheduleOptions,
    Scheduler, SystemDesktop,
};
use gui::{GuiFlags, GuiShell};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let first_run = !config::config_exists();
    let app_config = config::load_config();

    init_logging(&app_config.log_level);

    tracing::info!("BingWallpaper starting...");

    if first_run {
        if let Err(e) = config::save_config(&app_config) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    if instance::another_instance_running() {
        tracing::info!("BingWallpaper is already running, exiting");
        return Ok(());
    }

    let image_path = app_config
        .image_path()
        .context("Failed to resolve wallpaper location")?;
    tracing::info!("Wallpaper file: {}", image_path.display());

    let client = feed::http_client().context("Failed to create HTTP client")?;
    let feed = Arc::new(BingFeed::new(
        client.clone(),
        app_config.feed_base_url.clone(),
        app_config.market.clone(),
    ));
    let applier = Arc::new(DesktopApplier::new(
        client,
        image_path.clone(),
        Box::new(SystemDesktop),
    ));
    let scheduler = Arc::new(Scheduler::new(
        feed,
        applier,
        ScheduleOptions::from(&app_config),
    ));

    let (event_sender, events) = iced::futures::channel::mpsc::unbounded();
    let shell = Arc::new(GuiShell::new(event_sender.clone()));
    let coordinator = Arc::new(Coordinator::new(
        scheduler,
        Arc::new(LifecycleGate::new()),
        shell,
    ));

    coordinator
        .start()
        .context("Failed to start wallpaper scheduler")?;

    let (tray_senders, tray_receivers) = tray::tray_channels();
    let _dispatcher = tray::spawn_dispatcher(tray_receivers, Arc::clone(&coordinator))
        .context("Failed to start tray dispatcher")?;

    tracing::info!("Scheduler and tray dispatcher running, opening window");

    let result = gui::run(GuiFlags {
        coordinator: Arc::clone(&coordinator),
        events,
        event_sender,
        tray_senders,
        image_path,
    });

    coordinator.shutdown();
    tracing::info!("BingWallpaper exited");

    result.map_err(|e| anyhow::anyhow!("Window error: {}", e))
}
