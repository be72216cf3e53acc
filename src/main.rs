use eframe::egui;
use egui::ViewportBuilder;
use image::ImageReader;
use std::sync::mpsc;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod animator;
mod app;
mod config;
mod document;
mod error;
mod frames;
mod gateway;
mod markup;
mod models;
mod scroll;
mod session;
mod templates;
mod theme;

use crate::app::ReaderApp;
use crate::config::ReaderConfig;
use crate::gateway::HttpGateway;
use crate::session::Session;

fn load_icon(path: &str) -> anyhow::Result<egui::IconData> {
    let img = ImageReader::open(path)?.decode()?;
    let rgba_image = img.into_rgba8();
    let (width, height) = rgba_image.dimensions();

    Ok(egui::IconData {
        rgba: rgba_image.into_raw(),
        width,
        height,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ReaderConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring config, using defaults");
            ReaderConfig::default()
        }
    };

    let mut options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([360.0, 480.0])
            .with_title("HN Stream Reader"),
        ..Default::default()
    };

    match load_icon("logo/logo.png") {
        Ok(icon) => options.viewport.icon = Some(Arc::new(icon)),
        Err(e) => tracing::debug!(error = %e, "no window icon"),
    }

    eframe::run_native(
        "HN Stream Reader",
        options,
        Box::new(move |cc| {
            let (tx, rx) = mpsc::channel();
            let mut gateway = HttpGateway::new(&config, tx)?;

            let ctx = cc.egui_ctx.clone();
            gateway.set_waker(Arc::new(move || ctx.request_repaint()));

            let dark_mode = config.dark_mode;
            let session = Session::new(config, gateway, rx)?;
            Ok(Box::new(ReaderApp::new(session, dark_mode)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
