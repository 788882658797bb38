mod app;
mod surface;

use std::sync::{mpsc, Arc};

use eframe::{egui, NativeOptions};
use newshub_core::{AppConfig, AppContext, ContextParts, FileStorage, SharedStorage};
use tokio::runtime::Runtime;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::app::{AppInit, NewsApp};
use crate::surface::{ChannelNavigator, GuiSurface};

fn main() -> eframe::Result<()> {
    init_tracing();

    let runtime = Arc::new(Runtime::new().expect("failed to initialise Tokio runtime"));
    // Timers (toasts, transitions) are spawned from the UI thread.
    let _guard = runtime.enter();

    let config = AppConfig::load();
    let storage: SharedStorage = Arc::new(FileStorage::open_in(storage_dir()));
    let surface = Arc::new(GuiSurface::default());
    let (nav_tx, nav_rx) = mpsc::channel();
    let [width, height] = config.ui.window_size;

    eframe::run_native(
        "NewsHub",
        NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([width, height])
                .with_min_inner_size([360.0, 480.0]),
            follow_system_theme: true,
            ..Default::default()
        },
        Box::new(move |cc| {
            surface.attach(&cc.egui_ctx);
            let system_theme = cc.integration_info.system_theme.map(surface::from_system);
            let parts = ContextParts {
                storage,
                theme_surface: surface.clone(),
                navigator: Arc::new(ChannelNavigator::new(nav_tx, cc.egui_ctx.clone())),
                transition_surface: surface.clone(),
                system_theme,
            };
            let context = match AppContext::new(config, parts) {
                Ok(context) => Arc::new(context),
                Err(e) => {
                    error!(error = %e, "invalid backend configuration");
                    std::process::exit(1);
                }
            };
            context.install_panic_hook();

            Box::new(NewsApp::new(
                AppInit {
                    runtime,
                    context,
                    surface,
                    navigations: nav_rx,
                },
                &cc.egui_ctx,
            ))
        }),
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn storage_dir() -> std::path::PathBuf {
    // Linux: ~/.config/newshub
    AppConfig::config_dir()
        .or_else(|_| std::env::current_dir().map(|dir| dir.join(".newshub")))
        .unwrap_or_else(|_| std::path::PathBuf::from(".newshub"))
}
