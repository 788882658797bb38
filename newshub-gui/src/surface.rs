use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Mutex, OnceLock, PoisonError};

use eframe::egui::{self, Color32, Rounding, Stroke};
use newshub_core::{Navigator, Theme, ThemeSurface, TransitionSurface};
use tracing::warn;
use url::Url;

pub fn from_system(theme: eframe::Theme) -> Theme {
    match theme {
        eframe::Theme::Dark => Theme::Dark,
        eframe::Theme::Light => Theme::Light,
    }
}

/// Etat visuel piloté par les contrôleurs; l'app le projette à chaque frame.
#[derive(Default)]
pub struct GuiSurface {
    ctx: OnceLock<egui::Context>,
    theme: Mutex<Theme>,
    icon: Mutex<&'static str>,
    fading: AtomicBool,
}

impl GuiSurface {
    pub fn attach(&self, ctx: &egui::Context) {
        let _ = self.ctx.set(ctx.clone());
        apply_visuals(ctx, self.theme());
    }

    pub fn theme(&self) -> Theme {
        *self.theme.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn icon(&self) -> &'static str {
        let icon = *self.icon.lock().unwrap_or_else(PoisonError::into_inner);
        if icon.is_empty() {
            self.theme().icon()
        } else {
            icon
        }
    }

    pub fn is_fading(&self) -> bool {
        self.fading.load(Ordering::SeqCst)
    }

    fn repaint(&self) {
        if let Some(ctx) = self.ctx.get() {
            ctx.request_repaint();
        }
    }
}

impl ThemeSurface for GuiSurface {
    fn apply_document_theme(&self, theme: Theme) {
        *self.theme.lock().unwrap_or_else(PoisonError::into_inner) = theme;
        if let Some(ctx) = self.ctx.get() {
            apply_visuals(ctx, theme);
        }
    }

    fn update_indicators(&self, theme: Theme) {
        *self.icon.lock().unwrap_or_else(PoisonError::into_inner) = theme.icon();
        self.repaint();
    }
}

impl TransitionSurface for GuiSurface {
    fn fade_out(&self) {
        self.fading.store(true, Ordering::SeqCst);
        self.repaint();
    }

    fn clear(&self) {
        self.fading.store(false, Ordering::SeqCst);
        self.repaint();
    }
}

/// Hands navigation requests back to the UI thread.
pub struct ChannelNavigator {
    tx: Mutex<mpsc::Sender<Url>>,
    ctx: egui::Context,
}

impl ChannelNavigator {
    pub fn new(tx: mpsc::Sender<Url>, ctx: egui::Context) -> Self {
        Self {
            tx: Mutex::new(tx),
            ctx,
        }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, url: &Url) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.send(url.clone()).is_err() {
            warn!(%url, "navigation receiver dropped");
        }
        self.ctx.request_repaint();
    }
}

fn apply_visuals(ctx: &egui::Context, theme: Theme) {
    let mut style = (*ctx.style()).clone();
    style.visuals = match theme {
        Theme::Dark => dark_visuals(),
        Theme::Light => egui::Visuals::light(),
    };

    // Bordures arrondies subtiles
    style.visuals.widgets.noninteractive.rounding = Rounding::same(3.0);
    style.visuals.widgets.inactive.rounding = Rounding::same(3.0);
    style.visuals.widgets.hovered.rounding = Rounding::same(3.0);
    style.visuals.widgets.active.rounding = Rounding::same(3.0);

    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.spacing.interact_size = egui::vec2(36.0, 28.0);

    ctx.set_style(style);
}

fn dark_visuals() -> egui::Visuals {
    let bg_color = Color32::from_rgb(30, 30, 30);
    let panel_color = Color32::from_rgb(37, 37, 38);
    let border_color = Color32::from_rgb(62, 62, 66);
    let text_color = Color32::from_rgb(204, 204, 204);
    let accent_color = Color32::from_rgb(37, 99, 235);

    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = panel_color;
    visuals.window_fill = bg_color;
    visuals.extreme_bg_color = Color32::from_rgb(25, 25, 25);
    visuals.faint_bg_color = Color32::from_rgb(45, 45, 45);
    visuals.override_text_color = Some(text_color);

    visuals.widgets.noninteractive.bg_fill = panel_color;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, border_color);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(50, 50, 50);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, border_color);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, accent_color);
    visuals.widgets.active.bg_fill = accent_color;
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);

    visuals.selection.bg_fill = Color32::from_rgba_unmultiplied(37, 99, 235, 60);
    visuals.selection.stroke = Stroke::new(1.0, accent_color);
    visuals
}
