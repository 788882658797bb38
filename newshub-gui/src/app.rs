use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use eframe::egui::{self, Color32};
use newshub_core::text::{count_words, format_date, truncate_text};
use newshub_core::{
    AppContext, Article, ClickOutcome, FiltersPatch, Link, LinkKind, SortBy, StateKey, StatePatch,
    TransitionState,
};
use tokio::runtime::Runtime;
use tracing::{debug, info};
use url::Url;

use crate::surface::{from_system, GuiSurface};

pub struct AppInit {
    pub runtime: Arc<Runtime>,
    pub context: Arc<AppContext>,
    pub surface: Arc<GuiSurface>,
    pub navigations: mpsc::Receiver<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Home,
    Category(i64),
    Bookmarks,
    Article(i64),
    NotFound(String),
}

impl Route {
    fn from_url(url: &Url) -> Self {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        match segments.as_slice() {
            [] => Route::Home,
            ["bookmarks"] => Route::Bookmarks,
            ["category", id] => id.parse().map_or_else(|_| Route::NotFound(url.path().to_string()), Route::Category),
            ["article", id] => id.parse().map_or_else(|_| Route::NotFound(url.path().to_string()), Route::Article),
            _ => Route::NotFound(url.path().to_string()),
        }
    }
}

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Recherche envoyée au store seulement après une pause de frappe.
#[derive(Debug)]
struct Debounce {
    delay: Duration,
    pending_since: Option<Instant>,
}

impl Debounce {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending_since: None,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    /// True once the input has been quiet for `delay`; clears the pending edit.
    fn fire(&mut self, now: Instant) -> bool {
        match self.pending_since {
            Some(since) if now.saturating_duration_since(since) >= self.delay => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending_since
            .map(|since| self.delay.saturating_sub(now.saturating_duration_since(since)))
    }
}

/// Lien cliqué pendant le rendu, appliqué après la frame.
struct PendingLink {
    link: Link,
    from_sidebar: bool,
}

pub struct NewsApp {
    runtime: Arc<Runtime>,
    context: Arc<AppContext>,
    surface: Arc<GuiSurface>,
    navigations: mpsc::Receiver<Url>,
    route: Route,
    search: String,
    search_debounce: Debounce,
    pending: Option<PendingLink>,
    last_system_theme: Option<eframe::Theme>,
}

impl NewsApp {
    pub fn new(init: AppInit, egui_ctx: &egui::Context) -> Self {
        let store = &init.context.store;
        for key in [StateKey::Articles, StateKey::Categories, StateKey::Bookmarks] {
            let ctx = egui_ctx.clone();
            store.subscribe(key, move |_| ctx.request_repaint());
        }

        // Chargement initial: favoris d'abord, puis articles et catégories
        let context = Arc::clone(&init.context);
        init.runtime.spawn(async move {
            context.init().await;
        });

        Self {
            runtime: init.runtime,
            search: init.context.store.filters().search_term,
            context: init.context,
            surface: init.surface,
            navigations: init.navigations,
            route: Route::Home,
            search_debounce: Debounce::new(SEARCH_DEBOUNCE),
            pending: None,
            last_system_theme: None,
        }
    }

    fn follow(&mut self, link: Link) {
        self.pending = Some(PendingLink {
            link,
            from_sidebar: false,
        });
    }

    fn follow_from_sidebar(&mut self, link: Link) {
        self.pending = Some(PendingLink {
            link,
            from_sidebar: true,
        });
    }

    fn apply_pending_link(&mut self, viewport_width: f32) {
        let Some(PendingLink { link, from_sidebar }) = self.pending.take() else {
            return;
        };
        if from_sidebar {
            self.context.sidebar.link_clicked(viewport_width);
        }
        match self.context.transition.link_clicked(&link) {
            ClickOutcome::Started(url) => debug!(%url, "page transition started"),
            ClickOutcome::Busy => {}
            ClickOutcome::Ignored(LinkKind::External | LinkKind::NewTab) => {
                let current = self.context.transition.current_url();
                match current.join(&link.href) {
                    Ok(url) => {
                        if let Err(e) = webbrowser::open(url.as_str()) {
                            self.context.report_error(&e);
                        }
                    }
                    Err(e) => self.context.report_error(&e),
                }
            }
            ClickOutcome::Ignored(kind) => debug!(?kind, href = %link.href, "link left alone"),
        }
    }

    fn drain_navigations(&mut self) {
        while let Ok(url) = self.navigations.try_recv() {
            let route = Route::from_url(&url);
            info!(%url, ?route, "page loaded");
            let selected_category = match route {
                Route::Category(id) => Some(Some(id)),
                Route::Home => Some(None),
                _ => None,
            };
            if selected_category.is_some() {
                let patch = StatePatch::Filters(FiltersPatch {
                    selected_category,
                    ..Default::default()
                });
                if let Err(e) = self.context.store.update(patch) {
                    self.context.report_error(&e);
                }
            }
            self.route = route;
            self.context.transition.page_loaded(url);
        }
    }

    fn track_system_theme(&mut self, frame: &eframe::Frame) {
        let system = frame.info().system_theme;
        if system != self.last_system_theme {
            if let (Some(theme), Some(_)) = (system, self.last_system_theme) {
                self.context.theme.system_scheme_changed(from_system(theme));
            }
            self.last_system_theme = system;
        }
    }

    fn draw_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("☰").on_hover_text("Menu").clicked() {
                    self.context.sidebar.toggle();
                }
                let home = ui.add(
                    egui::Label::new(egui::RichText::new("📰 NewsHub").strong().size(18.0))
                        .sense(egui::Sense::click()),
                );
                if home.clicked() {
                    self.follow(Link::new("/"));
                }
                ui.separator();

                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search)
                        .hint_text("Search articles…")
                        .desired_width(220.0),
                );
                if search.changed() {
                    self.search_debounce.touch(Instant::now());
                }

                let current_sort = self.context.store.filters().sort_by;
                let mut sort = current_sort;
                egui::ComboBox::from_id_source("sort_by")
                    .selected_text(sort_label(sort))
                    .show_ui(ui, |ui| {
                        for option in [SortBy::Recent, SortBy::Oldest, SortBy::Title] {
                            ui.selectable_value(&mut sort, option, sort_label(option));
                        }
                    });
                if sort != current_sort {
                    let patch = StatePatch::Filters(FiltersPatch {
                        sort_by: Some(sort),
                        ..Default::default()
                    });
                    if let Err(e) = self.context.store.update(patch) {
                        self.context.report_error(&e);
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .button(self.surface.icon())
                        .on_hover_text("Toggle theme")
                        .clicked()
                    {
                        self.context.theme.toggle();
                    }
                    if ui.small_button("⟳").on_hover_text("Reload").clicked() {
                        let context = Arc::clone(&self.context);
                        self.runtime.spawn(async move {
                            context.reload().await;
                        });
                    }
                    let count = self.context.store.bookmark_count();
                    if ui.button(format!("★ {count}")).on_hover_text("Bookmarks").clicked() {
                        self.follow(Link::new("/bookmarks"));
                    }
                });
            });
        });
    }

    fn flush_search(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        if self.search_debounce.fire(now) {
            let patch = StatePatch::Filters(FiltersPatch {
                search_term: Some(self.search.clone()),
                ..Default::default()
            });
            if let Err(e) = self.context.store.update(patch) {
                self.context.report_error(&e);
            }
        } else if let Some(wait) = self.search_debounce.remaining(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn draw_sidebar(&mut self, ctx: &egui::Context) {
        if !self.context.sidebar.view().panel_visible {
            return;
        }
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(240.0)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                if ui.selectable_label(self.route == Route::Home, "🏠 Home").clicked() {
                    self.follow_from_sidebar(Link::new("/"));
                }
                let count = self.context.store.bookmark_count();
                if ui
                    .selectable_label(self.route == Route::Bookmarks, format!("★ Bookmarks ({count})"))
                    .clicked()
                {
                    self.follow_from_sidebar(Link::new("/bookmarks"));
                }
                ui.separator();
                ui.label(egui::RichText::new("Categories").strong());
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for category in self.context.store.categories() {
                        let selected = self.route == Route::Category(category.id);
                        if ui.selectable_label(selected, &category.name).clicked() {
                            self.follow_from_sidebar(Link::new(format!("/category/{}", category.id)));
                        }
                    }
                });
            });
    }

    fn draw_overlay(&mut self, ctx: &egui::Context, content: egui::Rect) {
        if !self.context.sidebar.view().overlay_visible {
            return;
        }
        egui::Area::new(egui::Id::new("sidebar_overlay"))
            .order(egui::Order::Middle)
            .fixed_pos(content.min)
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(content.size(), egui::Sense::click());
                painter.rect_filled(response.rect, 0.0, Color32::from_black_alpha(110));
                if response.clicked() {
                    self.context.sidebar.toggle();
                }
            });
    }

    fn draw_main_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| match self.route.clone() {
            Route::Home => {
                let articles = self.context.store.filtered_articles();
                self.draw_article_list(ui, "Latest news", articles);
            }
            Route::Category(id) => {
                let title = self
                    .category_name(Some(id))
                    .unwrap_or_else(|| format!("Category {id}"));
                let articles = self.context.store.filtered_articles();
                self.draw_article_list(ui, &title, articles);
            }
            Route::Bookmarks => self.draw_bookmarks(ui),
            Route::Article(id) => self.draw_article_detail(ui, id),
            Route::NotFound(path) => {
                ui.vertical_centered(|ui| {
                    ui.add_space(50.0);
                    ui.label(egui::RichText::new(format!("Page not found: {path}")).size(16.0));
                    if ui.button("← Home").clicked() {
                        self.follow(Link::new("/"));
                    }
                });
            }
        });
    }

    fn category_name(&self, id: Option<i64>) -> Option<String> {
        let id = id?;
        self.context
            .store
            .categories()
            .into_iter()
            .find(|c| c.id == id)
            .map(|c| c.name)
    }

    fn draw_article_list(&mut self, ui: &mut egui::Ui, title: &str, articles: Vec<Article>) {
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new(title).size(18.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(format!("{} articles", articles.len())).size(13.0));
            });
        });
        ui.separator();

        if articles.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.label(egui::RichText::new("📭 No articles").size(16.0));
            });
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for article in &articles {
                    self.draw_article_card(ui, article);
                    ui.add_space(5.0);
                }
            });
    }

    fn draw_article_card(&mut self, ui: &mut egui::Ui, article: &Article) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.vertical(|ui| {
                let title = ui.add(
                    egui::Label::new(egui::RichText::new(&article.title).strong().size(17.0))
                        .wrap(true)
                        .sense(egui::Sense::click()),
                );
                if title.clicked() {
                    self.follow(Link::new(format!("/article/{}", article.id)));
                }

                self.draw_meta(ui, article);

                let preview = html2text::from_read(article.content.as_bytes(), 100);
                let preview = truncate_text(preview.trim(), 280);
                if !preview.is_empty() {
                    ui.label(egui::RichText::new(preview).weak().size(13.0));
                }

                ui.horizontal(|ui| {
                    self.draw_bookmark_button(ui, article.id);
                    if ui.small_button("📖 Read").clicked() {
                        self.follow(Link::new(format!("/article/{}", article.id)));
                    }
                    if ui.small_button("🔗 Open in browser").clicked() {
                        self.follow(Link::new(format!("/article/{}", article.id)).with_target("_blank"));
                    }
                });
            });
        });
    }

    fn draw_meta(&self, ui: &mut egui::Ui, article: &Article) {
        ui.horizontal_wrapped(|ui| {
            if let Some(name) = self.category_name(article.category_id) {
                ui.label(egui::RichText::new(format!("🏷 {name}")).weak().size(12.0));
                ui.separator();
            }
            if let Some(author) = &article.author {
                ui.label(egui::RichText::new(format!("👤 {author}")).weak().size(12.0));
                ui.separator();
            }
            if let Some(date) = &article.created_at {
                ui.label(egui::RichText::new(format!("📅 {}", format_date(date))).weak().size(12.0));
            }
        });
    }

    fn draw_bookmark_button(&mut self, ui: &mut egui::Ui, id: i64) {
        let store = &self.context.store;
        let label = if store.is_bookmarked(id) {
            "★ Bookmarked"
        } else {
            "☆ Bookmark"
        };
        if ui.small_button(label).clicked() {
            store.toggle_bookmark(id);
        }
    }

    fn draw_bookmarks(&mut self, ui: &mut egui::Ui) {
        let articles = self.context.store.bookmarked_articles();
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("★ Bookmarks").size(18.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(self.context.store.bookmark_count() > 0, egui::Button::new("🗑 Clear all"))
                    .clicked()
                {
                    self.context.store.clear_bookmarks();
                }
            });
        });
        ui.separator();

        if articles.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.label(egui::RichText::new("No bookmarks yet").size(16.0));
            });
            return;
        }
        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for article in &articles {
                    self.draw_article_card(ui, article);
                    ui.add_space(5.0);
                }
            });
    }

    fn draw_article_detail(&mut self, ui: &mut egui::Ui, id: i64) {
        ui.horizontal(|ui| {
            if ui.button("← Back").clicked() {
                self.follow(Link::new("/"));
            }
            ui.separator();
            ui.heading(egui::RichText::new("📖 Article").size(18.0));
        });
        ui.separator();

        let Some(article) = self.context.store.articles().into_iter().find(|a| a.id == id) else {
            ui.label(egui::RichText::new("Article not found").weak());
            return;
        };

        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                ui.label(egui::RichText::new(&article.title).strong().size(22.0));
                ui.add_space(6.0);
                self.draw_meta(ui, &article);
                ui.separator();

                let text = html2text::from_read(article.content.as_bytes(), 100);
                if text.trim().is_empty() {
                    ui.label(egui::RichText::new("No content available").weak().size(15.0));
                } else {
                    ui.label(egui::RichText::new(format!("{} words", count_words(&text))).weak().size(12.0));
                    ui.label(egui::RichText::new(text).size(15.0));
                }

                ui.add_space(20.0);
                ui.horizontal(|ui| {
                    self.draw_bookmark_button(ui, article.id);
                    if ui.button("Copy link").clicked() {
                        let current = self.context.transition.current_url();
                        ui.output_mut(|o| o.copied_text = current.to_string());
                    }
                });
            });
    }

    fn draw_fade(&self, ctx: &egui::Context, content: egui::Rect) {
        let amount = ctx.animate_bool_with_time(
            egui::Id::new("page_fade"),
            self.surface.is_fading(),
            self.context.config.ui.fade_out().as_secs_f32(),
        );
        if amount > 0.0 {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("page_fade_layer"),
            ));
            let fill = ctx.style().visuals.panel_fill;
            painter.rect_filled(content, 0.0, fill.gamma_multiply(amount));
        }
    }

    fn draw_toasts(&self, ctx: &egui::Context) {
        let frames = self.context.toasts.frame(Instant::now());
        if frames.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .order(egui::Order::Tooltip)
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
            .show(ctx, |ui| {
                for toast in frames {
                    let fill = self
                        .context
                        .config
                        .toast
                        .color32(toast.kind)
                        .gamma_multiply(toast.opacity);
                    let response = egui::Frame::none()
                        .fill(fill)
                        .rounding(8.0)
                        .inner_margin(egui::Margin::symmetric(24.0, 12.0))
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(&toast.message)
                                    .strong()
                                    .color(Color32::WHITE.gamma_multiply(toast.opacity)),
                            );
                        })
                        .response
                        .interact(egui::Sense::click());
                    if response.clicked() {
                        self.context.toasts.dismiss(toast.id);
                    }
                    ui.add_space(6.0);
                }
            });
    }
}

fn sort_label(sort: SortBy) -> &'static str {
    match sort {
        SortBy::Recent => "Most recent",
        SortBy::Oldest => "Oldest",
        SortBy::Title => "Title",
    }
}

impl eframe::App for NewsApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.track_system_theme(frame);
        self.drain_navigations();

        self.draw_header(ctx);
        self.flush_search(ctx);
        self.draw_sidebar(ctx);
        let content = ctx.available_rect();
        self.draw_main_content(ctx);
        self.draw_overlay(ctx, content);
        self.draw_fade(ctx, content);
        self.draw_toasts(ctx);

        self.apply_pending_link(ctx.screen_rect().width());

        if self.context.toasts.is_animating()
            || self.context.transition.state() == TransitionState::Transitioning
        {
            ctx.request_repaint_after(Duration::from_millis(16));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("http://localhost:5000/").unwrap().join(path).unwrap()
    }

    #[test]
    fn search_fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debounce::new(SEARCH_DEBOUNCE);
        assert!(!debounce.fire(start));

        debounce.touch(start);
        assert!(!debounce.fire(start + SEARCH_DEBOUNCE / 2));
        // a new keystroke restarts the wait
        debounce.touch(start + SEARCH_DEBOUNCE / 2);
        assert!(!debounce.fire(start + SEARCH_DEBOUNCE));
        assert_eq!(debounce.remaining(start + SEARCH_DEBOUNCE), Some(SEARCH_DEBOUNCE / 2));

        assert!(debounce.fire(start + SEARCH_DEBOUNCE + SEARCH_DEBOUNCE / 2));
        assert!(!debounce.fire(start + SEARCH_DEBOUNCE * 3));
        assert_eq!(debounce.remaining(start), None);
    }

    #[test]
    fn routes_follow_paths() {
        assert_eq!(Route::from_url(&url("/")), Route::Home);
        assert_eq!(Route::from_url(&url("/bookmarks")), Route::Bookmarks);
        assert_eq!(Route::from_url(&url("/category/4")), Route::Category(4));
        assert_eq!(Route::from_url(&url("/article/12/")), Route::Article(12));
        assert_eq!(
            Route::from_url(&url("/article/abc")),
            Route::NotFound("/article/abc".into())
        );
    }
}
