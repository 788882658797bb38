use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

pub const DEFAULT_BREAKPOINT: f32 = 768.0;

/// What the visual layer shows. Panel and overlay are always in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarView {
    pub panel_visible: bool,
    pub overlay_visible: bool,
}

/// Slide-out sidebar (and mobile menu) state.
#[derive(Debug)]
pub struct SidebarController {
    open: AtomicBool,
    breakpoint: f32,
}

impl Default for SidebarController {
    fn default() -> Self {
        Self::new(DEFAULT_BREAKPOINT)
    }
}

impl SidebarController {
    pub fn new(breakpoint: f32) -> Self {
        Self {
            open: AtomicBool::new(false),
            breakpoint,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn breakpoint(&self) -> f32 {
        self.breakpoint
    }

    /// Returns the new open state.
    pub fn toggle(&self) -> bool {
        !self.open.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// A sidebar link was followed. Narrow viewports close the sidebar.
    /// Returns `true` when this click closed it.
    pub fn link_clicked(&self, viewport_width: f32) -> bool {
        if viewport_width >= self.breakpoint {
            return false;
        }
        let was_open = self.open.swap(false, Ordering::SeqCst);
        if was_open {
            debug!(viewport_width, "sidebar closed after link click");
        }
        was_open
    }

    pub fn view(&self) -> SidebarView {
        let open = self.is_open();
        SidebarView {
            panel_visible: open,
            overlay_visible: open,
        }
    }
}
