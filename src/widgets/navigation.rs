//! Navigation bar: URL bar, history buttons and the focus/resize modes.
//!
//! The bar hangs under the browser and follows its world width. It listens to
//! the current session (location, progress, fullscreen) and keeps only UI
//! state; mode transitions that touch the registry, the world fade or the
//! back-handler stack are driven by the orchestrator, which owns those.

use std::cell::RefCell;

use euclid::default::Size2D;
use tracing::debug;
use url::Url;

use crate::config::NavigationBarConfig;
use crate::placement::{Placement, WidgetHandle, scaled_width};
use crate::registry::{PlacementChange, Placements, WidgetSurface, WidgetUpdateListener};
use crate::session::{
    ContentListener, NavigationListener, ProgressListener, Session, SessionChangeListener, SessionId,
};
use crate::urlbar::{Indicators, UrlBar};
use crate::widgets::panel::Panel;

#[derive(Debug)]
struct NavigationState {
    /// Session the indicators were last synced from.
    session: Option<SessionId>,
    urlbar: UrlBar,
    can_go_back: bool,
    can_go_forward: bool,
    focus_mode: bool,
    resizing: bool,
    /// Focus mode was entered because the page went fullscreen.
    focus_due_to_fullscreen: bool,
    /// Last fullscreen change reported by the page, not yet acted upon.
    pending_fullscreen: Option<bool>,
}

pub struct NavigationBar {
    handle: WidgetHandle,
    browser: WidgetHandle,
    baseline_width: u32,
    browser_baseline_world_width: f32,
    surface: Panel,
    state: RefCell<NavigationState>,
}

impl NavigationBar {
    pub fn new(
        handle: WidgetHandle,
        browser: WidgetHandle,
        config: &NavigationBarConfig,
        browser_baseline_world_width: f32,
        search_engine_url: &str,
    ) -> Self {
        Self {
            handle,
            browser,
            baseline_width: config.width,
            browser_baseline_world_width,
            surface: Panel::new(handle),
            state: RefCell::new(NavigationState {
                session: None,
                urlbar: UrlBar::new(search_engine_url),
                can_go_back: false,
                can_go_forward: false,
                focus_mode: false,
                resizing: false,
                focus_due_to_fullscreen: false,
                pending_fullscreen: None,
            }),
        }
    }

    pub fn handle(&self) -> WidgetHandle {
        self.handle
    }

    /// Initial placement: centered under the browser, as wide as it in world units.
    pub fn initial_placement(&self, config: &NavigationBarConfig) -> Placement {
        let mut placement = Placement {
            width: config.width,
            height: config.height,
            world_width: self.browser_baseline_world_width,
            parent_handle: Some(self.browser),
            opaque: false,
            ..Placement::default()
        };
        placement.anchor.y = 1.0;
        placement.parent_anchor.y = 0.0;
        placement.translation.y = config.translation_y;
        placement
    }

    pub fn surface_size(&self) -> Size2D<u32> {
        self.surface.size()
    }

    pub fn is_visible(&self) -> bool {
        self.surface.is_visible()
    }

    // ── Indicators ─────────────────────────────────────────────────────

    pub fn url_text(&self) -> String {
        self.state.borrow().urlbar.text().to_owned()
    }

    pub fn can_go_back(&self) -> bool {
        self.state.borrow().can_go_back
    }

    pub fn can_go_forward(&self) -> bool {
        self.state.borrow().can_go_forward
    }

    /// While loading, the reload button acts as stop.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().urlbar.indicators().loading
    }

    pub fn is_insecure(&self) -> bool {
        self.state.borrow().urlbar.indicators().insecure
    }

    pub fn set_private_mode(&self, private: bool) {
        self.state.borrow_mut().urlbar.indicators_mut().private = private;
    }

    pub fn is_private_mode(&self) -> bool {
        self.state.borrow().urlbar.indicators().private
    }

    // ── URL entry ──────────────────────────────────────────────────────

    pub fn focus_url_bar(&self) {
        self.state.borrow_mut().urlbar.begin_edit();
    }

    pub fn unfocus_url_bar(&self) {
        self.state.borrow_mut().urlbar.end_edit();
    }

    pub fn is_url_bar_focused(&self) -> bool {
        self.state.borrow().urlbar.is_editing()
    }

    pub fn type_text(&self, text: &str) {
        self.state.borrow_mut().urlbar.commit_text(text);
    }

    pub fn backspace(&self) {
        self.state.borrow_mut().urlbar.delete_backward();
    }

    /// Resolves the typed entry to a URL to load.
    pub fn submit_url(&self) -> Option<Url> {
        self.state.borrow_mut().urlbar.submit()
    }

    // ── Modes ──────────────────────────────────────────────────────────

    /// Returns `false` if the bar was already in focus mode.
    pub fn enter_focus_mode(&self) -> bool {
        let mut state = self.state.borrow_mut();
        !std::mem::replace(&mut state.focus_mode, true)
    }

    /// Returns `false` if the bar was not in focus mode.
    pub fn exit_focus_mode(&self) -> bool {
        let mut state = self.state.borrow_mut();
        state.focus_due_to_fullscreen = false;
        std::mem::replace(&mut state.focus_mode, false)
    }

    pub fn is_in_focus_mode(&self) -> bool {
        self.state.borrow().focus_mode
    }

    pub fn enter_resize_mode(&self) -> bool {
        let mut state = self.state.borrow_mut();
        !std::mem::replace(&mut state.resizing, true)
    }

    pub fn exit_resize_mode(&self) -> bool {
        let mut state = self.state.borrow_mut();
        std::mem::replace(&mut state.resizing, false)
    }

    pub fn is_resizing(&self) -> bool {
        self.state.borrow().resizing
    }

    pub fn set_focus_due_to_fullscreen(&self, value: bool) {
        self.state.borrow_mut().focus_due_to_fullscreen = value;
    }

    pub fn is_focus_due_to_fullscreen(&self) -> bool {
        self.state.borrow().focus_due_to_fullscreen
    }

    /// Takes the fullscreen change reported since the last call.
    pub fn take_fullscreen_request(&self) -> Option<bool> {
        self.state.borrow_mut().pending_fullscreen.take()
    }
}

impl WidgetSurface for NavigationBar {
    fn resize(&self, size: Size2D<u32>) {
        self.surface.resize(size);
    }

    fn set_visible(&self, visible: bool) {
        self.surface.set_visible(visible);
    }

    fn detach(&self) {
        self.surface.detach();
    }
}

impl NavigationListener for NavigationBar {
    fn on_location_change(&self, _session: &Session, uri: &Url) {
        self.state.borrow_mut().urlbar.show_location(uri);
    }

    fn on_can_go_back(&self, _session: &Session, can_go_back: bool) {
        self.state.borrow_mut().can_go_back = can_go_back;
    }

    fn on_can_go_forward(&self, _session: &Session, can_go_forward: bool) {
        self.state.borrow_mut().can_go_forward = can_go_forward;
    }
}

impl ProgressListener for NavigationBar {
    fn on_page_start(&self, _session: &Session, uri: &Url) {
        let mut state = self.state.borrow_mut();
        state.urlbar.show_location(uri);
        state.urlbar.indicators_mut().loading = true;
    }

    fn on_page_stop(&self, _session: &Session, _success: bool) {
        self.state.borrow_mut().urlbar.indicators_mut().loading = false;
    }

    fn on_security_change(&self, _session: &Session, secure: bool) {
        self.state.borrow_mut().urlbar.indicators_mut().insecure = !secure;
    }
}

impl SessionChangeListener for NavigationBar {
    fn on_current_session_change(
        &self,
        _previous: Option<&Session>,
        current: &Session,
        id: SessionId,
    ) {
        let mut state = self.state.borrow_mut();
        if state.session == Some(id) {
            return;
        }
        debug!(%id, "Navigation bar follows new session");

        let page = current.state();
        state.session = Some(id);
        state.can_go_back = page.can_go_back;
        state.can_go_forward = page.can_go_forward;
        state.pending_fullscreen = None;
        state.urlbar.replace_location(page.uri.as_ref());
        *state.urlbar.indicators_mut() = Indicators {
            loading: page.loading,
            insecure: page.uri.is_some() && !page.secure,
            private: current.is_private(),
        };
    }
}

impl ContentListener for NavigationBar {
    fn on_fullscreen(&self, session: &Session, fullscreen: bool) {
        debug!(session = %session.id(), fullscreen, "Fullscreen change");
        self.state.borrow_mut().pending_fullscreen = Some(fullscreen);
    }
}

impl WidgetUpdateListener for NavigationBar {
    fn on_widget_update(
        &self,
        handle: WidgetHandle,
        placement: &Placement,
        placements: Placements<'_>,
    ) -> Option<PlacementChange> {
        if handle != self.browser {
            return None;
        }
        let current = placements.get(self.handle)?;

        // The browser may have been resized: follow its width, never shrinking
        // below the baseline.
        let world_width = placement
            .world_width
            .max(self.browser_baseline_world_width);
        let width = scaled_width(
            self.baseline_width,
            placement.world_width,
            self.browser_baseline_world_width,
        );
        if current.width == width && current.world_width == world_width {
            return None;
        }

        let mut next = current.clone();
        next.width = width;
        next.world_width = world_width;
        Some(PlacementChange {
            handle: self.handle,
            placement: next,
        })
    }
}
