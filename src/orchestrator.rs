//! Orchestrateur : le monde de widgets, les sessions et les entrées.
//!
//! Point d'entrée de l'hôte (plateforme VR ou harnais headless). Il possède
//! explicitement tous les objets de contexte, sans accès global :
//!
//! ```text
//! Orchestrator
//!   ├─ WidgetRegistry ──(CommandSender)──▶ thread de rendu
//!   ├─ SessionStore ──(listeners)──▶ BrowserWidget, NavigationBar
//!   ├─ GestureRecognizer + Timers
//!   ├─ BackHandlerStack<BackHandler>
//!   └─ widgets : navigateur, barre de navigation, clavier, réglages, top bar
//! ```
//!
//! ## Monde initial
//!
//! ```text
//!              [top bar]          (visible en navigation privée)
//!   ┌────────────────────────┐
//!   │        navigateur      │
//!   └────────────────────────┘
//!       [barre de navigation]
//!          [  clavier  ]          (visible si un champ texte a le focus)
//! ```
//!
//! La barre de navigation, le clavier et la top bar ont le navigateur pour
//! parent. Le panneau de réglages est indépendant.
//!
//! ## Modes de la barre de navigation
//!
//! - Focus : barre ancrée à droite, monde estompé, gestionnaire de retour.
//!   Entré automatiquement quand la page passe en plein écran.
//! - Redimensionnement : encadré par `start_resize`/`finish_resize` sur le
//!   navigateur, gestionnaire de retour.

use std::rc::Rc;
use std::time::Instant;

use euclid::default::{Point2D, Vector2D};
use tracing::{debug, info, warn};
use url::Url;

use crate::back_handler::BackHandlerStack;
use crate::command::CommandSender;
use crate::config::Config;
use crate::engine::{Engine, EngineError, EngineEvent, PointerEvent, PointerKind};
use crate::gesture::{GestureRecognizer, GestureState, NavigationIntent, SwipeDirection};
use crate::placement::{FULLSCREEN_PRESET, Placement, WidgetHandle, preset_world_size};
use crate::registry::{WidgetRegistry, WidgetUpdateListener};
use crate::session::{
    ContentListener, NavigationListener, ProgressListener, SessionChangeListener, SessionId,
    SessionSettings, SessionStore,
};
use crate::timer::{TimerId, Timers};
use crate::widgets::browser::browser_placement;
use crate::widgets::panel::panel_placement;
use crate::widgets::{BrowserWidget, NavigationBar, Panel};

/// Interception du bouton retour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackHandler {
    ExitFocusMode,
    ExitResizeMode,
    CloseSettings,
}

/// Résultat d'un appui sur retour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    Handled(BackHandler),
    NavigatedBack,
    /// Rien à faire : l'hôte quitte l'application.
    Exit,
}

/// Boutons du plateau (contrôleur).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    Help,
    Settings,
    Private,
}

/// Actions des boutons de la barre de navigation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationAction {
    Back,
    Forward,
    /// Recharge, ou arrête si la page charge encore.
    ReloadOrStop,
    Home,
    EnterFocusMode,
    ExitFocusMode,
    EnterResizeMode,
    ExitResizeMode,
    ResizePreset(f32),
    FocusUrlBar,
    SubmitUrl,
}

/// Destinataire du clavier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    None,
    Browser,
    UrlBar,
}

pub struct Orchestrator {
    config: Config,
    registry: WidgetRegistry,
    sessions: SessionStore,
    timers: Timers,
    gestures: GestureRecognizer,
    back_handlers: BackHandlerStack<BackHandler>,

    browser: Rc<BrowserWidget>,
    navigation_bar: Rc<NavigationBar>,
    keyboard: Rc<Panel>,
    settings: Rc<Panel>,
    top_bar: Rc<Panel>,

    browser_pressed: bool,
    focus_check: Option<TimerId>,
    focus: FocusTarget,
    shut_down: bool,
}

impl Orchestrator {
    /// Construit le monde initial et charge `url` (ou `general.default_url`)
    /// dans une première session.
    pub fn new(
        config: Config,
        engine: Rc<dyn Engine>,
        commands: CommandSender,
        url: Option<&Url>,
    ) -> Result<Self, EngineError> {
        let mut registry = WidgetRegistry::new(commands);
        let mut sessions = SessionStore::new(engine);

        let browser_handle = registry.allocate_handle();
        let navigation_handle = registry.allocate_handle();
        let keyboard_handle = registry.allocate_handle();
        let settings_handle = registry.allocate_handle();
        let top_bar_handle = registry.allocate_handle();

        // ── 1. Widgets et abonnements ──
        let browser = Rc::new(BrowserWidget::new(browser_handle));
        let navigation_bar = Rc::new(NavigationBar::new(
            navigation_handle,
            browser_handle,
            &config.navigation_bar,
            config.browser.world_width,
            &config.general.search_engine_url,
        ));
        let keyboard = Rc::new(Panel::new(keyboard_handle));
        let settings = Rc::new(Panel::new(settings_handle));
        let top_bar = Rc::new(Panel::new(top_bar_handle));

        sessions.add_session_change_listener(browser.clone());
        sessions.add_session_change_listener(navigation_bar.clone());
        sessions.add_navigation_listener(navigation_bar.clone());
        sessions.add_progress_listener(navigation_bar.clone());
        sessions.add_content_listener(navigation_bar.clone());
        registry.add_listener(navigation_bar.clone());

        // ── 2. Première session ──
        let session = sessions.create_session(SessionSettings::default())?;
        sessions.set_current_session(session);

        // ── 3. Monde : le parent avant ses enfants ──
        registry.add(browser_handle, browser_placement(&config.browser), browser.clone());
        registry.add(
            navigation_handle,
            navigation_bar.initial_placement(&config.navigation_bar),
            navigation_bar.clone(),
        );
        registry.add(
            keyboard_handle,
            panel_placement(&config.keyboard.panel(), Some(browser_handle)),
            keyboard.clone(),
        );
        registry.add(
            settings_handle,
            panel_placement(&config.settings_panel.panel(), None),
            settings.clone(),
        );
        registry.add(
            top_bar_handle,
            panel_placement(&config.top_bar.panel(), Some(browser_handle)),
            top_bar.clone(),
        );

        let gestures = GestureRecognizer::new(config.input.swipe_delay());
        let orchestrator = Self {
            config,
            registry,
            sessions,
            timers: Timers::new(),
            gestures,
            back_handlers: BackHandlerStack::new(),
            browser,
            navigation_bar,
            keyboard,
            settings,
            top_bar,
            browser_pressed: false,
            focus_check: None,
            focus: FocusTarget::None,
            shut_down: false,
        };

        // ── 4. Page initiale ──
        match url {
            Some(url) => orchestrator.sessions.load_uri(url),
            None => orchestrator.load_default_url(),
        }
        info!(%session, widgets = orchestrator.registry.len(), "World initialized");
        Ok(orchestrator)
    }

    fn load_default_url(&self) {
        match Url::parse(&self.config.general.default_url) {
            Ok(url) => self.sessions.load_uri(&url),
            Err(error) => warn!(
                url = %self.config.general.default_url,
                %error,
                "Invalid default URL"
            ),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Entrées de l'hôte
    // ─────────────────────────────────────────────────────────────────────

    /// Pointeur sur un widget (`position` en pixels de texture).
    pub fn handle_motion_event(
        &mut self,
        handle: WidgetHandle,
        device: u32,
        pressed: bool,
        position: Point2D<f32>,
        now: Instant,
    ) {
        if !self.registry.contains(handle) {
            warn!(%handle, "Motion event for unknown widget");
            return;
        }
        if handle != self.browser.handle() {
            debug!(%handle, pressed, "Motion event on panel");
            return;
        }

        let kind = match (self.browser_pressed, pressed) {
            (false, true) => PointerKind::Press,
            (true, false) => PointerKind::Release,
            _ => PointerKind::Move,
        };
        self.browser.pointer_event(PointerEvent {
            device,
            kind,
            position,
        });

        if pressed && self.focus != FocusTarget::Browser {
            self.handle_focus_change(FocusTarget::Browser);
        }
        // The page only reports a focused text field after the press is
        // processed: re-check the keyboard a bit later.
        if self.browser_pressed != pressed {
            if let Some(previous) = self.focus_check.take() {
                self.timers.cancel(previous);
            }
            self.focus_check = Some(
                self.timers
                    .schedule(now, self.config.input.focus_debounce()),
            );
        }
        self.browser_pressed = pressed;
    }

    pub fn handle_scroll_event(&mut self, handle: WidgetHandle, device: u32, delta: Vector2D<f32>) {
        if !self.registry.contains(handle) {
            warn!(%handle, "Scroll event for unknown widget");
            return;
        }
        if handle == self.browser.handle() {
            self.browser.pointer_event(PointerEvent {
                device,
                kind: PointerKind::Scroll(delta),
                position: Point2D::origin(),
            });
        }
    }

    /// Balayage du contrôleur. Retourne la navigation déclenchée.
    pub fn handle_gesture(
        &mut self,
        direction: SwipeDirection,
        now: Instant,
    ) -> Option<NavigationIntent> {
        let intent = self.gestures.on_swipe(direction, now, &mut self.timers)?;
        match intent {
            NavigationIntent::Back => self.sessions.go_back(),
            NavigationIntent::Forward => self.sessions.go_forward(),
        }
        info!(?intent, "Navigation from swipe gesture");
        Some(intent)
    }

    pub fn handle_tray_event(&mut self, event: TrayEvent) {
        match event {
            TrayEvent::Help => debug!("Help requested"),
            TrayEvent::Settings => self.show_settings(),
            TrayEvent::Private => {
                self.enter_private_browsing();
            }
        }
    }

    /// Redimensionnement interactif d'un widget par le compositeur.
    pub fn handle_resize(&mut self, handle: WidgetHandle, world_width: f32, world_height: f32) {
        if !self.registry.contains(handle) {
            warn!(%handle, "Resize for unknown widget");
            return;
        }
        if handle != self.browser.handle() {
            debug!(%handle, "Widget is not resizable");
            return;
        }
        self.resize_browser(world_width, world_height);
    }

    /// Notification du moteur, réinjectée par l'hôte.
    pub fn handle_engine_event(&mut self, id: SessionId, event: EngineEvent) {
        self.sessions.handle_engine_event(id, event);
        if let Some(fullscreen) = self.navigation_bar.take_fullscreen_request() {
            self.on_fullscreen_change(fullscreen);
        }
    }

    pub fn back_pressed(&mut self) -> BackOutcome {
        if let Some(&handler) = self.back_handlers.on_back() {
            match handler {
                BackHandler::ExitFocusMode => self.exit_focus_mode(),
                BackHandler::ExitResizeMode => self.exit_resize_mode(),
                BackHandler::CloseSettings => self.hide_settings(),
            }
            return BackOutcome::Handled(handler);
        }
        if self.sessions.can_go_back() {
            self.sessions.go_back();
            BackOutcome::NavigatedBack
        } else {
            BackOutcome::Exit
        }
    }

    pub fn on_navigation_action(&mut self, action: NavigationAction) {
        debug!(?action, "Navigation bar action");
        match action {
            NavigationAction::Back => self.sessions.go_back(),
            NavigationAction::Forward => self.sessions.go_forward(),
            NavigationAction::ReloadOrStop => {
                if self.sessions.is_loading() {
                    self.sessions.stop();
                } else {
                    self.sessions.reload();
                }
            }
            NavigationAction::Home => self.load_default_url(),
            NavigationAction::EnterFocusMode => self.enter_focus_mode(),
            NavigationAction::ExitFocusMode => self.exit_focus_mode(),
            NavigationAction::EnterResizeMode => self.enter_resize_mode(),
            NavigationAction::ExitResizeMode => self.exit_resize_mode(),
            NavigationAction::ResizePreset(preset) => self.set_resize_preset(preset),
            NavigationAction::FocusUrlBar => self.handle_focus_change(FocusTarget::UrlBar),
            NavigationAction::SubmitUrl => {
                if let Some(url) = self.navigation_bar.submit_url() {
                    self.sessions.load_uri(&url);
                }
                self.handle_focus_change(FocusTarget::Browser);
            }
        }
    }

    /// Changement de focus clavier signalé par l'hôte.
    pub fn handle_focus_change(&mut self, target: FocusTarget) {
        self.focus = target;
        match target {
            FocusTarget::UrlBar => self.navigation_bar.focus_url_bar(),
            FocusTarget::Browser | FocusTarget::None => {
                if self.navigation_bar.is_url_bar_focused() {
                    self.navigation_bar.unfocus_url_bar();
                }
            }
        }
        self.check_keyboard_focus();
    }

    /// Affiche le clavier si le focus est sur un champ texte, le masque sinon.
    pub fn check_keyboard_focus(&mut self) {
        let show = match self.focus {
            FocusTarget::UrlBar => true,
            FocusTarget::Browser => self
                .sessions
                .current_session_id()
                .is_some_and(|id| self.sessions.is_input_active(id)),
            FocusTarget::None => false,
        };
        if self.keyboard.is_visible() != show {
            debug!(show, "Keyboard visibility");
            self.set_widget_visible(self.keyboard.handle(), show);
        }
    }

    /// Déclenche les minuteries échues.
    pub fn tick(&mut self, now: Instant) {
        for id in self.timers.expired(now) {
            if self.gestures.on_timer(id) {
                continue;
            }
            if self.focus_check == Some(id) {
                self.focus_check = None;
                self.check_keyboard_focus();
                continue;
            }
            debug!(?id, "Stale timer");
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Navigation privée
    // ─────────────────────────────────────────────────────────────────────

    /// Bascule vers une session privée. Sans effet si déjà en privé.
    pub fn enter_private_browsing(&mut self) -> bool {
        if self.sessions.is_private_mode() {
            return false;
        }
        let url = match Url::parse(&self.config.general.private_url) {
            Ok(url) => url,
            Err(error) => {
                warn!(url = %self.config.general.private_url, %error, "Invalid private URL");
                return false;
            }
        };

        self.registry.fade_out_world();
        if self.sessions.enter_private_mode(&url).is_none() {
            self.registry.fade_in_world();
            return false;
        }
        self.set_private_chrome(true);
        true
    }

    /// Fermeture de la top bar : retour à la session d'avant.
    pub fn exit_private_browsing(&mut self) -> bool {
        if !self.sessions.is_private_mode() {
            return false;
        }
        self.registry.fade_in_world();
        let restored = self.sessions.exit_private_mode();
        self.set_private_chrome(false);
        restored
    }

    fn set_private_chrome(&mut self, enabled: bool) {
        self.navigation_bar.set_private_mode(enabled);
        self.browser.set_private_mode(enabled);
        self.set_widget_visible(self.top_bar.handle(), enabled);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Modes de la barre de navigation
    // ─────────────────────────────────────────────────────────────────────

    fn enter_focus_mode(&mut self) {
        if !self.navigation_bar.enter_focus_mode() {
            return;
        }
        self.registry.fade_out_world();
        self.set_navigation_anchor_x(1.0);
        self.back_handlers.push(BackHandler::ExitFocusMode);
    }

    fn exit_focus_mode(&mut self) {
        if !self.navigation_bar.exit_focus_mode() {
            return;
        }
        self.registry.fade_in_world();
        self.set_resize_preset(1.0);
        self.set_navigation_anchor_x(0.5);
        self.back_handlers.pop(&BackHandler::ExitFocusMode);

        if self.sessions.is_in_fullscreen() {
            self.sessions.exit_fullscreen();
        }
    }

    fn enter_resize_mode(&mut self) {
        if !self.navigation_bar.enter_resize_mode() {
            return;
        }
        self.registry.start_resize(self.browser.handle());
        self.back_handlers.push(BackHandler::ExitResizeMode);
    }

    fn exit_resize_mode(&mut self) {
        if !self.navigation_bar.exit_resize_mode() {
            return;
        }
        self.registry.finish_resize(self.browser.handle());
        self.back_handlers.pop(&BackHandler::ExitResizeMode);
    }

    fn on_fullscreen_change(&mut self, fullscreen: bool) {
        info!(fullscreen, "Page fullscreen change");
        if fullscreen {
            if !self.navigation_bar.is_in_focus_mode() {
                self.enter_focus_mode();
                self.navigation_bar.set_focus_due_to_fullscreen(true);
            }
            if self.navigation_bar.is_resizing() {
                self.exit_resize_mode();
            }
            self.set_resize_preset(FULLSCREEN_PRESET);
        } else if self.navigation_bar.is_focus_due_to_fullscreen() {
            self.exit_focus_mode();
        }
    }

    fn set_navigation_anchor_x(&mut self, x: f32) {
        let handle = self.navigation_bar.handle();
        let Some(mut placement) = self.registry.placement(handle).cloned() else {
            return;
        };
        placement.anchor.x = x;
        placement.parent_anchor.x = x;
        self.registry.update(handle, placement);
    }

    /// Applique un preset de surface (multiplicateur d'aire) au navigateur.
    fn set_resize_preset(&mut self, preset: f32) {
        let size = preset_world_size(
            self.config.browser.world_width,
            self.config.browser.aspect_ratio(),
            preset,
        );
        self.resize_browser(size.width, size.height);
    }

    /// Redimensionne le navigateur à `world_width × world_height` en gardant
    /// la densité de pixels de la configuration.
    fn resize_browser(&mut self, world_width: f32, world_height: f32) {
        if world_width <= 0.0 || world_height <= 0.0 {
            warn!(world_width, world_height, "Invalid browser size, ignoring");
            return;
        }
        let handle = self.browser.handle();
        let Some(mut placement) = self.registry.placement(handle).cloned() else {
            return;
        };
        let browser = &self.config.browser;
        let width = (browser.width_pixels as f32 * world_width / browser.world_width).round();
        let height = (width * world_height / world_width).round();

        placement.width = width as u32;
        placement.height = height as u32;
        placement.world_width = world_width;
        placement.world_height = world_height;
        debug!(world_width, world_height, width, height, "Browser resized");
        self.registry.update(handle, placement);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Réglages
    // ─────────────────────────────────────────────────────────────────────

    fn show_settings(&mut self) {
        if self.settings.is_visible() {
            return;
        }
        self.set_widget_visible(self.settings.handle(), true);
        self.back_handlers.push(BackHandler::CloseSettings);
    }

    fn hide_settings(&mut self) {
        self.set_widget_visible(self.settings.handle(), false);
        self.back_handlers.pop(&BackHandler::CloseSettings);
    }

    fn set_widget_visible(&mut self, handle: WidgetHandle, visible: bool) {
        let Some(placement) = self.registry.placement(handle) else {
            return;
        };
        if placement.visible == visible {
            return;
        }
        let placement = Placement {
            visible,
            ..placement.clone()
        };
        self.registry.update(handle, placement);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Arrêt
    // ─────────────────────────────────────────────────────────────────────

    /// Annule les minuteries, retire les widgets et ferme les sessions.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.gestures.reset(&mut self.timers);
        self.timers.clear();
        self.focus_check = None;

        let navigation: Rc<dyn NavigationListener> = self.navigation_bar.clone();
        let progress: Rc<dyn ProgressListener> = self.navigation_bar.clone();
        let content: Rc<dyn ContentListener> = self.navigation_bar.clone();
        let widget_update: Rc<dyn WidgetUpdateListener> = self.navigation_bar.clone();
        let navigation_change: Rc<dyn SessionChangeListener> = self.navigation_bar.clone();
        self.sessions.remove_navigation_listener(&navigation);
        self.sessions.remove_progress_listener(&progress);
        self.sessions.remove_content_listener(&content);
        self.sessions.remove_session_change_listener(&navigation_change);
        self.registry.remove_listener(&widget_update);

        // Children first: the renderer never sees an orphan.
        for handle in self.registry.handles().into_iter().rev() {
            self.registry.remove(handle);
        }

        let browser: Rc<dyn SessionChangeListener> = self.browser.clone();
        self.sessions.remove_session_change_listener(&browser);
        self.sessions.close_all();
        info!("Orchestrator shut down");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accesseurs
    // ─────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn browser(&self) -> &BrowserWidget {
        &self.browser
    }

    pub fn navigation_bar(&self) -> &NavigationBar {
        &self.navigation_bar
    }

    pub fn keyboard(&self) -> &Panel {
        &self.keyboard
    }

    pub fn settings_panel(&self) -> &Panel {
        &self.settings
    }

    pub fn top_bar(&self) -> &Panel {
        &self.top_bar
    }

    pub fn back_handlers(&self) -> &BackHandlerStack<BackHandler> {
        &self.back_handlers
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gestures.state()
    }

    pub fn focus(&self) -> FocusTarget {
        self.focus
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use euclid::default::Size2D;

    use super::*;
    use crate::command::{Command, CommandReceiver, command_queue};
    use crate::engine::headless::{EngineCall, HeadlessEngine};

    struct Harness {
        orchestrator: Orchestrator,
        engine: HeadlessEngine,
        commands: CommandReceiver,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_url(None)
        }

        fn with_url(url: Option<&str>) -> Self {
            let engine = HeadlessEngine::new();
            let (tx, rx) = command_queue();
            let url = url.map(|u| Url::parse(u).unwrap());
            let orchestrator =
                Orchestrator::new(Config::default(), Rc::new(engine.clone()), tx, url.as_ref())
                    .unwrap();
            let mut harness = Self {
                orchestrator,
                engine,
                commands: rx,
            };
            harness.pump();
            harness
        }

        /// Feeds queued engine notifications back to the orchestrator.
        fn pump(&mut self) {
            loop {
                let events = self.engine.take_events();
                if events.is_empty() {
                    break;
                }
                for (id, event) in events {
                    self.orchestrator.handle_engine_event(id, event);
                }
            }
        }

        fn load(&mut self, url: &str) {
            let url = Url::parse(url).unwrap();
            self.orchestrator.sessions.load_uri(&url);
            self.pump();
        }

        fn browser_handle(&self) -> WidgetHandle {
            self.orchestrator.browser().handle()
        }

        fn placement(&self, handle: WidgetHandle) -> Placement {
            self.orchestrator
                .registry()
                .placement(handle)
                .cloned()
                .unwrap()
        }

        fn current(&self) -> SessionId {
            self.orchestrator.sessions().current_session_id().unwrap()
        }
    }

    #[test]
    fn test_initial_world() {
        let harness = Harness::new();
        let orchestrator = &harness.orchestrator;
        let browser = harness.browser_handle();

        let commands = harness.commands.drain();
        let created: Vec<WidgetHandle> = commands
            .iter()
            .filter(|command| matches!(command, Command::Create { .. }))
            .filter_map(Command::handle)
            .collect();
        assert_eq!(created.len(), 5);
        assert_eq!(created[0], browser);

        let nav = harness.placement(orchestrator.navigation_bar().handle());
        let keyboard = harness.placement(orchestrator.keyboard().handle());
        let top_bar = harness.placement(orchestrator.top_bar().handle());
        let settings = harness.placement(orchestrator.settings_panel().handle());
        assert_eq!(nav.parent_handle, Some(browser));
        assert_eq!(keyboard.parent_handle, Some(browser));
        assert_eq!(top_bar.parent_handle, Some(browser));
        assert_eq!(settings.parent_handle, None);
        assert!(!top_bar.visible && !keyboard.visible && !settings.visible);

        assert!(orchestrator.browser().display().is_some());
        assert_eq!(orchestrator.navigation_bar().url_text(), "https://example.com/");
    }

    #[test]
    fn test_initial_url_overrides_default() {
        let harness = Harness::with_url(Some("https://start.example/"));
        assert_eq!(
            harness.orchestrator.navigation_bar().url_text(),
            "https://start.example/"
        );
    }

    #[test]
    fn test_back_without_handlers_navigates_or_exits() {
        let mut harness = Harness::new();
        assert_eq!(harness.orchestrator.back_pressed(), BackOutcome::Exit);

        harness.load("https://two.example/");
        assert_eq!(
            harness.orchestrator.back_pressed(),
            BackOutcome::NavigatedBack
        );
        harness.pump();
        assert_eq!(
            harness.orchestrator.navigation_bar().url_text(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_focus_mode_round_trip() {
        let mut harness = Harness::new();
        let nav = harness.orchestrator.navigation_bar().handle();
        harness.commands.drain();

        harness
            .orchestrator
            .on_navigation_action(NavigationAction::EnterFocusMode);
        let placement = harness.placement(nav);
        assert_eq!((placement.anchor.x, placement.parent_anchor.x), (1.0, 1.0));
        assert_eq!(harness.commands.try_next(), Some(Command::FadeOut));
        assert_eq!(
            harness.orchestrator.back_handlers().top(),
            Some(&BackHandler::ExitFocusMode)
        );

        // Back press is swallowed by focus mode, history untouched.
        harness.load("https://two.example/");
        assert_eq!(
            harness.orchestrator.back_pressed(),
            BackOutcome::Handled(BackHandler::ExitFocusMode)
        );
        assert!(harness.commands.drain().contains(&Command::FadeIn));
        let placement = harness.placement(nav);
        assert_eq!((placement.anchor.x, placement.parent_anchor.x), (0.5, 0.5));
        assert!(harness.orchestrator.back_handlers().is_empty());
        assert!(!harness.engine.calls().contains(&EngineCall::GoBack(harness.current())));

        let browser = harness.placement(harness.browser_handle());
        assert_eq!((browser.width, browser.height), (1920, 1080));
    }

    #[test]
    fn test_resize_mode_is_bracketed() {
        let mut harness = Harness::new();
        let browser = harness.browser_handle();
        harness.commands.drain();

        harness
            .orchestrator
            .on_navigation_action(NavigationAction::EnterResizeMode);
        harness
            .orchestrator
            .on_navigation_action(NavigationAction::EnterResizeMode);
        assert_eq!(
            harness.commands.drain(),
            vec![Command::BeginResize(browser)]
        );

        assert_eq!(
            harness.orchestrator.back_pressed(),
            BackOutcome::Handled(BackHandler::ExitResizeMode)
        );
        assert_eq!(harness.commands.drain(), vec![Command::EndResize(browser)]);
        assert!(!harness.orchestrator.navigation_bar().is_resizing());
    }

    #[test]
    fn test_resize_preset_scales_browser_and_navigation_bar() {
        let mut harness = Harness::new();
        harness
            .orchestrator
            .on_navigation_action(NavigationAction::ResizePreset(2.0));

        let browser = harness.placement(harness.browser_handle());
        assert!((browser.world_width - 32f32.sqrt()).abs() < 1e-3);
        assert!((2714..=2716).contains(&browser.width), "{}", browser.width);
        assert!((1526..=1528).contains(&browser.height), "{}", browser.height);

        let nav = harness.placement(harness.orchestrator.navigation_bar().handle());
        assert!((1017..=1019).contains(&nav.width), "{}", nav.width);
        assert_eq!(
            harness.orchestrator.browser().surface_size(),
            Size2D::new(browser.width, browser.height)
        );
    }

    #[test]
    fn test_handle_resize_keeps_pixel_density() {
        let mut harness = Harness::new();
        let browser = harness.browser_handle();
        harness.orchestrator.handle_resize(browser, 2.0, 2.0);
        let placement = harness.placement(browser);
        assert_eq!((placement.width, placement.height), (960, 960));
        assert_eq!(placement.world_height, 2.0);

        // Degenerate sizes and unknown handles are ignored.
        harness.orchestrator.handle_resize(browser, 0.0, 1.0);
        harness
            .orchestrator
            .handle_resize(WidgetHandle::new(99), 1.0, 1.0);
        assert_eq!(harness.placement(browser).width, 960);
    }

    #[test]
    fn test_fullscreen_enters_and_leaves_focus_mode() {
        let mut harness = Harness::new();
        let id = harness.current();

        harness.engine.request_fullscreen(id);
        harness.pump();
        let nav = harness.orchestrator.navigation_bar();
        assert!(nav.is_in_focus_mode());
        assert!(nav.is_focus_due_to_fullscreen());
        let browser = harness.placement(harness.browser_handle());
        assert!((browser.world_width - 32f32.sqrt()).abs() < 1e-3);

        harness
            .orchestrator
            .handle_engine_event(id, EngineEvent::FullScreen(false));
        assert!(!harness.orchestrator.navigation_bar().is_in_focus_mode());
        assert!(harness.orchestrator.back_handlers().is_empty());
    }

    #[test]
    fn test_exit_focus_mode_leaves_fullscreen() {
        let mut harness = Harness::new();
        let id = harness.current();
        harness.engine.request_fullscreen(id);
        harness.pump();
        harness.engine.clear_calls();

        assert_eq!(
            harness.orchestrator.back_pressed(),
            BackOutcome::Handled(BackHandler::ExitFocusMode)
        );
        assert!(harness.engine.calls().contains(&EngineCall::ExitFullscreen(id)));
        harness.pump();
        assert!(!harness.orchestrator.sessions().is_in_fullscreen());
    }

    #[test]
    fn test_fullscreen_cancels_resize_mode() {
        let mut harness = Harness::new();
        harness
            .orchestrator
            .on_navigation_action(NavigationAction::EnterResizeMode);
        let id = harness.current();
        harness.engine.request_fullscreen(id);
        harness.pump();

        assert!(!harness.orchestrator.navigation_bar().is_resizing());
        assert_eq!(
            harness.orchestrator.back_handlers().top(),
            Some(&BackHandler::ExitFocusMode)
        );
        assert_eq!(harness.orchestrator.back_handlers().len(), 1);
    }

    #[test]
    fn test_double_swipe_goes_back() {
        let mut harness = Harness::new();
        harness.load("https://two.example/");
        let id = harness.current();
        let t0 = Instant::now();

        assert_eq!(
            harness.orchestrator.handle_gesture(SwipeDirection::Left, t0),
            None
        );
        assert_eq!(
            harness
                .orchestrator
                .handle_gesture(SwipeDirection::Left, t0 + Duration::from_millis(200)),
            Some(NavigationIntent::Back)
        );
        let go_backs = harness
            .engine
            .calls()
            .into_iter()
            .filter(|call| *call == EngineCall::GoBack(id))
            .count();
        assert_eq!(go_backs, 1);
        assert_eq!(harness.orchestrator.gesture_state(), GestureState::Idle);
    }

    #[test]
    fn test_swipe_window_expires_on_tick() {
        let mut harness = Harness::new();
        let t0 = Instant::now();
        harness.orchestrator.handle_gesture(SwipeDirection::Right, t0);
        harness.orchestrator.tick(t0 + Duration::from_millis(1000));
        assert_eq!(harness.orchestrator.gesture_state(), GestureState::Idle);
        assert_eq!(
            harness
                .orchestrator
                .handle_gesture(SwipeDirection::Right, t0 + Duration::from_millis(1100)),
            None
        );
    }

    #[test]
    fn test_private_browsing_round_trip() {
        let mut harness = Harness::new();
        let original = harness.current();
        harness.commands.drain();

        harness.orchestrator.handle_tray_event(TrayEvent::Private);
        harness.pump();
        let private = harness.current();
        assert_ne!(private, original);
        assert!(harness.orchestrator.sessions().is_private_mode());
        assert!(harness.orchestrator.navigation_bar().is_private_mode());
        assert!(harness.orchestrator.browser().is_private_mode());
        assert!(harness.orchestrator.top_bar().is_visible());
        assert_eq!(harness.orchestrator.browser().session_id(), Some(private));
        assert_eq!(harness.commands.try_next(), Some(Command::FadeOut));
        assert_eq!(
            harness.orchestrator.navigation_bar().url_text(),
            "http://www.mozilla.com/"
        );

        // Second entry is a no-op.
        assert!(!harness.orchestrator.enter_private_browsing());

        assert!(harness.orchestrator.exit_private_browsing());
        assert_eq!(harness.current(), original);
        assert!(harness.orchestrator.sessions().session(private).is_none());
        assert!(!harness.orchestrator.top_bar().is_visible());
        assert!(!harness.orchestrator.navigation_bar().is_private_mode());
        assert_eq!(harness.orchestrator.browser().session_id(), Some(original));
        assert!(harness.engine.calls().contains(&EngineCall::Close(private)));
        assert!(harness.commands.drain().contains(&Command::FadeIn));

        assert!(!harness.orchestrator.exit_private_browsing());
    }

    #[test]
    fn test_navigation_bar_resyncs_after_private_exit() {
        let mut harness = Harness::new();
        let original = harness.current();

        harness.orchestrator.handle_tray_event(TrayEvent::Private);
        harness.pump();
        let private = harness.current();
        harness.orchestrator.handle_engine_event(
            private,
            EngineEvent::PageStart(Url::parse("http://www.mozilla.com/slow").unwrap()),
        );
        assert!(harness.orchestrator.navigation_bar().is_loading());

        assert!(harness.orchestrator.exit_private_browsing());
        let nav = harness.orchestrator.navigation_bar();
        assert_eq!(nav.url_text(), "https://example.com/");
        assert!(!nav.is_loading());
        assert!(!nav.is_insecure());
        assert!(!nav.is_private_mode());

        harness.engine.clear_calls();
        harness
            .orchestrator
            .on_navigation_action(NavigationAction::ReloadOrStop);
        assert_eq!(harness.engine.calls(), vec![EngineCall::Reload(original)]);
    }

    #[test]
    fn test_keyboard_follows_page_input_after_debounce() {
        let mut harness = Harness::new();
        let browser = harness.browser_handle();
        let id = harness.current();
        let t0 = Instant::now();

        harness
            .orchestrator
            .handle_motion_event(browser, 0, true, Point2D::new(10.0, 10.0), t0);
        harness.engine.emit(id, EngineEvent::InputActive(true));
        harness.pump();
        assert_eq!(harness.orchestrator.focus(), FocusTarget::Browser);

        harness.orchestrator.tick(t0 + Duration::from_millis(149));
        assert!(!harness.orchestrator.keyboard().is_visible());
        harness.orchestrator.tick(t0 + Duration::from_millis(150));
        assert!(harness.orchestrator.keyboard().is_visible());

        let calls = harness.engine.calls();
        assert!(calls.iter().any(|call| matches!(
            call,
            EngineCall::Pointer { event, .. } if event.kind == PointerKind::Press
        )));
    }

    #[test]
    fn test_url_bar_focus_shows_keyboard_and_submit_loads() {
        let mut harness = Harness::new();
        harness
            .orchestrator
            .on_navigation_action(NavigationAction::FocusUrlBar);
        assert!(harness.orchestrator.keyboard().is_visible());

        harness.orchestrator.navigation_bar().type_text("rust lang");
        harness
            .orchestrator
            .on_navigation_action(NavigationAction::SubmitUrl);
        harness.pump();
        assert!(!harness.orchestrator.keyboard().is_visible());
        assert!(
            harness
                .orchestrator
                .navigation_bar()
                .url_text()
                .starts_with("https://duckduckgo.com/?q=rust+lang")
        );
    }

    #[test]
    fn test_reload_or_stop_depends_on_loading() {
        let mut harness = Harness::new();
        let id = harness.current();
        harness
            .orchestrator
            .handle_engine_event(id, EngineEvent::PageStart(Url::parse("https://slow.example/").unwrap()));
        harness.engine.clear_calls();

        harness
            .orchestrator
            .on_navigation_action(NavigationAction::ReloadOrStop);
        assert_eq!(harness.engine.calls(), vec![EngineCall::Stop(id)]);
        harness.pump();

        harness.engine.clear_calls();
        harness
            .orchestrator
            .on_navigation_action(NavigationAction::ReloadOrStop);
        assert_eq!(harness.engine.calls(), vec![EngineCall::Reload(id)]);
    }

    #[test]
    fn test_settings_closed_by_back() {
        let mut harness = Harness::new();
        harness.orchestrator.handle_tray_event(TrayEvent::Settings);
        harness.orchestrator.handle_tray_event(TrayEvent::Settings);
        assert!(harness.orchestrator.settings_panel().is_visible());
        assert_eq!(harness.orchestrator.back_handlers().len(), 1);

        assert_eq!(
            harness.orchestrator.back_pressed(),
            BackOutcome::Handled(BackHandler::CloseSettings)
        );
        assert!(!harness.orchestrator.settings_panel().is_visible());
    }

    #[test]
    fn test_unknown_widget_events_are_ignored() {
        let mut harness = Harness::new();
        harness.commands.drain();
        harness.engine.clear_calls();
        let unknown = WidgetHandle::new(42);

        harness.orchestrator.handle_motion_event(
            unknown,
            0,
            true,
            Point2D::origin(),
            Instant::now(),
        );
        harness
            .orchestrator
            .handle_scroll_event(unknown, 0, Vector2D::new(0.0, 1.0));
        assert!(harness.commands.drain().is_empty());
        assert!(harness.engine.calls().is_empty());
        assert_eq!(harness.orchestrator.next_deadline(), None);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut harness = Harness::new();
        let t0 = Instant::now();
        harness.orchestrator.handle_gesture(SwipeDirection::Left, t0);
        let id = harness.current();
        let display = harness.orchestrator.browser().display().unwrap();
        harness.commands.drain();

        harness.orchestrator.shutdown();
        harness.orchestrator.shutdown();

        let removed: Vec<Command> = harness.commands.drain();
        assert_eq!(removed.len(), 5);
        assert!(removed.iter().all(|c| matches!(c, Command::Remove(_))));
        assert_eq!(
            removed.last(),
            Some(&Command::Remove(harness.browser_handle()))
        );
        assert!(harness.orchestrator.registry().is_empty());
        assert!(harness.orchestrator.browser().is_released());
        assert!(harness.engine.calls().contains(&EngineCall::ReleaseDisplay {
            session: id,
            display,
        }));
        assert!(harness.engine.calls().contains(&EngineCall::Close(id)));
        assert_eq!(harness.orchestrator.next_deadline(), None);
        assert_eq!(harness.orchestrator.gesture_state(), GestureState::Idle);
    }
}
