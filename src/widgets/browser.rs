//! The browser surface: shows whichever session is current.
//!
//! `BrowserWidget` is registered as a session-change listener. When the
//! current session changes it detaches text input and releases the display of
//! the old session, then acquires a display on the new one sized to its
//! surface. Display acquisition waits until the surface has a non-empty size.

use std::cell::RefCell;
use std::rc::Rc;

use euclid::default::Size2D;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::engine::{DisplayId, EngineSession, KeyEvent, PointerEvent};
use crate::placement::{Placement, WidgetHandle, units_from_meters};
use crate::registry::WidgetSurface;
use crate::session::{Session, SessionChangeListener, SessionId};

struct Attached {
    id: SessionId,
    engine: Rc<dyn EngineSession>,
    display: Option<DisplayId>,
}

impl Attached {
    fn ensure_display(&mut self, size: Size2D<u32>) {
        if size.is_empty() {
            return;
        }
        match self.display {
            Some(display) => {
                if let Err(error) = self.engine.resize_display(display, size) {
                    warn!(session = %self.id, %error, "Display resize failed");
                }
            }
            None => match self.engine.acquire_display(size) {
                Ok(display) => self.display = Some(display),
                Err(error) => warn!(session = %self.id, %error, "Display acquisition failed"),
            },
        }
    }

    fn detach(&mut self) {
        self.engine.detach_text_input();
        if let Some(display) = self.display.take() {
            self.engine.release_display(display);
        }
    }
}

#[derive(Default)]
struct BrowserState {
    attached: Option<Attached>,
    surface_size: Size2D<u32>,
    visible: bool,
    private: bool,
    released: bool,
}

pub struct BrowserWidget {
    handle: WidgetHandle,
    state: RefCell<BrowserState>,
}

impl BrowserWidget {
    pub fn new(handle: WidgetHandle) -> Self {
        Self {
            handle,
            state: RefCell::new(BrowserState::default()),
        }
    }

    pub fn handle(&self) -> WidgetHandle {
        self.handle
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.state.borrow().attached.as_ref().map(|attached| attached.id)
    }

    pub fn display(&self) -> Option<DisplayId> {
        self.state
            .borrow()
            .attached
            .as_ref()
            .and_then(|attached| attached.display)
    }

    pub fn surface_size(&self) -> Size2D<u32> {
        self.state.borrow().surface_size
    }

    pub fn is_visible(&self) -> bool {
        self.state.borrow().visible
    }

    pub fn set_private_mode(&self, private: bool) {
        self.state.borrow_mut().private = private;
    }

    pub fn is_private_mode(&self) -> bool {
        self.state.borrow().private
    }

    pub fn is_released(&self) -> bool {
        self.state.borrow().released
    }

    /// Forwards a pointer event to the attached session's pan/zoom.
    pub fn pointer_event(&self, event: PointerEvent) {
        let state = self.state.borrow();
        match &state.attached {
            Some(attached) if !state.released => attached.engine.pointer_event(event),
            _ => debug!(handle = %self.handle, "Pointer event without a session, dropped"),
        }
    }

    /// Forwards a key to the attached session. Returns `true` if consumed.
    pub fn key_event(&self, event: KeyEvent) -> bool {
        let state = self.state.borrow();
        match &state.attached {
            Some(attached) if !state.released => attached.engine.key_event(event),
            _ => false,
        }
    }

    /// Detaches from the session for good. Later notifications are ignored.
    pub fn release(&self) {
        let mut state = self.state.borrow_mut();
        if state.released {
            return;
        }
        state.released = true;
        if let Some(mut attached) = state.attached.take() {
            attached.detach();
        }
        info!(handle = %self.handle, "Browser widget released");
    }
}

impl WidgetSurface for BrowserWidget {
    fn resize(&self, size: Size2D<u32>) {
        let mut state = self.state.borrow_mut();
        state.surface_size = size;
        if state.released {
            return;
        }
        if let Some(attached) = state.attached.as_mut() {
            attached.ensure_display(size);
        }
    }

    fn set_visible(&self, visible: bool) {
        self.state.borrow_mut().visible = visible;
    }

    fn detach(&self) {
        self.release();
    }
}

impl SessionChangeListener for BrowserWidget {
    fn on_current_session_change(
        &self,
        _previous: Option<&Session>,
        current: &Session,
        id: SessionId,
    ) {
        let mut state = self.state.borrow_mut();
        if state.released {
            debug!(handle = %self.handle, %id, "Session change after release, ignored");
            return;
        }
        if state.attached.as_ref().is_some_and(|attached| attached.id == id) {
            debug!(%id, "Already attached to session");
            return;
        }

        if let Some(mut previous) = state.attached.take() {
            debug!(session = %previous.id, "Detaching from previous session");
            previous.detach();
        }

        let mut attached = Attached {
            id,
            engine: current.engine().clone(),
            display: None,
        };
        attached.ensure_display(state.surface_size);
        attached.engine.attach_text_input();
        state.attached = Some(attached);
        state.private = current.is_private();
        info!(handle = %self.handle, %id, "Browser attached to session");
    }
}

/// Initial placement of the browser surface.
pub fn browser_placement(config: &BrowserConfig) -> Placement {
    let mut placement = Placement {
        width: config.width_pixels,
        height: config.height_pixels,
        world_width: config.world_width,
        density: config.density,
        opaque: true,
        ..Placement::default()
    };
    placement.translation.y = units_from_meters(config.world_y);
    placement.translation.z = units_from_meters(config.world_z);
    placement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::headless::{EngineCall, HeadlessEngine};
    use crate::session::{SessionSettings, SessionStore};

    fn setup() -> (SessionStore, HeadlessEngine, Rc<BrowserWidget>) {
        let engine = HeadlessEngine::new();
        let mut store = SessionStore::new(Rc::new(engine.clone()));
        let browser = Rc::new(BrowserWidget::new(WidgetHandle::new(1)));
        store.add_session_change_listener(browser.clone());
        (store, engine, browser)
    }

    #[test]
    fn test_display_waits_for_surface_size() {
        let (mut store, engine, browser) = setup();
        let a = store.create_session(SessionSettings::default()).unwrap();
        store.set_current_session(a);
        assert_eq!(browser.session_id(), Some(a));
        assert_eq!(browser.display(), None);

        browser.resize(Size2D::new(800, 600));
        assert!(browser.display().is_some());
        assert!(engine.calls().contains(&EngineCall::AcquireDisplay {
            session: a,
            size: Size2D::new(800, 600),
        }));
    }

    #[test]
    fn test_resize_resizes_engine_display() {
        let (mut store, engine, browser) = setup();
        let a = store.create_session(SessionSettings::default()).unwrap();
        browser.resize(Size2D::new(800, 600));
        store.set_current_session(a);
        let display = browser.display().unwrap();

        browser.resize(Size2D::new(1600, 1200));
        assert_eq!(
            engine.calls().last(),
            Some(&EngineCall::ResizeDisplay {
                session: a,
                display,
                size: Size2D::new(1600, 1200),
            })
        );
    }

    #[test]
    fn test_session_switch_moves_display() {
        let (mut store, engine, browser) = setup();
        browser.resize(Size2D::new(800, 600));
        let a = store.create_session(SessionSettings::default()).unwrap();
        let b = store.create_session(SessionSettings::default()).unwrap();
        store.set_current_session(a);
        let old_display = browser.display().unwrap();
        engine.clear_calls();

        store.set_current_session(b);
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::DetachTextInput(a),
                EngineCall::ReleaseDisplay {
                    session: a,
                    display: old_display,
                },
                EngineCall::AcquireDisplay {
                    session: b,
                    size: Size2D::new(800, 600),
                },
                EngineCall::AttachTextInput(b),
            ]
        );
        assert_eq!(browser.session_id(), Some(b));
    }

    #[test]
    fn test_same_session_notification_is_noop() {
        let (mut store, engine, browser) = setup();
        browser.resize(Size2D::new(10, 10));
        let a = store.create_session(SessionSettings::default()).unwrap();
        store.set_current_session(a);
        engine.clear_calls();

        store.set_current_session(a);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_notifications_after_release_ignored() {
        let (mut store, engine, browser) = setup();
        browser.resize(Size2D::new(10, 10));
        let a = store.create_session(SessionSettings::default()).unwrap();
        let b = store.create_session(SessionSettings::default()).unwrap();
        store.set_current_session(a);
        browser.release();
        engine.clear_calls();

        store.set_current_session(b);
        browser.resize(Size2D::new(20, 20));
        assert!(engine.calls().is_empty());
        assert_eq!(browser.session_id(), None);
        assert!(!browser.key_event(KeyEvent {
            code: 13,
            pressed: true
        }));
    }

    #[test]
    fn test_private_flag_follows_session() {
        let (mut store, _engine, browser) = setup();
        let a = store.create_session(SessionSettings::default()).unwrap();
        let p = store
            .create_session(SessionSettings { private_mode: true })
            .unwrap();
        store.set_current_session(a);
        assert!(!browser.is_private_mode());
        store.set_current_session(p);
        assert!(browser.is_private_mode());
    }

    #[test]
    fn test_browser_placement_from_config() {
        let config = BrowserConfig::default();
        let placement = browser_placement(&config);
        assert_eq!(placement.width, config.width_pixels);
        assert!(placement.opaque);
        assert_eq!(placement.parent_handle, None);
        assert_eq!(placement.translation.z, units_from_meters(config.world_z));
    }
}
