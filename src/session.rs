//! Session multiplexer.
//!
//! [`SessionStore`] owns every engine session, tracks which one is current and
//! fans engine notifications out to typed listeners:
//!
//! | Role           | Trait                     | Events                                   |
//! |----------------|---------------------------|------------------------------------------|
//! | navigation     | [`NavigationListener`]    | location, can-go-back/forward            |
//! | progress       | [`ProgressListener`]      | page start/stop, security                |
//! | content        | [`ContentListener`]       | fullscreen, title, input focus           |
//! | session change | [`SessionChangeListener`] | new, removed, current changed            |
//!
//! Listeners are notified one after the other; a listener that is already
//! torn down must treat a notification as a no-op.
//!
//! ## Private browsing
//!
//! ```text
//! current = A ──enter_private_mode──▶ current = B (private), A kept aside
//! current = B ──exit_private_mode───▶ current = A, B removed
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, warn};
use url::Url;

use crate::engine::{Engine, EngineError, EngineEvent, EngineSession};
use crate::observer::Listeners;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl SessionId {
    /// Rebuilds an id from the value an engine reported back.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings a session is created with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub private_mode: bool,
}

/// Last state reported by the engine for a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub uri: Option<Url>,
    pub title: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub loading: bool,
    pub secure: bool,
    pub fullscreen: bool,
    pub input_active: bool,
}

impl SessionState {
    fn apply(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::LocationChange(uri) => self.uri = Some(uri.clone()),
            EngineEvent::CanGoBack(value) => self.can_go_back = *value,
            EngineEvent::CanGoForward(value) => self.can_go_forward = *value,
            EngineEvent::PageStart(uri) => {
                self.uri = Some(uri.clone());
                self.loading = true;
            }
            EngineEvent::PageStop { .. } => self.loading = false,
            EngineEvent::SecurityChange { secure } => self.secure = *secure,
            EngineEvent::FullScreen(value) => self.fullscreen = *value,
            EngineEvent::TitleChange(title) => self.title = title.clone(),
            EngineEvent::InputActive(value) => self.input_active = *value,
        }
    }
}

pub struct Session {
    id: SessionId,
    engine: Rc<dyn EngineSession>,
    settings: SessionSettings,
    state: SessionState,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn engine(&self) -> &Rc<dyn EngineSession> {
        &self.engine
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_private(&self) -> bool {
        self.settings.private_mode
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

pub trait NavigationListener {
    fn on_location_change(&self, session: &Session, uri: &Url);
    fn on_can_go_back(&self, session: &Session, can_go_back: bool);
    fn on_can_go_forward(&self, session: &Session, can_go_forward: bool);
}

pub trait ProgressListener {
    fn on_page_start(&self, session: &Session, uri: &Url);
    fn on_page_stop(&self, session: &Session, success: bool);
    fn on_security_change(&self, session: &Session, secure: bool);
}

pub trait ContentListener {
    fn on_fullscreen(&self, session: &Session, fullscreen: bool);
    fn on_title_change(&self, _session: &Session, _title: Option<&str>) {}
    fn on_input_active(&self, _session: &Session, _active: bool) {}
}

pub trait SessionChangeListener {
    fn on_new_session(&self, _session: &Session) {}
    fn on_remove_session(&self, _session: &Session) {}
    /// `previous` may be the same session as `current`; listeners already
    /// attached to `id` must ignore the call.
    fn on_current_session_change(&self, previous: Option<&Session>, current: &Session, id: SessionId);
}

pub struct SessionStore {
    engine: Rc<dyn Engine>,
    next_id: u32,
    sessions: HashMap<SessionId, Session>,
    current: Option<SessionId>,
    /// Session to restore when private browsing ends.
    restore_after_private: Option<SessionId>,
    navigation_listeners: Listeners<dyn NavigationListener>,
    progress_listeners: Listeners<dyn ProgressListener>,
    content_listeners: Listeners<dyn ContentListener>,
    session_change_listeners: Listeners<dyn SessionChangeListener>,
}

impl SessionStore {
    pub fn new(engine: Rc<dyn Engine>) -> Self {
        Self {
            engine,
            next_id: 1,
            sessions: HashMap::new(),
            current: None,
            restore_after_private: None,
            navigation_listeners: Listeners::default(),
            progress_listeners: Listeners::default(),
            content_listeners: Listeners::default(),
            session_change_listeners: Listeners::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session lifetime
    // ─────────────────────────────────────────────────────────────────────

    /// Creates a session. It does not become current.
    pub fn create_session(&mut self, settings: SessionSettings) -> Result<SessionId, EngineError> {
        let id = SessionId(self.next_id);
        let engine = self.engine.create_session(id, &settings)?;
        self.next_id += 1;

        info!(%id, private = settings.private_mode, "Session created");
        let session = Session {
            id,
            engine,
            settings,
            state: SessionState::default(),
        };
        for listener in self.session_change_listeners.iter() {
            listener.on_new_session(&session);
        }
        self.sessions.insert(id, session);
        Ok(id)
    }

    /// Makes `id` current and notifies session-change listeners.
    ///
    /// Unknown ids are logged and leave the store untouched.
    pub fn set_current_session(&mut self, id: SessionId) -> bool {
        let Some(current) = self.sessions.get(&id) else {
            warn!(%id, "set_current_session: unknown session");
            return false;
        };
        let previous_id = self.current.replace(id);
        let previous = previous_id.and_then(|previous| self.sessions.get(&previous));
        debug!(
            ?previous_id,
            %id,
            listeners = self.session_change_listeners.len(),
            "Current session changed"
        );

        for listener in self.session_change_listeners.iter() {
            listener.on_current_session_change(previous, current, id);
        }
        true
    }

    /// Destroys a session. The current session cannot be removed: reassign
    /// current first.
    pub fn remove_session(&mut self, id: SessionId) -> bool {
        if self.current == Some(id) {
            warn!(%id, "Refusing to remove the current session");
            return false;
        }
        let Some(session) = self.sessions.remove(&id) else {
            warn!(%id, "remove_session: unknown session");
            return false;
        };
        if self.restore_after_private == Some(id) {
            self.restore_after_private = None;
        }

        session.engine.close();
        for listener in self.session_change_listeners.iter() {
            listener.on_remove_session(&session);
        }
        info!(%id, "Session removed");
        true
    }

    /// Closes every session, current included. Used on teardown only.
    pub fn close_all(&mut self) {
        self.current = None;
        self.restore_after_private = None;
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort();
        for id in ids {
            if let Some(session) = self.sessions.remove(&id) {
                session.engine.close();
                for listener in self.session_change_listeners.iter() {
                    listener.on_remove_session(&session);
                }
            }
        }
        info!("All sessions closed");
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current.and_then(|id| self.sessions.get(&id))
    }

    pub fn current_session_id(&self) -> Option<SessionId> {
        self.current
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Session ids, ascending.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    // ─────────────────────────────────────────────────────────────────────
    // Private browsing
    // ─────────────────────────────────────────────────────────────────────

    pub fn is_private_mode(&self) -> bool {
        self.current_session().is_some_and(Session::is_private)
    }

    /// Switches to a new private session loading `uri`.
    ///
    /// No-op if the current session is already private.
    pub fn enter_private_mode(&mut self, uri: &Url) -> Option<SessionId> {
        if self.is_private_mode() {
            debug!("Already in private mode");
            return None;
        }

        let id = match self.create_session(SessionSettings { private_mode: true }) {
            Ok(id) => id,
            Err(error) => {
                warn!(%error, "Cannot create private session");
                return None;
            }
        };
        self.restore_after_private = self.current;
        self.set_current_session(id);
        self.load_uri(uri);
        info!(%id, restore = ?self.restore_after_private, "Private browsing started");
        Some(id)
    }

    /// Restores the session that was current before private browsing and
    /// destroys the private session.
    pub fn exit_private_mode(&mut self) -> bool {
        let Some(private_id) = self.current.filter(|_| self.is_private_mode()) else {
            debug!("Not in private mode");
            return false;
        };

        let restore = match self
            .restore_after_private
            .take()
            .filter(|id| self.sessions.contains_key(id))
        {
            Some(id) => id,
            None => {
                warn!("Session to restore is gone, creating a new one");
                match self.create_session(SessionSettings::default()) {
                    Ok(id) => id,
                    Err(error) => {
                        warn!(%error, "Cannot leave private mode");
                        return false;
                    }
                }
            }
        };

        self.set_current_session(restore);
        self.remove_session(private_id);
        info!(%restore, "Private browsing ended");
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Navigation on the current session
    // ─────────────────────────────────────────────────────────────────────

    fn current_engine(&self) -> Option<&Rc<dyn EngineSession>> {
        let engine = self.current_session().map(Session::engine);
        if engine.is_none() {
            debug!("No current session");
        }
        engine
    }

    pub fn load_uri(&self, uri: &Url) {
        if let Some(engine) = self.current_engine()
            && let Err(error) = engine.load(uri)
        {
            warn!(%uri, %error, "Load failed");
        }
    }

    pub fn go_back(&self) {
        if let Some(engine) = self.current_engine() {
            engine.go_back();
        }
    }

    pub fn go_forward(&self) {
        if let Some(engine) = self.current_engine() {
            engine.go_forward();
        }
    }

    pub fn reload(&self) {
        if let Some(engine) = self.current_engine() {
            engine.reload();
        }
    }

    pub fn stop(&self) {
        if let Some(engine) = self.current_engine() {
            engine.stop();
        }
    }

    pub fn exit_fullscreen(&self) {
        if let Some(engine) = self.current_engine() {
            engine.exit_fullscreen();
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.current_session()
            .is_some_and(|session| session.state.can_go_back)
    }

    pub fn is_loading(&self) -> bool {
        self.current_session()
            .is_some_and(|session| session.state.loading)
    }

    pub fn is_in_fullscreen(&self) -> bool {
        self.current_session()
            .is_some_and(|session| session.state.fullscreen)
    }

    pub fn is_input_active(&self, id: SessionId) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|session| session.state.input_active)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Engine notifications
    // ─────────────────────────────────────────────────────────────────────

    /// Records an engine notification and forwards it to listeners if the
    /// session is current. Events for unknown sessions are dropped.
    pub fn handle_engine_event(&mut self, id: SessionId, event: EngineEvent) {
        let Some(session) = self.sessions.get_mut(&id) else {
            debug!(%id, ?event, "Event for unknown session dropped");
            return;
        };
        session.state.apply(&event);

        if self.current != Some(id) {
            return;
        }
        let Some(session) = self.sessions.get(&id) else {
            return;
        };

        match &event {
            EngineEvent::LocationChange(uri) => {
                for listener in self.navigation_listeners.iter() {
                    listener.on_location_change(session, uri);
                }
            }
            EngineEvent::CanGoBack(value) => {
                for listener in self.navigation_listeners.iter() {
                    listener.on_can_go_back(session, *value);
                }
            }
            EngineEvent::CanGoForward(value) => {
                for listener in self.navigation_listeners.iter() {
                    listener.on_can_go_forward(session, *value);
                }
            }
            EngineEvent::PageStart(uri) => {
                for listener in self.progress_listeners.iter() {
                    listener.on_page_start(session, uri);
                }
            }
            EngineEvent::PageStop { success } => {
                for listener in self.progress_listeners.iter() {
                    listener.on_page_stop(session, *success);
                }
            }
            EngineEvent::SecurityChange { secure } => {
                for listener in self.progress_listeners.iter() {
                    listener.on_security_change(session, *secure);
                }
            }
            EngineEvent::FullScreen(value) => {
                for listener in self.content_listeners.iter() {
                    listener.on_fullscreen(session, *value);
                }
            }
            EngineEvent::TitleChange(title) => {
                for listener in self.content_listeners.iter() {
                    listener.on_title_change(session, title.as_deref());
                }
            }
            EngineEvent::InputActive(value) => {
                for listener in self.content_listeners.iter() {
                    listener.on_input_active(session, *value);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Listener registration
    // ─────────────────────────────────────────────────────────────────────

    pub fn add_navigation_listener(&mut self, listener: Rc<dyn NavigationListener>) -> bool {
        self.navigation_listeners.add(listener)
    }

    pub fn remove_navigation_listener(&mut self, listener: &Rc<dyn NavigationListener>) -> bool {
        self.navigation_listeners.remove(listener)
    }

    pub fn add_progress_listener(&mut self, listener: Rc<dyn ProgressListener>) -> bool {
        self.progress_listeners.add(listener)
    }

    pub fn remove_progress_listener(&mut self, listener: &Rc<dyn ProgressListener>) -> bool {
        self.progress_listeners.remove(listener)
    }

    pub fn add_content_listener(&mut self, listener: Rc<dyn ContentListener>) -> bool {
        self.content_listeners.add(listener)
    }

    pub fn remove_content_listener(&mut self, listener: &Rc<dyn ContentListener>) -> bool {
        self.content_listeners.remove(listener)
    }

    pub fn add_session_change_listener(&mut self, listener: Rc<dyn SessionChangeListener>) -> bool {
        self.session_change_listeners.add(listener)
    }

    pub fn remove_session_change_listener(
        &mut self,
        listener: &Rc<dyn SessionChangeListener>,
    ) -> bool {
        self.session_change_listeners.remove(listener)
    }
}
