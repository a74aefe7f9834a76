//! In-process engine without a renderer.
//!
//! `HeadlessEngine` keeps a per-session history, records every call it
//! receives and queues the notifications a real engine would emit. The host
//! drains them with [`HeadlessEngine::take_events`] and feeds them to
//! [`crate::session::SessionStore::handle_engine_event`].

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use euclid::default::Size2D;
use tracing::{debug, trace};
use url::Url;

use crate::engine::{
    DisplayId, Engine, EngineError, EngineEvent, EngineSession, KeyEvent, PointerEvent,
};
use crate::session::{SessionId, SessionSettings};

/// A call received by a headless session.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Create { session: SessionId, private: bool },
    AcquireDisplay { session: SessionId, size: Size2D<u32> },
    ResizeDisplay { session: SessionId, display: DisplayId, size: Size2D<u32> },
    ReleaseDisplay { session: SessionId, display: DisplayId },
    Pointer { session: SessionId, event: PointerEvent },
    AttachTextInput(SessionId),
    DetachTextInput(SessionId),
    Key { session: SessionId, event: KeyEvent },
    GoBack(SessionId),
    GoForward(SessionId),
    Reload(SessionId),
    Stop(SessionId),
    Load { session: SessionId, uri: Url },
    ExitFullscreen(SessionId),
    Close(SessionId),
}

#[derive(Default)]
struct Shared {
    calls: RefCell<Vec<EngineCall>>,
    events: RefCell<Vec<(SessionId, EngineEvent)>>,
    fullscreen: RefCell<HashSet<SessionId>>,
    next_display: Cell<u32>,
}

impl Shared {
    fn record(&self, call: EngineCall) {
        trace!(?call, "Engine call");
        self.calls.borrow_mut().push(call);
    }

    fn emit(&self, session: SessionId, event: EngineEvent) {
        self.events.borrow_mut().push((session, event));
    }
}

/// Cheap to clone: clones share the same call log and event queue.
#[derive(Clone, Default)]
pub struct HeadlessEngine {
    shared: Rc<Shared>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.shared.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.shared.calls.borrow_mut().clear();
    }

    /// Takes the notifications emitted since the last call.
    pub fn take_events(&self) -> Vec<(SessionId, EngineEvent)> {
        std::mem::take(&mut *self.shared.events.borrow_mut())
    }

    /// Queues a notification as if the engine emitted it on its own.
    pub fn emit(&self, session: SessionId, event: EngineEvent) {
        self.shared.emit(session, event);
    }

    /// Simulates the page of `session` requesting fullscreen.
    pub fn request_fullscreen(&self, session: SessionId) {
        if self.shared.fullscreen.borrow_mut().insert(session) {
            self.shared.emit(session, EngineEvent::FullScreen(true));
        }
    }
}

impl Engine for HeadlessEngine {
    fn create_session(
        &self,
        id: SessionId,
        settings: &SessionSettings,
    ) -> Result<Rc<dyn EngineSession>, EngineError> {
        self.shared.record(EngineCall::Create {
            session: id,
            private: settings.private_mode,
        });
        debug!(%id, "Headless session created");
        Ok(Rc::new(HeadlessSession {
            id,
            shared: self.shared.clone(),
            history: RefCell::new(History::default()),
            closed: Cell::new(false),
        }))
    }
}

#[derive(Default)]
struct History {
    entries: Vec<Url>,
    index: usize,
}

impl History {
    fn current(&self) -> Option<&Url> {
        self.entries.get(self.index)
    }

    fn can_go_back(&self) -> bool {
        !self.entries.is_empty() && self.index > 0
    }

    fn can_go_forward(&self) -> bool {
        self.index + 1 < self.entries.len()
    }
}

struct HeadlessSession {
    id: SessionId,
    shared: Rc<Shared>,
    history: RefCell<History>,
    closed: Cell<bool>,
}

impl HeadlessSession {
    /// Emits the notification sequence of a completed navigation.
    fn navigated(&self) {
        let (uri, back, forward) = {
            let history = self.history.borrow();
            let Some(uri) = history.current().cloned() else {
                return;
            };
            (uri, history.can_go_back(), history.can_go_forward())
        };
        let secure = uri.scheme() == "https";
        self.shared.emit(self.id, EngineEvent::PageStart(uri.clone()));
        self.shared.emit(self.id, EngineEvent::LocationChange(uri));
        self.shared.emit(self.id, EngineEvent::CanGoBack(back));
        self.shared.emit(self.id, EngineEvent::CanGoForward(forward));
        self.shared.emit(self.id, EngineEvent::PageStop { success: true });
        self.shared.emit(self.id, EngineEvent::SecurityChange { secure });
    }
}

impl EngineSession for HeadlessSession {
    fn acquire_display(&self, size: Size2D<u32>) -> Result<DisplayId, EngineError> {
        if self.closed.get() {
            return Err(EngineError::SessionClosed(self.id));
        }
        if size.is_empty() {
            return Err(EngineError::DisplayUnavailable(format!(
                "empty surface {}x{}",
                size.width, size.height
            )));
        }
        self.shared.record(EngineCall::AcquireDisplay {
            session: self.id,
            size,
        });
        let next = self.shared.next_display.get() + 1;
        self.shared.next_display.set(next);
        Ok(DisplayId(next))
    }

    fn resize_display(&self, display: DisplayId, size: Size2D<u32>) -> Result<(), EngineError> {
        if self.closed.get() {
            return Err(EngineError::SessionClosed(self.id));
        }
        self.shared.record(EngineCall::ResizeDisplay {
            session: self.id,
            display,
            size,
        });
        Ok(())
    }

    fn release_display(&self, display: DisplayId) {
        self.shared.record(EngineCall::ReleaseDisplay {
            session: self.id,
            display,
        });
    }

    fn pointer_event(&self, event: PointerEvent) {
        self.shared.record(EngineCall::Pointer {
            session: self.id,
            event,
        });
    }

    fn attach_text_input(&self) {
        self.shared.record(EngineCall::AttachTextInput(self.id));
    }

    fn detach_text_input(&self) {
        self.shared.record(EngineCall::DetachTextInput(self.id));
    }

    fn key_event(&self, event: KeyEvent) -> bool {
        self.shared.record(EngineCall::Key {
            session: self.id,
            event,
        });
        !self.closed.get()
    }

    fn go_back(&self) {
        self.shared.record(EngineCall::GoBack(self.id));
        let moved = {
            let mut history = self.history.borrow_mut();
            if history.can_go_back() {
                history.index -= 1;
                true
            } else {
                false
            }
        };
        if moved {
            self.navigated();
        }
    }

    fn go_forward(&self) {
        self.shared.record(EngineCall::GoForward(self.id));
        let moved = {
            let mut history = self.history.borrow_mut();
            if history.can_go_forward() {
                history.index += 1;
                true
            } else {
                false
            }
        };
        if moved {
            self.navigated();
        }
    }

    fn reload(&self) {
        self.shared.record(EngineCall::Reload(self.id));
        self.navigated();
    }

    fn stop(&self) {
        self.shared.record(EngineCall::Stop(self.id));
        self.shared
            .emit(self.id, EngineEvent::PageStop { success: false });
    }

    fn load(&self, uri: &Url) -> Result<(), EngineError> {
        if self.closed.get() {
            return Err(EngineError::SessionClosed(self.id));
        }
        self.shared.record(EngineCall::Load {
            session: self.id,
            uri: uri.clone(),
        });
        {
            let mut history = self.history.borrow_mut();
            if !history.entries.is_empty() {
                let keep = history.index + 1;
                history.entries.truncate(keep);
            }
            history.entries.push(uri.clone());
            history.index = history.entries.len() - 1;
        }
        self.navigated();
        Ok(())
    }

    fn exit_fullscreen(&self) {
        self.shared.record(EngineCall::ExitFullscreen(self.id));
        if self.shared.fullscreen.borrow_mut().remove(&self.id) {
            self.shared.emit(self.id, EngineEvent::FullScreen(false));
        }
    }

    fn close(&self) {
        self.shared.record(EngineCall::Close(self.id));
        self.closed.set(true);
    }
}
