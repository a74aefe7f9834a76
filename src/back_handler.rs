//! Last-in-first-out stack of back-button interceptors.

use tracing::debug;

/// Interceptors for the back button, newest on top.
///
/// A handler may be pushed more than once; [`BackHandlerStack::pop`] removes
/// its most recent registration only.
#[derive(Debug)]
pub struct BackHandlerStack<H> {
    handlers: Vec<H>,
}

impl<H> Default for BackHandlerStack<H> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<H: PartialEq + std::fmt::Debug> BackHandlerStack<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: H) {
        debug!(?handler, depth = self.handlers.len() + 1, "Back handler pushed");
        self.handlers.push(handler);
    }

    /// Removes the most recent registration of `handler`. Returns `false` if
    /// it was not registered.
    pub fn pop(&mut self, handler: &H) -> bool {
        match self.handlers.iter().rposition(|h| h == handler) {
            Some(index) => {
                self.handlers.remove(index);
                debug!(?handler, depth = self.handlers.len(), "Back handler popped");
                true
            }
            None => false,
        }
    }

    pub fn top(&self) -> Option<&H> {
        self.handlers.last()
    }

    /// Handler that should consume the next back press, if any.
    ///
    /// The handler stays registered: it pops itself once its mode ends.
    pub fn on_back(&self) -> Option<&H> {
        let handler = self.top();
        if let Some(handler) = handler {
            debug!(?handler, "Back press routed to handler");
        }
        handler
    }

    pub fn contains(&self, handler: &H) -> bool {
        self.handlers.contains(handler)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
