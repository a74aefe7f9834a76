//! Two-step directional swipe recognizer.
//!
//! A single swipe only arms the recognizer. The same swipe repeated inside the
//! window triggers navigation: left goes back, right goes forward.
//!
//! ```text
//! Idle ──swipe D──▶ Armed(D) ──swipe D (in window)──▶ navigate, Idle
//!                   Armed(D) ──swipe E ≠ D──────────▶ Armed(E), window restarted
//!                   Armed(D) ──window expires───────▶ Idle
//! ```

use std::time::{Duration, Instant};

use tracing::debug;

use crate::timer::{TimerId, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationIntent {
    Back,
    Forward,
}

impl SwipeDirection {
    fn intent(self) -> NavigationIntent {
        match self {
            Self::Left => NavigationIntent::Back,
            Self::Right => NavigationIntent::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Armed {
        direction: SwipeDirection,
        timer: TimerId,
    },
}

#[derive(Debug)]
pub struct GestureRecognizer {
    state: GestureState,
    window: Duration,
}

impl GestureRecognizer {
    pub fn new(window: Duration) -> Self {
        Self {
            state: GestureState::Idle,
            window,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Feeds one swipe. Returns the navigation to perform, if the swipe
    /// completed a gesture.
    pub fn on_swipe(
        &mut self,
        direction: SwipeDirection,
        now: Instant,
        timers: &mut Timers,
    ) -> Option<NavigationIntent> {
        if let GestureState::Armed { direction: armed, timer } = self.state {
            // A window that ran out but was not ticked yet counts as expired.
            let in_window = timers.is_pending(timer, now);
            timers.cancel(timer);
            if in_window && armed == direction {
                self.state = GestureState::Idle;
                debug!(?direction, "Swipe gesture completed");
                return Some(direction.intent());
            }
        }

        let timer = timers.schedule(now, self.window);
        self.state = GestureState::Armed { direction, timer };
        debug!(?direction, "Swipe gesture armed");
        None
    }

    /// Handles an expired timer. Returns `true` if it was this recognizer's.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        match self.state {
            GestureState::Armed { timer, .. } if timer == id => {
                debug!("Swipe window expired");
                self.state = GestureState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self, timers: &mut Timers) {
        if let GestureState::Armed { timer, .. } = self.state {
            timers.cancel(timer);
        }
        self.state = GestureState::Idle;
    }
}
