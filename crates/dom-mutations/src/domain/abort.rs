//! Cooperative cancellation
//!
//! An [`AbortController`] owns the right to abort; any number of cloned
//! [`AbortSignal`]s observe it. Listeners registered on a signal run
//! synchronously inside [`AbortController::abort`], so work they release
//! (such as a host subscription) is gone by the time `abort` returns.
//!
//! All handles are single-context (`!Send`), matching the host callbacks
//! they are paired with.

use crate::error::DomMutationsError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tokio::sync::watch;
use tracing::debug;

/// Why a signal was aborted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    #[default]
    Unspecified,
    Message(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("This operation was aborted"),
            Self::Message(msg) => f.write_str(msg),
        }
    }
}

impl From<&str> for AbortReason {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}

impl From<String> for AbortReason {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

/// Handle returned by [`AbortSignal::add_abort_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type AbortListener = Box<dyn FnOnce(&AbortReason)>;

struct SignalState {
    /// `Some` once aborted. Also drives [`AbortSignal::aborted`].
    reason: watch::Sender<Option<AbortReason>>,
    listeners: Vec<(ListenerId, AbortListener)>,
    next_listener: u64,
}

/// Read side of an abort controller.
#[derive(Clone)]
pub struct AbortSignal {
    state: Rc<RefCell<SignalState>>,
}

impl AbortSignal {
    fn new() -> Self {
        let (reason, _) = watch::channel(None);
        Self {
            state: Rc::new(RefCell::new(SignalState {
                reason,
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    /// A signal that is already aborted.
    #[must_use]
    pub fn abort(reason: impl Into<AbortReason>) -> Self {
        let controller = AbortController::new();
        controller.abort_with(reason);
        controller.signal()
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.state.borrow().reason.borrow().is_some()
    }

    /// The abort reason, if aborted.
    #[must_use]
    pub fn reason(&self) -> Option<AbortReason> {
        self.state.borrow().reason.borrow().clone()
    }

    /// Fail with [`DomMutationsError::Aborted`] if the signal has fired.
    pub fn throw_if_aborted(&self) -> Result<(), DomMutationsError> {
        match self.reason() {
            Some(reason) => Err(DomMutationsError::Aborted(reason)),
            None => Ok(()),
        }
    }

    /// Register a one-shot listener for the abort transition.
    ///
    /// Like a DOM `abort` event listener, it never runs if the signal is
    /// already aborted when it is added.
    pub fn add_abort_listener<F>(&self, listener: F) -> ListenerId
    where
        F: FnOnce(&AbortReason) + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        if state.reason.borrow().is_none() {
            state.listeners.push((id, Box::new(listener)));
        }
        id
    }

    /// Unregister a listener. Returns `false` if it already ran or was removed.
    pub fn remove_abort_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|(listener, _)| *listener != id);
        state.listeners.len() != before
    }

    /// Number of listeners still waiting for the abort.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Wait until the signal aborts and return the reason.
    pub async fn aborted(&self) -> AbortReason {
        let mut rx = self.state.borrow().reason.subscribe();
        loop {
            if let Some(reason) = rx.borrow_and_update().clone() {
                return reason;
            }
            // The sender lives in `self.state`, which outlives this borrow.
            if rx.changed().await.is_err() {
                return AbortReason::Unspecified;
            }
        }
    }

    fn fire(&self, reason: AbortReason) {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if state.reason.borrow().is_some() {
                return;
            }
            state.reason.send_replace(Some(reason.clone()));
            std::mem::take(&mut state.listeners)
        };

        debug!(%reason, listeners = listeners.len(), "Abort signal fired");

        // Listeners may touch the signal again, so no borrow is held here.
        for (_, listener) in listeners {
            listener(&reason);
        }
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("reason", &self.reason())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Write side: aborts its signal.
#[derive(Clone, Debug)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::new(),
        }
    }

    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort with [`AbortReason::Unspecified`]. Idempotent.
    pub fn abort(&self) {
        self.signal.fire(AbortReason::Unspecified);
    }

    /// Abort with a reason. Only the first abort's reason is kept.
    pub fn abort_with(&self, reason: impl Into<AbortReason>) {
        self.signal.fire(reason.into());
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}
