//! Push-to-pull bridge
//!
//! Turns host callback invocations into answers for queued consumer pulls.
//!
//! ```text
//!            pull                 notify(batch)
//!   Idle ──────────▶ Awaiting ─────────────────▶ Idle (queue drained)
//!    │                  │
//!    │ close / abort    │ close / abort
//!    ▼                  ▼
//!  Closed(Returned | Aborted)
//! ```
//!
//! Every pull is answered exactly once: by the next notification, by
//! `close` (done), or by the abort signal (error). A notification that
//! arrives while no pull is queued is dropped.

use crate::domain::{AbortReason, AbortSignal, ListenerId, ObserveOptions};
use crate::error::DomMutationsError;
use crate::ports::{MutationCallback, MutationSource, ObserverHandle};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Outcome of a single pull: a batch, `None` once closed, or the abort error.
pub type PullResult<R> = Result<Option<Vec<R>>, DomMutationsError>;

static NEXT_OBSERVATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
enum CloseCause {
    Returned,
    Aborted(AbortReason),
}

enum BridgeState<R> {
    Idle,
    Awaiting(VecDeque<oneshot::Sender<PullResult<R>>>),
    Closed(CloseCause),
}

impl<R> BridgeState<R> {
    fn take_pending(self) -> VecDeque<oneshot::Sender<PullResult<R>>> {
        match self {
            Self::Awaiting(queue) => queue,
            Self::Idle | Self::Closed(_) => VecDeque::new(),
        }
    }
}

struct BridgeInner<O: ObserverHandle, R> {
    id: u64,
    state: BridgeState<R>,
    observer: Option<O>,
    signal: Option<(AbortSignal, ListenerId)>,
}

impl<O: ObserverHandle, R> Drop for BridgeInner<O, R> {
    fn drop(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer.disconnect();
            debug!(observation = self.id, "Observer released on drop");
        }
        if let Some((signal, listener)) = self.signal.take() {
            signal.remove_abort_listener(listener);
        }
    }
}

/// Shared handle to one observation.
pub(crate) struct Bridge<O: ObserverHandle, R> {
    inner: Rc<RefCell<BridgeInner<O, R>>>,
}

impl<O, R> Bridge<O, R>
where
    O: ObserverHandle + 'static,
    R: 'static,
{
    /// Subscribe to `target` on `source`.
    ///
    /// Fails before touching the host if the signal is already aborted or
    /// the options are invalid.
    pub(crate) fn connect<S>(
        source: &S,
        target: &S::Target,
        options: &ObserveOptions,
        signal: Option<&AbortSignal>,
    ) -> Result<Self, DomMutationsError>
    where
        S: MutationSource<Observer = O, Record = R>,
    {
        if let Some(signal) = signal {
            signal.throw_if_aborted()?;
        }
        let normalized = options.normalize()?;

        let id = NEXT_OBSERVATION.fetch_add(1, Ordering::Relaxed);
        let inner = Rc::new(RefCell::new(BridgeInner {
            id,
            state: BridgeState::Idle,
            observer: None,
            signal: None,
        }));

        let weak = Rc::downgrade(&inner);
        let callback = MutationCallback::new(move |batch: Vec<R>| {
            if let Some(inner) = weak.upgrade() {
                Self::deliver(&inner, batch);
            }
        });

        let observer = source.observe(target, &normalized, callback)?;
        inner.borrow_mut().observer = Some(observer);

        if let Some(signal) = signal {
            let weak = Rc::downgrade(&inner);
            let listener = signal.add_abort_listener(move |reason| {
                if let Some(inner) = weak.upgrade() {
                    Self::abort(&inner, reason.clone());
                }
            });
            inner.borrow_mut().signal = Some((signal.clone(), listener));
        }

        debug!(observation = id, options = ?normalized, "Observation started");
        Ok(Self { inner })
    }

    /// Queue a pull. Resolves with the next delivered batch.
    pub(crate) fn pull(&self) -> NextBatch<R> {
        let aborted = {
            let inner = self.inner.borrow();
            match &inner.state {
                BridgeState::Closed(CloseCause::Returned) => return NextBatch::ready(Ok(None)),
                BridgeState::Closed(CloseCause::Aborted(reason)) => {
                    return NextBatch::ready(Err(DomMutationsError::Aborted(reason.clone())))
                }
                BridgeState::Idle | BridgeState::Awaiting(_) => {}
            }
            inner.signal.as_ref().and_then(|(signal, _)| signal.reason())
        };

        if let Some(reason) = aborted {
            Self::abort(&self.inner, reason.clone());
            return NextBatch::ready(Err(DomMutationsError::Aborted(reason)));
        }

        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.borrow_mut();
        match &mut inner.state {
            BridgeState::Awaiting(queue) => {
                // Forget pulls whose consumers gave up before a notification.
                queue.retain(|pending| !pending.is_closed());
                queue.push_back(tx);
            }
            state => *state = BridgeState::Awaiting(VecDeque::from([tx])),
        }
        trace!(observation = inner.id, "Pull queued");
        NextBatch::waiting(rx)
    }

    /// Stop observing and answer queued pulls with `None`.
    pub(crate) fn close(&self) {
        let (observer, pending, signal, id) = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.state, BridgeState::Closed(_)) {
                return;
            }
            let previous = std::mem::replace(
                &mut inner.state,
                BridgeState::Closed(CloseCause::Returned),
            );
            (
                inner.observer.take(),
                previous.take_pending(),
                inner.signal.take(),
                inner.id,
            )
        };

        if let Some((signal, listener)) = signal {
            signal.remove_abort_listener(listener);
        }
        if let Some(mut observer) = observer {
            observer.disconnect();
        }

        debug!(observation = id, pending = pending.len(), "Observation closed");
        for tx in pending {
            let _ = tx.send(Ok(None));
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(self.inner.borrow().state, BridgeState::Closed(_))
    }

    /// Whether the observation ended by reaching `close`, as opposed to
    /// being open or aborted.
    pub(crate) fn is_returned(&self) -> bool {
        matches!(
            self.inner.borrow().state,
            BridgeState::Closed(CloseCause::Returned)
        )
    }

    pub(crate) fn pending_pulls(&self) -> usize {
        match &self.inner.borrow().state {
            BridgeState::Awaiting(queue) => queue.iter().filter(|tx| !tx.is_closed()).count(),
            BridgeState::Idle | BridgeState::Closed(_) => 0,
        }
    }

    fn deliver(inner: &Rc<RefCell<BridgeInner<O, R>>>, batch: Vec<R>) {
        let mut guard = inner.borrow_mut();
        let bridge = &mut *guard;
        let records = batch.len();

        let drained = match &mut bridge.state {
            BridgeState::Awaiting(queue) => {
                let mut delivered = false;
                while let Some(tx) = queue.pop_front() {
                    // A consumer that dropped its pull passes the batch on.
                    if tx.is_closed() {
                        continue;
                    }
                    let _ = tx.send(Ok(Some(batch)));
                    delivered = true;
                    break;
                }
                if delivered {
                    trace!(observation = bridge.id, records, "Batch delivered");
                } else {
                    debug!(observation = bridge.id, records, "All pulls abandoned, batch dropped");
                }
                queue.is_empty()
            }
            BridgeState::Idle => {
                debug!(observation = bridge.id, records, "No pending pull, batch dropped");
                false
            }
            BridgeState::Closed(_) => {
                trace!(observation = bridge.id, records, "Notification after close ignored");
                false
            }
        };

        if drained {
            bridge.state = BridgeState::Idle;
        }
    }

    fn abort(inner: &Rc<RefCell<BridgeInner<O, R>>>, reason: AbortReason) {
        let (observer, pending, id) = {
            let mut inner = inner.borrow_mut();
            if matches!(inner.state, BridgeState::Closed(_)) {
                return;
            }
            let previous = std::mem::replace(
                &mut inner.state,
                BridgeState::Closed(CloseCause::Aborted(reason.clone())),
            );
            // The listener has already been consumed by the signal.
            inner.signal = None;
            (inner.observer.take(), previous.take_pending(), inner.id)
        };

        if let Some(mut observer) = observer {
            observer.disconnect();
        }

        debug!(observation = id, %reason, pending = pending.len(), "Observation aborted");
        for tx in pending {
            let _ = tx.send(Err(DomMutationsError::Aborted(reason.clone())));
        }
    }
}

/// Future returned by a pull.
///
/// Resolves to `Ok(Some(batch))`, `Ok(None)` once the observation is
/// closed, or `Err(DomMutationsError::Aborted)`.
#[must_use = "futures do nothing unless polled"]
pub struct NextBatch<R> {
    inner: NextBatchInner<R>,
}

enum NextBatchInner<R> {
    Ready(Option<PullResult<R>>),
    Waiting(oneshot::Receiver<PullResult<R>>),
}

impl<R> NextBatch<R> {
    fn ready(result: PullResult<R>) -> Self {
        Self {
            inner: NextBatchInner::Ready(Some(result)),
        }
    }

    fn waiting(rx: oneshot::Receiver<PullResult<R>>) -> Self {
        Self {
            inner: NextBatchInner::Waiting(rx),
        }
    }
}

// Never pin-projected.
impl<R> Unpin for NextBatch<R> {}

impl<R> Future for NextBatch<R> {
    type Output = PullResult<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            NextBatchInner::Ready(result) => Poll::Ready(result.take().unwrap_or(Ok(None))),
            NextBatchInner::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                // Sender dropped with the bridge: the observation is over.
                Poll::Ready(Err(_)) => Poll::Ready(Ok(None)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}
