//! Outbound Ports (Driven Ports)
//!
//! The host environment's change observer. The adapters treat it as a
//! black-box push source: subscribe with a callback, receive batches,
//! disconnect.

use crate::domain::NormalizedOptions;
use crate::error::ObserveError;
use std::fmt;
use std::rc::Rc;

/// Callback a host invokes once per notification with the batch of records
/// it delivers together.
pub struct MutationCallback<R> {
    inner: Rc<dyn Fn(Vec<R>)>,
}

impl<R> MutationCallback<R> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<R>) + 'static,
    {
        Self { inner: Rc::new(f) }
    }

    /// Deliver one batch.
    pub fn call(&self, batch: Vec<R>) {
        (self.inner)(batch);
    }
}

impl<R> Clone for MutationCallback<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<R> fmt::Debug for MutationCallback<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCallback").finish_non_exhaustive()
    }
}

/// A live subscription on the host.
pub trait ObserverHandle {
    /// Stop delivery. After this returns the callback is never invoked
    /// again and any records the host had queued are discarded.
    fn disconnect(&mut self);
}

/// Host change-observer primitive (Driven Port).
pub trait MutationSource {
    /// Node reference the host observes.
    type Target: Clone;

    /// Change record type; passed through to consumers untouched.
    type Record: 'static;

    /// Subscription handle returned by [`MutationSource::observe`].
    type Observer: ObserverHandle + 'static;

    /// Start observing `target`. Every subsequent notification calls
    /// `callback` with one batch until the returned handle is disconnected.
    fn observe(
        &self,
        target: &Self::Target,
        options: &NormalizedOptions,
        callback: MutationCallback<Self::Record>,
    ) -> Result<Self::Observer, ObserveError>;
}
