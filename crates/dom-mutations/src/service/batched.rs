//! Batch adapter
//!
//! Each item is the ordered list of records one host notification delivered.

use crate::domain::{AbortSignal, ObserveOptions};
use crate::error::DomMutationsError;
use crate::ports::MutationSource;
use crate::service::bridge::{Bridge, NextBatch};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_stream::Stream;

/// Observation options plus an optional abort signal.
#[derive(Clone, Debug, Default)]
pub struct DomMutationsOptions {
    pub observe: ObserveOptions,
    pub signal: Option<AbortSignal>,
}

impl DomMutationsOptions {
    #[must_use]
    pub fn new(observe: ObserveOptions) -> Self {
        Self {
            observe,
            signal: None,
        }
    }

    #[must_use]
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

impl From<ObserveOptions> for DomMutationsOptions {
    fn from(observe: ObserveOptions) -> Self {
        Self::new(observe)
    }
}

/// Observe `target` and yield change-batches.
///
/// Nothing is subscribed until [`BatchedDomMutations::stream`] is called.
pub fn batched_dom_mutations<S: MutationSource>(
    source: S,
    target: S::Target,
    options: impl Into<DomMutationsOptions>,
) -> BatchedDomMutations<S> {
    BatchedDomMutations {
        source,
        target,
        options: options.into(),
    }
}

/// Recipe for batch streams over one target.
pub struct BatchedDomMutations<S: MutationSource> {
    source: S,
    target: S::Target,
    options: DomMutationsOptions,
}

impl<S: MutationSource> BatchedDomMutations<S> {
    /// Start an independent observation.
    ///
    /// # Errors
    ///
    /// - [`DomMutationsError::Aborted`] if the signal has already fired; the
    ///   host is not touched.
    /// - [`DomMutationsError::Observe`] if the options are invalid or the
    ///   host refuses the subscription.
    pub fn stream(&self) -> Result<MutationBatches<S>, DomMutationsError> {
        let bridge = Bridge::connect(
            &self.source,
            &self.target,
            &self.options.observe,
            self.options.signal.as_ref(),
        )?;
        Ok(MutationBatches {
            bridge,
            in_flight: None,
        })
    }

    pub fn target(&self) -> &S::Target {
        &self.target
    }

    pub fn options(&self) -> &DomMutationsOptions {
        &self.options
    }
}

/// A live observation yielding change-batches.
///
/// Dropping it releases the host subscription.
pub struct MutationBatches<S: MutationSource> {
    bridge: Bridge<S::Observer, S::Record>,
    /// Pull owned by the `Stream` implementation.
    in_flight: Option<NextBatch<S::Record>>,
}

// Never pin-projected.
impl<S: MutationSource> Unpin for MutationBatches<S> {}

impl<S: MutationSource> MutationBatches<S> {
    /// Request the next batch.
    ///
    /// Requests queue up and are answered oldest first. Resolves to
    /// `Ok(None)` once closed and to [`DomMutationsError::Aborted`] on every
    /// request after the signal fires. Only notifications that happen while
    /// a request is outstanding are seen.
    pub fn next_batch(&self) -> NextBatch<S::Record> {
        self.bridge.pull()
    }

    /// Stop observing. Outstanding requests resolve to `Ok(None)`.
    pub fn close(&self) {
        self.bridge.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.bridge.is_closed()
    }

    /// Requests waiting for a notification.
    #[must_use]
    pub fn pending_pulls(&self) -> usize {
        self.bridge.pending_pulls()
    }
}

impl<S: MutationSource> Stream for MutationBatches<S> {
    type Item = Result<Vec<S::Record>, DomMutationsError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.in_flight.is_none() && this.bridge.is_returned() {
            return Poll::Ready(None);
        }

        let pull = this.in_flight.get_or_insert_with(|| this.bridge.pull());
        match Pin::new(pull).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                this.in_flight = None;
                Poll::Ready(result.transpose())
            }
        }
    }
}

impl<S: MutationSource> Drop for MutationBatches<S> {
    fn drop(&mut self) {
        self.bridge.close();
    }
}

impl<S: MutationSource> fmt::Debug for MutationBatches<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationBatches")
            .field("closed", &self.is_closed())
            .field("pending_pulls", &self.pending_pulls())
            .finish()
    }
}
