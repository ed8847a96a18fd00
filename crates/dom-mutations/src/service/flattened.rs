//! Flattening adapter
//!
//! Re-exposes batches as individual records. Suspension, cancellation and
//! early termination all come from the underlying [`MutationBatches`].

use crate::error::DomMutationsError;
use crate::ports::MutationSource;
use crate::service::batched::{
    batched_dom_mutations, BatchedDomMutations, DomMutationsOptions, MutationBatches,
};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio_stream::Stream;

/// Observe `target` and yield individual change records.
///
/// # Example
///
/// ```
/// use dom_mutations::{dom_mutations, InMemoryDom, ObserveOptions};
/// use tokio_test::{assert_pending, assert_ready, task};
///
/// let dom = InMemoryDom::new();
/// let list = dom.create_element("ul");
/// let mut records =
///     dom_mutations(dom.clone(), list, ObserveOptions::new().child_list(true)).stream()?;
///
/// let mut next = task::spawn(records.next_record());
/// assert_pending!(next.poll());
///
/// let item = dom.create_element("li");
/// dom.append_child(list, item)?;
/// dom.flush();
///
/// let record = assert_ready!(next.poll())?.expect("one record");
/// assert_eq!(record.added_nodes, vec![item]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn dom_mutations<S: MutationSource>(
    source: S,
    target: S::Target,
    options: impl Into<DomMutationsOptions>,
) -> DomMutations<S> {
    DomMutations {
        batched: batched_dom_mutations(source, target, options),
    }
}

/// Recipe for record streams over one target.
pub struct DomMutations<S: MutationSource> {
    batched: BatchedDomMutations<S>,
}

impl<S: MutationSource> DomMutations<S> {
    /// Start an independent observation.
    ///
    /// Fails like [`BatchedDomMutations::stream`].
    pub fn stream(&self) -> Result<MutationRecords<S>, DomMutationsError> {
        Ok(MutationRecords {
            batches: self.batched.stream()?,
            buffer: VecDeque::new(),
        })
    }

    /// The underlying batch recipe.
    pub fn batched(&self) -> &BatchedDomMutations<S> {
        &self.batched
    }
}

/// A live observation yielding one record at a time.
pub struct MutationRecords<S: MutationSource> {
    batches: MutationBatches<S>,
    /// Rest of the batch currently being yielded.
    buffer: VecDeque<S::Record>,
}

// Never pin-projected.
impl<S: MutationSource> Unpin for MutationRecords<S> {}

impl<S: MutationSource> MutationRecords<S> {
    /// Next record, pulling a new batch once the current one is exhausted.
    pub async fn next_record(&mut self) -> Result<Option<S::Record>, DomMutationsError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            match self.batches.next_batch().await? {
                Some(batch) => self.buffer.extend(batch),
                None => return Ok(None),
            }
        }
    }

    /// Stop observing and discard the rest of the current batch.
    pub fn close(&mut self) {
        self.batches.close();
        self.buffer.clear();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.batches.is_closed()
    }

    /// Records already received but not yet yielded.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl<S: MutationSource> Stream for MutationRecords<S> {
    type Item = Result<S::Record, DomMutationsError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(record) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(record)));
            }
            match ready!(Pin::new(&mut this.batches).poll_next(cx)) {
                Some(Ok(batch)) => this.buffer.extend(batch),
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => return Poll::Ready(None),
            }
        }
    }
}

impl<S: MutationSource> fmt::Debug for MutationRecords<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationRecords")
            .field("batches", &self.batches)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
