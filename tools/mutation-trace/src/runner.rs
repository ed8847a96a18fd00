//! Scenario replay
//!
//! The producer applies scenario steps on the current task while a local
//! consumer task pulls from the observation stream. Both share one thread.
//! The consumer bumps an `armed` counter each time it asks for the next
//! item; after a `flush` that delivered something, the producer waits for
//! that counter to move before editing again, so no notification lands
//! while the consumer has no pull outstanding.

use crate::scenario::{NodeTable, Scenario, ScenarioError};
use dom_mutations::{
    batched_dom_mutations, dom_mutations, AbortController, DomMutationsError, DomMutationsOptions,
    InMemoryDom, MutationRecord,
};
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::{self, LocalSet};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// One event per record instead of one per batch.
    pub flatten: bool,
    /// Stop consuming after this many items.
    pub limit: Option<usize>,
    /// Abort the observation after this many items.
    pub abort_after: Option<usize>,
}

/// One line of trace output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TraceEvent {
    Batch {
        index: usize,
        records: Vec<MutationRecord>,
    },
    Record {
        index: usize,
        record: MutationRecord,
    },
    Aborted {
        reason: String,
    },
    Closed {
        reason: String,
    },
    Error {
        message: String,
    },
}

/// Replay `scenario` and collect what the consumer observed.
pub async fn run(scenario: &Scenario, options: RunOptions) -> Result<Vec<TraceEvent>, ScenarioError> {
    LocalSet::new().run_until(replay(scenario, options)).await
}

async fn replay(scenario: &Scenario, options: RunOptions) -> Result<Vec<TraceEvent>, ScenarioError> {
    let dom = InMemoryDom::new();
    let mut nodes = NodeTable::new(&dom);
    for step in &scenario.setup {
        nodes.apply(step)?;
    }
    // Setup edits are not part of the trace.
    dom.flush();

    let target = nodes.resolve(&scenario.target)?;
    let controller = AbortController::new();
    let adapter_options =
        DomMutationsOptions::new(scenario.options.clone()).with_signal(controller.signal());
    let (done_tx, done_rx) = oneshot::channel();
    let (armed_tx, mut armed_rx) = watch::channel(0u64);

    let consumer = if options.flatten {
        let records = dom_mutations(dom.clone(), target, adapter_options).stream()?;
        task::spawn_local(consume(
            records,
            TraceEvent::record,
            options,
            controller,
            armed_tx,
            done_rx,
        ))
    } else {
        let batches = batched_dom_mutations(dom.clone(), target, adapter_options).stream()?;
        task::spawn_local(consume(
            batches,
            TraceEvent::batch,
            options,
            controller,
            armed_tx,
            done_rx,
        ))
    };
    info!(node = %target, flatten = options.flatten, "Observation started");

    rearmed(&mut armed_rx, 0).await;
    for step in &scenario.steps {
        // The consumer cannot run while a step is applied.
        let mark = *armed_rx.borrow();
        let delivered = nodes.apply(step)?;
        if delivered > 0 {
            debug!(delivered, "Checkpoint delivered notifications");
            rearmed(&mut armed_rx, mark).await;
        }
    }

    // The consumer may have stopped on its own already.
    let _ = done_tx.send(());
    consumer
        .await
        .map_err(|e| ScenarioError::Consumer(e.to_string()))
}

/// Wait until the consumer has asked for another item since `mark`, or
/// has stopped consuming.
async fn rearmed(armed: &mut watch::Receiver<u64>, mark: u64) {
    // Err means the consumer finished and dropped its sender.
    let _ = armed.wait_for(|count| *count > mark).await;
}

impl TraceEvent {
    fn batch(index: usize, records: Vec<MutationRecord>) -> Self {
        Self::Batch { index, records }
    }

    fn record(index: usize, record: MutationRecord) -> Self {
        Self::Record { index, record }
    }
}

async fn consume<St, T>(
    mut stream: St,
    to_event: fn(usize, T) -> TraceEvent,
    options: RunOptions,
    controller: AbortController,
    armed: watch::Sender<u64>,
    mut done: oneshot::Receiver<()>,
) -> Vec<TraceEvent>
where
    St: Stream<Item = Result<T, DomMutationsError>> + Unpin,
{
    let mut events = Vec::new();
    let mut seen = 0;

    loop {
        if options.limit.is_some_and(|limit| seen >= limit) {
            events.push(TraceEvent::Closed {
                reason: "limit reached".to_string(),
            });
            break;
        }

        // The pull is registered before this task next yields.
        armed.send_modify(|count| *count += 1);
        let item = tokio::select! {
            biased;
            item = stream.next() => item,
            _ = &mut done => {
                events.push(TraceEvent::Closed {
                    reason: "end of scenario".to_string(),
                });
                break;
            }
        };

        match item {
            Some(Ok(value)) => {
                events.push(to_event(seen, value));
                seen += 1;
                if options.abort_after == Some(seen) {
                    debug!(seen, "Aborting observation");
                    controller.abort_with(format!("aborted after {seen} items"));
                }
            }
            Some(Err(DomMutationsError::Aborted(reason))) => {
                events.push(TraceEvent::Aborted {
                    reason: reason.to_string(),
                });
                break;
            }
            Some(Err(e)) => {
                events.push(TraceEvent::Error {
                    message: e.to_string(),
                });
                break;
            }
            None => {
                events.push(TraceEvent::Closed {
                    reason: "stream ended".to_string(),
                });
                break;
            }
        }
    }

    // Dropping the stream disconnects the observer.
    drop(stream);
    info!(items = seen, "Observation finished");
    events
}
