//! # Cancellation and Early Termination
//!
//! Tests that the host subscription is released on every exit path:
//! stopping early, closing, dropping, and aborting through a signal.

#[cfg(test)]
mod tests {
    use dom_mutations::{
        batched_dom_mutations, dom_mutations, AbortController, AbortReason, AbortSignal,
        DomMutationsError, DomMutationsOptions, InMemoryDom, NodeId, ObserveOptions,
    };
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    fn observed_div() -> (InMemoryDom, NodeId) {
        let dom = InMemoryDom::new();
        let div = dom.create_element("div");
        (dom, div)
    }

    fn with_signal(signal: AbortSignal) -> DomMutationsOptions {
        DomMutationsOptions::new(ObserveOptions::new().attributes(true)).with_signal(signal)
    }

    // =============================================================================
    // EARLY TERMINATION
    // =============================================================================

    #[tokio::test]
    async fn test_stopping_early_releases_subscription() {
        let (dom, div) = observed_div();
        let mut records = dom_mutations(dom.clone(), div, ObserveOptions::new().attributes(true))
            .stream()
            .unwrap();

        let mut next = task::spawn(records.next());
        assert_pending!(next.poll());
        dom.set_attribute(div, "a", "1").unwrap();
        dom.set_attribute(div, "b", "1").unwrap();
        dom.flush();
        assert!(assert_ready!(next.poll()).is_some());
        drop(next);

        // Stop after the first record, like `break` in a for-await loop.
        drop(records);
        assert_eq!(dom.observer_count(), 0);

        dom.set_attribute(div, "c", "1").unwrap();
        assert_eq!(dom.pending_records(), 0);
        assert_eq!(dom.flush(), 0);
    }

    #[tokio::test]
    async fn test_close_finishes_outstanding_requests() {
        let (dom, div) = observed_div();
        let mut batches =
            batched_dom_mutations(dom.clone(), div, ObserveOptions::new().attributes(true))
                .stream()
                .unwrap();

        let waiting = batches.next_batch();
        batches.close();
        assert!(batches.is_closed());
        assert_eq!(waiting.await, Ok(None));
        assert_eq!(batches.next().await, None);
        assert_eq!(dom.observer_count(), 0);
    }

    // =============================================================================
    // ABORT SIGNAL
    // =============================================================================

    #[tokio::test]
    async fn test_pre_aborted_signal_fails_before_subscribing() {
        let (dom, div) = observed_div();
        let signal = AbortSignal::abort("already cancelled");

        let batched = batched_dom_mutations(dom.clone(), div, with_signal(signal.clone())).stream();
        assert_eq!(
            batched.err(),
            Some(DomMutationsError::Aborted(AbortReason::from(
                "already cancelled"
            )))
        );

        let flattened = dom_mutations(dom.clone(), div, with_signal(signal)).stream();
        assert!(flattened.is_err_and(|e| e.is_aborted()));
        assert_eq!(dom.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_abort_mid_iteration_fails_every_pull() {
        let (dom, div) = observed_div();
        let controller = AbortController::new();
        let mut batches = batched_dom_mutations(dom.clone(), div, with_signal(controller.signal()))
            .stream()
            .unwrap();

        let next = batches.next_batch();
        dom.set_attribute(div, "before", "1").unwrap();
        dom.flush();
        assert!(next.await.unwrap().is_some());

        let in_flight = batches.next_batch();
        let queued = batches.next_batch();
        controller.abort_with("user left the page");

        let expected = DomMutationsError::Aborted(AbortReason::from("user left the page"));
        assert_eq!(in_flight.await, Err(expected.clone()));
        assert_eq!(queued.await, Err(expected.clone()));
        assert_eq!(batches.next_batch().await, Err(expected.clone()));
        assert_eq!(batches.next().await, Some(Err(expected)));
        assert_eq!(dom.observer_count(), 0);

        // No callback fires for later edits.
        dom.set_attribute(div, "after", "1").unwrap();
        assert_eq!(dom.flush(), 0);
    }

    #[tokio::test]
    async fn test_abort_wakes_suspended_consumer() {
        let (dom, div) = observed_div();
        let controller = AbortController::new();
        let mut records = dom_mutations(dom.clone(), div, with_signal(controller.signal()))
            .stream()
            .unwrap();
        let signal = controller.signal();

        let consumer = async {
            let result = records.next_record().await;
            (result, records.is_closed())
        };
        let aborter = async {
            tokio::task::yield_now().await;
            controller.abort();
        };

        let ((result, closed), ()) = timeout(Duration::from_secs(1), async {
            tokio::join!(consumer, aborter)
        })
        .await
        .unwrap();

        assert!(result.unwrap_err().is_aborted());
        assert!(closed);
        assert!(signal.is_aborted());
        assert_eq!(signal.listener_count(), 0);
        assert_eq!(dom.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_close_then_abort_stays_closed() {
        let (dom, div) = observed_div();
        let controller = AbortController::new();
        let batches = batched_dom_mutations(dom.clone(), div, with_signal(controller.signal()))
            .stream()
            .unwrap();

        batches.close();
        assert_eq!(controller.signal().listener_count(), 0);
        controller.abort();
        assert_eq!(batches.next_batch().await, Ok(None));
    }
}
