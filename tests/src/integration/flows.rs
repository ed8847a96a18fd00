//! # Observation Flows
//!
//! Each emitted batch must match what the host delivered in one
//! notification, in the same order, and the flattened form must preserve
//! both within-batch and batch-to-batch order.

#[cfg(test)]
mod tests {
    use dom_mutations::{
        batched_dom_mutations, dom_mutations, InMemoryDom, MutationCallback, MutationKind,
        MutationRecord, MutationSource, NodeId, ObserveOptions, ObserverHandle,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio_stream::StreamExt;
    use tokio_test::{assert_pending, assert_ready, task};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// `<ul>` with two `<li>` children, attached to the document.
    fn list_fixture() -> (InMemoryDom, NodeId, NodeId, NodeId) {
        let dom = InMemoryDom::new();
        let list = dom.create_element("ul");
        let first = dom.create_element("li");
        let second = dom.create_element("li");
        dom.append_child(dom.document(), list).unwrap();
        dom.append_child(list, first).unwrap();
        dom.append_child(list, second).unwrap();
        dom.flush();
        (dom, list, first, second)
    }

    /// Registers a raw host observer next to the adapter so the two can be
    /// compared batch for batch.
    fn record_raw(
        dom: &InMemoryDom,
        target: NodeId,
        options: &ObserveOptions,
    ) -> (Rc<RefCell<Vec<Vec<MutationRecord>>>>, impl ObserverHandle) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let observer = dom
            .observe(
                &target,
                &options.normalize().unwrap(),
                MutationCallback::new(move |batch: Vec<MutationRecord>| {
                    sink.borrow_mut().push(batch)
                }),
            )
            .unwrap();
        (seen, observer)
    }

    // =============================================================================
    // BATCH CONTENTS
    // =============================================================================

    #[tokio::test]
    async fn test_batches_match_host_notifications() {
        let (dom, list, first, second) = list_fixture();
        let options = ObserveOptions::new()
            .child_list(true)
            .attributes(true)
            .attribute_old_value(true)
            .subtree(true);
        let (raw, mut raw_observer) = record_raw(&dom, list, &options);
        let batches = batched_dom_mutations(dom.clone(), list, options).stream().unwrap();

        let edits: [&dyn Fn(); 3] = [
            &|| {
                dom.set_attribute(first, "class", "done").unwrap();
                dom.set_attribute(first, "class", "todo").unwrap();
            },
            &|| {
                dom.remove_child(list, second).unwrap();
                dom.insert_before(list, second, Some(first)).unwrap();
            },
            &|| {
                let third = dom.create_element("li");
                dom.append_child(list, third).unwrap();
                dom.remove_attribute(first, "class").unwrap();
            },
        ];

        let mut adapted = Vec::new();
        for edit in edits {
            let next = batches.next_batch();
            edit();
            dom.flush();
            adapted.push(next.await.unwrap().unwrap());
        }

        raw_observer.disconnect();
        assert_eq!(adapted, *raw.borrow());
        assert_eq!(adapted[0].len(), 2);
        assert_eq!(adapted[0][1].old_value.as_deref(), Some("done"));
        assert_eq!(adapted[1][0].removed_nodes, vec![second]);
        assert_eq!(adapted[1][1].added_nodes, vec![second]);
        assert_eq!(adapted[1][1].next_sibling, Some(first));
        assert_eq!(adapted[2][1].kind, MutationKind::Attributes);
    }

    #[tokio::test]
    async fn test_subtree_text_changes() {
        let dom = InMemoryDom::new();
        let paragraph = dom.create_element("p");
        let text = dom.create_text("draft");
        dom.append_child(paragraph, text).unwrap();

        let options = ObserveOptions::new()
            .character_data_old_value(true)
            .subtree(true);
        let batches = batched_dom_mutations(dom.clone(), paragraph, options)
            .stream()
            .unwrap();

        let next = batches.next_batch();
        dom.set_data(text, "final").unwrap();
        dom.flush();

        let batch = next.await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, MutationKind::CharacterData);
        assert_eq!(batch[0].target, text);
        assert_eq!(batch[0].old_value.as_deref(), Some("draft"));
        assert_eq!(dom.data(text).as_deref(), Some("final"));
    }

    #[tokio::test]
    async fn test_attribute_filter_limits_batches() {
        let (dom, list, first, _) = list_fixture();
        let options = ObserveOptions::new()
            .attribute_filter(["hidden"])
            .subtree(true);
        let mut records = dom_mutations(dom.clone(), list, options).stream().unwrap();

        let mut next = task::spawn(records.next_record());
        assert_pending!(next.poll());

        dom.set_attribute(first, "class", "ignored").unwrap();
        dom.flush();
        assert_pending!(next.poll());

        dom.set_attribute(first, "hidden", "").unwrap();
        dom.flush();
        let record = assert_ready!(next.poll()).unwrap().unwrap();
        assert_eq!(record.attribute_name.as_deref(), Some("hidden"));
        assert_eq!(record.target, first);
    }

    // =============================================================================
    // FLATTENING
    // =============================================================================

    #[tokio::test]
    async fn test_flattened_order_across_batches() {
        let dom = InMemoryDom::new();
        let root = dom.create_element("div");
        let mut records = dom_mutations(
            dom.clone(),
            root,
            ObserveOptions::new().attributes(true),
        )
        .stream()
        .unwrap();

        let mut expected = Vec::new();
        let mut observed = Vec::new();
        for round in 0..3 {
            let mut next = task::spawn(records.next());
            assert_pending!(next.poll());
            for i in 0..=round {
                let name = format!("data-{round}-{i}");
                dom.set_attribute(root, &name, "x").unwrap();
                expected.push(name);
            }
            dom.flush();
            let record = assert_ready!(next.poll()).unwrap().unwrap();
            drop(next);
            observed.push(record.attribute_name.unwrap());

            while records.buffered() > 0 {
                let record = records.next().await.unwrap().unwrap();
                observed.push(record.attribute_name.unwrap());
            }
        }

        assert_eq!(observed, expected);
    }

    #[tokio::test]
    async fn test_independent_streams_from_one_recipe() {
        let (dom, list, first, _) = list_fixture();
        let recipe = batched_dom_mutations(dom.clone(), list, ObserveOptions::new().child_list(true));

        let a = recipe.stream().unwrap();
        let b = recipe.stream().unwrap();
        assert_eq!(dom.observer_count(), 2);

        let next_a = a.next_batch();
        let next_b = b.next_batch();
        dom.remove_child(list, first).unwrap();
        dom.flush();

        assert_eq!(next_a.await.unwrap().unwrap(), next_b.await.unwrap().unwrap());

        drop(a);
        assert_eq!(dom.observer_count(), 1);
        drop(b);
        assert_eq!(dom.observer_count(), 0);
    }
}
