//! # Scenario Replay
//!
//! Runs the scenario files shipped with mutation-trace end to end.

#[cfg(test)]
mod tests {
    use dom_mutations::MutationKind;
    use mutation_trace::{check_options, run, RunOptions, Scenario, TraceEvent};

    const TODO_LIST: &str = include_str!("../../../tools/mutation-trace/scenarios/todo-list.json");
    const OPTIONS: &str = include_str!("../../../tools/mutation-trace/scenarios/options.json");

    fn batches(events: &[TraceEvent]) -> Vec<Vec<MutationKind>> {
        events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Batch { records, .. } => {
                    Some(records.iter().map(|r| r.kind).collect())
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_todo_list_batches() {
        let scenario = Scenario::from_json(TODO_LIST).unwrap();
        let events = run(&scenario, RunOptions::default()).await.unwrap();

        assert_eq!(
            batches(&events),
            vec![
                vec![MutationKind::ChildList],
                vec![MutationKind::Attributes, MutationKind::CharacterData],
                vec![MutationKind::ChildList, MutationKind::ChildList],
            ]
        );
        assert!(matches!(events.last(), Some(TraceEvent::Closed { .. })));
    }

    #[tokio::test]
    async fn test_todo_list_flattened_matches_batches() {
        let scenario = Scenario::from_json(TODO_LIST).unwrap();
        let batched = run(&scenario, RunOptions::default()).await.unwrap();
        let flattened = run(
            &scenario,
            RunOptions {
                flatten: true,
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();

        let from_batches: Vec<_> = batched
            .into_iter()
            .filter_map(|event| match event {
                TraceEvent::Batch { records, .. } => Some(records),
                _ => None,
            })
            .flatten()
            .collect();
        let from_records: Vec<_> = flattened
            .into_iter()
            .filter_map(|event| match event {
                TraceEvent::Record { record, .. } => Some(record),
                _ => None,
            })
            .collect();

        assert_eq!(from_batches.len(), 5);
        assert_eq!(from_batches, from_records);
    }

    #[tokio::test]
    async fn test_limit_stops_observation() {
        let scenario = Scenario::from_json(TODO_LIST).unwrap();
        let options = RunOptions {
            limit: Some(1),
            ..RunOptions::default()
        };
        let events = run(&scenario, options).await.unwrap();

        assert_eq!(batches(&events).len(), 1);
        assert_eq!(
            events.last(),
            Some(&TraceEvent::Closed {
                reason: "limit reached".to_string()
            })
        );
    }

    #[test]
    fn test_options_file_normalizes() {
        let normalized = check_options(OPTIONS).unwrap();
        assert!(normalized.attributes);
        assert!(normalized.attribute_old_value);
        assert!(normalized.subtree);
        assert!(!normalized.child_list);
        assert!(normalized.accepts_attribute("hidden"));
        assert!(!normalized.accepts_attribute("id"));
    }
}
