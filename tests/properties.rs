// tests/properties.rs

use assetflow::engine::{
    ReactorCommand, ReactorCore, ReactorEvent, ReactorOptions, RunOutcome, TriggerQueue,
    TriggerReason, TriggerWhileRunningBehaviour,
};
use assetflow::pipeline::compose;
use assetflow_test_utils::builders::ConfigBuilder;
use proptest::prelude::*;

fn path_strategy() -> impl Strategy<Value = String> {
    "[a-d]\\.sass"
}

#[derive(Debug, Clone)]
enum Input {
    Trigger(String),
    Complete,
}

fn input_strategy() -> impl Strategy<Value = Input> {
    prop_oneof![
        3 => path_strategy().prop_map(Input::Trigger),
        2 => Just(Input::Complete),
    ]
}

// Pipeline i may reference any pipeline j < i, so the result is acyclic.
// `None` stands for the `clean:all` stage step.
fn nested_pipelines(max: usize) -> impl Strategy<Value = Vec<Vec<Option<usize>>>> {
    (1..=max).prop_flat_map(|count| {
        proptest::collection::vec(
            proptest::collection::vec(proptest::option::of(any::<usize>()), 1..4),
            count,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, items)| {
                    items
                        .into_iter()
                        .map(|item| item.filter(|_| i > 0).map(|j| j % i.max(1)))
                        .collect()
                })
                .collect()
        })
    })
}

fn expected_stage_count(pipelines: &[Vec<Option<usize>>], index: usize) -> usize {
    pipelines[index]
        .iter()
        .map(|item| match item {
            None => 1,
            Some(j) => expected_stage_count(pipelines, *j),
        })
        .sum()
}

proptest! {
    #[test]
    fn queue_never_holds_more_than_max_runs(
        paths in proptest::collection::vec(path_strategy(), 0..30),
        max_runs in 0usize..4,
        cancel in any::<bool>(),
    ) {
        let behaviour = if cancel {
            TriggerWhileRunningBehaviour::Cancel
        } else {
            TriggerWhileRunningBehaviour::Queue
        };
        let mut queue = TriggerQueue::new(behaviour, max_runs);

        for path in &paths {
            queue.record_trigger(path);
            prop_assert!(queue.len() <= max_runs.max(1));
        }

        let drained = queue.drain_pending();
        prop_assert!(queue.is_empty());
        prop_assert!(drained.windows(2).all(|w| w[0] < w[1]));

        match (cancel, paths.last()) {
            (_, None) => prop_assert!(drained.is_empty()),
            (true, Some(last)) => prop_assert_eq!(drained, vec![last.clone()]),
            (false, Some(_)) => {
                let mut expected = paths.clone();
                expected.sort();
                expected.dedup();
                prop_assert_eq!(drained, expected);
            }
        }
    }

    #[test]
    fn reactor_never_starts_overlapping_runs(
        inputs in proptest::collection::vec(input_strategy(), 0..40),
    ) {
        let mut core = ReactorCore::new(
            "styles",
            TriggerWhileRunningBehaviour::Queue,
            1,
            ReactorOptions::default(),
        );
        let mut in_flight = 0u32;
        let mut triggers_seen = false;

        for input in inputs {
            let event = match input {
                Input::Trigger(path) => {
                    triggers_seen = true;
                    ReactorEvent::Triggered { path, reason: TriggerReason::FileWatch }
                }
                Input::Complete => {
                    // Only the backend completes runs, and only running ones.
                    if in_flight == 0 {
                        continue;
                    }
                    in_flight -= 1;
                    ReactorEvent::RunCompleted { outcome: RunOutcome::Success }
                }
            };

            let step = core.step(event);
            for command in step.commands {
                if let ReactorCommand::StartRun { changed } = command {
                    prop_assert!(!changed.is_empty());
                    in_flight += 1;
                }
            }
            prop_assert!(in_flight <= 1);
            prop_assert_eq!(core.is_running(), in_flight == 1);
        }

        prop_assert_eq!(core.runs_started() > 0, triggers_seen);
    }

    #[test]
    fn nested_pipelines_flatten_in_order(pipelines in nested_pipelines(6)) {
        let mut builder = ConfigBuilder::new()
            .root("/p")
            .task("clean", "all", "patterns = [\"dist/**\"]");
        for (i, items) in pipelines.iter().enumerate() {
            let steps: Vec<String> = items
                .iter()
                .map(|item| match item {
                    None => "clean:all".to_string(),
                    Some(j) => format!("p{j}"),
                })
                .collect();
            let steps: Vec<&str> = steps.iter().map(String::as_str).collect();
            builder = builder.pipeline(&format!("p{i}"), &steps);
        }
        let project = builder.try_build()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        for index in 0..pipelines.len() {
            let resolved = compose(&project, &format!("p{index}"))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(resolved.steps.len(), expected_stage_count(&pipelines, index));
            prop_assert!(resolved.watch_step().is_none());
        }
    }
}
