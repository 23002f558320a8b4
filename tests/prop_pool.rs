mod support;

use std::time::Duration;

use aveza_pool::Pool;
use proptest::prelude::*;
use support::StubManager;

#[derive(Debug, Clone, Copy)]
enum Action {
    Acquire,
    Release,
    ReleaseInvalidated,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => Just(Action::Acquire),
        2 => Just(Action::Release),
        1 => Just(Action::ReleaseInvalidated),
    ]
}

proptest! {
    /// P1 (spec.md §8): for any interleaving of acquire/release, the pool
    /// never reports more live connections than `max_size` allows. This runs
    /// the actions serially against one pool instance — it is not a
    /// concurrency test (those are in `tests/pool.rs`) but an exhaustive
    /// check of the admission/release bookkeeping across arbitrary action
    /// sequences, including runs that release more than were acquired.
    #[test]
    fn live_count_never_exceeds_max_size(
        max_size in 1u32..6,
        actions in prop::collection::vec(action_strategy(), 0..40),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let max_observed = rt.block_on(async move {
            let manager = StubManager::new();
            let pool = Pool::new(manager, max_size, Duration::from_secs(10));
            let mut held = Vec::new();
            let mut max_observed = 0u32;

            for action in actions {
                match action {
                    Action::Acquire => {
                        // Bound the wait: at capacity with nothing concurrently
                        // releasing, a plain `.await` here would hang forever.
                        // A timeout models a cancelled waiter, which the pool
                        // must already tolerate (spec.md §5 "Cancellation").
                        if let Ok(Ok(conn)) =
                            tokio::time::timeout(Duration::from_millis(5), pool.get()).await
                        {
                            held.push(conn);
                        }
                    }
                    Action::Release => {
                        if !held.is_empty() {
                            held.remove(0);
                        }
                    }
                    Action::ReleaseInvalidated => {
                        if !held.is_empty() {
                            let mut conn = held.remove(0);
                            conn.invalidate();
                        }
                    }
                }

                max_observed = max_observed.max(pool.state().connections);
            }

            max_observed
        });

        prop_assert!(max_observed <= max_size);
    }
}
