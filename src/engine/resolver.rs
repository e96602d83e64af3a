//! Existence resolution.
//!
//! Given a spec with no bound identifier, search the remote inventory by
//! display name + scope and return the id of a non-terminal existing
//! instance. Display names are expected unique per scope, so the query asks
//! the remote service for a single item and the first match in the "exists"
//! set wins.

use tracing::debug;

use crate::remote::{LifecycleState, RemoteApi, RemoteError};

/// Lifecycle states under which an instance counts as "existing" for
/// discovery. Never includes Deleted or Failed.
pub const DEFAULT_EXISTS_STATES: &[LifecycleState] = &[
    LifecycleState::Creating,
    LifecycleState::Active,
    LifecycleState::Updating,
];

/// Resolve the remote id for (`scope`, `display_name`), or `None` when no
/// non-terminal instance exists.
///
/// An empty display name resolves to `None` immediately, without a remote
/// call, since discovery is impossible without a name. Listing errors propagate
/// verbatim; retry policy belongs to the orchestrator's caller.
pub async fn resolve<A: RemoteApi>(
    api: &A,
    scope: &str,
    display_name: &str,
    exists_states: &[LifecycleState],
) -> Result<Option<String>, RemoteError> {
    if display_name.is_empty() {
        return Ok(None);
    }

    let summaries = api.list(scope, display_name, 1).await?;

    for summary in summaries {
        if exists_states.contains(&summary.lifecycle_state) {
            debug!(
                id = %summary.id,
                state = %summary.lifecycle_state,
                "resolved existing remote instance"
            );
            return Ok(Some(summary.id));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::remote::{InstanceSummary, RemoteInstance};

    struct ListOnlyApi {
        summaries: Vec<InstanceSummary>,
        list_calls: AtomicU32,
    }

    struct DummyInstance;

    impl RemoteInstance for DummyInstance {
        fn id(&self) -> &str {
            "dummy"
        }
        fn lifecycle_state(&self) -> LifecycleState {
            LifecycleState::Active
        }
    }

    #[async_trait]
    impl RemoteApi for ListOnlyApi {
        type CreateRequest = ();
        type UpdatePatch = ();
        type Instance = DummyInstance;

        async fn create(&self, _: &()) -> Result<DummyInstance, RemoteError> {
            unreachable!("resolver never creates")
        }
        async fn get(&self, _: &str) -> Result<DummyInstance, RemoteError> {
            unreachable!("resolver never gets")
        }
        async fn list(
            &self,
            _scope: &str,
            _display_name: &str,
            _limit: u32,
        ) -> Result<Vec<InstanceSummary>, RemoteError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.summaries.clone())
        }
        async fn update(&self, _: &str, _: &()) -> Result<(), RemoteError> {
            unreachable!("resolver never updates")
        }
        async fn delete(&self, _: &str) -> Result<(), RemoteError> {
            unreachable!("resolver never deletes")
        }
    }

    fn api(summaries: Vec<InstanceSummary>) -> ListOnlyApi {
        ListOnlyApi {
            summaries,
            list_calls: AtomicU32::new(0),
        }
    }

    #[tokio::test]
    async fn empty_display_name_short_circuits_without_a_remote_call() {
        let api = api(vec![InstanceSummary {
            id: "db-1".into(),
            lifecycle_state: LifecycleState::Active,
        }]);

        let resolved = resolve(&api, "scope-a", "", DEFAULT_EXISTS_STATES)
            .await
            .unwrap();

        assert_eq!(resolved, None);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_non_terminal_match_wins() {
        let api = api(vec![InstanceSummary {
            id: "db-1".into(),
            lifecycle_state: LifecycleState::Creating,
        }]);

        let resolved = resolve(&api, "scope-a", "orders-db", DEFAULT_EXISTS_STATES)
            .await
            .unwrap();

        assert_eq!(resolved.as_deref(), Some("db-1"));
    }

    #[tokio::test]
    async fn terminal_entries_resolve_to_not_found() {
        let api = api(vec![
            InstanceSummary {
                id: "db-old".into(),
                lifecycle_state: LifecycleState::Deleted,
            },
            InstanceSummary {
                id: "db-broken".into(),
                lifecycle_state: LifecycleState::Failed,
            },
        ]);

        let resolved = resolve(&api, "scope-a", "orders-db", DEFAULT_EXISTS_STATES)
            .await
            .unwrap();

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn empty_inventory_is_not_an_error() {
        let api = api(vec![]);
        let resolved = resolve(&api, "scope-a", "orders-db", DEFAULT_EXISTS_STATES)
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }
}
