//! # Remote Control-Plane Abstraction
//!
//! The operator talks to the Nimbus control plane through one `RemoteApi`
//! per resource kind. The API is an opaque CRUD surface: Create, Get,
//! List-by-name, Update, Delete. Instances carry an asynchronous
//! `LifecycleState` that the operator only ever observes by polling.
//!
//! Error taxonomy matters here: a structured bad-request is a business
//! failure that will never succeed unchanged, while everything else
//! (network, 5xx, timeouts) is retryable by the controller runtime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod rest;

pub use rest::RestClient;

/// Lifecycle state of a remote instance.
///
/// The wire enum is per-kind on the remote side but always includes at least
/// these members. Values this operator does not recognize deserialize as
/// `Unknown` and are treated as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Creating,
    Active,
    Updating,
    Deleting,
    Deleted,
    Failed,
    #[serde(other)]
    Unknown,
}

impl LifecycleState {
    /// Terminal states: the remote service will not move the instance out
    /// of these on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Deleted | LifecycleState::Failed)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecycleState::Creating => "CREATING",
            LifecycleState::Active => "ACTIVE",
            LifecycleState::Updating => "UPDATING",
            LifecycleState::Deleting => "DELETING",
            LifecycleState::Deleted => "DELETED",
            LifecycleState::Failed => "FAILED",
            LifecycleState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Minimal view of a remote instance returned by List queries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub id: String,
    pub lifecycle_state: LifecycleState,
}

/// Behaviour every kind's full instance representation exposes to the
/// generic engine. Kind-specific fields stay on the concrete type and are
/// only touched by that kind's adapter.
pub trait RemoteInstance {
    fn id(&self) -> &str;
    fn lifecycle_state(&self) -> LifecycleState;
}

/// Errors surfaced by remote calls.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Structured validation rejection from the remote service (4xx business
    /// error). Retrying the same request cannot succeed.
    #[error("bad request ({code}): {message}")]
    BadRequest { code: String, message: String },

    /// The addressed instance does not exist.
    #[error("remote instance not found: {0}")]
    NotFound(String),

    /// Anything else: network failures, timeouts, 5xx responses, malformed
    /// payloads. Retryable by the framework.
    #[error("transport failure: {0}")]
    Transport(#[source] anyhow::Error),
}

impl RemoteError {
    /// Whether the controller runtime should retry the operation.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, RemoteError::BadRequest { .. })
    }
}

/// Remote CRUD API for one resource kind.
///
/// Every call takes effect against the shared remote inventory; cancellation
/// is cooperative: dropping the returned future aborts the in-flight HTTP
/// request.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Kind-specific create payload.
    type CreateRequest: Send + Sync;
    /// Kind-specific partial update payload.
    type UpdatePatch: Send + Sync;
    /// Full remote representation of one instance.
    type Instance: RemoteInstance + Send + Sync;

    /// Create a new instance. The returned instance is typically still in a
    /// transient lifecycle state.
    async fn create(&self, request: &Self::CreateRequest) -> Result<Self::Instance, RemoteError>;

    /// Fetch one instance by id.
    async fn get(&self, id: &str) -> Result<Self::Instance, RemoteError>;

    /// Scoped list-by-display-name query.
    async fn list(
        &self,
        scope: &str,
        display_name: &str,
        limit: u32,
    ) -> Result<Vec<InstanceSummary>, RemoteError>;

    /// Apply a partial update. Only fields present in the patch change.
    async fn update(&self, id: &str, patch: &Self::UpdatePatch) -> Result<(), RemoteError>;

    /// Request deletion. Must be idempotent at the remote API: deleting an
    /// already-deleting instance is not an error.
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_wire_states_deserialize_as_unknown() {
        let state: LifecycleState = serde_json::from_str("\"SCALING_OUT\"").unwrap();
        assert_eq!(state, LifecycleState::Unknown);

        let state: LifecycleState = serde_json::from_str("\"CREATING\"").unwrap();
        assert_eq!(state, LifecycleState::Creating);
    }

    #[test]
    fn bad_request_is_not_retryable() {
        let err = RemoteError::BadRequest {
            code: "InvalidParameter".into(),
            message: "nodeCount out of range".into(),
        };
        assert!(!err.is_retryable());

        let err = RemoteError::Transport(anyhow::anyhow!("connection reset"));
        assert!(err.is_retryable());
    }

    #[test]
    fn terminal_states() {
        assert!(LifecycleState::Failed.is_terminal());
        assert!(LifecycleState::Deleted.is_terminal());
        assert!(!LifecycleState::Creating.is_terminal());
        assert!(!LifecycleState::Deleting.is_terminal());
    }
}
