//! # Custom Resource Definitions
//!
//! CRD types for the managed Nimbus resource kinds, plus the status shape
//! shared by every kind.
//!
//! The spec is user-owned desired state; the status subresource is owned
//! exclusively by the reconciler. `remoteId` is set once a remote instance is
//! bound and never cleared while the local resource exists; `createdAt` is
//! set exactly once, on the first successful bind/create.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod database;
pub mod stream;

pub use database::{Database, DatabaseSpec};
pub use stream::{Stream, StreamSpec};

/// Status of a managed cloud resource.
///
/// Written back atomically through the status subresource on every
/// reconciliation pass that changes it.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    /// Identifier of the bound remote instance.
    /// Set idempotently; never cleared while the local resource exists.
    #[serde(default)]
    pub remote_id: Option<String>,
    /// RFC 3339 timestamp of the first successful bind/create.
    /// Set exactly once, never overwritten.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Ordered, append-only condition history. A new condition is appended
    /// only when the projected condition differs from the latest one, so a
    /// converged resource keeps a stable status across resyncs.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ResourceStatus {
    /// Latest condition, if any.
    pub fn latest_condition(&self) -> Option<&Condition> {
        self.conditions.last()
    }
}

/// Condition vocabulary projected from remote lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionType {
    Provisioning,
    Updating,
    Active,
    Failed,
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConditionType::Provisioning => "Provisioning",
            ConditionType::Updating => "Updating",
            ConditionType::Active => "Active",
            ConditionType::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// A single status condition.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition.
    pub r#type: ConditionType,
    /// Status of condition (True, False).
    pub status: String,
    /// Machine-readable reason for the condition.
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Transition timestamp (RFC 3339).
    #[serde(default)]
    pub last_transition_time: Option<String>,
}
