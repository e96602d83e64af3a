//! `Database` custom resource.
//!
//! Declares a managed Nimbus database instance. `displayName` + `scope` must
//! uniquely identify at most one non-terminal remote instance when `boundId`
//! is absent; discovery takes the first match.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ResourceStatus;

/// Desired state of a Nimbus database instance.
///
/// # Example
///
/// ```yaml
/// apiVersion: cloud.nimbus.dev/v1alpha1
/// kind: Database
/// metadata:
///   name: orders-db
///   namespace: default
/// spec:
///   scope: scope.prod.eu
///   displayName: orders-db
///   nodeCount: 2
///   memoryGbs: 16
///   softwareVersion: "19.2"
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Database",
    group = "cloud.nimbus.dev",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "ndb",
    printcolumn = r#"{"name":"RemoteId", "type":"string", "jsonPath":".status.remoteId"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.conditions[-1:].type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Explicit remote identifier. When set, discovery-by-name is skipped
    /// and the operator binds directly to this instance.
    #[serde(default)]
    pub bound_id: Option<String>,
    /// Remote scope (compartment-equivalent) holding the instance.
    pub scope: String,
    /// Display name of the instance. Expected unique per scope among
    /// non-terminal instances.
    pub display_name: String,
    /// Number of database nodes. Mutable.
    #[serde(default)]
    pub node_count: Option<i32>,
    /// Memory per node in gigabytes. Mutable.
    #[serde(default)]
    pub memory_gbs: Option<i32>,
    /// Database software version. Immutable after creation; never compared
    /// for drift.
    #[serde(default)]
    pub software_version: Option<String>,
    /// Availability domain placement. Immutable after creation.
    #[serde(default)]
    pub availability_domain: Option<String>,
    /// Free-form tags. Replaced wholesale when any key differs.
    #[serde(default)]
    pub freeform_tags: Option<BTreeMap<String, String>>,
}
