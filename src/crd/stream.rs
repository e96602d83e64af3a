//! `Stream` custom resource.
//!
//! Declares a managed Nimbus message stream. Same discovery contract as
//! every kind: `displayName` + `scope` identify at most one non-terminal
//! remote instance when `boundId` is absent.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ResourceStatus;

/// Desired state of a Nimbus stream.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Stream",
    group = "cloud.nimbus.dev",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "nst",
    printcolumn = r#"{"name":"RemoteId", "type":"string", "jsonPath":".status.remoteId"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.conditions[-1:].type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StreamSpec {
    /// Explicit remote identifier; skips discovery when set.
    #[serde(default)]
    pub bound_id: Option<String>,
    /// Remote scope (compartment-equivalent) holding the stream.
    pub scope: String,
    /// Display name, expected unique per scope among non-terminal instances.
    pub display_name: String,
    /// Partition count. Mutable.
    #[serde(default)]
    pub partitions: Option<i32>,
    /// Message retention in hours. Mutable.
    #[serde(default)]
    pub retention_hours: Option<i32>,
    /// Free-form tags. Replaced wholesale when any key differs.
    #[serde(default)]
    pub freeform_tags: Option<BTreeMap<String, String>>,
}
