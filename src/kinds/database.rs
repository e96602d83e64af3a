//! Nimbus database kind: wire types, API wrapper, adapter.
//!
//! Databases provision slowly, so the adapter keeps the default
//! requeue-after-create strategy: the pass records the id, projects
//! Provisioning, and lets the controller re-invoke later. Once Active, the
//! adapter publishes the connection credentials the control plane returns on
//! Get.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ListPage;
use crate::crd::{Database, ResourceStatus};
use crate::engine::drift::PatchBuilder;
use crate::engine::ResourceAdapter;
use crate::remote::{
    InstanceSummary, LifecycleState, RemoteApi, RemoteError, RemoteInstance, RestClient,
};
use crate::secrets::CredentialData;

/// Create payload for `POST /v1/databases`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseRequest {
    pub scope: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gbs: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<BTreeMap<String, String>>,
}

/// Partial update payload for `PUT /v1/databases/{id}`. Absent fields are
/// left untouched by the control plane.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatabasePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gbs: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<BTreeMap<String, String>>,
}

/// Full remote representation of one database instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInstance {
    pub id: String,
    pub lifecycle_state: LifecycleState,
    pub display_name: String,
    #[serde(default)]
    pub node_count: Option<i32>,
    #[serde(default)]
    pub memory_gbs: Option<i32>,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl RemoteInstance for DatabaseInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }
}

/// `/v1/databases` endpoint wrapper.
#[derive(Debug, Clone)]
pub struct DatabaseApi {
    client: RestClient,
}

impl DatabaseApi {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteApi for DatabaseApi {
    type CreateRequest = CreateDatabaseRequest;
    type UpdatePatch = UpdateDatabasePatch;
    type Instance = DatabaseInstance;

    async fn create(&self, request: &CreateDatabaseRequest) -> Result<DatabaseInstance, RemoteError> {
        self.client.post_json("/v1/databases", request).await
    }

    async fn get(&self, id: &str) -> Result<DatabaseInstance, RemoteError> {
        self.client.get_json(&format!("/v1/databases/{id}")).await
    }

    async fn list(
        &self,
        scope: &str,
        display_name: &str,
        limit: u32,
    ) -> Result<Vec<InstanceSummary>, RemoteError> {
        let limit = limit.to_string();
        let page: ListPage = self
            .client
            .query_json(
                "/v1/databases",
                &[
                    ("scope", scope),
                    ("displayName", display_name),
                    ("limit", &limit),
                ],
            )
            .await?;
        Ok(page.items)
    }

    async fn update(&self, id: &str, patch: &UpdateDatabasePatch) -> Result<(), RemoteError> {
        self.client
            .put_json(&format!("/v1/databases/{id}"), patch)
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.client.delete(&format!("/v1/databases/{id}")).await
    }
}

/// Adapter binding the `Database` custom resource to the database endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseAdapter;

impl ResourceAdapter for DatabaseAdapter {
    type Resource = Database;
    type Api = DatabaseApi;

    const KIND: &'static str = "Database";

    fn bound_id(&self, obj: &Database) -> Option<String> {
        obj.spec.bound_id.clone()
    }

    fn scope<'a>(&self, obj: &'a Database) -> &'a str {
        &obj.spec.scope
    }

    fn display_name<'a>(&self, obj: &'a Database) -> &'a str {
        &obj.spec.display_name
    }

    fn status<'a>(&self, obj: &'a Database) -> Option<&'a ResourceStatus> {
        obj.status.as_ref()
    }

    fn build_create_request(&self, obj: &Database) -> CreateDatabaseRequest {
        CreateDatabaseRequest {
            scope: obj.spec.scope.clone(),
            display_name: obj.spec.display_name.clone(),
            node_count: obj.spec.node_count,
            memory_gbs: obj.spec.memory_gbs,
            software_version: obj.spec.software_version.clone(),
            availability_domain: obj.spec.availability_domain.clone(),
            freeform_tags: obj.spec.freeform_tags.clone(),
        }
    }

    // softwareVersion and availabilityDomain are create-time only and never
    // compared here.
    fn plan_update(
        &self,
        current: &DatabaseInstance,
        desired: &Database,
    ) -> Option<UpdateDatabasePatch> {
        let mut patch = UpdateDatabasePatch::default();
        let mut builder = PatchBuilder::new();

        builder.text(
            Some(&desired.spec.display_name),
            &current.display_name,
            &mut patch.display_name,
        );
        builder.field(
            desired.spec.node_count.as_ref(),
            current.node_count.as_ref(),
            &mut patch.node_count,
        );
        builder.field(
            desired.spec.memory_gbs.as_ref(),
            current.memory_gbs.as_ref(),
            &mut patch.memory_gbs,
        );
        builder.tags(
            desired.spec.freeform_tags.as_ref(),
            &current.freeform_tags,
            &mut patch.freeform_tags,
        );

        builder.finish(patch)
    }

    fn connection_credentials(&self, instance: &DatabaseInstance) -> Option<CredentialData> {
        let mut data = CredentialData::new();
        if let Some(conn) = &instance.connection_string {
            data.push("connectionString", conn.clone());
        }
        if let Some(user) = &instance.admin_username {
            data.push("username", user.clone());
        }
        if let Some(password) = &instance.admin_password {
            data.push("password", password.clone());
        }

        if data.is_empty() {
            None
        } else {
            Some(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::DatabaseSpec;

    fn database(spec: DatabaseSpec) -> Database {
        Database::new("orders-db", spec)
    }

    fn spec() -> DatabaseSpec {
        DatabaseSpec {
            bound_id: None,
            scope: "scope.prod.eu".into(),
            display_name: "orders-db".into(),
            node_count: Some(2),
            memory_gbs: Some(16),
            software_version: Some("19.2".into()),
            availability_domain: Some("AD-1".into()),
            freeform_tags: None,
        }
    }

    fn active_instance() -> DatabaseInstance {
        DatabaseInstance {
            id: "db-1".into(),
            lifecycle_state: LifecycleState::Active,
            display_name: "orders-db".into(),
            node_count: Some(2),
            memory_gbs: Some(16),
            freeform_tags: BTreeMap::new(),
            connection_string: None,
            admin_username: None,
            admin_password: None,
        }
    }

    #[test]
    fn converged_instance_plans_no_update() {
        let obj = database(spec());
        assert!(DatabaseAdapter.plan_update(&active_instance(), &obj).is_none());
    }

    #[test]
    fn node_count_drift_produces_a_minimal_patch() {
        let mut desired = spec();
        desired.node_count = Some(4);
        let obj = database(desired);

        let patch = DatabaseAdapter.plan_update(&active_instance(), &obj).unwrap();
        assert_eq!(patch.node_count, Some(4));
        assert!(patch.display_name.is_none());
        assert!(patch.memory_gbs.is_none());
        assert!(patch.freeform_tags.is_none());
    }

    #[test]
    fn unset_spec_fields_never_drift() {
        let mut desired = spec();
        desired.node_count = None;
        desired.memory_gbs = None;
        let obj = database(desired);

        assert!(DatabaseAdapter.plan_update(&active_instance(), &obj).is_none());
    }

    #[test]
    fn tag_drift_replaces_the_whole_map() {
        let tags = BTreeMap::from([
            ("env".to_string(), "prod".to_string()),
            ("team".to_string(), "data".to_string()),
        ]);
        let mut desired = spec();
        desired.freeform_tags = Some(tags.clone());
        let obj = database(desired);

        let mut current = active_instance();
        current.freeform_tags = BTreeMap::from([("env".to_string(), "dev".to_string())]);

        let patch = DatabaseAdapter.plan_update(&current, &obj).unwrap();
        assert_eq!(patch.freeform_tags, Some(tags));
    }

    #[test]
    fn credentials_are_extracted_only_when_present() {
        let mut instance = active_instance();
        assert!(DatabaseAdapter.connection_credentials(&instance).is_none());

        instance.connection_string = Some("nimbus://db-1".into());
        instance.admin_username = Some("admin".into());
        instance.admin_password = Some("s3cr3t".into());
        let data = DatabaseAdapter.connection_credentials(&instance).unwrap();
        assert!(!data.is_empty());
    }

    #[test]
    fn absent_patch_fields_stay_off_the_wire() {
        let patch = UpdateDatabasePatch {
            node_count: Some(4),
            ..Default::default()
        };
        let body = serde_json::to_string(&patch).unwrap();
        assert_eq!(body, r#"{"nodeCount":4}"#);
    }
}
