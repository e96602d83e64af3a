//! Nimbus stream kind: wire types, API wrapper, adapter.
//!
//! Streams settle quickly after create, so the adapter polls in-pass with an
//! exponential schedule instead of requeueing. Stream deletion is confirmed:
//! the deletion pass re-reads the instance until it reports
//! Deleting/Deleted (or 404s).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ListPage;
use crate::crd::{ResourceStatus, Stream};
use crate::engine::drift::PatchBuilder;
use crate::engine::{CreateStrategy, PollPolicy, ResourceAdapter};
use crate::remote::{
    InstanceSummary, LifecycleState, RemoteApi, RemoteError, RemoteInstance, RestClient,
};

/// Create payload for `POST /v1/streams`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamRequest {
    pub scope: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<BTreeMap<String, String>>,
}

/// Partial update payload for `PUT /v1/streams/{id}`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStreamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<BTreeMap<String, String>>,
}

/// Full remote representation of one stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamInstance {
    pub id: String,
    pub lifecycle_state: LifecycleState,
    pub display_name: String,
    #[serde(default)]
    pub partitions: Option<i32>,
    #[serde(default)]
    pub retention_hours: Option<i32>,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

impl RemoteInstance for StreamInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }
}

/// `/v1/streams` endpoint wrapper.
#[derive(Debug, Clone)]
pub struct StreamApi {
    client: RestClient,
}

impl StreamApi {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteApi for StreamApi {
    type CreateRequest = CreateStreamRequest;
    type UpdatePatch = UpdateStreamPatch;
    type Instance = StreamInstance;

    async fn create(&self, request: &CreateStreamRequest) -> Result<StreamInstance, RemoteError> {
        self.client.post_json("/v1/streams", request).await
    }

    async fn get(&self, id: &str) -> Result<StreamInstance, RemoteError> {
        self.client.get_json(&format!("/v1/streams/{id}")).await
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
                "/v1/streams",
                &[
                    ("scope", scope),
                    ("displayName", display_name),
                    ("limit", &limit),
                ],
            )
            .await?;
        Ok(page.items)
    }

    async fn update(&self, id: &str, patch: &UpdateStreamPatch) -> Result<(), RemoteError> {
        self.client
            .put_json(&format!("/v1/streams/{id}"), patch)
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.client.delete(&format!("/v1/streams/{id}")).await
    }
}

/// Adapter binding the `Stream` custom resource to the stream endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamAdapter;

impl ResourceAdapter for StreamAdapter {
    type Resource = Stream;
    type Api = StreamApi;

    const KIND: &'static str = "Stream";

    fn bound_id(&self, obj: &Stream) -> Option<String> {
        obj.spec.bound_id.clone()
    }

    fn scope<'a>(&self, obj: &'a Stream) -> &'a str {
        &obj.spec.scope
    }

    fn display_name<'a>(&self, obj: &'a Stream) -> &'a str {
        &obj.spec.display_name
    }

    fn status<'a>(&self, obj: &'a Stream) -> Option<&'a ResourceStatus> {
        obj.status.as_ref()
    }

    fn build_create_request(&self, obj: &Stream) -> CreateStreamRequest {
        CreateStreamRequest {
            scope: obj.spec.scope.clone(),
            display_name: obj.spec.display_name.clone(),
            partitions: obj.spec.partitions,
            retention_hours: obj.spec.retention_hours,
            freeform_tags: obj.spec.freeform_tags.clone(),
        }
    }

    fn plan_update(&self, current: &StreamInstance, desired: &Stream) -> Option<UpdateStreamPatch> {
        let mut patch = UpdateStreamPatch::default();
        let mut builder = PatchBuilder::new();

        builder.text(
            Some(&desired.spec.display_name),
            &current.display_name,
            &mut patch.display_name,
        );
        builder.field(
            desired.spec.partitions.as_ref(),
            current.partitions.as_ref(),
            &mut patch.partitions,
        );
        builder.field(
            desired.spec.retention_hours.as_ref(),
            current.retention_hours.as_ref(),
            &mut patch.retention_hours,
        );
        builder.tags(
            desired.spec.freeform_tags.as_ref(),
            &current.freeform_tags,
            &mut patch.freeform_tags,
        );

        builder.finish(patch)
    }

    fn create_strategy(&self) -> CreateStrategy {
        CreateStrategy::AwaitStable(PollPolicy::exponential(
            Duration::from_secs(1),
            Duration::from_secs(32),
            20,
        ))
    }

    fn confirm_delete(&self) -> bool {
        true
    }
}
