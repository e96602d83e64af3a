//! Per-kind adapter seam.
//!
//! One [`ResourceAdapter`] per managed kind supplies the field mapping the
//! generic engine cannot know: how to read the spec, how to build create
//! requests, how to plan updates, and which lifecycle/polling conventions
//! the kind follows. Everything else (path selection, discovery, polling,
//! status projection, deletion sequencing) lives once in the engine.

use crate::crd::ResourceStatus;
use crate::engine::poller::PollPolicy;
use crate::engine::resolver::DEFAULT_EXISTS_STATES;
use crate::remote::{LifecycleState, RemoteApi};
use crate::secrets::CredentialData;

/// How the engine behaves after an asynchronous Create.
#[derive(Debug, Clone, Copy)]
pub enum CreateStrategy {
    /// Record the id, project Provisioning, and report `successful = false`
    /// so the scheduler re-invokes the pass later. Preferred for long
    /// provisioning times: the worker is freed between attempts.
    Requeue,
    /// Await stability in-pass with the given poll policy before returning.
    /// Suitable for kinds whose create settles within one pass.
    AwaitStable(PollPolicy),
}

/// Capability surface one resource kind exposes to the reconciliation
/// engine.
pub trait ResourceAdapter: Send + Sync + 'static {
    /// The local custom resource type.
    type Resource: kube::Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + Send
        + Sync
        + 'static;

    /// The remote CRUD API for this kind.
    type Api: RemoteApi;

    /// Kind name as registered with the API server.
    const KIND: &'static str;

    /// Explicit remote identifier from the spec, if declared.
    fn bound_id(&self, obj: &Self::Resource) -> Option<String>;

    /// Remote scope (compartment-equivalent) the instance lives in.
    fn scope<'a>(&self, obj: &'a Self::Resource) -> &'a str;

    /// Declared display name; empty means discovery is impossible.
    fn display_name<'a>(&self, obj: &'a Self::Resource) -> &'a str;

    /// Reconciler-owned status recorded on the local resource.
    fn status<'a>(&self, obj: &'a Self::Resource) -> Option<&'a ResourceStatus>;

    /// Translate the declared spec into the kind's create payload.
    fn build_create_request(
        &self,
        obj: &Self::Resource,
    ) -> <Self::Api as RemoteApi>::CreateRequest;

    /// Compare current remote state against the declared spec field by
    /// field and build a partial update containing only the differing
    /// mutable fields. `None` means no update is needed and the engine
    /// issues no remote write.
    fn plan_update(
        &self,
        current: &<Self::Api as RemoteApi>::Instance,
        desired: &Self::Resource,
    ) -> Option<<Self::Api as RemoteApi>::UpdatePatch>;

    /// The kind's transient create state; the poller retries while the
    /// instance reports it.
    fn transient_create_state(&self) -> LifecycleState {
        LifecycleState::Creating
    }

    /// Lifecycle states under which a listed instance counts as existing.
    fn exists_states(&self) -> &'static [LifecycleState] {
        DEFAULT_EXISTS_STATES
    }

    /// Post-create behaviour; see [`CreateStrategy`].
    fn create_strategy(&self) -> CreateStrategy {
        CreateStrategy::Requeue
    }

    /// Whether deletion polls until the instance reports Deleting/Deleted.
    fn confirm_delete(&self) -> bool {
        false
    }

    /// Connection credential material to publish once the instance is
    /// Active, for kinds that expose credentials post-provisioning.
    fn connection_credentials(
        &self,
        _instance: &<Self::Api as RemoteApi>::Instance,
    ) -> Option<CredentialData> {
        None
    }
}
