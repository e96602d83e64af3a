//! # Reconciliation Engine
//!
//! One generic engine drives every managed kind. A [`ResourceAdapter`]
//! supplies the per-kind field mapping; the engine owns the state machine:
//!
//! 1. **Bind-by-id**: the spec (or a previously recorded status) carries a
//!    remote identifier: fetch it directly, plan an update, converge.
//! 2. **Find-or-create**: resolve by display name + scope; create when
//!    nothing non-terminal exists.
//! 3. **Update-existing**: a resolved or bound instance in Active state is
//!    compared field-by-field; an empty plan issues no remote write.
//!
//! The engine never reports `successful = true` while the remote instance is
//! in its transient create state, and treats a remote `Failed` lifecycle as
//! a terminal outcome (`successful = false`, no error) rather than something
//! the framework should retry forever.
//!
//! Entry points mirror the generic reconciler contract: `create_or_update`,
//! `delete`, `crd_status`, plus the `*_any` variants that perform the single
//! downcast at the framework boundary so adapters always receive their
//! concrete resource type.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::crd::ResourceStatus;
use crate::error::Error;
use crate::remote::{LifecycleState, RemoteApi, RemoteError, RemoteInstance};
use crate::secrets::{credential_secret_name, CredentialStore};

pub mod adapter;
pub mod drift;
pub mod poller;
pub mod resolver;
pub mod status;

pub use adapter::{CreateStrategy, ResourceAdapter};
pub use poller::{PollPolicy, PollSchedule};

/// Externally visible result of one reconciliation pass.
///
/// `successful = false` with no error means "call me again": the instance is
/// still converging, or has reached a terminal Failed state the framework
/// must not retry as an error.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOutcome {
    pub successful: bool,
}

/// Outcome plus the status to persist on the local resource.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub outcome: ReconcileOutcome,
    pub status: ResourceStatus,
}

/// Generic reconciliation engine for one resource kind.
pub struct ReconciliationEngine<A: ResourceAdapter> {
    adapter: A,
    api: A::Api,
    credentials: Arc<dyn CredentialStore>,
}

impl<A: ResourceAdapter> std::fmt::Debug for ReconciliationEngine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("kind", &A::KIND)
            .finish_non_exhaustive()
    }
}

impl<A: ResourceAdapter> ReconciliationEngine<A> {
    pub fn new(adapter: A, api: A::Api, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            adapter,
            api,
            credentials,
        }
    }

    /// Reconciler-owned status of the local resource (default when the
    /// resource has never been reconciled).
    pub fn crd_status(&self, obj: &A::Resource) -> ResourceStatus {
        self.adapter.status(obj).cloned().unwrap_or_default()
    }

    /// One reconciliation pass. Idempotent: repeated invocation has no side
    /// effect beyond convergence.
    pub async fn create_or_update(&self, obj: &A::Resource) -> Result<Reconciled, Error> {
        let mut status = self.crd_status(obj);

        // spec.boundId wins; a previously recorded remote id comes next;
        // discovery-by-name only when neither exists.
        let bound = self
            .adapter
            .bound_id(obj)
            .or_else(|| status.remote_id.clone());

        let instance = match bound {
            Some(id) => Some(self.converge_existing(obj, &id).await?),
            None => {
                let resolved = resolver::resolve(
                    &self.api,
                    self.adapter.scope(obj),
                    self.adapter.display_name(obj),
                    self.adapter.exists_states(),
                )
                .await
                .map_err(Error::Remote)?;

                match resolved {
                    Some(id) => {
                        info!(
                            kind = A::KIND,
                            name = %obj.name_any(),
                            remote_id = %id,
                            "bound to existing remote instance by name"
                        );
                        Some(self.converge_existing(obj, &id).await?)
                    }
                    None => self.create(obj, &mut status).await?,
                }
            }
        };

        let Some(instance) = instance else {
            // Create was rejected with a structured bad request; the Failed
            // condition carries the remote error code. Not a returned error:
            // retrying the same request cannot succeed.
            return Ok(Reconciled {
                outcome: ReconcileOutcome { successful: false },
                status,
            });
        };

        status::record_binding(&mut status, instance.id());
        let state = instance.lifecycle_state();
        status::project_lifecycle(&mut status, state);

        if state == LifecycleState::Active {
            self.publish_credentials(obj, &instance).await?;
        }

        if state == LifecycleState::Failed {
            info!(
                kind = A::KIND,
                name = %obj.name_any(),
                remote_id = %instance.id(),
                "remote provisioning failed; terminal outcome"
            );
        }

        let successful = matches!(state, LifecycleState::Active | LifecycleState::Updating);
        Ok(Reconciled {
            outcome: ReconcileOutcome { successful },
            status,
        })
    }

    /// Idempotent deletion pass. `Ok(true)` means remote cleanup is done and
    /// the local resource may disappear; `Ok(false)` means deletion was
    /// issued but not yet confirmed and the pass should be retried.
    pub async fn delete(&self, obj: &A::Resource) -> Result<bool, Error> {
        let status = self.crd_status(obj);
        let Some(id) = status.remote_id else {
            // Never provisioned far enough to record an id.
            debug!(kind = A::KIND, name = %obj.name_any(), "no remote id recorded, nothing to clean up");
            return Ok(true);
        };

        match self.api.delete(&id).await {
            Ok(()) => {
                info!(kind = A::KIND, remote_id = %id, "remote deletion requested");
            }
            Err(RemoteError::NotFound(_)) => {
                debug!(kind = A::KIND, remote_id = %id, "remote instance already gone");
            }
            Err(e) => return Err(e.into()),
        }

        if self.adapter.confirm_delete() && !self.await_deletion(&id).await? {
            return Ok(false);
        }

        // Best-effort side-channel cleanup: never fails the deletion.
        let secret_name = credential_secret_name(&obj.name_any());
        let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
        if let Err(e) = self.credentials.remove(&secret_name, &namespace).await {
            warn!(
                kind = A::KIND,
                secret = %secret_name,
                error = %e,
                "credential secret cleanup failed, continuing deletion"
            );
        }

        Ok(true)
    }

    /// Framework-boundary entry point: a single downcast, then the typed
    /// path. A wrong kind is a wiring error, reported before any remote
    /// call.
    pub async fn reconcile_any(&self, obj: &(dyn Any + Send + Sync)) -> Result<Reconciled, Error> {
        let obj = Self::convert(obj)?;
        self.create_or_update(obj).await
    }

    /// Framework-boundary deletion entry point.
    pub async fn delete_any(&self, obj: &(dyn Any + Send + Sync)) -> Result<bool, Error> {
        let obj = Self::convert(obj)?;
        self.delete(obj).await
    }

    /// Framework-boundary status accessor.
    pub fn status_any(&self, obj: &(dyn Any + Send + Sync)) -> Result<ResourceStatus, Error> {
        let obj = Self::convert(obj)?;
        Ok(self.crd_status(obj))
    }

    fn convert(obj: &(dyn Any + Send + Sync)) -> Result<&A::Resource, Error> {
        obj.downcast_ref::<A::Resource>()
            .ok_or(Error::UnexpectedKind { expected: A::KIND })
    }

    /// Fetch a known instance and converge mutable fields onto it. Drift is
    /// only planned against an Active instance; transient, failed, or
    /// deleting instances are returned as observed.
    async fn converge_existing(
        &self,
        obj: &A::Resource,
        id: &str,
    ) -> Result<<A::Api as RemoteApi>::Instance, Error> {
        let instance = self.api.get(id).await.map_err(Error::Remote)?;

        if instance.lifecycle_state() != LifecycleState::Active {
            return Ok(instance);
        }

        match self.adapter.plan_update(&instance, obj) {
            None => {
                debug!(kind = A::KIND, remote_id = %id, "no drift detected");
                Ok(instance)
            }
            Some(patch) => {
                info!(kind = A::KIND, remote_id = %id, "drift detected, updating remote instance");
                self.api.update(id, &patch).await.map_err(Error::Remote)?;
                let refreshed = self.api.get(id).await.map_err(Error::Remote)?;
                Ok(refreshed)
            }
        }
    }

    /// Issue the asynchronous Create and apply the kind's post-create
    /// strategy. `Ok(None)` means the request was rejected with a structured
    /// bad request and a Failed condition was projected.
    async fn create(
        &self,
        obj: &A::Resource,
        status: &mut ResourceStatus,
    ) -> Result<Option<<A::Api as RemoteApi>::Instance>, Error> {
        let request = self.adapter.build_create_request(obj);
        info!(kind = A::KIND, name = %obj.name_any(), "creating remote instance");

        let created = match self.api.create(&request).await {
            Ok(instance) => instance,
            Err(RemoteError::BadRequest { code, message }) => {
                warn!(
                    kind = A::KIND,
                    name = %obj.name_any(),
                    code = %code,
                    "remote service rejected create request"
                );
                status::project_failed(status, &code, &message);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        status::record_binding(status, created.id());

        match self.adapter.create_strategy() {
            CreateStrategy::Requeue => Ok(Some(created)),
            CreateStrategy::AwaitStable(policy) => {
                let stable = poller::await_stable(
                    &self.api,
                    created.id(),
                    self.adapter.transient_create_state(),
                    &policy,
                )
                .await
                .map_err(Error::Remote)?;
                Ok(Some(stable))
            }
        }
    }

    async fn publish_credentials(
        &self,
        obj: &A::Resource,
        instance: &<A::Api as RemoteApi>::Instance,
    ) -> Result<(), Error> {
        let Some(data) = self.adapter.connection_credentials(instance) else {
            return Ok(());
        };
        if data.is_empty() {
            return Ok(());
        }

        let secret_name = credential_secret_name(&obj.name_any());
        let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
        self.credentials.publish(&secret_name, &namespace, &data).await
    }

    /// Poll until the instance confirms Deleting/Deleted (or is gone).
    /// Returns `Ok(false)` when the confirmation window closes first.
    async fn await_deletion(&self, id: &str) -> Result<bool, Error> {
        let policy = PollPolicy::fixed(Duration::from_secs(2), 10);

        for attempt in 1..=policy.max_attempts {
            match self.api.get(id).await {
                Ok(instance) => {
                    let state = instance.lifecycle_state();
                    if matches!(state, LifecycleState::Deleting | LifecycleState::Deleted) {
                        return Ok(true);
                    }
                    debug!(remote_id = %id, %state, attempt, "waiting for remote deletion");
                }
                Err(RemoteError::NotFound(_)) => return Ok(true),
                Err(e) => return Err(e.into()),
            }

            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.delay(attempt)).await;
            }
        }

        Ok(false)
    }
}
