//! # Controller wiring
//!
//! Connects the generic reconciliation engine to kube-runtime:
//!
//! - one watch loop per registered kind, across all namespaces
//! - finalizer management, so remote cleanup always runs before the local
//!   resource disappears
//! - status persistence via merge patch on the status subresource, skipped
//!   when the engine produced a byte-identical status
//! - requeue cadence: short while converging, long once converged, and the
//!   framework backoff on errors

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use kube_runtime::{watcher, Controller};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::crd::ResourceStatus;
use crate::engine::{status as status_projection, ReconciliationEngine, ResourceAdapter};
use crate::error::Error;
use crate::metrics;

pub mod registry;

pub use registry::KindRegistry;

/// Finalizer guaranteeing remote cleanup before local deletion.
pub const FINALIZER: &str = "cloud.nimbus.dev/finalizer";

/// Field manager recorded on status patches.
pub const FIELD_MANAGER: &str = "nimbus-cloud-operator";

/// Requeue while the remote instance is still converging (or terminally
/// failed; the operator keeps observing it).
const CONVERGING_REQUEUE: Duration = Duration::from_secs(30);

/// Requeue once converged, as a drift-detection heartbeat.
const STEADY_REQUEUE: Duration = Duration::from_secs(300);

/// Requeue after a reconciliation error.
const ERROR_REQUEUE: Duration = Duration::from_secs(60);

/// Shared per-kind context handed to every reconcile invocation.
pub struct Context<A: ResourceAdapter> {
    client: Client,
    engine: ReconciliationEngine<A>,
}

impl<A: ResourceAdapter> std::fmt::Debug for Context<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("kind", &A::KIND)
            .finish_non_exhaustive()
    }
}

/// Run the watch loop for one kind until shutdown.
pub async fn run_controller<A>(client: Client, engine: ReconciliationEngine<A>)
where
    A: ResourceAdapter,
    A::Resource: DeserializeOwned + Serialize,
{
    let api: Api<A::Resource> = Api::all(client.clone());
    let ctx = Arc::new(Context { client, engine });

    info!(kind = A::KIND, "starting controller");

    Controller::new(api, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile::<A>, error_policy::<A>, ctx)
        .for_each(|_| std::future::ready(()))
        .await;

    info!(kind = A::KIND, "controller stopped");
}

async fn reconcile<A>(
    obj: Arc<A::Resource>,
    ctx: Arc<Context<A>>,
) -> Result<Action, kube_runtime::finalizer::Error<Error>>
where
    A: ResourceAdapter,
    A::Resource: DeserializeOwned + Serialize,
{
    let namespace = obj.namespace().unwrap_or_default();
    let api: Api<A::Resource> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, FINALIZER, obj, |event| async {
        match event {
            Event::Apply(obj) => apply(obj, &ctx).await,
            Event::Cleanup(obj) => cleanup(obj, &ctx).await,
        }
    })
    .await
}

async fn apply<A>(obj: Arc<A::Resource>, ctx: &Context<A>) -> Result<Action, Error>
where
    A: ResourceAdapter,
    A::Resource: DeserializeOwned + Serialize,
{
    let start = Instant::now();
    metrics::increment_reconciliations(A::KIND);

    let before = ctx.engine.crd_status(&obj);
    let result = ctx.engine.create_or_update(&obj).await;
    metrics::observe_reconciliation_duration(A::KIND, start.elapsed().as_secs_f64());

    match result {
        Ok(reconciled) => {
            if reconciled.status != before {
                patch_status(ctx, &obj, &reconciled.status).await?;
            }

            if reconciled.outcome.successful {
                Ok(Action::requeue(STEADY_REQUEUE))
            } else {
                Ok(Action::requeue(CONVERGING_REQUEUE))
            }
        }
        Err(err) => {
            // Best-effort Failed projection so the status tells the story;
            // the returned error drives the retry.
            let mut status = before;
            status_projection::project_failed(&mut status, "ReconcileError", &err.to_string());
            if let Err(patch_err) = patch_status(ctx, &obj, &status).await {
                warn!(
                    kind = A::KIND,
                    name = %obj.name_any(),
                    error = %patch_err,
                    "failed to record error condition"
                );
            }
            Err(err)
        }
    }
}

async fn cleanup<A>(obj: Arc<A::Resource>, ctx: &Context<A>) -> Result<Action, Error>
where
    A: ResourceAdapter,
{
    if ctx.engine.delete(&obj).await? {
        metrics::increment_deletions(A::KIND);
        return Ok(Action::await_change());
    }

    // Deletion was issued but the remote instance has not confirmed yet.
    // Returning an error keeps the finalizer in place for another pass.
    let id = ctx
        .engine
        .crd_status(&obj)
        .remote_id
        .unwrap_or_default();
    Err(Error::DeletionPending { id })
}

async fn patch_status<A>(
    ctx: &Context<A>,
    obj: &A::Resource,
    status: &ResourceStatus,
) -> Result<(), Error>
where
    A: ResourceAdapter,
    A::Resource: DeserializeOwned + Serialize,
{
    let namespace = obj.namespace().unwrap_or_default();
    let api: Api<A::Resource> = Api::namespaced(ctx.client.clone(), &namespace);

    api.patch_status(
        &obj.name_any(),
        &PatchParams::apply(FIELD_MANAGER),
        &Patch::Merge(&json!({ "status": status })),
    )
    .await?;

    Ok(())
}

fn error_policy<A>(
    obj: Arc<A::Resource>,
    error: &kube_runtime::finalizer::Error<Error>,
    _ctx: Arc<Context<A>>,
) -> Action
where
    A: ResourceAdapter,
{
    error!(
        kind = A::KIND,
        name = %obj.name_any(),
        %error,
        "reconciliation failed"
    );
    metrics::increment_reconciliation_errors(A::KIND);
    Action::requeue(ERROR_REQUEUE)
}
