//! Status/condition projection.
//!
//! Maps remote lifecycle states onto the small condition vocabulary exposed
//! on the local resource's status subresource, and owns the set-once rules
//! for `remote_id` and `created_at`.
//!
//! Conditions are append-only. A condition is appended only when it differs
//! from the latest one, so repeated reconciliation of a converged resource
//! leaves the status byte-identical, and the controller then skips the status
//! patch entirely.

use chrono::Utc;
use tracing::warn;

use crate::crd::{Condition, ConditionType, ResourceStatus};
use crate::remote::LifecycleState;

/// Record the bound remote identifier and stamp `created_at` on first bind.
///
/// Idempotent: re-recording the same id is a no-op, and `created_at` is
/// never overwritten once set.
pub fn record_binding(status: &mut ResourceStatus, remote_id: &str) {
    match status.remote_id.as_deref() {
        None => status.remote_id = Some(remote_id.to_string()),
        Some(existing) if existing == remote_id => {}
        Some(existing) => {
            // The remote id never changes for a bound resource; a mismatch
            // means the uniqueness contract on (scope, displayName) broke.
            warn!(existing, remote_id, "bound remote id changed, keeping the original");
        }
    }

    if status.created_at.is_none() {
        status.created_at = Some(Utc::now().to_rfc3339());
    }
}

/// Project a condition from an observed lifecycle state.
pub fn project_lifecycle(status: &mut ResourceStatus, state: LifecycleState) {
    let (r#type, reason) = match state {
        LifecycleState::Creating | LifecycleState::Unknown => {
            (ConditionType::Provisioning, "RemoteProvisioning")
        }
        LifecycleState::Updating => (ConditionType::Updating, "RemoteUpdating"),
        LifecycleState::Active => (ConditionType::Active, "RemoteActive"),
        LifecycleState::Failed => (ConditionType::Failed, "RemoteFailed"),
        // Deleting/Deleted on the create/update path means the instance was
        // removed out-of-band; terminal from the operator's point of view.
        LifecycleState::Deleting | LifecycleState::Deleted => {
            (ConditionType::Failed, "UnexpectedLifecycleState")
        }
    };

    push_condition(
        status,
        r#type,
        reason,
        &format!("remote instance reported {state}"),
    );
}

/// Project a Failed condition with an explicit reason/message, used for
/// rejected create requests and for framework-level errors.
pub fn project_failed(status: &mut ResourceStatus, reason: &str, message: &str) {
    push_condition(status, ConditionType::Failed, reason, message);
}

fn push_condition(status: &mut ResourceStatus, r#type: ConditionType, reason: &str, message: &str) {
    if let Some(last) = status.latest_condition() {
        if last.r#type == r#type
            && last.status == "True"
            && last.reason.as_deref() == Some(reason)
            && last.message.as_deref() == Some(message)
        {
            return;
        }
    }

    status.conditions.push(Condition {
        r#type,
        status: "True".to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    });
}
