//! Provisioning poller.
//!
//! After an asynchronous create, polls Get until the instance leaves the
//! kind's transient lifecycle state. The wait between attempts is a
//! cancellable `tokio::time::sleep`, so dropping the reconciliation future
//! aborts the poll without tying up a worker thread.
//!
//! The schedule is monotonic non-decreasing (fixed interval or
//! `2^(attempt-1)` exponential with a cap) under a hard attempt ceiling.
//! Hitting the ceiling is not an error: the last observed instance is
//! returned as-is and the orchestrator decides success or failure from its
//! state.

use std::time::Duration;

use tracing::debug;

use crate::remote::{LifecycleState, RemoteApi, RemoteError, RemoteInstance};

/// Spacing between poll attempts.
#[derive(Debug, Clone, Copy)]
pub enum PollSchedule {
    /// Flat interval between attempts.
    Fixed(Duration),
    /// `base * 2^(attempt-1)`, capped.
    Exponential { base: Duration, cap: Duration },
}

/// Poll schedule plus attempt ceiling.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub schedule: PollSchedule,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            schedule: PollSchedule::Fixed(interval),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn exponential(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            schedule: PollSchedule::Exponential { base, cap },
            max_attempts: max_attempts.max(1),
        }
    }

    /// Delay after the given 1-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.schedule {
            PollSchedule::Fixed(interval) => interval,
            PollSchedule::Exponential { base, cap } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(cap)
            }
        }
    }
}

/// Poll `get(id)` until the instance leaves `transient`, up to the policy's
/// attempt ceiling.
///
/// Unrecognized lifecycle states keep polling (an unexpected response shape
/// is treated as "not stable yet", not as an abort). A transport error on
/// any single Get attempt propagates immediately.
pub async fn await_stable<A: RemoteApi>(
    api: &A,
    id: &str,
    transient: LifecycleState,
    policy: &PollPolicy,
) -> Result<A::Instance, RemoteError> {
    let mut attempt: u32 = 1;
    loop {
        let instance = api.get(id).await?;
        let state = instance.lifecycle_state();
        let still_transient = state == transient || state == LifecycleState::Unknown;

        if !still_transient {
            debug!(id, %state, attempt, "instance left transient state");
            return Ok(instance);
        }
        if attempt >= policy.max_attempts {
            debug!(id, %state, attempt, "attempt ceiling reached, returning last response");
            return Ok(instance);
        }

        tokio::time::sleep(policy.delay(attempt)).await;
        attempt += 1;
    }
}
