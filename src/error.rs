//! Operator error taxonomy.
//!
//! Remote control-plane failures keep their own type ([`RemoteError`]) so
//! retryability stays decidable; everything here wraps them or covers the
//! Kubernetes-side failure modes.

use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum Error {
    /// An object of the wrong kind reached a kind-specific engine. Always a
    /// wiring bug, never a remote-state problem.
    #[error("unexpected object kind, expected {expected}")]
    UnexpectedKind { expected: &'static str },

    /// A kind was registered twice at bootstrap.
    #[error("kind {kind} is already registered")]
    DuplicateKind { kind: &'static str },

    #[error("remote control-plane error: {0}")]
    Remote(#[from] RemoteError),

    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    /// Remote deletion was issued but not yet confirmed; the deletion pass
    /// must run again.
    #[error("remote deletion still in progress for {id}")]
    DeletionPending { id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
