//! # Nimbus Cloud Operator
//!
//! A Kubernetes operator that maps declared custom resources onto instances
//! in the Nimbus cloud control plane.
//!
//! ## Overview
//!
//! For each managed kind (`Database`, `Stream`) the operator:
//!
//! 1. **Watches** the custom resource across all namespaces
//! 2. **Resolves** whether a remote instance already exists: an explicit
//!    `boundId` in the spec, the previously recorded `status.remoteId`, or a
//!    scoped list-by-display-name query
//! 3. **Converges**: creates the instance when nothing exists, or compares
//!    the declared spec field by field against the remote state and issues a
//!    minimal partial update
//! 4. **Projects status**: append-only conditions (Provisioning, Updating,
//!    Active, Failed) derived from the remote lifecycle state
//! 5. **Cleans up** through a finalizer, deleting the remote instance and
//!    the published credential Secret before the local resource disappears
//!
//! All reconciliation logic lives once in [`engine`]; kinds plug in through
//! the [`engine::ResourceAdapter`] trait and are registered explicitly in a
//! [`controller::KindRegistry`] at bootstrap.

pub mod controller;
pub mod crd;
pub mod engine;
pub mod error;
pub mod kinds;
pub mod metrics;
pub mod remote;
pub mod secrets;
pub mod server;

pub use crd::{Database, DatabaseSpec, ResourceStatus, Stream, StreamSpec};
pub use error::{Error, Result};
