//! Per-kind wire types, remote API wrappers, and adapters.
//!
//! Each managed kind contributes three pieces: the JSON payloads its remote
//! endpoint speaks, a thin [`RemoteApi`](crate::remote::RemoteApi) impl over
//! the shared [`RestClient`](crate::remote::RestClient), and a
//! [`ResourceAdapter`](crate::engine::ResourceAdapter) that maps the custom
//! resource onto those payloads. The reconciliation logic itself lives in
//! `crate::engine` and is identical for every kind.

use serde::Deserialize;

use crate::remote::InstanceSummary;

pub mod database;
pub mod stream;

pub use database::{DatabaseAdapter, DatabaseApi};
pub use stream::{StreamAdapter, StreamApi};

/// Envelope the control plane wraps list results in.
#[derive(Debug, Deserialize)]
pub(crate) struct ListPage {
    pub items: Vec<InstanceSummary>,
}
