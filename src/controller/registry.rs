//! Kind registry.
//!
//! Every managed kind is registered exactly once at bootstrap; the mapping
//! from kind to controller is explicit data, not convention. Registering the
//! same kind twice is a wiring bug and fails fast instead of silently
//! overwriting the earlier controller.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use futures::FutureExt;
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use super::run_controller;
use crate::engine::{ReconciliationEngine, ResourceAdapter};
use crate::error::Error;

/// Explicit kind-to-controller mapping, populated once at bootstrap.
#[derive(Default)]
pub struct KindRegistry {
    controllers: BTreeMap<&'static str, BoxFuture<'static, ()>>,
}

impl std::fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one kind's engine. Fails on duplicate kind names.
    pub fn register<A>(
        &mut self,
        client: Client,
        engine: ReconciliationEngine<A>,
    ) -> Result<(), Error>
    where
        A: ResourceAdapter,
        A::Resource: DeserializeOwned + Serialize,
    {
        self.insert(A::KIND, run_controller(client, engine).boxed())
    }

    fn insert(
        &mut self,
        kind: &'static str,
        controller: BoxFuture<'static, ()>,
    ) -> Result<(), Error> {
        if self.controllers.contains_key(kind) {
            return Err(Error::DuplicateKind { kind });
        }
        self.controllers.insert(kind, controller);
        Ok(())
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.controllers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Run every registered controller until shutdown.
    pub async fn run_all(self) {
        info!(kinds = ?self.kinds(), "starting controllers");
        futures::future::join_all(self.controllers.into_values()).await;
    }
}
