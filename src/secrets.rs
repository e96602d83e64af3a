//! # Side-Channel Credential Store
//!
//! Kinds that expose connection credentials after provisioning publish them
//! to a Kubernetes Secret keyed by the local resource's name + namespace.
//! The deletion sequencer removes that Secret best-effort: a cleanup failure
//! is logged but never blocks the overall deletion.
//!
//! Credential values are zeroized when the in-memory copies drop.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Error;

/// One credential entry destined for the Secret's `stringData`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CredentialPair {
    pub key: String,
    pub value: String,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("key", &self.key)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Connection credential material extracted from a remote instance.
#[derive(Debug, Default, Zeroize, ZeroizeOnDrop)]
pub struct CredentialData {
    pairs: Vec<CredentialPair>,
}

impl CredentialData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push(CredentialPair {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn to_string_data(&self) -> BTreeMap<String, String> {
        self.pairs
            .iter()
            .map(|pair| (pair.key.clone(), pair.value.clone()))
            .collect()
    }
}

/// Secret CRUD keyed by local resource name + namespace.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create or update the credential Secret.
    async fn publish(&self, name: &str, namespace: &str, data: &CredentialData)
        -> Result<(), Error>;

    /// Delete the credential Secret; deleting an absent Secret is a no-op.
    async fn remove(&self, name: &str, namespace: &str) -> Result<(), Error>;
}

/// Kubernetes-backed credential store.
#[derive(Clone)]
pub struct K8sCredentialStore {
    client: Client,
}

impl std::fmt::Debug for K8sCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("K8sCredentialStore").finish_non_exhaustive()
    }
}

impl K8sCredentialStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn build_secret(name: &str, namespace: &str, data: &CredentialData) -> Secret {
        Secret {
            metadata: kube::api::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            string_data: Some(data.to_string_data()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CredentialStore for K8sCredentialStore {
    async fn publish(
        &self,
        name: &str,
        namespace: &str,
        data: &CredentialData,
    ) -> Result<(), Error> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let mut secret = Self::build_secret(name, namespace, data);

        match secrets.get(name).await {
            Ok(existing) => {
                // Replace needs the live resourceVersion
                secret.metadata.resource_version = existing.metadata.resource_version;
                secrets.replace(name, &PostParams::default(), &secret).await?;
                debug!(name, namespace, "updated credential secret");
            }
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                secrets.create(&PostParams::default(), &secret).await?;
                info!(name, namespace, "created credential secret");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn remove(&self, name: &str, namespace: &str) -> Result<(), Error> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match secrets.delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(name, namespace, "deleted credential secret");
                Ok(())
            }
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Name of the credential Secret for a managed resource.
pub fn credential_secret_name(resource_name: &str) -> String {
    format!("{resource_name}-credentials")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_secret_name_is_suffixed() {
        assert_eq!(credential_secret_name("orders-db"), "orders-db-credentials");
    }

    #[test]
    fn string_data_carries_all_pairs() {
        let mut data = CredentialData::new();
        data.push("username", "admin");
        data.push("password", "s3cr3t");

        let string_data = data.to_string_data();
        assert_eq!(string_data.get("username").map(String::as_str), Some("admin"));
        assert_eq!(string_data.get("password").map(String::as_str), Some("s3cr3t"));
    }

    #[test]
    fn debug_output_redacts_values() {
        let pair = CredentialPair {
            key: "password".into(),
            value: "s3cr3t".into(),
        };
        let rendered = format!("{pair:?}");
        assert!(rendered.contains("password"));
        assert!(!rendered.contains("s3cr3t"));
    }
}
