//! Nimbus control-plane REST client.
//!
//! Thin JSON-over-HTTP helper shared by the per-kind API wrappers in
//! `crate::kinds`. Translates HTTP status classes into the [`RemoteError`]
//! taxonomy:
//!
//! - 400/409/422 with a structured `{code, message}` body → `BadRequest`
//! - 404 → `NotFound`
//! - any other failure (connect errors, timeouts, 5xx, malformed bodies)
//!   → `Transport`

use std::time::Instant;

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::RemoteError;
use crate::metrics;

/// Structured error body returned by the control plane on rejections.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

/// JSON REST client bound to one control-plane endpoint.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Build a client for the given endpoint, e.g. `https://api.nimbus.dev`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RemoteError::Transport(e.into()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        metrics::increment_remote_operations("get");
        debug!(path, "remote GET");
        let start = Instant::now();
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.into()))?;
        metrics::observe_remote_operation_duration(start.elapsed().as_secs_f64());
        let response = Self::check(path, response).await?;
        decode(response).await
    }

    /// GET a JSON document with query parameters.
    pub async fn query_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        metrics::increment_remote_operations("list");
        debug!(path, "remote LIST");
        let start = Instant::now();
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.into()))?;
        metrics::observe_remote_operation_duration(start.elapsed().as_secs_f64());
        let response = Self::check(path, response).await?;
        decode(response).await
    }

    /// POST a JSON body, returning the created representation.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        metrics::increment_remote_operations("create");
        debug!(path, "remote POST");
        let start = Instant::now();
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.into()))?;
        metrics::observe_remote_operation_duration(start.elapsed().as_secs_f64());
        let response = Self::check(path, response).await?;
        decode(response).await
    }

    /// PUT a JSON body; the control plane returns no payload on updates.
    pub async fn put_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), RemoteError> {
        metrics::increment_remote_operations("update");
        debug!(path, "remote PUT");
        let start = Instant::now();
        let response = self
            .http
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.into()))?;
        metrics::observe_remote_operation_duration(start.elapsed().as_secs_f64());
        Self::check(path, response).await?;
        Ok(())
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        metrics::increment_remote_operations("delete");
        debug!(path, "remote DELETE");
        let start = Instant::now();
        let response = self
            .http
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.into()))?;
        metrics::observe_remote_operation_duration(start.elapsed().as_secs_f64());
        Self::check(path, response).await?;
        Ok(())
    }

    async fn check(
        path: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(path.to_string()));
        }

        let body = response.text().await.unwrap_or_default();

        if matches!(status.as_u16(), 400 | 409 | 422) {
            if let Ok(err) = serde_json::from_str::<ApiErrorBody>(&body) {
                return Err(RemoteError::BadRequest {
                    code: err.code,
                    message: err.message,
                });
            }
            return Err(RemoteError::BadRequest {
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        Err(RemoteError::Transport(anyhow!(
            "{path}: unexpected status {status}: {body}"
        )))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Transport(anyhow!("malformed response body: {e}")))
}
