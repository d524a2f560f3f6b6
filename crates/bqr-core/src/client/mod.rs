//! Minimal dataset client for the BigQuery REST API.
//!
//! Only the two calls the access commands need are implemented. Every call
//! goes through the client's [`RetryPolicy`]; HTTP is done with libcurl on a
//! blocking thread.

mod http;
mod model;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::future::Future;

use crate::config::BqrConfig;
use crate::retry::{call_with_retry, CallError, ErrorKind, RemoteError, RetryPolicy, DEFAULT_RETRY};
use http::{HttpRequest, HttpResponse, Method};

pub use http::Timeouts;
pub use model::{AccessEntry, Dataset, DatasetField, DatasetRef, ParseDatasetRefError};

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Calls the access commands make against the dataset API.
///
/// Futures are `Send` so callers can run them on spawned tasks.
pub trait DatasetApi {
    fn get_dataset(
        &self,
        dataset: &DatasetRef,
    ) -> impl Future<Output = Result<Dataset, CallError>> + Send;

    /// Sends only `fields` of `dataset`; guarded by the dataset's etag when present.
    fn update_dataset(
        &self,
        dataset: &Dataset,
        fields: &[DatasetField],
    ) -> impl Future<Output = Result<Dataset, CallError>> + Send;
}

#[derive(Debug, Clone)]
pub struct Client {
    endpoint: String,
    project: Option<String>,
    token: Option<String>,
    retry: RetryPolicy,
    timeouts: Timeouts,
}

impl Client {
    /// Client for `endpoint` (e.g. [`DEFAULT_ENDPOINT`]) using [`DEFAULT_RETRY`].
    pub fn new(endpoint: &str) -> Result<Self> {
        let parsed = url::Url::parse(endpoint).with_context(|| format!("invalid endpoint {}", endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("endpoint {} must be http or https", endpoint);
        }
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project: None,
            token: None,
            retry: DEFAULT_RETRY,
            timeouts: Timeouts::default(),
        })
    }

    /// Client configured from `cfg` (endpoint, project, timeouts, retry).
    pub fn from_config(cfg: &BqrConfig) -> Result<Self> {
        let mut client = Self::new(&cfg.endpoint)?
            .with_retry(cfg.retry_policy())
            .with_timeouts(cfg.timeouts());
        client.project = cfg.project.clone();
        Ok(client)
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Default project for dataset ids given without one.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    fn dataset_url(&self, dataset: &DatasetRef) -> String {
        format!(
            "{}/projects/{}/datasets/{}",
            self.endpoint, dataset.project_id, dataset.dataset_id
        )
    }

    fn request(&self, method: Method, url: String) -> HttpRequest {
        HttpRequest {
            method,
            url,
            token: self.token.clone(),
            if_match: None,
            body: None,
            timeouts: self.timeouts,
        }
    }

    async fn fetch<T>(&self, req: HttpRequest) -> Result<T, CallError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        call_with_retry(&self.retry, || attempt::<T>(req.clone())).await
    }
}

/// One try of a request: the blocking transfer runs off the async workers.
async fn attempt<T>(req: HttpRequest) -> Result<T, RemoteError>
where
    T: DeserializeOwned + Send + 'static,
{
    tracing::debug!(method = ?req.method, url = %req.url, "sending request");
    let response: HttpResponse = tokio::task::spawn_blocking(move || http::send(&req))
        .await
        .map_err(|e| RemoteError::unstructured(ErrorKind::Other, format!("request task failed: {}", e)))??;
    response.json()
}

impl DatasetApi for Client {
    async fn get_dataset(&self, dataset: &DatasetRef) -> Result<Dataset, CallError> {
        let req = self.request(Method::Get, self.dataset_url(dataset));
        self.fetch(req).await
    }

    async fn update_dataset(
        &self,
        dataset: &Dataset,
        fields: &[DatasetField],
    ) -> Result<Dataset, CallError> {
        let body = dataset.patch_body(fields).map_err(|e| {
            RemoteError::unstructured(ErrorKind::Other, format!("cannot encode update: {}", e))
        })?;
        let mut req = self.request(Method::Patch, self.dataset_url(&dataset.dataset_reference));
        req.if_match = dataset.etag.clone();
        req.body = Some(body.to_string().into_bytes());
        tracing::debug!(
            dataset = %dataset.dataset_reference,
            fields = ?fields.iter().map(|f| f.api_name()).collect::<Vec<_>>(),
            "updating dataset"
        );
        self.fetch(req).await
    }
}
