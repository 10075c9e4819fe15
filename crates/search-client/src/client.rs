//! HTTP implementation of [`IndexService`].

use crate::document::Batch;
use crate::error::{ServiceError, ServiceOperation};
use crate::schema::{IndexField, IndexSchema};
use crate::service::IndexService;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// API version sent with every request unless overridden.
pub const DEFAULT_API_VERSION: &str = "2016-09-01";

/// Header carrying the static credential.
const API_KEY_HEADER: &str = "api-key";

/// Longest error body kept in a [`ServiceError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Connection settings for [`SearchClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL, e.g. `https://example.search.windows.net`
    pub endpoint: String,
    /// Static credential attached to every request
    pub api_key: String,
    /// Index all operations target
    pub index_name: String,
    /// Value of the `api-version` query parameter
    pub api_version: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            index_name: index_name.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Index definition body for `PUT /indexes/{name}`.
#[derive(Serialize)]
struct IndexDefinition<'a> {
    name: &'a str,
    fields: &'a [IndexField],
}

/// Body of a count query response.
#[derive(Deserialize)]
struct CountResponse {
    #[serde(rename = "@odata.count")]
    count: Option<u64>,
}

/// `reqwest`-based client for one index of the remote service.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    base_url: String,
    index_name: String,
    api_version: String,
}

impl SearchClient {
    pub fn new(config: ClientConfig) -> Result<Self, ServiceError> {
        Url::parse(&config.endpoint).map_err(|e| {
            ServiceError::Configuration(format!("invalid endpoint '{}': {e}", config.endpoint))
        })?;
        if config.index_name.is_empty() {
            return Err(ServiceError::Configuration(
                "index name must not be empty".to_string(),
            ));
        }

        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| ServiceError::Configuration(format!("invalid API key: {e}")))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            index_name: config.index_name,
            api_version: config.api_version,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn index_url(&self) -> String {
        format!("{}/indexes/{}", self.base_url, self.index_name)
    }

    fn docs_url(&self) -> String {
        format!("{}/docs", self.index_url())
    }

    /// Send a request and turn any non-success outcome into a [`ServiceError`].
    async fn send(
        &self,
        operation: ServiceOperation,
        request: RequestBuilder,
    ) -> Result<Response, ServiceError> {
        let response = request
            .query(&[("api-version", self.api_version.as_str())])
            .send()
            .await
            .map_err(|source| ServiceError::Transport { operation, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                operation,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl IndexService for SearchClient {
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), ServiceError> {
        let url = self.index_url();
        debug!("Creating index at {url}");

        let definition = IndexDefinition {
            name: &self.index_name,
            fields: &schema.fields,
        };
        self.send(
            ServiceOperation::CreateIndex,
            self.http.put(&url).json(&definition),
        )
        .await?;
        Ok(())
    }

    async fn delete_index(&self) -> Result<(), ServiceError> {
        let url = self.index_url();
        debug!("Deleting index at {url}");

        self.send(ServiceOperation::DeleteIndex, self.http.delete(&url))
            .await?;
        Ok(())
    }

    async fn post_batch(&self, batch: &Batch) -> Result<(), ServiceError> {
        let url = format!("{}/index", self.docs_url());
        debug!("Posting {} documents to {url}", batch.len());

        self.send(ServiceOperation::PostBatch, self.http.post(&url).json(batch))
            .await?;
        Ok(())
    }

    async fn count_matching(&self, filter: &str) -> Result<u64, ServiceError> {
        let operation = ServiceOperation::CountMatching;
        let request = self.http.get(self.docs_url()).query(&[
            ("search", filter),
            ("$count", "true"),
            ("$top", "0"),
        ]);

        let response = self.send(operation, request).await?;
        let body = response
            .text()
            .await
            .map_err(|source| ServiceError::Transport { operation, source })?;

        parse_count(&body)
    }
}

/// Extract `@odata.count` from a count query response body.
fn parse_count(body: &str) -> Result<u64, ServiceError> {
    let operation = ServiceOperation::CountMatching;
    let response: CountResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::InvalidResponse {
            operation,
            reason: e.to_string(),
        })?;

    response.count.ok_or_else(|| ServiceError::InvalidResponse {
        operation,
        reason: "missing @odata.count".to_string(),
    })
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
