//! Data source abstraction and the HTTP client behind it

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::actions::ApiResponse;
use crate::errors::FetchError;
use crate::tiles::QueryArgs;

/// A remote source one tile queries
///
/// Implementations are shared behind `Arc`; one instance may serve any number
/// of concurrent requests. The only error type allowed out is [`FetchError`],
/// so a store can always classify what went wrong.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, args: &QueryArgs) -> Result<ApiResponse, FetchError>;
}

/// reqwest-backed source for frequency-distribution endpoints
pub struct HttpDataSource {
    client: Client,
    endpoint: String,
}

impl HttpDataSource {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self, args: &QueryArgs) -> Result<ApiResponse, FetchError> {
        debug!(endpoint = %self.endpoint, corpus = %args.corpus_name, "HttpDataSource::fetch");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&args.as_pairs())
            .send()
            .await
            .map_err(|e| FetchError::InternalError(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(FetchError::BadRequest(format!(
                "{} rejected the query ({status})",
                self.endpoint
            )));
        }
        if !status.is_success() {
            return Err(FetchError::InternalError(format!(
                "{} answered {status}",
                self.endpoint
            )));
        }

        response
            .json::<ApiResponse>()
            .await
            .map_err(|e| FetchError::InternalError(format!("malformed response: {e}")))
    }
}
