use std::time::Duration;

use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use crate::config::settings::{HttpConfig, SettingsConfig};
use crate::config::types::FeedCredentials;
use crate::error::FeedError;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::{REQUEST_KIND_FETCH, REQUEST_KIND_HANDSHAKE};

/// Raw answer of the remote service; status codes are left to the caller.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Authenticated GET primitive shared by issuer, validator and dispatcher.
/// Every call is a single attempt; retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
}

impl Transport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &SettingsConfig) -> Result<Self, FeedError> {
        Ok(Self::new(build_client(&settings.http)?))
    }

    /// GET with `Authorization: Basic <token>`, the token already base64 encoded.
    pub async fn get(&self, url: &str, token: &str) -> Result<FeedResponse, FeedError> {
        self.get_as(REQUEST_KIND_FETCH, url, token).await
    }

    /// Same as [`Transport::get`], labelled for metrics.
    pub async fn get_as(&self, kind: &str, url: &str, token: &str) -> Result<FeedResponse, FeedError> {
        let authorization = format!("Basic {token}");
        self.execute(kind, url, || {
            self.client.get(url).header(AUTHORIZATION, authorization.as_str())
        })
        .await
    }

    /// GET with HTTP Basic username/password, used only by the token handshake.
    pub async fn get_with_credentials(
        &self,
        url: &str,
        credentials: &FeedCredentials,
    ) -> Result<FeedResponse, FeedError> {
        self.execute(REQUEST_KIND_HANDSHAKE, url, || {
            self.client
                .get(url)
                .basic_auth(&credentials.username, Some(&credentials.password))
        })
        .await
    }

    async fn execute<B>(&self, kind: &str, url: &str, build: B) -> Result<FeedResponse, FeedError>
    where
        B: Fn() -> RequestBuilder,
    {
        let metrics = get_metrics().await;

        // any status is an answer, only network failures are errors
        let result = async {
            let response = build().send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, FeedError>(FeedResponse { status, headers, body })
        }
        .await;

        match &result {
            Ok(response) => {
                debug!(kind, url, status = response.status.as_u16(), "feed response");
                metrics
                    .http_requests
                    .with_label_values(&[kind, response.status.as_str()])
                    .inc();
            }
            Err(_) => {
                metrics.http_requests.with_label_values(&[kind, "error"]).inc();
            }
        }
        result
    }
}

pub fn build_client(http: &HttpConfig) -> Result<Client, FeedError> {
    Client::builder()
        .connect_timeout(Duration::from_millis(http.connect_timeout_ms))
        .timeout(Duration::from_millis(http.request_timeout_ms))
        .build()
        .map_err(FeedError::from)
}
