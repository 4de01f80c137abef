use std::path::PathBuf;

use http::{HeaderMap, StatusCode};
use tracing::{info, warn};

use crate::cache::token::TokenRecord;
use crate::config::types::FeedCredentials;
use crate::error::FeedError;
use crate::observability::metrics::get_metrics;
use crate::sources::transport::{FeedResponse, Transport};
use crate::utils::constants::TOKEN_HEADER;

/// Obtains fresh tokens through the username/password handshake.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    transport: Transport,
    handshake_url: String,
    ttl_seconds: u64,
    dump_path: Option<PathBuf>,
}

impl TokenIssuer {
    pub fn new(transport: Transport, handshake_url: String, ttl_seconds: u64) -> Self {
        Self { transport, handshake_url, ttl_seconds, dump_path: None }
    }

    /// Write each raw handshake response head to `path`.
    pub fn with_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.dump_path = path;
        self
    }

    pub async fn issue(&self, credentials: &FeedCredentials) -> Result<TokenRecord, FeedError> {
        let metrics = get_metrics().await;
        let response = self
            .transport
            .get_with_credentials(&self.handshake_url, credentials)
            .await
            .inspect_err(|_| metrics.token_issuance.with_label_values(&["transport"]).inc())?;

        self.dump_handshake(&response).await;

        let result = match response.status {
            StatusCode::OK => extract_token(&response.headers)
                .map(|raw| TokenRecord::issue(&raw, self.ttl_seconds))
                .ok_or_else(|| {
                    warn!("handshake succeeded without a '{}' header", TOKEN_HEADER);
                    FeedError::Protocol { status: StatusCode::OK.as_u16() }
                }),
            StatusCode::UNAUTHORIZED => {
                warn!(username = %credentials.username, "handshake rejected the credentials");
                Err(FeedError::AuthRejected)
            }
            status => {
                warn!(status = status.as_u16(), "unexpected handshake status");
                Err(FeedError::Protocol { status: status.as_u16() })
            }
        };

        match &result {
            Ok(record) => {
                metrics.token_issuance.with_label_values(&["issued"]).inc();
                info!(token = %record.masked(), expires_at = %record.expires_at, "token issued");
            }
            Err(e) => {
                metrics.token_issuance.with_label_values(&[e.kind()]).inc();
            }
        }
        result
    }

    async fn dump_handshake(&self, response: &FeedResponse) {
        let Some(path) = &self.dump_path else { return };

        let mut head = format!("HTTP {}\n", response.status);
        for (name, value) in response.headers.iter() {
            head.push_str(&format!("{}: {}\n", name, String::from_utf8_lossy(value.as_bytes())));
        }
        if let Err(e) = tokio::fs::write(path, head).await {
            warn!(path = %path.display(), "cannot write handshake dump: {}", e);
        }
    }
}

/// Value of the `Token` response header, trimmed.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
