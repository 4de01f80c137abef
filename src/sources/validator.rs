use http::StatusCode;
use tracing::{debug, warn};

use crate::cache::token::mask_token;
use crate::observability::metrics::get_metrics;
use crate::sources::transport::Transport;
use crate::utils::constants::REQUEST_KIND_VALIDATE;

/// Probes the feed with a token to check it is currently accepted.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    transport: Transport,
    probe_url: String,
}

impl TokenValidator {
    pub fn new(transport: Transport, probe_url: String) -> Self {
        Self { transport, probe_url }
    }

    /// `true` only on 200. One attempt; any other status or a network failure is `false`.
    pub async fn validate(&self, token: &str) -> bool {
        let metrics = get_metrics().await;
        let accepted = match self.transport.get_as(REQUEST_KIND_VALIDATE, &self.probe_url, token).await {
            Ok(response) if response.status == StatusCode::OK => true,
            Ok(response) => {
                warn!(token = %mask_token(token), status = response.status.as_u16(), "token probe refused");
                false
            }
            Err(e) => {
                warn!(token = %mask_token(token), "token probe failed: {}", e);
                false
            }
        };

        let label = match accepted {
            true => "accepted",
            false => "refused",
        };
        metrics.token_validation.with_label_values(&[label]).inc();
        debug!(token = %mask_token(token), accepted, "token probe done");
        accepted
    }
}
