use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::token::{mask_token, TokenRecord};
use crate::cache::token_store::CredentialStore;
use crate::config::settings::SettingsConfig;
use crate::config::types::{FeedConfig, FeedCredentials};
use crate::error::{FeedError, StoreError};
use crate::helpers::time::{get_instant, now_utc};
use crate::helpers::urls::FeedUrls;
use crate::observability::metrics::get_metrics;
use crate::parser::xml::xml_to_value;
use crate::resilience::retry::RetrySettings;
use crate::sources::issuer::TokenIssuer;
use crate::sources::transport::Transport;
use crate::sources::validator::TokenValidator;

/// Steps of a single `dispatch` call.
#[derive(Debug)]
enum DispatchState {
    CheckingExpiry,
    /// Carries the token that was found unusable, if any.
    Renewing(Option<String>),
    Validating(TokenRecord),
    Retrying,
    Fetching(String),
    Done(Value),
    Failed(FeedError),
}

impl DispatchState {
    fn name(&self) -> &'static str {
        match self {
            DispatchState::CheckingExpiry => "checking_expiry",
            DispatchState::Renewing(_) => "renewing",
            DispatchState::Validating(_) => "validating",
            DispatchState::Retrying => "retrying",
            DispatchState::Fetching(_) => "fetching",
            DispatchState::Done(_) => "done",
            DispatchState::Failed(_) => "failed",
        }
    }
}

/// Sends requests with a valid token, renewing it at most once per call.
pub struct Dispatcher<S: CredentialStore> {
    store: S,
    credentials: FeedCredentials,
    urls: FeedUrls,
    transport: Transport,
    issuer: TokenIssuer,
    validator: TokenValidator,
    // backoff for network failures while fetching; handshake and probe are sent once
    fetch_retry: RetrySettings,
    // one issuance in flight per store
    renew_guard: Mutex<()>,
}

impl<S: CredentialStore> Dispatcher<S> {
    pub fn new(store: S, feed: &FeedConfig, settings: &SettingsConfig) -> Result<Self, FeedError> {
        let transport = Transport::from_settings(settings)?;
        let urls = FeedUrls::from_config(feed);
        let issuer = TokenIssuer::new(transport.clone(), urls.branch_list(), settings.token_ttl_seconds)
            .with_dump_path(feed.handshake_dump_path.clone());
        let validator = TokenValidator::new(transport.clone(), urls.branch_list());

        Ok(Self {
            store,
            credentials: feed.credentials(),
            urls,
            transport,
            issuer,
            validator,
            fetch_retry: RetrySettings::from_config(settings.retry.as_ref()),
            renew_guard: Mutex::new(()),
        })
    }

    pub fn urls(&self) -> &FeedUrls {
        &self.urls
    }

    /// Fetches `url` and returns its decoded body.
    pub async fn dispatch(&self, url: &str) -> Result<Value, FeedError> {
        let metrics = get_metrics().await;
        let start = get_instant();

        let mut renewed = false;
        let mut state = DispatchState::CheckingExpiry;
        let result = loop {
            debug!(url, state = state.name(), "dispatch step");
            state = match state {
                DispatchState::CheckingExpiry => self.check_expiry(renewed).await,
                DispatchState::Renewing(stale) => {
                    renewed = true;
                    metrics.token_renewals.inc();
                    self.renew(stale).await
                }
                DispatchState::Validating(record) => self.validate(record).await,
                DispatchState::Retrying => DispatchState::CheckingExpiry,
                DispatchState::Fetching(token) => self.fetch(url, token, renewed).await,
                DispatchState::Done(value) => break Ok(value),
                DispatchState::Failed(e) => break Err(e),
            };
        };

        metrics.dispatch_duration.observe(start.elapsed().as_secs_f64());
        match &result {
            Ok(_) => {
                metrics.dispatch_requests.with_label_values(&["done"]).inc();
            }
            Err(e) => {
                metrics.dispatch_requests.with_label_values(&[e.kind()]).inc();
                error!(url, error = %e, "dispatch failed");
            }
        }
        result
    }

    async fn check_expiry(&self, renewed: bool) -> DispatchState {
        let now = now_utc();
        let read_error = match self.store.latest_expiry().await {
            Ok(expires_at) if expires_at > now => match self.store.latest_token().await {
                Ok(token) => return DispatchState::Fetching(token),
                Err(e) => e,
            },
            Ok(expires_at) => {
                return renew_or_fail(renewed, &format!("latest token expired at {expires_at}"));
            }
            Err(e) => e,
        };

        match read_error {
            StoreError::NotFound | StoreError::Corrupt(_) => {
                renew_or_fail(renewed, &read_error.to_string())
            }
            e => self.storage_failure("read", e).await,
        }
    }

    async fn renew(&self, stale: Option<String>) -> DispatchState {
        let _guard = self.renew_guard.lock().await;

        // another caller may have renewed while we waited
        if let Ok(latest) = self.store.latest_record().await {
            if latest.is_valid_at(now_utc()) && stale.as_deref() != Some(latest.value.as_str()) {
                debug!(token = %latest.masked(), "reusing token renewed concurrently");
                return DispatchState::Retrying;
            }
        }

        let record = match self.issuer.issue(&self.credentials).await {
            Ok(record) => record,
            Err(e) => return DispatchState::Failed(e),
        };

        match self.store.append_token(&record).await {
            Ok(id) => {
                info!(id, token = %record.masked(), "token stored");
                DispatchState::Validating(record)
            }
            Err(e) => self.storage_failure("append", e).await,
        }
    }

    async fn validate(&self, record: TokenRecord) -> DispatchState {
        match self.validator.validate(&record.value).await {
            true => DispatchState::Retrying,
            false => {
                warn!(token = %record.masked(), "freshly issued token failed validation");
                DispatchState::Failed(FeedError::AuthRejected)
            }
        }
    }

    async fn fetch(&self, url: &str, token: String, renewed: bool) -> DispatchState {
        let response = match self
            .fetch_retry
            .run_with_retry(|| self.transport.get(url, &token))
            .await
        {
            Ok(response) => response,
            Err(e) => return DispatchState::Failed(e),
        };

        match response.status {
            status if status.is_success() => match xml_to_value(&response.body) {
                Ok(value) => DispatchState::Done(value),
                Err(e) => DispatchState::Failed(FeedError::Transport(format!("malformed body: {e:#}"))),
            },
            http::StatusCode::UNAUTHORIZED if !renewed => {
                info!(token = %mask_token(&token), "token rejected before expiry, renewing");
                DispatchState::Renewing(Some(token))
            }
            http::StatusCode::UNAUTHORIZED => DispatchState::Failed(FeedError::AuthRejected),
            status => DispatchState::Failed(FeedError::Protocol { status: status.as_u16() }),
        }
    }

    async fn storage_failure(&self, op: &str, e: StoreError) -> DispatchState {
        get_metrics().await.store_failures.with_label_values(&[op]).inc();
        DispatchState::Failed(FeedError::Storage(e))
    }
}

/// At most one renewal per dispatch call.
fn renew_or_fail(renewed: bool, reason: &str) -> DispatchState {
    match renewed {
        false => {
            info!(reason, "no usable token, renewing");
            DispatchState::Renewing(None)
        }
        true => {
            warn!(reason, "token renewed in this call is still not usable");
            DispatchState::Failed(FeedError::AuthRejected)
        }
    }
}
