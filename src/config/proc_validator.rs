//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks feed credentials / path segments, token lifetime,
//!   http timeouts, retry and logging invariants

use tracing::info;

use crate::cache::token::TOKEN_TTL_SECONDS_MAX;
use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::types::{FeedConfig, ServiceConfig, StoreConfig};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_feed(&cfg.feed, &mut errors);
    validate_settings(&cfg.settings, &mut errors);
    validate_store(&cfg.store, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        // reported by the caller, logging may not be set up yet
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// FEED VALIDATION
fn validate_feed(feed: &FeedConfig, errors: &mut Vec<String>) {
    let required = [
        ("feed.username", &feed.username),
        ("feed.password", &feed.password),
        ("feed.data_feed_id", &feed.data_feed_id),
        ("feed.version", &feed.version),
    ];
    for (path, value) in required {
        if value.trim().is_empty() {
            errors.push(format!("{} must not be empty", path));
        }
    }

    // both become URL path segments
    for (path, value) in [("feed.data_feed_id", &feed.data_feed_id), ("feed.version", &feed.version)] {
        if value.contains('/') {
            errors.push(format!("{} '{}' must not contain '/'", path, value));
        }
    }

    if !(feed.base_url.starts_with("http://") || feed.base_url.starts_with("https://")) {
        errors.push(format!(
            "feed.base_url '{}' must start with http:// or https://",
            feed.base_url
        ));
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.token_ttl_seconds == 0 || settings.token_ttl_seconds > TOKEN_TTL_SECONDS_MAX {
        errors.push(format!(
            "settings.token_ttl_seconds must be in 1..={} (got {})",
            TOKEN_TTL_SECONDS_MAX, settings.token_ttl_seconds
        ));
    }

    if settings.http.connect_timeout_ms == 0 {
        errors.push("settings.http.connect_timeout_ms must be > 0".to_string());
    }
    if settings.http.request_timeout_ms == 0 {
        errors.push("settings.http.request_timeout_ms must be > 0".to_string());
    }

    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts() == 0 {
        errors.push(format!("{}.attempts must be > 0", path));
    }
    if retry.max_delay_ms() < retry.base_delay_ms() {
        errors.push(format!(
            "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
            path,
            retry.max_delay_ms(),
            retry.base_delay_ms()
        ));
    }
}

fn validate_store(store: &StoreConfig, errors: &mut Vec<String>) {
    if let StoreConfig::File { path } = store {
        if path.as_os_str().is_empty() {
            errors.push("store.path must not be empty for a file store".to_string());
        }
    }
}
