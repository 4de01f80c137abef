use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};

use crate::helpers::time::now_utc;

/// Client-side token lifetime: 60 minutes from issuance.
pub const TOKEN_TTL_SECONDS_DEFAULT: u64 = 60 * 60;
/// Longest lifetime a configured TTL may claim.
pub const TOKEN_TTL_SECONDS_MAX: u64 = 24 * 60 * 60;

/// An issued token. Immutable once built; stores only ever append these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// base64 of the raw `Token` header value, sent as-is after `Basic `
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(value: String, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self { value, created_at, expires_at }
    }

    /// Builds a record from the raw header value handed out by the handshake.
    /// The TTL is capped at [`TOKEN_TTL_SECONDS_MAX`].
    pub fn issue(raw_token: &str, ttl_seconds: u64) -> Self {
        let created_at = now_utc();
        let ttl = i64::try_from(ttl_seconds.min(TOKEN_TTL_SECONDS_MAX))
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::seconds(TOKEN_TTL_SECONDS_DEFAULT as i64));
        let expires_at = created_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(encode_token(raw_token), created_at, expires_at)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    pub fn masked(&self) -> String {
        mask_token(&self.value)
    }
}

/// Transport-safe form of a raw token.
pub fn encode_token(raw_token: &str) -> String {
    STANDARD.encode(raw_token.trim())
}

/// Enough of a token to correlate log lines, never the whole value.
pub fn mask_token(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}***")
}
