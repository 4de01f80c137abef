//! Shared constants and invariants

pub const DEFAULT_BASE_URL: &str = "http://webservices.vebra.com";
pub const DEFAULT_CONFIG_PATH: &str = "estate-feed.yaml";
pub const DEFAULT_STORE_PATH: &str = "tokens.jsonl";

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30000;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 1000;

/// Response header carrying a freshly issued token.
pub const TOKEN_HEADER: &str = "Token";

// Request kinds, used as metric labels
pub const REQUEST_KIND_HANDSHAKE: &str = "handshake";
pub const REQUEST_KIND_VALIDATE: &str = "validate";
pub const REQUEST_KIND_FETCH: &str = "fetch";
