// tests/common/mod.rs
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Duration;
use httpmock::MockServer;

use crate::cache::token::{encode_token, TokenRecord};
use crate::cache::token_store::CredentialStore;
use crate::config::settings::{HttpConfig, RetryConfig, SettingsConfig};
use crate::config::types::FeedConfig;
use crate::dispatch::dispatcher::Dispatcher;
use crate::error::StoreError;
use crate::helpers::time::now_utc;

pub const USERNAME: &str = "agent";
pub const PASSWORD: &str = "secret";
pub const FEED_ID: &str = "FeedA";
pub const VERSION: &str = "v10";

pub const BRANCH_LIST_PATH: &str = "/export/FeedA/v10/branch";
pub const PROPERTY_LIST_PATH: &str = "/export/FeedA/v10/branch/1/property";

pub const BRANCHES_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<branches>
  <branch><name>North</name><firmid>12</firmid><branchid>1</branchid></branch>
  <branch><name>South</name><firmid>12</firmid><branchid>2</branchid></branch>
</branches>"#;

pub const PROPERTIES_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<properties>
  <property><prop_id>7001</prop_id><lastchanged>2024-01-05T03:04:09</lastchanged></property>
</properties>"#;

/// `Authorization` value of the username/password handshake.
pub fn credentials_header() -> String {
    format!("Basic {}", STANDARD.encode(format!("{USERNAME}:{PASSWORD}")))
}

/// `Authorization` value carrying the token issued for `raw_token`.
pub fn token_header(raw_token: &str) -> String {
    format!("Basic {}", encode_token(raw_token))
}

pub fn feed_config(server: &MockServer) -> FeedConfig {
    FeedConfig {
        base_url: server.base_url(),
        username: USERNAME.to_owned(),
        password: PASSWORD.to_owned(),
        data_feed_id: FEED_ID.to_owned(),
        version: VERSION.to_owned(),
        handshake_dump_path: None,
    }
}

pub fn test_settings() -> SettingsConfig {
    SettingsConfig {
        http: HttpConfig { connect_timeout_ms: 500, request_timeout_ms: 2000 },
        ..SettingsConfig::default()
    }
}

/// Short request timeout and three attempts for network failures.
pub fn retrying_settings() -> SettingsConfig {
    SettingsConfig {
        http: HttpConfig { connect_timeout_ms: 500, request_timeout_ms: 150 },
        retry: Some(RetryConfig {
            attempts: Some(3),
            base_delay_ms: Some(1),
            max_delay_ms: Some(1),
        }),
        ..SettingsConfig::default()
    }
}

pub fn dispatcher<S: CredentialStore>(server: &MockServer, store: S) -> Dispatcher<S> {
    Dispatcher::new(store, &feed_config(server), &test_settings()).expect("dispatcher")
}

/// Record for `raw_token` expiring `expires_in` from now.
pub fn record_expiring_in(raw_token: &str, expires_in: Duration) -> TokenRecord {
    let now = now_utc();
    TokenRecord::new(encode_token(raw_token), now - Duration::hours(1), now + expires_in)
}

/// Empty store whose appends always fail.
pub struct FullDiskStore;

impl CredentialStore for FullDiskStore {
    async fn append_token(&self, _record: &TokenRecord) -> Result<u64, StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    async fn latest_record(&self) -> Result<TokenRecord, StoreError> {
        Err(StoreError::NotFound)
    }
}
