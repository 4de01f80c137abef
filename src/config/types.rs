use serde::Deserialize;
use std::path::PathBuf;

use crate::config::settings::SettingsConfig;
use crate::utils::constants::{DEFAULT_BASE_URL, DEFAULT_STORE_PATH};

/// ================================
/// Full client configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub feed: FeedConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// ================================
/// Remote feed
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub data_feed_id: String,
    pub version: String,
    /// Raw handshake response headers are written here when set.
    pub handshake_dump_path: Option<PathBuf>,
}

impl FeedConfig {
    pub fn credentials(&self) -> FeedCredentials {
        FeedCredentials {
            username: self.username.to_owned(),
            password: self.password.to_owned(),
        }
    }
}

/// Username/password pair, only ever sent on the token handshake.
#[derive(Clone)]
pub struct FeedCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// ================================
/// Credential store
/// ================================
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    File { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}
