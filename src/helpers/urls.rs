use chrono::{DateTime, Utc};

use crate::config::types::FeedConfig;

/// Builds export URLs of the shape `/export/{feedId}/{version}/...`.
#[derive(Debug, Clone)]
pub struct FeedUrls {
    root: String,
}

impl FeedUrls {
    pub fn new(base_url: &str, data_feed_id: &str, version: &str) -> Self {
        let root = format!(
            "{}/export/{}/{}",
            base_url.trim_end_matches('/'),
            data_feed_id,
            version
        );
        Self { root }
    }

    pub fn from_config(feed: &FeedConfig) -> Self {
        Self::new(&feed.base_url, &feed.data_feed_id, &feed.version)
    }

    /// Also the handshake and validation endpoint.
    pub fn branch_list(&self) -> String {
        format!("{}/branch", self.root)
    }

    pub fn branch(&self, branch_id: &str) -> String {
        format!("{}/branch/{}", self.root, branch_id)
    }

    pub fn property_list(&self, branch_id: &str) -> String {
        format!("{}/branch/{}/property", self.root, branch_id)
    }

    pub fn property(&self, branch_id: &str, property_id: &str) -> String {
        format!("{}/branch/{}/property/{}", self.root, branch_id, property_id)
    }

    pub fn properties_changed_since(&self, since: &DateTime<Utc>) -> String {
        format!("{}/property/{}", self.root, since.format("%Y/%m/%d/%H/%M/%S"))
    }

    pub fn files_changed_since(&self, since: &DateTime<Utc>) -> String {
        format!("{}/files/{}", self.root, since.format("%Y/%m/%d/%H/%M/%S"))
    }
}
